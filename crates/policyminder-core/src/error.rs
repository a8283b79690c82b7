use thiserror::Error;

/// Failure to obtain the personnel roster. Fatal to a run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("vendor returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("vendor returned no {0}")]
    Empty(&'static str),

    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("malformed vendor response: {0}")]
    Decode(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Failure to resolve or message a single recipient.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("no chat user found for {0}")]
    NotFound(String),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("chat platform error: {0}")]
    Platform(String),
}

/// Failure to render a reminder message.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("parsing {name} template: {source}")]
    Template {
        name: String,
        #[source]
        source: Box<handlebars::TemplateError>,
    },

    #[error("rendering {name} template: {source}")]
    Render {
        name: String,
        #[source]
        source: Box<handlebars::RenderError>,
    },
}

/// Why one recipient was skipped. Never aborts a run.
#[derive(Debug, Error)]
pub enum ReminderError {
    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error(transparent)]
    Compose(#[from] ComposeError),
}
