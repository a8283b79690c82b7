use policyminder_core::FetchError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SecureframeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("GraphQL errors: {0}")]
    Graphql(String),
    #[error("no company found for the current user")]
    NoCompany,
}

impl From<SecureframeError> for FetchError {
    fn from(err: SecureframeError) -> Self {
        match err {
            SecureframeError::Server { status, body } => FetchError::Status { status, body },
            SecureframeError::NoCompany => FetchError::Empty("company"),
            SecureframeError::Http(e) => FetchError::Transport(Box::new(e)),
            SecureframeError::Json(e) => FetchError::Decode(Box::new(e)),
            e @ SecureframeError::Graphql(_) => FetchError::Decode(Box::new(e)),
        }
    }
}
