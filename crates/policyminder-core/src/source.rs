//! Capabilities the run loop consumes: a roster provider and a message sink.

use async_trait::async_trait;
use tracing::info;

use crate::error::{FetchError, NotifyError};
use crate::record::{PersonRecord, RecipientHandle};

/// Provides the personnel roster from the compliance vendor.
///
/// Implementations hold their own scope identifiers and credentials.
#[async_trait]
pub trait PersonnelSource: Send + Sync {
    async fn fetch_roster(&self) -> Result<Vec<PersonRecord>, FetchError>;
}

/// Delivers composed reminders to people on the chat platform.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn resolve_recipient(&self, email: &str) -> Result<RecipientHandle, NotifyError>;

    async fn deliver(&self, recipient: &RecipientHandle, text: &str) -> Result<(), NotifyError>;
}

/// Sink used when no chat credentials are configured.
///
/// Recipients resolve to themselves. The `policyminder` binary always pairs
/// this sink with a dry run, so there [`NotificationSink::deliver`] is never
/// reached and the composed text is logged by the run loop instead. Library
/// callers that run without dry run get each delivery logged here.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn resolve_recipient(&self, email: &str) -> Result<RecipientHandle, NotifyError> {
        Ok(RecipientHandle {
            id: email.to_string(),
            email: email.to_string(),
            first_name: None,
        })
    }

    async fn deliver(&self, recipient: &RecipientHandle, text: &str) -> Result<(), NotifyError> {
        info!(email = %recipient.email, %text, "no chat client configured, logging message only");
        Ok(())
    }
}
