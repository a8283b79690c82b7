//! Compliance reminder core: roster filtering, reminder windows, message composition,
//! and the run loop that ties them to a personnel source and a notification sink.

pub mod compose;
mod error;
pub mod filter;
pub mod record;
pub mod run;
pub mod source;
pub mod window;

pub use compose::{ComposerSettings, DEFAULT_MESSAGE_TEMPLATE, MessageComposer, MessageContext};
pub use error::{ComposeError, FetchError, NotifyError, ReminderError};
pub use filter::{ComplianceFilter, EvaluationMode, Evaluation, Need, NeedCatalog, RequiredTypeSet};
pub use record::{PersonRecord, RecipientHandle};
pub use run::{Coordinator, RunConfig, RunSummary};
pub use source::{LogSink, NotificationSink, PersonnelSource};
pub use window::{ReminderCalendar, ReminderWindow, WindowError};
