//! Normalised personnel records shared by every vendor source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Vendor aggregate status meaning every onboarding task is done.
pub const ALL_TASKS_COMPLETED: &str = "all_tasks_completed";

/// A snapshot of one person on the compliance platform.
///
/// Built fresh from the vendor response on every run and never mutated.
/// Both the GraphQL and REST sources produce this shape so filtering does not
/// depend on which endpoint was queried.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub id: String,
    pub email: String,
    pub name: String,
    pub active: bool,
    pub invited: bool,
    pub in_audit_scope: bool,
    pub policies_accepted: bool,
    pub security_training_completed: bool,
    /// Free text, compared case-insensitively.
    pub employee_type: String,
    /// Aggregate vendor status, e.g. `all_tasks_completed`.
    pub personnel_status: Option<String>,
    /// REST-only onboarding stage, e.g. `not_started` or `security_training`.
    pub onboarding_status: Option<String>,
    /// Anchor for reminder windows. `None` when the vendor never recorded one.
    pub invited_at: Option<DateTime<Utc>>,
}

impl PersonRecord {
    /// First word of the display name, used when the chat profile has none.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("")
    }
}

/// A recipient resolved on the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientHandle {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_name_takes_leading_word() {
        let record = PersonRecord {
            name: "Ada  Lovelace".into(),
            ..Default::default()
        };
        assert_eq!(record.first_name(), "Ada");
    }

    #[test]
    fn first_name_of_blank_name_is_empty() {
        let record = PersonRecord::default();
        assert_eq!(record.first_name(), "");
    }

    #[test]
    fn record_json_roundtrip_keeps_anchor() {
        let record = PersonRecord {
            id: "u-1".into(),
            email: "ada@example.com".into(),
            invited_at: Some("2024-03-01T09:00:00Z".parse().unwrap()),
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        let parsed: PersonRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
