//! Compliance rules: who is in scope, and what each person still owes.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::record::{ALL_TASKS_COMPLETED, PersonRecord};

/// One outstanding compliance action.
///
/// The text is itself a template fragment and may reference message fields
/// such as `{{SecurityTrainingURL}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Need(String);

impl Need {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn template(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Need {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The fixed set of needs this tool knows how to ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeedCatalog {
    pub policy_acceptance: Need,
    pub security_training: Need,
    pub training_proof: Need,
}

impl Default for NeedCatalog {
    fn default() -> Self {
        Self {
            policy_acceptance: Need::new(
                "Accept or re-accept our company policies at https://app.secureframe.com/onboard/employee/policies",
            ),
            security_training: Need::new(
                "Take the Cybersecurity Awareness Training at {{SecurityTrainingURL}}",
            ),
            training_proof: Need::new(
                "Upload proof of training completion to https://app.secureframe.com/onboard/employee/training (PDF or screenshot)",
            ),
        }
    }
}

impl NeedCatalog {
    /// Training and proof of training are always requested together.
    fn push_training(&self, needs: &mut Vec<Need>) {
        needs.push(self.security_training.clone());
        needs.push(self.training_proof.clone());
    }
}

/// Lower-cased employee types that are subject to reminders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredTypeSet(BTreeSet<String>);

impl RequiredTypeSet {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            types
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        )
    }

    /// Parse a comma-separated list such as `employee,contractor`.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn contains(&self, employee_type: &str) -> bool {
        self.0.contains(&employee_type.trim().to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Which record fields decide what a person still needs to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvaluationMode {
    /// Per-person `policies_accepted` / `security_training_completed` flags.
    #[default]
    Detailed,
    /// Aggregate `personnel_status` and `onboarding_status` strings.
    Aggregate,
}

impl EvaluationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Detailed => "detailed",
            Self::Aggregate => "aggregate",
        }
    }
}

impl FromStr for EvaluationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "detailed" => Ok(Self::Detailed),
            "aggregate" => Ok(Self::Aggregate),
            other => Err(format!("unknown evaluation mode: {other}")),
        }
    }
}

/// Outcome of evaluating one record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Evaluation {
    pub eligible: bool,
    pub needs: Vec<Need>,
}

impl Evaluation {
    /// In scope and owing at least one need.
    pub fn should_notify(&self) -> bool {
        self.eligible && !self.needs.is_empty()
    }
}

/// Pure decision logic over [`PersonRecord`]s.
#[derive(Debug, Clone)]
pub struct ComplianceFilter {
    required: RequiredTypeSet,
    catalog: NeedCatalog,
    mode: EvaluationMode,
}

impl ComplianceFilter {
    pub fn new(required: RequiredTypeSet, mode: EvaluationMode) -> Self {
        Self {
            required,
            catalog: NeedCatalog::default(),
            mode,
        }
    }

    pub fn with_catalog(mut self, catalog: NeedCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn mode(&self) -> EvaluationMode {
        self.mode
    }

    pub fn required_types(&self) -> &RequiredTypeSet {
        &self.required
    }

    /// Decide whether `record` is in scope and list what it still owes,
    /// in detection order.
    pub fn evaluate(&self, record: &PersonRecord) -> Evaluation {
        let eligible = record.active
            && record.invited
            && record.in_audit_scope
            && self.required.contains(&record.employee_type);

        let needs = match self.mode {
            EvaluationMode::Detailed => self.detailed_needs(record),
            EvaluationMode::Aggregate => self.aggregate_needs(record),
        };

        Evaluation { eligible, needs }
    }

    fn detailed_needs(&self, record: &PersonRecord) -> Vec<Need> {
        let mut needs = Vec::new();
        if !record.policies_accepted {
            needs.push(self.catalog.policy_acceptance.clone());
        }
        if !record.security_training_completed {
            self.catalog.push_training(&mut needs);
        }
        needs
    }

    fn aggregate_needs(&self, record: &PersonRecord) -> Vec<Need> {
        if record.personnel_status.as_deref() == Some(ALL_TASKS_COMPLETED) {
            return Vec::new();
        }

        let mut needs = Vec::new();
        match record.onboarding_status.as_deref() {
            Some("not_started") => {
                needs.push(self.catalog.policy_acceptance.clone());
                self.catalog.push_training(&mut needs);
            }
            Some("security_training") => self.catalog.push_training(&mut needs),
            _ => {}
        }
        needs
    }
}
