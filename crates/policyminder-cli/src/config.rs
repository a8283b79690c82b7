//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::TimeDelta;
use clap::{Parser, ValueEnum};
use policyminder_core::{
    ComposerSettings, EvaluationMode, ReminderCalendar, RequiredTypeSet, RunConfig,
};

/// Which Secureframe API to read the roster from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Source {
    /// Bearer-token GraphQL API with per-task compliance flags.
    Graphql,
    /// Access-key REST API with aggregate onboarding status.
    Rest,
}

/// Upper bound for `--window-period-days` and `--window-days`.
const MAX_WINDOW_DAYS: i64 = 3650;
/// Upper bound for `--window-lead-cycles` and `--window-count`.
const MAX_WINDOW_CYCLES: i64 = 100;

#[derive(Debug, Parser)]
#[command(
    name = "policyminder",
    version,
    about = "Remind people on Slack about outstanding Secureframe compliance tasks"
)]
pub struct Cli {
    /// Secureframe API to query.
    #[arg(long, env = "POLICYMINDER_SOURCE", value_enum, default_value_t = Source::Graphql)]
    pub source: Source,

    /// Secureframe bearer token (graphql source).
    #[arg(long, env = "SECUREFRAME_TOKEN", hide_env_values = true)]
    pub secureframe_token: Option<String>,

    /// Secureframe company ID (graphql source).
    #[arg(long, env = "SECUREFRAME_COMPANY_ID")]
    pub company_id: Option<String>,

    /// Secureframe company user ID (graphql source).
    #[arg(long, env = "SECUREFRAME_COMPANY_USER_ID")]
    pub company_user_id: Option<String>,

    /// Secureframe API access key (rest source).
    #[arg(long, env = "SECUREFRAME_ACCESS_KEY", hide_env_values = true)]
    pub access_key: Option<String>,

    /// Secureframe API secret key (rest source).
    #[arg(long, env = "SECUREFRAME_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// How outstanding needs are decided: `detailed` or `aggregate`.
    /// Defaults to `detailed` for graphql and `aggregate` for rest.
    #[arg(long, env = "POLICYMINDER_EVALUATION_MODE")]
    pub evaluation_mode: Option<EvaluationMode>,

    /// Comma-separated employee types to contact.
    #[arg(long, env = "POLICYMINDER_EMPLOYEE_TYPES", default_value = "employee,contractor")]
    pub employee_types: String,

    /// Name the robot signs its messages with.
    #[arg(long, env = "POLICYMINDER_ROBOT_NAME", default_value = "ComplyBot3000")]
    pub robot_name: String,

    /// Company display name. Looked up over GraphQL when omitted.
    #[arg(long, env = "POLICYMINDER_COMPANY_NAME")]
    pub company_name: Option<String>,

    /// Where to take the security awareness training.
    #[arg(
        long,
        env = "POLICYMINDER_SECURITY_TRAINING_URL",
        default_value = "https://securityawareness.usalearning.gov/cybersecurity/index.htm"
    )]
    pub security_training_url: String,

    /// Slack channel for questions.
    #[arg(long, env = "POLICYMINDER_HELP_CHANNEL", default_value = "#security-and-compliance")]
    pub help_channel: String,

    /// Compose and log messages without sending them.
    #[arg(long, env = "POLICYMINDER_DRY_RUN")]
    pub dry_run: bool,

    /// Send a single test message to this address instead, then stop.
    #[arg(long, env = "POLICYMINDER_TEST_MESSAGE_TARGET")]
    pub test_message_target: Option<String>,

    /// Only remind people inside one of their yearly reminder windows.
    #[arg(long, env = "POLICYMINDER_REMINDER_WINDOWS")]
    pub reminder_windows: bool,

    /// Days between reminder windows.
    #[arg(long, default_value_t = 354, value_parser = clap::value_parser!(i64).range(1..=MAX_WINDOW_DAYS))]
    pub window_period_days: i64,

    /// Length of each reminder window in days.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(i64).range(1..=MAX_WINDOW_DAYS))]
    pub window_days: i64,

    /// Reminder periods skipped after the invitation date.
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(i32).range(0..=MAX_WINDOW_CYCLES))]
    pub window_lead_cycles: i32,

    /// Number of reminder windows generated ahead.
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..=MAX_WINDOW_CYCLES))]
    pub window_count: u32,

    /// Handlebars message template to use instead of the bundled one.
    #[arg(long, env = "POLICYMINDER_MESSAGE_TEMPLATE")]
    pub message_template: Option<PathBuf>,

    /// Milliseconds to wait between Slack messages.
    #[arg(long, default_value_t = 250)]
    pub pacing_ms: u64,

    /// Slack bot token. Without it, messages are only logged.
    #[arg(long, env = "SLACK_TOKEN", hide_env_values = true)]
    pub slack_token: Option<String>,
}

impl Cli {
    pub fn evaluation_mode(&self) -> EvaluationMode {
        self.evaluation_mode.unwrap_or(match self.source {
            Source::Graphql => EvaluationMode::Detailed,
            Source::Rest => EvaluationMode::Aggregate,
        })
    }

    pub fn required_types(&self) -> RequiredTypeSet {
        RequiredTypeSet::parse(&self.employee_types)
    }

    pub fn slack_token(&self) -> Option<&str> {
        self.slack_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn calendar(&self) -> anyhow::Result<Option<ReminderCalendar>> {
        if !self.reminder_windows {
            return Ok(None);
        }
        let period = TimeDelta::try_days(self.window_period_days)
            .context("--window-period-days is out of range")?;
        let width =
            TimeDelta::try_days(self.window_days).context("--window-days is out of range")?;
        Ok(Some(ReminderCalendar {
            period,
            width,
            lead_cycles: self.window_lead_cycles,
            count: usize::try_from(self.window_count).context("--window-count is out of range")?,
        }))
    }

    /// Run switches. Without a Slack token every run is a dry run.
    pub fn run_config(&self) -> anyhow::Result<RunConfig> {
        Ok(RunConfig {
            dry_run: self.dry_run || self.slack_token().is_none(),
            test_recipient: self.test_message_target.clone().filter(|t| !t.is_empty()),
            calendar: self.calendar()?,
            pacing: Duration::from_millis(self.pacing_ms),
        })
    }

    pub fn composer_settings(&self, company: String) -> ComposerSettings {
        ComposerSettings {
            bot_name: self.robot_name.clone(),
            company,
            security_training_url: self.security_training_url.clone(),
            help_channel: self.help_channel.clone(),
        }
    }
}
