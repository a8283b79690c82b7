//! The reminder run: fetch, filter, gate, compose, deliver.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::compose::{ComposerSettings, MessageComposer, MessageContext};
use crate::error::{FetchError, ReminderError};
use crate::filter::{ComplianceFilter, Need};
use crate::record::PersonRecord;
use crate::source::{NotificationSink, PersonnelSource};
use crate::window::ReminderCalendar;

/// Delay between delivery attempts, to stay under chat rate limits.
pub const DEFAULT_PACING: Duration = Duration::from_millis(250);

/// Run-wide switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Compose and log messages without delivering them.
    pub dry_run: bool,
    /// Send only the first reminder, to this address, then stop.
    pub test_recipient: Option<String>,
    /// When set, only people inside one of their reminder windows are nagged.
    pub calendar: Option<ReminderCalendar>,
    pub pacing: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            test_recipient: None,
            calendar: None,
            pacing: DEFAULT_PACING,
        }
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub roster: usize,
    pub eligible: usize,
    pub noncompliant: usize,
    pub outside_window: usize,
    pub delivered: usize,
    pub dry_run: usize,
    pub failed: usize,
}

enum Outcome {
    Delivered,
    DryRun,
}

/// Drives one pass over the roster.
pub struct Coordinator<R = StdRng> {
    config: RunConfig,
    filter: ComplianceFilter,
    settings: ComposerSettings,
    composer: MessageComposer<R>,
}

impl<R: Rng> Coordinator<R> {
    pub fn new(
        config: RunConfig,
        filter: ComplianceFilter,
        settings: ComposerSettings,
        composer: MessageComposer<R>,
    ) -> Self {
        Self {
            config,
            filter,
            settings,
            composer,
        }
    }

    /// Process the whole roster once, as of `now`.
    ///
    /// Only a roster fetch failure is returned as an error. Anything that goes
    /// wrong for an individual recipient is logged and counted in
    /// [`RunSummary::failed`].
    pub async fn run(
        &mut self,
        source: &dyn PersonnelSource,
        sink: &dyn NotificationSink,
        now: DateTime<Utc>,
    ) -> Result<RunSummary, FetchError> {
        let roster = source.fetch_roster().await?;
        info!(
            count = roster.len(),
            mode = self.filter.mode().as_str(),
            dry_run = self.config.dry_run,
            "fetched personnel roster"
        );

        let mut summary = RunSummary {
            roster: roster.len(),
            ..Default::default()
        };
        let mut attempted = false;

        for record in &roster {
            let eval = self.filter.evaluate(record);
            if !eval.eligible {
                continue;
            }
            summary.eligible += 1;
            if eval.needs.is_empty() {
                continue;
            }
            summary.noncompliant += 1;

            if !self.in_reminder_window(record, now) {
                summary.outside_window += 1;
                continue;
            }

            info!(
                email = %record.email,
                needs = ?eval.needs.iter().map(Need::template).collect::<Vec<_>>(),
                "noncompliant"
            );

            if attempted {
                tokio::time::sleep(self.config.pacing).await;
            }
            attempted = true;

            let email = self
                .config
                .test_recipient
                .clone()
                .unwrap_or_else(|| record.email.clone());

            match self.remind(sink, record, &email, eval.needs).await {
                Ok(Outcome::Delivered) => summary.delivered += 1,
                Ok(Outcome::DryRun) => summary.dry_run += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(email = %record.email, recipient = %email, error = %e, "failed to send reminder");
                }
            }

            if self.config.test_recipient.is_some() {
                info!(recipient = %email, "sent test message, stopping");
                break;
            }
        }

        info!(
            roster = summary.roster,
            eligible = summary.eligible,
            noncompliant = summary.noncompliant,
            outside_window = summary.outside_window,
            delivered = summary.delivered,
            dry_run = summary.dry_run,
            failed = summary.failed,
            "run complete"
        );
        Ok(summary)
    }

    fn in_reminder_window(&self, record: &PersonRecord, now: DateTime<Utc>) -> bool {
        let Some(calendar) = &self.config.calendar else {
            return true;
        };
        match calendar.window_at(record.invited_at, now) {
            Ok(Some((index, window))) => {
                debug!(email = %record.email, index, start = %window.start, end = %window.end, "inside reminder window");
                true
            }
            Ok(None) => {
                debug!(email = %record.email, "outside reminder windows");
                false
            }
            Err(e) => {
                warn!(email = %record.email, error = %e, "cannot schedule reminder");
                false
            }
        }
    }

    async fn remind(
        &mut self,
        sink: &dyn NotificationSink,
        record: &PersonRecord,
        email: &str,
        needs: Vec<Need>,
    ) -> Result<Outcome, ReminderError> {
        let recipient = sink.resolve_recipient(email).await?;
        debug!(email, id = %recipient.id, "resolved recipient");

        let first_name = recipient
            .first_name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| record.first_name().to_string());
        let text = self
            .composer
            .compose(MessageContext::new(&self.settings, email, first_name, needs))?;
        info!(email, %text, "composed reminder");

        if self.config.dry_run {
            info!(email, "dry run, not delivering");
            return Ok(Outcome::DryRun);
        }
        sink.deliver(&recipient, &text).await?;
        Ok(Outcome::Delivered)
    }
}
