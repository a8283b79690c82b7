//! Recurring reminder windows anchored to a person's invitation date.
//!
//! Each person gets a short eligibility window roughly once a year, staggered
//! by their own anchor date, so a run only nags the slice of the noncompliant
//! roster whose window is currently open.
//!
//! # Layout
//!
//! With the defaults (period 354 days, width 10 days, lead 2 cycles, 5 windows):
//!
//! ```text
//! anchor ──354d──> (skipped) ──354d──> [start₀, start₀+10d] ──354d──> [start₁, ...] ...
//! ```

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    /// The vendor never recorded an anchor date, so no window can be placed.
    #[error("anchor date is unset")]
    UnsetAnchor,

    #[error("window arithmetic overflowed for anchor {0}")]
    Overflow(DateTime<Utc>),
}

/// An eligibility interval. Only instants with `start < t < end` are inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReminderWindow {
    /// Both boundaries are excluded.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.start < now && now < self.end
    }
}

/// Parameters for generating [`ReminderWindow`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderCalendar {
    /// Distance between consecutive window starts.
    pub period: TimeDelta,
    /// Length of each window.
    pub width: TimeDelta,
    /// Whole periods between the anchor and the first window.
    pub lead_cycles: i32,
    /// Number of windows generated ahead.
    pub count: usize,
}

impl Default for ReminderCalendar {
    fn default() -> Self {
        Self {
            period: TimeDelta::days(354),
            width: TimeDelta::days(10),
            lead_cycles: 2,
            count: 5,
        }
    }
}

impl ReminderCalendar {
    /// Generate `self.count` windows from `anchor`, in chronological order.
    ///
    /// An absent anchor, or one at or before the Unix epoch (how vendors spell
    /// "never"), is rejected with [`WindowError::UnsetAnchor`] rather than
    /// producing windows near the zero instant.
    pub fn windows(
        &self,
        anchor: Option<DateTime<Utc>>,
    ) -> Result<Vec<ReminderWindow>, WindowError> {
        let anchor = match anchor {
            Some(a) if a > DateTime::<Utc>::UNIX_EPOCH => a,
            _ => return Err(WindowError::UnsetAnchor),
        };

        let mut start = self
            .period
            .checked_mul(self.lead_cycles)
            .and_then(|lead| anchor.checked_add_signed(lead))
            .ok_or(WindowError::Overflow(anchor))?;

        // `count` is caller-supplied; grow as windows are produced.
        let mut windows = Vec::new();
        for _ in 0..self.count {
            let end = start
                .checked_add_signed(self.width)
                .ok_or(WindowError::Overflow(anchor))?;
            windows.push(ReminderWindow { start, end });
            start = start
                .checked_add_signed(self.period)
                .ok_or(WindowError::Overflow(anchor))?;
        }
        Ok(windows)
    }

    /// Convenience: generate windows for `anchor` and locate `now` among them.
    pub fn window_at(
        &self,
        anchor: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Option<(usize, ReminderWindow)>, WindowError> {
        let windows = self.windows(anchor)?;
        Ok(in_window(now, &windows))
    }
}

/// First window (in generation order) strictly containing `now`, with its index.
pub fn in_window(now: DateTime<Utc>, windows: &[ReminderWindow]) -> Option<(usize, ReminderWindow)> {
    windows
        .iter()
        .copied()
        .enumerate()
        .find(|(_, w)| w.contains(now))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        "2021-06-15T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn generates_count_windows_with_fixed_spacing() {
        let calendar = ReminderCalendar::default();
        let windows = calendar.windows(Some(t0())).unwrap();
        assert_eq!(windows.len(), 5);
        for w in &windows {
            assert_eq!(w.end - w.start, TimeDelta::days(10));
        }
        for pair in windows.windows(2) {
            assert_eq!(pair[1].start - pair[0].start, TimeDelta::days(354));
        }
    }

    #[test]
    fn first_window_skips_first_anniversary() {
        let windows = ReminderCalendar::default().windows(Some(t0())).unwrap();
        assert_eq!(windows[0].start, t0() + TimeDelta::days(708));
    }

    #[test]
    fn lead_cycles_is_configurable() {
        let calendar = ReminderCalendar {
            lead_cycles: 1,
            ..Default::default()
        };
        let windows = calendar.windows(Some(t0())).unwrap();
        assert_eq!(windows[0].start, t0() + TimeDelta::days(354));
    }

    #[test]
    fn five_days_into_first_window_is_found() {
        let now = t0() + TimeDelta::days(708 + 5);
        let found = ReminderCalendar::default()
            .window_at(Some(t0()), now)
            .unwrap();
        let (index, window) = found.expect("should be in a window");
        assert_eq!(index, 0);
        assert!(window.contains(now));
    }

    #[test]
    fn boundaries_are_exclusive() {
        let windows = ReminderCalendar::default().windows(Some(t0())).unwrap();
        let w = windows[2];
        assert_eq!(in_window(w.start, &windows), None);
        assert_eq!(in_window(w.end, &windows), None);
        assert_eq!(
            in_window(w.start + TimeDelta::days(1), &windows),
            Some((2, w))
        );
    }

    #[test]
    fn between_windows_is_not_found() {
        let now = t0() + TimeDelta::days(708 + 100);
        let found = ReminderCalendar::default()
            .window_at(Some(t0()), now)
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn first_year_is_never_in_window() {
        let calendar = ReminderCalendar::default();
        for day in [1, 5, 354, 355, 360, 700] {
            let now = t0() + TimeDelta::days(day);
            assert_eq!(calendar.window_at(Some(t0()), now), Ok(None), "day {day}");
        }
    }

    #[test]
    fn past_last_window_is_not_found() {
        let calendar = ReminderCalendar::default();
        let windows = calendar.windows(Some(t0())).unwrap();
        let after = windows[4].end + TimeDelta::days(354 + 1);
        assert_eq!(in_window(after, &windows), None);
    }

    #[test]
    fn unset_anchor_is_rejected() {
        let calendar = ReminderCalendar::default();
        assert_eq!(calendar.windows(None), Err(WindowError::UnsetAnchor));
        assert_eq!(
            calendar.windows(Some(DateTime::<Utc>::UNIX_EPOCH)),
            Err(WindowError::UnsetAnchor)
        );
        let vendor_zero: DateTime<Utc> = "0001-01-01T00:00:00Z".parse().unwrap();
        assert_eq!(
            calendar.windows(Some(vendor_zero)),
            Err(WindowError::UnsetAnchor)
        );
    }

    #[test]
    fn zero_count_yields_no_windows() {
        let calendar = ReminderCalendar {
            count: 0,
            ..Default::default()
        };
        assert!(calendar.windows(Some(t0())).unwrap().is_empty());
    }

    #[test]
    fn unbounded_count_overflows_instead_of_panicking() {
        let calendar = ReminderCalendar {
            count: usize::MAX,
            ..Default::default()
        };
        assert_eq!(calendar.windows(Some(t0())), Err(WindowError::Overflow(t0())));
    }
}
