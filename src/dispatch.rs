//! Time-driven nudge and digest dispatch
//!
//! Each tick is a pure read of stored markers followed by guarded marker
//! writes, so ticks are idempotent and a restart that missed ticks still
//! fires anything overdue exactly once.

use crate::error::Result;
use crate::notify::{format_digest, format_nudge, Notifier};
use crate::store::ReminderStore;
use crate::timeparse::day_window;
use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

/// Counts of what a single tick sent
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub nudges: usize,
    pub digests: usize,
}

/// Periodic dispatcher over the store. The clock is a parameter of `tick`,
/// never read internally, so tests drive synthetic time.
pub struct NudgeDispatcher<'a> {
    store: &'a ReminderStore,
    notifier: &'a dyn Notifier,
    tz: Tz,
    digest_hour: u32,
}

impl<'a> NudgeDispatcher<'a> {
    pub fn new(store: &'a ReminderStore, notifier: &'a dyn Notifier, tz: Tz, digest_hour: u32) -> Self {
        Self {
            store,
            notifier,
            tz,
            digest_hour,
        }
    }

    /// One idempotent pass: fire newly due nudges, then any owed digests
    pub fn tick(&self, now: DateTime<Utc>) -> Result<TickSummary> {
        Ok(TickSummary {
            nudges: self.fire_due_nudges(now)?,
            digests: self.fire_digests(now)?,
        })
    }

    fn fire_due_nudges(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut sent = 0;

        for reminder in self.store.due_for_nudge(now)? {
            // Marker first: a racing DONE or second tick must never cause a
            // second send, even if this send then fails.
            match self.store.mark_nudged(reminder.id, now) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    warn!(id = reminder.id, error = %e, "failed to mark nudge, skipping");
                    continue;
                }
            }

            let message = format_nudge(&reminder, self.tz);
            if let Err(e) = self.notifier.send(&reminder.for_user, &message) {
                warn!(id = reminder.id, error = %e, "nudge delivery failed; marker stands");
            }
            info!(id = reminder.id, owner = %reminder.for_user, "nudge fired");
            sent += 1;
        }

        Ok(sent)
    }

    fn fire_digests(&self, now: DateTime<Utc>) -> Result<usize> {
        let local = now.with_timezone(&self.tz);
        if local.hour() < self.digest_hour {
            return Ok(0);
        }

        let today = local.date_naive();
        let (start, end) = day_window(self.tz, today);
        let mut sent = 0;

        for owner in self.store.owners_with_pending()? {
            let batch = match self.store.digest_candidates(&owner, start, end, today) {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(owner = %owner, error = %e, "digest query failed, skipping owner");
                    continue;
                }
            };
            if batch.is_empty() {
                continue;
            }

            for reminder in &batch {
                if let Err(e) = self.store.mark_digested(reminder.id, today) {
                    warn!(id = reminder.id, error = %e, "failed to mark digest");
                }
            }

            let message = format_digest(today, &batch, self.tz);
            if let Err(e) = self.notifier.send(&owner, &message) {
                warn!(owner = %owner, error = %e, "digest delivery failed; markers stand");
            }
            info!(owner = %owner, count = batch.len(), "digest sent");
            sent += 1;
        }

        Ok(sent)
    }
}
