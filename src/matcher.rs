//! Reference resolution for DONE/CANCEL targets
//!
//! Maps a numeric or free-text reference to one stored reminder. Multiple
//! text matches are reported back as candidates, never picked silently.

use crate::error::Result;
use crate::intent::Target;
use crate::store::{Reminder, ReminderStore};

/// Outcome of resolving a reference
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched(Reminder),
    NotFound,
    Ambiguous(Vec<Reminder>),
}

/// Resolve `target` among `owner`'s reminders.
///
/// Numeric references return the row whatever its status, so that a repeat
/// DONE surfaces as "already done" downstream rather than "not found".
/// Text references match pending reminders only.
pub fn resolve(store: &ReminderStore, owner: &str, target: &Target) -> Result<MatchOutcome> {
    match target {
        Target::Id(id) => match store.get(owner, *id)? {
            Some(reminder) => Ok(MatchOutcome::Matched(reminder)),
            None => Ok(MatchOutcome::NotFound),
        },
        Target::Text(needle) => {
            let needle = needle.trim();
            if needle.is_empty() {
                return Ok(MatchOutcome::NotFound);
            }
            let mut matches = store.match_text(owner, needle)?;
            match matches.len() {
                0 => Ok(MatchOutcome::NotFound),
                1 => Ok(MatchOutcome::Matched(matches.remove(0))),
                _ => Ok(MatchOutcome::Ambiguous(matches)),
            }
        }
    }
}
