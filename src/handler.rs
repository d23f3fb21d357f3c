//! Inbound message handling
//!
//! Classifies one already-transcribed message, applies the store operation,
//! and renders the plain-text reply. Delivery of the reply is the caller's
//! concern.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::intent::{classify, Intent, Target, UnknownReason};
use crate::matcher::{self, MatchOutcome};
use crate::store::{NewReminder, Reminder, ReminderStore, Source, Status};
use crate::timeparse::{day_window, TimeResolver};
use chrono::{DateTime, Utc};
use tracing::info;

const HELP_TEXT: &str = "I didn't understand that. Try:\n\
    - Remind me to <task> at <time>\n\
    - LIST (today) or LIST ALL\n\
    - DONE #<number> or DONE <words>\n\
    - CANCEL #<number> or CANCEL <words>";

/// Handles inbound messages against one store
pub struct MessageHandler<'a> {
    store: &'a ReminderStore,
    resolver: TimeResolver,
    config: &'a Config,
}

impl<'a> MessageHandler<'a> {
    pub fn new(store: &'a ReminderStore, config: &'a Config) -> Self {
        Self {
            store,
            resolver: TimeResolver::new(config.timezone, config.evening_hour, config.afternoon_hours),
            config,
        }
    }

    /// Handle one message and produce the reply text
    pub fn handle(
        &self,
        sender: &str,
        raw_text: &str,
        source: Source,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let text = raw_text.trim();
        if text.is_empty() {
            return Ok("I didn't receive any text. Send me a reminder!".to_string());
        }

        let owner = self.acting_owner(sender);

        match classify(text, &self.resolver, now) {
            Intent::Create { text: body, due_at } => {
                self.create(sender, &owner, body, due_at, source, now)
            }
            Intent::ListToday => self.list_today(&owner, now),
            Intent::ListAll => self.list_all(&owner),
            Intent::Done(target) => self.close(&owner, &target, Status::Done, now),
            Intent::Cancel(target) => self.close(&owner, &target, Status::Cancelled, now),
            Intent::Unknown(reason) => Ok(unknown_reply(reason)),
        }
    }

    /// Identity whose reminders the sender acts on: circle members act on
    /// the configured owner, everyone else on themselves.
    fn acting_owner(&self, sender: &str) -> String {
        if let Some(owner) = &self.config.owner {
            if self.config.circle.iter().any(|member| member == sender) {
                return owner.clone();
            }
        }
        sender.to_string()
    }

    fn create(
        &self,
        sender: &str,
        owner: &str,
        body: String,
        due_at: DateTime<Utc>,
        source: Source,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let reminder = self.store.create(
            &NewReminder {
                created_by: sender.to_string(),
                for_user: owner.to_string(),
                text: body,
                due_at,
                source,
            },
            now,
        )?;

        info!(id = reminder.id, owner = %owner, "reminder created");
        Ok(format!(
            "Added reminder #{}\n\"{}\"\nDue: {}",
            reminder.id,
            reminder.text,
            self.when_str(reminder.due_at, now)
        ))
    }

    fn list_today(&self, owner: &str, now: DateTime<Utc>) -> Result<String> {
        let today = now.with_timezone(&self.config.timezone).date_naive();
        let (start, end) = day_window(self.config.timezone, today);
        let reminders = self.store.list_window(owner, start, end)?;

        Ok(self.render_list("Today's reminders", &reminders, false))
    }

    fn list_all(&self, owner: &str) -> Result<String> {
        let reminders = self.store.list_pending(owner)?;
        Ok(self.render_list("All pending reminders", &reminders, true))
    }

    fn render_list(&self, title: &str, reminders: &[Reminder], with_day: bool) -> String {
        if reminders.is_empty() {
            return format!("{}\n\nNothing here!", title);
        }

        let tz = self.config.timezone;
        let mut out = format!("{}\n\n", title);
        for reminder in reminders {
            let due_local = reminder.due_at.with_timezone(&tz);
            let when = if with_day {
                due_local.format("%a %d %b %H:%M").to_string()
            } else {
                due_local.format("%H:%M").to_string()
            };
            out.push_str(&format!("#{} {} - {}\n", reminder.id, reminder.text, when));
        }
        out.push_str("\nReply DONE #<number> to mark one complete");
        out
    }

    fn close(
        &self,
        owner: &str,
        target: &Target,
        new_status: Status,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let reminder = match matcher::resolve(self.store, owner, target)? {
            MatchOutcome::NotFound => {
                return Ok("Reminder not found. Try LIST to see your reminders.".to_string());
            }
            MatchOutcome::Ambiguous(candidates) => {
                let mut reply = String::from("That matches more than one reminder:\n");
                for candidate in &candidates {
                    reply.push_str(&format!("#{} {}\n", candidate.id, candidate.text));
                }
                reply.push_str("Reply with the number, e.g. DONE #");
                reply.push_str(&candidates[0].id.to_string());
                return Ok(reply);
            }
            MatchOutcome::Matched(reminder) => reminder,
        };

        match self.store.transition(owner, reminder.id, new_status, now) {
            Ok(updated) => {
                let verb = if new_status == Status::Done {
                    "Completed"
                } else {
                    "Cancelled"
                };
                info!(id = updated.id, owner = %owner, status = %updated.status, "reminder closed");
                Ok(format!("{} reminder #{}\n\"{}\"", verb, updated.id, updated.text))
            }
            Err(Error::IllegalTransition { id, from, .. }) => {
                Ok(format!("Reminder #{} is already {}.", id, from))
            }
            Err(e) => Err(e),
        }
    }

    /// Human-readable due time relative to the reference "now"
    fn when_str(&self, due_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
        let tz = self.config.timezone;
        let due_local = due_at.with_timezone(&tz);
        let today = now.with_timezone(&tz).date_naive();

        if due_local.date_naive() == today {
            format!("Today {}", due_local.format("%H:%M"))
        } else if Some(due_local.date_naive()) == today.succ_opt() {
            format!("Tomorrow {}", due_local.format("%H:%M"))
        } else {
            due_local.format("%a %d %b %H:%M").to_string()
        }
    }
}

fn unknown_reply(reason: UnknownReason) -> String {
    match reason {
        UnknownReason::MissingText => {
            "I got the time but not the task. What should I remind you about?".to_string()
        }
        UnknownReason::NoTimeFound => {
            "I couldn't work out when to remind you. Try something like \"tomorrow at 9am\"."
                .to_string()
        }
        UnknownReason::Unrecognized => HELP_TEXT.to_string(),
    }
}
