//! Outbound notification delivery
//!
//! The delivery seam between the dispatcher and the outside world. Sends are
//! fire-and-forget from the core's perspective: the caller logs failures and
//! never retries, because the duplicate-send risk is worse than a missed one.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::Reminder;
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::path::PathBuf;
use std::process::Command;
use tracing::info;

/// Delivery collaborator for nudges and digests
pub trait Notifier {
    fn send(&self, owner: &str, message: &str) -> Result<()>;
}

/// Spawns a configured command: `<cmd> <owner> <message>`
pub struct CommandNotifier {
    cmd: PathBuf,
}

impl CommandNotifier {
    pub fn new(cmd: PathBuf) -> Self {
        Self { cmd }
    }
}

impl Notifier for CommandNotifier {
    fn send(&self, owner: &str, message: &str) -> Result<()> {
        let output = Command::new(&self.cmd)
            .arg(owner)
            .arg(message)
            .output()
            .map_err(|e| Error::Notify(format!("spawn {}: {}", self.cmd.display(), e)))?;

        if !output.status.success() {
            return Err(Error::Notify(format!(
                "{} failed: {}",
                self.cmd.display(),
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }
}

/// POSTs JSON `{"to": owner, "body": message}` to a webhook
pub struct WebhookNotifier {
    client: reqwest::blocking::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            url,
        }
    }
}

impl Notifier for WebhookNotifier {
    fn send(&self, owner: &str, message: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "to": owner, "body": message }))
            .send()
            .map_err(|e| Error::Notify(format!("webhook: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Notify(format!(
                "webhook returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Logs instead of delivering; used when no delivery target is configured
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, owner: &str, message: &str) -> Result<()> {
        info!(owner = %owner, "notification (no delivery target configured): {}", message);
        Ok(())
    }
}

/// Pick the notifier the config asks for
pub fn from_config(config: &Config) -> Box<dyn Notifier> {
    if let Some(cmd) = &config.notify_cmd {
        Box::new(CommandNotifier::new(cmd.clone()))
    } else if let Some(url) = &config.webhook_url {
        Box::new(WebhookNotifier::new(url.clone()))
    } else {
        Box::new(LogNotifier)
    }
}

/// Message for a single due reminder
pub fn format_nudge(reminder: &Reminder, tz: Tz) -> String {
    format!(
        "Reminder: {}\nDue: {}",
        reminder.text,
        reminder.due_at.with_timezone(&tz).format("%H:%M")
    )
}

/// Message for one owner's daily digest, reminders already ordered
pub fn format_digest(date: NaiveDate, reminders: &[Reminder], tz: Tz) -> String {
    let mut out = format!("Daily digest - {}\n\n", date.format("%A %-d %B"));
    for (i, reminder) in reminders.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} - {}\n",
            i + 1,
            reminder.text,
            reminder.due_at.with_timezone(&tz).format("%H:%M")
        ));
    }
    out.push_str("\nReply DONE <number> to mark one complete");
    out
}
