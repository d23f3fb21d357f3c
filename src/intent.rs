//! Intent classification for inbound messages
//!
//! Decides what a normalized message asks for: create a reminder, list,
//! complete, cancel, or nothing recognizable. Matching is case-insensitive;
//! body text keeps its original casing.

use crate::timeparse::{TimeMatch, TimeResolver};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// What a message asks for
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Create { text: String, due_at: DateTime<Utc> },
    ListToday,
    ListAll,
    Done(Target),
    Cancel(Target),
    Unknown(UnknownReason),
}

/// A DONE/CANCEL reference: "#123"/"123" or free text to match
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Id(i64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownReason {
    MissingText,
    NoTimeFound,
    Unrecognized,
}

/// Imperative cues that open a CREATE, longest first
const CREATE_CUES: &[&str] = &[
    "remind me to",
    "remind me",
    "reminder:",
    "set reminder to",
    "set reminder",
    "don't forget to",
    "don't forget",
    "remember to",
];

const DONE_WORDS: &[&str] = &["done", "complete", "completed", "finished", "tick off"];
const CANCEL_WORDS: &[&str] = &["cancel", "delete", "remove", "nevermind"];

static ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#?(\d+)$").unwrap());

/// Classify one message. Explicit cues are checked before command words;
/// the bare time-clause form of CREATE is checked last so that command
/// words containing day words ("what's today") keep their meaning.
pub fn classify(message: &str, resolver: &TimeResolver, now: DateTime<Utc>) -> Intent {
    let message = message.trim();
    let lower = message.to_lowercase();

    for cue in CREATE_CUES {
        if let Some(rest) = strip_prefix_word(&lower, message, cue) {
            return create_intent(rest, resolver, now);
        }
    }

    if lower == "list all" || lower.starts_with("list all ") {
        return Intent::ListAll;
    }
    if lower == "list"
        || lower.starts_with("list ")
        || lower.starts_with("what's today")
        || lower.starts_with("whats today")
    {
        return Intent::ListToday;
    }

    for word in DONE_WORDS {
        if let Some(rest) = strip_prefix_word(&lower, message, word) {
            return Intent::Done(parse_target(rest));
        }
    }
    for word in CANCEL_WORDS {
        if let Some(rest) = strip_prefix_word(&lower, message, word) {
            return Intent::Cancel(parse_target(rest));
        }
    }

    // Bare phrasing: a time clause with no cue still reads as a reminder
    if let Some(TimeMatch { due_at, leftover }) = resolver.resolve(message, now) {
        let text = leftover.trim();
        if !text.is_empty() {
            return Intent::Create {
                text: text.to_string(),
                due_at,
            };
        }
    }

    Intent::Unknown(UnknownReason::Unrecognized)
}

fn create_intent(body: &str, resolver: &TimeResolver, now: DateTime<Utc>) -> Intent {
    match resolver.resolve(body, now) {
        Some(TimeMatch { due_at, leftover }) => {
            let text = leftover.trim();
            if text.is_empty() {
                Intent::Unknown(UnknownReason::MissingText)
            } else {
                Intent::Create {
                    text: text.to_string(),
                    due_at,
                }
            }
        }
        None => Intent::Unknown(UnknownReason::NoTimeFound),
    }
}

/// Match `prefix` at the start of the message on a word boundary and return
/// the remainder from the original-cased text.
fn strip_prefix_word<'a>(lower: &str, original: &'a str, prefix: &str) -> Option<&'a str> {
    if !lower.starts_with(prefix) {
        return None;
    }
    let rest = &lower[prefix.len()..];
    if !rest.is_empty() && !rest.starts_with([' ', ':', ',', '#']) && !prefix.ends_with(':') {
        return None;
    }
    Some(original[prefix.len()..].trim_start_matches([':', ',', ' ']).trim())
}

fn parse_target(rest: &str) -> Target {
    let rest = rest.trim();
    if let Some(cap) = ID_RE.captures(rest) {
        if let Ok(id) = cap[1].parse::<i64>() {
            return Target::Id(id);
        }
    }
    Target::Text(rest.to_string())
}
