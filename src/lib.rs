//! Nudge Assistant - reminder interpretation and scheduling engine
//!
//! Parses natural-language messages into reminders, tracks their lifecycle,
//! and turns wall-clock time into due nudges plus a once-daily digest.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod intent;
pub mod matcher;
pub mod notify;
pub mod store;
pub mod timeparse;

pub use error::{Error, Result};
