//! Error types for nudge-assistant

use crate::store::Status;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reminder not found: #{0}")]
    NotFound(i64),

    #[error("Illegal status transition for reminder #{id}: {from} -> {to}")]
    IllegalTransition { id: i64, from: Status, to: Status },

    #[error("Notify error: {0}")]
    Notify(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
