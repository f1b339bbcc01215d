//! Error types for reveille-core.
//!
//! One enum per subsystem, rolled up into [`CoreError`] at the crate
//! boundary. Precondition violations (timer start/pause/resume) reject
//! synchronously and mutate nothing; effect-device failures are a separate
//! lightweight type that is always caught and logged at the call site.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for reveille-core.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("scheduling error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("timer error: {0}")]
    Timer(#[from] TimerError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the alarm scheduling protocol.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// Exact scheduling is not authorized. Surfaced to the caller,
    /// never retried automatically.
    #[error("exact alarm scheduling permission not granted")]
    PermissionDenied,

    #[error("timer facility error: {0}")]
    Facility(#[from] FacilityError),
}

/// Errors reported by an exact-timer facility implementation.
#[derive(Error, Debug)]
pub enum FacilityError {
    #[error("facility slot capacity exhausted")]
    CapacityExhausted,

    #[error("trigger instant {0} is already in the past")]
    PastTrigger(i64),

    #[error("{0}")]
    Other(String),
}

/// Precondition violations on timer session operations.
#[derive(Error, Debug)]
pub enum TimerError {
    #[error("timer {running_id} is already running")]
    AlreadyRunning { running_id: i64 },

    #[error("timer is not running")]
    NotRunning,

    #[error("timer is not paused")]
    NotPaused,

    #[error("timer duration must be positive")]
    InvalidDuration,

    #[error("timer not found: {0}")]
    NotFound(i64),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Record store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to open database at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("query failed: {0}")]
    Query(String),

    #[error("record not found")]
    NotFound,
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    #[error("failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    #[error("failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// A single effect device failing to start or adjust.
///
/// Never propagated out of a ringing or alert sequence: the caller logs it
/// and carries on with the remaining effects.
#[derive(Error, Debug)]
#[error("{device} device: {message}")]
pub struct EffectError {
    pub device: &'static str,
    pub message: String,
}

impl EffectError {
    pub fn new(device: &'static str, message: impl Into<String>) -> Self {
        Self {
            device,
            message: message.into(),
        }
    }
}

/// Result type alias for CoreError.
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
