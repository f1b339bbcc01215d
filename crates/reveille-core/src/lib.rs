//! # Reveille Core Library
//!
//! Core business logic for the Reveille alarm clock: trigger-time
//! computation, exact-timer scheduling, alarm ringing sessions and timer
//! countdowns. The CLI binary and any GUI shell are thin layers over this
//! crate.
//!
//! ## Architecture
//!
//! - **Trigger calculation**: pure next-firing arithmetic over an injected
//!   "now" ([`trigger`])
//! - **Scheduling**: cancel-first reservation of main and pre-alarm slots
//!   against an exact-timer facility ([`AlarmScheduler`])
//! - **Sessions**: one ringing alarm and one running timer at a time,
//!   driven by cancellable tokio tasks ([`session`])
//! - **Storage**: SQLite record store and TOML configuration ([`storage`])
//! - **Platform traits**: record store, timer facility, presentation sink
//!   and effect devices are injected, with stub implementations for
//!   headless use ([`platform`], [`effects`])
//!
//! ## Key Components
//!
//! - [`AlarmScheduler`]: scheduling/cancellation protocol
//! - [`RingingSession`] / [`TimerSession`]: the two session state machines
//! - [`reschedule_all`]: post-restart reschedule sweep
//! - [`Database`] / [`Config`]: persistence and configuration

pub mod clock;
pub mod effects;
pub mod error;
pub mod facility;
pub mod model;
pub mod platform;
pub mod reschedule;
pub mod scheduler;
pub mod session;
pub mod slots;
pub mod storage;
pub mod trigger;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{
    ConfigError, CoreError, EffectError, FacilityError, Result, ScheduleError, StoreError,
    TimerError,
};
pub use model::{format_hms, Alarm, Timer, WeekdaySet};
pub use platform::{
    AlertKind, AlertPayload, AlertSink, ExactTimerFacility, RecordStore, SurfaceId, TriggerPayload,
};
pub use reschedule::{reschedule_all, SweepReport};
pub use scheduler::AlarmScheduler;
pub use session::{
    handle_trigger, ActiveSessions, RingOutcome, RingingSession, SessionContext, TimerSession,
};
pub use slots::{RequestId, MAX_PRE_ALARMS};
pub use storage::{Config, Database, MemoryStore};

/// Lock a mutex, recovering the guard if a panicking holder poisoned it.
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
