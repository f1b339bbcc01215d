//! Active sessions: ringing alarms and running timers.
//!
//! Everything a session needs -- store, presentation sink, effect devices,
//! clock, scheduler and the single-slot registry -- travels in one
//! [`SessionContext`]. Sessions never reach for ambient state.

mod registry;
mod ringing;
mod timer;

pub use registry::{AcquireError, ActiveSessions, SessionKind};
pub use ringing::{RingOutcome, RingingSession};
pub use timer::{pause_timer, stop_timer, TimerSession};

use std::sync::Arc;

use tracing::debug;

use crate::clock::Clock;
use crate::effects::{FlashDevice, SoundDevice, VibrationDevice};
use crate::error::CoreError;
use crate::platform::{AlertSink, RecordStore, TriggerPayload};
use crate::scheduler::AlarmScheduler;

/// Shared dependencies for every session.
pub struct SessionContext {
    pub store: Arc<dyn RecordStore>,
    pub sink: Arc<dyn AlertSink>,
    pub sound: Arc<dyn SoundDevice>,
    pub vibration: Arc<dyn VibrationDevice>,
    pub flash: Arc<dyn FlashDevice>,
    pub clock: Arc<dyn Clock>,
    pub scheduler: Arc<AlarmScheduler>,
    pub sessions: ActiveSessions,
}

/// React to a fired trigger: look the alarm up and start it ringing.
///
/// Returns `None` without ringing when the record has been deleted since
/// scheduling (a benign stale firing) or when the alarm is already ringing
/// (the trigger is ignored, not queued). Must run inside a tokio runtime.
pub fn handle_trigger(
    ctx: &Arc<SessionContext>,
    payload: TriggerPayload,
) -> Result<Option<Arc<RingingSession>>, CoreError> {
    let Some(alarm) = ctx.store.get_alarm(payload.alarm_id)? else {
        debug!(alarm_id = payload.alarm_id, "trigger for missing alarm ignored");
        return Ok(None);
    };

    let session = Arc::new(RingingSession::new(payload));
    if let Err(err) = ctx.sessions.install_ringing(Arc::clone(&session)) {
        debug!(alarm_id = payload.alarm_id, %err, "trigger ignored");
        return Ok(None);
    }
    session.ring(ctx, &alarm);
    Ok(Some(session))
}

/// Dismiss the currently-ringing alarm, if any. Converges when racing
/// another dismisser: only one caller gets the session.
pub fn dismiss_ringing(ctx: &Arc<SessionContext>) -> Result<bool, CoreError> {
    match ctx.sessions.take_ringing() {
        Some(session) => {
            session.dismiss(ctx)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Snooze the currently-ringing alarm, if any.
pub fn snooze_ringing(ctx: &Arc<SessionContext>) -> Result<Option<RingOutcome>, CoreError> {
    match ctx.sessions.take_ringing() {
        Some(session) => Ok(Some(session.snooze(ctx)?)),
        None => Ok(None),
    }
}
