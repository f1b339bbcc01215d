//! Single-slot registry for active sessions.
//!
//! At most one alarm may be ringing and one timer counting down at any
//! time. The slots are owned optional handles; claiming an occupied slot
//! is a typed conflict, never a silent overwrite. A second trigger for an
//! alarm that is already ringing is rejected here and ignored upstream.

use std::fmt;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use super::ringing::RingingSession;
use super::timer::TimerSession;
use crate::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Alarm,
    Timer,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Alarm => write!(f, "alarm"),
            SessionKind::Timer => write!(f, "timer"),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireError {
    #[error("a {kind} session is already active (id {active_id})")]
    Busy { kind: SessionKind, active_id: i64 },
}

/// The two live-session slots.
#[derive(Default)]
pub struct ActiveSessions {
    ringing: Mutex<Option<Arc<RingingSession>>>,
    timer: Mutex<Option<Arc<TimerSession>>>,
}

impl ActiveSessions {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Ringing slot ─────────────────────────────────────────────────

    pub fn install_ringing(&self, session: Arc<RingingSession>) -> Result<(), AcquireError> {
        let mut slot = lock(&self.ringing);
        if let Some(active) = slot.as_ref() {
            return Err(AcquireError::Busy {
                kind: SessionKind::Alarm,
                active_id: active.alarm_id(),
            });
        }
        *slot = Some(session);
        Ok(())
    }

    pub fn ringing(&self) -> Option<Arc<RingingSession>> {
        lock(&self.ringing).clone()
    }

    /// Remove and return the ringing session. Atomic, so concurrent
    /// dismissers converge: only one caller gets the handle.
    pub fn take_ringing(&self) -> Option<Arc<RingingSession>> {
        lock(&self.ringing).take()
    }

    /// Release only if `session` still occupies the slot.
    pub fn release_ringing(&self, session: &Arc<RingingSession>) {
        let mut slot = lock(&self.ringing);
        if slot.as_ref().is_some_and(|s| Arc::ptr_eq(s, session)) {
            *slot = None;
        }
    }

    // ── Timer slot ───────────────────────────────────────────────────

    pub fn install_timer(&self, session: Arc<TimerSession>) -> Result<(), AcquireError> {
        let mut slot = lock(&self.timer);
        if let Some(active) = slot.as_ref() {
            return Err(AcquireError::Busy {
                kind: SessionKind::Timer,
                active_id: active.timer_id(),
            });
        }
        *slot = Some(session);
        Ok(())
    }

    pub fn timer(&self) -> Option<Arc<TimerSession>> {
        lock(&self.timer).clone()
    }

    pub fn take_timer(&self) -> Option<Arc<TimerSession>> {
        lock(&self.timer).take()
    }

    pub fn release_timer(&self, session: &Arc<TimerSession>) {
        let mut slot = lock(&self.timer);
        if slot.as_ref().is_some_and(|s| Arc::ptr_eq(s, session)) {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::TriggerPayload;

    #[test]
    fn second_ringing_install_is_a_typed_conflict() {
        let sessions = ActiveSessions::new();
        let first = Arc::new(RingingSession::new(TriggerPayload::main(1)));
        let second = Arc::new(RingingSession::new(TriggerPayload::main(2)));

        sessions.install_ringing(first).expect("first install");
        let err = sessions.install_ringing(second).expect_err("must conflict");
        assert_eq!(
            err,
            AcquireError::Busy {
                kind: SessionKind::Alarm,
                active_id: 1
            }
        );
    }

    #[test]
    fn take_is_atomic() {
        let sessions = ActiveSessions::new();
        let session = Arc::new(RingingSession::new(TriggerPayload::main(1)));
        sessions.install_ringing(session).expect("install");

        assert!(sessions.take_ringing().is_some());
        assert!(sessions.take_ringing().is_none());
    }

    #[test]
    fn release_ignores_stale_handles() {
        let sessions = ActiveSessions::new();
        let stale = Arc::new(RingingSession::new(TriggerPayload::main(1)));
        sessions.install_ringing(Arc::clone(&stale)).expect("install");
        assert!(sessions.take_ringing().is_some());

        let fresh = Arc::new(RingingSession::new(TriggerPayload::main(2)));
        sessions.install_ringing(Arc::clone(&fresh)).expect("install");
        // Releasing with the stale handle must not evict the fresh session.
        sessions.release_ringing(&stale);
        assert!(sessions.ringing().is_some());
        sessions.release_ringing(&fresh);
        assert!(sessions.ringing().is_none());
    }
}
