//! Timer session: one running countdown.
//!
//! ```text
//! Idle -> Running <-> Paused
//! Running -> Finished -> (alert window) -> Stopped
//! any -> Stopped
//! ```
//!
//! The countdown is wall-clock arithmetic over the stored record; a 1 s
//! tick task recomputes the remaining time and publishes it to the
//! presentation sink. Pausing freezes the remaining value and tears the
//! session down; resuming builds a fresh session from the record, with the
//! frozen remaining as the new basis. When the countdown hits zero the
//! session alerts and arms a 60 s window after which it stops itself even
//! if nobody ever dismisses it.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::SessionContext;
use crate::clock::Clock;
use crate::effects::{SoundDevice, VibrationDevice};
use crate::error::{CoreError, TimerError};
use crate::lock;
use crate::model::Timer;
use crate::platform::{AlertKind, AlertPayload, AlertSink, RecordStore, SurfaceId};

const TICK_INTERVAL_MS: u64 = 1000;
/// Ceiling on how long a finished timer may ring unattended.
const ALERT_WINDOW_MS: u64 = 60_000;

const VIBRATION_ON_MS: u64 = 1000;
const VIBRATION_OFF_MS: u64 = 500;

/// One live countdown.
#[derive(Debug)]
pub struct TimerSession {
    timer_id: AtomicI64,
    surface: Mutex<Option<SurfaceId>>,
    tick_task: Mutex<Option<JoinHandle<()>>>,
    alert_task: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl TimerSession {
    fn for_timer(timer_id: i64) -> Self {
        Self {
            timer_id: AtomicI64::new(timer_id),
            surface: Mutex::new(None),
            tick_task: Mutex::new(None),
            alert_task: Mutex::new(None),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn timer_id(&self) -> i64 {
        self.timer_id.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Start a new countdown.
    ///
    /// Fails with [`TimerError::InvalidDuration`] for non-positive
    /// durations and [`TimerError::AlreadyRunning`] while another timer is
    /// running and not paused; neither failure creates a record.
    pub fn start(
        ctx: &Arc<SessionContext>,
        duration_ms: i64,
        label: &str,
        vibrate: bool,
    ) -> Result<Arc<Self>, CoreError> {
        if duration_ms <= 0 {
            return Err(TimerError::InvalidDuration.into());
        }
        ensure_slot_free(ctx)?;

        let session = Arc::new(Self::for_timer(0));
        if let Err(err) = ctx.sessions.install_timer(Arc::clone(&session)) {
            let super::registry::AcquireError::Busy { active_id, .. } = err;
            return Err(TimerError::AlreadyRunning {
                running_id: active_id,
            }
            .into());
        }

        let timer = Timer::new(label, duration_ms, vibrate, ctx.clock.now_ms());
        let id = match ctx.store.insert_timer(&timer) {
            Ok(id) => id,
            Err(err) => {
                ctx.sessions.release_timer(&session);
                return Err(TimerError::from(err).into());
            }
        };
        session.timer_id.store(id, Ordering::SeqCst);

        session.open_surface(ctx, id, label);
        session.publish_progress(ctx, duration_ms, duration_ms, false);
        Self::spawn_tick(&session, ctx);
        info!(timer_id = id, duration_ms, "timer started");
        Ok(session)
    }

    /// Resume a paused timer as a fresh session.
    ///
    /// The remaining time frozen at pause becomes the new countdown basis.
    pub fn resume(ctx: &Arc<SessionContext>, timer_id: i64) -> Result<Arc<Self>, CoreError> {
        let timer = ctx
            .store
            .get_timer(timer_id)?
            .ok_or(TimerError::NotFound(timer_id))?;
        if !timer.paused {
            return Err(TimerError::NotPaused.into());
        }
        ensure_slot_free(ctx)?;

        let session = Arc::new(Self::for_timer(timer_id));
        if let Err(err) = ctx.sessions.install_timer(Arc::clone(&session)) {
            let super::registry::AcquireError::Busy { active_id, .. } = err;
            return Err(TimerError::AlreadyRunning {
                running_id: active_id,
            }
            .into());
        }

        let updated = Timer {
            running: true,
            paused: false,
            started_at_ms: ctx.clock.now_ms(),
            ..timer
        };
        if let Err(err) = ctx.store.update_timer(&updated) {
            ctx.sessions.release_timer(&session);
            return Err(TimerError::from(err).into());
        }

        session.open_surface(ctx, timer_id, &updated.label);
        session.publish_progress(ctx, updated.remaining_ms, updated.duration_ms, false);
        Self::spawn_tick(&session, ctx);
        info!(timer_id, remaining_ms = updated.remaining_ms, "timer resumed");
        Ok(session)
    }

    /// Start a fresh countdown with another timer's settings.
    pub fn restart(ctx: &Arc<SessionContext>, from: &Timer) -> Result<Arc<Self>, CoreError> {
        Self::start(ctx, from.duration_ms, &from.label, from.vibrate)
    }

    /// Tear the session down: cancel the tick and alert tasks, stop the
    /// effect devices, close the surface.
    ///
    /// Idempotent and safe from any caller -- a user action and the
    /// alert-window timeout converge on the same path.
    pub fn stop(&self, ctx: &SessionContext) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = lock(&self.tick_task).take() {
            handle.abort();
        }
        if let Some(handle) = lock(&self.alert_task).take() {
            handle.abort();
        }
        ctx.sound.stop();
        ctx.vibration.cancel();
        if let Some(surface) = lock(&self.surface).take() {
            ctx.sink.close_alert_surface(&surface);
        }
        debug!(timer_id = self.timer_id(), "timer session stopped");
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn open_surface(&self, ctx: &SessionContext, timer_id: i64, label: &str) {
        let payload = AlertPayload::Timer {
            timer_id,
            label: label.into(),
        };
        *lock(&self.surface) = Some(ctx.sink.open_alert_surface(AlertKind::Timer, &payload));
    }

    fn publish_progress(&self, ctx: &SessionContext, remaining_ms: i64, total_ms: i64, paused: bool) {
        if let Some(surface) = lock(&self.surface).as_ref() {
            ctx.sink.update_progress(surface, remaining_ms, total_ms, paused);
        }
    }

    fn spawn_tick(session: &Arc<Self>, ctx: &Arc<SessionContext>) {
        let this = Arc::clone(session);
        let ctx_weak = Arc::downgrade(ctx);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(TICK_INTERVAL_MS)).await;
                let Some(ctx) = ctx_weak.upgrade() else { break };
                if this.is_stopped() {
                    break;
                }
                let timer = match ctx.store.get_timer(this.timer_id()) {
                    Ok(Some(timer)) => timer,
                    Ok(None) => {
                        debug!(timer_id = this.timer_id(), "timer record gone, stopping");
                        ctx.sessions.release_timer(&this);
                        this.stop(&ctx);
                        break;
                    }
                    Err(err) => {
                        warn!(timer_id = this.timer_id(), error = %err, "timer lookup failed");
                        ctx.sessions.release_timer(&this);
                        this.stop(&ctx);
                        break;
                    }
                };
                if !timer.needs_tick() {
                    // Paused or stopped from outside this session.
                    break;
                }
                let remaining = timer.current_remaining_ms(ctx.clock.now_ms());
                if remaining <= 0 {
                    Self::finish(&this, &ctx, &timer);
                    break;
                }
                this.publish_progress(&ctx, remaining, timer.duration_ms, false);
            }
        });
        *lock(&session.tick_task) = Some(handle);
    }

    /// Finished entry: persist, alert, arm the auto-stop window.
    fn finish(session: &Arc<Self>, ctx: &Arc<SessionContext>, timer: &Timer) {
        info!(timer_id = session.timer_id(), "timer finished");
        if let Err(err) = ctx.store.mark_timer_finished(session.timer_id()) {
            warn!(timer_id = session.timer_id(), error = %err, "failed to persist finish");
        }
        session.publish_progress(ctx, 0, timer.duration_ms, false);

        // Alert chain. A dead device is logged; the window still arms.
        if let Err(err) = ctx.sound.play(true, 1.0) {
            warn!(timer_id = session.timer_id(), error = %err, "finish sound failed to start");
        }
        if timer.vibrate {
            if let Err(err) = ctx.vibration.start_pattern(VIBRATION_ON_MS, VIBRATION_OFF_MS, true) {
                warn!(timer_id = session.timer_id(), error = %err, "finish vibration failed to start");
            }
        }

        let this = Arc::clone(session);
        let ctx_weak = Arc::downgrade(ctx);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ALERT_WINDOW_MS)).await;
            let Some(ctx) = ctx_weak.upgrade() else { return };
            debug!(timer_id = this.timer_id(), "alert window elapsed, auto-stopping");
            ctx.sessions.release_timer(&this);
            this.stop(&ctx);
        });
        *lock(&session.alert_task) = Some(handle);
    }
}

/// Free the timer slot, failing only when its occupant is genuinely
/// running. A stale session (finished and still alerting, or with a
/// vanished record) is stopped and evicted so a new countdown can start.
fn ensure_slot_free(ctx: &Arc<SessionContext>) -> Result<(), CoreError> {
    if let Some(active) = ctx.sessions.timer() {
        let record = ctx.store.get_timer(active.timer_id())?;
        if record.as_ref().is_some_and(Timer::needs_tick) {
            return Err(TimerError::AlreadyRunning {
                running_id: active.timer_id(),
            }
            .into());
        }
        ctx.sessions.release_timer(&active);
        active.stop(ctx);
    }
    Ok(())
}

/// Pause a running timer: freeze the remaining time and tear the session
/// down. The record stays paused in the store until a resume.
pub fn pause_timer(ctx: &Arc<SessionContext>, timer_id: i64) -> Result<(), CoreError> {
    let timer = ctx
        .store
        .get_timer(timer_id)?
        .ok_or(TimerError::NotFound(timer_id))?;
    if !timer.running || timer.paused {
        return Err(TimerError::NotRunning.into());
    }

    let now_ms = ctx.clock.now_ms();
    let remaining = timer.current_remaining_ms(now_ms);
    let updated = Timer {
        running: false,
        paused: true,
        remaining_ms: remaining,
        paused_at_ms: now_ms,
        ..timer
    };
    ctx.store.update_timer(&updated)?;

    if let Some(session) = ctx.sessions.timer().filter(|s| s.timer_id() == timer_id) {
        session.publish_progress(ctx, remaining, updated.duration_ms, true);
        ctx.sessions.release_timer(&session);
        session.stop(ctx);
    }
    info!(timer_id, remaining_ms = remaining, "timer paused");
    Ok(())
}

/// Explicit stop: tear down any live session and mark the record finished.
pub fn stop_timer(ctx: &Arc<SessionContext>, timer_id: i64) -> Result<(), CoreError> {
    ctx.store
        .get_timer(timer_id)?
        .ok_or(TimerError::NotFound(timer_id))?;

    if let Some(session) = ctx.sessions.timer().filter(|s| s.timer_id() == timer_id) {
        ctx.sessions.release_timer(&session);
        session.stop(ctx);
    }
    ctx.store.mark_timer_finished(timer_id)?;
    info!(timer_id, "timer stopped");
    Ok(())
}
