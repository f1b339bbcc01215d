//! Exact-timer facility implementations.
//!
//! [`TokioTimerFacility`] is the in-process facility: one sleeping task per
//! reserved slot, firing its payload into a channel that a dispatcher
//! drains. It gives the CLI and the end-to-end tests a real trigger source
//! without a platform alarm service. [`StubFacility`] only records
//! submissions, for synchronous scheduler tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::FacilityError;
use crate::lock;
use crate::platform::{ExactTimerFacility, TriggerPayload};
use crate::session::{self, SessionContext};
use crate::slots::RequestId;

struct Reservation {
    trigger_at_ms: i64,
    task: JoinHandle<()>,
}

/// In-process exact-timer facility on the tokio runtime.
///
/// `submit_exact` must be called from within a runtime. Fired reservations
/// are pruned lazily on the next submit or cancel.
pub struct TokioTimerFacility {
    permission: AtomicBool,
    slots: Mutex<HashMap<RequestId, Reservation>>,
    tx: mpsc::UnboundedSender<TriggerPayload>,
    clock: Arc<dyn Clock>,
}

impl TokioTimerFacility {
    /// Create the facility and the receiving end of its trigger channel.
    pub fn new(clock: Arc<dyn Clock>) -> (Arc<Self>, mpsc::UnboundedReceiver<TriggerPayload>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let facility = Arc::new(Self {
            permission: AtomicBool::new(true),
            slots: Mutex::new(HashMap::new()),
            tx,
            clock,
        });
        (facility, rx)
    }

    /// Toggle the permission probe, mimicking the platform revoking the
    /// exact-alarm authorization.
    pub fn set_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::SeqCst);
    }

    /// Pending reservations that have not fired yet, ordered by id.
    pub fn pending(&self) -> Vec<(RequestId, i64)> {
        let mut pending: Vec<_> = lock(&self.slots)
            .iter()
            .filter(|(_, r)| !r.task.is_finished())
            .map(|(id, r)| (*id, r.trigger_at_ms))
            .collect();
        pending.sort();
        pending
    }
}

impl ExactTimerFacility for TokioTimerFacility {
    fn can_schedule_exact(&self) -> bool {
        self.permission.load(Ordering::SeqCst)
    }

    fn submit_exact(
        &self,
        id: RequestId,
        trigger_at_ms: i64,
        payload: TriggerPayload,
    ) -> Result<(), FacilityError> {
        let delay_ms = (trigger_at_ms - self.clock.now_ms()).max(0) as u64;
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            debug!(alarm_id = payload.alarm_id, pre_alarm = payload.is_pre_alarm, "slot fired");
            if tx.send(payload).is_err() {
                warn!(alarm_id = payload.alarm_id, "trigger channel closed, firing dropped");
            }
        });

        let mut slots = lock(&self.slots);
        slots.retain(|_, r| !r.task.is_finished());
        if let Some(old) = slots.insert(id, Reservation { trigger_at_ms, task }) {
            // Re-submission supersedes the previous reservation.
            old.task.abort();
        }
        Ok(())
    }

    fn cancel(&self, id: RequestId) {
        let mut slots = lock(&self.slots);
        slots.retain(|_, r| !r.task.is_finished());
        if let Some(reservation) = slots.remove(&id) {
            reservation.task.abort();
        }
    }
}

/// Drain the facility's trigger channel into ringing sessions.
///
/// Runs until the facility (the sending side) is dropped.
pub fn spawn_dispatcher(
    ctx: Arc<SessionContext>,
    mut rx: mpsc::UnboundedReceiver<TriggerPayload>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if let Err(err) = session::handle_trigger(&ctx, payload) {
                warn!(alarm_id = payload.alarm_id, error = %err, "trigger handling failed");
            }
        }
    })
}

/// Recording facility for synchronous tests: no tasks, no firings.
#[derive(Default)]
pub struct StubFacility {
    permission: AtomicBool,
    slots: Mutex<HashMap<RequestId, i64>>,
    submissions: Mutex<Vec<(RequestId, i64)>>,
    fail_ids: Mutex<Vec<RequestId>>,
}

impl StubFacility {
    pub fn new() -> Self {
        Self {
            permission: AtomicBool::new(true),
            ..Self::default()
        }
    }

    pub fn set_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::SeqCst);
    }

    /// Make future submissions of `id` fail.
    pub fn fail_on(&self, id: RequestId) {
        lock(&self.fail_ids).push(id);
    }

    /// Currently reserved slots, ordered by id.
    pub fn pending(&self) -> Vec<(RequestId, i64)> {
        let mut pending: Vec<_> = lock(&self.slots).iter().map(|(id, at)| (*id, *at)).collect();
        pending.sort();
        pending
    }

    /// Every submission ever accepted, in order.
    pub fn submissions(&self) -> Vec<(RequestId, i64)> {
        lock(&self.submissions).clone()
    }
}

impl ExactTimerFacility for StubFacility {
    fn can_schedule_exact(&self) -> bool {
        self.permission.load(Ordering::SeqCst)
    }

    fn submit_exact(
        &self,
        id: RequestId,
        trigger_at_ms: i64,
        _payload: TriggerPayload,
    ) -> Result<(), FacilityError> {
        if lock(&self.fail_ids).contains(&id) {
            return Err(FacilityError::Other(format!("injected failure for {id}")));
        }
        lock(&self.slots).insert(id, trigger_at_ms);
        lock(&self.submissions).push((id, trigger_at_ms));
        Ok(())
    }

    fn cancel(&self, id: RequestId) {
        lock(&self.slots).remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::NaiveDate;

    fn manual_clock() -> Arc<ManualClock> {
        let now = NaiveDate::from_ymd_opt(2024, 6, 3)
            .expect("valid date")
            .and_hms_opt(6, 0, 0)
            .expect("valid time");
        Arc::new(ManualClock::at(now))
    }

    #[tokio::test(start_paused = true)]
    async fn submitted_slot_fires_with_its_payload() {
        let clock = manual_clock();
        let (facility, mut rx) = TokioTimerFacility::new(clock.clone());
        let at = clock.now_ms() + 5_000;
        facility
            .submit_exact(RequestId::main(7), at, TriggerPayload::main(7))
            .expect("submit");

        let payload = rx.recv().await.expect("payload");
        assert_eq!(payload, TriggerPayload::main(7));
        assert!(facility.pending().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_slot_never_fires() {
        let clock = manual_clock();
        let (facility, mut rx) = TokioTimerFacility::new(clock.clone());
        facility
            .submit_exact(RequestId::main(7), clock.now_ms() + 5_000, TriggerPayload::main(7))
            .expect("submit");
        facility.cancel(RequestId::main(7));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn resubmission_supersedes_previous_reservation() {
        let clock = manual_clock();
        let (facility, mut rx) = TokioTimerFacility::new(clock.clone());
        let id = RequestId::main(7);
        facility
            .submit_exact(id, clock.now_ms() + 5_000, TriggerPayload::main(7))
            .expect("submit");
        facility
            .submit_exact(id, clock.now_ms() + 60_000, TriggerPayload::main(7))
            .expect("submit");
        assert_eq!(facility.pending().len(), 1);

        // Only the superseding reservation fires.
        let payload = rx.recv().await.expect("payload");
        assert_eq!(payload, TriggerPayload::main(7));
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn stub_records_and_fails_on_demand() {
        let stub = StubFacility::new();
        let id = RequestId::main(1);
        stub.submit_exact(id, 10, TriggerPayload::main(1)).expect("submit");
        assert_eq!(stub.pending(), vec![(id, 10)]);

        stub.fail_on(id);
        assert!(stub.submit_exact(id, 20, TriggerPayload::main(1)).is_err());
        stub.cancel(id);
        assert!(stub.pending().is_empty());
        assert_eq!(stub.submissions().len(), 1);
    }
}
