//! Post-restart reschedule sweep.
//!
//! Exact-timer reservations do not survive a reboot; this sweep re-submits
//! every enabled alarm once the process is back up. One bad alarm never
//! aborts the rest -- per-alarm failures are logged and counted, and the
//! report is diagnostic only.

use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::CoreError;
use crate::platform::RecordStore;
use crate::scheduler::AlarmScheduler;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Alarms with a freshly submitted main trigger.
    pub scheduled: usize,
    /// Alarms that ended up unscheduled (no valid trigger instant).
    pub skipped: usize,
    /// Alarms whose scheduling failed.
    pub failed: usize,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Reschedule every enabled alarm in the store.
///
/// Fails outright only when the store cannot list the alarms at all.
pub fn reschedule_all(
    store: &dyn RecordStore,
    scheduler: &AlarmScheduler,
) -> Result<SweepReport, CoreError> {
    let alarms = store.get_enabled_alarms()?;
    info!(count = alarms.len(), "rescheduling enabled alarms");

    let mut report = SweepReport::default();
    for alarm in &alarms {
        match scheduler.schedule(alarm) {
            Ok(Some(trigger_at_ms)) => {
                report.scheduled += 1;
                debug!(alarm_id = alarm.id, trigger_at_ms, "alarm rescheduled");
            }
            Ok(None) => {
                report.skipped += 1;
            }
            Err(err) => {
                report.failed += 1;
                error!(alarm_id = alarm.id, error = %err, "failed to reschedule alarm");
            }
        }
    }

    info!(
        scheduled = report.scheduled,
        skipped = report.skipped,
        failed = report.failed,
        "reschedule sweep finished"
    );
    Ok(report)
}
