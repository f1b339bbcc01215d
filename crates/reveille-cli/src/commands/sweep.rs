use std::error::Error;

use reveille_core::reschedule_all;

use super::common;

pub fn run() -> Result<(), Box<dyn Error>> {
    let app = common::init()?;
    let report = reschedule_all(app.store.as_ref(), &app.ctx.scheduler)?;
    println!(
        "rescheduled {} alarm(s), {} skipped, {} failed",
        report.scheduled, report.skipped, report.failed
    );
    if !report.is_clean() {
        return Err("some alarms failed to reschedule".into());
    }
    Ok(())
}
