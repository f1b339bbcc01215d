//! Next-trigger computation for alarms.
//!
//! Pure wall-clock arithmetic: no timezone handling, no side effects. The
//! caller supplies "now" and converts the result to an epoch instant.

use chrono::{Datelike, Days, NaiveDateTime, NaiveTime};

use crate::model::WeekdaySet;

/// Compute the next instant an alarm at `time` fires strictly after `now`.
///
/// With an empty repeat set the alarm is one-shot: today at `time` if that
/// is still ahead, otherwise tomorrow. With repeat days it is the earliest
/// day in the set whose `time` is strictly after `now` -- today qualifies
/// only when `time` has not yet passed.
///
/// A `time` equal to `now`'s time of day counts as already passed, so an
/// alarm never fires twice at the exact boundary.
///
/// Returns `None` only if no day matches within a week, which cannot happen
/// for a non-empty set; callers treat it as an invariant violation rather
/// than falling back to "now".
pub fn next_trigger(time: NaiveTime, repeat: WeekdaySet, now: NaiveDateTime) -> Option<NaiveDateTime> {
    if repeat.is_empty() {
        let date = if time > now.time() {
            now.date()
        } else {
            now.date().succ_opt()?
        };
        return Some(date.and_time(time));
    }

    if repeat.contains(now.weekday()) && time > now.time() {
        return Some(now.date().and_time(time));
    }

    for days_ahead in 1..=7 {
        let date = now.date().checked_add_days(Days::new(days_ahead))?;
        if repeat.contains(date.weekday()) {
            return Some(date.and_time(time));
        }
    }

    None
}
