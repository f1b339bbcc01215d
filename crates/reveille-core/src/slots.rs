//! Request-id space for the exact-timer facility.
//!
//! Each alarm owns one main slot and up to [`MAX_PRE_ALARMS`] pre-alarm
//! slots. Ids are a 64-bit composite: the low four bits carry the pre-alarm
//! index (0 = main trigger) and the rest carry the alarm id, so ids from
//! different alarms can never collide for any alarm id below 2^59.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed upper bound on pre-alarms per alarm. Cancellation always probes
/// this full range, because an earlier configuration may have scheduled
/// more pre-alarms than the current one.
pub const MAX_PRE_ALARMS: u32 = 10;

const INDEX_BITS: u32 = 4;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;

/// Slot key submitted to the exact-timer facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// The main trigger slot for an alarm.
    pub fn main(alarm_id: i64) -> Self {
        RequestId((alarm_id as u64) << INDEX_BITS)
    }

    /// The pre-alarm slot `index` (1..=[`MAX_PRE_ALARMS`]) for an alarm.
    pub fn pre_alarm(alarm_id: i64, index: u32) -> Self {
        debug_assert!((1..=MAX_PRE_ALARMS).contains(&index));
        RequestId((alarm_id as u64) << INDEX_BITS | u64::from(index))
    }

    /// Every id that could ever have been scheduled for `alarm_id`:
    /// the main slot plus the full pre-alarm range.
    pub fn all_for_cancel(alarm_id: i64) -> impl Iterator<Item = RequestId> {
        std::iter::once(Self::main(alarm_id))
            .chain((1..=MAX_PRE_ALARMS).map(move |i| Self::pre_alarm(alarm_id, i)))
    }

    pub fn alarm_id(self) -> i64 {
        (self.0 >> INDEX_BITS) as i64
    }

    /// 0 for the main slot, 1..=10 for pre-alarms.
    pub fn pre_alarm_index(self) -> u32 {
        (self.0 & INDEX_MASK) as u32
    }

    pub fn is_pre_alarm(self) -> bool {
        self.pre_alarm_index() != 0
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pre_alarm() {
            write!(f, "{}#pre{}", self.alarm_id(), self.pre_alarm_index())
        } else {
            write!(f, "{}#main", self.alarm_id())
        }
    }
}
