use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Monday-first ordering, matching `Weekday::num_days_from_monday`.
const DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Set of weekdays an alarm repeats on.
///
/// Backed by a seven-bit mask (bit 0 = Monday), so duplicates are
/// unrepresentable and the set serializes as a single small integer.
/// An empty set means the alarm fires once and does not repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const EMPTY: WeekdaySet = WeekdaySet(0);
    pub const ALL: WeekdaySet = WeekdaySet(0b111_1111);
    pub const WEEKDAYS: WeekdaySet = WeekdaySet(0b001_1111);
    pub const WEEKENDS: WeekdaySet = WeekdaySet(0b110_0000);

    pub fn from_days(days: &[Weekday]) -> Self {
        let mut set = Self::EMPTY;
        for day in days {
            set.insert(*day);
        }
        set
    }

    fn bit(day: Weekday) -> u8 {
        1 << day.num_days_from_monday()
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= Self::bit(day);
    }

    pub fn remove(&mut self, day: Weekday) {
        self.0 &= !Self::bit(day);
    }

    pub fn toggle(&mut self, day: Weekday) {
        self.0 ^= Self::bit(day);
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Days in Monday-first order.
    pub fn iter(self) -> impl Iterator<Item = Weekday> {
        DAYS.into_iter().filter(move |d| self.contains(*d))
    }

    /// Raw bitmask, as stored in the database.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Rebuild from a stored bitmask; bits outside the seven days are dropped.
    pub fn from_bits(bits: u8) -> Self {
        WeekdaySet(bits & Self::ALL.0)
    }
}
