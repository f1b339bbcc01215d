use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::WeekdaySet;
use crate::trigger;

/// A persisted alarm.
///
/// `id` 0 marks an unsaved record; the store assigns a real id on insert.
/// The snooze counter lives here rather than in session state so that it
/// survives process restarts between firings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: i64,
    pub time: NaiveTime,
    pub enabled: bool,
    pub label: String,
    /// Opaque tone identifier understood by the sound device.
    pub tone: String,
    pub repeat_days: WeekdaySet,
    pub vibrate: bool,
    pub flash: bool,
    pub gradual_volume: bool,
    /// Target playback volume, 0-100.
    pub volume: u8,
    pub snooze_enabled: bool,
    pub snooze_minutes: u32,
    pub snooze_count: u32,
    pub max_snooze_count: u32,
    /// Number of pre-alarm firings before the main trigger, 0-10.
    pub pre_alarm_count: u32,
    pub pre_alarm_interval_minutes: u32,
    pub created_at_ms: i64,
}

impl Alarm {
    /// New enabled alarm at `time` with the stock defaults.
    pub fn new(time: NaiveTime) -> Self {
        Self {
            id: 0,
            time,
            enabled: true,
            label: String::new(),
            tone: "default".into(),
            repeat_days: WeekdaySet::EMPTY,
            vibrate: true,
            flash: false,
            gradual_volume: true,
            volume: 80,
            snooze_enabled: true,
            snooze_minutes: 10,
            snooze_count: 0,
            max_snooze_count: 3,
            pre_alarm_count: 0,
            pre_alarm_interval_minutes: 7,
            created_at_ms: 0,
        }
    }

    /// Next wall-clock instant this alarm should fire strictly after `now`.
    ///
    /// `None` only on an internal invariant violation; see [`trigger::next_trigger`].
    pub fn next_trigger(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        trigger::next_trigger(self.time, self.repeat_days, now)
    }

    pub fn can_snooze(&self) -> bool {
        self.snooze_enabled && self.snooze_count < self.max_snooze_count
    }

    /// "07:30 AM" or "19:30" in 24-hour mode.
    pub fn formatted_time(&self, use_24h: bool) -> String {
        use chrono::Timelike;
        let (hour, minute) = (self.time.hour(), self.time.minute());
        if use_24h {
            format!("{hour:02}:{minute:02}")
        } else {
            let hour12 = match hour {
                0 => 12,
                1..=12 => hour,
                _ => hour - 12,
            };
            let am_pm = if hour < 12 { "AM" } else { "PM" };
            format!("{hour12:02}:{minute:02} {am_pm}")
        }
    }

    /// Short repeat-day summary for list views.
    pub fn repeat_summary(&self) -> String {
        match self.repeat_days {
            WeekdaySet::EMPTY => "Once".into(),
            WeekdaySet::ALL => "Every day".into(),
            WeekdaySet::WEEKDAYS => "Weekdays".into(),
            WeekdaySet::WEEKENDS => "Weekends".into(),
            days => days
                .iter()
                .map(short_day_name)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Human-readable time until the next firing: "3h 12m", "42m", "< 1m".
    pub fn time_until(&self, now: NaiveDateTime) -> String {
        let Some(next) = self.next_trigger(now) else {
            return String::new();
        };
        let minutes = (next - now).num_minutes();
        let (hours, minutes) = (minutes / 60, minutes % 60);
        match (hours, minutes) {
            (0, 0) => "< 1m".into(),
            (0, m) => format!("{m}m"),
            (h, m) => format!("{h}h {m}m"),
        }
    }
}

fn short_day_name(day: chrono::Weekday) -> &'static str {
    match day {
        chrono::Weekday::Mon => "Mon",
        chrono::Weekday::Tue => "Tue",
        chrono::Weekday::Wed => "Wed",
        chrono::Weekday::Thu => "Thu",
        chrono::Weekday::Fri => "Fri",
        chrono::Weekday::Sat => "Sat",
        chrono::Weekday::Sun => "Sun",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Weekday};

    fn alarm_at(hour: u32, minute: u32) -> Alarm {
        Alarm::new(NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time"))
    }

    #[test]
    fn defaults_allow_snooze() {
        let alarm = alarm_at(7, 0);
        assert!(alarm.can_snooze());
        assert_eq!(alarm.snooze_count, 0);
        assert_eq!(alarm.max_snooze_count, 3);
    }

    #[test]
    fn snooze_exhausted_at_cap() {
        let mut alarm = alarm_at(7, 0);
        alarm.snooze_count = alarm.max_snooze_count;
        assert!(!alarm.can_snooze());
        alarm.snooze_count = 0;
        alarm.snooze_enabled = false;
        assert!(!alarm.can_snooze());
    }

    #[test]
    fn formatted_time_both_modes() {
        assert_eq!(alarm_at(19, 30).formatted_time(true), "19:30");
        assert_eq!(alarm_at(19, 30).formatted_time(false), "07:30 PM");
        assert_eq!(alarm_at(0, 5).formatted_time(false), "12:05 AM");
        assert_eq!(alarm_at(12, 0).formatted_time(false), "12:00 PM");
    }

    #[test]
    fn repeat_summaries() {
        let mut alarm = alarm_at(7, 0);
        assert_eq!(alarm.repeat_summary(), "Once");
        alarm.repeat_days = WeekdaySet::ALL;
        assert_eq!(alarm.repeat_summary(), "Every day");
        alarm.repeat_days = WeekdaySet::WEEKDAYS;
        assert_eq!(alarm.repeat_summary(), "Weekdays");
        alarm.repeat_days = WeekdaySet::from_days(&[Weekday::Mon, Weekday::Wed, Weekday::Fri]);
        assert_eq!(alarm.repeat_summary(), "Mon, Wed, Fri");
    }

    #[test]
    fn time_until_same_day() {
        let alarm = alarm_at(7, 0);
        let now = NaiveDate::from_ymd_opt(2024, 6, 3)
            .expect("valid date")
            .and_hms_opt(5, 30, 0)
            .expect("valid time");
        assert_eq!(alarm.time_until(now), "1h 30m");
    }
}
