//! Property tests for the pure components: trigger arithmetic and the
//! request-id space.

use chrono::{Datelike, Days, NaiveDate, NaiveTime};
use proptest::prelude::*;
use reveille_core::slots::RequestId;
use reveille_core::trigger::next_trigger;
use reveille_core::WeekdaySet;

fn any_time() -> impl Strategy<Value = NaiveTime> {
    (0u32..24, 0u32..60).prop_map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).unwrap())
}

fn any_now() -> impl Strategy<Value = chrono::NaiveDateTime> {
    (0u64..3650, 0u32..24, 0u32..60).prop_map(|(day_offset, h, m)| {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .checked_add_days(Days::new(day_offset))
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    })
}

proptest! {
    #[test]
    fn one_shot_lands_today_or_tomorrow(time in any_time(), now in any_now()) {
        let next = next_trigger(time, WeekdaySet::EMPTY, now).unwrap();
        prop_assert!(next > now);
        prop_assert_eq!(next.time(), time);
        let days_ahead = (next.date() - now.date()).num_days();
        if time > now.time() {
            prop_assert_eq!(days_ahead, 0);
        } else {
            prop_assert_eq!(days_ahead, 1);
        }
    }

    #[test]
    fn repeating_is_earliest_member_day(bits in 1u8..128, time in any_time(), now in any_now()) {
        let repeat = WeekdaySet::from_bits(bits);
        prop_assume!(!repeat.is_empty());

        let next = next_trigger(time, repeat, now).unwrap();
        prop_assert!(next > now);
        prop_assert_eq!(next.time(), time);
        prop_assert!(repeat.contains(next.weekday()));

        let days_ahead = (next.date() - now.date()).num_days();
        prop_assert!(days_ahead <= 7);

        // No member day strictly earlier would also have fired after `now`.
        for d in 0..days_ahead {
            let date = now.date().checked_add_days(Days::new(d as u64)).unwrap();
            if repeat.contains(date.weekday()) {
                prop_assert!(d == 0 && time <= now.time());
            }
        }
    }

    #[test]
    fn request_ids_are_injective(
        a in 1i64..1_000_000_000,
        b in 1i64..1_000_000_000,
        i in 0u32..=10,
        j in 0u32..=10,
    ) {
        fn make(alarm_id: i64, index: u32) -> RequestId {
            if index == 0 {
                RequestId::main(alarm_id)
            } else {
                RequestId::pre_alarm(alarm_id, index)
            }
        }
        let x = make(a, i);
        let y = make(b, j);
        prop_assert_eq!(x == y, a == b && i == j);
    }

    #[test]
    fn request_id_accessors_invert_construction(alarm_id in 1i64..1_000_000_000, index in 1u32..=10) {
        let pre = RequestId::pre_alarm(alarm_id, index);
        prop_assert_eq!(pre.alarm_id(), alarm_id);
        prop_assert_eq!(pre.pre_alarm_index(), index);
        prop_assert!(pre.is_pre_alarm());
        prop_assert_ne!(pre, RequestId::main(alarm_id));
    }
}
