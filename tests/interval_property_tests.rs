//! Property tests for the interval arithmetic underneath slot generation.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use calendary_rust::models::time::{subtract_busy, Interval};
use calendary_rust::services::quantize_slots;

fn minute(m: i64) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap() + Duration::minutes(m)
}

prop_compose! {
    /// An arbitrary non-empty interval inside one day, minute-aligned.
    fn arb_interval()(start in 0i64..1380, len in 1i64..240) -> Interval {
        Interval::new(minute(start), minute(start + len))
    }
}

proptest! {
    #[test]
    fn free_intervals_stay_inside_base(base in arb_interval(), busy in prop::collection::vec(arb_interval(), 0..6)) {
        let free = subtract_busy(vec![base], &busy);
        for f in &free {
            prop_assert!(f.start >= base.start);
            prop_assert!(f.end <= base.end);
            prop_assert!(!f.is_empty());
        }
    }

    #[test]
    fn free_intervals_never_overlap_busy(base in arb_interval(), busy in prop::collection::vec(arb_interval(), 0..6)) {
        let free = subtract_busy(vec![base], &busy);
        for f in &free {
            for b in &busy {
                prop_assert!(!f.overlaps(b), "free {:?} overlaps busy {:?}", f, b);
            }
        }
    }

    #[test]
    fn subtraction_is_order_independent(base in arb_interval(), busy in prop::collection::vec(arb_interval(), 0..6)) {
        let forward = subtract_busy(vec![base], &busy);
        let mut reversed = busy.clone();
        reversed.reverse();
        let backward = subtract_busy(vec![base], &reversed);
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn untouched_base_survives_subtraction(base in arb_interval()) {
        // A busy interval strictly after the base leaves it intact.
        let busy = Interval::new(base.end, base.end + Duration::minutes(30));
        let free = subtract_busy(vec![base], &[busy]);
        prop_assert_eq!(free, vec![base]);
    }

    #[test]
    fn quantized_slots_fit_inside_free_intervals(base in arb_interval(), busy in prop::collection::vec(arb_interval(), 0..6)) {
        let free = subtract_busy(vec![base], &busy);
        let slots = quantize_slots(&free);
        for slot in &slots {
            prop_assert_eq!(slot.end - slot.start, Duration::hours(1));
            prop_assert!(slot.available);
            prop_assert!(free
                .iter()
                .any(|f| f.start <= slot.start && slot.end <= f.end));
        }
    }

    #[test]
    fn slot_count_matches_whole_hours(start in 0i64..600, len in 0i64..600) {
        let interval = Interval::new(minute(start), minute(start + len));
        let slots = quantize_slots(&[interval]);
        prop_assert_eq!(slots.len() as i64, len / 60);
    }
}
