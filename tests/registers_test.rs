use proptest::prelude::*;
use rioemu::hardware::{Alarm, FaultCounter, FaultCounts, Power, RailMask};

fn fault_counts() -> impl Strategy<Value = FaultCounts> {
    (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>()).prop_map(|(a, b, c, d)| FaultCounts {
        overcurrent_3v3: a,
        overcurrent_5v: b,
        overcurrent_6v: c,
        undervoltage_5v: d,
    })
}

proptest! {
    /// Disabling an alarm keeps its trigger time.
    #[test]
    fn alarm_trigger_time_survives_disable(t in any::<u32>()) {
        let mut alarm = Alarm::new();
        alarm.set_trigger_time(t);
        alarm.set_enabled(true);
        prop_assert_eq!(alarm.get_trigger_time(), t);
        prop_assert!(alarm.get_enabled());

        alarm.set_enabled(false);
        prop_assert_eq!(alarm.get_trigger_time(), t);
        prop_assert!(!alarm.get_enabled());
    }

    /// Fault counts read back exactly, and a copy never aliases the original.
    #[test]
    fn power_fault_counts_round_trip_and_copy(c in fault_counts(), other in fault_counts()) {
        let mut original = Power::new();
        original.set_fault_counts(c);
        prop_assert_eq!(original.get_fault_counts(), c);

        let mut copy = original.clone();
        copy.set_fault_counts(other);
        copy.set_disabled(RailMask::all());
        prop_assert_eq!(original.get_fault_counts(), c);
        prop_assert!(original.get_disabled().is_empty());
        prop_assert_eq!(copy.get_fault_counts(), other);
    }

    #[test]
    fn power_set_disabled_is_idempotent(bits in 0u8..8) {
        let mask = RailMask::from_bits_truncate(bits);
        let mut power = Power::new();
        power.set_disabled(mask);
        let once = power.clone();
        power.set_disabled(mask);
        prop_assert_eq!(power, once);
    }
}

#[test]
fn test_model_performs_no_accumulation() {
    let mut power = Power::new();
    let counts = FaultCounts::default().with(FaultCounter::OverCurrent3V3, 4);
    power.set_fault_counts(counts);
    power.set_fault_counts(FaultCounts::default().with(FaultCounter::OverCurrent3V3, 1));

    // Last write wins; the caller owns any accumulation policy.
    assert_eq!(power.get_fault_counts().get(FaultCounter::OverCurrent3V3), 1);
}

#[test]
fn test_alarm_disabled_trigger_is_not_armed() {
    let mut alarm = Alarm::new();
    alarm.set_trigger_time(10);
    assert!(!alarm.get_enabled());
    assert_eq!(alarm.get_trigger_time(), 10);
}

#[test]
fn test_power_serde_preserves_registers() {
    let mut power = Power::new();
    power.set_disabled(RailMask::USER_5V | RailMask::USER_6V);
    let json = serde_json::to_value(&power).unwrap();
    assert!(json.get("disabled").is_some());
    assert!(json.get("fault_counts").is_some());

    let back: Power = serde_json::from_value(json).unwrap();
    assert_eq!(back, power);
}
