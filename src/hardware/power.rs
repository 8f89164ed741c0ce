use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// One bit per user power rail.
    ///
    /// Used both for rail activity (`status`) and for the disable mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct RailMask: u8 {
        /// 3.3 V user rail.
        const USER_3V3 = 1 << 0;
        /// 5 V user rail.
        const USER_5V  = 1 << 1;
        /// 6 V user rail.
        const USER_6V  = 1 << 2;
    }
}

/// Individual fault counters exposed by the power register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultCounter {
    OverCurrent3V3,
    OverCurrent5V,
    OverCurrent6V,
    UnderVoltage5V,
}

impl FaultCounter {
    pub const ALL: [FaultCounter; 4] = [
        FaultCounter::OverCurrent3V3,
        FaultCounter::OverCurrent5V,
        FaultCounter::OverCurrent6V,
        FaultCounter::UnderVoltage5V,
    ];
}

/// Running per-rail fault counts. 8 bits each, as in the hardware register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultCounts {
    pub overcurrent_3v3: u8,
    pub overcurrent_5v: u8,
    pub overcurrent_6v: u8,
    pub undervoltage_5v: u8,
}

impl FaultCounts {
    pub fn get(&self, counter: FaultCounter) -> u8 {
        match counter {
            FaultCounter::OverCurrent3V3 => self.overcurrent_3v3,
            FaultCounter::OverCurrent5V => self.overcurrent_5v,
            FaultCounter::OverCurrent6V => self.overcurrent_6v,
            FaultCounter::UnderVoltage5V => self.undervoltage_5v,
        }
    }

    /// Copy of `self` with one counter replaced.
    #[must_use]
    pub fn with(mut self, counter: FaultCounter, count: u8) -> Self {
        match counter {
            FaultCounter::OverCurrent3V3 => self.overcurrent_3v3 = count,
            FaultCounter::OverCurrent5V => self.overcurrent_5v = count,
            FaultCounter::OverCurrent6V => self.overcurrent_6v = count,
            FaultCounter::UnderVoltage5V => self.undervoltage_5v = count,
        }
        self
    }
}

/// Emulated voltmeter / power manager register bank.
///
/// A plain value type: `Clone` is a full copy with no shared backing
/// state. The model performs no arithmetic; callers that accumulate fault
/// counts compute the new value and hand it to [`Power::set_fault_counts`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Power {
    status: RailMask,
    fault_counts: FaultCounts,
    disabled: RailMask,
}

impl Power {
    /// All rails active, no faults, nothing disabled.
    pub fn new() -> Self {
        Self {
            status: RailMask::all(),
            fault_counts: FaultCounts::default(),
            disabled: RailMask::empty(),
        }
    }

    pub fn get_status(&self) -> RailMask {
        self.status
    }

    pub fn set_status(&mut self, status: RailMask) {
        self.status = status;
    }

    pub fn get_fault_counts(&self) -> FaultCounts {
        self.fault_counts
    }

    pub fn set_fault_counts(&mut self, fault_counts: FaultCounts) {
        self.fault_counts = fault_counts;
    }

    pub fn get_disabled(&self) -> RailMask {
        self.disabled
    }

    pub fn set_disabled(&mut self, disabled: RailMask) {
        self.disabled = disabled;
    }
}

impl Default for Power {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_defaults() {
        let power = Power::new();
        assert_eq!(power.get_status(), RailMask::all());
        assert_eq!(power.get_fault_counts(), FaultCounts::default());
        assert!(power.get_disabled().is_empty());
    }

    #[test]
    fn test_set_disabled_is_idempotent() {
        let mut power = Power::new();
        power.set_disabled(RailMask::USER_5V);
        let once = power.clone();
        power.set_disabled(RailMask::USER_5V);
        assert_eq!(power, once);
    }

    #[test]
    fn test_fault_counter_accessors() {
        let counts = FaultCounts::default()
            .with(FaultCounter::OverCurrent6V, 3)
            .with(FaultCounter::UnderVoltage5V, 9);
        assert_eq!(counts.get(FaultCounter::OverCurrent6V), 3);
        assert_eq!(counts.get(FaultCounter::UnderVoltage5V), 9);
        assert_eq!(counts.get(FaultCounter::OverCurrent3V3), 0);
    }

    #[test]
    fn test_clone_is_independent() {
        let original = Power::new();
        let mut copy = original.clone();
        copy.set_status(RailMask::USER_3V3);
        copy.set_disabled(RailMask::USER_6V);
        assert_eq!(original.get_status(), RailMask::all());
        assert!(original.get_disabled().is_empty());
    }
}
