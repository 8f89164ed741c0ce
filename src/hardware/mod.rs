pub mod alarm;
pub mod clock;
pub mod power;

pub use alarm::{Alarm, AlarmMonitor};
pub use clock::FpgaClock;
pub use power::{FaultCounter, FaultCounts, Power, RailMask};

use crate::error::SnapshotError;
use crate::snapshot::{RuntimeType, Schema, StatusFrame, ValueKind};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

pub const FIELD_FPGA_TIME: &str = "fpga.time_us";
pub const FIELD_RUNTIME: &str = "fpga.runtime";
pub const FIELD_ALARM_ENABLED: &str = "alarm.enabled";
pub const FIELD_ALARM_TRIGGER_TIME: &str = "alarm.trigger_time_us";
pub const FIELD_POWER_STATUS: &str = "power.status";
pub const FIELD_POWER_DISABLED: &str = "power.disabled";
pub const FIELD_FAULTS_OVERCURRENT_3V3: &str = "power.faults.overcurrent_3v3";
pub const FIELD_FAULTS_OVERCURRENT_5V: &str = "power.faults.overcurrent_5v";
pub const FIELD_FAULTS_OVERCURRENT_6V: &str = "power.faults.overcurrent_6v";
pub const FIELD_FAULTS_UNDERVOLTAGE_5V: &str = "power.faults.undervoltage_5v";

/// Every field of a hardware frame, with its kind. Names are distinct.
pub const FRAME_FIELDS: [(&str, ValueKind); 10] = [
    (FIELD_FPGA_TIME, ValueKind::UInt32),
    (FIELD_RUNTIME, ValueKind::Runtime),
    (FIELD_ALARM_ENABLED, ValueKind::Bool),
    (FIELD_ALARM_TRIGGER_TIME, ValueKind::UInt32),
    (FIELD_POWER_STATUS, ValueKind::UInt32),
    (FIELD_POWER_DISABLED, ValueKind::UInt32),
    (FIELD_FAULTS_OVERCURRENT_3V3, ValueKind::UInt32),
    (FIELD_FAULTS_OVERCURRENT_5V, ValueKind::UInt32),
    (FIELD_FAULTS_OVERCURRENT_6V, ValueKind::UInt32),
    (FIELD_FAULTS_UNDERVOLTAGE_5V, ValueKind::UInt32),
];

fn fault_field(counter: FaultCounter) -> &'static str {
    match counter {
        FaultCounter::OverCurrent3V3 => FIELD_FAULTS_OVERCURRENT_3V3,
        FaultCounter::OverCurrent5V => FIELD_FAULTS_OVERCURRENT_5V,
        FaultCounter::OverCurrent6V => FIELD_FAULTS_OVERCURRENT_6V,
        FaultCounter::UnderVoltage5V => FIELD_FAULTS_UNDERVOLTAGE_5V,
    }
}

/// The emulated controller: every register bank, each behind its own lock.
///
/// Constructed once and shared (usually as `Arc<HardwareState>`) with every
/// component and worker that touches hardware. Workers only borrow it and
/// must not outlive it; holding an `Arc` makes that automatic.
#[derive(Debug)]
pub struct HardwareState {
    alarm: Mutex<Alarm>,
    power: RwLock<Power>,
    clock: FpgaClock,
    schema: Arc<Schema>,
}

impl HardwareState {
    pub fn new() -> Self {
        Self {
            alarm: Mutex::new(Alarm::new()),
            power: RwLock::new(Power::new()),
            clock: FpgaClock::new(),
            schema: Self::frame_schema(),
        }
    }

    /// Schema of frames produced by [`HardwareState::capture_frame`]. A real
    /// hardware backend must produce frames with an equal schema.
    pub fn frame_schema() -> Arc<Schema> {
        Arc::new(FRAME_FIELDS.into_iter().collect())
    }

    pub fn clock(&self) -> &FpgaClock {
        &self.clock
    }

    pub fn now_us(&self) -> u32 {
        self.clock.now_us()
    }

    /// Exclusive access to the alarm register.
    pub fn alarm(&self) -> MutexGuard<'_, Alarm> {
        // Register operations are pure assignments; a poisoned guard still
        // holds a valid register.
        self.alarm.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn power(&self) -> RwLockReadGuard<'_, Power> {
        self.power.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn power_mut(&self) -> RwLockWriteGuard<'_, Power> {
        self.power.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Builds a frame of every register while holding all register locks,
    /// so the result reflects a single instant.
    pub fn capture_frame(&self) -> Result<StatusFrame, SnapshotError> {
        let alarm = self.alarm();
        let power = self.power();
        let now = self.clock.now_us();

        let mut builder = StatusFrame::builder_for(Arc::clone(&self.schema));
        builder
            .insert(FIELD_FPGA_TIME, now)?
            .insert(FIELD_RUNTIME, RuntimeType::Mock)?
            .insert(FIELD_ALARM_ENABLED, alarm.get_enabled())?
            .insert(FIELD_ALARM_TRIGGER_TIME, alarm.get_trigger_time())?
            .insert(FIELD_POWER_STATUS, u32::from(power.get_status().bits()))?
            .insert(FIELD_POWER_DISABLED, u32::from(power.get_disabled().bits()))?;
        let counts = power.get_fault_counts();
        for counter in FaultCounter::ALL {
            builder.insert(fault_field(counter), u32::from(counts.get(counter)))?;
        }
        drop(power);
        drop(alarm);

        builder.build()
    }
}

impl Default for HardwareState {
    fn default() -> Self {
        Self::new()
    }
}
