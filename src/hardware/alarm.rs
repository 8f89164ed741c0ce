use serde::{Deserialize, Serialize};

/// Emulated FPGA alarm register: a one-shot trigger on the microsecond clock.
///
/// The trigger time is kept whether or not the alarm is enabled; it is only
/// considered armed while `enabled` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    enabled: bool,
    trigger_time: u32,
}

impl Alarm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Trigger time in FPGA microseconds.
    pub fn get_trigger_time(&self) -> u32 {
        self.trigger_time
    }

    pub fn set_trigger_time(&mut self, trigger_time: u32) {
        self.trigger_time = trigger_time;
    }
}

/// Consumer side of an [`Alarm`]: decides when the alarm fires.
///
/// Fires at most once per arm cycle. A cycle starts when the alarm becomes
/// enabled or its trigger time changes while enabled; disabling ends it.
/// Re-arming is always left to the owner of the alarm.
#[derive(Debug, Default)]
pub struct AlarmMonitor {
    // Trigger time of the cycle that already fired.
    fired_for: Option<u32>,
    fire_count: u32,
}

impl AlarmMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` exactly when the alarm should fire at `now_us`.
    pub fn poll(&mut self, alarm: &Alarm, now_us: u32) -> bool {
        if !alarm.get_enabled() {
            self.fired_for = None;
            return false;
        }

        let trigger = alarm.get_trigger_time();
        if self.fired_for == Some(trigger) {
            return false;
        }

        if has_elapsed(now_us, trigger) {
            self.fired_for = Some(trigger);
            self.fire_count = self.fire_count.wrapping_add(1);
            return true;
        }

        // A new (not yet due) trigger time starts a fresh cycle.
        self.fired_for = None;
        false
    }

    pub fn fire_count(&self) -> u32 {
        self.fire_count
    }
}

/// Wrap-aware `now >= deadline` on the 32-bit microsecond clock.
fn has_elapsed(now_us: u32, deadline_us: u32) -> bool {
    now_us.wrapping_sub(deadline_us) < u32::MAX / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alarm_defaults() {
        let alarm = Alarm::new();
        assert!(!alarm.get_enabled());
        assert_eq!(alarm.get_trigger_time(), 0);
    }

    #[test]
    fn test_trigger_time_retained_when_disabled() {
        let mut alarm = Alarm::new();
        alarm.set_trigger_time(1_500);
        alarm.set_enabled(true);
        alarm.set_enabled(false);
        assert_eq!(alarm.get_trigger_time(), 1_500);
    }

    #[test]
    fn test_monitor_ignores_disabled_alarm() {
        let mut alarm = Alarm::new();
        alarm.set_trigger_time(100);
        let mut monitor = AlarmMonitor::new();
        assert!(!monitor.poll(&alarm, 1_000));
        assert_eq!(monitor.fire_count(), 0);
    }

    #[test]
    fn test_monitor_fires_once_per_arm_cycle() {
        let mut alarm = Alarm::new();
        alarm.set_trigger_time(100);
        alarm.set_enabled(true);

        let mut monitor = AlarmMonitor::new();
        assert!(!monitor.poll(&alarm, 50));
        assert!(monitor.poll(&alarm, 100));
        assert!(!monitor.poll(&alarm, 150));
        assert!(!monitor.poll(&alarm, 10_000));

        // Disable and re-enable starts a new cycle.
        alarm.set_enabled(false);
        assert!(!monitor.poll(&alarm, 10_001));
        alarm.set_enabled(true);
        assert!(monitor.poll(&alarm, 10_002));
        assert_eq!(monitor.fire_count(), 2);
    }

    #[test]
    fn test_monitor_rearms_on_new_trigger_time() {
        let mut alarm = Alarm::new();
        alarm.set_trigger_time(100);
        alarm.set_enabled(true);

        let mut monitor = AlarmMonitor::new();
        assert!(monitor.poll(&alarm, 200));

        alarm.set_trigger_time(500);
        assert!(!monitor.poll(&alarm, 300));
        assert!(monitor.poll(&alarm, 500));
    }

    #[test]
    fn test_monitor_handles_clock_wrap() {
        let mut alarm = Alarm::new();
        alarm.set_trigger_time(10);
        alarm.set_enabled(true);

        let mut monitor = AlarmMonitor::new();
        // Just before the wrap, a trigger at 10 is still in the future.
        assert!(!monitor.poll(&alarm, u32::MAX - 5));
        assert!(monitor.poll(&alarm, 12));
    }
}
