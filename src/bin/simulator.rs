use rioemu::hardware::{AlarmMonitor, FaultCounter, HardwareState, RailMask};
use rioemu::snapshot::SnapshotCell;
use rioemu::task::{step_fn, TaskManager, ThreadTaskManager};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info, warn};

const RUN_TIME: Duration = Duration::from_secs(5);
const ALARM_PERIOD_US: u32 = 250_000;
const FRAME_PERIOD: Duration = Duration::from_millis(50);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    info!("Robot controller emulation starting");

    let hw = Arc::new(HardwareState::new());
    let frames = Arc::new(SnapshotCell::new(HardwareState::frame_schema()));
    let manager = ThreadTaskManager::new();

    {
        let mut alarm = hw.alarm();
        alarm.set_trigger_time(hw.now_us().wrapping_add(ALARM_PERIOD_US));
        alarm.set_enabled(true);
    }

    let alarm_hw = Arc::clone(&hw);
    let mut monitor = AlarmMonitor::new();
    let _alarm_task = manager.spawn(
        "alarm",
        step_fn(move |ctx| {
            let now = alarm_hw.now_us();
            let mut alarm = alarm_hw.alarm();
            if monitor.poll(&alarm, now) {
                info!("Alarm fired at {} us (#{})", now, monitor.fire_count());
                alarm.set_trigger_time(now.wrapping_add(ALARM_PERIOD_US));
            }
            drop(alarm);
            ctx.wait(Duration::from_millis(1));
            Ok(())
        }),
    )?;

    // Trips the 6 V rail every second and restores it half a second later.
    let power_hw = Arc::clone(&hw);
    let _power_task = manager.spawn(
        "power-rails",
        step_fn(move |ctx| {
            let tick = ctx.iteration() % 10;
            let mut power = power_hw.power_mut();
            if tick == 0 {
                let counts = power.get_fault_counts();
                let tripped = counts.get(FaultCounter::OverCurrent6V).saturating_add(1);
                power.set_fault_counts(counts.with(FaultCounter::OverCurrent6V, tripped));
                let status = power.get_status() - RailMask::USER_6V;
                power.set_status(status);
                power.set_disabled(RailMask::USER_6V);
                warn!("6V rail over-current, fault count {}", tripped);
            } else if tick == 5 {
                power.set_status(RailMask::all());
                power.set_disabled(RailMask::empty());
            }
            drop(power);
            ctx.wait(Duration::from_millis(100));
            Ok(())
        }),
    )?;

    let frame_hw = Arc::clone(&hw);
    let frame_cell = Arc::clone(&frames);
    let _frame_task = manager.spawn(
        "status-frames",
        step_fn(move |ctx| {
            frame_cell.publish(frame_hw.capture_frame()?)?;
            ctx.wait(FRAME_PERIOD);
            Ok(())
        }),
    )?;

    let mut interval = time::interval(Duration::from_secs(1));
    let deadline = time::sleep(RUN_TIME);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Some(frame) = frames.latest() {
                    match serde_json::to_string(&*frame) {
                        Ok(json) => info!("FRAME: {}", json),
                        Err(e) => error!("Failed to render frame: {}", e),
                    }
                }
            }
            () = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    let report = manager.shutdown(SHUTDOWN_TIMEOUT);
    if report.is_clean() {
        info!("All tasks stopped: {:?}", report.exited);
    } else {
        warn!("Tasks still running at exit: {:?}", report.lingering);
    }
    info!("Published {} frames", frames.publications());

    Ok(())
}
