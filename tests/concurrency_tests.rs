//! Two workers hammering one counter. The synchronized variant must never
//! lose an update; the unsynchronized one shows why the lock is required.

use rioemu::hardware::{FaultCounter, HardwareState};
use rioemu::task::{step_fn, TaskHandle, TaskManager, ThreadTaskManager, WorkerState};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::time::Duration;

const INCREMENTS: u64 = 10_000;

fn run_pair<F>(make_step: F) -> Vec<Box<dyn TaskHandle>>
where
    F: Fn() -> Box<dyn FnMut() + Send>,
{
    let manager = ThreadTaskManager::new();
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|i| {
            let barrier = Arc::clone(&barrier);
            let mut increment = make_step();
            manager
                .spawn(
                    &format!("incrementer-{i}"),
                    step_fn(move |ctx| {
                        if ctx.iteration() == 0 {
                            barrier.wait();
                        }
                        increment();
                        if ctx.iteration() + 1 == INCREMENTS {
                            ctx.stop();
                        }
                        Ok(())
                    }),
                )
                .unwrap()
        })
        .collect();

    for handle in &handles {
        assert!(handle.join_timeout(Duration::from_secs(30)));
        assert_eq!(handle.status(), WorkerState::Exited);
    }
    handles
}

#[test]
fn test_locked_counter_has_no_lost_updates() {
    let counter = Arc::new(Mutex::new(0u64));
    let c = Arc::clone(&counter);
    run_pair(move || {
        let c = Arc::clone(&c);
        Box::new(move || *c.lock().unwrap() += 1)
    });
    assert_eq!(*counter.lock().unwrap(), 2 * INCREMENTS);
}

#[test]
fn test_register_lock_serializes_fault_accumulation() {
    let hw = Arc::new(HardwareState::new());
    let h = Arc::clone(&hw);
    let total = Arc::new(AtomicU64::new(0));
    let t = Arc::clone(&total);
    run_pair(move || {
        let h = Arc::clone(&h);
        let t = Arc::clone(&t);
        Box::new(move || {
            // Read-modify-write under one write guard.
            let mut power = h.power_mut();
            let counts = power.get_fault_counts();
            let next = counts.get(FaultCounter::UnderVoltage5V).wrapping_add(1);
            power.set_fault_counts(counts.with(FaultCounter::UnderVoltage5V, next));
            t.fetch_add(1, Ordering::Relaxed);
        })
    });
    let expected = (2 * INCREMENTS) % 256;
    assert_eq!(total.load(Ordering::Relaxed), 2 * INCREMENTS);
    assert_eq!(
        u64::from(hw.power().get_fault_counts().get(FaultCounter::UnderVoltage5V)),
        expected
    );
}

/// Splits the increment into a separate load and store with no lock held,
/// so concurrent workers overwrite each other's updates. Timing dependent,
/// hence ignored by default: `cargo test -- --ignored`.
#[test]
#[ignore]
fn stress_unsynchronized_counter_loses_updates() {
    let mut lost = false;
    for _ in 0..50 {
        let counter = Arc::new(AtomicU64::new(0));
        let c = Arc::clone(&counter);
        run_pair(move || {
            let c = Arc::clone(&c);
            Box::new(move || {
                let seen = c.load(Ordering::Relaxed);
                std::hint::spin_loop();
                c.store(seen + 1, Ordering::Relaxed);
            })
        });
        if counter.load(Ordering::Relaxed) < 2 * INCREMENTS {
            lost = true;
            break;
        }
    }
    assert!(lost, "expected at least one lost update without the lock");
}
