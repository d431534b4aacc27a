// SPDX-License-Identifier: MIT

//! End-to-end scenarios 5-6 from spec.md §8: dispatcher drain with a
//! rejected duplicate, and raising the worker count from zero.

use maint_core::{ActionDescription, ActionState, MaintenanceFeature, SchedulerConfig, SystemClock};
use maint_core::test_support::{TestActionFactory, TEST_ACTION_BASIC};
use std::sync::Arc;
use std::time::Duration;

fn feature() -> MaintenanceFeature<SystemClock> {
    MaintenanceFeature::new(SystemClock, SchedulerConfig::default(), Arc::new(TestActionFactory::new()))
}

fn props(iterate_count: u64, result_code: i32) -> serde_json::Value {
    serde_json::json!({"iterate_count": iterate_count, "result_code": result_code})
}

fn desc(shard: &str) -> ActionDescription {
    ActionDescription::new([("name", TEST_ACTION_BASIC), ("shard", shard)])
}

fn wait_until_done(actions: &[&maint_core::Action], timeout: Duration) {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if actions.iter().all(|a| a.done()) {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("actions did not drain within {timeout:?}");
}

#[test]
fn queue_drains_with_one_worker_and_rejects_a_duplicate() {
    let f = feature();
    f.ready_gate().open();

    f.add_action(desc("a"), props(100, 1), false).expect("admit A");
    f.add_action(desc("b"), props(2, 0), false).expect("admit B");

    let rejected = f.add_action(desc("a"), props(100, 1), false);
    assert!(rejected.is_err(), "A' duplicates A's identity while A is non-terminal");

    f.set_maintenance_threads_max(1);

    let a = f.registry().lookup(maint_core::ActionId::from_raw(1)).unwrap();
    let b = f.registry().lookup(maint_core::ActionId::from_raw(2)).unwrap();
    wait_until_done(&[a.as_ref(), b.as_ref()], Duration::from_secs(5));

    assert_eq!(a.state(), ActionState::Failed);
    assert_eq!(a.result().code, 1);
    assert_eq!(a.progress(), 100);

    assert_eq!(b.state(), ActionState::Complete);
    assert_eq!(b.result().code, 0);
    assert_eq!(b.progress(), 2);

    assert_eq!(f.registry().len(), 2);
    f.begin_shutdown();
}

#[test]
fn zero_workers_leaves_admissions_ready_until_raised() {
    let f = feature();
    f.ready_gate().open();
    f.set_maintenance_threads_max(0);

    f.add_action(desc("c"), props(2, 0), false).expect("admit");
    let action = f.registry().lookup(maint_core::ActionId::from_raw(1)).unwrap();

    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(action.state(), ActionState::Ready);
    assert_eq!(action.progress(), 0);

    f.begin_shutdown();
    assert_eq!(action.state(), ActionState::Ready, "shutdown with zero workers leaves the action untouched");
}

#[test]
fn worker_pool_respects_the_host_ready_gate() {
    let f = feature();
    f.add_action(desc("d"), props(0, 0), false).expect("admit");
    let action = f.registry().lookup(maint_core::ActionId::from_raw(1)).unwrap();

    let f = Arc::new(f);
    let f2 = f.clone();
    let handle = std::thread::spawn(move || f2.set_maintenance_threads_max(1));

    std::thread::sleep(Duration::from_millis(50));
    assert!(!action.done(), "no step runs before the host signals IN_WAIT");

    f.ready_gate().open();
    handle.join().expect("set_maintenance_threads_max thread panicked");
    wait_until_done(&[action.as_ref()], Duration::from_secs(5));

    f.begin_shutdown();
}
