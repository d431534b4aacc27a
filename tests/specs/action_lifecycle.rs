// SPDX-License-Identifier: MIT

//! End-to-end scenarios 1-4 from spec.md §8: synchronous `executeNow`
//! admissions of `TestActionBasic` across the iterate_count/result_code
//! boundary cases.

use maint_core::{ActionDescription, ActionId, ActionState, MaintenanceFeature, SchedulerConfig, SystemClock};
use maint_core::test_support::{TestActionFactory, TEST_ACTION_BASIC};
use std::sync::Arc;

fn feature() -> MaintenanceFeature<SystemClock> {
    MaintenanceFeature::new(SystemClock, SchedulerConfig::default(), Arc::new(TestActionFactory::new()))
}

fn props(iterate_count: u64, result_code: i32) -> serde_json::Value {
    serde_json::json!({"iterate_count": iterate_count, "result_code": result_code})
}

fn desc() -> ActionDescription {
    ActionDescription::new([("name", TEST_ACTION_BASIC)])
}

#[test]
fn zero_iterations_ok_completes_with_no_progress() {
    let f = feature();
    let result = f.add_action(desc(), props(0, 0), true).expect("admission");
    assert!(result.is_ok());

    let action = f.registry().lookup(ActionId::from_raw(1)).expect("action present");
    assert_eq!(action.id().as_u64(), 1);
    assert_eq!(action.state(), ActionState::Complete);
    assert_eq!(action.progress(), 0);
}

#[test]
fn zero_iterations_failing_result_code_fails() {
    let f = feature();
    let result = f.add_action(desc(), props(0, 1), true).expect("admission");
    assert_eq!(result.code, 1);

    let action = f.registry().lookup(ActionId::from_raw(1)).unwrap();
    assert_eq!(action.state(), ActionState::Failed);
    assert_eq!(action.progress(), 0);
}

#[test]
fn one_iteration_ok_completes_with_progress_one() {
    let f = feature();
    let result = f.add_action(desc(), props(1, 0), true).expect("admission");
    assert!(result.is_ok());

    let action = f.registry().lookup(ActionId::from_raw(1)).unwrap();
    assert_eq!(action.state(), ActionState::Complete);
    assert_eq!(action.progress(), 1);
}

#[test]
fn hundred_iterations_failing_accumulates_full_progress() {
    let f = feature();
    let result = f.add_action(desc(), props(100, 1), true).expect("admission");
    assert_eq!(result.code, 1);

    let action = f.registry().lookup(ActionId::from_raw(1)).unwrap();
    assert_eq!(action.state(), ActionState::Failed);
    assert_eq!(action.progress(), 100);
}

#[test]
fn terminal_actions_never_transition_again() {
    let f = feature();
    f.add_action(desc(), props(0, 0), true).expect("admission");
    let action = f.registry().lookup(ActionId::from_raw(1)).unwrap();
    assert!(action.done());
    assert_eq!(action.state(), ActionState::Complete);

    // Re-admitting the same identity after it went terminal gets a fresh id
    // rather than mutating the first action.
    f.add_action(desc(), props(0, 0), true).expect("second admission");
    assert_eq!(action.state(), ActionState::Complete, "original action is untouched");
}

#[test]
fn finished_at_is_at_or_after_started_at_and_created_at() {
    let f = feature();
    f.add_action(desc(), props(3, 0), true).expect("admission");
    let action = f.registry().lookup(ActionId::from_raw(1)).unwrap();

    assert!(action.done());
    let created = action.created_at_ms();
    let started = action.started_at_ms().expect("started_at set on a driven action");
    let finished = action.finished_at_ms().expect("finished_at set on a terminal action");
    assert!(started >= created);
    assert!(finished >= started);
}
