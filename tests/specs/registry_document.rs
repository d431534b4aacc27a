// SPDX-License-Identifier: MIT

//! Round-trip and invariant properties from spec.md §8, exercised through
//! the public registry/document API.

use maint_core::{ActionDescription, ActionState, MaintenanceFeature, RegistrySnapshot, SchedulerConfig, SystemClock};
use maint_core::test_support::{TestActionFactory, TEST_ACTION_BASIC};
use std::sync::Arc;

fn feature() -> MaintenanceFeature<SystemClock> {
    MaintenanceFeature::new(SystemClock, SchedulerConfig::default(), Arc::new(TestActionFactory::new()))
}

fn props(iterate_count: u64, result_code: i32) -> serde_json::Value {
    serde_json::json!({"iterate_count": iterate_count, "result_code": result_code})
}

fn desc(shard: &str) -> ActionDescription {
    ActionDescription::new([("name", TEST_ACTION_BASIC), ("shard", shard)])
}

#[test]
fn serialize_then_parse_round_trips_structurally() {
    let f = feature();
    f.add_action(desc("x"), props(0, 0), true).unwrap();
    f.add_action(desc("y"), props(0, 1), true).unwrap();
    f.add_action(desc("z"), props(3, 0), true).unwrap();

    let snapshot = f.to_structured_document();
    let json = snapshot.to_json().expect("serialize");
    let parsed = RegistrySnapshot::parse(&json).expect("parse");
    similar_asserts::assert_eq!(parsed, snapshot);
    assert_eq!(parsed.records.len(), 3);
}

#[test]
fn admitting_same_identity_twice_while_non_terminal_is_rejected() {
    let f = feature();
    f.add_action(desc("dup"), props(5, 0), false).expect("first admission");
    let before = f.registry().len();

    let err = f.add_action(desc("dup"), props(5, 0), false);
    assert!(err.is_err());
    assert_eq!(f.registry().len(), before, "registry size increases by exactly the first admission");
}

#[test]
fn serialized_records_carry_name_state_progress_and_result() {
    let f = feature();
    f.add_action(desc("named"), props(2, 7), true).unwrap();

    let snapshot = f.to_structured_document();
    let record = &snapshot.records[0];
    assert_eq!(record.name, TEST_ACTION_BASIC);
    assert_eq!(record.state, ActionState::Failed.wire_code());
    assert_eq!(record.result_code, 7);
    assert_eq!(record.progress, 2);
}

#[test]
fn non_terminal_actions_remain_unique_by_identity_across_the_registry() {
    let f = feature();
    f.add_action(desc("p"), props(5, 0), false).unwrap();
    f.add_action(desc("q"), props(5, 0), false).unwrap();

    let actions = f.registry().iterate();
    let mut hashes: Vec<u64> = actions
        .iter()
        .filter(|a| !a.done())
        .map(|a| a.description().identity_hash())
        .collect();
    hashes.sort_unstable();
    let before = hashes.len();
    hashes.dedup();
    assert_eq!(hashes.len(), before, "no two non-terminal actions share an identity hash");
}
