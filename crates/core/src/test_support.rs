// SPDX-License-Identifier: MIT

//! Shared test fixtures: the `TestActionBasic` reference plugin spec.md §8's
//! end-to-end scenarios are written against, and a factory wiring it (plus
//! any other registered plugins) to an [`ActionFactory`].
//!
//! Gated behind `test-support` so other crates embedding this scheduler can
//! reuse the same fixture in their own tests, matching the lineage's own
//! `test_support.rs` convention.

use crate::action::{ActionContext, ActionFactory, ActionStep};
use crate::description::ActionDescription;
use std::collections::HashMap;

/// The plugin spec.md §8's end-to-end scenarios are built around: reads
/// `iterate_count` (default 1) and `result_code` (default 0) from
/// `properties`, decrements a counter each step, and sets `result.code`
/// once the counter reaches zero.
pub struct TestActionBasic {
    remaining: u64,
    result_code: i32,
    saw_first: bool,
}

impl TestActionBasic {
    pub fn new(iterate_count: u64, result_code: i32) -> Self {
        Self { remaining: iterate_count, result_code, saw_first: false }
    }

    fn from_properties(properties: &serde_json::Value) -> Self {
        let iterate_count = properties.get("iterate_count").and_then(|v| v.as_u64()).unwrap_or(1);
        let result_code = properties
            .get("result_code")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32)
            .unwrap_or(0);
        Self::new(iterate_count, result_code)
    }

    fn step(&mut self, first: bool, ctx: &ActionContext) -> bool {
        assert_eq!(
            first, !self.saw_first,
            "first() must be called iff progress == 0, and only once"
        );
        self.saw_first = true;

        if self.remaining == 0 {
            if self.result_code != 0 {
                ctx.fail(self.result_code, "TestActionBasic: iterations exhausted");
            }
            return false;
        }
        self.remaining -= 1;
        true
    }
}

impl ActionStep for TestActionBasic {
    fn first(&mut self, ctx: &ActionContext) -> bool {
        self.step(true, ctx)
    }

    fn next(&mut self, ctx: &ActionContext) -> bool {
        self.step(false, ctx)
    }
}

/// Name `TestActionBasic` is registered under in the factory below.
pub const TEST_ACTION_BASIC: &str = "TestActionBasic";

/// A minimal [`ActionFactory`] mapping a fixed set of names to
/// constructors, for use in this crate's own tests and as a template for
/// an embedder's real factory.
#[derive(Default)]
pub struct TestActionFactory {
    extra: HashMap<String, Box<dyn Fn(&ActionDescription, &serde_json::Value) -> Box<dyn ActionStep> + Send + Sync>>,
}

impl TestActionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an additional constructor under `name`, for tests that
    /// need a plugin other than `TestActionBasic`.
    pub fn register(
        mut self,
        name: impl Into<String>,
        build: impl Fn(&ActionDescription, &serde_json::Value) -> Box<dyn ActionStep> + Send + Sync + 'static,
    ) -> Self {
        self.extra.insert(name.into(), Box::new(build));
        self
    }
}

impl ActionFactory for TestActionFactory {
    fn build(
        &self,
        name: &str,
        description: &ActionDescription,
        properties: &serde_json::Value,
    ) -> Option<Box<dyn ActionStep>> {
        if name == TEST_ACTION_BASIC {
            return Some(Box::new(TestActionBasic::from_properties(properties)));
        }
        self.extra.get(name).map(|build| build(description, properties))
    }
}

#[cfg(test)]
#[path = "test_support_tests.rs"]
mod tests;
