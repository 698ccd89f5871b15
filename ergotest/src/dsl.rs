// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `describe`/`it` registration surface.
//!
//! `describe` bodies run synchronously, re-entrantly: calling `describe`
//! pushes a new builder onto a thread-local stack, runs the body closure
//! (which may itself call `describe`, `it`, or a hook function — each
//! consulting the stack top), then pops and finishes the suite. Because the
//! stack is thread-local, building a suite tree from more than one thread at
//! once produces two independent trees, never a shared one.

use std::{cell::RefCell, sync::Arc};

use crate::{
    result::Mark,
    runnable::{BodyFn, TestError},
    test_case::{FailureTestCase, TestCase},
    test_suite::{SuiteChild, TestSuite},
};

thread_local! {
    static BUILDERS: RefCell<Vec<TestSuite>> = const { RefCell::new(Vec::new()) };
}

/// Options accepted by [`describe`].
#[derive(Clone, Debug, Default)]
pub struct DescribeOptions {
    pub mark: Mark,
    pub timeout_ms: Option<u64>,
}

impl DescribeOptions {
    pub fn skip() -> Self {
        Self {
            mark: Mark::Skip,
            ..Self::default()
        }
    }

    pub fn only() -> Self {
        Self {
            mark: Mark::Only,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// Options accepted by [`it`].
#[derive(Clone, Debug, Default)]
pub struct ItOptions {
    pub mark: Mark,
    pub timeout_ms: Option<u64>,
}

impl ItOptions {
    pub fn skip() -> Self {
        Self {
            mark: Mark::Skip,
            ..Self::default()
        }
    }

    pub fn only() -> Self {
        Self {
            mark: Mark::Only,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// Options accepted by `before_all`/`after_all`/`before_each`/`after_each`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HookOptions {
    pub timeout_ms: Option<u64>,
}

impl HookOptions {
    pub fn with_timeout(timeout_ms: u64) -> Self {
        Self { timeout_ms: Some(timeout_ms) }
    }
}

/// Registers a nested suite, running `body` (if present) synchronously to
/// populate it, and returns the finished suite. If there is an enclosing
/// `describe` in progress, the suite is also registered as one of its
/// children — the return value exists mainly for the top-level call, whose
/// result becomes a module's exported suite.
pub fn describe(name: impl Into<String>, options: DescribeOptions, body: Option<Box<dyn FnOnce()>>) -> TestSuite {
    let name = name.into();
    let auto_skip = body.is_none() && !options.mark.is_only();
    let mark = if auto_skip { Mark::Skip } else { options.mark };

    let mut suite = TestSuite::new(name.clone(), mark);
    if let Some(timeout_ms) = options.timeout_ms {
        suite = suite.with_timeout(timeout_ms);
    }

    match body {
        Some(body) => {
            BUILDERS.with(|stack| stack.borrow_mut().push(suite));
            body();
            suite = BUILDERS.with(|stack| stack.borrow_mut().pop().expect("describe pushed its own builder"));
        }
        None if options.mark.is_only() => {
            suite.push_child(SuiteChild::Failure(FailureTestCase::new(
                vec![name],
                None,
                TestError::new("Test suite is marked '.only', but it has no body"),
            )));
        }
        None => {}
    }

    register_with_enclosing(SuiteChild::Suite(suite.clone()));
    suite
}

/// Registers a leaf test in the current `describe`. Panics if called
/// outside one — the DSL has no other way to know which suite it belongs
/// to.
pub fn it(name: impl Into<String>, options: ItOptions, body: Option<Arc<BodyFn>>) {
    let name = name.into();
    let mark = if body.is_none() && options.mark == Mark::None {
        Mark::Skip
    } else {
        options.mark
    };
    let case = TestCase::new(name, mark, options.timeout_ms, body);
    register_with_enclosing(SuiteChild::Case(case));
}

/// Registers a `beforeAll` hook in the current `describe`.
pub fn before_all(options: HookOptions, body: Arc<BodyFn>) {
    with_current_builder("beforeAll", |suite| suite.push_before_all(options.timeout_ms, Some(body)));
}

/// Registers an `afterAll` hook in the current `describe`.
pub fn after_all(options: HookOptions, body: Arc<BodyFn>) {
    with_current_builder("afterAll", |suite| suite.push_after_all(options.timeout_ms, Some(body)));
}

/// Registers a `beforeEach` hook in the current `describe`.
pub fn before_each(options: HookOptions, body: Arc<BodyFn>) {
    with_current_builder("beforeEach", |suite| suite.push_before_each(options.timeout_ms, Some(body)));
}

/// Registers an `afterEach` hook in the current `describe`.
pub fn after_each(options: HookOptions, body: Arc<BodyFn>) {
    with_current_builder("afterEach", |suite| suite.push_after_each(options.timeout_ms, Some(body)));
}

fn with_current_builder(hook_kind: &str, f: impl FnOnce(&mut TestSuite)) {
    BUILDERS.with(|stack| {
        let mut stack = stack.borrow_mut();
        let suite = stack
            .last_mut()
            .unwrap_or_else(|| panic!("{hook_kind} called outside describe"));
        f(suite);
    });
}

fn register_with_enclosing(child: SuiteChild) {
    BUILDERS.with(|stack| {
        if let Some(parent) = stack.borrow_mut().last_mut() {
            parent.push_child(child);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(result: Result<(), &'static str>) -> Option<Arc<BodyFn>> {
        Some(Arc::new(move |_p| {
            let result = result;
            Box::pin(async move { result.map_err(TestError::new) })
        }))
    }

    #[test]
    fn describe_with_no_body_is_auto_skipped() {
        let suite = describe("empty", DescribeOptions::default(), None);
        assert!(suite.is_skipped());
    }

    #[test]
    fn describe_only_with_no_body_becomes_a_synthetic_failure() {
        let suite = describe("empty", DescribeOptions::only(), None);
        assert!(!suite.is_skipped());
    }

    #[test]
    fn it_without_body_or_mark_is_skipped() {
        let suite = describe(
            "s",
            DescribeOptions::default(),
            Some(Box::new(|| it("t", ItOptions::default(), None))),
        );
        assert!(suite.is_skipped());
    }

    #[tokio::test]
    async fn it_marked_only_without_body_fails_at_run_time() {
        let suite = describe(
            "s",
            DescribeOptions::default(),
            Some(Box::new(|| it("t", ItOptions::only(), None))),
        );
        let ctx = crate::context::RunContext {
            name_path: vec![],
            filename: None,
            timeout_ms: 2000,
            config: Arc::new(std::collections::HashMap::new()),
            on_result: Arc::new(|_| {}),
            renderer: None,
            before_each: vec![],
            after_each: vec![],
        };
        let result = suite.run_recursive(Mark::None, &ctx).await;
        assert_eq!(result.count().fail, 1);
    }

    #[test]
    fn nested_describe_registers_itself_with_its_parent() {
        let suite = describe(
            "outer",
            DescribeOptions::default(),
            Some(Box::new(|| {
                describe(
                    "inner",
                    DescribeOptions::default(),
                    Some(Box::new(|| it("t", ItOptions::default(), body(Ok(()))))),
                );
            })),
        );
        assert!(!suite.is_skipped());
    }

    #[test]
    #[should_panic(expected = "beforeEach called outside describe")]
    fn hook_registration_outside_describe_is_fatal() {
        before_each(HookOptions::default(), Arc::new(|_p| Box::pin(async { Ok(()) })));
    }
}
