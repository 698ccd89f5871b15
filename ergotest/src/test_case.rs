// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`TestCase`]: a leaf test. Composes the parent's `beforeEach` hooks, its
//! own body, and the parent's `afterEach` hooks into one [`TestCaseResult`].

use std::sync::Arc;

use camino::Utf8PathBuf;
use tracing::debug;

use crate::{
    before_after::BeforeAfter,
    context::RunContext,
    result::{Mark, RunResult, TestCaseResult},
    runnable::{BodyFn, Runnable, RunnableOptions, TestError},
};

/// A named leaf test: an optional body, an optional own timeout, and a
/// mark.
#[derive(Clone)]
pub struct TestCase {
    name: String,
    mark: Mark,
    timeout_ms: Option<u64>,
    body: Option<Arc<BodyFn>>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, mark: Mark, timeout_ms: Option<u64>, body: Option<Arc<BodyFn>>) -> Self {
        Self {
            name: name.into(),
            mark,
            timeout_ms,
            body,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mark(&self) -> Mark {
        self.mark
    }

    /// Whether this case is skipped given the inherited mark from its
    /// parent: its own mark (falling back to the parent's) resolves to
    /// `skip`, or it simply has no body to run.
    pub(crate) fn is_skipped(&self, parent_mark: Mark) -> bool {
        self.mark.inherit(parent_mark).is_skip() || self.body.is_none()
    }

    /// Runs this case: composed `beforeEach` hooks, the body, then composed
    /// `afterEach` hooks, reporting the assembled [`TestCaseResult`] through
    /// `ctx.on_result` before returning it.
    pub async fn run_recursive(
        &self,
        parent_mark: Mark,
        before_each: &[BeforeAfter],
        after_each: &[BeforeAfter],
        suite_ctx: &RunContext,
    ) -> TestCaseResult {
        let case_ctx = suite_ctx.push_name(&self.name);
        debug!(test = ?case_ctx.name_path, "running test case");
        let mut skip_this = self.is_skipped(parent_mark);

        let mut before_results = Vec::with_capacity(before_each.len());
        for hook in before_each {
            let result = if skip_this {
                hook.skipped(suite_ctx)
            } else {
                hook.run_before_after_each(suite_ctx, false).await
            };
            if !matches!(result.status, crate::result::Status::Pass | crate::result::Status::Skip) {
                skip_this = true;
            }
            before_results.push(result);
        }

        let body_skip_at_start = skip_this;
        let it = self.run_body(&case_ctx, skip_this).await;

        // A timed-out body may still be running in the background (the
        // clock races it, it doesn't cancel it), so afterEach is skipped
        // rather than run against whatever state that body left behind. An
        // ordinary pass/fail still runs afterEach normally — that's when
        // cleanup is most needed.
        let skip_after = body_skip_at_start || it.is_timeout();
        if it.is_timeout() {
            debug!(test = ?case_ctx.name_path, "test timed out, skipping afterEach");
        }
        let mut after_results = Vec::with_capacity(after_each.len());
        for hook in after_each {
            let result = if skip_after {
                hook.skipped(suite_ctx)
            } else {
                hook.run_before_after_each(suite_ctx, false).await
            };
            after_results.push(result);
        }

        let case = TestCaseResult::new(self.mark, before_results, it, after_results);
        (case_ctx.on_result)(&case);
        case
    }

    /// `ctx` here is already the per-case context (its name path already
    /// ends with this case's own name), unlike the hook helpers below which
    /// build their full name from the enclosing suite's context instead.
    async fn run_body(&self, ctx: &RunContext, skip_this: bool) -> RunResult {
        let name = ctx.name_path.clone();
        if self.body.is_none() && self.mark.is_only() {
            let error = TestError::new("Test is marked '.only', but it has no body");
            return RunResult::fail(name, ctx.filename.clone(), &error);
        }
        let runnable = Runnable::new(
            name,
            ctx.filename.clone(),
            RunnableOptions {
                timeout_ms: self.timeout_ms,
            },
            self.body.clone(),
        );
        runnable.run(&ctx.run_data(skip_this, self.timeout_ms)).await
    }
}

/// A synthetic case used when a module fails to load. Always produces a
/// single `fail` [`RunResult`] carrying the load error, with mark
/// [`Mark::None`] regardless of how its parent suite was marked.
#[derive(Clone)]
pub struct FailureTestCase {
    name: Vec<String>,
    filename: Option<Utf8PathBuf>,
    error: TestError,
}

impl FailureTestCase {
    pub fn new(name: Vec<String>, filename: Option<Utf8PathBuf>, error: TestError) -> Self {
        Self { name, filename, error }
    }

    pub async fn run_recursive(&self, ctx: &RunContext) -> TestCaseResult {
        let it = RunResult::fail(self.name.clone(), self.filename.clone(), &self.error);
        let case = TestCaseResult::new(Mark::None, vec![], it, vec![]);
        (ctx.on_result)(&case);
        case
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::OnTestCaseResult;
    use std::{collections::HashMap, sync::Mutex};

    fn ctx_with_recorder() -> (RunContext, Arc<Mutex<Vec<TestCaseResult>>>) {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let recorder = recorded.clone();
        let on_result: OnTestCaseResult = Arc::new(move |case| recorder.lock().unwrap().push(case.clone()));
        (
            RunContext {
                name_path: vec![],
                filename: None,
                timeout_ms: 2000,
                config: Arc::new(HashMap::new()),
                on_result,
                renderer: None,
                before_each: vec![],
                after_each: vec![],
            },
            recorded,
        )
    }

    #[tokio::test]
    async fn passing_case_with_no_hooks() {
        let (ctx, recorded) = ctx_with_recorder();
        let case = TestCase::new("t", Mark::None, None, Some(Arc::new(|_p| Box::pin(async { Ok(()) }))));
        let result = case.run_recursive(Mark::None, &[], &[], &ctx).await;
        assert!(result.is_pass());
        assert_eq!(result.name(), &["t".to_string()]);
        assert_eq!(recorded.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn skip_mark_skips_the_body() {
        let (ctx, _recorded) = ctx_with_recorder();
        let case = TestCase::new("t", Mark::Skip, None, Some(Arc::new(|_p| Box::pin(async { panic!("must not run") }))));
        let result = case.run_recursive(Mark::None, &[], &[], &ctx).await;
        assert!(result.is_skip());
    }

    #[tokio::test]
    async fn only_with_no_body_fails_at_execution_time() {
        let (ctx, _recorded) = ctx_with_recorder();
        let case = TestCase::new("t", Mark::Only, None, None);
        let result = case.run_recursive(Mark::None, &[], &[], &ctx).await;
        assert!(result.is_fail());
        assert_eq!(
            result.it.error_message.as_deref(),
            Some("Test is marked '.only', but it has no body")
        );
    }

    #[tokio::test]
    async fn missing_body_without_only_is_skipped() {
        let (ctx, _recorded) = ctx_with_recorder();
        let case = TestCase::new("t", Mark::None, None, None);
        let result = case.run_recursive(Mark::None, &[], &[], &ctx).await;
        assert!(result.is_skip());
    }

    #[tokio::test]
    async fn failing_before_each_skips_the_body_and_after_each() {
        let (ctx, _recorded) = ctx_with_recorder();
        let failing_before = BeforeAfter::new(
            "beforeEach",
            None,
            Some(Arc::new(|_p| Box::pin(async { Err(TestError::new("setup failed")) }))),
        );
        let after_ran = Arc::new(Mutex::new(false));
        let after_ran_clone = after_ran.clone();
        let after = BeforeAfter::new(
            "afterEach",
            None,
            Some(Arc::new(move |_p| {
                let after_ran = after_ran_clone.clone();
                Box::pin(async move {
                    *after_ran.lock().unwrap() = true;
                    Ok(())
                })
            })),
        );
        let case = TestCase::new(
            "t",
            Mark::None,
            None,
            Some(Arc::new(|_p| Box::pin(async { panic!("body must not run") }))),
        );
        let result = case
            .run_recursive(Mark::None, std::slice::from_ref(&failing_before), std::slice::from_ref(&after), &ctx)
            .await;
        assert!(result.before_each[0].is_fail());
        assert!(result.it.is_skip());
        assert!(result.after_each[0].is_skip());
        assert!(!*after_ran.lock().unwrap());
    }
}
