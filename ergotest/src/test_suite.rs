// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`TestSuite`]: a node in the suite tree. Owns nested tests, its own
//! hooks, and an optional timeout; drives recursive execution, mark
//! propagation, and before/after-each composition.

use std::sync::Arc;

use camino::Utf8PathBuf;

use tracing::debug;

use crate::{
    before_after::BeforeAfter,
    context::RunContext,
    dynload,
    errors::Error,
    result::{Mark, TestCaseResult, TestResult, TestSuiteResult},
    runner::TestOptions,
    test_case::{FailureTestCase, TestCase},
};

/// A child of a [`TestSuite`]: another suite, a leaf test, or a synthetic
/// failure case standing in for a module that failed to load.
#[derive(Clone)]
pub enum SuiteChild {
    Suite(TestSuite),
    Case(TestCase),
    Failure(FailureTestCase),
}

/// A node in the suite tree.
#[derive(Clone)]
pub struct TestSuite {
    name: String,
    mark: Mark,
    timeout_ms: Option<u64>,
    filename: Option<Utf8PathBuf>,
    before_all: Vec<BeforeAfter>,
    after_all: Vec<BeforeAfter>,
    before_each: Vec<BeforeAfter>,
    after_each: Vec<BeforeAfter>,
    tests: Vec<SuiteChild>,
}

impl TestSuite {
    pub fn new(name: impl Into<String>, mark: Mark) -> Self {
        Self {
            name: name.into(),
            mark,
            timeout_ms: None,
            filename: None,
            before_all: Vec::new(),
            after_all: Vec::new(),
            before_each: Vec::new(),
            after_each: Vec::new(),
            tests: Vec::new(),
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Sets this suite's own filename, inherited by descendants that don't
    /// define their own. Used by the module loader.
    pub fn set_filename(&mut self, filename: Utf8PathBuf) {
        self.filename = Some(filename);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mark(&self) -> Mark {
        self.mark
    }

    // Hooks are pushed with their bare kind as a placeholder label; the
    // final `#N` numbering depends on how many of that kind the suite ends
    // up with in total, which isn't known until the describe body finishes
    // running, so it's resolved lazily in `run_recursive` instead.

    pub fn push_before_all(&mut self, timeout_ms: Option<u64>, body: Option<std::sync::Arc<crate::runnable::BodyFn>>) {
        self.before_all.push(BeforeAfter::new("beforeAll", timeout_ms, body));
    }

    pub fn push_after_all(&mut self, timeout_ms: Option<u64>, body: Option<std::sync::Arc<crate::runnable::BodyFn>>) {
        self.after_all.push(BeforeAfter::new("afterAll", timeout_ms, body));
    }

    pub fn push_before_each(&mut self, timeout_ms: Option<u64>, body: Option<std::sync::Arc<crate::runnable::BodyFn>>) {
        self.before_each.push(BeforeAfter::new("beforeEach", timeout_ms, body));
    }

    pub fn push_after_each(&mut self, timeout_ms: Option<u64>, body: Option<std::sync::Arc<crate::runnable::BodyFn>>) {
        self.after_each.push(BeforeAfter::new("afterEach", timeout_ms, body));
    }

    pub fn push_child(&mut self, child: SuiteChild) {
        self.tests.push(child);
    }

    fn has_only_descendant(&self) -> bool {
        self.tests.iter().any(|child| match child {
            SuiteChild::Case(c) => c.mark().is_only(),
            SuiteChild::Suite(s) => s.mark == Mark::Only || s.has_only_descendant(),
            SuiteChild::Failure(_) => false,
        })
    }

    pub fn is_skipped(&self) -> bool {
        self.is_skipped_given(Mark::None)
    }

    fn is_skipped_given(&self, parent_mark: Mark) -> bool {
        let own = self.mark.inherit(parent_mark);
        if self.tests.is_empty() {
            return own.is_skip();
        }
        self.tests.iter().all(|child| match child {
            SuiteChild::Case(c) => c.is_skipped(own),
            SuiteChild::Suite(s) => s.is_skipped_given(own),
            SuiteChild::Failure(_) => false,
        })
    }

    /// Recursively runs this suite, producing a [`TestSuiteResult`].
    pub async fn run_recursive(&self, parent_mark: Mark, parent_ctx: &RunContext) -> TestSuiteResult {
        let ctx = parent_ctx.push_name(&self.name);
        let ctx = RunContext {
            filename: self.filename.clone().or_else(|| parent_ctx.filename.clone()),
            timeout_ms: self.timeout_ms.unwrap_or(parent_ctx.timeout_ms),
            ..ctx
        };

        debug!(suite = ?ctx.name_path, "running suite");

        // A suite marked (or inheriting) skip never runs its own lifecycle
        // hooks at all — there's nothing left underneath for them to set up.
        let suite_mark = self.mark.inherit(parent_mark);
        let suite_skip = suite_mark.is_skip();

        // Hooks are numbered `#1`, `#2`, ... as soon as a suite registers
        // more than one of a given kind; a lone hook stays unnumbered.
        let before_all = relabeled_hooks("beforeAll", &self.before_all);
        let after_all = relabeled_hooks("afterAll", &self.after_all);

        // Step 2: run before_all in order.
        let mut before_all_results = Vec::with_capacity(before_all.len());
        let mut before_all_failed = false;
        for hook in &before_all {
            let case = if suite_skip || before_all_failed {
                wrap_skipped(hook, &ctx)
            } else {
                hook.run_before_after_all(&ctx, false).await
            };
            if !matches!(case.status(), crate::result::Status::Pass | crate::result::Status::Skip) {
                if !before_all_failed {
                    debug!(suite = ?ctx.name_path, hook = hook.label(), "beforeAll failed, skipping remaining hooks and descendants");
                }
                before_all_failed = true;
            }
            before_all_results.push(case);
        }

        // Step 3: resolve the mark children inherit. An `.only` anywhere in
        // this subtree — whether on this suite itself or buried in a
        // descendant — prunes every sibling branch that doesn't lead to one;
        // a branch's own explicit mark still overrides this on the way back
        // down, which is what lets the `.only` leaf itself keep running.
        let mut inherited_mark = if self.has_only_descendant() {
            Mark::Skip
        } else if self.mark.is_only() {
            Mark::Only
        } else {
            suite_mark
        };
        if before_all_failed {
            inherited_mark = Mark::Skip;
        }

        // Step 4: compose before-each/after-each.
        // Effective before-each is parent-first, own-last; effective
        // after-each is own-first, parent-last, so outer afters run last.
        // Own hooks are stamped with this suite's own path before being
        // folded in, so their reported name stays tied to the suite that
        // registered them even once a deeper suite's context takes over.
        let own_before_each = relabeled_hooks("beforeEach", &self.before_each)
            .into_iter()
            .map(|h| h.with_name_prefix(ctx.name_path.clone()));
        let own_after_each = relabeled_hooks("afterEach", &self.after_each)
            .into_iter()
            .map(|h| h.with_name_prefix(ctx.name_path.clone()));

        let mut effective_before_each = parent_ctx.before_each.clone();
        effective_before_each.extend(own_before_each);
        let mut effective_after_each: Vec<BeforeAfter> = own_after_each.collect();
        effective_after_each.extend(parent_ctx.after_each.iter().cloned());

        let child_ctx = RunContext {
            before_each: effective_before_each.clone(),
            after_each: effective_after_each.clone(),
            ..ctx.clone()
        };

        // Step 5: run children in registration order.
        let mut results = Vec::with_capacity(self.tests.len());
        for child in &self.tests {
            let result = match child {
                SuiteChild::Case(case) => TestResult::Case(
                    case.run_recursive(inherited_mark, &effective_before_each, &effective_after_each, &ctx)
                        .await,
                ),
                SuiteChild::Suite(suite) => {
                    TestResult::Suite(Box::pin(suite.run_recursive(inherited_mark, &child_ctx)).await)
                }
                SuiteChild::Failure(failure) => TestResult::Case(failure.run_recursive(&child_ctx).await),
            };
            results.push(result);
        }

        // Step 6: run after_all in order. This runs even when before_all
        // failed or a child failed — only the suite's own skip status and an
        // earlier after_all failure (within this same suite) gate it.
        let mut after_all_results = Vec::with_capacity(after_all.len());
        let mut after_all_failed = false;
        for hook in &after_all {
            let case = if suite_skip || after_all_failed {
                wrap_skipped(hook, &ctx)
            } else {
                hook.run_before_after_all(&ctx, false).await
            };
            if !matches!(case.status(), crate::result::Status::Pass | crate::result::Status::Skip) {
                if !after_all_failed {
                    debug!(suite = ?ctx.name_path, hook = hook.label(), "afterAll hook failed");
                }
                after_all_failed = true;
            }
            after_all_results.push(case);
        }

        TestSuiteResult::new(
            ctx.name_path.clone(),
            self.mark,
            ctx.filename.clone(),
            before_all_results,
            after_all_results,
            results,
        )
    }

    /// The public entry point: loads the renderer (if configured), builds
    /// the root [`RunContext`] from `options`, and runs the whole tree.
    pub async fn run(&self, options: &TestOptions) -> Result<TestSuiteResult, Error> {
        let renderer = match &options.renderer {
            Some(path) => {
                if !path.is_absolute() {
                    return Err(Error::NonAbsolutePath(path.clone()));
                }
                Some(dynload::load_renderer(path)?)
            }
            None => None,
        };

        let ctx = RunContext {
            name_path: Vec::new(),
            filename: None,
            timeout_ms: options.timeout_ms,
            config: Arc::new(options.config.clone()),
            on_result: options
                .on_test_case_result
                .clone()
                .unwrap_or_else(|| Arc::new(|_| {})),
            renderer,
            before_each: Vec::new(),
            after_each: Vec::new(),
        };

        Ok(self.run_recursive(Mark::None, &ctx).await)
    }
}

/// Labels `hooks` (all of one `kind`) for reporting: a lone hook keeps the
/// bare kind name, but as soon as a suite registers more than one, every
/// hook of that kind is numbered from `#1`, e.g. `beforeAll #1`, `beforeAll
/// #2`.
fn relabeled_hooks(kind: &str, hooks: &[BeforeAfter]) -> Vec<BeforeAfter> {
    let total = hooks.len();
    hooks
        .iter()
        .cloned()
        .enumerate()
        .map(|(index, hook)| hook.with_label(hook_label(kind, index, total)))
        .collect()
}

fn hook_label(kind: &str, index: usize, total: usize) -> String {
    if total <= 1 {
        kind.to_string()
    } else {
        format!("{kind} #{}", index + 1)
    }
}

fn wrap_skipped(hook: &BeforeAfter, ctx: &RunContext) -> TestCaseResult {
    TestCaseResult::wrapping(hook.skipped(ctx))
}
