// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`BeforeAfter`]: a [`Runnable`] used as a lifecycle hook. `beforeAll` and
//! `afterAll` hooks are wrapped in a [`TestCaseResult`] so the progress
//! callback can observe their failures the same way it observes test
//! failures; `beforeEach`/`afterEach` hooks report their bare [`RunResult`].
//!
//! A hook stores just its own label (e.g. `"beforeEach"`, or `"beforeEach
//! #2"` when a suite registers more than one) and builds its full reporting
//! name fresh on each run. For `beforeAll`/`afterAll` that's always the
//! current [`RunContext`]'s path, since those never leave their own suite.
//! `beforeEach`/`afterEach` hooks get composed into a chain that runs under
//! a deeper suite's context, so theirs is frozen at composition time instead
//! — see `name_prefix` below.

use std::sync::Arc;

use crate::{
    context::RunContext,
    result::{RunResult, TestCaseResult},
    runnable::{BodyFn, Runnable, RunnableOptions},
};

/// A single lifecycle hook: `beforeAll`, `afterAll`, `beforeEach` or
/// `afterEach`.
///
/// `beforeEach`/`afterEach` hooks are composed across suite levels before
/// they run (see `TestSuite::run_recursive`'s step 4), so by the time one
/// actually executes, the `RunContext` it's handed belongs to the innermost
/// suite, not the suite that registered it. `name_prefix` freezes the
/// registering suite's own path at composition time so the hook's reported
/// name stays `[own suite path, label]` regardless of how deep it's nested
/// under by the time it runs. `beforeAll`/`afterAll` hooks never leave their
/// own suite, so they're run with `name_prefix` unset and fall back to the
/// context's path as before.
#[derive(Clone)]
pub struct BeforeAfter {
    label: String,
    timeout_ms: Option<u64>,
    body: Option<Arc<BodyFn>>,
    name_prefix: Option<Vec<String>>,
}

impl BeforeAfter {
    pub fn new(label: impl Into<String>, timeout_ms: Option<u64>, body: Option<Arc<BodyFn>>) -> Self {
        Self {
            label: label.into(),
            timeout_ms,
            body,
            name_prefix: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Overrides this hook's label, e.g. to apply final `#N` numbering once
    /// the suite it belongs to knows how many hooks of that kind it has.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Freezes `prefix` as this hook's reported name prefix, overriding
    /// whatever suite path it's nested under when it actually runs.
    pub fn with_name_prefix(mut self, prefix: Vec<String>) -> Self {
        self.name_prefix = Some(prefix);
        self
    }

    fn full_name(&self, ctx: &RunContext) -> Vec<String> {
        match &self.name_prefix {
            Some(prefix) => {
                let mut name = prefix.clone();
                name.push(self.label.clone());
                name
            }
            None => ctx.full_name(&self.label),
        }
    }

    fn runnable(&self, ctx: &RunContext) -> Runnable {
        Runnable::new(
            self.full_name(ctx),
            ctx.filename.clone(),
            RunnableOptions {
                timeout_ms: self.timeout_ms,
            },
            self.body.clone(),
        )
    }

    /// Runs a `beforeAll`/`afterAll` hook, wraps the result in a
    /// [`TestCaseResult`] and reports it through `ctx.on_result`.
    pub async fn run_before_after_all(&self, ctx: &RunContext, skip_all: bool) -> TestCaseResult {
        let run_result = self.runnable(ctx).run(&ctx.run_data(skip_all, self.timeout_ms)).await;
        let case = TestCaseResult::wrapping(run_result);
        (ctx.on_result)(&case);
        case
    }

    /// Runs a `beforeEach`/`afterEach` hook and returns the bare
    /// [`RunResult`]; the caller folds it into the enclosing test case's
    /// result and reports that instead.
    pub async fn run_before_after_each(&self, ctx: &RunContext, skip_all: bool) -> RunResult {
        self.runnable(ctx).run(&ctx.run_data(skip_all, self.timeout_ms)).await
    }

    pub(crate) fn skipped(&self, ctx: &RunContext) -> RunResult {
        RunResult::skip(self.full_name(ctx), ctx.filename.clone())
    }
}
