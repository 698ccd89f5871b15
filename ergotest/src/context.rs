// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ambient context threaded through a recursive suite/case run: the
//! accumulated name path, inherited filename and timeout, the config map,
//! the progress callback, and the optional renderer. [`RunContext`] is built
//! once per `run` call and cloned (cheaply — everything inside is an `Arc`
//! or a small value) as it is pushed down through nested suites.

use std::{collections::HashMap, sync::Arc};

use camino::Utf8PathBuf;

use crate::{
    before_after::BeforeAfter,
    result::TestCaseResult,
    runnable::{RunData, TestError},
};

/// Invoked for every completed [`TestCaseResult`], in execution order.
pub type OnTestCaseResult = Arc<dyn Fn(&TestCaseResult) + Send + Sync>;

/// Renders a failure into an opaque, serializable artifact. Absent unless
/// the caller configured a renderer module.
pub type Renderer = Arc<dyn Fn(&[String], &TestError, Option<&Utf8PathBuf>) -> serde_json::Value + Send + Sync>;

#[derive(Clone)]
pub struct RunContext {
    pub name_path: Vec<String>,
    pub filename: Option<Utf8PathBuf>,
    pub timeout_ms: u64,
    pub config: Arc<HashMap<String, serde_json::Value>>,
    pub on_result: OnTestCaseResult,
    pub renderer: Option<Renderer>,
    /// The effective `beforeEach` chain inherited from ancestors, outermost
    /// first. A suite appends its own hooks before handing this down.
    pub before_each: Vec<BeforeAfter>,
    /// The effective `afterEach` chain inherited from ancestors, innermost
    /// first (own hooks are prepended before handing this down, so the
    /// outermost suite's hook ends up last).
    pub after_each: Vec<BeforeAfter>,
}

impl RunContext {
    /// Builds the [`RunData`] a single [`crate::Runnable`] invocation needs:
    /// the effective timeout (the hook/test's own, else this context's),
    /// the config map, the renderer, and whether the whole subtree is being
    /// force-skipped.
    pub fn run_data(&self, skip_all: bool, own_timeout_ms: Option<u64>) -> RunData {
        RunData {
            timeout_ms: own_timeout_ms.unwrap_or(self.timeout_ms),
            config: self.config.clone(),
            skip_all,
            renderer: self.renderer.clone(),
        }
    }

    /// Returns a new context with `name` appended to the name path.
    pub fn push_name(&self, name: &str) -> Self {
        if name.is_empty() {
            return self.clone();
        }
        let mut next = self.clone();
        next.name_path.push(name.to_string());
        next
    }

    /// Full path for a leaf whose own label is `leaf_name`.
    pub fn full_name(&self, leaf_name: &str) -> Vec<String> {
        let mut full = self.name_path.clone();
        full.push(leaf_name.to_string());
        full
    }
}
