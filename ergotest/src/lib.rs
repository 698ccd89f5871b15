// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ergotest is a self-contained engine for hierarchical test suites: nested
//! `describe`/`it` trees, inheritable `.skip`/`.only` marks, per-test
//! timeouts, composed before/after hooks, and isolated execution in a child
//! worker process.
//!
//! The pieces, leaves first:
//!
//! * [`clock`] — an abstraction over wall time, with a deterministic variant
//!   for tests.
//! * [`result`] — the immutable result tree ([`result::RunResult`],
//!   [`result::TestCaseResult`], [`result::TestSuiteResult`]).
//! * [`Runnable`] and [`before_after`] — a single timed invocation of a user
//!   function, and the hook wrappers built on top of it.
//! * [`TestCase`] and [`TestSuite`] — the tree nodes that drive recursive
//!   execution.
//! * [`dsl`] — the `describe`/`it` registration surface.
//! * [`loader`] — turns module paths into a tree of [`TestSuite`]s.
//! * [`runner`] — runs a suite in this process or in an isolated worker.

pub mod clock;
mod before_after;
mod context;
mod dsl;
mod dynload;
mod errors;
mod loader;
pub mod result;
mod runnable;
pub mod runner;
mod test_case;
mod test_suite;

pub use before_after::BeforeAfter;
pub use dsl::{after_all, after_each, before_all, before_each, describe, it, DescribeOptions, HookOptions, ItOptions};
pub use errors::Error;
pub use loader::Loader;
pub use result::{Mark, RunResult, Status, TestCaseResult, TestResult, TestSuiteResult};
pub use runnable::{Runnable, RunnableOptions, TestError, TestParameters};
pub use runner::{Runner, TestOptions};
pub use test_case::TestCase;
pub use test_suite::TestSuite;

/// Default timeout, in milliseconds, applied to a hook or test body when no
/// more specific option overrides it.
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Interval, in milliseconds, at which a worker emits a `keepalive` message.
pub const KEEPALIVE_INTERVAL_MS: u64 = 100;
