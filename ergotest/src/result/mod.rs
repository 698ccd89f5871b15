// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The immutable result tree: [`RunResult`] (one user-function invocation),
//! [`TestCaseResult`] (one test, with its surrounding hooks) and
//! [`TestSuiteResult`] (a tree node). Every type here is a plain value:
//! once built by the execution engine, a result is never mutated again, and
//! equality is always structural.

mod mark;
mod run_result;
mod status;
mod test_case_result;
mod test_suite_result;

pub use mark::Mark;
pub use run_result::RunResult;
pub use status::Status;
pub use test_case_result::TestCaseResult;
pub use test_suite_result::{Count, TestSuiteResult};

/// A node in the result tree: either a suite or a leaf test case.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum TestResult {
    #[serde(rename = "TestSuiteResult")]
    Suite(TestSuiteResult),
    #[serde(rename = "TestCaseResult")]
    Case(TestCaseResult),
}

impl TestResult {
    pub fn mark(&self) -> Mark {
        match self {
            TestResult::Suite(s) => s.mark,
            TestResult::Case(c) => c.mark,
        }
    }

    /// In-order flattening of every [`TestCaseResult`] reachable from this
    /// node, descending through suites' `before_all`, `after_all` and
    /// `tests` in that order.
    pub fn all_tests(&self) -> Vec<&TestCaseResult> {
        match self {
            TestResult::Case(c) => vec![c],
            TestResult::Suite(s) => s.all_tests(),
        }
    }
}
