// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use super::Status;
use crate::runnable::TestError;

/// The outcome of a single invocation of a user function: a hook body or a
/// test body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename = "RunResult")]
pub struct RunResult {
    /// Outermost suite name first; the last element is the function's own
    /// label (e.g. the test name, or `"beforeEach"`).
    pub name: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub filename: Option<Utf8PathBuf>,
    pub status: Status,
    #[serde(rename = "errorMessage", skip_serializing_if = "Option::is_none", default)]
    pub error_message: Option<String>,
    #[serde(rename = "errorRender", skip_serializing_if = "Option::is_none", default)]
    pub error_render: Option<serde_json::Value>,
    #[serde(rename = "timeout", skip_serializing_if = "Option::is_none", default)]
    pub timeout_ms: Option<u64>,
}

impl RunResult {
    pub fn pass(name: Vec<String>, filename: Option<Utf8PathBuf>) -> Self {
        Self {
            name,
            filename,
            status: Status::Pass,
            error_message: None,
            error_render: None,
            timeout_ms: None,
        }
    }

    pub fn skip(name: Vec<String>, filename: Option<Utf8PathBuf>) -> Self {
        Self {
            name,
            filename,
            status: Status::Skip,
            error_message: None,
            error_render: None,
            timeout_ms: None,
        }
    }

    pub fn fail(name: Vec<String>, filename: Option<Utf8PathBuf>, error: &TestError) -> Self {
        Self {
            name,
            filename,
            status: Status::Fail,
            error_message: Some(error.message().to_string()),
            error_render: None,
            timeout_ms: None,
        }
    }

    pub fn timeout(name: Vec<String>, filename: Option<Utf8PathBuf>, timeout_ms: u64) -> Self {
        Self {
            name,
            filename,
            status: Status::Timeout,
            error_message: None,
            error_render: None,
            timeout_ms: Some(timeout_ms),
        }
    }

    /// Attaches a renderer's output to a failing result. A no-op on
    /// non-failing results, since `error_render` is only ever set alongside
    /// `error_message`.
    pub fn with_render(mut self, render: serde_json::Value) -> Self {
        if self.status == Status::Fail {
            self.error_render = Some(render);
        }
        self
    }

    pub fn is_pass(&self) -> bool {
        self.status == Status::Pass
    }

    pub fn is_fail(&self) -> bool {
        self.status == Status::Fail
    }

    pub fn is_skip(&self) -> bool {
        self.status == Status::Skip
    }

    pub fn is_timeout(&self) -> bool {
        self.status == Status::Timeout
    }

    pub fn serialize(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("RunResult is always representable as JSON")
    }

    pub fn deserialize(value: serde_json::Value) -> Result<Self, crate::Error> {
        serde_json::from_value(value).map_err(crate::Error::Deserialize)
    }

    pub fn equals(&self, other: &RunResult) -> bool {
        self == other
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_strategy::proptest;

    fn filename_strategy() -> impl Strategy<Value = Option<Utf8PathBuf>> {
        proptest::option::of("[a-z]{1,8}\\.rs".prop_map(Utf8PathBuf::from))
    }

    fn error_render_strategy() -> impl Strategy<Value = Option<serde_json::Value>> {
        proptest::option::of(any::<bool>().prop_map(serde_json::Value::Bool))
    }

    /// `RunResult` can't derive `Arbitrary` directly since `Utf8PathBuf` and
    /// `serde_json::Value` don't implement it, so the two affected fields
    /// get their own `#[strategy]`, the same way nextest-runner's
    /// proptests hand a non-`Arbitrary` field a strategy function.
    #[proptest]
    fn a_run_result_round_trips_through_json(
        name: Vec<String>,
        #[strategy(filename_strategy())] filename: Option<Utf8PathBuf>,
        status: Status,
        error_message: Option<String>,
        #[strategy(error_render_strategy())] error_render: Option<serde_json::Value>,
        timeout_ms: Option<u64>,
    ) {
        let result = RunResult {
            name,
            filename,
            status,
            error_message,
            error_render,
            timeout_ms,
        };
        let value = result.serialize();
        assert_eq!(RunResult::deserialize(value).unwrap(), result);
    }
}
