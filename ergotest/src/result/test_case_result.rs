// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use super::{Mark, RunResult, Status};

/// The outcome of one test case: its surrounding hook results plus its own
/// body's result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename = "TestCaseResult")]
pub struct TestCaseResult {
    pub mark: Mark,
    #[serde(rename = "beforeEach")]
    pub before_each: Vec<RunResult>,
    pub it: RunResult,
    #[serde(rename = "afterEach")]
    pub after_each: Vec<RunResult>,
}

impl TestCaseResult {
    pub fn new(mark: Mark, before_each: Vec<RunResult>, it: RunResult, after_each: Vec<RunResult>) -> Self {
        Self {
            mark,
            before_each,
            it,
            after_each,
        }
    }

    /// Wraps a bare [`RunResult`] as a case with no surrounding hooks — the
    /// shape `before_all`/`after_all` entries take.
    pub fn wrapping(it: RunResult) -> Self {
        Self {
            mark: Mark::None,
            before_each: Vec::new(),
            it,
            after_each: Vec::new(),
        }
    }

    pub fn name(&self) -> &[String] {
        &self.it.name
    }

    pub fn filename(&self) -> Option<&Utf8PathBuf> {
        self.it.filename.as_ref()
    }

    /// Folds `before_each`, `it` and `after_each` statuses by precedence
    /// (`fail > timeout > pass > skip`), with one exception: if every
    /// surrounding hook passed but the test itself is `skip`, the case as a
    /// whole is `skip` rather than whatever the naive fold would say.
    pub fn status(&self) -> Status {
        let hooks_folded = Status::fold_all(
            self.before_each
                .iter()
                .chain(self.after_each.iter())
                .map(|r| r.status),
        );
        if hooks_folded == Status::Pass && self.it.status == Status::Skip {
            return Status::Skip;
        }
        Status::fold_all(
            self.before_each
                .iter()
                .chain(std::iter::once(&self.it))
                .chain(self.after_each.iter())
                .map(|r| r.status),
        )
    }

    pub fn is_pass(&self) -> bool {
        self.status() == Status::Pass
    }

    pub fn is_fail(&self) -> bool {
        self.status() == Status::Fail
    }

    pub fn is_skip(&self) -> bool {
        self.status() == Status::Skip
    }

    pub fn is_timeout(&self) -> bool {
        self.status() == Status::Timeout
    }

    pub fn serialize(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("TestCaseResult is always representable as JSON")
    }

    pub fn deserialize(value: serde_json::Value) -> Result<Self, crate::Error> {
        serde_json::from_value(value).map_err(crate::Error::Deserialize)
    }

    pub fn equals(&self, other: &TestCaseResult) -> bool {
        self == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn run(status: Status) -> RunResult {
        match status {
            Status::Pass => RunResult::pass(vec!["x".into()], None),
            Status::Fail => RunResult::fail(vec!["x".into()], None, &crate::runnable::TestError::new("e")),
            Status::Skip => RunResult::skip(vec!["x".into()], None),
            Status::Timeout => RunResult::timeout(vec!["x".into()], None, 2000),
        }
    }

    #[test_case(Status::Pass, Status::Pass, Status::Pass, Status::Pass; "all pass")]
    #[test_case(Status::Pass, Status::Fail, Status::Pass, Status::Fail; "it fails")]
    #[test_case(Status::Fail, Status::Pass, Status::Pass, Status::Fail; "before_each fails")]
    #[test_case(Status::Pass, Status::Pass, Status::Timeout, Status::Timeout; "after_each times out")]
    #[test_case(Status::Pass, Status::Skip, Status::Pass, Status::Skip; "hooks pass, body skipped")]
    #[test_case(Status::Skip, Status::Skip, Status::Skip, Status::Skip; "everything skipped")]
    fn folds_status_with_precedence(before: Status, it: Status, after: Status, expected: Status) {
        let case = TestCaseResult::new(Mark::None, vec![run(before)], run(it), vec![run(after)]);
        assert_eq!(case.status(), expected);
    }

    #[test]
    fn wrapping_has_no_hooks() {
        let case = TestCaseResult::wrapping(RunResult::pass(vec!["beforeAll".into()], None));
        assert!(case.before_each.is_empty());
        assert!(case.after_each.is_empty());
        assert!(case.is_pass());
    }
}
