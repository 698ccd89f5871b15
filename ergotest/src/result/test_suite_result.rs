// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{HashMap, HashSet};

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use super::{Mark, Status, TestCaseResult, TestResult};

/// A node in the result tree: a suite's own before/after-all results plus
/// its children (each either a nested suite or a leaf test case).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename = "TestSuiteResult")]
pub struct TestSuiteResult {
    pub name: Vec<String>,
    pub mark: Mark,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub filename: Option<Utf8PathBuf>,
    #[serde(rename = "beforeAll")]
    pub before_all: Vec<TestCaseResult>,
    #[serde(rename = "afterAll")]
    pub after_all: Vec<TestCaseResult>,
    pub tests: Vec<TestResult>,
}

/// Counts of leaf test cases by status, plus a total.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Count {
    pub pass: usize,
    pub fail: usize,
    pub skip: usize,
    pub timeout: usize,
    pub total: usize,
}

impl TestSuiteResult {
    pub fn new(
        name: Vec<String>,
        mark: Mark,
        filename: Option<Utf8PathBuf>,
        before_all: Vec<TestCaseResult>,
        after_all: Vec<TestCaseResult>,
        tests: Vec<TestResult>,
    ) -> Self {
        Self {
            name,
            mark,
            filename,
            before_all,
            after_all,
            tests,
        }
    }

    /// In-order flattening of every [`TestCaseResult`] in this subtree,
    /// including `before_all`/`after_all` wrappers, descending in
    /// `before_all`, `tests`, `after_all` order (hooks bracket the suite's
    /// own tests the same way they bracket execution).
    pub fn all_tests(&self) -> Vec<&TestCaseResult> {
        let mut out = Vec::new();
        out.extend(self.before_all.iter());
        for t in &self.tests {
            match t {
                TestResult::Case(c) => out.push(c),
                TestResult::Suite(s) => out.extend(s.all_tests()),
            }
        }
        out.extend(self.after_all.iter());
        out
    }

    pub fn all_matching_tests(&self, statuses: &[Status]) -> Vec<&TestCaseResult> {
        self.all_tests()
            .into_iter()
            .filter(|c| statuses.contains(&c.status()))
            .collect()
    }

    /// Every result in the tree whose mark is not [`Mark::None`], including
    /// this suite itself. Traversal order is `before_all`, `after_all`,
    /// `tests`.
    pub fn all_marked_results(&self) -> Vec<MarkedResult<'_>> {
        self.all_matching_marks(&[Mark::Skip, Mark::Only])
    }

    pub fn all_matching_marks(&self, marks: &[Mark]) -> Vec<MarkedResult<'_>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.collect_marked(marks, &mut out, &mut seen);
        out
    }

    fn collect_marked<'a>(
        &'a self,
        marks: &[Mark],
        out: &mut Vec<MarkedResult<'a>>,
        seen: &mut HashSet<*const ()>,
    ) {
        fn push<'a>(
            marks: &[Mark],
            marked: MarkedResult<'a>,
            ptr: *const (),
            out: &mut Vec<MarkedResult<'a>>,
            seen: &mut HashSet<*const ()>,
        ) {
            if marks.contains(&marked.mark()) && seen.insert(ptr) {
                out.push(marked);
            }
        }

        push(marks, MarkedResult::Suite(self), self as *const _ as *const (), out, seen);
        for c in &self.before_all {
            push(marks, MarkedResult::Case(c), c as *const _ as *const (), out, seen);
        }
        for c in &self.after_all {
            push(marks, MarkedResult::Case(c), c as *const _ as *const (), out, seen);
        }
        for t in &self.tests {
            match t {
                TestResult::Case(c) => push(marks, MarkedResult::Case(c), c as *const _ as *const (), out, seen),
                TestResult::Suite(s) => s.collect_marked(marks, out, seen),
            }
        }
    }

    /// Filenames for which every associated test is `pass` — a file with
    /// any non-passing leaf (fail, skip or timeout) is excluded entirely.
    pub fn all_passing_files(&self) -> HashSet<Utf8PathBuf> {
        let mut per_file: HashMap<Utf8PathBuf, bool> = HashMap::new();
        for case in self.all_tests() {
            let Some(filename) = case.filename() else {
                continue;
            };
            let all_pass_so_far = per_file.entry(filename.clone()).or_insert(true);
            *all_pass_so_far &= case.is_pass();
        }
        per_file
            .into_iter()
            .filter_map(|(file, all_pass)| all_pass.then_some(file))
            .collect()
    }

    pub fn count(&self) -> Count {
        let mut count = Count::default();
        for case in self.all_tests() {
            count.total += 1;
            match case.status() {
                Status::Pass => count.pass += 1,
                Status::Fail => count.fail += 1,
                Status::Skip => count.skip += 1,
                Status::Timeout => count.timeout += 1,
            }
        }
        count
    }

    pub fn serialize(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("TestSuiteResult is always representable as JSON")
    }

    pub fn deserialize(value: serde_json::Value) -> Result<Self, crate::Error> {
        serde_json::from_value(value).map_err(crate::Error::Deserialize)
    }

    pub fn equals(&self, other: &TestSuiteResult) -> bool {
        self == other
    }
}

/// A borrowed reference into the result tree to a node with a mark, yielded
/// by [`TestSuiteResult::all_marked_results`].
#[derive(Clone, Copy, Debug)]
pub enum MarkedResult<'a> {
    Suite(&'a TestSuiteResult),
    Case(&'a TestCaseResult),
}

impl MarkedResult<'_> {
    pub fn mark(&self) -> Mark {
        match self {
            MarkedResult::Suite(s) => s.mark,
            MarkedResult::Case(c) => c.mark,
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::result::RunResult;
    use proptest::prelude::*;

    fn name_strategy() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-z]{1,6}", 1..3)
    }

    fn case_strategy() -> impl Strategy<Value = TestCaseResult> {
        (name_strategy(), any::<bool>()).prop_map(|(name, pass)| {
            let it = if pass {
                RunResult::pass(name, None)
            } else {
                RunResult::fail(name, None, &crate::runnable::TestError::new("boom"))
            };
            TestCaseResult::wrapping(it)
        })
    }

    /// Grows a bounded-depth result tree one suite level at a time, the way
    /// nextest-filtering's expression strategy grows an expression tree one
    /// operator at a time: leaves are plain cases, and each recursive step
    /// wraps a handful of them (or nested suites) in one more level.
    fn suite_strategy() -> impl Strategy<Value = TestResult> {
        let leaf = case_strategy().prop_map(TestResult::Case);

        leaf.prop_recursive(4, 32, 4, |inner| {
            (name_strategy(), prop::collection::vec(inner, 0..4)).prop_map(|(name, tests)| {
                TestResult::Suite(TestSuiteResult::new(name, Mark::None, None, vec![], vec![], tests))
            })
        })
    }

    proptest! {
        #[test]
        fn a_result_tree_round_trips_through_json(node in suite_strategy()) {
            let suite = match node {
                TestResult::Suite(s) => s,
                TestResult::Case(c) => TestSuiteResult::new(vec!["s".into()], Mark::None, None, vec![], vec![], vec![TestResult::Case(c)]),
            };
            let value = suite.serialize();
            prop_assert_eq!(TestSuiteResult::deserialize(value).unwrap(), suite);
        }
    }
}
