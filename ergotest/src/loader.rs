// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns a list of module paths into a suite tree: each path becomes either
//! the [`TestSuite`] it exports, or a synthetic single-case failure suite if
//! it could not be loaded.

use camino::Utf8PathBuf;

use crate::{
    dynload::{self, DynLoadError},
    result::Mark,
    runnable::TestError,
    test_case::FailureTestCase,
    test_suite::{SuiteChild, TestSuite},
};

/// Loads modules by absolute path into a single synthetic outer suite.
pub struct Loader;

impl Loader {
    /// Loads every path in `module_paths`, in order, into one outer
    /// [`TestSuite`] whose children are the per-module suites (or synthetic
    /// failures for ones that didn't load).
    pub fn load(module_paths: &[Utf8PathBuf]) -> TestSuite {
        let mut outer = TestSuite::new("", Mark::None);
        for path in module_paths {
            outer.push_child(SuiteChild::Suite(Self::load_one(path)));
        }
        outer
    }

    fn load_one(path: &Utf8PathBuf) -> TestSuite {
        let basename = path.file_name().unwrap_or_else(|| path.as_str());
        let failure_name = vec![format!("error when importing {basename}")];

        if !path.is_absolute() {
            return failure_suite(
                path,
                failure_name,
                TestError::new(format!("module path must be absolute: {path}")),
            );
        }

        match dynload::load_suite(path) {
            Ok(mut suite) => {
                suite.set_filename(path.clone());
                *suite
            }
            Err(DynLoadError::NotFound) => failure_suite(path, failure_name, TestError::new("Test module not found")),
            Err(e) => failure_suite(path, failure_name, TestError::new(e.to_string())),
        }
    }
}

fn failure_suite(path: &Utf8PathBuf, case_name: Vec<String>, error: TestError) -> TestSuite {
    let mut suite = TestSuite::new("", Mark::None);
    suite.set_filename(path.clone());
    suite.push_child(SuiteChild::Failure(FailureTestCase::new(
        case_name,
        Some(path.clone()),
        error,
    )));
    suite
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::RunContext, result::TestResult};
    use std::{collections::HashMap, sync::Arc};

    fn run_ctx() -> RunContext {
        RunContext {
            name_path: vec![],
            filename: None,
            timeout_ms: 2000,
            config: Arc::new(HashMap::new()),
            on_result: Arc::new(|_| {}),
            renderer: None,
            before_each: vec![],
            after_each: vec![],
        }
    }

    #[tokio::test]
    async fn missing_module_becomes_a_synthetic_failure() {
        let path = Utf8PathBuf::from("/abs/does_not_exist.so");
        let outer = Loader::load(&[path.clone()]);
        let result = outer.run_recursive(Mark::None, &run_ctx()).await;
        let inner = match &result.tests[0] {
            TestResult::Suite(s) => s,
            _ => panic!("expected a nested suite"),
        };
        let case = match &inner.tests[0] {
            TestResult::Case(c) => c,
            _ => panic!("expected a synthetic failure case"),
        };
        assert!(case.is_fail());
        assert_eq!(case.name(), &["error when importing does_not_exist.so".to_string()]);
        assert!(case.it.error_message.as_deref().unwrap().contains("Test module not found"));
        assert_eq!(case.filename(), Some(&path));
    }

    #[tokio::test]
    async fn relative_path_is_rejected_before_loading() {
        let path = Utf8PathBuf::from("relative/module.so");
        let outer = Loader::load(&[path]);
        let result = outer.run_recursive(Mark::None, &run_ctx()).await;
        let inner = match &result.tests[0] {
            TestResult::Suite(s) => s,
            _ => panic!("expected a nested suite"),
        };
        let case = match &inner.tests[0] {
            TestResult::Case(c) => c,
            _ => panic!("expected a synthetic failure case"),
        };
        assert!(case.it.error_message.as_deref().unwrap().contains("must be absolute"));
    }
}
