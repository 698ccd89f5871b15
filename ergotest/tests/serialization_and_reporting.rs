// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end checks for the result tree's serialization round-trip and the
//! `all_passing_files` aggregate.

use std::sync::Arc;

use ergotest::{describe, it, DescribeOptions, ItOptions, TestOptions};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn a_full_result_tree_round_trips_through_json() {
    let suite = describe(
        "s",
        DescribeOptions::default(),
        Some(Box::new(|| {
            it("pass", ItOptions::default(), Some(Arc::new(|_p| Box::pin(async { Ok(()) }))));
            it(
                "fail",
                ItOptions::default(),
                Some(Arc::new(|_p| Box::pin(async { Err(ergotest::TestError::new("boom")) }))),
            );
            it("skip", ItOptions::skip(), Some(Arc::new(|_p| Box::pin(async { Ok(()) }))));
        })),
    );

    let result = suite.run(&TestOptions::default()).await.unwrap();
    let value = result.serialize();
    let round_tripped = ergotest::TestSuiteResult::deserialize(value).unwrap();
    assert_eq!(round_tripped, result);
}

#[tokio::test]
async fn passing_files_excludes_a_file_whose_module_failed_to_load() {
    let modules = [
        camino::Utf8PathBuf::from("/abs/does_not_exist_a.mod"),
        camino::Utf8PathBuf::from("/abs/does_not_exist_b.mod"),
    ];
    let loaded = ergotest::Loader::load(&modules);
    let result = loaded.run(&TestOptions::default()).await.unwrap();

    // Every module failed to load, so nothing in the tree passed; neither
    // file should be reported as passing.
    assert!(result.all_passing_files().is_empty());
    assert_eq!(result.count().fail, 2);
}
