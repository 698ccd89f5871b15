// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end checks for per-invocation timeouts: a slow body times out
//! without skipping its surrounding `beforeEach`, and separately-timed
//! invocations don't share a budget.

use std::sync::Arc;

use ergotest::{after_each, before_each, describe, it, DescribeOptions, ItOptions, TestOptions};

#[tokio::test(start_paused = true)]
async fn a_slow_body_times_out_without_skipping_before_each_but_does_skip_after_each() {
    let suite = describe(
        "s",
        DescribeOptions::default(),
        Some(Box::new(|| {
            before_each(Default::default(), Arc::new(|_p| Box::pin(async { Ok(()) })));
            after_each(Default::default(), Arc::new(|_p| Box::pin(async { Ok(()) })));
            it(
                "slow",
                ItOptions::default(),
                Some(Arc::new(|_p| {
                    Box::pin(async {
                        ergotest::clock::wait(2001).await;
                        Ok(())
                    })
                })),
            );
        })),
    );

    let result = suite.run(&TestOptions::default()).await.unwrap();
    let case = result.all_tests().into_iter().find(|c| c.name().last().unwrap() == "slow").unwrap();

    assert!(case.it.is_timeout());
    assert_eq!(case.it.timeout_ms, Some(2000));
    assert!(case.before_each[0].is_pass());
    assert!(case.after_each[0].is_skip());
}

#[tokio::test(start_paused = true)]
async fn each_invocation_is_timed_independently() {
    // A beforeEach that takes almost the whole default timeout must not eat
    // into the following test's own budget.
    let suite = describe(
        "s",
        DescribeOptions::default(),
        Some(Box::new(|| {
            before_each(
                Default::default(),
                Arc::new(|_p| {
                    Box::pin(async {
                        ergotest::clock::wait(1990).await;
                        Ok(())
                    })
                }),
            );
            it(
                "t",
                ItOptions::default(),
                Some(Arc::new(|_p| {
                    Box::pin(async {
                        ergotest::clock::wait(1990).await;
                        Ok(())
                    })
                })),
            );
        })),
    );

    let result = suite.run(&TestOptions::default()).await.unwrap();
    let case = result.all_tests().into_iter().find(|c| c.name().last().unwrap() == "t").unwrap();

    assert!(case.before_each[0].is_pass());
    assert!(case.it.is_pass());
}
