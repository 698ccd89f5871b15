// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The child side of the worker protocol: read one startup line, run the
//! suite it names, and stream progress/keepalive/complete/fatal messages
//! back. `ergotest-worker` is a thin binary wrapping [`serve`] around its
//! own stdin/stdout; this lives in the library so both the worker binary and
//! the in-process test suite here can exercise it directly.

use std::{sync::Arc, time::Duration};

use camino::Utf8PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use super::protocol::{StartupMessage, WorkerMessage};
use super::TestOptions;
use crate::{
    result::{RunResult, TestCaseResult, TestSuiteResult},
    runnable::TestError,
    Loader, KEEPALIVE_INTERVAL_MS,
};

/// Reads the startup message, runs the suite it names, and streams results
/// back until the child is done. Never returns an `Err` for anything that
/// happened inside the suite run itself — those become `fatal` or
/// `complete` wire messages instead; `Err` is reserved for I/O failures on
/// the pipes themselves.
pub async fn serve<R, W>(reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut lines = reader.lines();
    let startup_line = match lines.next_line().await? {
        Some(line) => line,
        None => return Ok(()),
    };

    let startup: StartupMessage = match serde_json::from_str(&startup_line) {
        Ok(m) => {
            debug!(module_paths = ?m.module_paths, "worker received startup message");
            m
        }
        Err(e) => {
            return write_one(&mut writer, &WorkerMessage::Fatal {
                message: format!("malformed startup message: {e}"),
                err: None,
            })
            .await;
        }
    };

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<WorkerMessage>();

    let writer_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if write_one(&mut writer, &message).await.is_err() {
                break;
            }
        }
    });

    let keepalive_tx = tx.clone();
    let keepalive_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(KEEPALIVE_INTERVAL_MS));
        interval.tick().await; // first tick is immediate
        loop {
            interval.tick().await;
            if keepalive_tx.send(WorkerMessage::Keepalive).is_err() {
                return;
            }
        }
    });

    let run_task = tokio::spawn(run_suite(startup, tx.clone()));

    match run_task.await {
        Ok(message) => {
            debug!("suite run finished, sending completion to parent");
            let _ = tx.send(message);
        }
        Err(join_err) => {
            let error = panic_to_test_error(join_err);
            debug!(error = %error, "suite run task panicked or was cancelled");
            let failure = unhandled_error_suite(&error);
            let _ = tx.send(WorkerMessage::Complete { result: failure.serialize() });
        }
    }

    keepalive_task.abort();
    drop(tx);
    let _ = writer_task.await;
    Ok(())
}

async fn run_suite(startup: StartupMessage, tx: tokio::sync::mpsc::UnboundedSender<WorkerMessage>) -> WorkerMessage {
    let module_paths: Vec<Utf8PathBuf> = startup.module_paths;
    let progress_tx = tx.clone();
    let options = TestOptions {
        timeout_ms: startup.timeout.unwrap_or(crate::DEFAULT_TIMEOUT_MS),
        config: startup
            .config
            .map(|m| m.into_iter().collect())
            .unwrap_or_default(),
        on_test_case_result: Some(Arc::new(move |case: &TestCaseResult| {
            let _ = progress_tx.send(WorkerMessage::Progress { result: case.serialize() });
        })),
        renderer: startup.renderer,
    };

    let suite = Loader::load(&module_paths);
    match suite.run(&options).await {
        Ok(result) => WorkerMessage::Complete { result: result.serialize() },
        Err(e) => WorkerMessage::Fatal { message: e.to_string(), err: None },
    }
}

fn panic_to_test_error(join_err: tokio::task::JoinError) -> TestError {
    match join_err.try_into_panic() {
        Ok(payload) => TestError::from_panic_payload(payload),
        Err(_) => TestError::new("worker task was cancelled"),
    }
}

/// The final result a worker reports when running the suite itself panicked
/// rather than the user body failing in the ordinary way.
fn unhandled_error_suite(error: &TestError) -> TestSuiteResult {
    let it = RunResult::fail(vec!["Unhandled error in tests".to_string()], None, error);
    TestSuiteResult::new(vec![], crate::result::Mark::None, None, vec![], vec![], vec![crate::result::TestResult::Case(
        TestCaseResult::wrapping(it),
    )])
}

async fn write_one<W: AsyncWrite + Unpin>(writer: &mut W, message: &WorkerMessage) -> std::io::Result<()> {
    let mut line = serde_json::to_string(message).expect("WorkerMessage is always representable as JSON");
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn reports_a_passing_suite_over_the_wire() {
        // No module paths: the loader returns an empty outer suite, which
        // runs to completion with no cases at all.
        let startup = StartupMessage {
            module_paths: vec![],
            timeout: None,
            config: None,
            renderer: None,
        };
        let input = format!("{}\n", serde_json::to_string(&startup).unwrap());
        let reader = Cursor::new(input.into_bytes());
        let (mut read_half, write_half) = tokio::io::duplex(64 * 1024);

        let serve_task = tokio::spawn(serve(tokio::io::BufReader::new(reader), write_half));
        let mut output = Vec::new();
        read_half.read_to_end(&mut output).await.unwrap();
        serve_task.await.unwrap().unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.lines().any(|line| line.contains("\"complete\"")));
    }
}
