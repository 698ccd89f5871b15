// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs a loaded suite either directly in this process, or isolated in a
//! spawned `ergotest-worker` child, watched over by a keepalive watchdog.

mod protocol;
mod worker;

use std::{collections::HashMap, process::Stdio};

use camino::Utf8PathBuf;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    process::Command,
};
use tracing::debug;

pub use protocol::{StartupMessage, WorkerMessage};
pub use worker::serve as serve_worker;

use crate::{
    clock,
    context::OnTestCaseResult,
    errors::Error,
    result::{Mark, RunResult, TestCaseResult, TestResult, TestSuiteResult},
    Loader,
};

/// Options accepted by [`TestSuite::run`](crate::TestSuite::run) and by
/// [`Runner`]'s two entry points.
#[derive(Clone)]
pub struct TestOptions {
    /// Default timeout, in milliseconds, for hooks/tests that don't specify
    /// their own.
    pub timeout_ms: u64,
    /// Arbitrary fixture data exposed to bodies via `TestParameters::get_config`.
    pub config: HashMap<String, serde_json::Value>,
    /// Invoked for every completed [`TestCaseResult`], in execution order.
    pub on_test_case_result: Option<OnTestCaseResult>,
    /// Absolute path to a renderer module, if any.
    pub renderer: Option<Utf8PathBuf>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            timeout_ms: crate::DEFAULT_TIMEOUT_MS,
            config: HashMap::new(),
            on_test_case_result: None,
            renderer: None,
        }
    }
}

/// Runs a suite in-process, or isolated in a worker process.
pub struct Runner;

impl Runner {
    /// Loads `module_paths` and runs the resulting suite directly on the
    /// caller's runtime. No process isolation, no watchdog: a body that
    /// hangs forever hangs this call forever too.
    pub async fn run_in_process(module_paths: &[Utf8PathBuf], options: &TestOptions) -> Result<TestSuiteResult, Error> {
        let suite = Loader::load(module_paths);
        suite.run(options).await
    }

    /// Spawns `worker_command` (expected to behave like the `ergotest-worker`
    /// binary: read one startup line, stream progress/keepalive/complete/fatal
    /// lines back), sends the startup message, and watches the stream for a
    /// keepalive at least every `watchdog_ms` (default: `options.timeout_ms`).
    /// The worker is killed when this call returns, however it returns.
    pub async fn run_in_child_process(
        worker_command: impl AsRef<std::ffi::OsStr>,
        module_paths: &[Utf8PathBuf],
        options: &TestOptions,
        watchdog_ms: Option<u64>,
    ) -> Result<TestSuiteResult, Error> {
        let watchdog_ms = watchdog_ms.unwrap_or(options.timeout_ms);

        debug!(watchdog_ms, "spawning worker process");
        let mut child = Command::new(worker_command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(Error::WorkerSpawn)?;

        let mut stdin = child.stdin.take().expect("stdin was piped");
        let stdout = child.stdout.take().expect("stdout was piped");

        let startup = StartupMessage {
            module_paths: module_paths.to_vec(),
            timeout: Some(options.timeout_ms),
            config: Some(options.config.clone().into_iter().collect()),
            renderer: options.renderer.clone(),
        };
        let mut line = serde_json::to_string(&startup).expect("StartupMessage is always representable as JSON");
        line.push('\n');
        stdin.write_all(line.as_bytes()).await.map_err(Error::WorkerSpawn)?;
        drop(stdin);
        debug!("sent startup message to worker");

        let result = Self::pump_worker_output(stdout, options, watchdog_ms).await;
        debug!("killing worker process");
        let _ = child.kill().await;
        result
    }

    async fn pump_worker_output<R>(stdout: R, options: &TestOptions, watchdog_ms: u64) -> Result<TestSuiteResult, Error>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            let next_line = tokio::select! {
                biased;
                line = lines.next_line() => line.map_err(|e| Error::Protocol(e.to_string()))?,
                _ = clock::wait(watchdog_ms) => {
                    debug!(watchdog_ms, "watchdog timed out waiting for a worker message");
                    return Ok(watchdog_result());
                }
            };
            let Some(raw) = next_line else {
                return Err(Error::Protocol("worker closed its output before completing".into()));
            };
            let message: WorkerMessage =
                serde_json::from_str(&raw).map_err(|e| Error::Protocol(format!("malformed worker message: {e}")))?;

            match message {
                WorkerMessage::Keepalive => {
                    debug!("received keepalive from worker");
                    continue;
                }
                WorkerMessage::Progress { result } => {
                    if let Some(on_result) = &options.on_test_case_result {
                        let case = TestCaseResult::deserialize(result)?;
                        on_result(&case);
                    }
                }
                WorkerMessage::Complete { result } => return TestSuiteResult::deserialize(result),
                WorkerMessage::Fatal { message, err } => return Err(Error::WorkerFatal { message, err }),
            }
        }
    }
}

fn watchdog_result() -> TestSuiteResult {
    let it = RunResult::fail(
        vec!["Test runner watchdog".to_string()],
        None,
        &crate::runnable::TestError::new("Detected infinite loop in tests"),
    );
    TestSuiteResult::new(vec![], Mark::None, None, vec![], vec![], vec![TestResult::Case(TestCaseResult::wrapping(it))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn watchdog_fires_when_no_message_arrives_in_time() {
        // A reader that never produces a line: the watchdog race must win.
        let stdout = Cursor::new(Vec::<u8>::new());
        let options = TestOptions::default();
        let result = Runner::pump_worker_output(stdout, &options, 10).await.unwrap();
        assert_eq!(result.count().fail, 1);
        assert_eq!(result.tests.len(), 1);
    }

    #[tokio::test]
    async fn complete_message_yields_the_deserialized_suite_result() {
        let suite = TestSuiteResult::new(vec!["s".into()], Mark::None, None, vec![], vec![], vec![]);
        let message = WorkerMessage::Complete { result: suite.serialize() };
        let line = format!("{}\n", serde_json::to_string(&message).unwrap());
        let stdout = Cursor::new(line.into_bytes());
        let options = TestOptions::default();
        let result = Runner::pump_worker_output(stdout, &options, 2000).await.unwrap();
        assert_eq!(result, suite);
    }

    #[tokio::test]
    async fn fatal_message_surfaces_as_an_engine_error() {
        let message = WorkerMessage::Fatal {
            message: "boom".to_string(),
            err: None,
        };
        let line = format!("{}\n", serde_json::to_string(&message).unwrap());
        let stdout = Cursor::new(line.into_bytes());
        let options = TestOptions::default();
        let err = Runner::pump_worker_output(stdout, &options, 2000).await.unwrap_err();
        assert!(matches!(err, Error::WorkerFatal { .. }));
    }
}
