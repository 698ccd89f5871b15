// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The child process spawned by [`ergotest::Runner::run_in_child_process`].
//!
//! Speaks the startup/keepalive/progress/complete/fatal protocol over its own
//! stdin/stdout; logs go to stderr so they never land on the wire. Runs on a
//! current-thread runtime since a single worker only ever runs one suite.

use tokio::io::{stdin, stdout, BufReader};

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match ergotest::runner::serve_worker(BufReader::new(stdin()), stdout()).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "worker I/O failed");
            std::process::ExitCode::FAILURE
        }
    }
}
