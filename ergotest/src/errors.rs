// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine-level errors: everything at or above the boundary the
//! specification draws between "recovered locally into a result node" and
//! "propagated to the caller of `run`." User-body failures, hook failures
//! and module load failures never appear here — they become
//! [`crate::result::RunResult`]s instead.

use camino::Utf8PathBuf;
use thiserror::Error;

/// An error that escapes the engine itself, rather than being folded into a
/// result tree.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("failed to deserialize a result: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("module path must be absolute: {0}")]
    NonAbsolutePath(Utf8PathBuf),

    #[error("failed to load renderer module at `{path}`: {source}")]
    RendererLoad {
        path: Utf8PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("renderer module at `{path}` does not export `render_error`: {source}")]
    RendererSymbol {
        path: Utf8PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("failed to spawn worker process: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("worker protocol violation: {0}")]
    Protocol(String),

    #[error("worker reported a fatal error: {message}")]
    WorkerFatal {
        message: String,
        err: Option<serde_json::Value>,
    },
}
