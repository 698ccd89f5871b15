// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the parent↔worker protocol, carried as newline-delimited
//! JSON over the child's stdin/stdout. Shared between [`super`] (the parent
//! side) and the `ergotest-worker` binary (the child side).

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Sent once, parent→child, as the first line on the worker's stdin.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StartupMessage {
    #[serde(rename = "modulePaths")]
    pub module_paths: Vec<Utf8PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub config: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub renderer: Option<Utf8PathBuf>,
}

/// One line of the child→parent stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerMessage {
    Keepalive,
    Progress { result: serde_json::Value },
    Complete { result: serde_json::Value },
    Fatal { message: String, err: Option<serde_json::Value> },
}
