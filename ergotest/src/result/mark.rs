// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

/// An annotation on a suite or test case that influences whether it runs,
/// but never its status directly.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum Mark {
    #[default]
    None,
    Skip,
    Only,
}

impl Mark {
    pub fn is_only(self) -> bool {
        matches!(self, Mark::Only)
    }

    pub fn is_skip(self) -> bool {
        matches!(self, Mark::Skip)
    }

    /// Resolves this node's own mark against its parent's: an own mark of
    /// `None` inherits the parent's; otherwise the own mark wins.
    pub fn inherit(self, parent: Mark) -> Mark {
        match self {
            Mark::None => parent,
            own => own,
        }
    }
}
