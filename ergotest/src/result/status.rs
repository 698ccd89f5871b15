// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

/// The outcome of a test case or a single run invocation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum Status {
    Pass,
    Fail,
    Skip,
    Timeout,
}

impl Status {
    /// Precedence used when folding a sequence of statuses into one:
    /// `fail > timeout > pass > skip`. Higher wins.
    fn rank(self) -> u8 {
        match self {
            Status::Fail => 3,
            Status::Timeout => 2,
            Status::Pass => 1,
            Status::Skip => 0,
        }
    }

    /// Folds `self` with `other`, keeping the higher-precedence status.
    pub fn fold(self, other: Status) -> Status {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    /// Folds an entire sequence of statuses, defaulting to `Skip` when empty
    /// (the identity element for `fold`).
    pub fn fold_all(statuses: impl IntoIterator<Item = Status>) -> Status {
        statuses.into_iter().fold(Status::Skip, Status::fold)
    }
}
