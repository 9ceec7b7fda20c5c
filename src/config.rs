// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Tunables for the engine, the extract assembler, and the transport.

use std::time::Duration;

/// Runtime configuration shared by the ledger components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Read-validate-commit cycles before giving up with `Contention`.
    pub max_commit_attempts: u32,
    /// Concurrent history lookups allowed across all extract calls.
    pub history_workers: usize,
    /// Deadline the transport gives each request.
    pub request_timeout: Duration,
    /// Serialize writers per account inside this process before the
    /// conditional commit. Cuts down on retries; correctness comes from the
    /// store either way.
    pub serialize_locally: bool,
}

impl LedgerConfig {
    pub const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 8;
    pub const DEFAULT_HISTORY_WORKERS: usize = 5;
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
    /// Longest deadline a request can be given.
    pub const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

    pub fn with_max_commit_attempts(mut self, attempts: u32) -> Self {
        self.max_commit_attempts = attempts.max(1);
        self
    }

    pub fn with_history_workers(mut self, workers: usize) -> Self {
        self.history_workers = workers.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout.min(Self::MAX_REQUEST_TIMEOUT);
        self
    }

    pub fn with_serialize_locally(mut self, enabled: bool) -> Self {
        self.serialize_locally = enabled;
        self
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: Self::DEFAULT_MAX_COMMIT_ATTEMPTS,
            history_workers: Self::DEFAULT_HISTORY_WORKERS,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            serialize_locally: true,
        }
    }
}
