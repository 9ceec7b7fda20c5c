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

//! Append-only transaction history for one account.

use crate::transaction::Transaction;

/// Transactions ordered by `occurred_at`, ties kept in commit order.
///
/// Entries are only ever added; reads walk backwards from the tail so a
/// bounded read touches at most `limit` entries.
#[derive(Debug, Default, Clone)]
pub struct History {
    entries: Vec<Transaction>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, transaction: Transaction) {
        // Commits arrive in timestamp order unless the wall clock stepped back.
        let at = self
            .entries
            .partition_point(|e| e.occurred_at <= transaction.occurred_at);
        self.entries.insert(at, transaction);
    }

    /// The `limit` most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<Transaction> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all entry effects on the balance.
    pub fn net(&self) -> i64 {
        self.entries.iter().map(Transaction::delta).sum()
    }
}
