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

//! Persistence contract consumed by the ledger core.
//!
//! The store exclusively owns account and transaction state. The core only
//! needs three operations, and the write one must be atomic: a
//! [`Store::conditional_commit`] either updates the balance *and* appends the
//! transaction, or does neither.

mod history;
mod memory;

pub use history::History;
pub use memory::InMemoryStore;

use crate::account::Account;
use crate::base::AccountId;
use crate::error::StoreError;
use crate::transaction::Transaction;
use async_trait::async_trait;

#[async_trait]
pub trait Store: Send + Sync {
    /// Reads the current state of an account.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] or [`StoreError::Unavailable`].
    async fn load_account(&self, id: AccountId) -> Result<Account, StoreError>;

    /// Sets the balance to `new_balance` and appends `transaction` to the
    /// account history, iff the stored balance still equals `expected_balance`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Conflict`] - balance changed since it was read; nothing written.
    /// - [`StoreError::NotFound`] - account vanished.
    /// - [`StoreError::Unavailable`] - nothing written.
    /// - [`StoreError::Ambiguous`] - the write may or may not have been applied.
    async fn conditional_commit(
        &self,
        id: AccountId,
        expected_balance: i64,
        new_balance: i64,
        transaction: Transaction,
    ) -> Result<(), StoreError>;

    /// Returns at most `limit` transactions, most recent first.
    ///
    /// Implementations must apply `limit` in the query itself rather than
    /// fetching the whole history and truncating.
    async fn recent_transactions(
        &self,
        id: AccountId,
        limit: usize,
    ) -> Result<Vec<Transaction>, StoreError>;
}
