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

//! In-process [`Store`] implementation.
//!
//! Accounts live in a [`DashMap`], each behind its own [`Mutex`], so commits
//! on different accounts never contend and a commit on one account updates
//! balance and history under a single lock acquisition.

use super::{History, Store};
use crate::account::Account;
use crate::base::AccountId;
use crate::error::StoreError;
use crate::transaction::Transaction;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;

#[derive(Debug)]
struct AccountRecord {
    account: Account,
    history: History,
}

/// Thread-safe in-memory ledger store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    accounts: DashMap<AccountId, Mutex<AccountRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provisions an account with an empty history.
    ///
    /// Returns `false` and leaves the existing account untouched if the id is
    /// already taken.
    pub fn insert_account(&self, account: Account) -> bool {
        match self.accounts.entry(account.id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(Mutex::new(AccountRecord {
                    account,
                    history: History::new(),
                }));
                true
            }
        }
    }

    /// Number of committed transactions for an account, if it exists.
    pub fn transaction_count(&self, id: AccountId) -> Option<usize> {
        self.accounts.get(&id).map(|record| record.lock().history.len())
    }

    /// Sum of all committed transaction effects for an account.
    pub fn history_net(&self, id: AccountId) -> Option<i64> {
        self.accounts.get(&id).map(|record| record.lock().history.net())
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn load_account(&self, id: AccountId) -> Result<Account, StoreError> {
        let record = self.accounts.get(&id).ok_or(StoreError::NotFound)?;
        let account = record.lock().account;
        Ok(account)
    }

    async fn conditional_commit(
        &self,
        id: AccountId,
        expected_balance: i64,
        new_balance: i64,
        transaction: Transaction,
    ) -> Result<(), StoreError> {
        let record = self.accounts.get(&id).ok_or(StoreError::NotFound)?;
        let mut data = record.lock();
        if data.account.balance != expected_balance {
            return Err(StoreError::Conflict);
        }
        data.account.balance = new_balance;
        data.history.push(transaction);
        data.account.assert_invariants();
        Ok(())
    }

    async fn recent_transactions(
        &self,
        id: AccountId,
        limit: usize,
    ) -> Result<Vec<Transaction>, StoreError> {
        let record = self.accounts.get(&id).ok_or(StoreError::NotFound)?;
        let recent = record.lock().history.recent(limit);
        Ok(recent)
    }
}
