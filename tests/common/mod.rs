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

//! Store wrapper with scripted faults and delays, shared by integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use credit_ledger_rs::{Account, AccountId, InMemoryStore, Store, StoreError, Transaction};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Delegates to an [`InMemoryStore`] unless a fault or delay is scripted.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: InMemoryStore,
    /// Errors returned by upcoming commits, in order, instead of committing.
    commit_faults: Mutex<VecDeque<StoreError>>,
    /// Error returned by every load while set.
    load_fault: Mutex<Option<StoreError>>,
    /// When set, every commit conflicts.
    always_conflict: Mutex<bool>,
    load_delay: Mutex<Option<Duration>>,
    commit_delay: Mutex<Option<Duration>>,
    history_delay: Mutex<Option<Duration>>,
    pub loads: AtomicUsize,
    pub commits: AtomicUsize,
    pub history_reads: AtomicUsize,
    pub history_limits: Mutex<Vec<usize>>,
}

impl FaultyStore {
    pub fn with_account(id: u32, limit: i64) -> Arc<Self> {
        let store = Self::default();
        store.inner.insert_account(Account::new(AccountId(id), limit));
        Arc::new(store)
    }

    pub fn fail_next_commit(&self, err: StoreError) {
        self.commit_faults.lock().push_back(err);
    }

    pub fn fail_loads(&self, err: Option<StoreError>) {
        *self.load_fault.lock() = err;
    }

    pub fn conflict_always(&self, enabled: bool) {
        *self.always_conflict.lock() = enabled;
    }

    pub fn delay_loads(&self, delay: Duration) {
        *self.load_delay.lock() = Some(delay);
    }

    pub fn delay_commits(&self, delay: Duration) {
        *self.commit_delay.lock() = Some(delay);
    }

    pub fn delay_history(&self, delay: Duration) {
        *self.history_delay.lock() = Some(delay);
    }

    pub fn io_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
            + self.commits.load(Ordering::SeqCst)
            + self.history_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for FaultyStore {
    async fn load_account(&self, id: AccountId) -> Result<Account, StoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let delay = *self.load_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let fault = self.load_fault.lock().clone();
        if let Some(err) = fault {
            return Err(err);
        }
        self.inner.load_account(id).await
    }

    async fn conditional_commit(
        &self,
        id: AccountId,
        expected_balance: i64,
        new_balance: i64,
        transaction: Transaction,
    ) -> Result<(), StoreError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        let delay = *self.commit_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let fault = self.commit_faults.lock().pop_front();
        if let Some(err) = fault {
            return Err(err);
        }
        if *self.always_conflict.lock() {
            return Err(StoreError::Conflict);
        }
        self.inner
            .conditional_commit(id, expected_balance, new_balance, transaction)
            .await
    }

    async fn recent_transactions(
        &self,
        id: AccountId,
        limit: usize,
    ) -> Result<Vec<Transaction>, StoreError> {
        self.history_reads.fetch_add(1, Ordering::SeqCst);
        self.history_limits.lock().push(limit);
        let delay = *self.history_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.recent_transactions(id, limit).await
    }
}
