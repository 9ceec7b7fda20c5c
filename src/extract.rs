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

//! Extract assembler: the read path.
//!
//! An extract pairs an account's balance and limit with its most recent
//! transactions. The account lookup and the history lookup run concurrently
//! and both race the caller's deadline; the result is all-or-nothing.
//!
//! History lookups are admitted through a [`Semaphore`] shared by every
//! caller, so the store never sees more than `history_workers` of them at
//! once. Waiting for a slot counts against the same deadline.

use crate::account::Account;
use crate::base::AccountId;
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::store::Store;
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{Instant, timeout_at};
use tracing::debug;

/// Upper bound on transactions returned by an extract.
pub const RECENT_TRANSACTIONS: usize = 10;

/// Balance snapshot plus recent history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extract {
    pub balance: i64,
    pub limit: i64,
    /// When both lookups had returned.
    pub as_of: DateTime<Utc>,
    /// Newest first, at most [`RECENT_TRANSACTIONS`] entries.
    pub recent_transactions: Vec<Transaction>,
}

pub struct ExtractAssembler {
    store: Arc<dyn Store>,
    history_slots: Arc<Semaphore>,
    history_workers: usize,
}

impl ExtractAssembler {
    pub fn new(store: Arc<dyn Store>, config: &LedgerConfig) -> Self {
        let history_workers = config.history_workers.max(1);
        Self {
            store,
            history_slots: Arc::new(Semaphore::new(history_workers)),
            history_workers,
        }
    }

    /// Free history lookup slots right now.
    pub fn available_workers(&self) -> usize {
        self.history_slots.available_permits()
    }

    pub fn worker_budget(&self) -> usize {
        self.history_workers
    }

    /// Assembles the extract for `account_id`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AccountNotFound`] - no such account.
    /// - [`LedgerError::Timeout`] - a lookup, or the wait for a history slot,
    ///   outlived `deadline`. Any partial result is discarded.
    /// - [`LedgerError::StoreUnavailable`] - store fault.
    #[tracing::instrument(skip(self, account_id, deadline), fields(account = %account_id))]
    pub async fn get_extract(
        &self,
        account_id: AccountId,
        deadline: Instant,
    ) -> Result<Extract, LedgerError> {
        if Instant::now() >= deadline {
            return Err(LedgerError::Timeout);
        }

        let both = async {
            tokio::try_join!(self.account(account_id), self.history(account_id))
        };
        let (account, mut recent_transactions) = timeout_at(deadline, both).await.map_err(|_| {
            debug!("extract deadline elapsed");
            LedgerError::Timeout
        })??;

        // Newest first, so truncation keeps the most recent entries.
        recent_transactions.truncate(RECENT_TRANSACTIONS);
        Ok(Extract {
            balance: account.balance,
            limit: account.credit_limit,
            as_of: Utc::now(),
            recent_transactions,
        })
    }

    async fn account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        self.store
            .load_account(account_id)
            .await
            .map_err(|err| LedgerError::from_store(account_id, err))
    }

    async fn history(&self, account_id: AccountId) -> Result<Vec<Transaction>, LedgerError> {
        // Released on drop, including when the deadline cancels this future.
        let _permit = self
            .history_slots
            .acquire()
            .await
            .map_err(|_| LedgerError::StoreUnavailable("history workers shut down".to_string()))?;

        self.store
            .recent_transactions(account_id, RECENT_TRANSACTIONS)
            .await
            .map_err(|err| LedgerError::from_store(account_id, err))
    }
}
