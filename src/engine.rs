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

//! Ledger engine: the write path.
//!
//! [`Engine::apply`] validates a transaction, then runs an optimistic
//! read-validate-commit cycle against the [`Store`]:
//!
//! 1. Load the account fresh from the store (balances are never cached).
//! 2. Compute the tentative balance and check the credit limit.
//! 3. Conditionally commit the new balance together with the transaction,
//!    keyed on the balance read in step 1.
//! 4. On conflict, start over, up to `max_commit_attempts` times.
//!
//! # Concurrency
//!
//! The conditional commit is what linearizes writers on one account, so
//! several engines (or processes) may share a store. Optionally, an engine
//! also queues its own writers per account behind an async mutex so that
//! they do not burn attempts conflicting with each other. Writers on
//! different accounts never wait on one another.

use crate::base::AccountId;
use crate::config::LedgerConfig;
use crate::error::{InvalidInput, LedgerError, StoreError};
use crate::store::Store;
use crate::transaction::{Description, Transaction, TransactionKind};
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

/// Result of a successful [`Engine::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceUpdate {
    pub limit: i64,
    pub balance: i64,
}

/// Per-account async mutexes, local to one engine.
///
/// The last writer to release an account's mutex removes its entry, so the
/// map is bounded by in-flight writers, not by the ids callers ask about.
#[derive(Debug, Default)]
struct AccountGate {
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

impl AccountGate {
    async fn acquire(&self, account_id: AccountId) -> GateGuard<'_> {
        let lock = Arc::clone(self.locks.entry(account_id).or_default().value());
        let held = lock.lock_owned().await;
        GateGuard {
            gate: self,
            account_id,
            held: Some(held),
        }
    }
}

struct GateGuard<'a> {
    gate: &'a AccountGate,
    account_id: AccountId,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.held.take();
        // Removal and insertion both take the shard lock, so a count of one
        // means no writer holds or waits on this mutex.
        self.gate
            .locks
            .remove_if(&self.account_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Applies credit and debit transactions to accounts held in a [`Store`].
pub struct Engine {
    store: Arc<dyn Store>,
    max_commit_attempts: u32,
    gate: Option<AccountGate>,
}

impl Engine {
    pub fn new(store: Arc<dyn Store>, config: &LedgerConfig) -> Self {
        Self {
            store,
            max_commit_attempts: config.max_commit_attempts.max(1),
            gate: config.serialize_locally.then(AccountGate::default),
        }
    }

    /// Applies one transaction and returns the account's limit and new balance.
    ///
    /// The transaction's `occurred_at` is stamped here, once per commit
    /// attempt, so it always reflects the attempt that was committed.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidInput`] - bad value or description; no I/O performed.
    /// - [`LedgerError::AccountNotFound`] - no such account.
    /// - [`LedgerError::LimitExceeded`] - debit would go below `-limit`; nothing written.
    /// - [`LedgerError::Contention`] - every commit attempt conflicted.
    /// - [`LedgerError::PartialCommit`] - the store, or the deadline, left the outcome unknown.
    /// - [`LedgerError::StoreUnavailable`] - store fault, not retried.
    /// - [`LedgerError::Timeout`] - deadline elapsed before the commit was sent.
    #[tracing::instrument(skip(self, account_id, description, deadline), fields(account = %account_id))]
    pub async fn apply(
        &self,
        account_id: AccountId,
        value: i64,
        kind: TransactionKind,
        description: &str,
        deadline: Instant,
    ) -> Result<BalanceUpdate, LedgerError> {
        if value <= 0 {
            return Err(InvalidInput::NonPositiveValue.into());
        }
        let description = Description::new(description)?;

        if Instant::now() >= deadline {
            return Err(LedgerError::Timeout);
        }

        let _guard = match &self.gate {
            Some(gate) => Some(
                timeout_at(deadline, gate.acquire(account_id))
                    .await
                    .map_err(|_| LedgerError::Timeout)?,
            ),
            None => None,
        };

        for attempt in 1..=self.max_commit_attempts {
            let account = timeout_at(deadline, self.store.load_account(account_id))
                .await
                .map_err(|_| LedgerError::Timeout)?
                .map_err(|err| Self::store_fault(account_id, err))?;

            let balance = account.tentative_balance(kind, value)?;
            let transaction = Transaction {
                value,
                kind,
                description: description.clone(),
                occurred_at: Utc::now(),
            };

            let commit =
                self.store
                    .conditional_commit(account_id, account.balance, balance, transaction);
            match timeout_at(deadline, commit).await {
                Ok(Ok(())) => {
                    debug!(attempt, balance, "transaction committed");
                    return Ok(BalanceUpdate {
                        limit: account.credit_limit,
                        balance,
                    });
                }
                Ok(Err(StoreError::Conflict)) => {
                    debug!(attempt, "balance changed since read, retrying");
                    tokio::task::yield_now().await;
                }
                Ok(Err(err)) => return Err(Self::store_fault(account_id, err)),
                Err(_) => {
                    warn!(attempt, "deadline elapsed with commit in flight");
                    return Err(LedgerError::PartialCommit(
                        "deadline elapsed while commit was in flight".to_string(),
                    ));
                }
            }
        }

        warn!(
            attempts = self.max_commit_attempts,
            "giving up on contended account"
        );
        Err(LedgerError::Contention {
            attempts: self.max_commit_attempts,
        })
    }

    fn store_fault(account_id: AccountId, err: StoreError) -> LedgerError {
        let err = LedgerError::from_store(account_id, err);
        if matches!(
            err,
            LedgerError::StoreUnavailable(_) | LedgerError::PartialCommit(_)
        ) {
            warn!(%account_id, error = %err, "store fault");
        }
        err
    }
}
