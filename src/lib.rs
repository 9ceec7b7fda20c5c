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

//! # Credit Ledger
//!
//! This library provides the core of a credit-limited account ledger: each
//! account has a fixed credit limit and a running balance, and no committed
//! debit may ever take the balance below `-limit`.
//!
//! ## Core Components
//!
//! - [`Engine`]: Applies credits and debits through an optimistic conditional commit
//! - [`ExtractAssembler`]: Reads balance and recent history concurrently under a deadline
//! - [`Store`]: Persistence contract; [`InMemoryStore`] is the bundled implementation
//! - [`LedgerError`]: Error taxonomy surfaced to callers
//! - [`http`]: axum transport exposing both paths over HTTP
//!
//! ## Example
//!
//! ```
//! use credit_ledger_rs::{
//!     Account, AccountId, Engine, ExtractAssembler, InMemoryStore, LedgerConfig, LedgerError,
//!     TransactionKind,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio::time::Instant;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store = Arc::new(InMemoryStore::new());
//! store.insert_account(Account::new(AccountId(1), 1000));
//!
//! let config = LedgerConfig::default();
//! let engine = Engine::new(store.clone(), &config);
//! let extracts = ExtractAssembler::new(store, &config);
//! let deadline = Instant::now() + Duration::from_secs(1);
//!
//! let update = engine
//!     .apply(AccountId(1), 500, TransactionKind::Debit, "groceries", deadline)
//!     .await
//!     .unwrap();
//! assert_eq!((update.limit, update.balance), (1000, -500));
//!
//! let rejected = engine
//!     .apply(AccountId(1), 600, TransactionKind::Debit, "rent", deadline)
//!     .await;
//! assert_eq!(rejected, Err(LedgerError::LimitExceeded));
//!
//! let extract = extracts.get_extract(AccountId(1), deadline).await.unwrap();
//! assert_eq!(extract.balance, -500);
//! assert_eq!(extract.recent_transactions.len(), 1);
//! # });
//! ```
//!
//! ## Thread Safety
//!
//! Writers on the same account are linearized by the store's conditional
//! commit, so any number of engines may share one store. Writers on different
//! accounts proceed in parallel.

pub mod account;
mod base;
pub mod config;
mod engine;
pub mod error;
mod extract;
pub mod http;
pub mod store;
pub mod telemetry;
mod transaction;

pub use account::Account;
pub use base::AccountId;
pub use config::LedgerConfig;
pub use engine::{BalanceUpdate, Engine};
pub use error::{InvalidInput, LedgerError, StoreError};
pub use extract::{Extract, ExtractAssembler, RECENT_TRANSACTIONS};
pub use store::{History, InMemoryStore, Store};
pub use transaction::{Description, Transaction, TransactionKind};
