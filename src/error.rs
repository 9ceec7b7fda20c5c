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

//! Error types for the ledger core and its store contract.

use crate::base::AccountId;
use thiserror::Error;

/// Reasons a transaction is rejected before any store I/O happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidInput {
    /// Value is zero or negative
    #[error("value must be a positive integer")]
    NonPositiveValue,

    /// Kind is neither `c` nor `d`
    #[error("unknown transaction kind '{0}' (expected 'c' or 'd')")]
    UnknownKind(String),

    /// Description is empty or longer than ten characters
    #[error("description must have between 1 and 10 characters, got {0}")]
    DescriptionLength(usize),

    /// Applying the value would overflow the balance
    #[error("value out of range for this account")]
    ValueOutOfRange,
}

/// Ledger core errors surfaced to the transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Caller-correctable input error; no I/O was attempted
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    /// No account with this id exists in the store
    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    /// Debit would drive the balance below the negative credit limit
    #[error("debit would exceed the account credit limit")]
    LimitExceeded,

    /// Conditional commit kept conflicting with concurrent writers
    #[error("account is contended, gave up after {attempts} attempts")]
    Contention { attempts: u32 },

    /// Store could not say whether the commit was applied
    #[error("commit outcome unknown: {0}")]
    PartialCommit(String),

    /// Infrastructure failure, not retried by the core
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Deadline elapsed before the operation completed
    #[error("deadline elapsed")]
    Timeout,
}

/// Outcomes a [`Store`](crate::Store) reports besides success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("account not found")]
    NotFound,

    /// Stored balance no longer matches the expected balance
    #[error("conditional commit conflict")]
    Conflict,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The write may or may not have been applied
    #[error("ambiguous commit outcome: {0}")]
    Ambiguous(String),
}

impl LedgerError {
    /// Maps a store outcome onto the core taxonomy for the given account.
    ///
    /// `Conflict` is handled by the engine's retry loop and only reaches this
    /// point when a store reports it from a read, which is a store fault.
    pub fn from_store(account_id: AccountId, err: StoreError) -> Self {
        match err {
            StoreError::NotFound => LedgerError::AccountNotFound(account_id),
            StoreError::Ambiguous(reason) => LedgerError::PartialCommit(reason),
            StoreError::Unavailable(reason) => LedgerError::StoreUnavailable(reason),
            StoreError::Conflict => {
                LedgerError::StoreUnavailable("unexpected conflict outside a commit".to_string())
            }
        }
    }
}
