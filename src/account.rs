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

//! Account state and the credit-limit rule.
//!
//! An [`Account`] is a plain snapshot read from the store. The engine never
//! keeps one across calls; it computes the next balance from a fresh read and
//! hands both the old and new balance to the store's conditional commit.
//!
//! # Example
//!
//! ```
//! use credit_ledger_rs::{Account, AccountId, TransactionKind};
//!
//! let account = Account::new(AccountId(1), 1000);
//! let next = account.tentative_balance(TransactionKind::Debit, 500).unwrap();
//! assert_eq!(next, -500);
//! ```

use crate::base::AccountId;
use crate::error::{InvalidInput, LedgerError};
use crate::transaction::TransactionKind;
use serde::{Deserialize, Serialize};

/// Ledger account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// How far below zero a debit may take the balance.
    pub credit_limit: i64,
    pub balance: i64,
}

impl Account {
    /// Creates an account with a zero balance.
    pub fn new(id: AccountId, credit_limit: i64) -> Self {
        Self::with_balance(id, credit_limit, 0)
    }

    pub fn with_balance(id: AccountId, credit_limit: i64, balance: i64) -> Self {
        debug_assert!(credit_limit >= 0, "credit limit must not be negative");
        Self {
            id,
            credit_limit,
            balance,
        }
    }

    /// Lowest balance this account may ever hold.
    pub fn floor(&self) -> i64 {
        -self.credit_limit
    }

    /// Computes the balance after applying `value` without touching the store.
    ///
    /// Credits are always accepted; only debits are checked against the
    /// credit limit.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidInput`] - `value` is not positive or would overflow.
    /// - [`LedgerError::LimitExceeded`] - debit would go below [`Account::floor`].
    pub fn tentative_balance(&self, kind: TransactionKind, value: i64) -> Result<i64, LedgerError> {
        if value <= 0 {
            return Err(InvalidInput::NonPositiveValue.into());
        }
        let next = match kind {
            TransactionKind::Credit => self.balance.checked_add(value),
            TransactionKind::Debit => self.balance.checked_sub(value),
        }
        .ok_or(InvalidInput::ValueOutOfRange)?;

        if kind == TransactionKind::Debit && next < self.floor() {
            return Err(LedgerError::LimitExceeded);
        }
        Ok(next)
    }

    pub(crate) fn assert_invariants(&self) {
        debug_assert!(
            self.balance >= self.floor(),
            "Invariant violated: balance {} below floor {}",
            self.balance,
            self.floor()
        );
    }
}
