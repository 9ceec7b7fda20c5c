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

//! HTTP transport for the ledger.
//!
//! ## Endpoints
//!
//! - `POST /accounts/{id}/transactions` - apply a credit or debit
//! - `GET /accounts/{id}/extract` - balance plus the last transactions
//!
//! ## Example Usage
//!
//! ```bash
//! curl -X POST http://localhost:8080/accounts/1/transactions \
//!   -H "Content-Type: application/json" \
//!   -d '{"value": 1000, "kind": "c", "description": "salary"}'
//!
//! curl http://localhost:8080/accounts/1/extract
//! ```

use crate::config::LedgerConfig;
use crate::engine::{BalanceUpdate, Engine};
use crate::extract::{Extract, ExtractAssembler};
use crate::store::Store;
use crate::transaction::{Transaction, TransactionKind};
use crate::{AccountId, LedgerError};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

// === Request/Response DTOs ===

/// Request body for applying a transaction.
///
/// ```json
/// {"value": 1000, "kind": "c", "description": "salary"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub value: i64,
    pub kind: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct BalanceSummary {
    pub total: i64,
    pub date: DateTime<Utc>,
    pub limit: i64,
}

/// Response body for an extract.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub balance: BalanceSummary,
    pub last_transactions: Vec<Transaction>,
}

impl From<Extract> for ExtractResponse {
    fn from(extract: Extract) -> Self {
        Self {
            balance: BalanceSummary {
                total: extract.balance,
                date: extract.as_of,
                limit: extract.limit,
            },
            last_transactions: extract.recent_transactions,
        }
    }
}

/// Response body for errors.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

/// Shared state: one engine and one assembler over the same store.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub extracts: Arc<ExtractAssembler>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &LedgerConfig) -> Self {
        Self {
            engine: Arc::new(Engine::new(Arc::clone(&store), config)),
            extracts: Arc::new(ExtractAssembler::new(store, config)),
            request_timeout: config.request_timeout,
        }
    }

    fn deadline(&self) -> Instant {
        let now = Instant::now();
        now.checked_add(self.request_timeout)
            .unwrap_or_else(|| now + LedgerConfig::MAX_REQUEST_TIMEOUT)
    }
}

// === Error Handling ===

/// Wrapper for converting [`LedgerError`] into HTTP responses.
pub struct AppError(LedgerError);

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError(err)
    }
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            LedgerError::InvalidInput(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_INPUT"),
            LedgerError::LimitExceeded => (StatusCode::UNPROCESSABLE_ENTITY, "LIMIT_EXCEEDED"),
            LedgerError::Contention { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "CONTENTION"),
            LedgerError::AccountNotFound(_) => (StatusCode::NOT_FOUND, "ACCOUNT_NOT_FOUND"),
            LedgerError::PartialCommit(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PARTIAL_COMMIT"),
            LedgerError::StoreUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORE_UNAVAILABLE")
            }
            LedgerError::Timeout => (StatusCode::INTERNAL_SERVER_ERROR, "TIMEOUT"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, code, "request failed");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// POST /accounts/{id}/transactions
async fn create_transaction(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Json(request): Json<TransactionRequest>,
) -> Result<Json<BalanceUpdate>, AppError> {
    let kind: TransactionKind = request.kind.parse().map_err(LedgerError::from)?;
    let update = state
        .engine
        .apply(
            AccountId(id),
            request.value,
            kind,
            &request.description,
            state.deadline(),
        )
        .await?;
    Ok(Json(update))
}

/// GET /accounts/{id}/extract
async fn get_extract(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<ExtractResponse>, AppError> {
    let extract = state
        .extracts
        .get_extract(AccountId(id), state.deadline())
        .await?;
    Ok(Json(extract.into()))
}

// === Router ===

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/accounts/{id}/transactions", post(create_transaction))
        .route("/accounts/{id}/extract", get(get_extract))
        .with_state(state)
}
