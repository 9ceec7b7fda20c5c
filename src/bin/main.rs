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

use clap::Parser;
use credit_ledger_rs::http::{self, AppState};
use credit_ledger_rs::{Account, AccountId, InMemoryStore, LedgerConfig, telemetry};
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Credit Ledger - account ledger HTTP service
///
/// Serves credit/debit transactions and account extracts over HTTP.
/// Every option can also be set through the environment.
#[derive(Parser, Debug)]
#[command(name = "credit-ledger-rs")]
#[command(about = "A credit-limited account ledger service", long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Address to bind
    #[arg(long, env = "LEDGER_BIND", default_value = "0.0.0.0")]
    bind: String,

    /// CSV file provisioning accounts
    ///
    /// Expected format: id,limit,balance
    /// Without a file the five default accounts are provisioned.
    #[arg(long, env = "LEDGER_ACCOUNTS", value_name = "FILE")]
    accounts: Option<PathBuf>,

    /// Commit attempts before a contended write gives up
    #[arg(long, env = "LEDGER_MAX_COMMIT_ATTEMPTS", default_value_t = LedgerConfig::DEFAULT_MAX_COMMIT_ATTEMPTS)]
    max_commit_attempts: u32,

    /// Concurrent history lookups allowed
    #[arg(long, env = "LEDGER_HISTORY_WORKERS", default_value_t = LedgerConfig::DEFAULT_HISTORY_WORKERS)]
    history_workers: usize,

    /// Per-request deadline in milliseconds
    #[arg(long, env = "LEDGER_REQUEST_TIMEOUT_MS", default_value_t = 60_000)]
    request_timeout_ms: u64,

    /// Queue writers per account inside this process before committing
    #[arg(long, env = "LEDGER_LOCAL_GATE", default_value_t = true, action = clap::ArgAction::Set)]
    local_gate: bool,
}

impl Args {
    fn config(&self) -> LedgerConfig {
        LedgerConfig::default()
            .with_max_commit_attempts(self.max_commit_attempts)
            .with_history_workers(self.history_workers)
            .with_request_timeout(Duration::from_millis(self.request_timeout_ms))
            .with_serialize_locally(self.local_gate)
    }
}

/// Accounts provisioned when no CSV file is given.
const DEFAULT_ACCOUNTS: [(u32, i64); 5] = [
    (1, 100_000),
    (2, 80_000),
    (3, 1_000_000),
    (4, 10_000_000),
    (5, 500_000),
];

#[tokio::main]
async fn main() {
    telemetry::init();
    let args = Args::parse();
    let config = args.config();

    let store = Arc::new(InMemoryStore::new());
    let provisioned = match &args.accounts {
        Some(path) => {
            let file = match File::open(path) {
                Ok(f) => f,
                Err(e) => {
                    tracing::error!("Error opening file '{}': {}", path.display(), e);
                    process::exit(1);
                }
            };
            match load_accounts(BufReader::new(file), &store) {
                Ok(count) => count,
                Err(e) => {
                    tracing::error!("Error loading accounts: {}", e);
                    process::exit(1);
                }
            }
        }
        None => provision_defaults(&store),
    };
    tracing::info!(accounts = provisioned, "accounts provisioned");

    let state = AppState::new(store, &config);
    let app = http::router(state);

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Error binding {}: {}", addr, e);
            process::exit(1);
        }
    };
    tracing::info!(%addr, ?config, "ledger listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
        process::exit(1);
    }
    tracing::info!("server stopped");
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
}

fn provision_defaults(store: &InMemoryStore) -> usize {
    DEFAULT_ACCOUNTS
        .iter()
        .filter(|(id, limit)| store.insert_account(Account::new(AccountId(*id), *limit)))
        .count()
}

/// Raw CSV record matching the provisioning format.
///
/// Fields: `id, limit, balance`
#[derive(Debug, Deserialize)]
struct CsvAccount {
    id: u32,
    limit: i64,
    #[serde(default)]
    balance: i64,
}

impl CsvAccount {
    /// Returns `None` when the row breaks the credit-limit invariant.
    fn into_account(self) -> Option<Account> {
        if self.limit < 0 || self.balance < -self.limit {
            return None;
        }
        Some(Account::with_balance(AccountId(self.id), self.limit, self.balance))
    }
}

/// Provisions accounts from a CSV reader and returns how many were added.
///
/// # CSV Format
///
/// ```csv
/// id,limit,balance
/// 1,100000,0
/// 2,80000,-500
/// ```
///
/// Malformed rows, rows whose balance is already below `-limit`, and
/// repeated ids are skipped with a warning.
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the header is unreadable.
fn load_accounts<R: Read>(reader: R, store: &InMemoryStore) -> Result<usize, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let mut provisioned = 0;
    for result in rdr.deserialize::<CsvAccount>() {
        match result {
            Ok(record) => {
                let id = record.id;
                let Some(account) = record.into_account() else {
                    tracing::warn!(id, "Skipping account outside its credit limit");
                    continue;
                };
                if store.insert_account(account) {
                    provisioned += 1;
                } else {
                    tracing::warn!(id, "Skipping duplicate account");
                }
            }
            Err(e) => {
                tracing::warn!("Skipping malformed row: {}", e);
            }
        }
    }

    Ok(provisioned)
}
