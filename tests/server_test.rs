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

//! Integration tests for the HTTP transport with concurrent requests.
//!
//! These tests bind a real listener and drive it with `reqwest`.

use credit_ledger_rs::http::{self, AppState, ErrorResponse};
use credit_ledger_rs::{Account, AccountId, InMemoryStore, LedgerConfig};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

// === Server Setup ===

struct TestServer {
    base_url: String,
    store: Arc<InMemoryStore>,
    client: Client,
}

async fn start_server() -> TestServer {
    let store = Arc::new(InMemoryStore::new());
    store.insert_account(Account::new(AccountId(1), 1000));
    store.insert_account(Account::new(AccountId(2), 100_000));

    let state = AppState::new(store.clone(), &LedgerConfig::default());
    let app = http::router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{addr}"),
        store,
        client: Client::new(),
    }
}

impl TestServer {
    async fn post_transaction(&self, id: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}/accounts/{}/transactions", self.base_url, id))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get_extract(&self, id: &str) -> reqwest::Response {
        self.client
            .get(format!("{}/accounts/{}/extract", self.base_url, id))
            .send()
            .await
            .unwrap()
    }
}

// === Write Path ===

#[tokio::test]
async fn debit_returns_limit_and_balance() {
    let server = start_server().await;

    let response = server
        .post_transaction("1", json!({"value": 500, "kind": "d", "description": "desc"}))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"limit": 1000, "balance": -500}));
}

#[tokio::test]
async fn debit_over_limit_is_unprocessable() {
    let server = start_server().await;
    server
        .post_transaction("1", json!({"value": 500, "kind": "d", "description": "desc"}))
        .await;

    let response = server
        .post_transaction("1", json!({"value": 600, "kind": "d", "description": "desc"}))
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error: ErrorResponse = response.json().await.unwrap();
    assert_eq!(error.code, "LIMIT_EXCEEDED");

    let extract: Value = server.get_extract("1").await.json().await.unwrap();
    assert_eq!(extract["balance"]["total"], -500);
    assert_eq!(extract["lastTransactions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_payloads_are_unprocessable() {
    let server = start_server().await;

    let cases = [
        json!({"value": 0, "kind": "c", "description": "x"}),
        json!({"value": -5, "kind": "c", "description": "x"}),
        json!({"value": 1.5, "kind": "c", "description": "x"}),
        json!({"value": 10, "kind": "x", "description": "x"}),
        json!({"value": 10, "kind": "c", "description": ""}),
        json!({"value": 10, "kind": "c", "description": "longer than ten"}),
        json!({"value": 10, "kind": "c", "description": null}),
        json!({"value": 10, "kind": "c"}),
    ];
    for body in cases {
        let response = server.post_transaction("1", body.clone()).await;
        assert_eq!(
            response.status(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "payload {body}"
        );
    }

    assert_eq!(server.store.transaction_count(AccountId(1)), Some(0));
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let server = start_server().await;

    let response = server
        .client
        .post(format!("{}/accounts/1/transactions", server.base_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_numeric_account_id_is_bad_request() {
    let server = start_server().await;

    let response = server
        .post_transaction("abc", json!({"value": 1, "kind": "c", "description": "x"}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server.get_extract("abc").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_account_is_not_found() {
    let server = start_server().await;

    let response = server
        .post_transaction("6", json!({"value": 1, "kind": "c", "description": "x"}))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error: ErrorResponse = response.json().await.unwrap();
    assert_eq!(error.code, "ACCOUNT_NOT_FOUND");

    let response = server.get_extract("6").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// === Read Path ===

#[tokio::test]
async fn extract_shape_and_order() {
    let server = start_server().await;
    for (value, kind, description) in [(100, "c", "first"), (30, "d", "second"), (5, "c", "third")] {
        let response = server
            .post_transaction(
                "2",
                json!({"value": value, "kind": kind, "description": description}),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = server.get_extract("2").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["balance"]["total"], 75);
    assert_eq!(body["balance"]["limit"], 100_000);
    assert!(body["balance"]["date"].is_string());

    let last = body["lastTransactions"].as_array().unwrap();
    let descriptions: Vec<&str> = last
        .iter()
        .map(|t| t["description"].as_str().unwrap())
        .collect();
    assert_eq!(descriptions, ["third", "second", "first"]);
    assert_eq!(last[1]["value"], 30);
    assert_eq!(last[1]["kind"], "d");
    assert!(last[1]["occurredAt"].is_string());
}

#[tokio::test]
async fn extract_caps_history_at_ten() {
    let server = start_server().await;
    for i in 0..12 {
        server
            .post_transaction("2", json!({"value": i + 1, "kind": "c", "description": "n"}))
            .await;
    }

    let body: Value = server.get_extract("2").await.json().await.unwrap();

    assert_eq!(body["lastTransactions"].as_array().unwrap().len(), 10);
    assert_eq!(body["lastTransactions"][0]["value"], 12);
}

// === Concurrency ===

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_keep_balance_consistent() {
    let server = Arc::new(start_server().await);

    let mut handles = Vec::new();
    for i in 0..100 {
        let server = Arc::clone(&server);
        handles.push(tokio::spawn(async move {
            let kind = if i % 2 == 0 { "c" } else { "d" };
            server
                .post_transaction("2", json!({"value": 10, "kind": kind, "description": "mix"}))
                .await
                .status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let body: Value = server.get_extract("2").await.json().await.unwrap();
    assert_eq!(body["balance"]["total"], 0);
    assert_eq!(server.store.transaction_count(AccountId(2)), Some(100));
    assert_eq!(server.store.history_net(AccountId(2)), Some(0));
}
