// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optional inbound HTTP surface, mountable by a daemon-mode binary. Keeps
//! the transport layer out of the bus core: `pulse-bus` itself has no
//! dependency on axum or reqwest.

use crate::link::FederationLink;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Identifies the caller peer for an inbound POST. The authentication
/// mechanism that populates this header (mTLS client identity, a signed
/// bearer token, ...) sits outside this crate's scope; callers behind a
/// reverse proxy are expected to set it from a verified identity, not from
/// an untrusted client-supplied value.
const PEER_HEADER: &str = "x-pulse-peer";

#[derive(Deserialize)]
struct ReplayParams {
    minutes: i64,
}

async fn post_federation(
    State(link): State<Arc<FederationLink>>,
    headers: HeaderMap,
    Json(event): Json<Value>,
) -> Response {
    let Some(peer_name) = headers.get(PEER_HEADER).and_then(|v| v.to_str().ok()) else {
        return (StatusCode::BAD_REQUEST, format!("missing {PEER_HEADER} header")).into_response();
    };
    match link.ingest_remote_event(event, peer_name) {
        Ok(stored) => (StatusCode::OK, Json(stored.to_value())).into_response(),
        Err(error) => (StatusCode::FORBIDDEN, error.to_string()).into_response(),
    }
}

async fn get_federation(
    State(link): State<Arc<FederationLink>>,
    Query(params): Query<ReplayParams>,
) -> Response {
    let since = chrono::Utc::now() - chrono::Duration::minutes(params.minutes);
    match link.bus().replay(Some(since)) {
        Ok(events) => {
            let body: Vec<Value> = events.iter().map(|e| e.to_value()).collect();
            Json(body).into_response()
        }
        Err(error) => (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response(),
    }
}

pub fn router(link: Arc<FederationLink>) -> Router {
    Router::new()
        .route("/pulse/federation", post(post_federation).get(get_federation))
        .with_state(link)
}
