// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optional HTTP surface for the monitoring daemon's query endpoints.
//! Delegates all enforcement (path safety, result caps, audit logging) to
//! `pulse-query`; this module only does request parsing and status-code
//! translation, matching the federation link's `http.rs` shape.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use pulse_query::{parse_window, EventFilters, QueryService};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

const PEER_HEADER: &str = "x-pulse-peer";

#[derive(Clone)]
struct QueryState {
    service: Arc<QueryService>,
    enabled: bool,
}

#[derive(Deserialize)]
struct EventsParams {
    last: Option<String>,
    since: Option<String>,
    priority: Option<String>,
    source_daemon: Option<String>,
    event_type: Option<String>,
}

#[derive(Deserialize)]
struct MetricsParams {
    window: String,
    priority: Option<String>,
    source_daemon: Option<String>,
    event_type: Option<String>,
}

fn requester(headers: &HeaderMap) -> String {
    headers
        .get(PEER_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous")
        .to_string()
}

fn raw_filters(priority: Option<String>, source_daemon: Option<String>, event_type: Option<String>) -> BTreeMap<String, String> {
    let mut raw = BTreeMap::new();
    if let Some(v) = priority {
        raw.insert("priority".to_string(), v);
    }
    if let Some(v) = source_daemon {
        raw.insert("source_daemon".to_string(), v);
    }
    if let Some(v) = event_type {
        raw.insert("event_type".to_string(), v);
    }
    raw
}

async fn get_events(State(state): State<QueryState>, headers: HeaderMap, Query(params): Query<EventsParams>) -> Response {
    if !state.enabled {
        return (StatusCode::FORBIDDEN, "query surface is disabled").into_response();
    }

    let since = if let Some(since) = &params.since {
        match chrono::DateTime::parse_from_rfc3339(since) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(error) => return (StatusCode::BAD_REQUEST, error.to_string()).into_response(),
        }
    } else if let Some(last) = &params.last {
        match parse_window(last) {
            Ok(duration) => Utc::now() - duration,
            Err(error) => return (StatusCode::BAD_REQUEST, error.to_string()).into_response(),
        }
    } else {
        Utc::now() - chrono::Duration::hours(1)
    };

    let raw = raw_filters(params.priority, params.source_daemon, params.event_type);
    let filters = match EventFilters::from_raw(&raw) {
        Ok(f) => f,
        Err(error) => return (StatusCode::BAD_REQUEST, error.to_string()).into_response(),
    };

    match state.service.query_events(since, &filters, &requester(&headers)) {
        Ok(events) => {
            let body: Vec<Value> = events.iter().map(|e| e.to_value()).collect();
            Json(body).into_response()
        }
        Err(error) => (StatusCode::FORBIDDEN, error.to_string()).into_response(),
    }
}

async fn get_metrics(State(state): State<QueryState>, headers: HeaderMap, Query(params): Query<MetricsParams>) -> Response {
    if !state.enabled {
        return (StatusCode::FORBIDDEN, "query surface is disabled").into_response();
    }

    let raw = raw_filters(params.priority, params.source_daemon, params.event_type);
    let filters = match EventFilters::from_raw(&raw) {
        Ok(f) => f,
        Err(error) => return (StatusCode::BAD_REQUEST, error.to_string()).into_response(),
    };

    match state.service.query_metrics(&params.window, &filters, &requester(&headers)) {
        Ok(result) => Json(result).into_response(),
        Err(error) => (StatusCode::FORBIDDEN, error.to_string()).into_response(),
    }
}

pub fn router(service: Arc<QueryService>, enabled: bool) -> Router {
    Router::new()
        .route("/query/events", get(get_events))
        .route("/query/metrics", get(get_metrics))
        .with_state(QueryState { service, enabled })
}
