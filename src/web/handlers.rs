//! HTTP request handlers.

use super::AppState;
use crate::db::{DbError, NewSite, SiteUpdate, TimeRange};
use crate::monitor::MonitorError;
use crate::status::StatusError;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

// ============================================================================
// Health
// ============================================================================

pub async fn handle_health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "timestamp": Utc::now() }))
}

// ============================================================================
// API: Sites
// ============================================================================

pub async fn handle_list_sites(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list_sites() {
        Ok(sites) => Json(sites).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSiteRequest {
    pub url: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

pub async fn handle_create_site(
    State(state): State<AppState>,
    Json(req): Json<CreateSiteRequest>,
) -> impl IntoResponse {
    let (Some(url), Some(name)) = (req.url, req.name) else {
        return (StatusCode::BAD_REQUEST, "URL and name are required").into_response();
    };

    let new = NewSite {
        url,
        name,
        active: req.active.unwrap_or(true),
    };

    match state.store.create_site(new) {
        Ok(site) => (StatusCode::CREATED, Json(site)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn handle_get_site(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_site(&id) {
        Ok(site) => Json(site).into_response(),
        Err(DbError::NotFound) => (StatusCode::NOT_FOUND, "Site not found").into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn handle_update_site(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<SiteUpdate>,
) -> impl IntoResponse {
    match state.store.update_site(&id, update) {
        Ok(site) => Json(site).into_response(),
        Err(DbError::NotFound) => (StatusCode::NOT_FOUND, "Site not found").into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn handle_delete_site(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_site(&id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(DbError::NotFound) => (StatusCode::NOT_FOUND, "Site not found").into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

// ============================================================================
// API: Aggregates
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub async fn handle_site_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RangeQuery>,
) -> impl IntoResponse {
    let range = match (query.start.as_deref(), query.end.as_deref()) {
        (Some(start), Some(end)) => match (parse_rfc3339(start), parse_rfc3339(end)) {
            (Some(start), Some(end)) => Some(TimeRange::new(start, end)),
            _ => {
                return (
                    StatusCode::BAD_REQUEST,
                    "start and end must be RFC 3339 timestamps",
                )
                    .into_response()
            }
        },
        (None, None) => None,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                "start and end must be provided together",
            )
                .into_response()
        }
    };

    match state.status.site_status(&id, range) {
        Ok(status) => Json(status).into_response(),
        Err(StatusError::NotFound) => (StatusCode::NOT_FOUND, "Site not found").into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ChecksQuery {
    #[serde(default)]
    pub limit: Option<u32>,
}

pub async fn handle_site_checks(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ChecksQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(100);

    match state.store.latest_checks(&id, limit) {
        Ok(checks) => Json(checks).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[derive(Debug, Serialize)]
pub struct UptimeResponse {
    pub site_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub uptime_percentage: f64,
}

pub async fn handle_site_uptime(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RangeQuery>,
) -> impl IntoResponse {
    let (Some(start), Some(end)) = (query.start.as_deref(), query.end.as_deref()) else {
        return (
            StatusCode::BAD_REQUEST,
            "start and end query parameters are required",
        )
            .into_response();
    };

    let (Some(start), Some(end)) = (parse_rfc3339(start), parse_rfc3339(end)) else {
        return (
            StatusCode::BAD_REQUEST,
            "start and end must be RFC 3339 timestamps",
        )
            .into_response();
    };

    let range = TimeRange::new(start, end);

    match state.status.uptime_percentage(&id, &range) {
        Ok(Some(uptime_percentage)) => Json(UptimeResponse {
            site_id: id,
            start,
            end,
            uptime_percentage,
        })
        .into_response(),
        // A known site with an empty window is "no data", not an
        // unknown site.
        Ok(None) => (
            StatusCode::NOT_FOUND,
            "No data available for the specified time range",
        )
            .into_response(),
        Err(StatusError::NotFound) => (StatusCode::NOT_FOUND, "Site not found").into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

// ============================================================================
// API: Probing
// ============================================================================

pub async fn handle_run_check(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.monitor.check_site(&id).await {
        Ok(check) => Json(check).into_response(),
        Err(MonitorError::NotFound) => (StatusCode::NOT_FOUND, "Site not found").into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn handle_run_sweep(State(state): State<AppState>) -> impl IntoResponse {
    match state.monitor.sweep().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
