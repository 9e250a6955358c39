//! API route handlers

use std::path::Path as FsPath;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::DateTime;
use copilot_core::{ConnectionDetail, ConnectionPin, Contributions};
use serde::Deserialize;
use tower_http::services::ServeDir;

use super::error::{ApiError, ApiResult};
use super::graphite::StatsQuery;
use super::state::AppState;

/// Create the API router, serving `static_dir` under `/dashboard` when given
pub fn create_router(state: AppState, static_dir: Option<&FsPath>) -> Router {
    let router = Router::new()
        .route("/api/ping", get(ping))
        .route("/api/stats", get(stats))
        .route("/api/connections", get(list_connections))
        .route("/api/connections/", get(list_connections))
        .route("/api/connections/:id", get(connection_detail))
        .route("/api/contributions/:agent_id", get(contributions))
        .with_state(state);

    match static_dir {
        Some(dir) => router.nest_service("/dashboard", ServeDir::new(dir)),
        None => router,
    }
}

async fn ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({"ping": "pong"}))
}

async fn stats(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Response> {
    let query = StatsQuery::from_pairs(pairs);
    if query.targets.is_empty() {
        return Err(ApiError::BadRequest("target".to_string()));
    }

    let body = state.graphite.render(&query).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

#[derive(Debug, Deserialize)]
struct ConnectionsParams {
    from: Option<String>,
}

async fn list_connections(
    State(state): State<AppState>,
    Query(params): Query<ConnectionsParams>,
) -> ApiResult<Json<Vec<ConnectionPin>>> {
    let from = params
        .from
        .ok_or_else(|| ApiError::BadRequest("from".to_string()))?;
    let since = from
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| ApiError::BadRequest(format!("from={}", from)))?;

    let services = state.services.clone();
    let pins =
        tokio::task::spawn_blocking(move || services.connections.list_since(since)).await??;
    Ok(Json(pins))
}

async fn connection_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ConnectionDetail>> {
    let services = state.services.clone();
    let lookup = id.clone();
    let detail =
        tokio::task::spawn_blocking(move || services.connections.get_detail(&lookup)).await??;
    detail.map(Json).ok_or(ApiError::NotFound(id))
}

#[derive(Debug, Deserialize)]
struct ContributionParams {
    days: Option<String>,
}

async fn contributions(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Query(params): Query<ContributionParams>,
) -> ApiResult<Json<Contributions>> {
    let days = match params.days {
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| ApiError::BadRequest(format!("days={}", raw)))?,
        None => state.default_days,
    };

    let services = state.services.clone();
    let series = tokio::task::spawn_blocking(move || {
        services.contributions.get_contributions(&agent_id, days)
    })
    .await??;
    Ok(Json(series))
}
