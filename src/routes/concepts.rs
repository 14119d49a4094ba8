//! `/api/conceptos/*` handlers.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use crate::error::ApiError;
use crate::index::IndexStats;
use crate::models::{ConceptDetail, ConceptSummary, RangeListing};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/conceptos", get(list))
        .route("/api/conceptos/buscar", get(search))
        .route("/api/conceptos/batch", post(batch))
        .route("/api/conceptos/rango/:lo/:hi", get(range_listing))
        .route("/api/conceptos/cache/refresh", post(refresh_cache))
        .route("/api/conceptos/cache/stats", get(cache_stats))
        .route("/api/conceptos/:code", get(detail))
        .route("/api/conceptos/:code/dependencias", get(dependencies))
        .route("/api/conceptos/:code/dependientes", get(dependents))
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<ConceptSummary>>, ApiError> {
    Ok(Json(state.service.list().await?))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<ConceptSummary>>, ApiError> {
    Ok(Json(state.service.search(&params.q).await?))
}

async fn detail(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ConceptDetail>, ApiError> {
    Ok(Json(state.service.detail(&code).await?))
}

async fn batch(
    State(state): State<AppState>,
    Json(codes): Json<Vec<String>>,
) -> Result<Json<Vec<Option<ConceptDetail>>>, ApiError> {
    let mut out = Vec::with_capacity(codes.len());
    for code in codes {
        out.push(match state.service.detail(&code).await {
            Ok(detail) => Some(detail),
            Err(ApiError::NotFound { .. }) => None,
            Err(other) => return Err(other),
        });
    }
    Ok(Json(out))
}

#[derive(Debug, Deserialize)]
struct RangeQuery {
    #[serde(rename = "tipoRango", default)]
    tipo_rango: String,
}

async fn range_listing(
    State(state): State<AppState>,
    Path((lo, hi)): Path<(String, String)>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<RangeListing>, ApiError> {
    Ok(Json(
        state
            .service
            .range_listing(&params.tipo_rango, &lo, &hi)
            .await?,
    ))
}

async fn dependencies(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.service.dependencies(&code).await?))
}

async fn dependents(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Json<Vec<String>> {
    Json(state.service.dependents(&code).await)
}

async fn refresh_cache(State(state): State<AppState>) -> Json<IndexStats> {
    tracing::info!("explicit index refresh requested");
    Json(state.service.refresh_index().await)
}

async fn cache_stats(State(state): State<AppState>) -> Json<IndexStats> {
    Json(state.service.index_stats().await)
}
