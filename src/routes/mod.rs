pub mod concepts;
pub mod liquidacion;

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{http::StatusCode, Router};

use crate::state::AppState;

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .merge(concepts::router())
        .merge(liquidacion::router())
}
