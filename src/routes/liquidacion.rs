//! `/api/liquidacion*` handlers, fronting the `PayrollAggregator`.

use axum::extract::{Query, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::error::ApiError;
use crate::models::LiquidacionTotal;
use crate::payroll::LiquidacionQuery;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/liquidacion", get(aggregate))
        .route("/api/liquidacion/tipos", get(tipos))
}

#[derive(Debug, Deserialize)]
struct LiquidacionParams {
    anio: Option<i32>,
    mes: Option<i32>,
    tipo: Option<String>,
    legajo: Option<i64>,
}

async fn aggregate(
    State(state): State<AppState>,
    Query(params): Query<LiquidacionParams>,
) -> Result<Json<Vec<LiquidacionTotal>>, ApiError> {
    let defaults = LiquidacionQuery::defaults();
    let query = LiquidacionQuery {
        year: params.anio.unwrap_or(defaults.year),
        month: params.mes.unwrap_or(defaults.month),
        liquidation_type: params.tipo.as_deref().unwrap_or(defaults.liquidation_type),
        employee_id: params.legajo,
    };
    Ok(Json(state.payroll.aggregate(query).await?))
}

async fn tipos(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.payroll.liquidation_types().await?))
}
