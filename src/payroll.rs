//! Payroll aggregation: an external collaborator over `LIQUID1`.
//!
//! The core only owns the contract and a `sqlx`-backed implementation; the
//! aggregation itself (summing calculated/reported amounts per concept) is
//! someone else's business logic that this service fronts read-only.

use async_trait::async_trait;
use chrono::Datelike;
use sqlx::PgPool;

use crate::error::ApiError;
use crate::models::LiquidacionTotal;

#[derive(Debug, Clone, Copy)]
pub struct LiquidacionQuery<'a> {
    pub year: i32,
    pub month: i32,
    pub liquidation_type: &'a str,
    pub employee_id: Option<i64>,
}

impl LiquidacionQuery<'_> {
    /// Current year/month (server clock) and liquidation type `"0"`.
    pub fn defaults() -> LiquidacionQuery<'static> {
        let now = chrono::Utc::now();
        LiquidacionQuery {
            year: now.year(),
            month: now.month() as i32,
            liquidation_type: "0",
            employee_id: None,
        }
    }
}

#[async_trait]
pub trait PayrollAggregator: Send + Sync {
    /// Sums `LIQUID1` rows grouped by concept code. When `employee_id` is
    /// omitted the sum spans all employees; otherwise at most one line per
    /// concept code is returned.
    async fn aggregate(
        &self,
        query: LiquidacionQuery<'_>,
    ) -> Result<Vec<LiquidacionTotal>, ApiError>;

    /// Distinct `TipoLiquidacion` codes observed in the corpus view.
    async fn liquidation_types(&self) -> Result<Vec<String>, ApiError>;
}

pub struct PgPayrollAggregator {
    pool: PgPool,
}

impl PgPayrollAggregator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PayrollAggregator for PgPayrollAggregator {
    async fn aggregate(
        &self,
        query: LiquidacionQuery<'_>,
    ) -> Result<Vec<LiquidacionTotal>, ApiError> {
        let rows: Vec<(String, f64, f64, i64)> = if let Some(employee_id) = query.employee_id {
            sqlx::query_as(
                r#"
                SELECT "Liq1Cnc", SUM("Liq1Cal"), SUM("Liq1Inf"), COUNT(*)
                FROM "LIQUID1"
                WHERE "LiqAno" = $1 AND "LiqMes" = $2 AND "LiqTpoLiq" = $3 AND "LiqLeg" = $4
                GROUP BY "Liq1Cnc"
                ORDER BY "Liq1Cnc"
                "#,
            )
            .bind(query.year)
            .bind(query.month)
            .bind(query.liquidation_type)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                r#"
                SELECT "Liq1Cnc", SUM("Liq1Cal"), SUM("Liq1Inf"), COUNT(*)
                FROM "LIQUID1"
                WHERE "LiqAno" = $1 AND "LiqMes" = $2 AND "LiqTpoLiq" = $3
                GROUP BY "Liq1Cnc"
                ORDER BY "Liq1Cnc"
                "#,
            )
            .bind(query.year)
            .bind(query.month)
            .bind(query.liquidation_type)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(rows
            .into_iter()
            .map(
                |(concept_code, sum_calculated, sum_reported, line_count)| LiquidacionTotal {
                    concept_code,
                    sum_calculated,
                    sum_reported,
                    line_count,
                },
            )
            .collect())
    }

    async fn liquidation_types(&self) -> Result<Vec<String>, ApiError> {
        let rows: Vec<(String,)> =
            sqlx::query_as(r#"SELECT DISTINCT "LiqTpoLiq" FROM "LIQUID1" ORDER BY "LiqTpoLiq""#)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(t,)| t).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_server_clock_and_liquidation_type_zero() {
        let defaults = LiquidacionQuery::defaults();
        assert_eq!(defaults.liquidation_type, "0");
        assert!(defaults.employee_id.is_none());
        assert!(defaults.year >= 2024);
    }
}
