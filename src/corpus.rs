//! Thin contract over the external relational store.
//!
//! `PgConceptCorpus` queries the read-only view `ConceptoTipoLiqFormula`
//! through a `sqlx::PgPool`; `StaticConceptCorpus` is an in-memory stand-in
//! used by tests, mirroring the teacher's `GraphRepository` /
//! `DslDomainRepositoryTrait` split between a trait and a concrete impl.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::ApiError;
use crate::models::{Classification, Concept};

#[async_trait]
pub trait ConceptCorpus: Send + Sync {
    /// All concepts, one row per `(CodConcepto, CodFormula)` pair.
    async fn list_all(&self) -> Result<Vec<Concept>, ApiError>;

    /// The representative concept for `code`, if any.
    async fn find_by_code(&self, code: &str) -> Result<Option<Concept>, ApiError>;

    /// Every concept whose code lies within the inclusive `[lo, hi]` range.
    async fn find_in_range(&self, lo: &str, hi: &str) -> Result<Vec<Concept>, ApiError>;

    /// The distinct `TipoLiquidacion` codes observed in the corpus.
    async fn liquidation_types(&self) -> Result<Vec<String>, ApiError>;
}

const SELECT_CONCEPTS: &str = r#"
    SELECT
        "CodConcepto",
        "CodFormula",
        "CondicionFormula",
        "DescripcionConcepto",
        "DescripcionFormula",
        "TipoConcepto",
        "Orden",
        "TransitorioDefinitivo",
        "FormulaCompleta",
        string_agg("TipoLiquidacion", '-' ORDER BY "TipoLiquidacion") AS liquidation_types,
        MIN("Valor1") AS valor1,
        MIN("Valor2") AS valor2,
        MIN("Valor3") AS valor3
    FROM "ConceptoTipoLiqFormula"
"#;

const GROUP_AND_ORDER: &str = r#"
    GROUP BY "CodConcepto", "CodFormula", "CondicionFormula", "DescripcionConcepto",
             "DescripcionFormula", "TipoConcepto", "Orden", "TransitorioDefinitivo",
             "FormulaCompleta"
    ORDER BY "CodConcepto", "Orden"
"#;

/// Raw projection of one `ConceptoTipoLiqFormula` row, before translating
/// the single-letter classification column into `Classification`.
#[derive(sqlx::FromRow)]
struct ConceptRow {
    #[sqlx(rename = "CodConcepto")]
    cod_concepto: String,
    #[sqlx(rename = "CondicionFormula")]
    condicion_formula: String,
    #[sqlx(rename = "DescripcionConcepto")]
    descripcion_concepto: String,
    #[sqlx(rename = "DescripcionFormula")]
    descripcion_formula: String,
    #[sqlx(rename = "TipoConcepto")]
    tipo_concepto: String,
    #[sqlx(rename = "Orden")]
    orden: i32,
    #[sqlx(rename = "TransitorioDefinitivo")]
    transitorio_definitivo: String,
    #[sqlx(rename = "FormulaCompleta")]
    formula_completa: String,
    liquidation_types: String,
    valor1: Option<f64>,
    valor2: Option<f64>,
    valor3: Option<f64>,
}

fn row_to_concept(row: ConceptRow) -> Concept {
    Concept {
        code: row.cod_concepto,
        formula: row.formula_completa,
        condition: row.condicion_formula,
        description: row.descripcion_concepto,
        formula_description: row.descripcion_formula,
        type_code: row.tipo_concepto,
        ordering: row.orden,
        classification: Classification::from_column(&row.transitorio_definitivo),
        liquidation_types: row.liquidation_types,
        v1: row.valor1,
        v2: row.valor2,
        v3: row.valor3,
    }
}

/// `ConceptCorpus` backed by a live Postgres connection pool.
pub struct PgConceptCorpus {
    pool: PgPool,
}

impl PgConceptCorpus {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConceptCorpus for PgConceptCorpus {
    async fn list_all(&self) -> Result<Vec<Concept>, ApiError> {
        let query = format!("{SELECT_CONCEPTS} {GROUP_AND_ORDER}");
        let rows: Vec<ConceptRow> = sqlx::query_as(&query).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(row_to_concept).collect())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Concept>, ApiError> {
        let query = format!(
            r#"{SELECT_CONCEPTS} WHERE "CodConcepto" = $1 {GROUP_AND_ORDER} LIMIT 1"#
        );
        let row: Option<ConceptRow> = sqlx::query_as(&query)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(row_to_concept))
    }

    async fn find_in_range(&self, lo: &str, hi: &str) -> Result<Vec<Concept>, ApiError> {
        let query = format!(
            r#"{SELECT_CONCEPTS} WHERE "CodConcepto" BETWEEN $1 AND $2 {GROUP_AND_ORDER}"#
        );
        let rows: Vec<ConceptRow> = sqlx::query_as(&query)
            .bind(lo)
            .bind(hi)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(row_to_concept).collect())
    }

    async fn liquidation_types(&self) -> Result<Vec<String>, ApiError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"SELECT DISTINCT "TipoLiquidacion" FROM "ConceptoTipoLiqFormula" ORDER BY "TipoLiquidacion""#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(t,)| t).collect())
    }
}

/// In-memory `ConceptCorpus` over a fixed `Vec<Concept>`; backs tests that
/// need no live Postgres instance.
pub struct StaticConceptCorpus {
    concepts: Vec<Concept>,
}

impl StaticConceptCorpus {
    pub fn new(concepts: Vec<Concept>) -> Self {
        Self { concepts }
    }
}

#[async_trait]
impl ConceptCorpus for StaticConceptCorpus {
    async fn list_all(&self) -> Result<Vec<Concept>, ApiError> {
        Ok(self.concepts.clone())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Concept>, ApiError> {
        Ok(self.concepts.iter().find(|c| c.code == code).cloned())
    }

    async fn find_in_range(&self, lo: &str, hi: &str) -> Result<Vec<Concept>, ApiError> {
        Ok(self
            .concepts
            .iter()
            .filter(|c| lo <= c.code.as_str() && c.code.as_str() <= hi)
            .cloned()
            .collect())
    }

    async fn liquidation_types(&self) -> Result<Vec<String>, ApiError> {
        let mut types: Vec<String> = self
            .concepts
            .iter()
            .flat_map(|c| c.liquidation_types.split('-'))
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty())
            .collect();
        types.sort();
        types.dedup();
        Ok(types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concept(code: &str, formula: &str) -> Concept {
        Concept {
            code: code.to_string(),
            formula: formula.to_string(),
            condition: String::new(),
            description: format!("Concept {code}"),
            formula_description: String::new(),
            type_code: "1".to_string(),
            ordering: 0,
            classification: Classification::Transitory,
            liquidation_types: "0".to_string(),
            v1: None,
            v2: None,
            v3: None,
        }
    }

    #[tokio::test]
    async fn finds_by_code() {
        let corpus = StaticConceptCorpus::new(vec![concept("0100", "%VAL1%")]);
        let found = corpus.find_by_code("0100").await.unwrap();
        assert!(found.is_some());
        assert!(corpus.find_by_code("9999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn range_is_inclusive_on_both_ends() {
        let corpus = StaticConceptCorpus::new(vec![
            concept("0049", "x"),
            concept("0050", "x"),
            concept("0100", "x"),
            concept("0101", "x"),
        ]);
        let found = corpus.find_in_range("0050", "0100").await.unwrap();
        let codes: Vec<&str> = found.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["0050", "0100"]);
    }
}
