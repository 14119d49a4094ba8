//! Plain data records produced by the repository layer
//!
//! These are the authoritative projection of `ConceptoTipoLiqFormula` and
//! `LIQUID1` the core consumes — no ORM, just plain structs the repository
//! maps rows onto.

use serde::{Deserialize, Serialize};

use crate::color::ConceptColors;
use crate::parser::ParsedVariable;

/// Definitive vs. transitory classification, derived from the view's
/// single-letter `TransitorioDefinitivo` column (`'D'` => Definitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Definitive,
    Transitory,
}

impl Classification {
    pub fn from_column(letter: &str) -> Self {
        if letter.trim().eq_ignore_ascii_case("D") {
            Classification::Definitive
        } else {
            Classification::Transitory
        }
    }
}

/// A payroll-formula concept, read-only and sourced from
/// `ConceptoTipoLiqFormula`. Each `(CodConcepto, CodFormula)` row projects
/// to one `Concept` — a concept code may appear more than once if it has
/// more than one formula.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub code: String,
    pub formula: String,
    pub condition: String,
    pub description: String,
    pub formula_description: String,
    pub type_code: String,
    pub ordering: i32,
    pub classification: Classification,
    /// Aggregated `TipoLiquidacion` values for this row, `-`-joined.
    pub liquidation_types: String,
    pub v1: Option<f64>,
    pub v2: Option<f64>,
    pub v3: Option<f64>,
}

/// Lightweight summary used by `list` and `buscar` (search) — no formula
/// parsing involved.
#[derive(Debug, Clone, Serialize)]
pub struct ConceptSummary {
    pub code: String,
    pub description: String,
    pub type_code: String,
    pub classification: Classification,
}

impl From<&Concept> for ConceptSummary {
    fn from(c: &Concept) -> Self {
        Self {
            code: c.code.clone(),
            description: c.description.clone(),
            type_code: c.type_code.clone(),
            classification: c.classification,
        }
    }
}

/// Aggregated payroll totals for one concept code, as returned by
/// `PayrollAggregator`.
#[derive(Debug, Clone, Serialize)]
pub struct LiquidacionTotal {
    pub concept_code: String,
    pub sum_calculated: f64,
    pub sum_reported: f64,
    pub line_count: i64,
}

/// A `ConceptSummary` paired with its derived display colors.
#[derive(Debug, Clone, Serialize)]
pub struct ColoredConcept {
    #[serde(flatten)]
    pub summary: ConceptSummary,
    pub colors: ConceptColors,
}

/// Full detail payload for one concept: the record itself, its parsed
/// formula and condition variables, and both directions of the dependency
/// graph.
#[derive(Debug, Clone, Serialize)]
pub struct ConceptDetail {
    pub concept: Concept,
    pub formula_variables: Vec<ParsedVariable>,
    pub condition_variables: Vec<ParsedVariable>,
    pub dependencies: Vec<String>,
    pub dependents: Vec<String>,
    pub colors: ConceptColors,
}

/// A filtered, colored listing of the concepts in `[lo, hi]`.
#[derive(Debug, Clone, Serialize)]
pub struct RangeListing {
    pub description: String,
    pub concepts: Vec<ColoredConcept>,
}
