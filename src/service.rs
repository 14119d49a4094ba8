//! Composes [`VariableParser`], [`DependencyIndex`] and [`ConceptCorpus`]
//! into the read-only operations the HTTP surface exposes.

use std::sync::Arc;

use crate::color::ColorDeriver;
use crate::corpus::ConceptCorpus;
use crate::error::ApiError;
use crate::index::{DependencyIndex, IndexStats};
use crate::models::{ColoredConcept, ConceptDetail, ConceptSummary, RangeListing};
use crate::parser::VariableParser;

const LIST_PAGE_SIZE: usize = 500;
const SEARCH_RESULT_CAP: usize = 20;
const SEARCH_MIN_CHARS: usize = 2;

pub struct ConceptService {
    corpus: Arc<dyn ConceptCorpus>,
    index: Arc<DependencyIndex>,
    parser: VariableParser,
}

impl ConceptService {
    pub fn new(corpus: Arc<dyn ConceptCorpus>, index: Arc<DependencyIndex>) -> Self {
        Self {
            corpus,
            index,
            parser: VariableParser::new(),
        }
    }

    /// Enumeration of concept summaries, capped at `LIST_PAGE_SIZE`. Does
    /// not parse formulas.
    pub async fn list(&self) -> Result<Vec<ConceptSummary>, ApiError> {
        let concepts = self.corpus.list_all().await?;
        Ok(concepts
            .iter()
            .take(LIST_PAGE_SIZE)
            .map(ConceptSummary::from)
            .collect())
    }

    /// Case-insensitive substring match on code or description, capped at
    /// `SEARCH_RESULT_CAP`. Queries shorter than `SEARCH_MIN_CHARS` yield `[]`.
    pub async fn search(&self, q: &str) -> Result<Vec<ConceptSummary>, ApiError> {
        if q.trim().chars().count() < SEARCH_MIN_CHARS {
            return Ok(Vec::new());
        }

        let needle = q.trim().to_lowercase();
        let concepts = self.corpus.list_all().await?;
        Ok(concepts
            .iter()
            .filter(|c| {
                c.code.to_lowercase().contains(&needle) || c.description.to_lowercase().contains(&needle)
            })
            .take(SEARCH_RESULT_CAP)
            .map(ConceptSummary::from)
            .collect())
    }

    /// Full detail for one concept: parsed formula/condition variables,
    /// forward deps (from formula + condition, `"0000"` excluded), reverse
    /// deps from the index, and derived colors.
    pub async fn detail(&self, code: &str) -> Result<ConceptDetail, ApiError> {
        let concept = self
            .corpus
            .find_by_code(code)
            .await?
            .ok_or_else(|| ApiError::not_found(code))?;

        let formula_variables = self.parser.parse(&concept.formula);
        let condition_variables = self.parser.parse(&concept.condition);

        let mut dependencies: Vec<String> = self
            .parser
            .forward_references(&concept.formula)
            .into_iter()
            .chain(self.parser.forward_references(&concept.condition))
            .collect();
        dependencies.sort();
        dependencies.dedup();

        let dependents = self.index.dependents(code).await;
        let colors = ColorDeriver::derive(code);

        Ok(ConceptDetail {
            concept,
            formula_variables,
            condition_variables,
            dependencies,
            dependents,
            colors,
        })
    }

    /// Fetches `[lo, hi]` and applies the SC/ST definitive/transitory
    /// filter implied by `prefix`.
    pub async fn range_listing(
        &self,
        prefix: &str,
        lo: &str,
        hi: &str,
    ) -> Result<RangeListing, ApiError> {
        let lo_n: u32 = lo
            .parse()
            .map_err(|_| ApiError::bad_request(format!("'{lo}' is not a valid range start")))?;
        let hi_n: u32 = hi
            .parse()
            .map_err(|_| ApiError::bad_request(format!("'{hi}' is not a valid range end")))?;
        if lo_n > hi_n {
            return Err(ApiError::bad_request(format!(
                "range start {lo} is greater than range end {hi}"
            )));
        }

        let concepts = self.corpus.find_in_range(lo, hi).await?;

        use crate::models::Classification;
        let filtered: Vec<_> = match prefix {
            "SC" => concepts
                .iter()
                .filter(|c| c.classification == Classification::Definitive)
                .collect(),
            "ST" => concepts
                .iter()
                .filter(|c| c.classification == Classification::Transitory)
                .collect(),
            _ => concepts.iter().collect(),
        };

        let description = match prefix {
            "SC" => format!("Conceptos definitivos {lo}-{hi}"),
            "ST" => format!("Conceptos transitorios {lo}-{hi}"),
            _ => format!("Conceptos {lo}-{hi}"),
        };

        let concepts = filtered
            .into_iter()
            .map(|c| ColoredConcept {
                summary: ConceptSummary::from(c),
                colors: ColorDeriver::derive(&c.code),
            })
            .collect();

        Ok(RangeListing {
            description,
            concepts,
        })
    }

    /// Triggers a full index rebuild and returns its stats. On failure the
    /// previous snapshot is retained and the stats it reflects are returned
    /// instead of failing the request — a rebuild hiccup must not turn an
    /// explicit refresh into a 500.
    pub async fn refresh_index(&self) -> IndexStats {
        match self.index.build(self.corpus.as_ref()).await {
            Ok(stats) => stats,
            Err(err) => {
                tracing::error!(error = %err, "explicit index refresh failed, keeping previous snapshot");
                self.index.stats().await
            }
        }
    }

    pub async fn index_stats(&self) -> IndexStats {
        self.index.stats().await
    }

    /// Forward deps only. `ApiError::NotFound` if `code` is absent.
    pub async fn dependencies(&self, code: &str) -> Result<Vec<String>, ApiError> {
        Ok(self.detail(code).await?.dependencies)
    }

    /// Reverse deps only; an unknown code yields `[]`, never `NotFound`.
    pub async fn dependents(&self, code: &str) -> Vec<String> {
        self.index.dependents(code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::StaticConceptCorpus;
    use crate::models::{Classification, Concept};

    fn concept(code: &str, formula: &str, classification: Classification) -> Concept {
        Concept {
            code: code.to_string(),
            formula: formula.to_string(),
            condition: String::new(),
            description: format!("Concepto {code}"),
            formula_description: String::new(),
            type_code: "1".to_string(),
            ordering: 0,
            classification,
            liquidation_types: "0".to_string(),
            v1: None,
            v2: None,
            v3: None,
        }
    }

    fn service(concepts: Vec<Concept>) -> ConceptService {
        let corpus: Arc<dyn ConceptCorpus> = Arc::new(StaticConceptCorpus::new(concepts));
        let index = Arc::new(DependencyIndex::new());
        ConceptService::new(corpus, index)
    }

    // Invariant 1 (§8): detail().dependencias equals the union of forward
    // references from formula and condition, "0000" excluded.
    #[tokio::test]
    async fn detail_dependencies_match_parser_forward_references() {
        let svc = service(vec![concept(
            "A",
            "%CALC0100%+%CALC0000%",
            Classification::Transitory,
        )]);
        let detail = svc.detail("A").await.unwrap();
        assert_eq!(detail.dependencies, vec!["0100".to_string()]);
    }

    #[tokio::test]
    async fn detail_of_unknown_code_is_not_found() {
        let svc = service(vec![]);
        assert!(matches!(
            svc.detail("9999").await,
            Err(ApiError::NotFound { .. })
        ));
    }

    // S5
    #[tokio::test]
    async fn s5_search_enforces_minimum_query_length() {
        let svc = service(vec![concept("0100", "", Classification::Transitory)]);
        assert!(svc.search("").await.unwrap().is_empty());
        assert!(svc.search("a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_matches_code_or_description_case_insensitively() {
        let svc = service(vec![concept("SAL001", "", Classification::Transitory)]);
        let hits = svc.search("sal").await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    // S2
    #[tokio::test]
    async fn s2_range_listing_keeps_only_definitive_for_sc_prefix() {
        let svc = service(vec![
            concept("0050", "", Classification::Definitive),
            concept("0075", "", Classification::Transitory),
            concept("0100", "", Classification::Definitive),
        ]);
        let listing = svc.range_listing("SC", "0050", "0100").await.unwrap();
        let codes: Vec<&str> = listing
            .concepts
            .iter()
            .map(|c| c.summary.code.as_str())
            .collect();
        assert_eq!(codes, vec!["0050", "0100"]);
    }

    #[tokio::test]
    async fn range_listing_rejects_non_numeric_bounds() {
        let svc = service(vec![]);
        assert!(matches!(
            svc.range_listing("SC", "abcd", "0100").await,
            Err(ApiError::BadRequest { .. })
        ));
    }

    #[tokio::test]
    async fn dependents_of_unknown_code_is_empty_not_error() {
        let svc = service(vec![]);
        assert!(svc.dependents("9999").await.is_empty());
    }
}
