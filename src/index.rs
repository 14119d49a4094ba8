//! In-memory reverse-dependency index: `code -> {codes that reference it}`,
//! plus a range sub-map queried lazily at read time.
//!
//! Held behind a `RwLock<Arc<IndexSnapshot>>` so readers clone the `Arc`
//! under a short read lock and then operate on the owned snapshot outside
//! the lock; a rebuild constructs a new snapshot off to the side and swaps
//! it in under a short write lock. A `tokio::sync::Mutex` serializes
//! concurrent rebuilds against each other (not against readers).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::corpus::ConceptCorpus;
use crate::error::ApiError;
use crate::parser::VariableParser;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexStats {
    pub ready: bool,
    pub direct_entries: usize,
    pub range_entries: usize,
    pub busiest_code: Option<String>,
    pub busiest_fan_in: usize,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct IndexSnapshot {
    direct: HashMap<String, HashSet<String>>,
    ranges: HashMap<String, HashSet<String>>,
    ready: bool,
}

pub struct DependencyIndex {
    snapshot: RwLock<Arc<IndexSnapshot>>,
    build_lock: Mutex<()>,
}

impl Default for DependencyIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(IndexSnapshot::default())),
            build_lock: Mutex::new(()),
        }
    }

    /// Full rebuild from `corpus`. The previous snapshot stays live (and
    /// readers keep seeing it) for the entire duration of this call; it is
    /// swapped out atomically only once the new maps are complete.
    pub async fn build(&self, corpus: &dyn ConceptCorpus) -> Result<IndexStats, ApiError> {
        let _guard = self.build_lock.lock().await;

        let parser = VariableParser::new();
        let concepts = corpus.list_all().await?;
        if concepts.is_empty() {
            tracing::warn!("dependency index rebuild observed an empty corpus");
        }

        let mut direct: HashMap<String, HashSet<String>> = HashMap::new();
        let mut ranges: HashMap<String, HashSet<String>> = HashMap::new();

        for concept in &concepts {
            let mut refs = parser.forward_references(&concept.formula);
            refs.extend(parser.forward_references(&concept.condition));
            for referenced in refs {
                direct.entry(referenced).or_default().insert(concept.code.clone());
            }

            let mut spans = parser.ranges(&concept.formula);
            spans.extend(parser.ranges(&concept.condition));
            for (lo, hi) in spans {
                ranges
                    .entry(format!("{lo}-{hi}"))
                    .or_default()
                    .insert(concept.code.clone());
            }
        }

        let new_snapshot = IndexSnapshot {
            direct,
            ranges,
            ready: true,
        };
        let stats = Self::stats_of(&new_snapshot);

        let mut guard = self.snapshot.write().await;
        *guard = Arc::new(new_snapshot);
        drop(guard);

        tracing::info!(
            direct_entries = stats.direct_entries,
            range_entries = stats.range_entries,
            "dependency index rebuilt"
        );

        Ok(stats)
    }

    /// Union of direct references to `code` and every range containing it.
    /// Returns `[]` before the first build completes.
    pub async fn dependents(&self, code: &str) -> Vec<String> {
        let snapshot = (*self.snapshot.read().await).clone();
        if !snapshot.ready {
            return Vec::new();
        }

        let mut out: HashSet<String> = snapshot.direct.get(code).cloned().unwrap_or_default();

        if let Ok(numeric) = code.parse::<i64>() {
            for (key, referencing) in &snapshot.ranges {
                if let Some((lo, hi)) = key.split_once('-') {
                    if let (Ok(lo), Ok(hi)) = (lo.parse::<i64>(), hi.parse::<i64>()) {
                        if lo <= numeric && numeric <= hi {
                            out.extend(referencing.iter().cloned());
                        }
                    }
                }
            }
        }

        let mut out: Vec<String> = out.into_iter().collect();
        out.sort();
        out
    }

    /// The concepts that reference exactly the range `[lo, hi]` as written
    /// in their formula/condition. `[]` if that literal range was never
    /// observed during a build.
    pub async fn dependents_of_range(&self, lo: &str, hi: &str) -> Vec<String> {
        let snapshot = (*self.snapshot.read().await).clone();
        let key = format!("{lo}-{hi}");
        let mut out: Vec<String> = snapshot
            .ranges
            .get(&key)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .collect();
        out.sort();
        out
    }

    pub async fn stats(&self) -> IndexStats {
        let snapshot = (*self.snapshot.read().await).clone();
        Self::stats_of(&snapshot)
    }

    fn stats_of(snapshot: &IndexSnapshot) -> IndexStats {
        let busiest = snapshot.direct.iter().max_by_key(|(_, referencing)| referencing.len());
        IndexStats {
            ready: snapshot.ready,
            direct_entries: snapshot.direct.len(),
            range_entries: snapshot.ranges.len(),
            busiest_code: busiest.map(|(code, _)| code.clone()),
            busiest_fan_in: busiest.map(|(_, referencing)| referencing.len()).unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::StaticConceptCorpus;
    use crate::models::{Classification, Concept};

    fn concept(code: &str, formula: &str, condition: &str) -> Concept {
        Concept {
            code: code.to_string(),
            formula: formula.to_string(),
            condition: condition.to_string(),
            description: format!("Concept {code}"),
            formula_description: String::new(),
            type_code: "1".to_string(),
            ordering: 0,
            classification: Classification::Definitive,
            liquidation_types: "0".to_string(),
            v1: None,
            v2: None,
            v3: None,
        }
    }

    // S1: A references 0100 twice (CALC and INFO), B references it once.
    #[tokio::test]
    async fn s1_direct_references_fan_in() {
        let corpus = StaticConceptCorpus::new(vec![
            concept("A", "%CALC0100%+%INFO0100%", ""),
            concept("B", "%CALC0100%", ""),
        ]);
        let index = DependencyIndex::new();
        index.build(&corpus).await.unwrap();

        let mut dependents = index.dependents("0100").await;
        dependents.sort();
        assert_eq!(dependents, vec!["A".to_string(), "B".to_string()]);
    }

    // S2: C references range 0050-0100; 75 falls inside it.
    #[tokio::test]
    async fn s2_range_containment_at_query_time() {
        let corpus = StaticConceptCorpus::new(vec![concept("C", "%SC00500100%", "")]);
        let index = DependencyIndex::new();
        index.build(&corpus).await.unwrap();

        let range_dependents = index.dependents_of_range("0050", "0100").await;
        assert!(range_dependents.contains(&"C".to_string()));

        let dependents_of_75 = index.dependents("0075").await;
        assert!(dependents_of_75.contains(&"C".to_string()));
    }

    // S4: formula and condition reference the same concept; D should
    // appear exactly once in the reverse set (no double-counting).
    #[tokio::test]
    async fn s4_formula_and_condition_dedupe_into_one_entry() {
        let corpus = StaticConceptCorpus::new(vec![concept("D", "%CALC0200%", "%CALC0200%")]);
        let index = DependencyIndex::new();
        index.build(&corpus).await.unwrap();

        let dependents = index.dependents("0200").await;
        assert_eq!(dependents, vec!["D".to_string()]);
    }

    // S6: rebuilding against an empty corpus is authoritative, not
    // defensive — the previous snapshot is discarded, not retained.
    #[tokio::test]
    async fn s6_empty_rebuild_replaces_previous_snapshot() {
        let populated = StaticConceptCorpus::new(vec![concept("A", "%CALC0100%", "")]);
        let empty = StaticConceptCorpus::new(vec![]);

        let index = DependencyIndex::new();
        index.build(&populated).await.unwrap();
        assert!(!index.dependents("0100").await.is_empty());

        let stats = index.build(&empty).await.unwrap();
        assert_eq!(stats.direct_entries, 0);
        assert!(index.dependents("0100").await.is_empty());
    }

    #[tokio::test]
    async fn build_is_idempotent_over_an_unchanged_corpus() {
        let corpus = StaticConceptCorpus::new(vec![
            concept("A", "%CALC0100%", ""),
            concept("B", "%SC00500100%", ""),
        ]);
        let index = DependencyIndex::new();
        let first = index.build(&corpus).await.unwrap();
        let second = index.build(&corpus).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn queries_before_first_build_return_empty_not_panic() {
        let index = DependencyIndex::new();
        assert!(index.dependents("0100").await.is_empty());
        assert!(!index.stats().await.ready);
    }
}
