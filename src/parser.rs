//! Extracts `%TOKEN%` variables out of a formula string and classifies each
//! one against the [`PatternRegistry`](crate::pattern::PatternRegistry).

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use serde::Serialize;

use crate::pattern::{VariableKind, PATTERN_REGISTRY};

/// Sentinel captured concept code meaning "this same concept".
const SELF_SENTINEL: &str = "0000";

static TOKEN_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%([A-Z0-9]+)%").expect("token span regex must compile"));

/// One `%TOKEN%` occurrence inside a formula, after classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedVariable {
    /// The bare token text between the `%` markers.
    pub name: String,
    /// The registered pattern prefix that matched (equal to `name` for an
    /// unrecognized token).
    pub prefix: String,
    pub kind: VariableKind,
    /// Populated only for `SingleConcept` tokens; may be the `"0000"`
    /// self-reference sentinel.
    pub referenced_concept: Option<String>,
    /// Populated only for `Range` tokens.
    pub range_start: Option<String>,
    pub range_end: Option<String>,
    pub display_text: String,
    /// Free-text note; `Some("unrecognized")` for an unknown token.
    pub pattern_description: Option<String>,
    pub span_start: usize,
    pub span_end: usize,
}

#[derive(Default)]
pub struct VariableParser;

impl VariableParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse every `%TOKEN%` occurrence in `formula`, in scan order.
    /// Deterministic and idempotent; never panics on malformed input.
    pub fn parse(&self, formula: &str) -> Vec<ParsedVariable> {
        TOKEN_SPAN
            .find_iter(formula)
            .map(|m| self.parse_one(m.as_str(), m.start(), m.end()))
            .collect()
    }

    fn parse_one(&self, raw: &str, span_start: usize, span_end: usize) -> ParsedVariable {
        let name = raw.trim_matches('%').to_string();

        let Some(found) = PATTERN_REGISTRY.classify(&name) else {
            return ParsedVariable {
                prefix: name.clone(),
                name: name.clone(),
                kind: VariableKind::Terminal,
                referenced_concept: None,
                range_start: None,
                range_end: None,
                display_text: name,
                pattern_description: Some("unrecognized".to_string()),
                span_start,
                span_end,
            };
        };

        let entry = found.entry;
        let groups = found.groups;

        let (referenced_concept, range_start, range_end) = match entry.kind {
            VariableKind::Range => (
                None,
                Some(groups[0].clone()),
                Some(groups.get(1).cloned().unwrap_or_default()),
            ),
            VariableKind::SingleConcept => (Some(groups[0].clone()), None, None),
            VariableKind::Terminal => (None, None, None),
        };

        let is_self = referenced_concept.as_deref() == Some(SELF_SENTINEL);

        let template = if is_self {
            entry.self_template.unwrap_or(entry.display_template)
        } else {
            entry.display_template
        };

        let display_text = render_template(template, entry.kind, &groups);

        ParsedVariable {
            name,
            prefix: entry.prefix.to_string(),
            kind: entry.kind,
            referenced_concept,
            range_start,
            range_end,
            display_text,
            pattern_description: None,
            span_start,
            span_end,
        }
    }

    /// The set of concept codes `formula`'s `SingleConcept` variables point
    /// at, excluding the `"0000"` self sentinel.
    pub fn forward_references(&self, formula: &str) -> HashSet<String> {
        self.parse(formula)
            .into_iter()
            .filter(|v| v.kind == VariableKind::SingleConcept)
            .filter_map(|v| v.referenced_concept)
            .filter(|code| code != SELF_SENTINEL)
            .collect()
    }

    /// The `(start, end)` ranges `formula`'s `Range` variables name,
    /// preserving duplicates in order of appearance.
    pub fn ranges(&self, formula: &str) -> Vec<(String, String)> {
        self.parse(formula)
            .into_iter()
            .filter_map(|v| match (v.range_start, v.range_end) {
                (Some(lo), Some(hi)) => Some((lo, hi)),
                _ => None,
            })
            .collect()
    }
}

fn strip_leading_zeros(s: &str) -> String {
    let trimmed = s.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Substitutes `{nnnn}`, `{xxxx}`, `{mm}`, `{l}` placeholders using the
/// positional convention each bucket's capture groups follow:
/// Range => (nnnn, xxxx); SingleConcept with one group => (nnnn,); with two
/// groups => (nnnn, l); with three groups => (nnnn, mm, l).
fn render_template(template: &str, kind: VariableKind, groups: &[String]) -> String {
    let mut out = template.to_string();
    match (kind, groups.len()) {
        (VariableKind::Range, 2) => {
            out = out.replace("{nnnn}", &groups[0]);
            out = out.replace("{xxxx}", &groups[1]);
        }
        (VariableKind::SingleConcept, 1) => {
            out = out.replace("{nnnn}", &groups[0]);
        }
        (VariableKind::SingleConcept, 2) => {
            out = out.replace("{nnnn}", &groups[0]);
            out = out.replace("{l}", &groups[1]);
        }
        (VariableKind::SingleConcept, 3) => {
            out = out.replace("{nnnn}", &groups[0]);
            out = out.replace("{mm}", &strip_leading_zeros(&groups[1]));
            out = out.replace("{l}", &strip_leading_zeros(&groups[2]));
        }
        (VariableKind::Terminal, 1) => {
            out = out.replace("{nnnn}", &groups[0]);
        }
        _ => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_formula_has_no_variables() {
        let parser = VariableParser::new();
        assert!(parser.parse("").is_empty());
        assert!(parser.forward_references("").is_empty());
    }

    #[test]
    fn self_reference_sentinel_is_excluded_and_uses_self_template() {
        let parser = VariableParser::new();
        let vars = parser.parse("%CALC0000% + %VAL1%");
        let calc = &vars[0];
        assert_eq!(calc.referenced_concept.as_deref(), Some("0000"));
        assert_eq!(calc.display_text, "Cálculo de este mismo concepto");
        assert!(!parser.forward_references("%CALC0000%").contains("0000"));
    }

    #[test]
    fn unknown_token_is_surfaced_as_terminal_not_rejected() {
        let parser = VariableParser::new();
        let vars = parser.parse("%FOO123%");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars[0].kind, VariableKind::Terminal);
        assert_eq!(vars[0].prefix, "FOO123");
        assert_eq!(vars[0].display_text, "FOO123");
        assert_eq!(vars[0].pattern_description.as_deref(), Some("unrecognized"));
    }

    #[test]
    fn spans_do_not_overlap_and_are_sorted() {
        let parser = VariableParser::new();
        let formula = "%CALC0100% + %SC00500100%";
        let vars = parser.parse(formula);
        assert_eq!(vars.len(), 2);
        assert!(vars[0].span_end <= vars[1].span_start);

        let total_span: usize = vars.iter().map(|v| v.span_end - v.span_start).sum();
        let total_marked_text: usize = vars.iter().map(|v| v.name.len() + 2).sum(); // + 2 `%` markers
        assert_eq!(total_span, total_marked_text);
    }

    #[test]
    fn forward_references_excludes_self_and_dedups() {
        let parser = VariableParser::new();
        let refs = parser.forward_references("%CALC0000% + %CALC0100% + %CALC0100%");
        assert_eq!(refs.len(), 1);
        assert!(refs.contains("0100"));
    }

    #[test]
    fn ranges_collects_bounds_in_order_of_appearance() {
        let parser = VariableParser::new();
        let ranges = parser.ranges("%SC00500100% + %ST00990199%");
        assert_eq!(
            ranges,
            vec![
                ("0050".to_string(), "0100".to_string()),
                ("0099".to_string(), "0199".to_string()),
            ]
        );
    }

    #[test]
    fn cc_token_renders_months_and_liquidation_type() {
        let parser = VariableParser::new();
        let vars = parser.parse("%CC01000500%");
        assert!(vars[0].display_text.contains("liq. 0 of 5 meses atrás"));
        assert_eq!(vars[0].referenced_concept, Some("0100".to_string()));
    }
}
