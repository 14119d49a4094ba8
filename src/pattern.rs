//! Declarative table of `%TOKEN%` variable patterns
//!
//! Built once, behind a `once_cell::sync::Lazy`, and never mutated again.
//! Three ordered buckets — Range, SingleConcept, Terminal — are tried in
//! that order; within a bucket the first matching entry wins.

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableKind {
    Range,
    SingleConcept,
    Terminal,
}

/// One declared pattern: a prefix label, an anchored matcher, and the
/// display templates used to render a match.
pub struct PatternEntry {
    pub prefix: &'static str,
    pub kind: VariableKind,
    matcher: Regex,
    pub display_template: &'static str,
    pub self_template: Option<&'static str>,
}

/// The outcome of matching a token against one `PatternEntry`: which entry
/// matched and the regex capture groups (group 0 excluded).
pub struct TokenMatch<'a> {
    pub entry: &'a PatternEntry,
    pub groups: Vec<String>,
}

pub struct PatternRegistry {
    range: Vec<PatternEntry>,
    single_concept: Vec<PatternEntry>,
    terminal: Vec<PatternEntry>,
}

fn entry(
    prefix: &'static str,
    kind: VariableKind,
    pattern: &str,
    display_template: &'static str,
    self_template: Option<&'static str>,
) -> PatternEntry {
    PatternEntry {
        prefix,
        kind,
        matcher: Regex::new(pattern).expect("pattern registry regex must compile"),
        display_template,
        self_template,
    }
}

impl PatternRegistry {
    fn build() -> Self {
        let range = vec![
            entry(
                "SC",
                VariableKind::Range,
                r"^SC(\d{4})(\d{4})$",
                "Conceptos definitivos {nnnn}-{xxxx}",
                None,
            ),
            entry(
                "ST",
                VariableKind::Range,
                r"^ST(\d{4})(\d{4})$",
                "Conceptos transitorios {nnnn}-{xxxx}",
                None,
            ),
            entry(
                "SI",
                VariableKind::Range,
                r"^SI(\d{4})(\d{4})$",
                "Suma de conceptos {nnnn}-{xxxx}",
                None,
            ),
            entry(
                "S",
                VariableKind::Range,
                r"^S(\d{4})(\d{4})[A-Z]$",
                "Conceptos {nnnn}-{xxxx}",
                None,
            ),
            entry(
                "E",
                VariableKind::Range,
                r"^E(\d{4})(\d{4})\d$",
                "Conceptos excluidos {nnnn}-{xxxx}",
                None,
            ),
            entry(
                "MM",
                VariableKind::Range,
                r"^MM(\d{4})(\d{4})$",
                "Máximo entre {nnnn} y {xxxx}",
                None,
            ),
        ];

        let single_concept = vec![
            entry(
                "CALC",
                VariableKind::SingleConcept,
                r"^CALC(\d{4})$",
                "Cálculo del concepto {nnnn}",
                Some("Cálculo de este mismo concepto"),
            ),
            entry(
                "INFO",
                VariableKind::SingleConcept,
                r"^INFO(\d{4})$",
                "Informativo del concepto {nnnn}",
                None,
            ),
            entry(
                "REDO",
                VariableKind::SingleConcept,
                r"^REDO(\d{4})$",
                "Recálculo del concepto {nnnn}",
                None,
            ),
            entry(
                "VAL1",
                VariableKind::SingleConcept,
                r"^VAL1(\d{4})$",
                "Valor 1 del concepto {nnnn}",
                Some("Valor 1 de este mismo concepto"),
            ),
            entry(
                "VAL2",
                VariableKind::SingleConcept,
                r"^VAL2(\d{4})$",
                "Valor 2 del concepto {nnnn}",
                Some("Valor 2 de este mismo concepto"),
            ),
            entry(
                "VAL3",
                VariableKind::SingleConcept,
                r"^VAL3(\d{4})$",
                "Valor 3 del concepto {nnnn}",
                Some("Valor 3 de este mismo concepto"),
            ),
            entry(
                "FVA1",
                VariableKind::SingleConcept,
                r"^FVA1(\d{4})$",
                "Fórmula del valor 1 del concepto {nnnn}",
                None,
            ),
            entry(
                "FVA2",
                VariableKind::SingleConcept,
                r"^FVA2(\d{4})$",
                "Fórmula del valor 2 del concepto {nnnn}",
                None,
            ),
            entry(
                "FVA3",
                VariableKind::SingleConcept,
                r"^FVA3(\d{4})$",
                "Fórmula del valor 3 del concepto {nnnn}",
                None,
            ),
            entry(
                "BASI",
                VariableKind::SingleConcept,
                r"^BASI(\d{4})$",
                "Base imponible del concepto {nnnn}",
                None,
            ),
            entry(
                "ADIC",
                VariableKind::SingleConcept,
                r"^ADIC(\d{4})$",
                "Adicional del concepto {nnnn}",
                None,
            ),
            entry(
                "COMS",
                VariableKind::SingleConcept,
                r"^COMS(\d{4})$",
                "Comisión del concepto {nnnn}",
                None,
            ),
            entry(
                "PCON",
                VariableKind::SingleConcept,
                r"^PCON(\d{4})$",
                "Porcentaje del concepto {nnnn}",
                None,
            ),
            entry(
                "PCOM",
                VariableKind::SingleConcept,
                r"^PCOM(\d{4})$",
                "Porcentaje de comisión del concepto {nnnn}",
                None,
            ),
            entry(
                "CGAN",
                VariableKind::SingleConcept,
                r"^CGAN(\d{4})$",
                "Concepto ganancial {nnnn}",
                None,
            ),
            entry(
                "PROVAC",
                VariableKind::SingleConcept,
                r"^PROVAC(\d{4})$",
                "Provisión de vacaciones del concepto {nnnn}",
                None,
            ),
            entry(
                "CALU",
                VariableKind::SingleConcept,
                r"^CALU(\d{4})([A-Z])$",
                "Cálculo del concepto {nnnn}, liq. {l}",
                None,
            ),
            entry(
                "CALX",
                VariableKind::SingleConcept,
                r"^CALX(\d{4})([A-Z])$",
                "Cálculo extendido del concepto {nnnn}, liq. {l}",
                None,
            ),
            entry(
                "CSEM",
                VariableKind::SingleConcept,
                r"^CSEM(\d{4})$",
                "Cálculo semanal del concepto {nnnn}",
                None,
            ),
            entry(
                "CSEP",
                VariableKind::SingleConcept,
                r"^CSEP(\d{4})$",
                "Cálculo semanal proporcional del concepto {nnnn}",
                None,
            ),
            entry(
                "MSEM",
                VariableKind::SingleConcept,
                r"^MSEM(\d{4})$",
                "Monto semanal del concepto {nnnn}",
                None,
            ),
            entry(
                "CC",
                VariableKind::SingleConcept,
                r"^CC(\d{4})(\d{2})(\d{2})$",
                "Concepto {nnnn} liq. {l} of {mm} meses atrás",
                None,
            ),
            entry(
                "CI",
                VariableKind::SingleConcept,
                r"^CI(\d{4})(\d{2})(\d{2})$",
                "Concepto informativo {nnnn} liq. {l} of {mm} meses atrás",
                None,
            ),
            entry(
                "AC",
                VariableKind::SingleConcept,
                r"^AC(\d{4})$",
                "Acumulado del concepto {nnnn}",
                None,
            ),
            entry(
                "AI",
                VariableKind::SingleConcept,
                r"^AI(\d{4})$",
                "Acumulado informativo del concepto {nnnn}",
                None,
            ),
            entry(
                "0",
                VariableKind::SingleConcept,
                r"^0(\d{4})$",
                "Concepto {nnnn}",
                Some("Este mismo concepto"),
            ),
            entry(
                "L",
                VariableKind::SingleConcept,
                r"^L(\d{4})$",
                "Concepto {nnnn} del legajo",
                None,
            ),
            entry(
                "A",
                VariableKind::SingleConcept,
                r"^A(\d{4})$",
                "Concepto anual {nnnn}",
                None,
            ),
            entry(
                "B",
                VariableKind::SingleConcept,
                r"^B(\d{4})$",
                "Concepto base {nnnn}",
                None,
            ),
        ];

        let terminal = vec![
            literal_terminal("ANTIGUEDAD", "Antigüedad del empleado"),
            literal_terminal("CATEGORIA", "Categoría del empleado"),
            literal_terminal("SEXO", "Sexo del empleado"),
            literal_terminal("ESTADOCIVIL", "Estado civil del empleado"),
            literal_terminal("FECHAING", "Fecha de ingreso"),
            literal_terminal("FECHANAC", "Fecha de nacimiento"),
            literal_terminal("DIASTRAB", "Días trabajados"),
            literal_terminal("HORASTRAB", "Horas trabajadas"),
            literal_terminal("SUELDO", "Sueldo básico"),
            literal_terminal("BASICO", "Básico del convenio"),
            literal_terminal("PRESENTISMO", "Premio por presentismo"),
            literal_terminal("ZONA", "Zona desfavorable"),
            literal_terminal("ADICIONAL", "Adicional de convenio"),
            literal_terminal("CONVENIO", "Convenio colectivo aplicable"),
            entry(
                "ANOTRA",
                VariableKind::Terminal,
                r"^ANOTRA(\d{3})$",
                "Año de antigüedad tramo {nnnn}",
                None,
            ),
            entry(
                "FAMI",
                VariableKind::Terminal,
                r"^FAMI(\d{3})$",
                "Carga de familia {nnnn}",
                None,
            ),
            entry(
                "GCIA",
                VariableKind::Terminal,
                r"^GCIA(\d{4})$",
                "Tramo de ganancias {nnnn}",
                None,
            ),
            entry(
                "Z",
                VariableKind::Terminal,
                r"^Z[A-Z]{2}\d{8}$",
                "Total de rango de conceptos",
                None,
            ),
        ];

        Self {
            range,
            single_concept,
            terminal,
        }
    }

    /// Match a bare token (the text between the `%` markers) against the
    /// registry, trying Range, then SingleConcept, then Terminal.
    pub fn classify<'a>(&'a self, token: &str) -> Option<TokenMatch<'a>> {
        for bucket in [&self.range, &self.single_concept, &self.terminal] {
            for entry in bucket {
                if let Some(captures) = entry.matcher.captures(token) {
                    let groups = captures
                        .iter()
                        .skip(1)
                        .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                        .collect();
                    return Some(TokenMatch { entry, groups });
                }
            }
        }
        None
    }
}

fn literal_terminal(token: &'static str, description: &'static str) -> PatternEntry {
    PatternEntry {
        prefix: token,
        kind: VariableKind::Terminal,
        matcher: Regex::new(&format!("^{token}$")).expect("literal terminal regex must compile"),
        display_template: description,
        self_template: None,
    }
}

pub static PATTERN_REGISTRY: Lazy<PatternRegistry> = Lazy::new(PatternRegistry::build);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_bucket_wins_over_single_concept_for_sc() {
        let m = PATTERN_REGISTRY.classify("SC00500100").unwrap();
        assert_eq!(m.entry.kind, VariableKind::Range);
        assert_eq!(m.groups, vec!["0050".to_string(), "0100".to_string()]);
    }

    #[test]
    fn single_concept_calc() {
        let m = PATTERN_REGISTRY.classify("CALC0100").unwrap();
        assert_eq!(m.entry.kind, VariableKind::SingleConcept);
        assert_eq!(m.groups, vec!["0100".to_string()]);
    }

    #[test]
    fn terminal_literal_allow_list() {
        let m = PATTERN_REGISTRY.classify("ANTIGUEDAD").unwrap();
        assert_eq!(m.entry.kind, VariableKind::Terminal);
    }

    #[test]
    fn terminal_parameterised_pattern() {
        let m = PATTERN_REGISTRY.classify("GCIA0001").unwrap();
        assert_eq!(m.entry.kind, VariableKind::Terminal);
    }

    #[test]
    fn unknown_token_has_no_entry() {
        assert!(PATTERN_REGISTRY.classify("FOO123").is_none());
    }

    #[test]
    fn cc_captures_concept_months_and_liquidation_type() {
        let m = PATTERN_REGISTRY.classify("CC01000500").unwrap();
        assert_eq!(
            m.groups,
            vec!["0100".to_string(), "05".to_string(), "00".to_string()]
        );
    }
}
