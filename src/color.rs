//! Deterministic code → color derivation, used to give concepts a stable
//! visual identity in the front-end without storing any color state.

use serde::Serialize;

/// A background/border HSL pair rendered as CSS `hsl(...)` strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptColors {
    pub background: String,
    pub border: String,
}

pub struct ColorDeriver;

impl ColorDeriver {
    /// Pure function of `code`; identical inputs always yield identical
    /// output, independent of platform (32-bit wraparound throughout, no
    /// `u64` widening).
    pub fn derive(code: &str) -> ConceptColors {
        let mixed = avalanche(rolling_hash(code));

        let hue = mixed % 360;
        let background_saturation = 65 + (mixed >> 8) % 20; // [65, 85)
        let background_lightness = 80 + (mixed >> 14) % 10; // [80, 90)
        let border_saturation = 50 + (mixed >> 20) % 20; // [50, 70)
        let border_lightness = 40 + (mixed >> 26) % 15; // [40, 55)

        ConceptColors {
            background: format!(
                "hsl({hue}, {background_saturation}%, {background_lightness}%)"
            ),
            border: format!("hsl({hue}, {border_saturation}%, {border_lightness}%)"),
        }
    }
}

/// Rolling multiplier-31 accumulator over the code's bytes, `u32` wrapping.
fn rolling_hash(code: &str) -> u32 {
    code.bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32))
}

/// Two xor-shifts, two multiplications by known odd constants — spreads the
/// rolling hash's low-entropy bits across the full 32 bits.
fn avalanche(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x85eb_ca6b);
    x ^= x >> 15;
    x = x.wrapping_mul(0xc2b2_ae35);
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_across_calls() {
        assert_eq!(ColorDeriver::derive("CALC0100"), ColorDeriver::derive("CALC0100"));
    }

    #[test]
    fn distinct_codes_usually_differ() {
        assert_ne!(ColorDeriver::derive("CALC0100"), ColorDeriver::derive("CALC0101"));
    }

    #[test]
    fn empty_code_does_not_panic() {
        let colors = ColorDeriver::derive("");
        assert!(colors.background.starts_with("hsl("));
    }

    #[test]
    fn hue_is_always_in_range() {
        for code in ["0000", "SC00500100", "ANTIGUEDAD", "ZZZZZZZZZZ"] {
            let mixed = avalanche(rolling_hash(code));
            assert!(mixed % 360 < 360);
        }
    }
}
