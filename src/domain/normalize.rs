//! Name normalization for cross-record matching.
//!
//! Entity names are stored with a scope suffix, e.g. `Raw Materials - AC`,
//! while member records may carry either form. Matching compares the
//! normalized names.

use std::sync::LazyLock;

use regex::Regex;

/// Trailing ` - XYZ` segment of one to four uppercase letters.
static GENERIC_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" - [A-Z]{1,4}$").expect("static suffix pattern"));

/// Strip the scope suffix from `name`.
///
/// Rules, checked against the trailing end of the name:
/// 1. the literal suffix ` - {abbreviation}`
/// 2. otherwise ` - ` followed by 1-4 uppercase letters
///
/// The result is trimmed. Stacked suffixes (`Tools - EU - AC`) are stripped
/// until no rule applies, so `normalize` is a fixed point:
/// `normalize(normalize(x, a), a) == normalize(x, a)`.
///
/// NOTE: rule 2 also eats legitimate trailing acronyms (`Spare Parts - OEM`).
pub fn normalize(name: &str, abbreviation: &str) -> String {
    let scope_suffix = (!abbreviation.is_empty()).then(|| format!(" - {abbreviation}"));
    let mut current = name.trim_end();

    loop {
        let stripped = match scope_suffix.as_deref() {
            Some(suffix) if current.ends_with(suffix) => &current[..current.len() - suffix.len()],
            _ => match GENERIC_SUFFIX.find(current) {
                Some(m) => &current[..m.start()],
                None => break,
            },
        };
        current = stripped.trim_end();
    }

    current.trim().to_string()
}

/// `normalize` for optional names; absent input yields an empty string.
pub fn normalize_opt(name: Option<&str>, abbreviation: &str) -> String {
    name.map(|n| normalize(n, abbreviation)).unwrap_or_default()
}

/// Normalizer bound to one scope abbreviation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationService {
    abbreviation: String,
}

impl NormalizationService {
    pub fn new(abbreviation: impl Into<String>) -> Self {
        Self {
            abbreviation: abbreviation.into(),
        }
    }

    pub fn abbreviation(&self) -> &str {
        &self.abbreviation
    }

    pub fn normalize(&self, name: &str) -> String {
        normalize(name, &self.abbreviation)
    }

    /// True if both names refer to the same entity once normalized.
    pub fn same_name(&self, a: &str, b: &str) -> bool {
        self.normalize(a) == self.normalize(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Raw Materials - AC", "AC", "Raw Materials")]
    #[case("Raw Materials", "AC", "Raw Materials")]
    #[case("Raw Materials - XYZ", "AC", "Raw Materials")]
    #[case("Raw Materials - Acme", "AC", "Raw Materials - Acme")]
    #[case("Raw Materials - ACMEX", "AC", "Raw Materials - ACMEX")]
    #[case("Raw Materials - ACMEX", "ACMEX", "Raw Materials")]
    #[case("Raw Materials-AC", "AC", "Raw Materials-AC")]
    #[case("  Padded - AC  ", "AC", "Padded")]
    #[case("Tools - EU - AC", "AC", "Tools")]
    #[case("", "AC", "")]
    #[case("   ", "AC", "")]
    #[case(" - AC", "AC", "")]
    fn test_normalize(#[case] input: &str, #[case] abbr: &str, #[case] expected: &str) {
        assert_eq!(normalize(input, abbr), expected);
    }

    #[rstest]
    #[case("Raw Materials - AC")]
    #[case("Tools - EU - AC")]
    #[case("Parts - OEM ")]
    #[case("x - A - B - C")]
    #[case(" -  - AC")]
    #[case("Lower - ac")]
    #[case("Ünïcode - ÄB")]
    fn test_normalize_is_idempotent(#[case] input: &str) {
        for abbr in ["AC", "", "ac", "OEM"] {
            let once = normalize(input, abbr);
            assert_eq!(normalize(&once, abbr), once, "input={input:?} abbr={abbr:?}");
        }
    }

    #[test]
    fn test_normalize_with_empty_abbreviation_uses_generic_rule() {
        assert_eq!(normalize("Products - AC", ""), "Products");
        assert_eq!(normalize("Products - ", ""), "Products -");
    }

    #[test]
    fn test_normalize_opt_absent_is_empty() {
        assert_eq!(normalize_opt(None, "AC"), "");
        assert_eq!(normalize_opt(Some("Tools - AC"), "AC"), "Tools");
    }

    #[test]
    fn test_service_same_name() {
        let svc = NormalizationService::new("AC");
        assert!(svc.same_name("Tools - AC", "Tools"));
        assert!(!svc.same_name("Tools - AC", "Toolbox"));
    }
}
