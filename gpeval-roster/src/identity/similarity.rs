//! Similarity scoring between canonical names
//!
//! Character containment: every character of the shorter name that occurs
//! anywhere in the longer name counts as a hit, and hits are divided by the longer
//! name's length. This is the same estimate the upload screen shows as "n% similar",
//! so a match decision and the confidence a floor manager sees never disagree.

use std::cmp::Ordering;
use std::collections::HashSet;

/// Score reserved for canonical equality
pub const EXACT_MATCH: u8 = 100;

/// Symmetric similarity in 0..=100 between two canonical names
///
/// Only identical strings score 100; anything else is capped at 99 so that an
/// anagram can never pass for an exact match.
pub fn score(a: &str, b: &str) -> u8 {
    if a == b {
        return EXACT_MATCH;
    }

    let a_len = a.chars().count();
    let b_len = b.chars().count();
    if a_len == 0 || b_len == 0 {
        return 0;
    }

    // Role assignment depends only on the inputs, never on argument order
    let (shorter, longer, longer_len) = match a_len.cmp(&b_len).then_with(|| a.cmp(b)) {
        Ordering::Greater => (b, a, a_len),
        _ => (a, b, b_len),
    };

    let pool: HashSet<char> = longer.chars().collect();
    let hits = shorter.chars().filter(|c| pool.contains(c)).count();

    let percent = (hits * 100 + longer_len / 2) / longer_len;
    percent.min(usize::from(EXACT_MATCH - 1)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_names_score_100() {
        assert_eq!(score("kirke kirs", "kirke kirs"), 100);
        assert_eq!(score("", ""), 100);
    }

    #[test]
    fn test_one_extra_character() {
        // 10 of 10 characters found, divided by 11
        assert_eq!(score("kirke kirss", "kirke kirs"), 91);
    }

    #[test]
    fn test_unrelated_names_score_low() {
        let s = score("completely different name", "kirke kirs");
        assert!(s < 82, "score was {}", s);
    }

    #[test]
    fn test_symmetric() {
        let pairs = [
            ("sofja barchan", "sofia barchan"),
            ("kristina bobrovskaja", "christina bobrovskaja"),
            ("abc", "abd"),
            ("anna", "hanna maria"),
        ];
        for (a, b) in pairs {
            assert_eq!(score(a, b), score(b, a), "asymmetric for {:?}/{:?}", a, b);
        }
    }

    #[test]
    fn test_anagram_is_not_exact() {
        assert_eq!(score("abc", "cba"), 99);
    }

    #[test]
    fn test_empty_against_non_empty() {
        assert_eq!(score("", "kirke"), 0);
        assert_eq!(score("kirke", ""), 0);
    }

    #[test]
    fn test_threshold_boundary() {
        // 9 of 9 found in an 11 character name: 81.8 rounds to 82
        assert_eq!(score("abcdefghi", "abcdefghijk"), 82);
        // 8 of 8 in 10: exactly 80
        assert_eq!(score("abcdefgh", "abcdefghij"), 80);
    }
}
