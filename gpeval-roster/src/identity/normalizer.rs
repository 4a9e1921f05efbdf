//! Name canonicalization
//!
//! Presenter names come out of OCR with stray whitespace, inconsistent casing,
//! accents that are sometimes dropped and typographic punctuation. The canonical
//! form irons these out for comparison only; the raw string stays the display name.
//!
//! Case folding is `to_lowercase` plus a short table for letters that carry no
//! decomposable accent (`ß`, `ø`, `ł`, `đ`, `æ`, `œ`, `þ`, `ı`). Other scripts are
//! compared as lowercased.

use gpeval_common::{Error, Result};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Longest accepted raw name, in characters
pub const MAX_NAME_LENGTH: usize = 255;

/// Canonicalize a raw presenter name
///
/// Steps: trim, reject empty/over-long input, unify apostrophes and dashes, drop
/// zero-width characters, case-fold, strip diacritics, collapse whitespace runs.
/// Input that is left with nothing visible is rejected.
pub fn normalize(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidName(
            "name is empty or whitespace-only".to_string(),
        ));
    }

    let length = trimmed.chars().count();
    if length > MAX_NAME_LENGTH {
        return Err(Error::InvalidName(format!(
            "name is {} characters long (maximum {})",
            length, MAX_NAME_LENGTH
        )));
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{feff}'))
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '`' => '\'',
            '\u{2013}' | '\u{2014}' => '-',
            other => other,
        })
        .collect();

    let folded = strip_diacritics(&fold_letters(&cleaned.to_lowercase()));
    let canonical = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    if canonical.is_empty() {
        return Err(Error::InvalidName(
            "name contains no visible characters".to_string(),
        ));
    }

    Ok(canonical)
}

/// Letters with no canonical decomposition, spelled out in ASCII
fn fold_letters(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            'ß' => out.push_str("ss"),
            'æ' => out.push_str("ae"),
            'œ' => out.push_str("oe"),
            'þ' => out.push_str("th"),
            'ø' => out.push('o'),
            'ł' => out.push('l'),
            'đ' | 'ð' => out.push('d'),
            'ı' => out.push('i'),
            other => out.push(other),
        }
    }
    out
}

fn strip_diacritics(value: &str) -> String {
    value.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}
