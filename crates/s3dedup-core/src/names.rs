use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::model::file_name;

const MOJIBAKE_PENALTY: u32 = 10;
const COPY_SUFFIX_PENALTY: u32 = 5;
const EDGE_WHITESPACE_PENALTY: u32 = 2;
const INTERIOR_SPACES_PENALTY: u32 = 1;

lazy_static! {
    /// Copy markers left by file managers and sync tools, matched at the end
    /// of the stem (before the extension).
    static ref COPY_SUFFIXES: Vec<Regex> = [
        r"\s*\(\d+\)$",
        r"(?i)\s*-\s*copie$",
        r"(?i)\s*-\s*copy$",
        r"(?i)[_ ]copy$",
        r"_\d+$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("copy suffix pattern should compile"))
    .collect();

    /// UTF-8 text decoded as latin-1 and re-encoded, e.g. "Ã©" for "é".
    static ref MOJIBAKE: Regex =
        Regex::new(r"Ã[\x{80}-\x{BF}]|Â[\x{A0}-\x{BF}]").expect("mojibake pattern should compile");

    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").expect("whitespace pattern should compile");

    static ref INTERIOR_SPACES: Regex = Regex::new(r" {2,}").expect("spaces pattern should compile");
}

/// Lowercase, strip diacritics, collapse whitespace runs and trim.
///
/// This is the text step shared by name normalization and media keys.
pub fn canonicalize_text(text: &str) -> String {
    collapse_whitespace(&fold(text))
}

/// Canonical form of the final path segment of `key`, used to detect names
/// that differ only cosmetically.
///
/// `normalize_name(normalize_name(x)) == normalize_name(x)` for every input.
pub fn normalize_name(key: &str) -> String {
    // Stripping a suffix can expose another one or move the extension
    // boundary, so repeat until the name stops shrinking.
    let mut current = normalize_once(key);
    loop {
        let next = normalize_once(&current);
        if next.len() >= current.len() {
            return current;
        }
        current = next;
    }
}

fn normalize_once(key: &str) -> String {
    // Folding can produce '.' or '/' from compatibility forms, so split after it.
    let folded = fold(file_name(key));
    let (stem, ext) = split_ext(file_name(&folded));

    let mut stem = collapse_whitespace(stem);
    loop {
        let stripped = collapse_whitespace(&strip_copy_suffixes(&stem));
        if stripped == stem {
            break;
        }
        stem = stripped;
    }

    let ext = WHITESPACE_RUN.replace_all(ext, " ");
    format!("{}{}", stem, ext.trim_end())
}

/// Cleanliness penalty of the final path segment of `key` (0 is clean).
/// Penalties are independent and add up.
pub fn quality_score(key: &str) -> u32 {
    let name = file_name(key);
    let (stem, _) = split_ext(name);
    let mut score = 0;

    if MOJIBAKE.is_match(name) {
        score += MOJIBAKE_PENALTY;
    }
    if has_copy_suffix(stem.trim()) {
        score += COPY_SUFFIX_PENALTY;
    }
    if name != name.trim() || stem != stem.trim() {
        score += EDGE_WHITESPACE_PENALTY;
    }
    if INTERIOR_SPACES.is_match(name.trim()) {
        score += INTERIOR_SPACES_PENALTY;
    }

    score
}

pub fn has_copy_suffix(stem: &str) -> bool {
    COPY_SUFFIXES.iter().any(|p| p.is_match(stem))
}

/// Split a file name into stem and extension. Leading dots belong to the
/// stem, so `.bashrc` has no extension.
pub fn split_ext(name: &str) -> (&str, &str) {
    let leading_dots = name.len() - name.trim_start_matches('.').len();
    match name[leading_dots..].rfind('.') {
        Some(pos) => name.split_at(leading_dots + pos),
        None => (name, ""),
    }
}

fn strip_copy_suffixes(stem: &str) -> String {
    COPY_SUFFIXES
        .iter()
        .fold(stem.to_string(), |acc, p| p.replace(&acc, "").into_owned())
}

fn fold(text: &str) -> String {
    text.to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}
