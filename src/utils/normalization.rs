//! Normalization Utilities
//!
//! Collapses near-duplicate name variants so that the classifier vocabulary,
//! the alias table and the historical production dataset can be compared
//! key-for-key.
//!
//! The production dataset carries trailing whitespace and mixed case in
//! almost every categorical column ("Kharif     ", "RICE", " Maharashtra").

/// Normalize a free-text name: trim surrounding whitespace and lowercase.
///
/// Inner whitespace runs are collapsed to a single space so that
/// "bengal  gram" and "Bengal Gram" produce the same key.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalize an optional request string, treating blank values as absent.
pub fn normalize_optional(raw: Option<&str>) -> Option<String> {
    raw.map(normalize_name).filter(|s| !s.is_empty())
}

/// True for placeholder values the dataset uses for missing cells
pub fn is_missing(normalized: &str) -> bool {
    normalized.is_empty() || normalized == "nan" || normalized == "null"
}

/// Title-case a normalized name for display ("andhra pradesh" -> "Andhra Pradesh")
///
/// Word boundaries are whitespace and the separators the dataset uses inside
/// names ('-', '/', '(', '&').
pub fn title_case(normalized: &str) -> String {
    let mut out = String::with_capacity(normalized.len());
    let mut at_word_start = true;

    for c in normalized.chars() {
        if c.is_alphanumeric() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = c.is_whitespace() || matches!(c, '-' | '/' | '(' | '&');
        }
    }

    out
}
