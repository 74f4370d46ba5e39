//! Cell-level normalization shared by every record source.
//!
//! CSV exports and database rows disagree on how "no value" is spelled, so
//! every text cell passes through here before it reaches a record.

/// Spellings of "no value" seen in spreadsheet and pandas exports. Compared
/// case-insensitively against the trimmed cell.
const NULL_SENTINELS: &[&str] = &["n/a", "na", "#n/a", "null", "none", "nan"];

/// Returns `true` if the trimmed value is empty or a null sentinel.
#[must_use]
pub fn is_null_sentinel(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || NULL_SENTINELS
            .iter()
            .any(|sentinel| trimmed.eq_ignore_ascii_case(sentinel))
}

/// Normalizes a free-text cell: whitespace runs collapse to a single space,
/// ends are trimmed, and null sentinels become `None`.
#[must_use]
pub fn normalize_text(raw: &str) -> Option<String> {
    if is_null_sentinel(raw) {
        return None;
    }
    Some(raw.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Normalizes an identifier cell (part number, product code): ends are
/// trimmed but interior characters are kept as-is.
#[must_use]
pub fn normalize_identifier(raw: &str) -> Option<String> {
    if is_null_sentinel(raw) {
        return None;
    }
    Some(raw.trim().to_string())
}

/// Applies [`normalize_text`] to an optional cell.
#[must_use]
pub fn normalize_text_opt(raw: Option<&str>) -> Option<String> {
    raw.and_then(normalize_text)
}

/// Applies [`normalize_identifier`] to an optional cell.
#[must_use]
pub fn normalize_identifier_opt(raw: Option<&str>) -> Option<String> {
    raw.and_then(normalize_identifier)
}

/// Catalog prefix derived from a brand: spaces, `-` and `.` removed, first
/// four characters, uppercased.
///
/// `"Thermo Fisher Scientific"` → `"THER"`, `"J.T. Baker"` → `"JTBA"`.
#[must_use]
pub fn product_prefix(brand: &str) -> String {
    brand
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.'))
        .take(4)
        .flat_map(char::to_uppercase)
        .collect()
}

/// Catalog product code for a new row: `PREFIX-part_number`.
#[must_use]
pub fn product_code(brand: &str, part_number: &str) -> String {
    format!("{}-{}", product_prefix(brand), part_number)
}
