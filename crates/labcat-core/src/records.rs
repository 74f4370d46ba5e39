//! Record shapes produced by the loaders and consumed by the matcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Verification outcome assigned to each row of the authoritative sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Consistent,
    PartNumberNeedsCorrection,
    Inconsistent,
    NotFound,
}

impl VerificationStatus {
    pub const ALL: [VerificationStatus; 4] = [
        VerificationStatus::Consistent,
        VerificationStatus::PartNumberNeedsCorrection,
        VerificationStatus::Inconsistent,
        VerificationStatus::NotFound,
    ];

    /// Parses an English or localized status label.
    ///
    /// English labels are matched ignoring case, spaces, `_` and `-`, so
    /// `"Part Number Needs Correction"`, `"part_number_needs_correction"` and
    /// `"PartNumberNeedsCorrection"` are all accepted.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        match trimmed {
            "一致" => return Some(Self::Consistent),
            "零件号需更正" => return Some(Self::PartNumberNeedsCorrection),
            "不一致" => return Some(Self::Inconsistent),
            "未找到" => return Some(Self::NotFound),
            _ => {}
        }

        let folded: String = trimmed
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match folded.as_str() {
            "consistent" => Some(Self::Consistent),
            "partnumberneedscorrection" => Some(Self::PartNumberNeedsCorrection),
            "inconsistent" => Some(Self::Inconsistent),
            "notfound" => Some(Self::NotFound),
            _ => None,
        }
    }

    /// Whether a record with this status may overwrite or create a product.
    #[must_use]
    pub fn is_update_eligible(self) -> bool {
        matches!(self, Self::Consistent | Self::PartNumberNeedsCorrection)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Consistent => "consistent",
            Self::PartNumberNeedsCorrection => "part_number_needs_correction",
            Self::Inconsistent => "inconsistent",
            Self::NotFound => "not_found",
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `(brand, part number)` pair that correlates authoritative and current
/// records. Case-sensitive; both parts are non-empty after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompositeKey {
    pub brand: String,
    pub part_number: String,
}

/// Why a record could not produce a [`CompositeKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDefect {
    MissingBrand,
    MissingPartNumber,
}

impl std::fmt::Display for KeyDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyDefect::MissingBrand => f.write_str("missing brand"),
            KeyDefect::MissingPartNumber => f.write_str("missing part number"),
        }
    }
}

impl CompositeKey {
    #[must_use]
    pub fn new(brand: impl Into<String>, part_number: impl Into<String>) -> Self {
        Self {
            brand: brand.into(),
            part_number: part_number.into(),
        }
    }

    /// Builds a key from nullable parts.
    ///
    /// # Errors
    ///
    /// Returns the first missing component as a [`KeyDefect`].
    pub fn from_parts(brand: Option<&str>, part_number: Option<&str>) -> Result<Self, KeyDefect> {
        let brand = brand.ok_or(KeyDefect::MissingBrand)?;
        let part_number = part_number.ok_or(KeyDefect::MissingPartNumber)?;
        Ok(Self::new(brand, part_number))
    }
}

impl std::fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|||{}", self.brand, self.part_number)
    }
}

/// A row from the authoritative (hand-verified) sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoritativeRecord {
    /// 1-based line number in the source file, header included.
    pub row: usize,
    pub brand: Option<String>,
    pub part_number: Option<String>,
    /// Product name as published by the vendor.
    pub official_name: Option<String>,
    /// Product name used in the catalog before verification.
    pub internal_name: Option<String>,
    /// `None` when the status cell held text that is not a known label.
    pub status: Option<VerificationStatus>,
    /// Normalized status cell text, kept for reporting unknown labels.
    pub status_text: Option<String>,
}

impl AuthoritativeRecord {
    /// # Errors
    ///
    /// Returns a [`KeyDefect`] when brand or part number is null.
    pub fn key(&self) -> Result<CompositeKey, KeyDefect> {
        CompositeKey::from_parts(self.brand.as_deref(), self.part_number.as_deref())
    }

    /// The name a matched or new product should carry: the official name when
    /// present, otherwise the internal name.
    #[must_use]
    pub fn new_name(&self) -> Option<&str> {
        self.official_name
            .as_deref()
            .or(self.internal_name.as_deref())
    }
}

/// A row reflecting the persisted `products` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentRecord {
    pub id: i64,
    pub product_code: Option<String>,
    pub brand: Option<String>,
    pub part_number: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CurrentRecord {
    /// # Errors
    ///
    /// Returns a [`KeyDefect`] when brand or part number is null.
    pub fn key(&self) -> Result<CompositeKey, KeyDefect> {
        CompositeKey::from_parts(self.brand.as_deref(), self.part_number.as_deref())
    }
}
