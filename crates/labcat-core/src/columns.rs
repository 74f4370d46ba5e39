//! Header aliases for the CSV sources.
//!
//! Verification sheets arrive with English or localized headers depending on
//! who exported them. Each canonical field lists the headers it accepts; a
//! YAML file can replace any of the lists.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

fn aliases(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

/// Headers accepted for the authoritative sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthoritativeColumns {
    pub brand: Vec<String>,
    pub part_number: Vec<String>,
    pub official_name: Vec<String>,
    pub internal_name: Vec<String>,
    pub status: Vec<String>,
}

impl Default for AuthoritativeColumns {
    fn default() -> Self {
        Self {
            brand: aliases(&["brand", "品牌"]),
            part_number: aliases(&["part_number", "partNumber", "part number", "原品牌零件号"]),
            official_name: aliases(&["official_name", "official name", "name", "官网产品名称"]),
            internal_name: aliases(&[
                "internal_name",
                "internal name",
                "rowell_name",
                "ROWELL产品名称",
            ]),
            status: aliases(&["status", "verification_status", "验证状态"]),
        }
    }
}

/// Headers accepted for an offline snapshot of the products table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentColumns {
    pub id: Vec<String>,
    pub product_code: Vec<String>,
    pub brand: Vec<String>,
    pub part_number: Vec<String>,
    pub name: Vec<String>,
    pub category: Vec<String>,
    pub created_at: Vec<String>,
    pub updated_at: Vec<String>,
}

impl Default for CurrentColumns {
    fn default() -> Self {
        Self {
            id: aliases(&["id"]),
            product_code: aliases(&["product_code", "productId"]),
            brand: aliases(&["brand"]),
            part_number: aliases(&["part_number", "partNumber"]),
            name: aliases(&["name"]),
            category: aliases(&["category", "productType"]),
            created_at: aliases(&["created_at", "createdAt"]),
            updated_at: aliases(&["updated_at", "updatedAt"]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub authoritative: AuthoritativeColumns,
    pub current: CurrentColumns,
}

impl AuthoritativeColumns {
    fn fields(&self) -> [(&'static str, &[String]); 5] {
        [
            ("brand", self.brand.as_slice()),
            ("part_number", self.part_number.as_slice()),
            ("official_name", self.official_name.as_slice()),
            ("internal_name", self.internal_name.as_slice()),
            ("status", self.status.as_slice()),
        ]
    }
}

impl CurrentColumns {
    fn fields(&self) -> [(&'static str, &[String]); 8] {
        [
            ("id", self.id.as_slice()),
            ("product_code", self.product_code.as_slice()),
            ("brand", self.brand.as_slice()),
            ("part_number", self.part_number.as_slice()),
            ("name", self.name.as_slice()),
            ("category", self.category.as_slice()),
            ("created_at", self.created_at.as_slice()),
            ("updated_at", self.updated_at.as_slice()),
        ]
    }
}

fn fold_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
}

/// Returns the index of the first header matching any alias.
///
/// Comparison ignores case, surrounding whitespace and a leading UTF-8 byte
/// order mark.
#[must_use]
pub fn find_column(headers: &[String], aliases: &[String]) -> Option<usize> {
    let wanted: Vec<String> = aliases.iter().map(|a| fold_header(a)).collect();
    headers
        .iter()
        .position(|header| wanted.contains(&fold_header(header)))
}

/// Load and validate a column map from a YAML file.
///
/// Sections or fields omitted from the file keep their built-in aliases.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_column_map(path: &Path) -> Result<ColumnMap, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ColumnsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let map: ColumnMap = serde_yaml::from_str(&content)?;

    validate_column_map(&map)?;

    Ok(map)
}

/// Resolve the column map for a run: the YAML override when configured,
/// otherwise the built-in aliases.
///
/// # Errors
///
/// Returns `ConfigError` if a configured file cannot be loaded.
pub fn column_map_for(columns_path: Option<&Path>) -> Result<ColumnMap, ConfigError> {
    match columns_path {
        Some(path) => load_column_map(path),
        None => Ok(ColumnMap::default()),
    }
}

fn validate_column_map(map: &ColumnMap) -> Result<(), ConfigError> {
    validate_section("authoritative", &map.authoritative.fields())?;
    validate_section("current", &map.current.fields())?;
    Ok(())
}

fn validate_section(section: &str, fields: &[(&'static str, &[String])]) -> Result<(), ConfigError> {
    let mut claimed: HashMap<String, &'static str> = HashMap::new();

    for (field, headers) in fields {
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "{section}.{field} must list at least one header"
            )));
        }

        for header in *headers {
            let folded = fold_header(header);
            if folded.is_empty() {
                continue;
            }
            if let Some(other) = claimed.insert(folded, *field) {
                if other != *field {
                    return Err(ConfigError::Validation(format!(
                        "{section}: header '{}' is claimed by both '{other}' and '{field}'",
                        header.trim()
                    )));
                }
            }
        }
    }

    Ok(())
}
