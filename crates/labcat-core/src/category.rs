//! Keyword classification of product names into catalog categories.
//!
//! Rules are evaluated top to bottom and the first hit wins, so more specific
//! rules ("guard" + "column", "syringe filter") sit above the generic ones
//! they would otherwise fall through to.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Closed set of catalog categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CategoryLabel {
    HplcColumns,
    GcColumns,
    GuardColumns,
    SyringeFilters,
    Vials,
    Septa,
    Caps,
    Inserts,
    Syringes,
    SamplePreparation,
    Standards,
    Accessories,
    Other,
}

impl CategoryLabel {
    pub const ALL: [CategoryLabel; 13] = [
        CategoryLabel::HplcColumns,
        CategoryLabel::GcColumns,
        CategoryLabel::GuardColumns,
        CategoryLabel::SyringeFilters,
        CategoryLabel::Vials,
        CategoryLabel::Septa,
        CategoryLabel::Caps,
        CategoryLabel::Inserts,
        CategoryLabel::Syringes,
        CategoryLabel::SamplePreparation,
        CategoryLabel::Standards,
        CategoryLabel::Accessories,
        CategoryLabel::Other,
    ];

    /// Display name, also the value stored in `products.category`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryLabel::HplcColumns => "HPLC Columns",
            CategoryLabel::GcColumns => "GC Columns",
            CategoryLabel::GuardColumns => "Guard Columns",
            CategoryLabel::SyringeFilters => "Syringe Filters",
            CategoryLabel::Vials => "Vials",
            CategoryLabel::Septa => "Septa",
            CategoryLabel::Caps => "Caps",
            CategoryLabel::Inserts => "Inserts",
            CategoryLabel::Syringes => "Syringes",
            CategoryLabel::SamplePreparation => "Sample Preparation",
            CategoryLabel::Standards => "Standards",
            CategoryLabel::Accessories => "Accessories",
            CategoryLabel::Other => "Other",
        }
    }
}

impl std::fmt::Display for CategoryLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        CategoryLabel::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown category '{trimmed}'"))
    }
}

impl Serialize for CategoryLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CategoryLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One row of the rule table. Every clause must contain at least one keyword
/// found in the lowercased name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub clauses: &'static [&'static [&'static str]],
    pub label: CategoryLabel,
}

impl Rule {
    fn matches(&self, lowered: &str) -> bool {
        self.clauses
            .iter()
            .all(|any_of| any_of.iter().any(|keyword| lowered.contains(keyword)))
    }
}

const STANDARD_RULES: [Rule; 12] = [
    Rule {
        clauses: &[&["column", "hplc", "gc"], &["guard"]],
        label: CategoryLabel::GuardColumns,
    },
    Rule {
        clauses: &[&["gc"]],
        label: CategoryLabel::GcColumns,
    },
    Rule {
        clauses: &[&["column", "hplc"]],
        label: CategoryLabel::HplcColumns,
    },
    Rule {
        clauses: &[&["syringe filter", "filter"]],
        label: CategoryLabel::SyringeFilters,
    },
    Rule {
        clauses: &[&["vial"]],
        label: CategoryLabel::Vials,
    },
    Rule {
        clauses: &[&["septa", "septum"]],
        label: CategoryLabel::Septa,
    },
    Rule {
        clauses: &[&["cap", "closure", "crimp"]],
        label: CategoryLabel::Caps,
    },
    Rule {
        clauses: &[&["insert"]],
        label: CategoryLabel::Inserts,
    },
    Rule {
        clauses: &[&["syringe"]],
        label: CategoryLabel::Syringes,
    },
    Rule {
        clauses: &[&["spe", "extraction", "cartridge"]],
        label: CategoryLabel::SamplePreparation,
    },
    Rule {
        clauses: &[&["standard", "reference"]],
        label: CategoryLabel::Standards,
    },
    Rule {
        clauses: &[&["guard", "holder", "fitting", "tubing", "nut"]],
        label: CategoryLabel::Accessories,
    },
];

const SYRINGE_FILTER_ONLY: Rule = Rule {
    clauses: &[&["syringe filter"]],
    label: CategoryLabel::SyringeFilters,
};

/// How the "Syringe Filters" rule treats a bare "filter".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterRule {
    /// Any name containing "filter" is a syringe filter.
    #[default]
    Permissive,
    /// Only names containing "syringe filter" are.
    SyringeFilterOnly,
}

impl FromStr for FilterRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(FilterRule::Permissive),
            "syringe-filter-only" | "syringe_filter_only" | "strict" => {
                Ok(FilterRule::SyringeFilterOnly)
            }
            other => Err(format!(
                "unknown filter rule '{other}'; expected 'permissive' or 'syringe-filter-only'"
            )),
        }
    }
}

impl std::fmt::Display for FilterRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterRule::Permissive => f.write_str("permissive"),
            FilterRule::SyringeFilterOnly => f.write_str("syringe-filter-only"),
        }
    }
}

/// An ordered rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::standard()
    }
}

impl Classifier {
    /// The standard catalog rule table.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            rules: STANDARD_RULES.to_vec(),
        }
    }

    /// The standard table with the chosen "Syringe Filters" variant.
    #[must_use]
    pub fn with_filter_rule(filter_rule: FilterRule) -> Self {
        let mut classifier = Self::standard();
        if filter_rule == FilterRule::SyringeFilterOnly {
            for rule in &mut classifier.rules {
                if rule.label == CategoryLabel::SyringeFilters {
                    *rule = SYRINGE_FILTER_ONLY;
                }
            }
        }
        classifier
    }

    /// A classifier over an arbitrary rule table. Names matching no rule are
    /// [`CategoryLabel::Other`].
    #[must_use]
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn classify(&self, name: &str) -> CategoryLabel {
        first_match(&self.rules, name)
    }
}

/// Classifies a name with the standard rule table.
#[must_use]
pub fn classify(name: &str) -> CategoryLabel {
    first_match(&STANDARD_RULES, name)
}

fn first_match(rules: &[Rule], name: &str) -> CategoryLabel {
    let lowered = name.to_lowercase();
    rules
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map_or(CategoryLabel::Other, |rule| rule.label)
}

#[cfg(test)]
#[path = "category_test.rs"]
mod tests;
