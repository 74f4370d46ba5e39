//! Turns a match outcome into concrete mutations.
//!
//! Categories are always recomputed from the name a product will carry after
//! the run, never copied from either source.

use labcat_core::{
    product_code, product_prefix, CategoryLabel, Classifier, CurrentRecord, VerificationStatus,
};
use serde::Serialize;

use crate::matcher::MatchOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedUpdate {
    pub id: i64,
    pub brand: Option<String>,
    pub part_number: Option<String>,
    pub old_name: Option<String>,
    pub new_name: String,
    pub old_category: Option<String>,
    pub category: CategoryLabel,
    /// Verification status of the row that drove the update; `None` for
    /// reclassification.
    pub status: Option<VerificationStatus>,
    pub source_row: Option<usize>,
}

impl PlannedUpdate {
    /// Whether applying the update would leave the row as it is.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.old_name.as_deref() == Some(self.new_name.as_str())
            && self.old_category.as_deref() == Some(self.category.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedInsert {
    pub product_code: String,
    pub prefix: String,
    pub brand: String,
    pub part_number: String,
    pub name: String,
    pub category: CategoryLabel,
    pub status: VerificationStatus,
    pub source_row: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedDelete {
    pub id: i64,
    pub product_code: Option<String>,
    pub brand: Option<String>,
    pub part_number: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
}

impl From<&CurrentRecord> for PlannedDelete {
    fn from(record: &CurrentRecord) -> Self {
        Self {
            id: record.id,
            product_code: record.product_code.clone(),
            brand: record.brand.clone(),
            part_number: record.part_number.clone(),
            name: record.name.clone(),
            category: record.category.clone(),
        }
    }
}

/// Mutations in the order the emitter applies them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MutationPlan {
    pub updates: Vec<PlannedUpdate>,
    pub inserts: Vec<PlannedInsert>,
    pub deletes: Vec<PlannedDelete>,
}

impl MutationPlan {
    #[must_use]
    pub fn len(&self) -> usize {
        self.updates.len() + self.inserts.len() + self.deletes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Plans the update, insert and delete for every partitioned record.
#[must_use]
pub fn plan_mutations(outcome: &MatchOutcome<'_>, classifier: &Classifier) -> MutationPlan {
    let mut plan = MutationPlan::default();

    for pair in &outcome.to_update {
        let Some(new_name) = pair.authoritative.new_name() else {
            continue;
        };
        plan.updates.push(PlannedUpdate {
            id: pair.current.id,
            brand: pair.current.brand.clone(),
            part_number: pair.current.part_number.clone(),
            old_name: pair.current.name.clone(),
            new_name: new_name.to_string(),
            old_category: pair.current.category.clone(),
            category: classifier.classify(new_name),
            status: pair.authoritative.status,
            source_row: Some(pair.authoritative.row),
        });
    }

    for record in &outcome.to_insert {
        let (Ok(key), Some(name), Some(status)) = (record.key(), record.new_name(), record.status)
        else {
            continue;
        };
        plan.inserts.push(PlannedInsert {
            product_code: product_code(&key.brand, &key.part_number),
            prefix: product_prefix(&key.brand),
            name: name.to_string(),
            category: classifier.classify(name),
            status,
            source_row: record.row,
            brand: key.brand,
            part_number: key.part_number,
        });
    }

    plan.deletes = outcome
        .to_delete
        .iter()
        .map(|record| PlannedDelete::from(*record))
        .collect();

    tracing::info!(
        updates = plan.updates.len(),
        inserts = plan.inserts.len(),
        deletes = plan.deletes.len(),
        "planned mutations"
    );
    plan
}

/// Plans a category-only update for every current record whose stored
/// category disagrees with its name.
///
/// Records without a name have nothing to classify and are left alone.
#[must_use]
pub fn plan_reclassification(current: &[CurrentRecord], classifier: &Classifier) -> Vec<PlannedUpdate> {
    let updates: Vec<PlannedUpdate> = current
        .iter()
        .filter_map(|record| {
            let name = record.name.as_deref()?;
            let category = classifier.classify(name);
            if record.category.as_deref() == Some(category.as_str()) {
                return None;
            }
            Some(PlannedUpdate {
                id: record.id,
                brand: record.brand.clone(),
                part_number: record.part_number.clone(),
                old_name: record.name.clone(),
                new_name: name.to_string(),
                old_category: record.category.clone(),
                category,
                status: None,
                source_row: None,
            })
        })
        .collect();

    tracing::info!(
        scanned = current.len(),
        changes = updates.len(),
        "planned reclassification"
    );
    updates
}
