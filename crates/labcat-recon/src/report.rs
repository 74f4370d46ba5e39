use std::collections::{BTreeMap, HashSet};
use std::fmt;

use labcat_core::AuthoritativeRecord;
use serde::Serialize;

use crate::emitter::EmitReport;
use crate::matcher::MatchOutcome;
use crate::plan::MutationPlan;

/// End-of-run summary, printed as a table or serialized as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub authoritative_total: usize,
    /// Rows per verification status; unparseable statuses count as `unknown`.
    pub status_counts: BTreeMap<String, usize>,
    pub current_total: usize,
    pub to_update: usize,
    pub to_insert: usize,
    pub to_delete: usize,
    pub unchanged: usize,
    pub retained: usize,
    pub skipped: usize,
    pub duplicate_keys: usize,
    pub status_conflicts: usize,
    /// Product count once the plan is fully applied. Inserts sharing a key
    /// count once, since the store accepts only the first.
    pub projected_total: usize,
    /// Product count read back after an applied run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_total: Option<usize>,
    pub updates_by_brand: BTreeMap<String, usize>,
    pub inserts_by_category: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emit: Option<EmitReport>,
}

impl RunSummary {
    #[must_use]
    pub fn new(
        authoritative: &[AuthoritativeRecord],
        current_total: usize,
        outcome: &MatchOutcome<'_>,
        plan: &MutationPlan,
    ) -> Self {
        let mut status_counts = BTreeMap::new();
        for record in authoritative {
            let label = record.status.map_or("unknown", |s| s.as_str());
            *status_counts.entry(label.to_string()).or_default() += 1;
        }

        let mut updates_by_brand = BTreeMap::new();
        for update in &plan.updates {
            let brand = update.brand.clone().unwrap_or_default();
            *updates_by_brand.entry(brand).or_default() += 1;
        }

        let mut inserts_by_category = BTreeMap::new();
        for insert in &plan.inserts {
            *inserts_by_category
                .entry(insert.category.to_string())
                .or_default() += 1;
        }

        let distinct_inserts = plan
            .inserts
            .iter()
            .map(|insert| (insert.brand.as_str(), insert.part_number.as_str()))
            .collect::<HashSet<_>>()
            .len();

        Self {
            authoritative_total: authoritative.len(),
            status_counts,
            current_total,
            to_update: outcome.to_update.len(),
            to_insert: outcome.to_insert.len(),
            to_delete: outcome.to_delete.len(),
            unchanged: outcome.unchanged.len(),
            retained: outcome.retained.len(),
            skipped: outcome.skipped.len(),
            duplicate_keys: outcome.duplicate_keys.len(),
            status_conflicts: outcome.status_conflicts.len(),
            projected_total: (current_total + distinct_inserts).saturating_sub(plan.deletes.len()),
            catalog_total: None,
            updates_by_brand,
            inserts_by_category,
            emit: None,
        }
    }

    #[must_use]
    pub fn with_emit(mut self, report: EmitReport) -> Self {
        self.emit = Some(report);
        self
    }

    #[must_use]
    pub fn with_catalog_total(mut self, total: usize) -> Self {
        self.catalog_total = Some(total);
        self
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "authoritative rows   {:>8}", self.authoritative_total)?;
        for (status, count) in &self.status_counts {
            writeln!(f, "  {status:<19}{count:>8}")?;
        }
        writeln!(f, "current products     {:>8}", self.current_total)?;
        writeln!(f, "to update            {:>8}", self.to_update)?;
        writeln!(f, "to insert            {:>8}", self.to_insert)?;
        writeln!(f, "to delete            {:>8}", self.to_delete)?;
        writeln!(f, "unchanged            {:>8}", self.unchanged)?;
        writeln!(f, "inconsistent (kept)  {:>8}", self.retained)?;
        writeln!(f, "skipped              {:>8}", self.skipped)?;
        writeln!(f, "duplicate keys       {:>8}", self.duplicate_keys)?;
        writeln!(f, "status conflicts     {:>8}", self.status_conflicts)?;
        writeln!(f, "projected total      {:>8}", self.projected_total)?;
        if let Some(total) = self.catalog_total {
            writeln!(f, "catalog total        {total:>8}")?;
        }

        if !self.updates_by_brand.is_empty() {
            writeln!(f, "updates by brand")?;
            for (brand, count) in &self.updates_by_brand {
                writeln!(f, "  {brand:<19}{count:>8}")?;
            }
        }
        if !self.inserts_by_category.is_empty() {
            writeln!(f, "inserts by category")?;
            for (category, count) in &self.inserts_by_category {
                writeln!(f, "  {category:<19}{count:>8}")?;
            }
        }

        if let Some(emit) = &self.emit {
            writeln!(
                f,
                "emitted: {} attempted, {} succeeded, {} failed, {} skipped",
                emit.totals.attempted, emit.totals.succeeded, emit.totals.failed, emit.totals.skipped
            )?;
            for failure in &emit.failures {
                writeln!(f, "  {failure}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use labcat_core::{Classifier, CurrentRecord, VerificationStatus};

    use super::*;
    use crate::matcher::match_records;
    use crate::plan::plan_mutations;

    fn auth(part: &str, status: Option<VerificationStatus>) -> AuthoritativeRecord {
        AuthoritativeRecord {
            row: 2,
            brand: Some("Restek".to_string()),
            part_number: Some(part.to_string()),
            official_name: Some("Rtx-5 GC Column".to_string()),
            internal_name: None,
            status,
            status_text: None,
        }
    }

    fn cur(id: i64, part: &str) -> CurrentRecord {
        CurrentRecord {
            id,
            product_code: None,
            brand: Some("Restek".to_string()),
            part_number: Some(part.to_string()),
            name: Some("old".to_string()),
            category: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn projection_subtracts_deletes_and_adds_inserts() {
        let authoritative = vec![
            auth("1", Some(VerificationStatus::Consistent)),
            auth("2", Some(VerificationStatus::Consistent)),
            auth("3", Some(VerificationStatus::NotFound)),
            auth("4", None),
        ];
        let current = vec![cur(1, "1"), cur(3, "3"), cur(9, "9")];
        let outcome = match_records(&authoritative, &current);
        let plan = plan_mutations(&outcome, &Classifier::standard());

        let summary = RunSummary::new(&authoritative, current.len(), &outcome, &plan);

        assert_eq!(summary.projected_total, 3);
        assert_eq!(summary.status_counts.get("consistent"), Some(&2));
        assert_eq!(summary.status_counts.get("unknown"), Some(&1));
        assert_eq!(summary.updates_by_brand.get("Restek"), Some(&1));
        assert_eq!(summary.inserts_by_category.get("GC Columns"), Some(&1));
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn projection_counts_repeated_insert_keys_once() {
        let authoritative = vec![
            auth("7", Some(VerificationStatus::Consistent)),
            auth("7", Some(VerificationStatus::PartNumberNeedsCorrection)),
        ];
        let current = vec![cur(1, "1")];
        let outcome = match_records(&authoritative, &current);
        let plan = plan_mutations(&outcome, &Classifier::standard());
        assert_eq!(plan.inserts.len(), 2);

        let summary = RunSummary::new(&authoritative, current.len(), &outcome, &plan);
        assert_eq!(summary.to_insert, 2);
        assert_eq!(summary.projected_total, 2);
    }

    #[test]
    fn renders_as_table_and_json() {
        let summary = RunSummary {
            current_total: 5,
            projected_total: 4,
            ..RunSummary::default()
        };
        let text = summary.to_string();
        assert!(text.contains("projected total"));
        assert!(!text.contains("emitted"));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["projected_total"], 4);
        assert!(json.get("emit").is_none());
        assert!(json.get("catalog_total").is_none());
        assert!(!text.contains("catalog total"));

        let with_emit = summary
            .with_emit(EmitReport::default())
            .with_catalog_total(4);
        let text = with_emit.to_string();
        assert!(text.contains("emitted: 0 attempted"));
        assert!(text.contains("catalog total"));
    }
}
