use chrono::{TimeZone, Utc};
use labcat_core::{CurrentRecord, VerificationStatus};

use super::*;
use crate::snapshot::SnapshotSink;

/// Records every call and fails the ones it was told to.
#[derive(Default)]
struct ScriptedSink {
    calls: Vec<String>,
    fail_update_ids: Vec<i64>,
    fail_insert_parts: Vec<String>,
    unchanged_delete_ids: Vec<i64>,
}

impl ProductSink for ScriptedSink {
    type Error = String;

    async fn update_product(&mut self, update: &PlannedUpdate) -> Result<MutationOutcome, String> {
        self.calls.push(format!("update {}", update.id));
        if self.fail_update_ids.contains(&update.id) {
            return Err("deadlock detected".to_string());
        }
        Ok(MutationOutcome::Applied)
    }

    async fn insert_product(&mut self, insert: &PlannedInsert) -> Result<MutationOutcome, String> {
        self.calls.push(format!("insert {}", insert.part_number));
        if self.fail_insert_parts.contains(&insert.part_number) {
            return Err("value too long for type character varying(50)".to_string());
        }
        Ok(MutationOutcome::Applied)
    }

    async fn delete_product(&mut self, delete: &PlannedDelete) -> Result<MutationOutcome, String> {
        self.calls.push(format!("delete {}", delete.id));
        if self.unchanged_delete_ids.contains(&delete.id) {
            return Ok(MutationOutcome::Unchanged);
        }
        Ok(MutationOutcome::Applied)
    }
}

fn update(id: i64, brand: &str, name: &str, category: CategoryLabel) -> PlannedUpdate {
    PlannedUpdate {
        id,
        brand: Some(brand.to_string()),
        part_number: Some(format!("P{id}")),
        old_name: Some("old".to_string()),
        new_name: name.to_string(),
        old_category: None,
        category,
        status: Some(VerificationStatus::Consistent),
        source_row: Some(2),
    }
}

fn insert(part: &str, category: CategoryLabel) -> PlannedInsert {
    PlannedInsert {
        product_code: format!("WATE-{part}"),
        prefix: "WATE".to_string(),
        brand: "Waters".to_string(),
        part_number: part.to_string(),
        name: "new".to_string(),
        category,
        status: VerificationStatus::Consistent,
        source_row: 3,
    }
}

fn delete(id: i64) -> PlannedDelete {
    PlannedDelete {
        id,
        product_code: None,
        brand: Some("Waters".to_string()),
        part_number: Some(format!("D{id}")),
        name: None,
        category: None,
    }
}

fn sample_plan() -> MutationPlan {
    MutationPlan {
        updates: vec![
            update(1, "Agilent", "DB-5 GC Column", CategoryLabel::GcColumns),
            update(2, "Agilent", "Vial", CategoryLabel::Vials),
        ],
        inserts: vec![insert("N1", CategoryLabel::Vials), insert("N2", CategoryLabel::Septa)],
        deletes: vec![delete(7), delete(8)],
    }
}

fn assert_balanced(counts: EmitCounts) {
    assert_eq!(
        counts.attempted,
        counts.succeeded + counts.failed + counts.skipped,
        "{counts:?}"
    );
}

#[tokio::test]
async fn applies_updates_then_inserts_then_deletes() {
    let mut sink = ScriptedSink::default();
    let report = emit(&sample_plan(), &mut sink, &EmitOptions::default()).await;

    assert_eq!(
        sink.calls,
        vec!["update 1", "update 2", "insert N1", "insert N2", "delete 7", "delete 8"]
    );
    assert_eq!(report.totals.attempted, 6);
    assert_eq!(report.totals.succeeded, 6);
    assert!(!report.has_failures());
    assert_balanced(report.totals);
}

#[tokio::test]
async fn failures_are_recorded_and_the_batch_continues() {
    let mut sink = ScriptedSink {
        fail_update_ids: vec![1],
        fail_insert_parts: vec!["N2".to_string()],
        ..ScriptedSink::default()
    };
    let report = emit(&sample_plan(), &mut sink, &EmitOptions::default()).await;

    assert_eq!(sink.calls.len(), 6);
    assert_eq!(report.totals.failed, 2);
    assert_eq!(report.totals.succeeded, 4);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].kind, MutationKind::Update);
    assert_eq!(report.failures[0].target, "product 1");
    assert_eq!(report.failures[0].reason, "deadlock detected");
    assert_eq!(report.failures[1].kind, MutationKind::Insert);
    assert!(report.failures[1].target.contains("Waters|||N2"));
    assert!(report.has_failures());
    for counts in [report.updates, report.inserts, report.deletes, report.totals] {
        assert_balanced(counts);
    }
}

#[tokio::test]
async fn already_applied_mutations_count_as_skipped() {
    let mut sink = ScriptedSink {
        unchanged_delete_ids: vec![8],
        ..ScriptedSink::default()
    };
    let report = emit(&sample_plan(), &mut sink, &EmitOptions::default()).await;

    assert_eq!(report.deletes.succeeded, 1);
    assert_eq!(report.deletes.skipped, 1);
    assert_balanced(report.deletes);
}

#[tokio::test]
async fn disabled_kinds_are_skipped_without_calling_the_sink() {
    let mut sink = ScriptedSink::default();
    let options = EmitOptions {
        deletes: false,
        ..EmitOptions::default()
    };
    let report = emit(&sample_plan(), &mut sink, &options).await;

    assert!(sink.calls.iter().all(|c| !c.starts_with("delete")));
    assert_eq!(report.deletes.attempted, 2);
    assert_eq!(report.deletes.skipped, 2);
    assert_balanced(report.totals);
}

#[tokio::test]
async fn tallies_count_only_applied_updates_and_inserts() {
    let mut sink = ScriptedSink {
        fail_update_ids: vec![2],
        ..ScriptedSink::default()
    };
    let report = emit(&sample_plan(), &mut sink, &EmitOptions::default()).await;

    assert_eq!(report.by_category.get("GC Columns"), Some(&1));
    assert_eq!(report.by_category.get("Vials"), Some(&1));
    assert_eq!(report.by_category.get("Septa"), Some(&1));
    assert_eq!(report.by_brand.get("Agilent"), Some(&1));
    assert_eq!(report.by_brand.get("Waters"), Some(&2));
}

#[tokio::test]
async fn empty_plan_reports_zero() {
    let mut sink = ScriptedSink::default();
    let report = emit(&MutationPlan::default(), &mut sink, &EmitOptions::default()).await;
    assert_eq!(report.totals, EmitCounts::default());
    assert!(sink.calls.is_empty());
}

// -----------------------------------------------------------------------
// snapshot sink
// -----------------------------------------------------------------------

fn snapshot_record(id: i64, part: &str, name: &str, category: &str) -> CurrentRecord {
    CurrentRecord {
        id,
        product_code: None,
        brand: Some("Waters".to_string()),
        part_number: Some(part.to_string()),
        name: Some(name.to_string()),
        category: Some(category.to_string()),
        created_at: None,
        updated_at: None,
    }
}

#[tokio::test]
async fn snapshot_sink_is_idempotent_across_reruns() {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let records = vec![
        snapshot_record(1, "P1", "old", "Other"),
        snapshot_record(7, "D7", "gone", "Other"),
    ];
    let plan = MutationPlan {
        updates: vec![update(1, "Waters", "Amber Vial", CategoryLabel::Vials)],
        inserts: vec![insert("N1", CategoryLabel::Vials)],
        deletes: vec![delete(7)],
    };

    let mut sink = SnapshotSink::new(records, now);
    let first = emit(&plan, &mut sink, &EmitOptions::default()).await;
    assert_eq!(first.totals.succeeded, 3);

    let second = emit(&plan, &mut sink, &EmitOptions::default()).await;
    assert_eq!(second.totals.succeeded, 0);
    assert_eq!(second.totals.skipped, 3);

    let records = sink.into_records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name.as_deref(), Some("Amber Vial"));
    assert_eq!(records[0].category.as_deref(), Some("Vials"));
    assert_eq!(records[0].updated_at, Some(now));
    assert_eq!(records[1].id, 8);
    assert_eq!(records[1].product_code.as_deref(), Some("WATE-N1"));
}

#[tokio::test]
async fn snapshot_sink_reports_unknown_update_target() {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let mut sink = SnapshotSink::new(Vec::new(), now);
    let plan = MutationPlan {
        updates: vec![update(42, "Waters", "Vial", CategoryLabel::Vials)],
        ..MutationPlan::default()
    };

    let report = emit(&plan, &mut sink, &EmitOptions::default()).await;
    assert_eq!(report.failures[0].reason, "no product with id 42");
}
