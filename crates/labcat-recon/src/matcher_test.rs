use super::*;

fn auth(
    row: usize,
    brand: Option<&str>,
    part: Option<&str>,
    name: Option<&str>,
    status: Option<VerificationStatus>,
) -> AuthoritativeRecord {
    AuthoritativeRecord {
        row,
        brand: brand.map(str::to_string),
        part_number: part.map(str::to_string),
        official_name: name.map(str::to_string),
        internal_name: None,
        status,
        status_text: status.map(|s| s.to_string()),
    }
}

fn consistent(row: usize, brand: &str, part: &str, name: &str) -> AuthoritativeRecord {
    auth(
        row,
        Some(brand),
        Some(part),
        Some(name),
        Some(VerificationStatus::Consistent),
    )
}

fn not_found(row: usize, brand: &str, part: &str) -> AuthoritativeRecord {
    auth(
        row,
        Some(brand),
        Some(part),
        Some("gone"),
        Some(VerificationStatus::NotFound),
    )
}

fn cur(id: i64, brand: Option<&str>, part: Option<&str>, name: &str) -> CurrentRecord {
    CurrentRecord {
        id,
        product_code: None,
        brand: brand.map(str::to_string),
        part_number: part.map(str::to_string),
        name: Some(name.to_string()),
        category: None,
        created_at: None,
        updated_at: None,
    }
}

fn ids(records: &[&CurrentRecord]) -> Vec<i64> {
    records.iter().map(|r| r.id).collect()
}

// -----------------------------------------------------------------------
// key matching
// -----------------------------------------------------------------------

#[test]
fn exact_key_pairs_for_update() {
    let authoritative = vec![consistent(2, "Agilent", "121-1012", "DB-1")];
    let current = vec![cur(1, Some("Agilent"), Some("121-1012"), "old")];

    let outcome = match_records(&authoritative, &current);

    assert_eq!(outcome.to_update.len(), 1);
    assert_eq!(outcome.to_update[0].current.id, 1);
    assert!(outcome.to_insert.is_empty());
    assert!(outcome.unchanged.is_empty());
}

#[test]
fn changing_either_key_component_prevents_match() {
    let current = vec![cur(1, Some("Agilent"), Some("121-1012"), "old")];

    for (brand, part) in [("agilent", "121-1012"), ("Agilent", "121-1013")] {
        let authoritative = vec![consistent(2, brand, part, "DB-1")];
        let outcome = match_records(&authoritative, &current);
        assert!(outcome.to_update.is_empty(), "{brand}/{part} must not match");
        assert_eq!(outcome.to_insert.len(), 1);
        assert_eq!(ids(&outcome.unchanged), vec![1]);
    }
}

#[test]
fn part_number_needs_correction_is_update_eligible() {
    let mut record = consistent(2, "Waters", "WAT1", "Vial");
    record.status = Some(VerificationStatus::PartNumberNeedsCorrection);
    let current = vec![cur(5, Some("Waters"), Some("WAT1"), "old")];

    let authoritative = [record];
    let outcome = match_records(&authoritative, &current);
    assert_eq!(outcome.to_update.len(), 1);
}

// -----------------------------------------------------------------------
// duplicates
// -----------------------------------------------------------------------

#[test]
fn duplicate_key_pairs_with_first_current_record() {
    let authoritative = vec![consistent(2, "Waters", "WAT1", "Vial")];
    let current = vec![
        cur(10, Some("Waters"), Some("WAT1"), "first"),
        cur(11, Some("Waters"), Some("WAT1"), "second"),
    ];

    let outcome = match_records(&authoritative, &current);

    assert_eq!(outcome.to_update.len(), 1);
    assert_eq!(outcome.to_update[0].current.id, 10);
    assert_eq!(outcome.duplicate_keys.len(), 1);
    assert_eq!(outcome.duplicate_keys[0].ids, vec![10, 11]);
    assert_eq!(outcome.duplicate_keys[0].winner(), Some(10));
    // The loser is neither updated, deleted nor unchanged.
    assert!(outcome.unchanged.is_empty());
    assert!(outcome.to_delete.is_empty());
}

#[test]
fn not_found_deletes_every_duplicate_once() {
    let authoritative = vec![not_found(2, "Waters", "WAT2"), not_found(3, "Waters", "WAT2")];
    let current = vec![
        cur(20, Some("Waters"), Some("WAT2"), "a"),
        cur(21, Some("Waters"), Some("WAT2"), "b"),
    ];

    let outcome = match_records(&authoritative, &current);
    assert_eq!(ids(&outcome.to_delete), vec![20, 21]);
}

// -----------------------------------------------------------------------
// statuses
// -----------------------------------------------------------------------

#[test]
fn inconsistent_rows_are_retained_and_protect_their_key() {
    let mut record = consistent(2, "Waters", "WAT1", "Vial");
    record.status = Some(VerificationStatus::Inconsistent);
    let authoritative = [record];
    let current = vec![cur(1, Some("Waters"), Some("WAT1"), "old")];

    let outcome = match_records(&authoritative, &current);
    assert_eq!(outcome.retained.len(), 1);
    assert!(outcome.to_update.is_empty());
    assert!(outcome.to_delete.is_empty());
    assert!(outcome.unchanged.is_empty());
}

#[test]
fn not_found_without_current_record_is_a_no_op() {
    let authoritative = vec![not_found(2, "Waters", "WAT9")];
    let outcome = match_records(&authoritative, &[]);
    assert!(outcome.to_delete.is_empty());
    assert!(outcome.skipped.is_empty());
}

#[test]
fn unknown_status_is_skipped_but_protects_its_key() {
    let mut record = consistent(4, "Waters", "WAT1", "Vial");
    record.status = None;
    record.status_text = Some("pending".to_string());
    let authoritative = [record];
    let current = vec![cur(1, Some("Waters"), Some("WAT1"), "old")];

    let outcome = match_records(&authoritative, &current);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(
        outcome.skipped[0].reason,
        SkipReason::UnknownStatus("pending".to_string())
    );
    assert_eq!(outcome.skipped[0].provenance, Provenance::Authoritative { row: 4 });
    assert!(outcome.unchanged.is_empty());
}

#[test]
fn not_found_overlapping_an_update_still_deletes() {
    let authoritative = vec![
        consistent(2, "Waters", "WAT1", "Vial"),
        not_found(3, "Waters", "WAT1"),
    ];
    let current = vec![cur(1, Some("Waters"), Some("WAT1"), "old")];

    let outcome = match_records(&authoritative, &current);
    assert_eq!(outcome.to_update.len(), 1);
    assert_eq!(ids(&outcome.to_delete), vec![1]);
    assert!(outcome.skipped.is_empty());
    assert_eq!(
        outcome.status_conflicts,
        vec![StatusConflict {
            key: CompositeKey::new("Waters", "WAT1"),
            row: 3,
            updated_ids: vec![1],
        }]
    );
}

#[test]
fn not_found_before_its_update_is_still_flagged() {
    let authoritative = vec![
        not_found(2, "Waters", "WAT1"),
        consistent(3, "Waters", "WAT1", "Vial"),
    ];
    let current = vec![cur(1, Some("Waters"), Some("WAT1"), "old")];

    let outcome = match_records(&authoritative, &current);
    assert_eq!(ids(&outcome.to_delete), vec![1]);
    assert_eq!(outcome.status_conflicts.len(), 1);
    assert_eq!(outcome.status_conflicts[0].row, 2);
}

#[test]
fn inconsistent_row_with_malformed_key_is_reported() {
    let authoritative = vec![auth(
        5,
        Some("Waters"),
        None,
        Some("Vial"),
        Some(VerificationStatus::Inconsistent),
    )];

    let outcome = match_records(&authoritative, &[]);
    assert!(outcome.retained.is_empty());
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].reason, SkipReason::MissingPartNumber);
    assert_eq!(outcome.skipped[0].provenance, Provenance::Authoritative { row: 5 });
}

// -----------------------------------------------------------------------
// malformed records
// -----------------------------------------------------------------------

#[test]
fn malformed_authoritative_keys_are_skipped() {
    let authoritative = vec![
        auth(2, None, Some("WAT1"), Some("Vial"), Some(VerificationStatus::Consistent)),
        auth(3, Some("Waters"), None, Some("Vial"), Some(VerificationStatus::NotFound)),
    ];

    let outcome = match_records(&authoritative, &[]);
    let reasons: Vec<_> = outcome.skipped.iter().map(|s| s.reason.clone()).collect();
    assert_eq!(
        reasons,
        vec![SkipReason::MissingBrand, SkipReason::MissingPartNumber]
    );
    assert!(outcome.to_insert.is_empty());
}

#[test]
fn high_quality_row_without_any_name_is_skipped() {
    let authoritative = vec![auth(
        2,
        Some("Waters"),
        Some("WAT1"),
        None,
        Some(VerificationStatus::Consistent),
    )];
    let outcome = match_records(&authoritative, &[]);
    assert_eq!(outcome.skipped[0].reason, SkipReason::MissingName);
    assert_eq!(
        outcome.skipped[0].key,
        Some(CompositeKey::new("Waters", "WAT1"))
    );
}

#[test]
fn malformed_current_records_are_reported_and_unchanged() {
    let current = vec![cur(7, None, Some("WAT1"), "orphan")];
    let outcome = match_records(&[], &current);
    assert_eq!(ids(&outcome.unchanged), vec![7]);
    assert_eq!(outcome.skipped[0].provenance, Provenance::Current { id: 7 });
}

// -----------------------------------------------------------------------
// partition properties
// -----------------------------------------------------------------------

#[test]
fn partitions_are_complete_and_disjoint() {
    let authoritative = vec![
        consistent(2, "A", "1", "Vial"),
        consistent(3, "A", "2", "Cap"),
        not_found(4, "A", "3"),
        not_found(5, "A", "4"),
    ];
    let current = vec![
        cur(1, Some("A"), Some("1"), "x"),
        cur(2, Some("A"), Some("3"), "x"),
        cur(3, Some("B"), Some("1"), "x"),
    ];

    let outcome = match_records(&authoritative, &current);

    let high_quality = authoritative
        .iter()
        .filter(|r| r.status.is_some_and(VerificationStatus::is_update_eligible))
        .count();
    assert_eq!(
        outcome.to_update.len() + outcome.to_insert.len(),
        high_quality
    );
    assert_eq!(ids(&outcome.to_delete), vec![2]);
    assert_eq!(ids(&outcome.unchanged), vec![3]);

    let authoritative_keys: Vec<_> = authoritative.iter().filter_map(|r| r.key().ok()).collect();
    for record in &outcome.unchanged {
        let key = record.key().unwrap();
        assert!(!authoritative_keys.contains(&key));
    }
}

#[test]
fn output_follows_input_order() {
    let authoritative = vec![
        consistent(2, "A", "3", "x"),
        consistent(3, "A", "1", "x"),
        consistent(4, "A", "2", "x"),
    ];
    let outcome = match_records(&authoritative, &[]);
    let rows: Vec<usize> = outcome.to_insert.iter().map(|r| r.row).collect();
    assert_eq!(rows, vec![2, 3, 4]);
}
