use super::*;

fn authoritative(csv: &str) -> Result<Vec<AuthoritativeRecord>, ReconError> {
    read_authoritative(csv.as_bytes(), "sheet.csv", &AuthoritativeColumns::default())
}

fn current(csv: &str) -> Result<Vec<CurrentRecord>, ReconError> {
    read_current(csv.as_bytes(), "snapshot.csv", &CurrentColumns::default())
}

// -----------------------------------------------------------------------
// authoritative sheet
// -----------------------------------------------------------------------

#[test]
fn reads_english_headers_and_normalizes_cells() {
    let records = authoritative(
        "brand,part_number,official_name,internal_name,status\n\
         Agilent , 121-1012 ,  DB-1   GC  Column ,db1,Consistent\n",
    )
    .unwrap();

    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.row, 2);
    assert_eq!(r.brand.as_deref(), Some("Agilent"));
    assert_eq!(r.part_number.as_deref(), Some("121-1012"));
    assert_eq!(r.official_name.as_deref(), Some("DB-1 GC Column"));
    assert_eq!(r.internal_name.as_deref(), Some("db1"));
    assert_eq!(r.status, Some(VerificationStatus::Consistent));
}

#[test]
fn reads_localized_headers_and_statuses() {
    let records = authoritative(
        "品牌,原品牌零件号,官网产品名称,ROWELL产品名称,验证状态\n\
         Waters,WAT1,HPLC Guard Column X,,一致\n\
         Waters,WAT2,,Sample Vial 2ml,未找到\n\
         Waters,WAT3,Seal,,零件号需更正\n\
         Waters,WAT4,Cap,,不一致\n",
    )
    .unwrap();

    let statuses: Vec<_> = records.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            Some(VerificationStatus::Consistent),
            Some(VerificationStatus::NotFound),
            Some(VerificationStatus::PartNumberNeedsCorrection),
            Some(VerificationStatus::Inconsistent),
        ]
    );
    assert_eq!(records[1].official_name, None);
    assert_eq!(records[1].new_name(), Some("Sample Vial 2ml"));
}

#[test]
fn null_sentinels_become_none() {
    let records = authoritative(
        "brand,part_number,official_name,status\n\
         N/A,#N/A,nan,consistent\n",
    )
    .unwrap();
    let r = &records[0];
    assert_eq!(r.brand, None);
    assert_eq!(r.part_number, None);
    assert_eq!(r.official_name, None);
}

#[test]
fn blank_rows_are_ignored() {
    let records = authoritative(
        "brand,part_number,official_name,status\n\
         ,,,\n\
         Waters,WAT1,Vial,consistent\n\
         \" \",,,\n",
    )
    .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].row, 3);
}

#[test]
fn missing_status_column_defaults_to_consistent() {
    let records = authoritative("brand,part_number,official_name\nWaters,WAT1,Vial\n").unwrap();
    assert_eq!(records[0].status, Some(VerificationStatus::Consistent));
    assert_eq!(records[0].status_text, None);
}

#[test]
fn unknown_status_keeps_text_for_reporting() {
    let records =
        authoritative("brand,part_number,official_name,status\nWaters,WAT1,Vial,  pending  review\n")
            .unwrap();
    assert_eq!(records[0].status, None);
    assert_eq!(records[0].status_text.as_deref(), Some("pending review"));
}

#[test]
fn missing_required_columns_are_all_named() {
    let err = authoritative("vendor,internal_name,status\nWaters,x,consistent\n").unwrap_err();
    match err {
        ReconError::Schema {
            source_name,
            missing,
        } => {
            assert_eq!(source_name, "sheet.csv");
            assert_eq!(missing, vec!["brand", "part_number", "official_name"]);
        }
        other => panic!("expected Schema error, got {other:?}"),
    }
}

#[test]
fn short_rows_read_as_nulls() {
    let records =
        authoritative("brand,part_number,official_name,status\nWaters,WAT1\n").unwrap();
    assert_eq!(records[0].official_name, None);
    assert_eq!(records[0].status, None);
}

#[test]
fn load_authoritative_reads_from_disk() {
    use std::io::Write as _;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "\u{feff}brand,part_number,official_name,status\nWaters,WAT1,Vial,consistent\n"
    )
    .unwrap();

    let records = load_authoritative(file.path(), &ColumnMap::default()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].brand.as_deref(), Some("Waters"));
}

#[test]
fn load_authoritative_reports_missing_file() {
    let err = load_authoritative(Path::new("/nonexistent/sheet.csv"), &ColumnMap::default())
        .unwrap_err();
    assert!(matches!(err, ReconError::Io { .. }));
}

// -----------------------------------------------------------------------
// current snapshot
// -----------------------------------------------------------------------

#[test]
fn reads_snapshot_with_timestamps() {
    let records = current(
        "id,product_code,brand,part_number,name,category,created_at,updated_at\n\
         7,WATE-WAT1,Waters,WAT1,Old Name,Other,2024-03-01 10:00:00,2024-03-02T08:30:00Z\n",
    )
    .unwrap();

    let r = &records[0];
    assert_eq!(r.id, 7);
    assert_eq!(r.product_code.as_deref(), Some("WATE-WAT1"));
    assert_eq!(r.category.as_deref(), Some("Other"));
    assert_eq!(
        r.created_at.map(|t| t.to_rfc3339()),
        Some("2024-03-01T10:00:00+00:00".to_string())
    );
    assert!(r.updated_at.is_some());
}

#[test]
fn snapshot_accepts_camel_case_headers() {
    let records = current("id,productId,brand,partNumber,name,productType\n1,X-1,Waters,WAT1,Vial,Vials\n")
        .unwrap();
    assert_eq!(records[0].part_number.as_deref(), Some("WAT1"));
    assert_eq!(records[0].category.as_deref(), Some("Vials"));
}

#[test]
fn snapshot_rejects_non_numeric_id() {
    let err = current("id,brand,part_number,name\nabc,Waters,WAT1,Vial\n").unwrap_err();
    assert!(
        matches!(err, ReconError::InvalidValue { field: "id", line: 2, .. }),
        "got {err:?}"
    );
}

#[test]
fn snapshot_requires_identity_and_key_columns() {
    let err = current("brand,name\nWaters,Vial\n").unwrap_err();
    assert!(
        matches!(err, ReconError::Schema { ref missing, .. } if missing == &["id", "part_number"]),
        "got {err:?}"
    );
}

#[test]
fn unparseable_timestamp_is_dropped() {
    let records = current("id,brand,part_number,name,updated_at\n1,Waters,WAT1,Vial,yesterday\n")
        .unwrap();
    assert_eq!(records[0].updated_at, None);
}
