//! Partitioning of authoritative and current records by composite key.
//!
//! The outcome borrows from the loader's records. Nothing is copied or
//! mutated here; classification and mutation planning happen downstream.

use std::collections::{HashMap, HashSet};

use labcat_core::{AuthoritativeRecord, CompositeKey, CurrentRecord, KeyDefect, VerificationStatus};
use serde::Serialize;

/// Where a skipped record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Provenance {
    Authoritative { row: usize },
    Current { id: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingBrand,
    MissingPartNumber,
    MissingName,
    UnknownStatus(String),
}

impl From<KeyDefect> for SkipReason {
    fn from(defect: KeyDefect) -> Self {
        match defect {
            KeyDefect::MissingBrand => SkipReason::MissingBrand,
            KeyDefect::MissingPartNumber => SkipReason::MissingPartNumber,
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingBrand => f.write_str("missing brand"),
            SkipReason::MissingPartNumber => f.write_str("missing part number"),
            SkipReason::MissingName => f.write_str("missing name"),
            SkipReason::UnknownStatus(text) => write!(f, "unknown status '{text}'"),
        }
    }
}

/// A record excluded from matching. The run continues without it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub provenance: Provenance,
    pub key: Option<CompositeKey>,
    pub reason: SkipReason,
}

/// A high-quality authoritative record and the current record it overwrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatePair<'a> {
    pub authoritative: &'a AuthoritativeRecord,
    pub current: &'a CurrentRecord,
}

/// A key carried by more than one current record. `ids` keeps iteration
/// order; the first id is the one updates pair with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateKey {
    pub key: CompositeKey,
    pub ids: Vec<i64>,
}

impl DuplicateKey {
    #[must_use]
    pub fn winner(&self) -> Option<i64> {
        self.ids.first().copied()
    }
}

/// A `NotFound` row whose key also carries a high-quality row. The delete is
/// still planned; the conflict is kept for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusConflict {
    pub key: CompositeKey,
    pub row: usize,
    /// Current records claimed for update under the same key.
    pub updated_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome<'a> {
    pub to_update: Vec<UpdatePair<'a>>,
    pub to_insert: Vec<&'a AuthoritativeRecord>,
    pub to_delete: Vec<&'a CurrentRecord>,
    pub unchanged: Vec<&'a CurrentRecord>,
    /// `Inconsistent` rows, left untouched and exported for review.
    pub retained: Vec<&'a AuthoritativeRecord>,
    pub skipped: Vec<SkippedRecord>,
    pub duplicate_keys: Vec<DuplicateKey>,
    pub status_conflicts: Vec<StatusConflict>,
}

struct KeyIndex<'a> {
    by_key: HashMap<CompositeKey, Vec<&'a CurrentRecord>>,
    duplicates: Vec<CompositeKey>,
}

impl<'a> KeyIndex<'a> {
    fn build(current: &'a [CurrentRecord], skipped: &mut Vec<SkippedRecord>) -> Self {
        let mut by_key: HashMap<CompositeKey, Vec<&'a CurrentRecord>> = HashMap::new();
        let mut duplicates = Vec::new();

        for record in current {
            match record.key() {
                Ok(key) => {
                    let bucket = by_key.entry(key.clone()).or_default();
                    bucket.push(record);
                    if bucket.len() == 2 {
                        duplicates.push(key);
                    }
                }
                Err(defect) => {
                    tracing::warn!(id = record.id, reason = %defect, "current record has a malformed key");
                    skipped.push(SkippedRecord {
                        provenance: Provenance::Current { id: record.id },
                        key: None,
                        reason: defect.into(),
                    });
                }
            }
        }

        Self { by_key, duplicates }
    }

    fn get(&self, key: &CompositeKey) -> Option<&[&'a CurrentRecord]> {
        self.by_key.get(key).map(Vec::as_slice)
    }

    fn duplicate_keys(&self) -> Vec<DuplicateKey> {
        self.duplicates
            .iter()
            .map(|key| DuplicateKey {
                key: key.clone(),
                ids: self
                    .get(key)
                    .map(|records| records.iter().map(|r| r.id).collect())
                    .unwrap_or_default(),
            })
            .collect()
    }
}

fn skip_authoritative(
    record: &AuthoritativeRecord,
    key: Option<CompositeKey>,
    reason: SkipReason,
) -> SkippedRecord {
    tracing::warn!(row = record.row, reason = %reason, "authoritative record skipped");
    SkippedRecord {
        provenance: Provenance::Authoritative { row: record.row },
        key,
        reason,
    }
}

/// Partitions both record sets by composite key.
///
/// High-quality rows (`Consistent`, `PartNumberNeedsCorrection`) pair with the
/// first current record under their key, or become inserts. `NotFound` rows
/// delete every current record under their key, even one claimed for update;
/// such overlaps are listed in `status_conflicts`. Current records whose key no authoritative row mentions
/// are unchanged. Order follows the inputs; nothing is sorted.
#[must_use]
pub fn match_records<'a>(
    authoritative: &'a [AuthoritativeRecord],
    current: &'a [CurrentRecord],
) -> MatchOutcome<'a> {
    let mut outcome = MatchOutcome::default();
    let index = KeyIndex::build(current, &mut outcome.skipped);
    outcome.duplicate_keys = index.duplicate_keys();
    for duplicate in &outcome.duplicate_keys {
        tracing::warn!(key = %duplicate.key, ids = ?duplicate.ids, "duplicate composite key in current records");
    }

    let mut claimed: HashSet<i64> = HashSet::new();
    let mut not_found = Vec::new();

    for record in authoritative {
        let Some(status) = record.status else {
            let text = record.status_text.clone().unwrap_or_default();
            let skip = skip_authoritative(record, record.key().ok(), SkipReason::UnknownStatus(text));
            outcome.skipped.push(skip);
            continue;
        };

        match status {
            VerificationStatus::Consistent | VerificationStatus::PartNumberNeedsCorrection => {
                let key = match record.key() {
                    Ok(key) => key,
                    Err(defect) => {
                        outcome.skipped.push(skip_authoritative(record, None, defect.into()));
                        continue;
                    }
                };
                if record.new_name().is_none() {
                    outcome
                        .skipped
                        .push(skip_authoritative(record, Some(key), SkipReason::MissingName));
                    continue;
                }

                match index.get(&key) {
                    Some([first, rest @ ..]) => {
                        if !rest.is_empty() {
                            tracing::warn!(
                                key = %key,
                                chosen = first.id,
                                ignored = ?rest.iter().map(|r| r.id).collect::<Vec<_>>(),
                                "duplicate key resolved to first current record"
                            );
                        }
                        claimed.insert(first.id);
                        outcome.to_update.push(UpdatePair {
                            authoritative: record,
                            current: *first,
                        });
                    }
                    _ => outcome.to_insert.push(record),
                }
            }
            VerificationStatus::Inconsistent => match record.key() {
                Ok(_) => outcome.retained.push(record),
                Err(defect) => outcome.skipped.push(skip_authoritative(record, None, defect.into())),
            },
            VerificationStatus::NotFound => not_found.push(record),
        }
    }

    // Deletes run after every update has claimed its target, so a conflict is
    // noticed whichever row comes first in the sheet.
    let mut deleted: HashSet<i64> = HashSet::new();
    for record in not_found {
        let key = match record.key() {
            Ok(key) => key,
            Err(defect) => {
                outcome.skipped.push(skip_authoritative(record, None, defect.into()));
                continue;
            }
        };
        let Some(matches) = index.get(&key) else {
            tracing::debug!(key = %key, "not_found row has no current record");
            continue;
        };
        let updated_ids: Vec<i64> = matches
            .iter()
            .map(|m| m.id)
            .filter(|id| claimed.contains(id))
            .collect();
        if !updated_ids.is_empty() {
            tracing::warn!(
                key = %key,
                row = record.row,
                ids = ?updated_ids,
                "not_found row deletes a product that is also planned for update"
            );
            outcome.status_conflicts.push(StatusConflict {
                key,
                row: record.row,
                updated_ids,
            });
        }
        for &current_record in matches {
            if deleted.insert(current_record.id) {
                outcome.to_delete.push(current_record);
            }
        }
    }

    let mentioned: HashSet<CompositeKey> = authoritative
        .iter()
        .filter_map(|record| record.key().ok())
        .collect();
    outcome.unchanged = current
        .iter()
        .filter(|record| !record.key().is_ok_and(|key| mentioned.contains(&key)))
        .collect();

    tracing::info!(
        to_update = outcome.to_update.len(),
        to_insert = outcome.to_insert.len(),
        to_delete = outcome.to_delete.len(),
        unchanged = outcome.unchanged.len(),
        retained = outcome.retained.len(),
        skipped = outcome.skipped.len(),
        "matched records"
    );

    outcome
}

#[cfg(test)]
#[path = "matcher_test.rs"]
mod tests;
