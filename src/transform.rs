//! LIMS records → sample sheet rows.
//!
//! Rows keep the order the export delivered them in (lane, then sample
//! number); nothing here re-sorts.

use std::collections::HashMap;

use crate::error::DemuxError;
use crate::model::{ConfigRow, RawRecord};

/// Lane number → samples sequenced in that lane.
pub type SampleCountIndex = HashMap<u32, usize>;

pub fn count_per_lane(records: &[RawRecord]) -> SampleCountIndex {
    let mut counts = SampleCountIndex::new();
    for rec in records {
        *counts.entry(rec.lane).or_insert(0) += 1;
    }
    counts
}

/// Commas are the sheet delimiter; drop every one and trim the rest.
fn clean_field(field: Option<&str>) -> String {
    field
        .map(|f| f.replace(',', "").trim().to_string())
        .unwrap_or_default()
}

/// `1480R1` → `1480R`. Everything after the first `R` is a resubmission suffix.
pub fn normalize_project(project: &str) -> String {
    let head = match project.split_once('R') {
        Some((head, _)) => head,
        None => {
            log::warn!("project {project:?} has no R marker; appending one");
            project
        }
    };
    format!("{head}R")
}

/// Clean one record against the lane counts of the whole export.
pub fn clean_row(
    rec: &RawRecord,
    counts: &SampleCountIndex,
    run_id: &str,
) -> Result<ConfigRow, DemuxError> {
    let sample_id = clean_field(rec.sample.as_deref());
    let mut index1 = clean_field(rec.barcode.as_deref());
    let mut index2 = clean_field(rec.barcode_b.as_deref());

    match counts.get(&rec.lane).copied().unwrap_or(0) {
        // a lone sample is split off by lane, not by barcode
        0 | 1 => {
            index1.clear();
            index2.clear();
        }
        _ if index1.is_empty() => {
            return Err(DemuxError::MissingBarcode {
                sample: sample_id,
                lane: rec.lane,
            });
        }
        _ => {}
    }

    let project = normalize_project(&clean_field(rec.request.as_deref()));
    let sample_name = clean_field(Some(format!("{sample_id}_{run_id}").as_str()));

    Ok(ConfigRow {
        lane: rec.lane,
        sample_id,
        sample_name,
        project,
        index1,
        index2,
        extra: Vec::new(),
    })
}

pub fn transform(records: &[RawRecord], run_id: &str) -> Result<Vec<ConfigRow>, DemuxError> {
    let counts = count_per_lane(records);
    log::debug!("samples per lane: {counts:?}");
    records
        .iter()
        .map(|rec| clean_row(rec, &counts, run_id))
        .collect()
}
