//! Upstream sample records. The LIMS database itself is not our concern:
//! anything that can answer `query(run_id, lanes)` will do.

use anyhow::{Context, Result};
use itertools::Itertools;
use std::path::{Path, PathBuf};

use crate::error::DemuxError;
use crate::model::RawRecord;

pub trait RecordSource {
    /// Records for one run, ordered by lane then sample number.
    fn query(&self, run_id: &str, lanes: Option<&[u32]>) -> Result<Vec<RawRecord>>;
}

/// Tab-separated export of the LIMS query, one header line then one row per
/// sample lane. Empty cells are treated as NULL.
#[derive(Debug, Clone)]
pub struct TsvRecordSource {
    path: PathBuf,
}

impl TsvRecordSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl RecordSource for TsvRecordSource {
    fn query(&self, run_id: &str, lanes: Option<&[u32]>) -> Result<Vec<RawRecord>> {
        if !self.path.exists() {
            return Err(DemuxError::missing("record export", &self.path).into());
        }
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_path(&self.path)
            .with_context(|| format!("open record export {}", self.path.display()))?;

        let mut out = Vec::new();
        for rec in rdr.deserialize() {
            let r: RawRecord =
                rec.with_context(|| format!("read record in {}", self.path.display()))?;
            if lanes.is_some_and(|ls| !ls.contains(&r.lane)) {
                continue;
            }
            out.push(r);
        }
        log::info!(
            "{} records for run {run_id} from {}",
            out.len(),
            self.path.display()
        );
        Ok(out)
    }
}

/// The query producing the export `TsvRecordSource` reads.
pub fn query_sql(run_id: &str, lanes: Option<&[u32]>) -> String {
    let mut sql = format!(
        "select flowcell.barcode as flowcell,
    flowcellchannel.number as lane,
    sample.number as sample,
    genomebuild.genomebuildname as genome_build,
    sample.barcodesequence as barcode,
    appuser.firstname as first_name,
    appuser.lastname as last_name,
    request.number as request,
    sample.barcodesequenceb as barcode_b
from flowcell
join flowcellchannel on flowcellchannel.idflowcell = flowcell.idflowcell
join sequencelane on sequencelane.idflowcellchannel = flowcellchannel.idflowcellchannel
join sample on sequencelane.idsample = sample.idsample
left outer join genomebuild on sequencelane.idgenomebuildalignto = genomebuild.idgenomebuild
join request on sequencelane.idrequest = request.idrequest
join appuser on request.idappuser = appuser.idappuser
where flowcellchannel.filename = '{}'\n",
        run_id.replace('\'', "''")
    );
    if let Some(ls) = lanes.filter(|ls| !ls.is_empty()) {
        sql += &format!("and flowcellchannel.number in ({})\n", ls.iter().join(","));
    }
    sql += "order by flowcellchannel.number, sample.number;\n";
    sql
}

/// Keep lanes 1..=8, first occurrence wins.
pub fn sanitize_lanes(lanes: &[u32]) -> Option<Vec<u32>> {
    let valid: Vec<u32> = lanes
        .iter()
        .copied()
        .filter(|l| (1..=crate::model::MAX_LANE).contains(l))
        .unique()
        .collect();
    if valid.is_empty() {
        None
    } else {
        Some(valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str =
        "flowcell\tlane\tsample\tgenome_build\tbarcode\tfirst_name\tlast_name\trequest\tbarcode_b\n";

    fn export(lines: &[&str]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(HEADER.as_bytes()).unwrap();
        for l in lines {
            writeln!(f, "{l}").unwrap();
        }
        f.flush().unwrap();
        f
    }

    #[test]
    fn reads_export_with_nulls() {
        let f = export(&[
            "HC7G3DRXX\t1\t1480X1\t\tACGTACGT\tAda\tLovelace\t1480R\t",
            "HC7G3DRXX\t2\t1480X2\tHg38\tTTGGAACC\tAda\tLovelace\t1480R1\tGGCC",
        ]);
        let recs = TsvRecordSource::new(f.path()).query("RUN", None).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].genome_build, None);
        assert_eq!(recs[0].barcode_b, None);
        assert_eq!(recs[1].barcode_b.as_deref(), Some("GGCC"));
        assert_eq!(recs[1].request.as_deref(), Some("1480R1"));
    }

    #[test]
    fn filters_lanes() {
        let f = export(&[
            "HC7G3DRXX\t1\t1480X1\t\tACGTACGT\tAda\tLovelace\t1480R\t",
            "HC7G3DRXX\t2\t1480X2\t\tTTGGAACC\tAda\tLovelace\t1480R\t",
        ]);
        let recs = TsvRecordSource::new(f.path())
            .query("RUN", Some(&[2]))
            .unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].lane, 2);
    }

    #[test]
    fn missing_export_is_reported() {
        let err = TsvRecordSource::new(Path::new("/no/such/export.tsv"))
            .query("RUN", None)
            .unwrap_err();
        assert!(err.to_string().contains("record export does not exist"));
    }

    #[test]
    fn sql_orders_with_and_without_lanes() {
        let all = query_sql("190624_A00421_0081_AHC7G3DRXX", None);
        assert!(all.contains("filename = '190624_A00421_0081_AHC7G3DRXX'"));
        assert!(!all.contains(" in ("));
        assert!(all.trim_end().ends_with("order by flowcellchannel.number, sample.number;"));

        let some = query_sql("RUN", Some(&[1, 4, 8]));
        assert!(some.contains("and flowcellchannel.number in (1,4,8)"));
        assert!(some.contains("order by"));
    }

    #[test]
    fn lanes_are_sanitized() {
        assert_eq!(sanitize_lanes(&[4, 0, 9, 1, 4, 8]), Some(vec![4, 1, 8]));
        assert_eq!(sanitize_lanes(&[0, 12]), None);
        assert_eq!(sanitize_lanes(&[]), None);
    }
}
