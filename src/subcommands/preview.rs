//! `alademux preview` — what a run looks like before demultiplexing it.

use anyhow::Result;
use clap::Args;
use itertools::Itertools;
use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::io::records::{RecordSource, TsvRecordSource};
use crate::io::runinfo;
use crate::model::{RawRecord, RUN_INFO};
use crate::transform;

#[derive(Args, Debug)]
pub struct CmdPreview {
    #[arg(short = 'r', long, value_name = "RUN")]
    pub run_id: String,
    #[arg(short = 'i', long)]
    pub run_path: Option<PathBuf>,
    /// Also summarize samples per lane from a LIMS export
    #[arg(long, value_name = "TSV")]
    pub records: Option<PathBuf>,
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,
}

impl CmdPreview {
    pub fn run(self) -> Result<()> {
        let config = PipelineConfig::resolve(self.config.as_deref())?;
        let run_folder = self
            .run_path
            .unwrap_or(config.run_root)
            .join(&self.run_id);

        let reads = runinfo::read_run_info(&run_folder.join(RUN_INFO))?;
        println!("Flow cell configuration: ");
        print!("{}", runinfo::summary_table(&reads));

        if let Some(export) = self.records {
            let recs = TsvRecordSource::new(&export).query(&self.run_id, None)?;
            println!();
            println!("Lane,Samples,Sample_Project");
            for (lane, n, projects) in lane_summary(&recs) {
                println!("{lane},{n},{projects}");
            }
        }
        Ok(())
    }
}

/// `(lane, samples, projects)` per lane in lane order, whatever order the
/// export came in.
pub fn lane_summary(recs: &[RawRecord]) -> Vec<(u32, usize, String)> {
    let counts = transform::count_per_lane(recs);
    counts
        .into_iter()
        .sorted()
        .map(|(lane, n)| {
            let projects = recs
                .iter()
                .filter(|r| r.lane == lane)
                .filter_map(|r| r.request.as_deref())
                .map(transform::normalize_project)
                .unique()
                .join(" ");
            (lane, n, projects)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(lane: u32, request: &str) -> RawRecord {
        RawRecord {
            lane,
            request: Some(request.into()),
            ..Default::default()
        }
    }

    #[test]
    fn unsorted_export_gives_one_line_per_lane() {
        let recs = vec![
            rec(2, "1480R1"),
            rec(1, "1500R"),
            rec(2, "1481R"),
            rec(1, "1500R2"),
            rec(2, "1480R"),
        ];
        assert_eq!(
            lane_summary(&recs),
            [
                (1, 2, "1500R".to_string()),
                (2, 3, "1480R 1481R".to_string()),
            ]
        );
    }
}
