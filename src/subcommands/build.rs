//! `alademux build` — write SampleSheet.csv and demuxer.sh for one run.

use anyhow::{anyhow, bail, Result};
use chrono::Local;
use clap::Args;
use fs_err as fs;
use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::demux::DemuxBuilder;
use crate::io::records::{self, RecordSource, TsvRecordSource};
use crate::io::samplesheet::SampleSheet;
use crate::model::{AdapterChemistry, DemuxSpec, LibraryType};
use crate::transform;

#[derive(Args, Debug)]
pub struct CmdBuild {
    /// Name of the instrument run folder (e.g. 190624_A00421_0081_AHC7G3DRXX)
    #[arg(short = 'r', long, value_name = "RUN")]
    pub run_id: String,

    /// Lanes to demultiplex, e.g. `-l 1 4 8`. Lanes outside 1-8 are dropped.
    #[arg(short = 'l', long, num_args = 1.., value_delimiter = ',', value_name = "LANE")]
    pub lanes: Vec<u32>,

    #[arg(short = 't', long = "type", value_enum, default_value_t = LibraryType::Standard)]
    pub library: LibraryType,

    /// Directory holding instrument runs (default: `run_root` from config)
    #[arg(short = 'i', long)]
    pub run_path: Option<PathBuf>,

    /// Directory for demultiplexing results (default: `output_root` from config)
    #[arg(short = 'o', long)]
    pub out_path: Option<PathBuf>,

    /// Tab-separated LIMS export for the run (see `alademux query`)
    #[arg(long, value_name = "TSV")]
    pub records: Option<PathBuf>,

    /// Use an existing sample sheet instead of a LIMS export
    #[arg(long, value_name = "CSV", conflicts_with = "records")]
    pub sample_sheet: Option<PathBuf>,

    /// Nextera adapters on a MiSeq nano run (Illumina adapters otherwise)
    #[arg(short = 'n', long)]
    pub nextera: bool,

    /// Threads for the demultiplexer (default: logical CPUs minus one)
    #[arg(long)]
    pub threads: Option<usize>,

    #[arg(long, value_name = "JSON", help = "Pipeline config (else $ALADEMUX_CONFIG, else defaults)")]
    pub config: Option<PathBuf>,

    /// Everything after this flag is passed to the demultiplexer unchecked.
    #[arg(short = 'b', long, num_args = 1.., allow_hyphen_values = true, value_name = "ARG")]
    pub bcl2fastq: Vec<String>,
}

impl CmdBuild {
    fn load_sheet(&self, lanes: Option<&[u32]>) -> Result<Option<SampleSheet>> {
        if !self.library.needs_sample_sheet() {
            log::info!("Nano: no SampleSheet.csv being written; supply one in the output directory");
            return Ok(None);
        }
        if let Some(path) = &self.sample_sheet {
            return Ok(Some(SampleSheet::read(path)?));
        }
        let export = self
            .records
            .as_deref()
            .ok_or_else(|| anyhow!("--records or --sample-sheet is required for {} runs", self.library))?;

        let recs = TsvRecordSource::new(export).query(&self.run_id, lanes)?;
        if recs.is_empty() {
            bail!(
                "no records found for run id {}; do not execute run until records are available",
                self.run_id
            );
        }
        let rows = transform::transform(&recs, &self.run_id)?;
        Ok(Some(SampleSheet::new(rows, self.library.sheet_preamble())))
    }

    pub fn run(self) -> Result<()> {
        let config = PipelineConfig::resolve(self.config.as_deref())?;
        let lanes = records::sanitize_lanes(&self.lanes);
        if let Some(ls) = &lanes {
            log::info!("lanes: {ls:?}");
        }

        let run_folder = self
            .run_path
            .clone()
            .unwrap_or_else(|| config.run_root.clone())
            .join(&self.run_id);
        if !run_folder.exists() {
            bail!("Run path does not exist: {}", run_folder.display());
        }

        // Validate the sheet before creating anything on disk.
        let sheet = self.load_sheet(lanes.as_deref())?;

        let out_dir = self
            .out_path
            .clone()
            .unwrap_or_else(|| config.output_root.clone())
            .join(&self.run_id)
            .join(Local::now().format("%Y%m%d-%H%M%S").to_string());

        let mut spec = DemuxSpec::new(
            &self.run_id,
            &run_folder,
            &out_dir,
            self.library,
            &self.bcl2fastq,
            AdapterChemistry::from_nextera_flag(self.nextera),
        );
        if let Some(t) = self.threads {
            spec = spec.with_threads(t);
        }
        log::info!("Threads: {}", spec.threads);

        // Tag tables, RunInfo.xml and the template are read here, so a
        // missing resource leaves no empty output folder behind.
        let builder = DemuxBuilder::new(spec, config);
        let plan = builder.prepare(sheet)?;
        fs::create_dir_all(&out_dir)?;
        let out = builder.write(plan)?;
        if !out.unmapped.is_empty() {
            log::warn!("{} sample(s) have no 10x tag; check the sheet before running", out.unmapped.len());
        }

        println!("Start demultiplexing with the following commands: ");
        println!("cd {}", out_dir.display());
        println!("nohup ./{} & ", crate::model::DEMUX_SCRIPT);
        Ok(())
    }
}
