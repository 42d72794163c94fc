use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::DemuxError;

/// Names of files the pipeline reads or writes inside a run's output directory.
pub const SAMPLE_SHEET: &str = "SampleSheet.csv";
pub const SAMPLE_SHEET_PRE_TAGS: &str = "GNomEx_SampleSheet.csv";
pub const DEMUX_SCRIPT: &str = "demuxer.sh";
pub const RUN_INFO: &str = "RunInfo.xml";

/// Adapter sequences trimmed on MiSeq nano runs.
pub const NEXTERA_ADAPTER: &str = "CTGTCTCTTATACACATCT";
pub const ILLUMINA_ADAPTER: &str = "AGATCGGAAGAGCACACGTCTGAACTCCAGTCAC";

/// Lanes a flowcell can have.
pub const MAX_LANE: u32 = 8;

/// Library preparation types the builder knows how to demultiplex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum, Serialize, Deserialize)]
pub enum LibraryType {
    #[value(name = "standard")]
    #[serde(rename = "standard")]
    Standard,
    /// 10x Genomics expression / VDJ
    #[value(name = "10x")]
    #[serde(rename = "10x")]
    TenX,
    #[value(name = "10x-atac")]
    #[serde(rename = "10x-atac")]
    TenXAtac,
    /// 10x linked reads (longranger)
    #[value(name = "10x-long")]
    #[serde(rename = "10x-long")]
    TenXLong,
    #[value(name = "patchpcr")]
    #[serde(rename = "patchpcr")]
    PatchPcr,
    /// MiSeq nano, adapter trimmed
    #[value(name = "nano")]
    #[serde(rename = "nano")]
    Nano,
}

impl LibraryType {
    pub const ALL: [LibraryType; 6] = [
        LibraryType::Standard,
        LibraryType::TenX,
        LibraryType::TenXAtac,
        LibraryType::TenXLong,
        LibraryType::PatchPcr,
        LibraryType::Nano,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LibraryType::Standard => "standard",
            LibraryType::TenX => "10x",
            LibraryType::TenXAtac => "10x-atac",
            LibraryType::TenXLong => "10x-long",
            LibraryType::PatchPcr => "patchpcr",
            LibraryType::Nano => "nano",
        }
    }

    pub fn is_tenx(self) -> bool {
        matches!(
            self,
            LibraryType::TenX | LibraryType::TenXAtac | LibraryType::TenXLong
        )
    }

    /// Nano samples are supplied by the user out of band.
    pub fn needs_sample_sheet(self) -> bool {
        self != LibraryType::Nano
    }

    /// Only bcl2fastq-driven sheets carry the IEM `[Header]` block.
    pub fn sheet_preamble(self) -> bool {
        matches!(self, LibraryType::Standard | LibraryType::PatchPcr)
    }

    pub fn requires_bases_mask(self) -> bool {
        self.is_tenx() || self == LibraryType::PatchPcr
    }

    /// Expression/VDJ and linked-read libraries ignore a physically present i5 read.
    pub fn ignores_dual_index(self) -> bool {
        matches!(self, LibraryType::TenX | LibraryType::TenXLong)
    }

    /// Tag table file name, relative to the resources directory.
    pub fn tag_table(self) -> Option<&'static str> {
        match self {
            LibraryType::TenX | LibraryType::TenXLong => Some("10x_tags.tsv"),
            LibraryType::TenXAtac => Some("10x_atac_tags.tsv"),
            _ => None,
        }
    }

    /// Transfer/report template file name, relative to `<resources>/templates`.
    pub fn transfer_template(self) -> &'static str {
        match self {
            LibraryType::Standard | LibraryType::PatchPcr => "standard_transfer.sh",
            LibraryType::TenX | LibraryType::TenXAtac | LibraryType::TenXLong => {
                "10x_transfer.sh"
            }
            LibraryType::Nano => "nano_report.sh",
        }
    }
}

impl fmt::Display for LibraryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LibraryType {
    type Err = DemuxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LibraryType::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| DemuxError::UnsupportedType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdapterChemistry {
    #[default]
    Illumina,
    Nextera,
}

impl AdapterChemistry {
    pub fn from_nextera_flag(nextera: bool) -> Self {
        if nextera {
            AdapterChemistry::Nextera
        } else {
            AdapterChemistry::Illumina
        }
    }

    pub fn sequence(self) -> &'static str {
        match self {
            AdapterChemistry::Illumina => ILLUMINA_ADAPTER,
            AdapterChemistry::Nextera => NEXTERA_ADAPTER,
        }
    }
}

/// One row of the LIMS export, in query column order.
/// Nullable columns come through as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawRecord {
    pub flowcell: String,
    pub lane: u32,
    pub sample: Option<String>,
    pub genome_build: Option<String>,
    pub barcode: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub request: Option<String>,
    pub barcode_b: Option<String>,
}

/// One data line of the sample sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRow {
    #[serde(rename = "Lane")]
    pub lane: u32,
    #[serde(rename = "Sample_ID")]
    pub sample_id: String,
    #[serde(rename = "Sample_Name")]
    pub sample_name: String,
    #[serde(rename = "Sample_Project")]
    pub project: String,
    #[serde(rename = "index", default)]
    pub index1: String,
    #[serde(rename = "index2", default)]
    pub index2: String,
    /// Values of any further sheet columns, in column order.
    #[serde(skip)]
    pub extra: Vec<String>,
}

/// Everything the builder needs about one demultiplexing run.
#[derive(Debug, Clone)]
pub struct DemuxSpec {
    pub run_id: String,
    pub run_folder: PathBuf,
    pub out_dir: PathBuf,
    pub library: LibraryType,
    pub tool_args: Vec<String>,
    pub chemistry: AdapterChemistry,
    pub threads: usize,
}

impl DemuxSpec {
    pub fn new(
        run_id: &str,
        run_folder: &Path,
        out_dir: &Path,
        library: LibraryType,
        tool_args: &[String],
        chemistry: AdapterChemistry,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            run_folder: run_folder.to_path_buf(),
            out_dir: out_dir.to_path_buf(),
            library,
            tool_args: tool_args.to_vec(),
            chemistry,
            threads: default_threads(),
        }
    }

    pub fn with_threads(self, threads: usize) -> Self {
        Self {
            threads: threads.max(1),
            ..self
        }
    }

    pub fn sample_sheet(&self) -> PathBuf {
        self.out_dir.join(SAMPLE_SHEET)
    }

    pub fn script_path(&self) -> PathBuf {
        self.out_dir.join(DEMUX_SCRIPT)
    }

    pub fn run_info(&self) -> PathBuf {
        self.run_folder.join(RUN_INFO)
    }
}

/// Logical CPUs minus one reserved core, never below one.
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
        .saturating_sub(1)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_names_round_trip() {
        for t in LibraryType::ALL {
            assert_eq!(t.name().parse::<LibraryType>().unwrap(), t);
        }
    }

    #[test]
    fn unknown_library_is_rejected() {
        let err = "smartseq".parse::<LibraryType>().unwrap_err();
        assert!(matches!(err, DemuxError::UnsupportedType(ref s) if s == "smartseq"));
        assert!(err.to_string().contains("not available"));
    }

    #[test]
    fn tag_tables_only_for_tenx() {
        assert_eq!(LibraryType::TenX.tag_table(), Some("10x_tags.tsv"));
        assert_eq!(LibraryType::TenXLong.tag_table(), Some("10x_tags.tsv"));
        assert_eq!(LibraryType::TenXAtac.tag_table(), Some("10x_atac_tags.tsv"));
        assert_eq!(LibraryType::PatchPcr.tag_table(), None);
        assert!(!LibraryType::TenXAtac.ignores_dual_index());
    }

    #[test]
    fn threads_never_zero() {
        assert!(default_threads() >= 1);
        let spec = DemuxSpec::new(
            "RUN",
            Path::new("/in"),
            Path::new("/out"),
            LibraryType::Standard,
            &[],
            AdapterChemistry::Illumina,
        )
        .with_threads(0);
        assert_eq!(spec.threads, 1);
    }

    #[test]
    fn adapter_by_chemistry() {
        assert_eq!(AdapterChemistry::from_nextera_flag(true).sequence(), NEXTERA_ADAPTER);
        assert_eq!(AdapterChemistry::from_nextera_flag(false).sequence(), ILLUMINA_ADAPTER);
    }
}
