//! Deployment configuration: where the demultiplexers, tag tables and
//! transfer templates live, and the default run/result roots.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::DemuxError;
use crate::model::LibraryType;

pub const CONFIG_ENV: &str = "ALADEMUX_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tools {
    pub bcl2fastq: PathBuf,
    pub cellranger: PathBuf,
    pub cellranger_atac: PathBuf,
    pub longranger: PathBuf,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            bcl2fastq: PathBuf::from("bcl2fastq"),
            cellranger: PathBuf::from("cellranger"),
            cellranger_atac: PathBuf::from("cellranger-atac"),
            longranger: PathBuf::from("longranger"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub tools: Tools,
    /// Holds the tag tables and a `templates/` directory.
    pub resources_dir: PathBuf,
    /// Parent of instrument run folders.
    pub run_root: PathBuf,
    /// Parent of demultiplexing result folders.
    pub output_root: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tools: Tools::default(),
            resources_dir: PathBuf::from("."),
            run_root: PathBuf::from("."),
            output_root: PathBuf::from("."),
        }
    }
}

impl PipelineConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DemuxError::missing("config file", path).into());
        }
        let f = fs_err::File::open(path)?;
        let cfg: Self = serde_json::from_reader(f)
            .with_context(|| format!("parse config {}", path.display()))?;
        Ok(cfg)
    }

    /// Priority: explicit path > `ALADEMUX_CONFIG` > built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(p) = explicit {
            return Self::load_from(p);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(p) => Self::load_from(Path::new(&p)),
            None => {
                log::debug!("no config given; using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Demultiplexer invoked for a library type.
    pub fn tool_for(&self, library: LibraryType) -> &Path {
        match library {
            LibraryType::Standard | LibraryType::PatchPcr | LibraryType::Nano => {
                &self.tools.bcl2fastq
            }
            LibraryType::TenX => &self.tools.cellranger,
            LibraryType::TenXAtac => &self.tools.cellranger_atac,
            LibraryType::TenXLong => &self.tools.longranger,
        }
    }

    pub fn tag_table(&self, library: LibraryType) -> Option<PathBuf> {
        library.tag_table().map(|f| self.resources_dir.join(f))
    }

    pub fn transfer_template(&self, library: LibraryType) -> PathBuf {
        self.resources_dir
            .join("templates")
            .join(library.transfer_template())
    }
}
