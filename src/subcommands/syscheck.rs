//! `alademux syscheck` — environment, demultiplexers and resource files.

use anyhow::Result;
use clap::Args;
use fs_err as fs;
use std::path::PathBuf;
use sysinfo::System;

use crate::config::PipelineConfig;
use crate::model::{default_threads, LibraryType};
use crate::util::tools;

#[derive(Args, Debug)]
pub struct CmdSyscheck {
    #[arg(long)]
    pub out: Option<PathBuf>,
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,
}

impl CmdSyscheck {
    pub fn run(self) -> Result<()> {
        let config = PipelineConfig::resolve(self.config.as_deref())?;
        let mut s = System::new_all();
        s.refresh_all();

        let mut executables = serde_json::Map::new();
        for (name, bin) in [
            ("bcl2fastq", &config.tools.bcl2fastq),
            ("cellranger", &config.tools.cellranger),
            ("cellranger-atac", &config.tools.cellranger_atac),
            ("longranger", &config.tools.longranger),
        ] {
            let entry = match tools::resolve_bin(bin) {
                Ok(path) => {
                    let version =
                        tools::get_version(&path).unwrap_or_else(|e| format!("error: {e}"));
                    serde_json::json!({ "path": path, "version": version })
                }
                Err(e) => {
                    log::warn!("{e}");
                    serde_json::json!({ "path": bin, "error": e.to_string() })
                }
            };
            executables.insert(name.to_string(), entry);
        }

        let mut resources = serde_json::Map::new();
        for library in LibraryType::ALL {
            let mut files = vec![config.transfer_template(library)];
            files.extend(config.tag_table(library));
            for f in files {
                resources.insert(f.display().to_string(), serde_json::json!(f.exists()));
            }
        }

        let obj = serde_json::json!({
            "alademux_version": env!("CARGO_PKG_VERSION"),
            "cpus": s.cpus().len(),
            "demux_threads": default_threads(),
            "total_memory_mb": s.total_memory() / 1024 / 1024,
            "config": config,
            "executables": executables,
            "resources": resources,
        });

        if let Some(path) = self.out {
            serde_json::to_writer_pretty(fs::File::create(path)?, &obj)?;
        } else {
            println!("{}", serde_json::to_string_pretty(&obj)?);
        }
        Ok(())
    }
}
