//! Demultiplexing command builder.
//!
//! A build runs in two stages. `prepare` validates the pass-through
//! arguments, reads every resource the library needs (sheet, tag table,
//! RunInfo.xml, transfer template), applies the library-specific rewrites to
//! the in-memory sample sheet and assembles the command line. `write` then
//! puts the sheet(s) and `demuxer.sh` on disk, each exactly once.

use anyhow::{Context, Result};
use fs_err as fs;
use regex::Regex;
use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::error::DemuxError;
use crate::io::runinfo;
use crate::io::samplesheet::{SampleSheet, SheetOutcome};
use crate::io::tags::{self, TagTable};
use crate::model::{AdapterChemistry, ConfigRow, DemuxSpec, LibraryType, SAMPLE_SHEET_PRE_TAGS};

pub const BASES_MASK_FLAG: &str = "--use-bases-mask=";
pub const TRANSFER_SEPARATOR: &str = "# Transfer data to GNomEx";

/// Fail unless one of the pass-through arguments sets the bases mask.
pub fn require_bases_mask(library: LibraryType, args: &[String]) -> Result<(), DemuxError> {
    if args.iter().any(|a| a.contains(BASES_MASK_FLAG)) {
        Ok(())
    } else {
        Err(DemuxError::MissingBasesMask {
            library: library.to_string(),
        })
    }
}

/// Patch-PCR i5 reads carry a variable masked region (`NNNN...`) that must
/// not reach the demultiplexer.
pub fn strip_masked_region(rows: &mut [ConfigRow]) -> Result<()> {
    let masked = Regex::new("N{4,}")?;
    for row in rows.iter_mut() {
        let stripped = masked.replace_all(&row.index2, "").into_owned();
        row.index2 = stripped;
    }
    Ok(())
}

/// Result of `prepare`: nothing has touched the disk yet.
#[derive(Debug, Clone)]
pub struct DemuxPlan {
    pub command: Vec<String>,
    /// Transfer template body appended to the script.
    pub transfer: String,
    pub sheet: Option<SampleSheet>,
    /// The sheet as it was before tag substitution.
    pub pre_tags: Option<SampleSheet>,
    /// Samples whose barcode had no tag.
    pub unmapped: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub script: PathBuf,
    pub sheet: Option<PathBuf>,
    pub unmapped: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DemuxBuilder {
    spec: DemuxSpec,
    config: PipelineConfig,
}

impl DemuxBuilder {
    pub fn new(spec: DemuxSpec, config: PipelineConfig) -> Self {
        Self { spec, config }
    }

    pub fn spec(&self) -> &DemuxSpec {
        &self.spec
    }

    pub fn build(&self, sheet: Option<SampleSheet>) -> Result<BuildOutput> {
        let plan = self.prepare(sheet)?;
        self.write(plan)
    }

    /// Validate and assemble. `sheet` falls back to the `SampleSheet.csv`
    /// already in the output directory for libraries that need one.
    pub fn prepare(&self, sheet: Option<SampleSheet>) -> Result<DemuxPlan> {
        let library = self.spec.library;
        log::info!("building {library} demultiplexing for run {}", self.spec.run_id);

        if library.requires_bases_mask() {
            require_bases_mask(library, &self.spec.tool_args)?;
        }

        let sheet = if library.needs_sample_sheet() {
            let sheet = match sheet {
                Some(s) => s,
                None => SampleSheet::read(&self.spec.sample_sheet())?,
            };
            if sheet.rows.is_empty() {
                return Err(self.no_records().into());
            }
            Some(sheet)
        } else {
            if sheet.is_some() {
                log::warn!("nano runs use a user supplied sample sheet; ignoring the generated one");
            }
            None
        };

        let template = self.config.transfer_template(library);
        if !template.exists() {
            return Err(DemuxError::missing("transfer template", &template).into());
        }

        let mut plan = DemuxPlan {
            command: Vec::new(),
            transfer: fs::read_to_string(&template)?,
            sheet,
            pre_tags: None,
            unmapped: Vec::new(),
        };

        plan.command = match library {
            LibraryType::Standard => self.standard_command(),
            LibraryType::TenX | LibraryType::TenXAtac | LibraryType::TenXLong => {
                self.swap_tags(&mut plan)?;
                let n_index = runinfo::count_index_reads(&self.spec.run_info())?;
                log::info!("{n_index} index read(s) declared in RunInfo.xml");
                self.tenx_command(n_index)
            }
            LibraryType::PatchPcr => {
                if let Some(sheet) = plan.sheet.as_mut() {
                    strip_masked_region(&mut sheet.rows)?;
                }
                self.short_read_command()
            }
            LibraryType::Nano => {
                log::info!(
                    "Trimming {} adapters...",
                    match self.spec.chemistry {
                        AdapterChemistry::Nextera => "Nextera",
                        AdapterChemistry::Illumina => "Illumina",
                    }
                );
                self.short_read_command()
            }
        };
        plan.command.extend(self.spec.tool_args.iter().cloned());
        Ok(plan)
    }

    fn swap_tags(&self, plan: &mut DemuxPlan) -> Result<()> {
        let Some(sheet) = plan.sheet.as_mut() else {
            return Ok(());
        };
        let Some(table_path) = self.config.tag_table(self.spec.library) else {
            return Ok(());
        };
        let table = TagTable::load(&table_path)?;
        log::info!("{} tags loaded from {}", table.len(), table_path.display());
        plan.pre_tags = Some(sheet.clone());
        plan.unmapped = tags::substitute_tags(&mut sheet.rows, &table);
        Ok(())
    }

    fn no_records(&self) -> DemuxError {
        DemuxError::NoRecords {
            run_id: self.spec.run_id.clone(),
        }
    }

    fn threads(&self) -> String {
        self.spec.threads.to_string()
    }

    pub fn standard_command(&self) -> Vec<String> {
        vec![
            self.config.tool_for(self.spec.library).display().to_string(),
            "--runfolder-dir".into(),
            "$IN_BCL2FASTQ".into(),
            "--sample-sheet".into(),
            "$OUT_BCL2FASTQ/SampleSheet.csv".into(),
            "--output-dir".into(),
            "$OUT_BCL2FASTQ".into(),
            "--processing-threads".into(),
            self.threads(),
        ]
    }

    /// Standard command that keeps reads shorter than bcl2fastq's defaults.
    pub fn short_read_command(&self) -> Vec<String> {
        let mut cmd = self.standard_command();
        cmd.extend(
            [
                "--minimum-trimmed-read-length",
                "0",
                "--mask-short-adapter-reads",
                "0",
            ]
            .map(String::from),
        );
        cmd
    }

    pub fn tenx_command(&self, n_index: usize) -> Vec<String> {
        let mut cmd = vec![
            self.config.tool_for(self.spec.library).display().to_string(),
            "mkfastq".into(),
            "--id=10x_mkfastq_log".into(),
            "--qc".into(),
            "--run=$IN_BCL2FASTQ".into(),
            "--output-dir=$OUT_BCL2FASTQ".into(),
            "--samplesheet=$OUT_BCL2FASTQ/SampleSheet.csv".into(),
        ];
        if self.spec.library.ignores_dual_index() && n_index == 2 {
            cmd.push("--ignore-dual-index".into());
        }
        cmd
    }

    pub fn render_script(&self, command: &[String], transfer: &str) -> String {
        let mut script = String::from("#!/bin/bash\n\nset -e\n");
        script += &format!("IN_BCL2FASTQ={}\n", self.spec.run_folder.display());
        script += &format!("OUT_BCL2FASTQ={}\n", self.spec.out_dir.display());
        script += &format!("RUN={}\n\n", self.spec.run_id);
        script += "cd $OUT_BCL2FASTQ\n\n";
        if self.spec.library == LibraryType::Nano {
            script += &format!("ADAPTER={}\n", self.spec.chemistry.sequence());
        }
        script += &command.join(" ");
        script += &format!("\n\n{TRANSFER_SEPARATOR}\n");
        script += transfer;
        script
    }

    /// Put the plan on disk: audit sheet, final sheet, then `demuxer.sh`.
    /// A plan whose sheet has no rows writes nothing.
    pub fn write(&self, plan: DemuxPlan) -> Result<BuildOutput> {
        if plan.sheet.as_ref().is_some_and(|s| s.rows.is_empty()) {
            return Err(self.no_records().into());
        }

        if let Some(pre) = &plan.pre_tags {
            pre.write(&self.spec.out_dir.join(SAMPLE_SHEET_PRE_TAGS))?;
        }
        let sheet = match &plan.sheet {
            Some(s) => match s.write(&self.spec.sample_sheet())? {
                SheetOutcome::Written(p) => Some(p),
                SheetOutcome::NoRecords => return Err(self.no_records().into()),
            },
            None => None,
        };

        let script = self.spec.script_path();
        fs::write(&script, self.render_script(&plan.command, &plan.transfer))
            .with_context(|| format!("write demultiplexing script {}", script.display()))?;
        make_executable(&script)?;
        log::info!("wrote {}", script.display());

        Ok(BuildOutput {
            script,
            sheet,
            unmapped: plan.unmapped,
        })
    }
}

#[cfg(unix)]
fn make_executable(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o111);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &std::path::Path) -> Result<()> {
    Ok(())
}
