//! CLI definition and top-level dispatch.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::subcommands::{
    build::CmdBuild, preview::CmdPreview, query::CmdQuery, syscheck::CmdSyscheck,
};

#[derive(Parser, Debug)]
#[command(
    name = "alademux",
    version,
    about = "Sample sheet and demultiplexing script builder for Illumina runs"
)]
pub struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write SampleSheet.csv and demuxer.sh for a run
    Build(CmdBuild),

    /// Show a run's read configuration (and samples per lane)
    Preview(CmdPreview),

    /// Print the SQL that exports a run's sample records
    Query(CmdQuery),

    /// Check demultiplexers, resource files and host resources
    Syscheck(CmdSyscheck),
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.cmd {
            Commands::Build(cmd) => cmd.run(),
            Commands::Preview(cmd) => cmd.run(),
            Commands::Query(cmd) => cmd.run(),
            Commands::Syscheck(cmd) => cmd.run(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LibraryType;

    #[test]
    fn cli_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn passthrough_args_swallow_flags() {
        let cli = Cli::try_parse_from([
            "alademux", "build", "-r", "RUN", "-t", "10x", "-l", "1", "9", "1", "-b",
            "--use-bases-mask=Y28,I8,Y91", "--barcode-mismatches", "0",
        ])
        .unwrap();
        let Commands::Build(cmd) = cli.cmd else {
            panic!("expected build");
        };
        assert_eq!(cmd.library, LibraryType::TenX);
        assert_eq!(cmd.lanes, [1, 9, 1]);
        assert_eq!(
            cmd.bcl2fastq,
            ["--use-bases-mask=Y28,I8,Y91", "--barcode-mismatches", "0"]
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = Cli::try_parse_from(["alademux", "build", "-r", "RUN", "-t", "smartseq"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
