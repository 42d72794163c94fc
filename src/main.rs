//! alademux: sample sheet synthesis and demultiplexing script builder.
//! Entry point only; see `cli` and `subcommands/*`.

use alademux::cli::Cli;
use alademux::util::logging;
use anyhow::Result;

fn main() -> Result<()> {
    logging::init_logging();
    let cli = <Cli as clap::Parser>::parse();
    cli.run()
}
