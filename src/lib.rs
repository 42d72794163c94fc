pub mod cli;
pub mod config;
pub mod demux;
pub mod error;
pub mod model;
pub mod transform;

pub mod io {
    pub mod records;
    pub mod runinfo;
    pub mod samplesheet;
    pub mod tags;
}

pub mod util {
    pub mod logging;
    pub mod tools;
}

pub mod subcommands {
    pub mod build;
    pub mod preview;
    pub mod query;
    pub mod syscheck;
}
