//! `alademux query` — SQL for the LIMS export consumed by `build --records`.

use anyhow::Result;
use clap::Args;

use crate::io::records;

#[derive(Args, Debug)]
pub struct CmdQuery {
    #[arg(short = 'r', long, value_name = "RUN")]
    pub run_id: String,
    #[arg(short = 'l', long, num_args = 1.., value_delimiter = ',', value_name = "LANE")]
    pub lanes: Vec<u32>,
}

impl CmdQuery {
    pub fn run(self) -> Result<()> {
        let lanes = records::sanitize_lanes(&self.lanes);
        print!("{}", records::query_sql(&self.run_id, lanes.as_deref()));
        Ok(())
    }
}
