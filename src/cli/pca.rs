use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::Opts;
use crate::cli::SubCommandExtend;
use crate::config::{DEFAULT_REDUCED_OUTPUT, PcaOptions};
use crate::pipeline::reduce_points;
use crate::record::{ReducedPoint, load_records, save_json};
use crate::utils::output_path;

#[derive(Parser, Debug, Clone)]
pub struct PcaCommand {
    #[command(flatten)]
    pub pca: PcaOptions,
    /// 颜色阶段输出的 JSON，每条记录包含 image、x、y、z
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,
    /// 输出文件名
    #[arg(long, value_name = "FILE", default_value = DEFAULT_REDUCED_OUTPUT)]
    pub output: PathBuf,
}

impl SubCommandExtend for PcaCommand {
    fn run(&self, opts: &Opts) -> Result<()> {
        let records: Vec<ReducedPoint> = load_records(&self.input)?;
        let points = reduce_points(&records, self.pca.components as usize, self.pca.scale)?;

        let output = output_path(opts.output_dir.as_deref(), &self.input, &self.output);
        save_json(&output, &points)?;
        Ok(())
    }
}
