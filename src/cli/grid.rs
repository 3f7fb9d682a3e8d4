use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::Opts;
use crate::cli::SubCommandExtend;
use crate::config::DEFAULT_GRID_OUTPUT;
use crate::pipeline::grid_points;
use crate::record::{load_coords, save_json};
use crate::utils::output_path;

#[derive(Parser, Debug, Clone)]
pub struct GridCommand {
    /// 二维坐标 JSON，支持 x/y 以及旧的 pca1/pca2 键
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,
    /// 输出文件名
    #[arg(long, value_name = "FILE", default_value = DEFAULT_GRID_OUTPUT)]
    pub output: PathBuf,
}

impl SubCommandExtend for GridCommand {
    fn run(&self, opts: &Opts) -> Result<()> {
        let (labels, points) = load_coords(&self.input)?;
        let grid = grid_points(&labels, &points)?;

        let output = output_path(opts.output_dir.as_deref(), &self.input, &self.output);
        save_json(&output, &grid)?;
        Ok(())
    }
}
