use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;

use crate::Opts;
use crate::cli::SubCommandExtend;
use crate::config::DEFAULT_REDUCED_OUTPUT;
use crate::convert::csv_to_points;
use crate::record::save_json;
use crate::utils::output_path;

#[derive(Parser, Debug, Clone)]
pub struct Csv2JsonCommand {
    /// 包含 x、y、image_path 三列的 CSV
    #[arg(short, long, value_name = "FILE")]
    pub input_csv: PathBuf,
    /// 输出文件名，默认保存在 CSV 所在目录
    #[arg(long, value_name = "FILE", default_value = DEFAULT_REDUCED_OUTPUT)]
    pub output: PathBuf,
}

impl SubCommandExtend for Csv2JsonCommand {
    fn run(&self, opts: &Opts) -> Result<()> {
        let points = csv_to_points(&self.input_csv)?;
        if points.is_empty() {
            bail!("{} 中没有可以转换的行，不会生成输出文件", self.input_csv.display());
        }

        let output = output_path(opts.output_dir.as_deref(), &self.input_csv, &self.output);
        save_json(&output, &points)?;
        Ok(())
    }
}
