use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::Opts;
use crate::cache::RunContext;
use crate::cli::SubCommandExtend;
use crate::color::ImageColorExtractor;
use crate::config::{ColorOptions, DEFAULT_COLOR_OUTPUT, ImageInput};
use crate::pipeline::{extract_colors, load_metadata};
use crate::record::save_json;
use crate::utils::output_path;

#[derive(Parser, Debug, Clone)]
pub struct ColorCommand {
    #[command(flatten)]
    pub input: ImageInput,
    #[command(flatten)]
    pub color: ColorOptions,
    /// 输出文件名，默认保存在元数据所在目录
    #[arg(long, value_name = "FILE", default_value = DEFAULT_COLOR_OUTPUT)]
    pub output: PathBuf,
}

impl SubCommandExtend for ColorCommand {
    fn run(&self, opts: &Opts) -> Result<()> {
        let records = load_metadata(&self.input.metadata)?;
        let extractor = ImageColorExtractor::new(self.color.mode, self.color.max_colors);
        let mut ctx = RunContext::new(&self.input.resized_dir);
        let colors = extract_colors(&mut ctx, &records, &extractor)?;

        let output = output_path(opts.output_dir.as_deref(), &self.input.metadata, &self.output);
        save_json(&output, &colors)?;
        Ok(())
    }
}
