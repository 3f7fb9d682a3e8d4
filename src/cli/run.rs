use std::path::Path;

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::Opts;
use crate::cache::RunContext;
use crate::cli::SubCommandExtend;
use crate::color::ImageColorExtractor;
use crate::config::*;
use crate::pipeline::{extract_colors, grid_reduced, load_metadata, reduce_colors};
use crate::record::save_json;
use crate::utils::output_path;

/// 一次完成颜色、PCA、网格三个阶段，三个阶段共享同一个颜色缓存
#[derive(Parser, Debug, Clone)]
pub struct RunCommand {
    #[command(flatten)]
    pub input: ImageInput,
    #[command(flatten)]
    pub color: ColorOptions,
    #[command(flatten)]
    pub pca: PcaOptions,
}

impl SubCommandExtend for RunCommand {
    fn run(&self, opts: &Opts) -> Result<()> {
        let output = |name: &str| {
            output_path(opts.output_dir.as_deref(), &self.input.metadata, Path::new(name))
        };

        let records = load_metadata(&self.input.metadata)?;
        let extractor = ImageColorExtractor::new(self.color.mode, self.color.max_colors);
        let mut ctx = RunContext::new(&self.input.resized_dir);

        info!("阶段 1/3: 颜色");
        let colors = extract_colors(&mut ctx, &records, &extractor)?;
        save_json(&output(DEFAULT_COLOR_OUTPUT), &colors)?;

        info!("阶段 2/3: PCA");
        let points = reduce_colors(&colors, self.pca.components as usize, self.pca.scale)?;
        save_json(&output(DEFAULT_REDUCED_OUTPUT), &points)?;

        info!("阶段 3/3: 网格");
        let grid = grid_reduced(&points)?;
        save_json(&output(DEFAULT_GRID_OUTPUT), &grid)?;

        info!("完成，共输出 {} 条记录，涉及 {} 个不重复的缩放文件", colors.len(), ctx.cache.len());
        Ok(())
    }
}
