use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::Opts;
use crate::cli::SubCommandExtend;
use crate::config::{DEFAULT_TSNE_2D_OUTPUT, DEFAULT_TSNE_3D_OUTPUT, TsneOptions};
use crate::embedding::load_embeddings;
use crate::pipeline::reduce_embeddings;
use crate::record::save_json;
use crate::utils::output_path;

#[derive(Parser, Debug, Clone)]
pub struct TsneCommand {
    #[command(flatten)]
    pub tsne: TsneOptions,
    /// 嵌入向量所在目录，每个文件保存一张图片的向量
    #[arg(short = 'e', long, value_name = "DIR")]
    pub embeddings_dir: PathBuf,
    /// 读取的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = "npy,npz,txt,csv")]
    pub suffix: String,
    /// 输出记录中图片名使用的后缀
    #[arg(long, value_name = "EXT", default_value = "jpg")]
    pub image_ext: String,
    /// 二维结果的输出文件名
    #[arg(long, value_name = "FILE", default_value = DEFAULT_TSNE_2D_OUTPUT)]
    pub output_2d: PathBuf,
    /// 三维结果的输出文件名
    #[arg(long, value_name = "FILE", default_value = DEFAULT_TSNE_3D_OUTPUT)]
    pub output_3d: PathBuf,
}

impl SubCommandExtend for TsneCommand {
    fn run(&self, opts: &Opts) -> Result<()> {
        let embeddings = load_embeddings(&self.embeddings_dir, &self.suffix)?;

        for &k in self.tsne.components.dims() {
            let points = reduce_embeddings(&embeddings, &self.image_ext, &self.tsne.params(k))?;
            let file = if k == 3 { &self.output_3d } else { &self.output_2d };
            // 默认放在向量目录的上一级
            let output = output_path(opts.output_dir.as_deref(), &self.embeddings_dir, file);
            save_json(&output, &points)?;
            info!("{} 维 t-SNE 坐标已保存，共 {} 张图片", k, points.len());
        }
        Ok(())
    }
}
