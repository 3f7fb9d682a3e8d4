use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::*;
use crate::color::ColorMode;
use crate::reduce::TsneParams;

pub const DEFAULT_COLOR_OUTPUT: &str = "images_color_rgb.json";
pub const DEFAULT_REDUCED_OUTPUT: &str = "images_color_rgb_2D.json";
pub const DEFAULT_GRID_OUTPUT: &str = "images_grid.json";
pub const DEFAULT_TSNE_2D_OUTPUT: &str = "tsne_img_2D_coords.json";
pub const DEFAULT_TSNE_3D_OUTPUT: &str = "tsne_img_3D_coords.json";

#[derive(Parser, Debug, Clone)]
pub struct ImageInput {
    /// 缩放后的图片所在目录
    #[arg(short = 'd', long, value_name = "DIR")]
    pub resized_dir: PathBuf,
    /// 上游生成的拼图元数据 JSON
    #[arg(short, long, value_name = "FILE")]
    pub metadata: PathBuf,
}

#[derive(Parser, Debug, Clone)]
pub struct ColorOptions {
    /// 代表色的计算方式
    #[arg(long, value_enum, default_value_t = ColorMode::Dominant)]
    pub mode: ColorMode,
    /// 直方图最多统计的颜色种类，超出时退化为 (0, 0) 处的像素，默认为像素总数
    #[arg(long, value_name = "N")]
    pub max_colors: Option<usize>,
}

#[derive(Parser, Debug, Clone)]
pub struct PcaOptions {
    /// 输出维度
    #[arg(long, value_name = "N", default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub components: u8,
    /// 将每个坐标轴独立缩放到 [0, SCALE]，默认不缩放
    #[arg(long, value_name = "SCALE")]
    pub scale: Option<f64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsneComponents {
    /// 只输出二维坐标
    #[value(name = "2")]
    Two,
    /// 只输出三维坐标
    #[value(name = "3")]
    Three,
    /// 二维和三维都输出
    Both,
}

impl TsneComponents {
    pub fn dims(self) -> &'static [usize] {
        match self {
            Self::Two => &[2],
            Self::Three => &[3],
            Self::Both => &[3, 2],
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct TsneOptions {
    /// 输出维度
    #[arg(long, value_enum, default_value_t = TsneComponents::Both)]
    pub components: TsneComponents,
    /// 近邻数量参数，会被限制在样本数 - 1 以内
    #[arg(long, default_value_t = 30.0)]
    pub perplexity: f64,
    /// 坐标缩放到 [0, SCALE]
    #[arg(long, value_name = "SCALE", default_value_t = 25.0)]
    pub scale: f64,
    /// 最大迭代次数
    #[arg(long, value_name = "N", default_value_t = 1000)]
    pub max_iter: usize,
    /// 随机种子
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

impl TsneOptions {
    pub fn params(&self, n_components: usize) -> TsneParams {
        TsneParams {
            n_components,
            perplexity: self.perplexity,
            max_iter: self.max_iter,
            seed: self.seed,
            scale: Some(self.scale),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "imlayout", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 输出目录，默认为输入文件所在目录
    #[arg(short = 'O', long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 计算每张图片的代表色
    Color(ColorCommand),
    /// 对颜色做 PCA 降维
    Pca(PcaCommand),
    /// 对嵌入向量做 t-SNE 降维
    Tsne(TsneCommand),
    /// 将二维坐标分配到网格上
    Grid(GridCommand),
    /// 将 x、y、image_path 格式的 CSV 转为二维坐标 JSON
    Csv2json(Csv2JsonCommand),
    /// 依次执行颜色、PCA 和网格三个阶段
    Run(RunCommand),
}
