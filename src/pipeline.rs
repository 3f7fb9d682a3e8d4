//! 各个处理阶段，每个阶段读取完整输入并返回完整输出

use std::path::Path;

use log::{info, warn};

use crate::cache::RunContext;
use crate::color::ColorExtractor;
use crate::embedding::Embeddings;
use crate::error::{Error, Result};
use crate::grid::assign_grid;
use crate::record::{ColorRecord, GridPoint, ImageRecord, ReducedPoint, load_records};
use crate::reduce::{TsneParams, min_max_scale, pca, to_matrix, to_points, tsne};

/// 读取上游元数据
pub fn load_metadata(metadata: &Path) -> Result<Vec<ImageRecord>> {
    let records: Vec<ImageRecord> = load_records(metadata)?;
    if records.is_empty() {
        return Err(Error::malformed(format!("{} 中没有图片元数据", metadata.display())));
    }
    info!("读取了 {} 条元数据", records.len());
    Ok(records)
}

/// 颜色阶段：每个缩放文件只计算一次，按原始记录顺序输出
pub fn extract_colors<E: ColorExtractor + ?Sized>(
    ctx: &mut RunContext,
    records: &[ImageRecord],
    extractor: &E,
) -> Result<Vec<ColorRecord>> {
    if !ctx.image_dir.is_dir() {
        return Err(Error::MissingInput(ctx.image_dir.clone()));
    }
    info!("分析 {} 中的图片", ctx.image_dir.display());
    let colors = ctx.resolve_colors(records, extractor)?;
    if colors.is_empty() {
        return Err(Error::degenerate("没有成功提取任何颜色"));
    }
    if colors.len() < records.len() {
        warn!("{} 条记录中有 {} 条被跳过", records.len(), records.len() - colors.len());
    }
    Ok(colors)
}

/// 对颜色做 PCA 降维
pub fn reduce_colors(
    colors: &[ColorRecord],
    n_components: usize,
    scale: Option<f64>,
) -> Result<Vec<ReducedPoint>> {
    let labels = colors.iter().map(|c| c.image.clone()).collect::<Vec<_>>();
    let rows = colors.iter().map(|c| c.color().0.map(f64::from)).collect::<Vec<_>>();
    reduce_rows(&labels, &rows, n_components, scale)
}

/// 对任意坐标记录（x、y 以及可选的 z）做 PCA 降维
///
/// 维度与第一条记录不一致的记录会被跳过。
pub fn reduce_points(
    points: &[ReducedPoint],
    n_components: usize,
    scale: Option<f64>,
) -> Result<Vec<ReducedPoint>> {
    let has_z = points.first().is_some_and(|p| p.z.is_some());
    let mut labels = vec![];
    let mut rows = vec![];
    for p in points {
        match (has_z, p.z) {
            (true, Some(z)) => rows.push(vec![p.x, p.y, z]),
            (false, None) => rows.push(vec![p.x, p.y]),
            _ => {
                warn!("跳过 {}: 维度与其他记录不一致", p.image);
                continue;
            }
        }
        labels.push(p.image.clone());
    }
    reduce_rows(&labels, &rows, n_components, scale)
}

fn reduce_rows<V: AsRef<[f64]>>(
    labels: &[String],
    rows: &[V],
    n_components: usize,
    scale: Option<f64>,
) -> Result<Vec<ReducedPoint>> {
    let x = to_matrix(rows)?;
    let mut projection = pca(&x, n_components)?;
    info!(
        "PCA 完成，{} 个样本，解释方差比例 {:?}",
        x.nrows(),
        projection.explained_variance_ratio
    );
    if let Some(scale) = scale {
        min_max_scale(&mut projection.coords, scale);
    }
    to_points(labels, &projection.coords)
}

/// 对嵌入向量做 t-SNE 降维
pub fn reduce_embeddings(
    embeddings: &Embeddings,
    image_ext: &str,
    params: &TsneParams,
) -> Result<Vec<ReducedPoint>> {
    let x = to_matrix(&embeddings.vectors)?;
    let coords = tsne(&x, params)?;
    to_points(&embeddings.image_names(image_ext), &coords)
}

/// 网格阶段
pub fn grid_points(labels: &[String], points: &[[f64; 2]]) -> Result<Vec<GridPoint>> {
    assign_grid(labels, points)
}

/// 从降维结果中取出前两个坐标轴做网格分配
pub fn grid_reduced(points: &[ReducedPoint]) -> Result<Vec<GridPoint>> {
    let labels = points.iter().map(|p| p.image.clone()).collect::<Vec<_>>();
    let coords = points.iter().map(|p| [p.x, p.y]).collect::<Vec<_>>();
    grid_points(&labels, &coords)
}
