//! 降维：标准化 + PCA，或 t-SNE

mod pca;
mod tsne;

pub use pca::*;
pub use tsne::*;

use log::warn;
use ndarray::prelude::*;

use crate::error::{Error, Result};
use crate::record::ReducedPoint;

/// 由若干行向量构造 N×D 矩阵，所有行必须等长
pub fn to_matrix<V: AsRef<[f64]>>(rows: &[V]) -> Result<Array2<f64>> {
    let d = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
    let mut data = Vec::with_capacity(rows.len() * d);
    for (i, row) in rows.iter().enumerate() {
        let row = row.as_ref();
        if row.len() != d {
            return Err(Error::malformed(format!("第 {} 行长度为 {}，应为 {}", i, row.len(), d)));
        }
        data.extend_from_slice(row);
    }
    Array2::from_shape_vec((rows.len(), d), data)
        .map_err(|e| Error::ExternalToolFailure(e.to_string()))
}

/// 将 NaN / Inf 替换为 0，返回被替换的数量
pub fn replace_non_finite(x: &mut Array2<f64>) -> usize {
    let mut count = 0;
    x.mapv_inplace(|v| {
        if v.is_finite() {
            v
        } else {
            count += 1;
            0.0
        }
    });
    count
}

/// 对每一列独立做 min-max 缩放到 [0, scale]，常数列映射为 0
pub fn min_max_scale(x: &mut Array2<f64>, scale: f64) {
    for mut col in x.columns_mut() {
        let min = col.fold(f64::INFINITY, |a, &b| a.min(b));
        let max = col.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        let range = max - min;
        if range > 0.0 && range.is_finite() {
            col.mapv_inplace(|v| (v - min) / range * scale);
        } else {
            col.fill(0.0);
        }
    }
}

/// 将坐标矩阵与图片名组合为输出记录
///
/// 两列时输出 x/y，三列时额外输出 z；不足两列时用 0 补齐。
pub fn to_points(labels: &[String], coords: &Array2<f64>) -> Result<Vec<ReducedPoint>> {
    if labels.len() != coords.nrows() {
        return Err(Error::ExternalToolFailure(format!(
            "坐标行数 {} 与图片数量 {} 不一致",
            coords.nrows(),
            labels.len()
        )));
    }
    let k = coords.ncols();
    if k < 2 {
        warn!("只有 {} 个维度，缺失的坐标轴以 0 填充", k);
    }
    let axis = |row: ArrayView1<f64>, i: usize| row.get(i).copied().unwrap_or(0.0);
    Ok(labels
        .iter()
        .zip(coords.rows())
        .map(|(image, row)| ReducedPoint {
            image: image.clone(),
            x: axis(row, 0),
            y: axis(row, 1),
            z: (k >= 3).then(|| axis(row, 2)),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_max_scale_per_axis() {
        let mut x = array![[0.0, 10.0], [5.0, 20.0], [10.0, 30.0]];
        min_max_scale(&mut x, 25.0);
        assert_eq!(x, array![[0.0, 0.0], [12.5, 12.5], [25.0, 25.0]]);
    }

    #[test]
    fn min_max_scale_constant_axis() {
        let mut x = array![[1.0, 3.0], [2.0, 3.0]];
        min_max_scale(&mut x, 1.0);
        assert_eq!(x.column(1), array![0.0, 0.0]);
        assert_eq!(x.column(0), array![0.0, 1.0]);
    }

    #[test]
    fn non_finite_values_are_zeroed() {
        let mut x = array![[f64::NAN, 1.0], [f64::INFINITY, f64::NEG_INFINITY]];
        assert_eq!(replace_non_finite(&mut x), 3);
        assert_eq!(x, array![[0.0, 1.0], [0.0, 0.0]]);
    }

    #[test]
    fn to_matrix_rejects_ragged_rows() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(to_matrix(&rows), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn to_points_pads_missing_axis() {
        let labels = vec!["a".to_string(), "b".to_string()];
        let coords = array![[1.0], [2.0]];
        let points = to_points(&labels, &coords).unwrap();
        assert_eq!(points[1], ReducedPoint { image: "b".into(), x: 2.0, y: 0.0, z: None });
    }

    #[test]
    fn to_points_three_axes() {
        let labels = vec!["a".to_string()];
        let coords = array![[1.0, 2.0, 3.0]];
        let points = to_points(&labels, &coords).unwrap();
        assert_eq!(points[0].z, Some(3.0));
    }
}
