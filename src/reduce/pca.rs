use log::{debug, warn};
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::prelude::*;

use super::replace_non_finite;
use crate::error::{Error, Result};

/// PCA 的结果
#[derive(Debug, Clone)]
pub struct Projection {
    /// N×K 投影坐标，K 为实际可用的主成分数量
    pub coords: Array2<f64>,
    /// 每个主成分解释的方差比例
    pub explained_variance_ratio: Vec<f64>,
    /// 方差为 0、被替换为常数 0 的列
    pub constant_columns: Vec<usize>,
}

/// 将每一列标准化为均值 0、方差 1（总体方差）
///
/// 方差为 0 的列整体替换为 0，并返回这些列的下标。
pub fn standardize(x: &mut Array2<f64>) -> Vec<usize> {
    let mut constant = vec![];
    for (j, mut col) in x.columns_mut().into_iter().enumerate() {
        let n = col.len() as f64;
        let mean = col.sum() / n;
        let var = col.fold(0.0, |acc, &v| acc + (v - mean).powi(2)) / n;
        let std = var.sqrt();
        if std > f64::EPSILON && std.is_finite() {
            col.mapv_inplace(|v| (v - mean) / std);
        } else {
            constant.push(j);
            col.fill(0.0);
        }
    }
    constant
}

/// 标准化后投影到前 `n_components` 个主成分上
///
/// 实际输出的维度为 `min(n_components, N, D)`。样本少于 2 个时返回错误。
pub fn pca(x: &Array2<f64>, n_components: usize) -> Result<Projection> {
    let (n, d) = x.dim();
    if n < 2 {
        return Err(Error::degenerate(format!("PCA 至少需要 2 个样本，实际为 {}", n)));
    }
    if d == 0 {
        return Err(Error::degenerate("PCA 输入没有特征"));
    }

    let mut x = x.to_owned();
    let replaced = replace_non_finite(&mut x);
    if replaced > 0 {
        warn!("{} 个非有限值被替换为 0", replaced);
    }
    let constant_columns = standardize(&mut x);
    if !constant_columns.is_empty() {
        warn!("第 {:?} 列方差为 0，已替换为常数 0", constant_columns);
    }
    replace_non_finite(&mut x);

    let k = n_components.min(n).min(d);
    if k < n_components {
        warn!("样本数 {} / 特征数 {} 不足，只能输出 {} 个主成分", n, d, k);
    }

    let cov = x.t().dot(&x) / (n - 1) as f64;
    let cov = DMatrix::from_fn(d, d, |i, j| cov[[i, j]]);
    let eigen = SymmetricEigen::try_new(cov, f64::EPSILON, 0)
        .ok_or_else(|| Error::ExternalToolFailure("协方差矩阵特征分解未收敛".to_string()))?;

    let mut order: Vec<usize> = (0..d).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let total: f64 = eigen.eigenvalues.iter().map(|v| v.max(0.0)).sum();
    let mut components = Array2::<f64>::zeros((d, k));
    let mut explained_variance_ratio = Vec::with_capacity(k);
    for (c, &idx) in order.iter().take(k).enumerate() {
        let mut component = Array1::from_iter(eigen.eigenvectors.column(idx).iter().copied());
        // 固定符号：绝对值最大的分量为正
        let pivot = component.iter().copied().fold(0.0f64, |a, v| if v.abs() > a.abs() { v } else { a });
        if pivot < 0.0 {
            component.mapv_inplace(|v| -v);
        }
        components.column_mut(c).assign(&component);
        let ev = eigen.eigenvalues[idx].max(0.0);
        explained_variance_ratio.push(if total > 0.0 { ev / total } else { 0.0 });
    }
    debug!("PCA 解释方差比例: {:?}", explained_variance_ratio);

    let mut coords = x.dot(&components);
    replace_non_finite(&mut coords);
    Ok(Projection { coords, explained_variance_ratio, constant_columns })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distances(x: &Array2<f64>) -> Vec<f64> {
        let mut d = vec![];
        for i in 0..x.nrows() {
            for j in i + 1..x.nrows() {
                let diff = &x.row(i) - &x.row(j);
                d.push(diff.dot(&diff).sqrt());
            }
        }
        d
    }

    fn colors() -> Array2<f64> {
        array![
            [255.0, 0.0, 0.0],
            [250.0, 10.0, 5.0],
            [0.0, 255.0, 0.0],
            [10.0, 240.0, 20.0],
            [0.0, 0.0, 255.0],
            [30.0, 30.0, 200.0],
        ]
    }

    #[test]
    fn standardize_zero_variance_column() {
        let mut x = array![[1.0, 5.0], [3.0, 5.0]];
        let constant = standardize(&mut x);
        assert_eq!(constant, vec![1]);
        assert_eq!(x, array![[-1.0, 0.0], [1.0, 0.0]]);
    }

    #[test]
    fn pca_output_shape() {
        let result = pca(&colors(), 2).unwrap();
        assert_eq!(result.coords.dim(), (6, 2));
        assert_eq!(result.explained_variance_ratio.len(), 2);
        assert!(result.explained_variance_ratio[0] >= result.explained_variance_ratio[1]);
        assert!(result.coords.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn pca_is_stable_across_runs() {
        let a = pca(&colors(), 2).unwrap();
        let b = pca(&colors(), 2).unwrap();
        for (x, y) in distances(&a.coords).iter().zip(distances(&b.coords).iter()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn pca_full_rank_preserves_standardized_distances() {
        let mut standardized = colors();
        standardize(&mut standardized);
        let result = pca(&colors(), 3).unwrap();
        for (x, y) in distances(&standardized).iter().zip(distances(&result.coords).iter()) {
            assert!((x - y).abs() < 1e-6, "{} != {}", x, y);
        }
    }

    #[test]
    fn pca_components_are_centered() {
        let result = pca(&colors(), 2).unwrap();
        for col in result.coords.columns() {
            assert!(col.sum().abs() < 1e-9);
        }
    }

    #[test]
    fn pca_single_feature() {
        let x = array![[1.0], [2.0], [4.0]];
        let result = pca(&x, 2).unwrap();
        assert_eq!(result.coords.ncols(), 1);
    }

    #[test]
    fn pca_too_few_samples() {
        let x = array![[1.0, 2.0, 3.0]];
        assert!(matches!(pca(&x, 2), Err(Error::DegenerateNumericInput(_))));
    }

    #[test]
    fn pca_constant_input() {
        let x = array![[7.0, 7.0, 7.0], [7.0, 7.0, 7.0], [7.0, 7.0, 7.0]];
        let result = pca(&x, 2).unwrap();
        assert_eq!(result.constant_columns, vec![0, 1, 2]);
        assert!(result.coords.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn pca_with_nan() {
        let x = array![[f64::NAN, 1.0, 2.0], [3.0, f64::INFINITY, 1.0], [2.0, 2.0, 0.0]];
        let result = pca(&x, 2).unwrap();
        assert!(result.coords.iter().all(|v| v.is_finite()));
    }
}
