use indicatif::ProgressBar;
use log::{debug, info, warn};
use ndarray::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{min_max_scale, replace_non_finite};
use crate::error::{Error, Result};
use crate::utils::pb_style;

const EARLY_EXAGGERATION: f64 = 12.0;
const EXAGGERATION_ITER: usize = 250;
const MIN_GAIN: f64 = 0.01;
const PERPLEXITY_TOL: f64 = 1e-5;
const MACHINE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct TsneParams {
    pub n_components: usize,
    pub perplexity: f64,
    pub max_iter: usize,
    pub seed: u64,
    /// 缩放后的坐标范围上限，None 表示不缩放
    pub scale: Option<f64>,
}

impl Default for TsneParams {
    fn default() -> Self {
        Self { n_components: 2, perplexity: 30.0, max_iter: 1000, seed: 0, scale: Some(25.0) }
    }
}

/// 对 N×D 的嵌入向量做 t-SNE 降维
///
/// perplexity 会被限制在 N - 1 以内，结果按轴独立缩放到 `[0, scale]`。
pub fn tsne(x: &Array2<f64>, params: &TsneParams) -> Result<Array2<f64>> {
    let n = x.nrows();
    if n < 2 {
        return Err(Error::degenerate(format!("t-SNE 至少需要 2 个样本，实际为 {}", n)));
    }
    if params.n_components == 0 {
        return Err(Error::degenerate("输出维度不能为 0"));
    }
    let perplexity = params.perplexity.min((n - 1) as f64);
    if perplexity < params.perplexity {
        warn!("样本数量为 {}，perplexity 调整为 {}", n, perplexity);
    }
    if perplexity <= 0.0 {
        return Err(Error::degenerate(format!("无效的 perplexity: {}", perplexity)));
    }

    let mut x = x.to_owned();
    let replaced = replace_non_finite(&mut x);
    if replaced > 0 {
        warn!("{} 个非有限值被替换为 0", replaced);
    }

    let distances = squared_distances(&x);
    let p = joint_probabilities(&distances, perplexity);
    let mut y = optimize(&p, params)?;

    if y.iter().any(|v| !v.is_finite()) {
        return Err(Error::ExternalToolFailure("t-SNE 结果包含非有限值".to_string()));
    }
    if let Some(scale) = params.scale {
        min_max_scale(&mut y, scale);
    }
    Ok(y)
}

fn squared_distances(x: &Array2<f64>) -> Array2<f64> {
    let n = x.nrows();
    let norms = x.rows().into_iter().map(|r| r.dot(&r)).collect::<Vec<_>>();
    let gram = x.dot(&x.t());
    Array2::from_shape_fn((n, n), |(i, j)| {
        if i == j { 0.0 } else { (norms[i] + norms[j] - 2.0 * gram[[i, j]]).max(0.0) }
    })
}

/// 对每个点二分搜索高斯核的精度，使条件分布的熵匹配 ln(perplexity)，再对称化
fn joint_probabilities(distances: &Array2<f64>, perplexity: f64) -> Array2<f64> {
    let n = distances.nrows();
    let target = perplexity.ln();
    let mut p = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        let row = distances.row(i);
        let (mut beta, mut lo, mut hi) = (1.0f64, f64::NEG_INFINITY, f64::INFINITY);
        for _ in 0..100 {
            let mut sum = 0.0;
            let mut weighted = 0.0;
            for j in 0..n {
                if j == i {
                    p[[i, j]] = 0.0;
                    continue;
                }
                let v = (-row[j] * beta).exp();
                p[[i, j]] = v;
                sum += v;
                weighted += row[j] * v;
            }
            if sum <= 0.0 {
                sum = MACHINE_EPSILON;
            }
            let entropy = sum.ln() + beta * weighted / sum;
            p.row_mut(i).mapv_inplace(|v| v / sum);

            let diff = entropy - target;
            if diff.abs() <= PERPLEXITY_TOL {
                break;
            }
            if diff > 0.0 {
                lo = beta;
                beta = if hi.is_infinite() { beta * 2.0 } else { (beta + hi) / 2.0 };
            } else {
                hi = beta;
                beta = if lo.is_infinite() { beta / 2.0 } else { (beta + lo) / 2.0 };
            }
        }
    }

    let sym = &p + &p.t();
    let total = sym.sum().max(MACHINE_EPSILON);
    sym.mapv(|v| (v / total).max(MACHINE_EPSILON))
}

fn optimize(p: &Array2<f64>, params: &TsneParams) -> Result<Array2<f64>> {
    let n = p.nrows();
    let k = params.n_components;
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut y = Array2::from_shape_simple_fn((n, k), || 1e-4 * standard_normal(&mut rng));
    let mut update = Array2::<f64>::zeros((n, k));
    let mut gains = Array2::<f64>::ones((n, k));
    let learning_rate = (n as f64 / EARLY_EXAGGERATION / 4.0).max(50.0);

    info!("t-SNE: {} 个样本，{} 维输出，{} 轮迭代", n, k, params.max_iter);
    let pb = ProgressBar::new(params.max_iter as u64).with_style(pb_style());
    for iter in 0..params.max_iter {
        let (exaggeration, momentum) =
            if iter < EXAGGERATION_ITER { (EARLY_EXAGGERATION, 0.5) } else { (1.0, 0.8) };

        let num = student_t_kernel(&y);
        let sum_num = num.sum().max(MACHINE_EPSILON);
        let mut grad = Array2::<f64>::zeros((n, k));
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let q = (num[[i, j]] / sum_num).max(MACHINE_EPSILON);
                let coeff = 4.0 * (exaggeration * p[[i, j]] - q) * num[[i, j]];
                for c in 0..k {
                    grad[[i, c]] += coeff * (y[[i, c]] - y[[j, c]]);
                }
            }
        }

        azip!((g in &mut gains, &dy in &grad, &u in &update) {
            *g = if dy * u < 0.0 { *g + 0.2 } else { (*g * 0.8).max(MIN_GAIN) };
        });
        azip!((u in &mut update, &g in &gains, &dy in &grad) {
            *u = momentum * *u - learning_rate * g * dy;
        });
        y += &update;

        let mean = y.mean_axis(Axis(0)).ok_or_else(|| Error::ExternalToolFailure("空矩阵".into()))?;
        y -= &mean;

        if (iter + 1) % 50 == 0 {
            let kl = kl_divergence(p, &num, sum_num);
            debug!("t-SNE 第 {} 轮 KL 散度 {:.4}", iter + 1, kl);
            pb.set_message(format!("KL {:.4}", kl));
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(y)
}

/// (1 + |yi - yj|²)⁻¹，对角线为 0
fn student_t_kernel(y: &Array2<f64>) -> Array2<f64> {
    squared_distances(y).mapv(|d| 1.0 / (1.0 + d)) - Array2::<f64>::eye(y.nrows())
}

fn kl_divergence(p: &Array2<f64>, num: &Array2<f64>, sum_num: f64) -> f64 {
    let mut kl = 0.0;
    for ((i, j), &pij) in p.indexed_iter() {
        if i != j {
            let q = (num[[i, j]] / sum_num).max(MACHINE_EPSILON);
            kl += pij * (pij / q).ln();
        }
    }
    kl
}

/// Box-Muller 变换
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
