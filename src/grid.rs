use log::{debug, info};

use crate::error::{Error, Result};
use crate::record::GridPoint;

/// 接近正方形的网格尺寸 (列数, 行数)
pub fn grid_shape(n: usize) -> (usize, usize) {
    if n <= 1 {
        return (1, 1);
    }
    let cols = n.isqrt() + usize::from(n.isqrt().pow(2) != n);
    let rows = n.div_ceil(cols);
    (cols, rows)
}

/// 将连续的二维坐标分配到整数网格上，使总位移（平方距离）最小
///
/// 每个点占据一个独立的格子，多余的格子留空。输出顺序与输入一致。
pub fn assign_grid(labels: &[String], points: &[[f64; 2]]) -> Result<Vec<GridPoint>> {
    if labels.len() != points.len() {
        return Err(Error::malformed(format!(
            "坐标数量 {} 与图片数量 {} 不一致",
            points.len(),
            labels.len()
        )));
    }
    let n = points.len();
    if n == 0 {
        return Err(Error::degenerate("没有可以分配到网格的点"));
    }
    if points.iter().flatten().any(|v| !v.is_finite()) {
        return Err(Error::degenerate("坐标中包含非有限值"));
    }

    let (cols, rows) = grid_shape(n);
    info!("将 {} 个点分配到 {}x{} 的网格", n, cols, rows);

    let normalized = normalize(points);
    let cells: Vec<[f64; 2]> = (0..cols * rows)
        .map(|c| [cell_center(c % cols, cols), cell_center(c / cols, rows)])
        .collect();
    let cost = |i: usize, c: usize| {
        let (dx, dy) = (normalized[i][0] - cells[c][0], normalized[i][1] - cells[c][1]);
        dx * dx + dy * dy
    };

    let (assignment, total) = hungarian(n, cells.len(), cost);
    debug!("网格分配总代价 {:.4}", total);

    Ok(labels
        .iter()
        .zip(assignment)
        .map(|(image, c)| GridPoint {
            image: image.clone(),
            grid_x: (c % cols) as u32,
            grid_y: (c / cols) as u32,
        })
        .collect())
}

fn cell_center(i: usize, len: usize) -> f64 {
    if len > 1 { i as f64 / (len - 1) as f64 } else { 0.5 }
}

/// 每个轴独立归一化到 [0, 1]，常数轴放在 0.5
fn normalize(points: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let mut out = points.to_vec();
    for axis in 0..2 {
        let min = points.iter().map(|p| p[axis]).fold(f64::INFINITY, f64::min);
        let max = points.iter().map(|p| p[axis]).fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;
        for p in out.iter_mut() {
            p[axis] = if range > 0.0 { (p[axis] - min) / range } else { 0.5 };
        }
    }
    out
}

/// 矩形指派问题的匈牙利算法（带势函数），要求 n <= m
///
/// 返回每一行分配到的列，以及总代价。
pub fn hungarian(n: usize, m: usize, cost: impl Fn(usize, usize) -> f64) -> (Vec<usize>, f64) {
    assert!(n <= m, "行数必须不大于列数");
    // 下标从 1 开始，0 作为哨兵
    let mut u = vec![0.0; n + 1];
    let mut v = vec![0.0; m + 1];
    let mut p = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0;
        let mut minv = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];
        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0;
            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let cur = cost(i0 - 1, j - 1) - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }
            for j in 0..=m {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![0; n];
    let mut total = 0.0;
    for j in 1..=m {
        if p[j] != 0 {
            assignment[p[j] - 1] = j - 1;
            total += cost(p[j] - 1, j - 1);
        }
    }
    (assignment, total)
}

/// 拼图中从 1 开始、按行排列的图片序号
///
/// 行列均从 1 开始，列号不能超过 `n_cols`。
pub fn slot_of(row: usize, col: usize, n_cols: usize) -> Option<usize> {
    if row == 0 || col == 0 || col > n_cols {
        return None;
    }
    (row - 1).checked_mul(n_cols)?.checked_add(col)
}

/// 图片序号对应的 (行, 列)，均从 1 开始
pub fn row_col_of(slot: usize, n_cols: usize) -> Option<(usize, usize)> {
    if slot == 0 || n_cols == 0 {
        return None;
    }
    Some((slot.div_ceil(n_cols), (slot - 1) % n_cols + 1))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rstest::rstest;

    use super::*;

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}.png", i)).collect()
    }

    #[rstest]
    #[case(1, (1, 1))]
    #[case(2, (2, 1))]
    #[case(4, (2, 2))]
    #[case(5, (3, 2))]
    #[case(9, (3, 3))]
    #[case(10, (4, 3))]
    fn shape(#[case] n: usize, #[case] expected: (usize, usize)) {
        assert_eq!(grid_shape(n), expected);
    }

    #[test]
    fn four_points_fill_2x2() {
        let points = [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0], [10.0, 10.0]];
        let grid = assign_grid(&labels(4), &points).unwrap();
        let cells: Vec<_> = grid.iter().map(|g| (g.grid_x, g.grid_y)).collect();
        assert_eq!(cells, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn cells_are_distinct() {
        let points: Vec<[f64; 2]> =
            (0..23).map(|i| [(i as f64 * 1.7).sin(), (i as f64 * 0.3).cos()]).collect();
        let grid = assign_grid(&labels(23), &points).unwrap();
        let (cols, rows) = grid_shape(23);
        let cells: HashSet<_> = grid.iter().map(|g| (g.grid_x, g.grid_y)).collect();
        assert_eq!(cells.len(), 23);
        assert!(grid.iter().all(|g| (g.grid_x as usize) < cols && (g.grid_y as usize) < rows));
    }

    #[test]
    fn layout_is_preserved() {
        // 一条对角线上的点应当保持从左上到右下的顺序
        let points: Vec<[f64; 2]> = (0..9).map(|i| [i as f64, i as f64]).collect();
        let grid = assign_grid(&labels(9), &points).unwrap();
        assert_eq!((grid[0].grid_x, grid[0].grid_y), (0, 0));
        assert_eq!((grid[8].grid_x, grid[8].grid_y), (2, 2));
    }

    #[test]
    fn single_point() {
        let grid = assign_grid(&labels(1), &[[3.0, 4.0]]).unwrap();
        assert_eq!((grid[0].grid_x, grid[0].grid_y), (0, 0));
    }

    #[test]
    fn mismatch_is_rejected() {
        let result = assign_grid(&labels(2), &[[0.0, 0.0]]);
        assert!(matches!(result, Err(Error::MalformedInput(_))));
    }

    #[test]
    fn empty_is_rejected() {
        let result = assign_grid(&[], &[]);
        assert!(matches!(result, Err(Error::DegenerateNumericInput(_))));
    }

    #[test]
    fn hungarian_finds_optimum() {
        let cost = [[4.0, 1.0, 3.0], [2.0, 0.0, 5.0], [3.0, 2.0, 2.0]];
        let (assignment, total) = hungarian(3, 3, |i, j| cost[i][j]);
        assert_eq!(assignment, vec![1, 0, 2]);
        assert_eq!(total, 5.0);
    }

    #[test]
    fn hungarian_rectangular() {
        let cost = [[1.0, 9.0, 0.5], [9.0, 1.0, 9.0]];
        let (assignment, total) = hungarian(2, 3, |i, j| cost[i][j]);
        assert_eq!(assignment, vec![2, 1]);
        assert_eq!(total, 1.5);
    }

    #[test]
    fn montage_slots() {
        assert_eq!(slot_of(1, 1, 20), Some(1));
        assert_eq!(slot_of(2, 20, 20), Some(40));
        assert_eq!(row_col_of(40, 20), Some((2, 20)));
        assert_eq!(row_col_of(41, 20), Some((3, 1)));
        for slot in 1..=300 {
            let (row, col) = row_col_of(slot, 20).unwrap();
            assert_eq!(slot_of(row, col, 20), Some(slot));
        }
    }

    #[rstest]
    #[case(0, 1, 20)]
    #[case(1, 0, 20)]
    #[case(1, 21, 20)]
    #[case(1, 1, 0)]
    #[case(usize::MAX, 2, 20)]
    fn montage_slot_out_of_range(#[case] row: usize, #[case] col: usize, #[case] n_cols: usize) {
        assert_eq!(slot_of(row, col, n_cols), None);
    }

    #[test]
    fn montage_row_col_out_of_range() {
        assert_eq!(row_col_of(0, 20), None);
        assert_eq!(row_col_of(5, 0), None);
    }
}
