use std::path::Path;

use log::{info, warn};

use crate::error::{Error, Result};
use crate::record::ReducedPoint;

const REQUIRED_COLUMNS: [&str; 3] = ["x", "y", "image_path"];

/// 将包含 x、y、image_path 列的 CSV 转为二维坐标记录
///
/// 图片名取 image_path 的文件名部分，坐标无法解析或文件名为空的行会被跳过。
pub fn csv_to_points(path: &Path) -> Result<Vec<ReducedPoint>> {
    if !path.is_file() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)?;
    let mut rows = split_rows(&text).into_iter();

    let header = rows.next().map(|(_, row)| row).unwrap_or_default();
    let column = |name: &str| header.iter().position(|h| h == name);
    let (Some(xi), Some(yi), Some(pi)) = (column("x"), column("y"), column("image_path")) else {
        return Err(Error::malformed(format!(
            "CSV 必须包含 {:?} 列，实际为 {:?}",
            REQUIRED_COLUMNS, header
        )));
    };

    let mut points = vec![];
    let mut skipped = 0;
    for (row_num, row) in rows {
        let field = |idx: usize| row.get(idx).map(String::as_str).unwrap_or_default();
        let (x, y) = match (field(xi).parse::<f64>(), field(yi).parse::<f64>()) {
            (Ok(x), Ok(y)) => (x, y),
            _ => {
                warn!("第 {} 行的 x/y 无法转换为数字: {:?}", row_num, row);
                skipped += 1;
                continue;
            }
        };
        let image = basename(field(pi));
        if image.is_empty() {
            warn!("第 {} 行的 image_path {:?} 没有文件名", row_num, field(pi));
            skipped += 1;
            continue;
        }
        points.push(ReducedPoint { image: image.to_string(), x, y, z: None });
    }

    info!("成功转换 {} 行，跳过 {} 行", points.len(), skipped);
    Ok(points)
}

/// 将整个 CSV 文本拆分为行和字段，支持双引号包裹的字段（可包含逗号、换行和 `""`）
///
/// 返回每行起始的行号（从 1 开始）和字段，空行会被跳过。
fn split_rows(text: &str) -> Vec<(usize, Vec<String>)> {
    let mut rows = vec![];
    let mut fields = vec![];
    let mut field = String::new();
    let mut quoted = false;
    let (mut line, mut row_start) = (1, 1);
    let mut chars = text.chars().peekable();

    let mut end_row = |fields: &mut Vec<String>, field: &mut String, row_start: usize| {
        fields.push(std::mem::take(field).trim().to_string());
        let row = std::mem::take(fields);
        if !(row.len() == 1 && row[0].is_empty()) {
            rows.push((row_start, row));
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut field).trim().to_string()),
            '\r' if !quoted && chars.peek() == Some(&'\n') => {}
            '\n' if !quoted => {
                end_row(&mut fields, &mut field, row_start);
                line += 1;
                row_start = line;
            }
            '\n' => {
                field.push(c);
                line += 1;
            }
            _ => field.push(c),
        }
    }
    end_row(&mut fields, &mut field, row_start);
    rows
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or_default()
}
