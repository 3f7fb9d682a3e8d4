use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::color::Rgb;
use crate::error::{Error, Result};

/// 上游元数据中的一条记录，多个记录可能指向同一张缩放后的图片
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRecord {
    pub original_filename: Option<String>,
    pub resized_filename: Option<String>,
}

/// 颜色阶段的输出，x/y/z 分别对应 R/G/B
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ColorRecord {
    pub image: String,
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl ColorRecord {
    pub fn new(image: impl Into<String>, color: Rgb) -> Self {
        let [x, y, z] = color.0;
        Self { image: image.into(), x, y, z }
    }

    pub fn color(&self) -> Rgb {
        Rgb([self.x, self.y, self.z])
    }
}

/// 降维后的坐标
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ReducedPoint {
    pub image: String,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

/// 网格化后的坐标
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GridPoint {
    pub image: String,
    pub grid_x: u32,
    pub grid_y: u32,
}

/// 读取二维坐标时使用的兼容层
///
/// 旧文件使用 `pca1`/`pca2` 作为坐标键，新文件使用 `x`/`y`，两者都存在时以 `x`/`y` 为准。
#[derive(Deserialize, Debug, Clone, Default)]
pub struct CoordRecord {
    pub image: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub pca1: Option<f64>,
    pub pca2: Option<f64>,
}

impl CoordRecord {
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.x, self.y, self.pca1, self.pca2) {
            (Some(x), Some(y), _, _) => Some((x, y)),
            (_, _, Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }
}

/// 读取一个 JSON 数组，逐条反序列化，无法解析的条目会被跳过
///
/// 顶层不是数组时返回 `MalformedInput`。
pub fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let entries = load_json_array(path)?;
    let mut records = Vec::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value(entry) {
            Ok(record) => records.push(record),
            Err(e) => warn!("跳过第 {} 条记录: {}", i, e),
        }
    }
    Ok(records)
}

fn load_json_array(path: &Path) -> Result<Vec<Value>> {
    if !path.is_file() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let reader = BufReader::new(File::open(path)?);
    let value: Value = serde_json::from_reader(reader)
        .map_err(|e| Error::malformed(format!("{}: {}", path.display(), e)))?;
    match value {
        Value::Array(entries) => Ok(entries),
        _ => Err(Error::malformed(format!("{}: 顶层必须是数组", path.display()))),
    }
}

/// 读取二维坐标文件，缺少坐标的记录会被跳过
pub fn load_coords(path: &Path) -> Result<(Vec<String>, Vec<[f64; 2]>)> {
    let records: Vec<CoordRecord> = load_records(path)?;
    let mut labels = vec![];
    let mut points = vec![];
    for record in records {
        let image = record.image.clone().unwrap_or_else(|| "Unknown".to_string());
        match record.position() {
            Some((x, y)) => {
                labels.push(image);
                points.push([x, y]);
            }
            None => warn!("跳过 {}: 缺少 x/y 或 pca1/pca2 坐标", image),
        }
    }
    if points.is_empty() {
        return Err(Error::malformed(format!("{} 中没有有效的坐标", path.display())));
    }
    info!("从 {} 读取了 {} 个坐标", path.display(), points.len());
    Ok((labels, points))
}

/// 以缩进格式写出 JSON
///
/// 所在目录不存在时会先创建。先写入临时文件再重命名，失败时不会留下不完整的输出。
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let io_err = |source| Error::Write { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut tmp_file = path.as_os_str().to_owned();
    tmp_file.push(".tmp");
    let tmp_file = Path::new(&tmp_file);

    let write = || -> Result<()> {
        let mut writer = BufWriter::new(File::create(tmp_file).map_err(io_err)?);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
        value
            .serialize(&mut ser)
            .map_err(|e| Error::ExternalToolFailure(format!("JSON 序列化失败: {}", e)))?;
        writer.write_all(b"\n").map_err(io_err)?;
        writer.flush().map_err(io_err)?;
        Ok(())
    };

    if let Err(e) = write() {
        let _ = std::fs::remove_file(tmp_file);
        return Err(e);
    }
    std::fs::rename(tmp_file, path).map_err(io_err)?;
    info!("已保存 {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coord_record_prefers_xy() {
        let record: CoordRecord =
            serde_json::from_str(r#"{"image":"a","x":1,"y":2,"pca1":3,"pca2":4}"#).unwrap();
        assert_eq!(record.position(), Some((1.0, 2.0)));
    }

    #[test]
    fn coord_record_legacy_keys() {
        let record: CoordRecord =
            serde_json::from_str(r#"{"image":"a","pca1":3.5,"pca2":-4}"#).unwrap();
        assert_eq!(record.position(), Some((3.5, -4.0)));
    }

    #[test]
    fn coord_record_partial_pair() {
        let record: CoordRecord = serde_json::from_str(r#"{"image":"a","x":1,"pca2":4}"#).unwrap();
        assert_eq!(record.position(), None);
    }

    #[test]
    fn load_records_skips_bad_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        std::fs::write(
            &path,
            r#"[{"original_filename":"a.png","resized_filename":"r.png","montage_name":"m"}, 42]"#,
        )
        .unwrap();
        let records: Vec<ImageRecord> = load_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].resized_filename.as_deref(), Some("r.png"));
    }

    #[test]
    fn load_records_rejects_non_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        std::fs::write(&path, r#"{"a": 1}"#).unwrap();
        let result = load_records::<ImageRecord>(&path);
        assert!(matches!(result, Err(Error::MalformedInput(_))));
    }

    #[test]
    fn load_records_missing_file() {
        let result = load_records::<ImageRecord>(Path::new("/nonexistent/meta.json"));
        assert!(matches!(result, Err(Error::MissingInput(_))));
    }

    #[test]
    fn load_coords_mixed_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coords.json");
        std::fs::write(
            &path,
            r#"[{"image":"a","x":1,"y":2},{"image":"b","pca1":3,"pca2":4},{"image":"c"}]"#,
        )
        .unwrap();
        let (labels, points) = load_coords(&path).unwrap();
        assert_eq!(labels, vec!["a", "b"]);
        assert_eq!(points, vec![[1.0, 2.0], [3.0, 4.0]]);
    }

    #[test]
    fn save_json_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let points = vec![ReducedPoint { image: "a".into(), x: 1.0, y: 2.0, z: None }];
        save_json(&path, &points).unwrap();
        assert!(!dir.path().join("out.json.tmp").exists());
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("\"z\""));
        let loaded: Vec<ReducedPoint> = serde_json::from_str(&text).unwrap();
        assert_eq!(loaded, points);
    }

    #[test]
    fn save_json_creates_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new/nested/grid.json");
        let grid = vec![GridPoint { image: "a".into(), grid_x: 0, grid_y: 1 }];
        save_json(&path, &grid).unwrap();
        let loaded: Vec<GridPoint> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, grid);
    }

    #[test]
    fn save_json_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let path = blocker.join("out.json");

        let err = save_json(&path, &Vec::<GridPoint>::new()).unwrap_err();
        assert!(matches!(&err, Error::Write { path: p, .. } if p == &path));
        assert!(err.to_string().contains("out.json"));
    }
}
