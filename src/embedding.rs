use std::path::{Path, PathBuf};

use log::{info, warn};
use ndarray::{Array1, Array2};
use ndarray_npy::read_npy;
use regex::Regex;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// 从目录中读取的一组嵌入向量
#[derive(Debug, Clone)]
pub struct Embeddings {
    /// 文件名中第一个 `.` 之前的部分
    pub ids: Vec<String>,
    pub vectors: Vec<Vec<f64>>,
}

impl Embeddings {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.vectors.first().map(Vec::len).unwrap_or(0)
    }

    /// 输出时使用的图片名
    pub fn image_names(&self, image_ext: &str) -> Vec<String> {
        self.ids.iter().map(|id| format!("{}.{}", id, image_ext.trim_start_matches('.'))).collect()
    }
}

/// 扫描目录读取嵌入向量，按文件名排序
///
/// `.npy` 文件按 numpy 格式读取，其余文件按逗号或空白分隔的文本读取。
/// 无法读取或维度与第一个向量不一致的文件会被跳过。
pub fn load_embeddings(dir: &Path, suffix: &str) -> Result<Embeddings> {
    if !dir.is_dir() {
        return Err(Error::MissingInput(dir.to_path_buf()));
    }
    let re_suf = format!("(?i)^({})$", suffix.replace(',', "|"));
    let re_suf = Regex::new(&re_suf).map_err(|e| Error::malformed(e.to_string()))?;

    let entries = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();
            let ext = path.extension()?.to_string_lossy();
            (path.is_file() && re_suf.is_match(&ext)).then(|| path.to_path_buf())
        })
        .collect::<Vec<PathBuf>>();
    info!("在 {} 中找到 {} 个嵌入向量文件", dir.display(), entries.len());

    let mut embeddings = Embeddings { ids: vec![], vectors: vec![] };
    for path in entries {
        let vector = match read_vector(&path) {
            Ok(v) if v.is_empty() => {
                warn!("跳过空文件 {}", path.display());
                continue;
            }
            Ok(v) => v,
            Err(e) => {
                warn!("跳过 {}: {}", path.display(), e);
                continue;
            }
        };
        if !embeddings.is_empty() && vector.len() != embeddings.dim() {
            warn!("跳过 {}: 维度为 {}，应为 {}", path.display(), vector.len(), embeddings.dim());
            continue;
        }
        let name = path.file_name().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        let id = name.split('.').next().unwrap_or_default().to_string();
        embeddings.ids.push(id);
        embeddings.vectors.push(vector);
    }

    if embeddings.is_empty() {
        return Err(Error::MissingInput(dir.to_path_buf()));
    }
    info!("读取了 {} 个 {} 维的嵌入向量", embeddings.len(), embeddings.dim());
    Ok(embeddings)
}

fn read_vector(path: &Path) -> Result<Vec<f64>> {
    let is_npy = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("npy"));
    if is_npy { read_npy_vector(path) } else { read_text_vector(path) }
}

fn read_npy_vector(path: &Path) -> Result<Vec<f64>> {
    let err = |e: ndarray_npy::ReadNpyError| Error::malformed(format!("{}: {}", path.display(), e));
    if let Ok(v) = read_npy::<_, Array1<f32>>(path) {
        return Ok(v.iter().map(|&x| x as f64).collect());
    }
    if let Ok(v) = read_npy::<_, Array1<f64>>(path) {
        return Ok(v.to_vec());
    }
    if let Ok(v) = read_npy::<_, Array2<f32>>(path) {
        return Ok(v.iter().map(|&x| x as f64).collect());
    }
    read_npy::<_, Array2<f64>>(path).map(|v| v.iter().copied().collect()).map_err(err)
}

fn read_text_vector(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)?;
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>().map_err(|e| Error::malformed(format!("{}: {:?} {}", path.display(), s, e)))
        })
        .collect()
}
