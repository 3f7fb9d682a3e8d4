use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressIterator};
use log::{info, warn};

use crate::color::{ColorExtractor, Rgb};
use crate::error::Result;
use crate::record::{ColorRecord, ImageRecord};
use crate::utils::pb_style;

/// 一次运行内的颜色缓存，键为缩放后的文件名
///
/// 提取失败也会被记录下来，同一个文件在一次运行中最多尝试一次。
#[derive(Debug, Default)]
pub struct ColorCache {
    colors: HashMap<String, Option<Rgb>>,
    order: Vec<String>,
}

impl ColorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// 已缓存的结果，`Some(None)` 表示提取失败
    pub fn get(&self, resized_filename: &str) -> Option<Option<Rgb>> {
        self.colors.get(resized_filename).copied()
    }

    /// 按首次加入的顺序遍历缓存
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<Rgb>)> {
        self.order.iter().map(|name| (name.as_str(), self.colors[name]))
    }

    /// 单张图片的错误会被缓存为失败，其余错误直接返回
    pub fn get_or_extract<E: ColorExtractor + ?Sized>(
        &mut self,
        image_dir: &Path,
        resized_filename: &str,
        extractor: &E,
    ) -> Result<Option<Rgb>> {
        if let Some(color) = self.get(resized_filename) {
            return Ok(color);
        }
        let color = match extractor.extract(&image_dir.join(resized_filename)) {
            Ok(color) => Some(color),
            Err(e) if e.is_per_record() => {
                warn!("{}", e);
                None
            }
            Err(e) => return Err(e),
        };
        self.colors.insert(resized_filename.to_string(), color);
        self.order.push(resized_filename.to_string());
        Ok(color)
    }

    /// 为所有不重复的缩放文件计算颜色，返回 (成功数, 失败数)
    pub fn fill<E: ColorExtractor + ?Sized>(
        &mut self,
        image_dir: &Path,
        records: &[ImageRecord],
        extractor: &E,
    ) -> Result<(usize, usize)> {
        let mut seen = HashSet::new();
        let unique = records
            .iter()
            .filter_map(|record| record.resized_filename.as_deref())
            .filter(|name| self.get(name).is_none() && seen.insert(*name))
            .collect::<Vec<_>>();
        info!("元数据中共有 {} 张不重复的缩放图片需要处理", unique.len());

        let (mut ok, mut failed) = (0, 0);
        let pb = ProgressBar::new(unique.len() as u64).with_style(pb_style());
        for name in unique.into_iter().progress_with(pb.clone()) {
            pb.set_message(name.to_string());
            match self.get_or_extract(image_dir, name, extractor)? {
                Some(_) => ok += 1,
                None => failed += 1,
            }
        }
        pb.finish_and_clear();
        info!("成功处理 {} 张图片，失败 {} 张", ok, failed);
        Ok((ok, failed))
    }
}

/// 一次流水线运行的上下文，运行结束时丢弃
#[derive(Debug)]
pub struct RunContext {
    pub image_dir: PathBuf,
    pub cache: ColorCache,
}

impl RunContext {
    pub fn new(image_dir: impl Into<PathBuf>) -> Self {
        Self { image_dir: image_dir.into(), cache: ColorCache::new() }
    }

    /// 计算颜色并按原始记录顺序输出
    pub fn resolve_colors<E: ColorExtractor + ?Sized>(
        &mut self,
        records: &[ImageRecord],
        extractor: &E,
    ) -> Result<Vec<ColorRecord>> {
        self.cache.fill(&self.image_dir, records, extractor)?;
        Ok(join_records(records, &self.cache))
    }
}

/// 将缓存中的颜色按原始顺序连接回每条记录
///
/// 缺少字段或颜色提取失败的记录会被丢弃。
pub fn join_records(records: &[ImageRecord], cache: &ColorCache) -> Vec<ColorRecord> {
    let mut output = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let (Some(original), Some(resized)) =
            (record.original_filename.as_deref(), record.resized_filename.as_deref())
        else {
            warn!("跳过第 {} 条元数据: 缺少 original_filename 或 resized_filename", i);
            continue;
        };
        match cache.get(resized) {
            Some(Some(color)) => output.push(ColorRecord::new(original, color)),
            Some(None) => warn!("跳过 {}: {} 的颜色提取失败", original, resized),
            None => warn!("跳过 {}: {} 不在缓存中", original, resized),
        }
    }
    output
}
