use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use clap::ValueEnum;
use image::RgbImage;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// 8 位 RGB 颜色
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub [u8; 3]);

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "({}, {}, {})", r, g, b)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// 出现次数最多的颜色
    #[default]
    Dominant,
    /// 各通道的算术平均
    Mean,
}

/// 为一张图片计算代表色
pub trait ColorExtractor {
    fn extract(&self, path: &Path) -> Result<Rgb>;
}

/// 从磁盘读取图片并计算代表色
#[derive(Debug, Clone, Default)]
pub struct ImageColorExtractor {
    pub mode: ColorMode,
    /// 直方图最多记录的颜色数量，默认为像素总数
    pub max_colors: Option<usize>,
}

impl ImageColorExtractor {
    pub fn new(mode: ColorMode, max_colors: Option<usize>) -> Self {
        Self { mode, max_colors }
    }

    pub fn extract_image(&self, image: &RgbImage) -> Option<Rgb> {
        match self.mode {
            ColorMode::Dominant => dominant_color(image, self.max_colors),
            ColorMode::Mean => mean_color(image),
        }
    }
}

impl ColorExtractor for ImageColorExtractor {
    fn extract(&self, path: &Path) -> Result<Rgb> {
        let image = image::open(path)
            .map_err(|e| Error::UnreadableImage { path: path.to_path_buf(), reason: e.to_string() })?
            .to_rgb8();
        self.extract_image(&image).ok_or_else(|| Error::UnreadableImage {
            path: path.to_path_buf(),
            reason: "图片尺寸为 0".to_string(),
        })
    }
}

/// 统计每种颜色的出现次数，按首次出现的顺序返回
///
/// 颜色种类超过 `max_colors` 时返回 None。
pub fn color_histogram(image: &RgbImage, max_colors: usize) -> Option<Vec<(u32, Rgb)>> {
    let mut index: HashMap<[u8; 3], usize> = HashMap::new();
    let mut hist: Vec<(u32, Rgb)> = vec![];
    for pixel in image.pixels() {
        match index.get(&pixel.0) {
            Some(&i) => hist[i].0 += 1,
            None => {
                if hist.len() == max_colors {
                    return None;
                }
                index.insert(pixel.0, hist.len());
                hist.push((1, Rgb(pixel.0)));
            }
        }
    }
    Some(hist)
}

/// 出现次数最多的颜色，次数相同时取最先出现的
///
/// 颜色种类超出直方图上限时退化为 (0, 0) 处的像素，这只是一个粗糙的兜底。
pub fn dominant_color(image: &RgbImage, max_colors: Option<usize>) -> Option<Rgb> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    let max_colors = max_colors.unwrap_or((w as usize) * (h as usize));
    match color_histogram(image, max_colors) {
        Some(hist) => hist
            .into_iter()
            .fold(None, |best: Option<(u32, Rgb)>, (count, color)| match best {
                Some((c, _)) if c >= count => best,
                _ => Some((count, color)),
            })
            .map(|(_, color)| color),
        None => {
            warn!("颜色种类超过 {}，使用 (0, 0) 处的像素", max_colors);
            Some(Rgb(image.get_pixel(0, 0).0))
        }
    }
}

/// 各通道的算术平均，截断为整数
pub fn mean_color(image: &RgbImage) -> Option<Rgb> {
    let (w, h) = image.dimensions();
    let n = w as u64 * h as u64;
    if n == 0 {
        return None;
    }
    let mut sum = [0u64; 3];
    for pixel in image.pixels() {
        for (s, &v) in sum.iter_mut().zip(pixel.0.iter()) {
            *s += v as u64;
        }
    }
    Some(Rgb(sum.map(|s| (s / n) as u8)))
}
