//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将流水线各阶段的中间结果拆成独立类型，单次调用内创建、用完即弃：
//! - `ProbedImage`：仅读取文件头得到的格式与尺寸（校验阶段输出）
//! - `SourceImage`：解码并规范化后的像素缓冲（解码阶段输出）
//! - `EncodedResult`：最终编码字节与 MIME（编码阶段输出）

use bytes::Bytes;
use image::{ColorType, DynamicImage, GenericImageView, ImageFormat};
use image::metadata::Orientation;

use super::OutputFormat;

/// 规范化后的颜色模式。
///
/// CMYK 与调色板模式只会在解码器内部短暂存在，出解码阶段后一定是以下四种之一。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Rgb,
    Rgba,
    Luma,
    LumaAlpha,
}

impl ColorMode {
    pub fn of(image: &DynamicImage) -> Self {
        match image.color() {
            ColorType::L8 | ColorType::L16 => Self::Luma,
            ColorType::La8 | ColorType::La16 => Self::LumaAlpha,
            ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => Self::Rgb,
            _ => Self::Rgba,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, Self::Rgba | Self::LumaAlpha)
    }
}

/// 校验阶段输出：文件头信息。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbedImage {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub megapixels: f64,
}

/// 解码阶段输出：方向已校正、颜色模式已规范化的像素缓冲。
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub pixels: DynamicImage,
    pub mode: ColorMode,
    /// 原始文件记录的方向；像素已按它旋转/翻转过。
    pub orientation: Orientation,
}

impl SourceImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// 编码阶段输出。
#[derive(Debug, Clone)]
pub struct EncodedResult {
    pub bytes: Bytes,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

impl EncodedResult {
    /// 形如 `image/<format>` 的 MIME 字符串。
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
