//! # 透明度拍平模块
//!
//! 输出格式不支持 alpha（JPEG）而缓冲带透明通道时，以缓冲自身的 alpha 作为遮罩，
//! 合成到背景色的不透明画布上。灰度+alpha 先提升为 RGBA 再合成；
//! 已经不透明的缓冲原样返回。该步骤只在缩放之后、编码之前执行。

use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};

use super::source::ColorMode;
use super::{BackgroundColor, OutputFormat};

/// 按输出格式决定是否需要拍平。
pub fn flatten_for_format(
    image: DynamicImage,
    format: OutputFormat,
    background: BackgroundColor,
) -> DynamicImage {
    if format.supports_alpha() || !ColorMode::of(&image).has_alpha() {
        return image;
    }

    DynamicImage::ImageRgb8(flatten(&image, background))
}

/// 以 alpha 为遮罩把图像合成到背景色上。
pub fn flatten(image: &DynamicImage, background: BackgroundColor) -> RgbImage {
    let rgba = image.to_rgba8();
    let bg = [background.r, background.g, background.b];

    ImageBuffer::from_fn(rgba.width(), rgba.height(), |x, y| {
        let px = rgba.get_pixel(x, y).0;
        let alpha = px[3] as u32;
        let mut out = [0u8; 3];
        for channel in 0..3 {
            let blended = px[channel] as u32 * alpha + bg[channel] as u32 * (255 - alpha);
            out[channel] = ((blended + 127) / 255) as u8;
        }
        Rgb(out)
    })
}
