//! # 编码模块
//!
//! ## 设计思路
//!
//! 每种输出格式各自一条编码路径，格式相关的参数只在这里出现：
//!
//! | 格式 | quality | 说明 |
//! |------|---------|------|
//! | JPEG | 1-100 | 必须先拍平；只接受 RGB / 灰度缓冲 |
//! | PNG  | 忽略 | 无损；最高压缩 + 自适应滤波 |
//! | WEBP | 1-100 | 有损，method=6（最高压缩力度，`webp`） |
//! | AVIF | 1-100 | `image` 内置 AVIF 编码器 |
//!
//! 所有编码器都不写入 EXIF/XMP，输出天然不带元数据。

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::{DynamicImage, GenericImageView};

use super::source::{ColorMode, EncodedResult};
use super::{OutputFormat, TransformError};

/// AVIF 编码速度（1 最慢最好，10 最快）。
const AVIF_SPEED: u8 = 4;
/// WebP 压缩力度（0-6）。
const WEBP_METHOD: i32 = 6;

/// 按格式编码最终像素缓冲。
pub fn encode_image(
    image: &DynamicImage,
    format: OutputFormat,
    quality: u32,
) -> Result<EncodedResult, TransformError> {
    // PNG 忽略 quality；有损格式超出范围时不做截断
    let quality = match u8::try_from(quality) {
        Ok(q) if (1..=100).contains(&q) => q,
        _ if format.is_lossy() => {
            return Err(TransformError::EncodeFailure(format!(
                "{} 的 quality 必须在 1~100 之间（当前：{}）",
                format, quality
            )));
        }
        _ => 0,
    };

    let bytes = match format {
        OutputFormat::Jpeg => encode_jpeg(image, quality)?,
        OutputFormat::Png => encode_png(image)?,
        OutputFormat::WebP => encode_webp(image, quality)?,
        OutputFormat::Avif => encode_avif(image, quality)?,
    };

    let (width, height) = image.dimensions();
    Ok(EncodedResult {
        bytes: Bytes::from(bytes),
        format,
        width,
        height,
    })
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, TransformError> {
    // 只接受拍平后的缓冲；带 alpha 说明上游漏掉了合成步骤
    let mode = ColorMode::of(image);
    if mode.has_alpha() {
        return Err(TransformError::EncodeFailure(format!(
            "JPEG 不支持带透明通道的像素（{:?}），需先拍平",
            mode
        )));
    }

    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    image
        .write_with_encoder(encoder)
        .map_err(|e| TransformError::EncodeFailure(format!("JPEG 编码失败：{}", e)))?;
    Ok(buf.into_inner())
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, TransformError> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = PngEncoder::new_with_quality(&mut buf, CompressionType::Best, PngFilterType::Adaptive);
    image
        .write_with_encoder(encoder)
        .map_err(|e| TransformError::EncodeFailure(format!("PNG 编码失败：{}", e)))?;
    Ok(buf.into_inner())
}

fn encode_webp(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, TransformError> {
    let (width, height) = image.dimensions();

    let mut config = webp::WebPConfig::new()
        .map_err(|_| TransformError::EncodeFailure("WebP 配置初始化失败".to_string()))?;
    config.lossless = 0;
    config.quality = quality as f32;
    config.method = WEBP_METHOD;

    let memory = if ColorMode::of(image).has_alpha() {
        let rgba = image.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), width, height)
            .encode_advanced(&config)
            .map_err(|e| TransformError::EncodeFailure(format!("WebP 编码失败：{:?}", e)))?
    } else {
        let rgb = image.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), width, height)
            .encode_advanced(&config)
            .map_err(|e| TransformError::EncodeFailure(format!("WebP 编码失败：{:?}", e)))?
    };

    Ok(memory.to_vec())
}

fn encode_avif(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, TransformError> {
    let promoted = match ColorMode::of(image) {
        ColorMode::Luma => DynamicImage::ImageRgb8(image.to_rgb8()),
        ColorMode::LumaAlpha => DynamicImage::ImageRgba8(image.to_rgba8()),
        _ => image.clone(),
    };

    let mut buf = Cursor::new(Vec::new());
    let encoder = AvifEncoder::new_with_speed_quality(&mut buf, AVIF_SPEED, quality);
    promoted
        .write_with_encoder(encoder)
        .map_err(|e| TransformError::EncodeFailure(format!("AVIF 编码失败：{}", e)))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Luma, Rgb, Rgba};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    #[test]
    fn jpeg_output_has_jpeg_signature() {
        let encoded = encode_image(&gradient(32, 16), OutputFormat::Jpeg, 85).expect("jpeg encode");

        assert_eq!(encoded.mime_type(), "image/jpeg");
        assert_eq!(&encoded.bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(image::guess_format(&encoded.bytes).ok(), Some(ImageFormat::Jpeg));
    }

    #[test]
    fn jpeg_solid_color_survives_round_trip() {
        let solid = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(16, 16, Rgb([0x33, 0x66, 0xCC])));
        let encoded = encode_image(&solid, OutputFormat::Jpeg, 85).expect("jpeg encode");
        let decoded = image::load_from_memory(&encoded.bytes).expect("decode").to_rgb8();

        for pixel in decoded.pixels() {
            for (actual, expected) in pixel.0.iter().zip([0x33u8, 0x66, 0xCC]) {
                assert!(actual.abs_diff(expected) <= 6, "decoded {:?}", pixel);
            }
        }
    }

    #[test]
    fn jpeg_gradient_stays_close_to_source() {
        let source = gradient(64, 48);
        let encoded = encode_image(&source, OutputFormat::Jpeg, 90).expect("jpeg encode");
        let decoded = image::load_from_memory(&encoded.bytes).expect("decode").to_rgb8();

        let expected = source.to_rgb8();
        let total: u64 = decoded
            .as_raw()
            .iter()
            .zip(expected.as_raw())
            .map(|(a, b)| a.abs_diff(*b) as u64)
            .sum();
        let mean = total as f64 / expected.as_raw().len() as f64;
        assert!(mean < 8.0, "mean abs error {mean}");
    }

    #[test]
    fn png_accepts_any_quality() {
        for quality in [0u32, 100, 1000] {
            assert!(encode_image(&gradient(4, 4), OutputFormat::Png, quality).is_ok());
        }
    }

    #[test]
    fn jpeg_accepts_grayscale() {
        let gray = DynamicImage::ImageLuma8(ImageBuffer::from_pixel(8, 8, Luma([90])));
        let encoded = encode_image(&gray, OutputFormat::Jpeg, 70).expect("jpeg encode");
        let decoded = image::load_from_memory(&encoded.bytes).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (8, 8));
    }

    #[test]
    fn jpeg_rejects_unflattened_alpha() {
        let rgba = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(4, 4, Rgba([0, 0, 0, 0])));
        let result = encode_image(&rgba, OutputFormat::Jpeg, 80);
        assert!(matches!(result, Err(TransformError::EncodeFailure(_))));
    }

    #[test]
    fn lossy_quality_out_of_range_is_encode_failure() {
        for quality in [0u32, 101, 255, 300] {
            for format in [OutputFormat::Jpeg, OutputFormat::WebP, OutputFormat::Avif] {
                let result = encode_image(&gradient(4, 4), format, quality);
                assert!(matches!(result, Err(TransformError::EncodeFailure(_))));
            }
        }
    }

    #[test]
    fn png_ignores_quality_and_is_lossless() {
        let source = gradient(24, 24);
        let encoded = encode_image(&source, OutputFormat::Png, 0).expect("png encode");
        let decoded = image::load_from_memory(&encoded.bytes).expect("decode");

        assert_eq!(decoded.to_rgb8(), source.to_rgb8());
    }

    #[test]
    fn webp_output_has_riff_header() {
        let encoded = encode_image(&gradient(32, 32), OutputFormat::WebP, 75).expect("webp encode");
        assert_eq!(&encoded.bytes[..4], b"RIFF");
        assert_eq!(&encoded.bytes[8..12], b"WEBP");
        assert_eq!(encoded.mime_type(), "image/webp");
    }

    #[test]
    fn avif_output_has_ftyp_box() {
        let encoded = encode_image(&gradient(16, 16), OutputFormat::Avif, 60).expect("avif encode");
        assert_eq!(&encoded.bytes[4..8], b"ftyp");
        assert_eq!(encoded.mime_type(), "image/avif");
    }
}
