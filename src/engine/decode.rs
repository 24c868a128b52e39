//! # 解码与规范化模块
//!
//! ## 设计思路
//!
//! 把“字节 → 像素”的过程收敛到一个出口：`decode_and_normalize`。
//! 出口保证：
//! 1. 方向信息已物理作用到像素上，逻辑宽高等于显示宽高
//! 2. 颜色模式只可能是 RGB / RGBA / 灰度 / 灰度+alpha 的 8 位缓冲
//!
//! ## 实现思路
//!
//! - 通过 `ImageDecoder::orientation` 读取 EXIF 方向，再用 `apply_orientation` 旋转/翻转。
//! - CMYK JPEG 由解码器直接输出 RGB；调色板 PNG/GIF 解码后已展开为 RGB/RGBA（透明色变为 alpha）。
//! - 16 位与浮点缓冲统一降到 8 位，后续缩放与编码只处理 8 位像素。

use std::io::Cursor;

use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};

use super::source::{ColorMode, SourceImage};
use super::TransformError;

/// 解码并规范化像素缓冲。
pub fn decode_and_normalize(bytes: &[u8]) -> Result<SourceImage, TransformError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| TransformError::CorruptImage(format!("无法识别图片格式：{}", e)))?;

    let mut decoder = reader
        .into_decoder()
        .map_err(|e| TransformError::from_decode("无法创建解码器", e))?;

    // 方向元数据缺失或损坏时按“无旋转”处理，不影响像素解码
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);

    let mut decoded = DynamicImage::from_decoder(decoder)
        .map_err(|e| TransformError::from_decode("图片解码失败", e))?;

    decoded.apply_orientation(orientation);

    let pixels = normalize_color(decoded);
    let mode = ColorMode::of(&pixels);

    Ok(SourceImage {
        pixels,
        mode,
        orientation,
    })
}

/// 将任意颜色布局降到四种 8 位模式之一。
pub(crate) fn normalize_color(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_)
        | DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_) => image,
        other => match ColorMode::of(&other) {
            ColorMode::Rgb => DynamicImage::ImageRgb8(other.to_rgb8()),
            ColorMode::Rgba => DynamicImage::ImageRgba8(other.to_rgba8()),
            ColorMode::Luma => DynamicImage::ImageLuma8(other.to_luma8()),
            ColorMode::LumaAlpha => DynamicImage::ImageLumaA8(other.to_luma_alpha8()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb, Rgba};

    fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, format)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    /// 在 JPEG 的 SOI 之后插入只含 Orientation 标签的 APP1/Exif 段。
    fn jpeg_with_orientation(width: u32, height: u32, orientation: u16) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([200, 30, 30])));
        let jpeg = encode(&img, ImageFormat::Jpeg);

        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"MM\x00\x2A\x00\x00\x00\x08");
        tiff.extend_from_slice(&1u16.to_be_bytes());
        tiff.extend_from_slice(&0x0112u16.to_be_bytes());
        tiff.extend_from_slice(&3u16.to_be_bytes());
        tiff.extend_from_slice(&1u32.to_be_bytes());
        tiff.extend_from_slice(&orientation.to_be_bytes());
        tiff.extend_from_slice(&[0, 0]);
        tiff.extend_from_slice(&0u32.to_be_bytes());

        let mut payload = b"Exif\x00\x00".to_vec();
        payload.extend_from_slice(&tiff);

        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(&payload);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    #[test]
    fn decodes_png_as_rgba() {
        let img = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(8, 4, Rgba([1, 2, 3, 128])));
        let source = decode_and_normalize(&encode(&img, ImageFormat::Png)).expect("decode");

        assert_eq!(source.dimensions(), (8, 4));
        assert_eq!(source.mode, ColorMode::Rgba);
        assert!(source.mode.has_alpha());
    }

    #[test]
    fn applies_exif_rotation() {
        let bytes = jpeg_with_orientation(20, 10, 6);
        let source = decode_and_normalize(&bytes).expect("decode");

        assert_eq!(source.orientation, Orientation::Rotate90);
        assert_eq!(source.dimensions(), (10, 20));
    }

    #[test]
    fn missing_orientation_keeps_dimensions() {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(20, 10, Rgb([0, 0, 0])));
        let source = decode_and_normalize(&encode(&img, ImageFormat::Jpeg)).expect("decode");

        assert_eq!(source.orientation, Orientation::NoTransforms);
        assert_eq!(source.dimensions(), (20, 10));
        assert_eq!(source.mode, ColorMode::Rgb);
    }

    #[test]
    fn sixteen_bit_input_is_reduced_to_eight_bit() {
        let img = DynamicImage::ImageRgb16(ImageBuffer::from_pixel(4, 4, Rgb([65535u16, 0, 0])));
        let normalized = normalize_color(img);

        assert!(matches!(normalized, DynamicImage::ImageRgb8(_)));
        assert_eq!(normalized.to_rgb8().get_pixel(0, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn garbage_after_signature_is_corrupt() {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&[0xAB; 64]);

        assert!(matches!(
            decode_and_normalize(&bytes),
            Err(TransformError::CorruptImage(_))
        ));
    }
}
