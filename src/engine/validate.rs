//! # 输入校验模块
//!
//! ## 设计思路
//!
//! 在任何重量级解码之前尽早失败，降低恶意输入触发高内存开销的风险。
//! 校验顺序固定：体积 → 文件签名 → 文件头尺寸 → 百万像素。
//!
//! ## 实现思路
//!
//! - 体积检查只看 `bytes.len()`，不触碰内容。
//! - 文件签名用 `infer` 嗅探 magic bytes，不信任客户端声明的扩展名或 MIME。
//! - 尺寸只解析文件头（`ImageReader::into_dimensions`），不做完整解码。

use std::io::Cursor;

use image::ImageReader;

use super::config::megapixels;
use super::source::ProbedImage;
use super::{TransformError, ValidationLimits};

/// 校验输入字节并返回文件头信息。
pub fn validate_input(bytes: &[u8], limits: &ValidationLimits) -> Result<ProbedImage, TransformError> {
    validate_payload_size(bytes, limits.max_file_size)?;
    validate_image_signature(bytes)?;

    let probed = probe_header(bytes)?;
    if probed.megapixels > limits.max_megapixels {
        return Err(TransformError::ResolutionTooLarge(format!(
            "{}x{}（{:.2} MP，限制：{} MP）",
            probed.width, probed.height, probed.megapixels, limits.max_megapixels
        )));
    }

    Ok(probed)
}

fn validate_payload_size(bytes: &[u8], max_file_size: u64) -> Result<(), TransformError> {
    let size = bytes.len() as u64;
    if size > max_file_size {
        return Err(TransformError::PayloadTooLarge(format!(
            "{:.2} MB（限制：{:.2} MB）",
            size as f64 / 1024.0 / 1024.0,
            max_file_size as f64 / 1024.0 / 1024.0
        )));
    }
    Ok(())
}

/// 通过文件签名（magic bytes）校验输入是否为图片。
fn validate_image_signature(bytes: &[u8]) -> Result<(), TransformError> {
    if bytes.is_empty() {
        return Err(TransformError::UnsupportedMediaType("图片内容为空".to_string()));
    }

    let kind = infer::get(bytes)
        .ok_or_else(|| TransformError::UnsupportedMediaType("无法识别文件类型".to_string()))?;

    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(TransformError::UnsupportedMediaType(format!(
            "文件签名不是图片类型：{}",
            kind.mime_type()
        )));
    }

    Ok(())
}

/// 仅读取文件头得到格式与宽高。
fn probe_header(bytes: &[u8]) -> Result<ProbedImage, TransformError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| TransformError::CorruptImage(format!("无法识别图片格式：{}", e)))?;

    let format = reader
        .format()
        .ok_or_else(|| TransformError::UnsupportedMediaType("解码器不支持该图片格式".to_string()))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| TransformError::from_decode("无法读取图片尺寸", e))?;

    if width == 0 || height == 0 {
        return Err(TransformError::CorruptImage(format!(
            "图片尺寸无效：{}x{}",
            width, height
        )));
    }

    Ok(ProbedImage {
        format,
        width,
        height,
        megapixels: megapixels(width, height),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    #[test]
    fn accepts_small_png() {
        let probed = validate_input(&png_bytes(64, 32), &ValidationLimits::default())
            .expect("small png should pass");
        assert_eq!(probed.format, ImageFormat::Png);
        assert_eq!((probed.width, probed.height), (64, 32));
    }

    #[test]
    fn rejects_oversized_payload_before_sniffing() {
        let limits = ValidationLimits {
            max_file_size: 8,
            ..ValidationLimits::default()
        };
        // 纯文本且超限：必须报体积错误，而不是媒体类型错误
        let result = validate_input(b"definitely not an image", &limits);
        assert!(matches!(result, Err(TransformError::PayloadTooLarge(_))));
    }

    #[test]
    fn rejects_text_payload() {
        let result = validate_input(b"hello world, plain text", &ValidationLimits::default());
        assert!(matches!(result, Err(TransformError::UnsupportedMediaType(_))));
    }

    #[test]
    fn rejects_empty_payload() {
        let result = validate_input(&[], &ValidationLimits::default());
        assert!(matches!(result, Err(TransformError::UnsupportedMediaType(_))));
    }

    #[test]
    fn rejects_non_image_signature() {
        let pdf = b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n";
        let result = validate_input(pdf, &ValidationLimits::default());
        assert!(matches!(result, Err(TransformError::UnsupportedMediaType(_))));
    }

    #[test]
    fn truncated_png_is_corrupt() {
        let png = png_bytes(32, 32);
        let truncated = &png[..12];
        let result = validate_input(truncated, &ValidationLimits::default());
        assert!(matches!(result, Err(TransformError::CorruptImage(_))));
    }

    #[test]
    fn image_without_decoder_is_unsupported_media() {
        // 最小的 AVIF 文件头：infer 认作图片，但当前构建只编码不解码
        let mut avif = Vec::new();
        avif.extend_from_slice(&[0, 0, 0, 0x1C]);
        avif.extend_from_slice(b"ftypavif\x00\x00\x00\x00avifmif1miaf");

        let result = validate_input(&avif, &ValidationLimits::default());
        assert!(
            matches!(result, Err(TransformError::UnsupportedMediaType(_))),
            "got {:?}",
            result
        );
    }

    #[test]
    fn rejects_resolution_over_limit() {
        let limits = ValidationLimits {
            max_megapixels: 1.0,
            ..ValidationLimits::default()
        };
        let result = validate_input(&png_bytes(1025, 1024), &limits);
        assert!(matches!(result, Err(TransformError::ResolutionTooLarge(_))));

        assert!(validate_input(&png_bytes(1024, 1024), &limits).is_ok());
    }
}
