//! # 变换流水线
//!
//! ## 设计思路
//!
//! `transform` 是引擎唯一的对外入口，是一个纯同步函数：
//! `(bytes, &TransformRequest, &ValidationLimits) -> Result<EncodedResult, TransformError>`。
//! 不做 I/O、不打日志、不保存状态，可以在任意线程并发调用；
//! 超时与并发上限由调用方负责（见 `jobs` 模块）。
//!
//! ## 实现思路
//!
//! 1. 校验请求参数（尺寸）
//! 2. 输入校验：体积 → 签名 → 文件头 → 百万像素
//! 3. 解码 + 方向校正 + 颜色规范化
//! 4. 几何适配（stretch / contain / cover）
//! 5. 透明度拍平（仅 JPEG）
//! 6. 编码
//!
//! 任一阶段失败立即返回，不会产出部分结果。

use super::composite::flatten_for_format;
use super::decode::decode_and_normalize;
use super::encode::encode_image;
use super::fit::apply_fit;
use super::source::EncodedResult;
use super::validate::validate_input;
use super::{TransformError, TransformRequest, ValidationLimits};

/// 执行完整的图片变换。
///
/// # 示例
/// ```rust
/// use creative_portal::engine::{self, OutputFormat, TransformRequest, ValidationLimits};
/// use image::{DynamicImage, ImageFormat, RgbImage};
/// use std::io::Cursor;
///
/// let mut png = Cursor::new(Vec::new());
/// DynamicImage::ImageRgb8(RgbImage::new(200, 200)).write_to(&mut png, ImageFormat::Png)?;
///
/// let request = TransformRequest::new(100, 100, OutputFormat::Jpeg);
/// let result = engine::transform(png.get_ref(), &request, &ValidationLimits::default())?;
/// assert_eq!(result.mime_type(), "image/jpeg");
/// assert_eq!((result.width, result.height), (100, 100));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn transform(
    bytes: &[u8],
    request: &TransformRequest,
    limits: &ValidationLimits,
) -> Result<EncodedResult, TransformError> {
    request.validate_dimensions(limits.max_target_edge)?;

    validate_input(bytes, limits)?;

    let source = decode_and_normalize(bytes)?;

    let fitted = apply_fit(
        source.pixels,
        request.fit,
        (request.width, request.height),
        request.background,
    )?;

    let flattened = flatten_for_format(fitted, request.format, request.background);

    encode_image(&flattened, request.format, request.quality)
}
