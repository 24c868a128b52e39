//! # 几何适配模块
//!
//! ## 设计思路
//!
//! 把“算多大”和“怎么缩”分开：
//! - `FitPlan::resolve` 是纯整数/浮点几何，只根据原始尺寸、目标尺寸和适配模式
//!   算出源图取样区域、缩放尺寸与贴图偏移，方便单独测试与做性质测试。
//! - `apply_fit` 按计划执行取样缩放，contain 再贴到背景画布上。
//!
//! 三种模式的输出尺寸都严格等于目标尺寸，中间缓冲都不超过目标尺寸：
//! cover 先在源图坐标系里算出居中的裁剪区域，再把这块区域直接缩放到目标尺寸，
//! 不会先把整张源图放大再裁。
//!
//! ## 实现思路
//!
//! 缩放优先使用 `fast_image_resize` 的 Lanczos3 卷积（裁剪区域通过 `ResizeOptions::crop` 传入）；
//! 快速路径失败时回退到 `image` 的 `crop_imm` + Lanczos3，保证结果可用。

use fast_image_resize as fr;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageBuffer, Luma, LumaA, Rgb, RgbImage, Rgba, RgbaImage};

use super::source::ColorMode;
use super::{BackgroundColor, FitMode, TransformError};

/// 源图坐标系中的矩形取样区域。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SourceRegion {
    pub fn full((width, height): (u32, u32)) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

/// 单次适配的几何计划。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitPlan {
    pub mode: FitMode,
    pub source_width: u32,
    pub source_height: u32,
    /// 参与缩放的源图区域；cover 为居中裁剪区域，其余为整张源图。
    pub region: SourceRegion,
    /// 取样区域缩放后的尺寸，永远不超过目标尺寸。
    pub resize_width: u32,
    pub resize_height: u32,
    /// contain 的贴图偏移；其余模式恒为 0。
    pub offset_x: u32,
    pub offset_y: u32,
    pub target_width: u32,
    pub target_height: u32,
}

impl FitPlan {
    /// 计算几何计划。调用方保证四个尺寸都为正。
    pub fn resolve(
        mode: FitMode,
        source: (u32, u32),
        (target_width, target_height): (u32, u32),
    ) -> Self {
        let (source_width, source_height) = source;
        let scale_x = target_width as f64 / source_width as f64;
        let scale_y = target_height as f64 / source_height as f64;

        let mut region = SourceRegion::full(source);
        let (resize_width, resize_height, offset_x, offset_y) = match mode {
            FitMode::Stretch => (target_width, target_height, 0, 0),
            FitMode::Contain => {
                let scale = scale_x.min(scale_y);
                let w = scaled(source_width, scale).clamp(1, target_width);
                let h = scaled(source_height, scale).clamp(1, target_height);
                (w, h, (target_width - w) / 2, (target_height - h) / 2)
            }
            FitMode::Cover => {
                let scale = scale_x.max(scale_y);
                let w = scaled(target_width, 1.0 / scale).clamp(1, source_width);
                let h = scaled(target_height, 1.0 / scale).clamp(1, source_height);
                region = SourceRegion {
                    x: (source_width - w) / 2,
                    y: (source_height - h) / 2,
                    width: w,
                    height: h,
                };
                (target_width, target_height, 0, 0)
            }
        };

        Self {
            mode,
            source_width,
            source_height,
            region,
            resize_width,
            resize_height,
            offset_x,
            offset_y,
            target_width,
            target_height,
        }
    }

    /// contain 模式下是否会出现背景色留白。
    pub fn has_padding(&self) -> bool {
        self.mode == FitMode::Contain
            && (self.resize_width != self.target_width || self.resize_height != self.target_height)
    }

    /// cover 模式下是否会裁掉内容。
    pub fn crops(&self) -> bool {
        self.region != SourceRegion::full((self.source_width, self.source_height))
    }
}

fn scaled(length: u32, scale: f64) -> u32 {
    let value = (length as f64 * scale).round();
    if value >= u32::MAX as f64 {
        u32::MAX
    } else {
        value as u32
    }
}

/// 按适配模式把图像变换为目标尺寸。
pub fn apply_fit(
    image: DynamicImage,
    mode: FitMode,
    target: (u32, u32),
    background: BackgroundColor,
) -> Result<DynamicImage, TransformError> {
    let plan = FitPlan::resolve(mode, image.dimensions(), target);
    let resized = resize_region(&image, plan.region, plan.resize_width, plan.resize_height)?;

    let fitted = match plan.mode {
        FitMode::Stretch | FitMode::Cover => resized,
        FitMode::Contain => paste_on_canvas(resized, &plan, background),
    };

    debug_assert_eq!(fitted.dimensions(), target);
    Ok(fitted)
}

/// contain：生成填满背景色的画布，并把缩放结果居中贴上。
///
/// 带 alpha 的图像贴到不透明 RGBA 画布上，透明像素原样保留，是否拍平交给合成阶段；
/// 其余情况统一贴到 RGB 画布（背景色是彩色，灰度画布装不下）。
fn paste_on_canvas(resized: DynamicImage, plan: &FitPlan, background: BackgroundColor) -> DynamicImage {
    let (x, y) = (plan.offset_x as i64, plan.offset_y as i64);

    if ColorMode::of(&resized).has_alpha() {
        let mut canvas: RgbaImage =
            ImageBuffer::from_pixel(plan.target_width, plan.target_height, background.to_rgba());
        imageops::replace(&mut canvas, &resized.to_rgba8(), x, y);
        DynamicImage::ImageRgba8(canvas)
    } else {
        let mut canvas: RgbImage =
            ImageBuffer::from_pixel(plan.target_width, plan.target_height, background.to_rgb());
        imageops::replace(&mut canvas, &resized.to_rgb8(), x, y);
        DynamicImage::ImageRgb8(canvas)
    }
}

/// 精确缩放到指定尺寸（Lanczos3）。尺寸不变时直接返回副本。
pub fn resize_exact(image: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage, TransformError> {
    resize_region(image, SourceRegion::full(image.dimensions()), width, height)
}

/// 把源图的 `region` 区域缩放到指定尺寸（Lanczos3）。
pub fn resize_region(
    image: &DynamicImage,
    region: SourceRegion,
    width: u32,
    height: u32,
) -> Result<DynamicImage, TransformError> {
    if (region.width, region.height) == (width, height) {
        if region == SourceRegion::full(image.dimensions()) {
            return Ok(image.clone());
        }
        return Ok(image.crop_imm(region.x, region.y, width, height));
    }

    match resize_with_fast_image_resize(image, region, width, height) {
        Ok(resized) => Ok(resized),
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 缩放失败，回退 image::resize_exact：{}", err);
            Ok(image
                .crop_imm(region.x, region.y, region.width, region.height)
                .resize_exact(width, height, FilterType::Lanczos3))
        }
    }
}

fn resize_with_fast_image_resize(
    image: &DynamicImage,
    region: SourceRegion,
    width: u32,
    height: u32,
) -> Result<DynamicImage, TransformError> {
    let (pixel_type, raw) = match image {
        DynamicImage::ImageRgb8(buf) => (fr::PixelType::U8x3, buf.as_raw().clone()),
        DynamicImage::ImageRgba8(buf) => (fr::PixelType::U8x4, buf.as_raw().clone()),
        DynamicImage::ImageLuma8(buf) => (fr::PixelType::U8, buf.as_raw().clone()),
        DynamicImage::ImageLumaA8(buf) => (fr::PixelType::U8x2, buf.as_raw().clone()),
        other => (fr::PixelType::U8x4, other.to_rgba8().into_raw()),
    };

    let (src_width, src_height) = image.dimensions();
    let src_image = fr::images::Image::from_vec_u8(src_width, src_height, raw, pixel_type)
        .map_err(|e| TransformError::CorruptImage(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(width, height, pixel_type);

    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new()
        .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3))
        .crop(
            region.x as f64,
            region.y as f64,
            region.width as f64,
            region.height as f64,
        );

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| TransformError::CorruptImage(format!("fast_image_resize 执行失败：{}", e)))?;

    let out = dst_image.into_vec();
    let rebuilt = match pixel_type {
        fr::PixelType::U8x3 => ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, out)
            .map(DynamicImage::ImageRgb8),
        fr::PixelType::U8 => ImageBuffer::<Luma<u8>, _>::from_raw(width, height, out)
            .map(DynamicImage::ImageLuma8),
        fr::PixelType::U8x2 => ImageBuffer::<LumaA<u8>, _>::from_raw(width, height, out)
            .map(DynamicImage::ImageLumaA8),
        _ => ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, out)
            .map(DynamicImage::ImageRgba8),
    };

    rebuilt.ok_or_else(|| TransformError::CorruptImage("fast_image_resize 输出缓冲长度异常".to_string()))
}
