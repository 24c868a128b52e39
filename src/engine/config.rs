//! # 校验上限配置
//!
//! ## 设计思路
//!
//! 所有资源保护阈值集中在 `ValidationLimits`，进程启动时确定一次，之后只读共享。
//! 引擎本身不持有任何状态，每次调用显式传入 `&ValidationLimits`。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的阈值（25MB / 60MP）。
//! - 百万像素按 `width * height / 1_048_576` 计算，解码前即可得出。

use super::TransformError;

/// 每百万像素对应的像素数（二进制口径）。
pub const PIXELS_PER_MEGAPIXEL: f64 = 1_048_576.0;

/// 输入校验上限。
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationLimits {
    /// 输入原始字节允许的最大体积（字节）。
    pub max_file_size: u64,
    /// 解码后允许的最大百万像素数。
    pub max_megapixels: f64,
    /// 目标画布单边最大值。
    pub max_target_edge: u32,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_file_size: 25 * 1024 * 1024,
            max_megapixels: 60.0,
            max_target_edge: 8192,
        }
    }
}

impl ValidationLimits {
    /// 校验阈值自身是否合理，避免配置错误导致所有请求被拒绝或完全不设防。
    pub fn validate(&self) -> Result<(), TransformError> {
        if self.max_file_size == 0 {
            return Err(TransformError::InvalidRequest(
                "max_file_size 必须大于 0".to_string(),
            ));
        }
        if !self.max_megapixels.is_finite() || self.max_megapixels <= 0.0 {
            return Err(TransformError::InvalidRequest(format!(
                "max_megapixels 必须为正数（当前：{}）",
                self.max_megapixels
            )));
        }
        if self.max_target_edge == 0 {
            return Err(TransformError::InvalidRequest(
                "max_target_edge 必须大于 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// 计算百万像素数。
pub fn megapixels(width: u32, height: u32) -> f64 {
    (width as u64 * height as u64) as f64 / PIXELS_PER_MEGAPIXEL
}
