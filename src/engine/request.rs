//! # 变换请求模型
//!
//! ## 设计思路
//!
//! 外层（命令行、任务服务、HTTP）拿到的都是松散的字符串与整数，
//! 引擎内部只接受强类型的 `TransformRequest`。两者之间的解析集中在这里完成：
//! - `OutputFormat`：固定枚举，未知格式直接报错，不再静默回退 JPEG
//! - `FitMode`：stretch / contain / cover，未知值直接报错，不再静默回退 cover
//! - `BackgroundColor`：`#RRGGBB` 十六进制三元组
//!
//! ## 实现思路
//!
//! `TransformParams` 是可反序列化的“原始参数”，字段都带默认值；
//! `TransformParams::into_request` 负责一次性解析并返回引擎可用的请求。

use std::fmt;
use std::str::FromStr;

use image::{Rgb, Rgba};
use serde::{Deserialize, Serialize};

use super::TransformError;

pub const DEFAULT_QUALITY: u32 = 85;
pub const DEFAULT_FORMAT: &str = "jpeg";
pub const DEFAULT_FIT: &str = "cover";
pub const DEFAULT_BG_COLOR: &str = "#FFFFFF";

/// 输出编码格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Avif,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [Self::Jpeg, Self::Png, Self::WebP, Self::Avif];

    /// 稳定的格式名，同时也是 MIME 子类型。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Avif => "image/avif",
        }
    }

    pub fn extension(self) -> &'static str {
        self.as_str()
    }

    /// 是否为有损格式（quality 参数生效）。
    pub fn is_lossy(self) -> bool {
        !matches!(self, Self::Png)
    }

    /// 该格式能否保存 alpha 通道。
    pub fn supports_alpha(self) -> bool {
        !matches!(self, Self::Jpeg)
    }
}

impl FromStr for OutputFormat {
    type Err = TransformError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::WebP),
            "avif" => Ok(Self::Avif),
            other => Err(TransformError::UnsupportedOutputFormat(format!(
                "{}（可选：jpeg / png / webp / avif）",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 宽高比适配策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FitMode {
    /// 直接拉伸到目标尺寸，不保持宽高比。
    Stretch,
    /// 完整放入画布，空白处用背景色填充，不裁剪。
    Contain,
    /// 铺满画布，居中裁掉多余部分，不留白。
    Cover,
}

impl FitMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stretch => "stretch",
            Self::Contain => "contain",
            Self::Cover => "cover",
        }
    }
}

impl FromStr for FitMode {
    type Err = TransformError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stretch" => Ok(Self::Stretch),
            "contain" => Ok(Self::Contain),
            "cover" => Ok(Self::Cover),
            other => Err(TransformError::InvalidRequest(format!(
                "未知适配模式：{}（可选：stretch / contain / cover）",
                other
            ))),
        }
    }
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 背景色（不透明 RGB）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl BackgroundColor {
    pub const WHITE: BackgroundColor = BackgroundColor { r: 255, g: 255, b: 255 };

    /// 解析 `#RRGGBB` 或 `RRGGBB`。
    pub fn from_hex(value: &str) -> Result<Self, TransformError> {
        let trimmed = value.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);

        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TransformError::InvalidRequest(format!(
                "背景色格式错误：{}（应为 #RRGGBB）",
                value
            )));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|e| {
                TransformError::InvalidRequest(format!("背景色解析失败：{}", e))
            })
        };

        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    pub fn to_rgb(self) -> Rgb<u8> {
        Rgb([self.r, self.g, self.b])
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }
}

impl Default for BackgroundColor {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for BackgroundColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// 引擎可直接执行的变换请求。
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRequest {
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    /// 1-100，仅对有损格式生效；越界值在编码阶段报 `EncodeFailure`。
    pub quality: u32,
    pub fit: FitMode,
    pub background: BackgroundColor,
    /// 仅为兼容旧参数保留，不影响输出：编码器从不写入 EXIF 等元数据，
    /// 方向信息会在解码阶段直接作用到像素上。
    pub strip_metadata: bool,
}

impl TransformRequest {
    /// 以默认参数（quality=85、cover、白色背景、去除元数据）创建请求。
    pub fn new(width: u32, height: u32, format: OutputFormat) -> Self {
        Self {
            width,
            height,
            format,
            quality: DEFAULT_QUALITY,
            fit: FitMode::Cover,
            background: BackgroundColor::WHITE,
            strip_metadata: true,
        }
    }

    pub fn with_quality(mut self, quality: u32) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_fit(mut self, fit: FitMode) -> Self {
        self.fit = fit;
        self
    }

    pub fn with_background(mut self, background: BackgroundColor) -> Self {
        self.background = background;
        self
    }

    /// 校验目标尺寸：必须为正且不超过单边上限。
    pub fn validate_dimensions(&self, max_edge: u32) -> Result<(), TransformError> {
        if self.width == 0 || self.height == 0 {
            return Err(TransformError::InvalidRequest(format!(
                "目标尺寸必须为正整数：{}x{}",
                self.width, self.height
            )));
        }

        if self.width > max_edge || self.height > max_edge {
            return Err(TransformError::InvalidRequest(format!(
                "目标尺寸过大：{}x{}（单边限制：{}）",
                self.width, self.height, max_edge
            )));
        }

        Ok(())
    }
}

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

fn default_quality() -> u32 {
    DEFAULT_QUALITY
}

fn default_fit() -> String {
    DEFAULT_FIT.to_string()
}

fn default_bg_color() -> String {
    DEFAULT_BG_COLOR.to_string()
}

fn default_strip_metadata() -> bool {
    true
}

/// 外部输入的原始变换参数。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformParams {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_quality")]
    pub quality: u32,
    #[serde(default = "default_fit")]
    pub fit: String,
    #[serde(default = "default_bg_color")]
    pub bg_color: String,
    /// 不影响输出，见 [`TransformRequest::strip_metadata`]。
    #[serde(default = "default_strip_metadata")]
    pub strip_metadata: bool,
}

impl TransformParams {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: default_format(),
            quality: DEFAULT_QUALITY,
            fit: default_fit(),
            bg_color: default_bg_color(),
            strip_metadata: true,
        }
    }

    /// 解析为强类型请求。
    ///
    /// # 示例
    /// ```rust
    /// use creative_portal::engine::{FitMode, OutputFormat, TransformParams};
    ///
    /// let mut params = TransformParams::new(1080, 1080);
    /// params.format = "webp".to_string();
    /// params.fit = "contain".to_string();
    ///
    /// let request = params.into_request()?;
    /// assert_eq!(request.format, OutputFormat::WebP);
    /// assert_eq!(request.fit, FitMode::Contain);
    /// # Ok::<(), creative_portal::engine::TransformError>(())
    /// ```
    pub fn into_request(self) -> Result<TransformRequest, TransformError> {
        Ok(TransformRequest {
            width: self.width,
            height: self.height,
            format: self.format.parse()?,
            quality: self.quality,
            fit: self.fit.parse()?,
            background: BackgroundColor::from_hex(&self.bg_color)?,
            strip_metadata: self.strip_metadata,
        })
    }
}
