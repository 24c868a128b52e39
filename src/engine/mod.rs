//! # 图片变换引擎（engine）
//!
//! ## 设计思路
//!
//! 该模块把“校验 → 解码规范化 → 几何适配 → 透明度拍平 → 编码”
//! 按职责拆分为多个子模块，对外只暴露一个纯函数入口 `transform`。
//! 引擎不认识任务、用户或存储路径，只处理“一份字节 + 一组参数”。
//!
//! - `validate`：体积、文件签名、文件头尺寸、百万像素校验
//! - `decode`：解码、EXIF 方向校正、颜色模式规范化
//! - `fit`：stretch / contain / cover 几何计算与缩放
//! - `composite`：JPEG 输出前的透明度拍平
//! - `encode`：按格式编码
//! - `pipeline`：串联以上阶段
//! - `config/error/request/source`：上限配置、错误、请求参数、中间数据模型
//!
//! ## 调用链
//!
//! ```text
//! 调用方（jobs / CLI）
//!    ↓  bytes + TransformRequest + &ValidationLimits
//! pipeline::transform
//!    ├─ validate.rs（尽早失败，不做完整解码）
//!    ├─ decode.rs（方向 + 颜色规范化）
//!    ├─ fit.rs（FitPlan + 区域取样 Lanczos3 缩放）
//!    ├─ composite.rs（仅 JPEG 拍平）
//!    └─ encode.rs（格式相关参数）
//!    ↓
//! EncodedResult / TransformError
//! ```

mod composite;
mod config;
mod decode;
mod encode;
mod error;
mod fit;
mod pipeline;
mod request;
mod source;
mod validate;

pub use composite::{flatten, flatten_for_format};
pub use config::{megapixels, ValidationLimits, PIXELS_PER_MEGAPIXEL};
pub use decode::decode_and_normalize;
pub use encode::encode_image;
pub use error::TransformError;
pub use fit::{apply_fit, resize_exact, resize_region, FitPlan, SourceRegion};
pub use pipeline::transform;
pub use request::{
    BackgroundColor, FitMode, OutputFormat, TransformParams, TransformRequest, DEFAULT_BG_COLOR,
    DEFAULT_FIT, DEFAULT_FORMAT, DEFAULT_QUALITY,
};
pub use source::{ColorMode, EncodedResult, ProbedImage, SourceImage};
pub use validate::validate_input;
