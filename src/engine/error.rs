//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 变换引擎的所有失败都收敛到 `TransformError` 一个枚举里，调用方按分支匹配即可，
//! 不需要解析字符串。每个分支都对应“这份输入本身的属性”，重试不会改变结果，
//! 因此全部视为不可重试错误。
//!
//! ## 实现思路
//!
//! - `thiserror` 负责人类可读的错误文案。
//! - `code()` 输出稳定的机器可读标识，`stage()` 标出失败所在阶段。
//! - `status_code()` 给出外层传输协议（HTTP）的建议状态码，映射本身仍由调用方决定是否采用。

/// 图片变换统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("文件过大：{0}")]
    PayloadTooLarge(String),

    #[error("不支持的媒体类型：{0}")]
    UnsupportedMediaType(String),

    #[error("图片已损坏：{0}")]
    CorruptImage(String),

    #[error("分辨率超限：{0}")]
    ResolutionTooLarge(String),

    #[error("不支持的输出格式：{0}")]
    UnsupportedOutputFormat(String),

    #[error("编码失败：{0}")]
    EncodeFailure(String),

    #[error("请求参数无效：{0}")]
    InvalidRequest(String),
}

impl TransformError {
    /// 把 `image` 的读取/解码错误归类。
    ///
    /// 签名是图片、但当前 `image` 构建没有对应解码器（如 AVIF、HEIC）时报不支持的媒体类型，
    /// 其余错误视为图片损坏。
    pub fn from_decode(context: &str, err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => {
                Self::UnsupportedMediaType(format!("{}：{}", context, e))
            }
            other => Self::CorruptImage(format!("{}：{}", context, other)),
        }
    }

    /// 稳定的错误码，供日志、持久化与前端展示。
    pub fn code(&self) -> &'static str {
        match self {
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::UnsupportedMediaType(_) => "unsupported_media_type",
            Self::CorruptImage(_) => "corrupt_image",
            Self::ResolutionTooLarge(_) => "resolution_too_large",
            Self::UnsupportedOutputFormat(_) => "unsupported_output_format",
            Self::EncodeFailure(_) => "encode_failure",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }

    /// 失败所在的流水线阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::PayloadTooLarge(_)
            | Self::UnsupportedMediaType(_)
            | Self::ResolutionTooLarge(_) => "validate",
            Self::CorruptImage(_) => "decode",
            Self::UnsupportedOutputFormat(_) | Self::InvalidRequest(_) => "request",
            Self::EncodeFailure(_) => "encode",
        }
    }

    /// 建议的 HTTP 状态码。
    ///
    /// 输入校验类错误属于客户端问题；编码失败说明参数合法但编码器拒绝，归为服务端错误。
    pub fn status_code(&self) -> u16 {
        match self {
            Self::PayloadTooLarge(_) => 413,
            Self::UnsupportedMediaType(_) => 415,
            Self::CorruptImage(_)
            | Self::ResolutionTooLarge(_)
            | Self::UnsupportedOutputFormat(_)
            | Self::InvalidRequest(_) => 400,
            Self::EncodeFailure(_) => 500,
        }
    }
}


impl From<TransformError> for String {
    fn from(error: TransformError) -> Self {
        error.to_string()
    }
}

#[cfg(test)]
mod code_tests {
    use super::*;

    #[test]
    fn codes_and_stages_are_stable() {
        let err = TransformError::PayloadTooLarge("x".to_string());
        assert_eq!(err.code(), "payload_too_large");
        assert_eq!(err.stage(), "validate");
        assert_eq!(err.status_code(), 413);

        let err = TransformError::EncodeFailure("x".to_string());
        assert_eq!(err.stage(), "encode");
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn message_keeps_detail() {
        let err = TransformError::UnsupportedOutputFormat("bmp".to_string());
        assert!(err.to_string().contains("bmp"));
    }
}
