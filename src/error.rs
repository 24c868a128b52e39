//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，替代各模块中分散的
//! `.map_err(|e| e.to_string())`、`format!(...)`、`expect()` 等不一致模式。
//!
//! 引擎、预设、数据库、存储与任务服务的错误都汇总到这里，
//! 外层（命令行 / HTTP）只需要处理一种错误类型。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `TransformError`、`PresetError`、`std::io::Error` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，满足 JSON 输出要求。
//! - `status_code()` 给出传输层建议状态码。

use serde::Serialize;

use crate::engine::TransformError;
use crate::presets::PresetError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图片变换引擎错误（校验 / 解码 / 编码）
    #[error("{0}")]
    Transform(#[from] TransformError),

    /// 预设目录错误
    #[error("{0}")]
    Preset(#[from] PresetError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 数据库操作失败
    #[error("数据库错误: {0}")]
    Database(String),

    /// 资源目录不可用或写入失败
    #[error("存储错误: {0}")]
    Storage(String),

    /// 启动配置无效
    #[error("配置错误: {0}")]
    Config(String),

    /// 调用方设置的处理超时
    #[error("处理超时: {0}")]
    Timeout(String),

    /// 输入来源无效（路径、Base64 等）
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 目标记录不存在
    #[error("未找到: {0}")]
    NotFound(String),

    /// 后台阻塞线程执行失败（panic / 被取消）
    #[error("后台任务失败: {0}")]
    Worker(String),
}

impl AppError {
    /// 建议的 HTTP 状态码。
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Transform(err) => err.status_code(),
            Self::Preset(PresetError::NotFound(_)) => 400,
            Self::InvalidInput(_) => 400,
            Self::NotFound(_) => 404,
            Self::Timeout(_) => 504,
            Self::Preset(PresetError::Invalid(_))
            | Self::Io(_)
            | Self::Database(_)
            | Self::Storage(_)
            | Self::Config(_)
            | Self::Worker(_) => 500,
        }
    }
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_errors_keep_their_status() {
        let err: AppError = TransformError::UnsupportedMediaType("text/plain".to_string()).into();
        assert_eq!(err.status_code(), 415);

        let err: AppError = TransformError::ResolutionTooLarge("x".to_string()).into();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn unknown_preset_is_client_error() {
        let err: AppError = PresetError::NotFound("nope".to_string()).into();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn serializes_as_plain_string() {
        let err = AppError::NotFound("任务 7".to_string());
        let json = serde_json::to_string(&err).expect("serialize");
        assert_eq!(json, "\"未找到: 任务 7\"");
    }
}
