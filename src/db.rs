//! 任务持久化模块
//!
//! # 设计思路
//!
//! 任务与任务条目的读写通过显式的仓储接口 `JobRepository` 暴露
//! （`create` / `find_by_id` / `update_status` 及条目操作），
//! 服务层只依赖 trait，不关心底层存储。
//! 默认实现 `SqliteJobRepository` 使用 `rusqlite` 直接操作 SQLite。
//!
//! # 优势
//!
//! - **类型安全**：Rust struct + serde，状态值用枚举而不是裸字符串
//! - **可替换**：测试可用内存库，生产可换成其他实现
//! - **可维护性**：SQL 逻辑集中在 `db/` 子模块

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

mod jobs;
mod schema;

pub use jobs::SqliteJobRepository;

// ============================================================================
// 数据模型
// ============================================================================

/// 任务整体状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Done,
    Failed,
}

/// 任务条目状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

macro_rules! impl_status_text {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }

            pub fn is_terminal(self) -> bool {
                matches!(self, Self::Done | Self::Failed)
            }
        }

        impl FromStr for $ty {
            type Err = AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok(Self::$variant),)+
                    other => Err(AppError::Database(format!(
                        concat!("未知的 ", stringify!($ty), " 值: {}"),
                        other
                    ))),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_status_text!(JobStatus {
    Queued => "queued",
    Processing => "processing",
    Done => "done",
    Failed => "failed",
});

impl_status_text!(ItemStatus {
    Pending => "pending",
    Processing => "processing",
    Done => "done",
    Failed => "failed",
});

/// 任务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    /// 调用方提供的不透明归属标识
    pub owner: String,
    pub status: JobStatus,
    /// 毫秒时间戳
    pub created_at: i64,
    pub updated_at: i64,
}

/// 任务条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobItem {
    pub id: i64,
    pub job_id: i64,
    /// 来源描述（文件路径或 `base64`），仅用于诊断
    pub source: String,
    pub preset_key: String,
    pub format: String,
    pub quality: u32,
    pub fit: String,
    pub bg_color: String,
    pub status: ItemStatus,
    pub dst_path: Option<String>,
    pub error: Option<String>,
}

/// 新建任务条目所需字段
#[derive(Debug, Clone)]
pub struct NewJobItem {
    pub source: String,
    pub preset_key: String,
    pub format: String,
    pub quality: u32,
    pub fit: String,
    pub bg_color: String,
}

// ============================================================================
// 仓储接口
// ============================================================================

/// 任务仓储
pub trait JobRepository: Send + Sync {
    /// 创建任务，初始状态为 `queued`
    fn create(&self, owner: &str) -> Result<Job, AppError>;

    fn find_by_id(&self, id: i64) -> Result<Option<Job>, AppError>;

    fn update_status(&self, id: i64, status: JobStatus) -> Result<(), AppError>;

    /// 追加条目，初始状态为 `pending`
    fn add_item(&self, job_id: i64, item: &NewJobItem) -> Result<JobItem, AppError>;

    fn update_item(
        &self,
        item_id: i64,
        status: ItemStatus,
        dst_path: Option<&str>,
        error: Option<&str>,
    ) -> Result<(), AppError>;

    /// 按创建顺序返回任务的全部条目
    fn items(&self, job_id: i64) -> Result<Vec<JobItem>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_round_trips() {
        for status in [JobStatus::Queued, JobStatus::Processing, JobStatus::Done, JobStatus::Failed] {
            assert_eq!(status.as_str().parse::<JobStatus>().ok(), Some(status));
        }
        assert!(ItemStatus::Failed.is_terminal());
        assert!(!ItemStatus::Processing.is_terminal());
        assert!("archived".parse::<JobStatus>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&JobStatus::Processing).expect("serialize");
        assert_eq!(json, "\"processing\"");
    }
}
