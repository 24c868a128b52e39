//! 结果资源存储模块
//!
//! # 设计思路
//!
//! 变换结果统一落到一个资源目录，对外以 `/assets/{filename}` 形式暴露。
//! 文件名由任务 ID、条目 ID 和预设 key 确定，同一条目重跑会覆盖旧文件。
//!
//! # 实现思路
//!
//! - `open` 时目录不存在则自动 `create_dir_all`，避免上层判断。
//! - 先写临时文件再 `rename`，读者不会看到写了一半的文件。
//! - 所有可能失败的操作均返回 `Result`，不使用 `expect()` / `unwrap()`。

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::engine::EncodedResult;
use crate::error::AppError;

/// 资源的对外 URL 前缀
pub const ASSET_URL_PREFIX: &str = "/assets/";

/// 存储目录信息
#[derive(Debug, Clone, Serialize)]
pub struct StorageInfo {
    pub path: String,
    pub total_size: u64,
    pub file_count: u64,
}

/// 已保存的结果文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredAsset {
    pub filename: String,
    pub path: PathBuf,
    pub url: String,
}

/// 资源目录
#[derive(Debug, Clone)]
pub struct AssetStore {
    dir: PathBuf,
}

impl AssetStore {
    /// 打开资源目录，不存在时创建。
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| {
                AppError::Storage(format!("创建资源目录 '{}' 失败: {}", dir.display(), e))
            })?;
        }
        if !dir.is_dir() {
            return Err(AppError::Storage(format!(
                "资源路径 '{}' 不是目录",
                dir.display()
            )));
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 生成结果文件名：`job{job}_item{item}_{preset}.{ext}`
    pub fn asset_filename(job_id: i64, item_id: i64, preset_key: &str, extension: &str) -> String {
        format!(
            "job{}_item{}_{}.{}",
            job_id,
            item_id,
            sanitize_component(preset_key),
            extension
        )
    }

    /// 写入一份编码结果。
    pub fn save(
        &self,
        job_id: i64,
        item_id: i64,
        preset_key: &str,
        result: &EncodedResult,
    ) -> Result<StoredAsset, AppError> {
        let filename = Self::asset_filename(job_id, item_id, preset_key, result.format.extension());
        let path = self.dir.join(&filename);
        let tmp_path = self.dir.join(format!(".{}.tmp", filename));

        fs::write(&tmp_path, &result.bytes).map_err(|e| {
            AppError::Storage(format!("写入临时文件 '{}' 失败: {}", tmp_path.display(), e))
        })?;
        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(AppError::Storage(format!(
                "保存资源 '{}' 失败: {}",
                path.display(),
                e
            )));
        }

        Ok(StoredAsset {
            url: format!("{}{}", ASSET_URL_PREFIX, filename),
            filename,
            path,
        })
    }

    /// 资源目录信息（路径 + 占用大小 + 文件数）
    pub fn info(&self) -> Result<StorageInfo, AppError> {
        let mut total_size: u64 = 0;
        let mut file_count: u64 = 0;

        let entries = fs::read_dir(&self.dir).map_err(|e| {
            AppError::Storage(format!("读取资源目录 '{}' 失败: {}", self.dir.display(), e))
        })?;
        for entry in entries.flatten() {
            if let Ok(metadata) = entry.metadata() {
                if metadata.is_file() {
                    total_size += metadata.len();
                    file_count += 1;
                }
            }
        }

        Ok(StorageInfo {
            path: self.dir.to_string_lossy().to_string(),
            total_size,
            file_count,
        })
    }
}

/// 预设 key 进入文件名前只保留 `[A-Za-z0-9_-]`
fn sanitize_component(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() { "custom".to_string() } else { cleaned }
}
