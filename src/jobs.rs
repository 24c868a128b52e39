//! # 批量任务服务
//!
//! ## 设计思路
//!
//! 一个任务 = 一组“来源图片 + 预设 key + 输出参数”条目。服务负责：
//! 加载来源字节 → 解析预设 → 调用引擎 → 写入资源目录 → 记录条目状态。
//! 引擎本身是同步纯函数，这里负责把它放到 tokio 阻塞线程池并加超时。
//!
//! ## 实现思路
//!
//! - 条目逐个同步处理，单个条目失败只标记该条目 `failed`，继续处理后续条目。
//! - 全部成功 → 任务 `done`；任一失败 → 任务 `failed`。
//! - 来源支持本地文件与 Base64 / Data URL，两者都在完整读取 / 解码前先做体积预检。
//! - 超时后直接丢弃迟到的结果，不写入资源目录。
//! - 阶段耗时（load / transform / store / total）写入日志。
//! - 仓储写入出错时先尽力把任务标记为 `failed`，再把错误返回给调用方。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::db::{ItemStatus, JobItem, JobRepository, JobStatus, NewJobItem};
use crate::engine::{
    self, EncodedResult, TransformError, TransformParams, DEFAULT_BG_COLOR, DEFAULT_FIT,
    DEFAULT_FORMAT, DEFAULT_QUALITY,
};
use crate::error::AppError;
use crate::presets::PresetCatalog;
use crate::storage::{AssetStore, StoredAsset, ASSET_URL_PREFIX};

// ============================================================================
// 请求 / 响应模型
// ============================================================================

/// 条目来源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSource {
    /// 本地文件路径
    File(PathBuf),
    /// 纯 Base64 或 `data:...;base64,` 形式的 Data URL
    Base64(String),
}

impl ItemSource {
    /// 写入数据库的来源描述，Base64 内容不落库。
    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => path.to_string_lossy().to_string(),
            Self::Base64(data) => format!("base64({} chars)", data.trim().len()),
        }
    }
}

/// 单个条目请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobItemRequest {
    pub source: ItemSource,
    pub preset_key: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub quality: Option<u32>,
    #[serde(default)]
    pub fit: Option<String>,
    #[serde(default)]
    pub bg_color: Option<String>,
}

impl JobItemRequest {
    pub fn new(source: ItemSource, preset_key: impl Into<String>) -> Self {
        Self {
            source,
            preset_key: preset_key.into(),
            format: None,
            quality: None,
            fit: None,
            bg_color: None,
        }
    }

    fn to_new_item(&self) -> NewJobItem {
        NewJobItem {
            source: self.source.describe(),
            preset_key: self.preset_key.clone(),
            format: self.format.clone().unwrap_or_else(|| DEFAULT_FORMAT.to_string()),
            quality: self.quality.unwrap_or(DEFAULT_QUALITY),
            fit: self.fit.clone().unwrap_or_else(|| DEFAULT_FIT.to_string()),
            bg_color: self.bg_color.clone().unwrap_or_else(|| DEFAULT_BG_COLOR.to_string()),
        }
    }
}

/// 一次任务提交（命令行 `job` 读取的 JSON 结构）
#[derive(Debug, Clone, Deserialize)]
pub struct JobSubmission {
    #[serde(default = "default_owner")]
    pub owner: String,
    pub items: Vec<JobItemRequest>,
}

fn default_owner() -> String {
    "anonymous".to_string()
}

/// 已完成条目的对外结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobItemResult {
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobItemReport {
    pub id: i64,
    pub preset_key: String,
    pub format: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobItemResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 任务状态报告
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub id: i64,
    pub owner: String,
    pub status: JobStatus,
    /// 已完成条目的结果，按条目顺序
    pub results: Vec<JobItemResult>,
    pub items: Vec<JobItemReport>,
    /// RFC 3339
    pub created_at: String,
    pub updated_at: String,
}

// ============================================================================
// 服务
// ============================================================================

pub struct JobService {
    config: Arc<AppConfig>,
    presets: Arc<PresetCatalog>,
    repo: Arc<dyn JobRepository>,
    store: AssetStore,
}

impl JobService {
    pub fn new(
        config: Arc<AppConfig>,
        presets: Arc<PresetCatalog>,
        repo: Arc<dyn JobRepository>,
        store: AssetStore,
    ) -> Self {
        Self { config, presets, repo, store }
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    /// 创建任务并同步处理全部条目。
    pub async fn submit(&self, owner: &str, items: Vec<JobItemRequest>) -> Result<JobReport, AppError> {
        if items.is_empty() {
            return Err(AppError::InvalidInput("任务至少需要一个条目".to_string()));
        }

        let started = Instant::now();
        let job = self.repo.create(owner)?;
        log::info!("📦 创建任务 - id={} owner={} items={}", job.id, owner, items.len());

        if let Err(e) = self.run_job(job.id, items, started).await {
            // 仓储出错时任务不能停留在 queued / processing
            if let Err(mark_err) = self.repo.update_status(job.id, JobStatus::Failed) {
                log::error!("❌ 标记任务失败状态失败 - id={} error={}", job.id, mark_err);
            }
            log::error!("❌ 任务中断 - id={} error={}", job.id, e);
            return Err(e);
        }

        self.status(job.id)
    }

    async fn run_job(&self, job_id: i64, items: Vec<JobItemRequest>, started: Instant) -> Result<(), AppError> {
        let mut queued = Vec::with_capacity(items.len());
        for request in items {
            let item = self.repo.add_item(job_id, &request.to_new_item())?;
            queued.push((item, request.source));
        }

        self.repo.update_status(job_id, JobStatus::Processing)?;

        let mut failed = 0usize;
        for (item, source) in &queued {
            self.repo.update_item(item.id, ItemStatus::Processing, None, None)?;

            match self.process_item(item, source).await {
                Ok(asset) => {
                    let dst = asset.path.to_string_lossy();
                    self.repo.update_item(item.id, ItemStatus::Done, Some(dst.as_ref()), None)?;
                }
                Err(e) => {
                    failed += 1;
                    log::warn!("⚠️ 条目处理失败 - job={} item={} error={}", job_id, item.id, e);
                    self.repo
                        .update_item(item.id, ItemStatus::Failed, None, Some(&e.to_string()))?;
                }
            }
        }

        let final_status = if failed == 0 { JobStatus::Done } else { JobStatus::Failed };
        self.repo.update_status(job_id, final_status)?;

        log::info!(
            "✅ 任务处理完成 - id={} status={} failed={}/{} total={}ms",
            job_id,
            final_status,
            failed,
            queued.len(),
            started.elapsed().as_millis()
        );
        Ok(())
    }

    /// 查询任务状态与结果。
    pub fn status(&self, job_id: i64) -> Result<JobReport, AppError> {
        let job = self
            .repo
            .find_by_id(job_id)?
            .ok_or_else(|| AppError::NotFound(format!("任务 {}", job_id)))?;
        let items = self.repo.items(job_id)?;

        let items: Vec<JobItemReport> = items.into_iter().map(item_report).collect();
        let results = items.iter().filter_map(|item| item.result.clone()).collect();

        Ok(JobReport {
            id: job.id,
            owner: job.owner,
            status: job.status,
            results,
            items,
            created_at: format_timestamp(job.created_at),
            updated_at: format_timestamp(job.updated_at),
        })
    }

    async fn process_item(&self, item: &JobItem, source: &ItemSource) -> Result<StoredAsset, AppError> {
        let started = Instant::now();

        let (width, height) = self.presets.dimensions(&item.preset_key)?;
        let request = TransformParams {
            width,
            height,
            format: item.format.clone(),
            quality: item.quality,
            fit: item.fit.clone(),
            bg_color: item.bg_color.clone(),
            strip_metadata: true,
        }
        .into_request()?;

        let bytes = load_source(source, self.config.limits.max_file_size)?;
        let load_ms = started.elapsed().as_millis();

        let transform_started = Instant::now();
        let encoded = self.run_transform(item.id, bytes, request).await?;
        let transform_ms = transform_started.elapsed().as_millis();

        let store_started = Instant::now();
        let asset = self.store.save(item.job_id, item.id, &item.preset_key, &encoded)?;
        let store_ms = store_started.elapsed().as_millis();

        log::info!(
            "✅ 条目处理完成 - job={} item={} {}x{} {} {}B load={}ms transform={}ms store={}ms total={}ms",
            item.job_id,
            item.id,
            encoded.width,
            encoded.height,
            encoded.mime_type(),
            encoded.len(),
            load_ms,
            transform_ms,
            store_ms,
            started.elapsed().as_millis()
        );

        Ok(asset)
    }

    async fn run_transform(
        &self,
        item_id: i64,
        bytes: Vec<u8>,
        request: engine::TransformRequest,
    ) -> Result<EncodedResult, AppError> {
        let limits = self.config.limits.clone();
        let timeout_ms = self.config.item_timeout_ms;

        let handle = tokio::task::spawn_blocking(move || engine::transform(&bytes, &request, &limits));

        // 超时只丢弃结果，阻塞线程会自行跑完
        let joined = tokio::time::timeout(Duration::from_millis(timeout_ms), handle)
            .await
            .map_err(|_| AppError::Timeout(format!("条目 {} 超过 {}ms", item_id, timeout_ms)))?;

        let result = joined.map_err(|e| AppError::Worker(format!("变换线程执行失败：{}", e)))?;
        Ok(result?)
    }
}

fn item_report(item: JobItem) -> JobItemReport {
    let result = match (item.status, item.dst_path.as_deref()) {
        (ItemStatus::Done, Some(dst)) => Path::new(dst)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .map(|filename| JobItemResult {
                url: format!("{}{}", ASSET_URL_PREFIX, filename),
                filename,
            }),
        _ => None,
    };

    JobItemReport {
        id: item.id,
        preset_key: item.preset_key,
        format: item.format,
        status: item.status,
        result,
        error: item.error,
    }
}

fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}

// ============================================================================
// 来源加载
// ============================================================================

/// 读取条目来源的原始字节，完整读取 / 解码前先做体积预检。
pub fn load_source(source: &ItemSource, max_file_size: u64) -> Result<Vec<u8>, AppError> {
    match source {
        ItemSource::File(path) => load_file(path, max_file_size),
        ItemSource::Base64(data) => parse_base64_with_limit(data, max_file_size),
    }
}

fn too_large(kind: &str, size: u64, max_file_size: u64) -> AppError {
    TransformError::PayloadTooLarge(format!(
        "{}体积过大：{:.2} MB（限制：{:.2} MB）",
        kind,
        size as f64 / 1024.0 / 1024.0,
        max_file_size as f64 / 1024.0 / 1024.0
    ))
    .into()
}

fn load_file(path: &Path, max_file_size: u64) -> Result<Vec<u8>, AppError> {
    if !path.is_file() {
        return Err(AppError::InvalidInput(format!("文件不存在：{}", path.display())));
    }

    let metadata = std::fs::metadata(path)
        .map_err(|e| AppError::InvalidInput(format!("无法读取文件信息：{}", e)))?;
    if metadata.len() > max_file_size {
        return Err(too_large("文件", metadata.len(), max_file_size));
    }

    std::fs::read(path)
        .map_err(|e| AppError::InvalidInput(format!("无法读取图片文件：{}", e)))
}

fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> u64 {
    let len = base64_data.trim().len() as u64;
    len.div_ceil(4).saturating_mul(3)
}

fn parse_base64_with_limit(data: &str, max_file_size: u64) -> Result<Vec<u8>, AppError> {
    let normalized = data.trim();

    let payload = if normalized.starts_with("data:") {
        let base64_start = normalized
            .find(";base64,")
            .ok_or_else(|| AppError::InvalidInput("Data URL 缺少 base64 标记".to_string()))?;
        &normalized[base64_start + 8..]
    } else {
        normalized
    };

    let estimated_len = estimate_base64_decoded_upper_bound_len(payload);
    if estimated_len > max_file_size {
        return Err(too_large("Base64 预计解码", estimated_len, max_file_size));
    }

    let bytes = general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| AppError::InvalidInput(format!("Base64 解码失败：{}", e)))?;

    if bytes.len() as u64 > max_file_size {
        return Err(too_large("Base64 解码后", bytes.len() as u64, max_file_size));
    }
    Ok(bytes)
}
