//! # 社交媒体素材尺寸工具：命令行入口
//!
//! 本文件仅负责配置加载、日志初始化与子命令分发。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use serde::Serialize;

use cli::{Cli, Commands};
use creative_portal::config::AppConfig;
use creative_portal::db::SqliteJobRepository;
use creative_portal::engine::{self, OutputFormat, TransformParams};
use creative_portal::error::AppError;
use creative_portal::jobs::{JobService, JobSubmission};
use creative_portal::presets::PresetCatalog;
use creative_portal::storage::AssetStore;

#[derive(Serialize)]
struct ResizeSummary {
    output: String,
    width: u32,
    height: u32,
    mime_type: &'static str,
    bytes: usize,
}

#[derive(Serialize)]
struct HealthReport {
    status: &'static str,
    version: &'static str,
    presets: usize,
    database: String,
    storage: creative_portal::storage::StorageInfo,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a AppError,
    status: u16,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };
    if let Some(level) = cli.log_level.as_deref() {
        config.log_level = level.to_ascii_lowercase();
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    match run(cli.command, Arc::new(config)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("❌ 命令执行失败: {}", err);
            let body = ErrorBody { status: err.status_code(), error: &err };
            match serde_json::to_string_pretty(&body) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}", err),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: Arc<AppConfig>) -> Result<(), AppError> {
    match command {
        Commands::Presets => {
            let catalog = load_presets(&config)?;
            print_json(&catalog.groups())
        }
        Commands::Resize {
            input,
            output,
            preset,
            width,
            height,
            format,
            quality,
            fit,
            bg_color,
        } => {
            let (width, height) = match (preset, width, height) {
                (Some(key), _, _) => load_presets(&config)?.dimensions(&key)?,
                (None, Some(w), Some(h)) => (w, h),
                _ => {
                    return Err(AppError::InvalidInput(
                        "需要 --preset 或同时提供 --width/--height".to_string(),
                    ));
                }
            };
            let params = TransformParams {
                width,
                height,
                format,
                quality,
                fit,
                bg_color,
                strip_metadata: true,
            };
            let summary = resize_file(&input, output, params, &config)?;
            print_json(&summary)
        }
        Commands::Job { file, owner } => {
            let content = std::fs::read_to_string(&file).map_err(|e| {
                AppError::InvalidInput(format!("读取任务文件 '{}' 失败: {}", file.display(), e))
            })?;
            let submission: JobSubmission = serde_json::from_str(&content)
                .map_err(|e| AppError::InvalidInput(format!("解析任务文件失败: {}", e)))?;
            let owner = owner.unwrap_or(submission.owner);

            let service = build_service(config)?;
            let report = service.submit(&owner, submission.items).await?;
            print_json(&report)
        }
        Commands::JobStatus { id } => {
            let service = build_service(config)?;
            print_json(&service.status(id)?)
        }
        Commands::Health => {
            let presets = load_presets(&config)?;
            SqliteJobRepository::open(&config.database_path)?;
            let store = AssetStore::open(&config.upload_dir)?;

            print_json(&HealthReport {
                status: "ok",
                version: env!("CARGO_PKG_VERSION"),
                presets: presets.len(),
                database: config.database_path.to_string_lossy().to_string(),
                storage: store.info()?,
            })
        }
    }
}

fn load_presets(config: &AppConfig) -> Result<PresetCatalog, AppError> {
    let catalog = match config.presets_file.as_deref() {
        Some(path) => PresetCatalog::from_path(path)?,
        None => PresetCatalog::builtin()?,
    };
    Ok(catalog)
}

fn build_service(config: Arc<AppConfig>) -> Result<JobService, AppError> {
    let presets = load_presets(&config)?;
    let repo = SqliteJobRepository::open(&config.database_path)?;
    let store = AssetStore::open(&config.upload_dir)?;
    log::info!(
        "服务就绪 - presets={} db={} assets={}",
        presets.len(),
        config.database_path.display(),
        store.dir().display()
    );

    Ok(JobService::new(config, Arc::new(presets), Arc::new(repo), store))
}

fn resize_file(
    input: &Path,
    output: Option<PathBuf>,
    params: TransformParams,
    config: &AppConfig,
) -> Result<ResizeSummary, AppError> {
    let started = Instant::now();
    let request = params.into_request()?;

    let metadata = std::fs::metadata(input)
        .map_err(|e| AppError::InvalidInput(format!("无法读取文件信息 '{}': {}", input.display(), e)))?;
    if metadata.len() > config.limits.max_file_size {
        return Err(engine::TransformError::PayloadTooLarge(format!(
            "文件 {} 字节，限制 {} 字节",
            metadata.len(),
            config.limits.max_file_size
        ))
        .into());
    }
    let bytes = std::fs::read(input)?;
    let load_ms = started.elapsed().as_millis();

    let transform_started = Instant::now();
    let result = engine::transform(&bytes, &request, &config.limits)?;
    let transform_ms = transform_started.elapsed().as_millis();

    let output = output
        .unwrap_or_else(|| default_output_path(input, request.format, result.width, result.height));
    std::fs::write(&output, &result.bytes)?;

    log::info!(
        "✅ 图片处理完成 - {} → {} load={}ms transform={}ms total={}ms",
        input.display(),
        output.display(),
        load_ms,
        transform_ms,
        started.elapsed().as_millis()
    );

    Ok(ResizeSummary {
        output: output.to_string_lossy().to_string(),
        width: result.width,
        height: result.height,
        mime_type: result.mime_type(),
        bytes: result.len(),
    })
}

/// `photo.png` → `photo_1080x1080.jpeg`
fn default_output_path(input: &Path, format: OutputFormat, width: u32, height: u32) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}_{}x{}.{}", stem, width, height, format.extension()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{}", json);
    Ok(())
}
