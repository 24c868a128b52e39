//! 应用配置模块
//!
//! # 设计思路
//!
//! 将所有“进程级”可调参数集中到 `AppConfig`，启动时读取一次，之后只读共享。
//! `Default` 即生产可用配置，环境变量只做覆盖。
//!
//! # 实现思路
//!
//! - `from_env` 读取真实环境变量；`from_lookup` 接收任意查找函数，便于测试时注入。
//! - 数值解析失败直接报 `AppError::Config`，不静默回退默认值，避免配置拼写错误被吞掉。
//! - 解析结束后调用 `ValidationLimits::validate` 做一次合理性校验。
//!
//! | 环境变量 | 字段 | 默认值 |
//! |----------|------|--------|
//! | `MAX_FILE_SIZE` | `limits.max_file_size` | 26214400（25MB） |
//! | `MAX_MEGAPIXELS` | `limits.max_megapixels` | 60 |
//! | `MAX_TARGET_EDGE` | `limits.max_target_edge` | 8192 |
//! | `UPLOAD_DIR` | `upload_dir` | `storage` |
//! | `DATABASE_PATH` | `database_path` | `storage/portal.db` |
//! | `PRESETS_FILE` | `presets_file` | 无（使用内置表） |
//! | `LOG_LEVEL` | `log_level` | `info` |
//! | `ITEM_TIMEOUT_MS` | `item_timeout_ms` | 30000 |

use std::path::PathBuf;
use std::str::FromStr;

use crate::engine::ValidationLimits;
use crate::error::AppError;

/// 应用配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 引擎输入校验上限。
    pub limits: ValidationLimits,
    /// 结果资源目录（对外以 `/assets/` 提供）。
    pub upload_dir: PathBuf,
    /// SQLite 数据库文件路径。
    pub database_path: PathBuf,
    /// 自定义预设表；为空时使用内置表。
    pub presets_file: Option<PathBuf>,
    /// `env_logger` 默认过滤级别。
    pub log_level: String,
    /// 单个任务条目允许的最长处理时间（毫秒）。
    pub item_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            limits: ValidationLimits::default(),
            upload_dir: PathBuf::from("storage"),
            database_path: PathBuf::from("storage/portal.db"),
            presets_file: None,
            log_level: "info".to_string(),
            item_timeout_ms: 30_000,
        }
    }
}

impl AppConfig {
    /// 从进程环境变量读取配置。
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值查找函数读取配置。
    ///
    /// # 示例
    /// ```rust
    /// use creative_portal::config::AppConfig;
    ///
    /// let config = AppConfig::from_lookup(|key| match key {
    ///     "MAX_MEGAPIXELS" => Some("12".to_string()),
    ///     _ => None,
    /// })?;
    /// assert_eq!(config.limits.max_megapixels, 12.0);
    /// # Ok::<(), creative_portal::error::AppError>(())
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = get("MAX_FILE_SIZE") {
            config.limits.max_file_size = parse_value("MAX_FILE_SIZE", &value)?;
        }
        if let Some(value) = get("MAX_MEGAPIXELS") {
            config.limits.max_megapixels = parse_value("MAX_MEGAPIXELS", &value)?;
        }
        if let Some(value) = get("MAX_TARGET_EDGE") {
            config.limits.max_target_edge = parse_value("MAX_TARGET_EDGE", &value)?;
        }
        if let Some(value) = get("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(value);
        }
        if let Some(value) = get("DATABASE_PATH") {
            config.database_path = PathBuf::from(value);
        }
        if let Some(value) = get("PRESETS_FILE") {
            config.presets_file = Some(PathBuf::from(value));
        }
        if let Some(value) = get("LOG_LEVEL") {
            config.log_level = value.to_ascii_lowercase();
        }
        if let Some(value) = get("ITEM_TIMEOUT_MS") {
            config.item_timeout_ms = parse_value("ITEM_TIMEOUT_MS", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// 校验配置合理性。
    pub fn validate(&self) -> Result<(), AppError> {
        self.limits
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;

        if self.item_timeout_ms == 0 {
            return Err(AppError::Config("ITEM_TIMEOUT_MS 必须大于 0".to_string()));
        }

        Ok(())
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| AppError::Config(format!("{} 的值无效（{}）：{}", key, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = AppConfig::from_lookup(|_| None).expect("defaults are valid");
        assert_eq!(config.limits, ValidationLimits::default());
        assert_eq!(config.upload_dir, PathBuf::from("storage"));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("MAX_FILE_SIZE", "1048576"),
            ("MAX_MEGAPIXELS", "12.5"),
            ("UPLOAD_DIR", "/srv/assets"),
            ("LOG_LEVEL", "DEBUG"),
            ("ITEM_TIMEOUT_MS", "5000"),
        ]))
        .expect("overrides are valid");

        assert_eq!(config.limits.max_file_size, 1_048_576);
        assert_eq!(config.limits.max_megapixels, 12.5);
        assert_eq!(config.upload_dir, PathBuf::from("/srv/assets"));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.item_timeout_ms, 5000);
    }

    #[test]
    fn malformed_number_is_config_error() {
        let result = AppConfig::from_lookup(lookup_from(&[("MAX_FILE_SIZE", "25MB")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[("ITEM_TIMEOUT_MS", "0")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = AppConfig::from_lookup(lookup_from(&[("UPLOAD_DIR", "   ")]))
            .expect("blank values fall back to defaults");
        assert_eq!(config.upload_dir, PathBuf::from("storage"));
    }
}
