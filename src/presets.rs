//! 预设尺寸目录模块
//!
//! # 设计思路
//!
//! 预设（如 `instagram_square` → 1080x1080）是一张静态表，启动时构建一次，
//! 之后作为不可变值通过引用 / `Arc` 共享，不使用全局单例或懒加载缓存。
//! 引擎只接受宽高整数，预设名到尺寸的解析在这里完成。
//!
//! # 实现思路
//!
//! - 内置表 `data/presets.json` 通过 `include_str!` 编进二进制。
//! - 也支持从自定义 JSON 文件加载，加载时校验 key 唯一、宽高为正。
//! - 查找按 key 建立索引，`get` 为 O(1)。

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

const BUILTIN_PRESETS: &str = include_str!("../data/presets.json");

/// 预设目录错误。
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("预设不存在：{0}")]
    NotFound(String),

    #[error("预设表无效：{0}")]
    Invalid(String),
}

/// 单个预设尺寸。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub key: String,
    pub label: String,
    pub w: u32,
    pub h: u32,
}

/// 按平台分组的预设。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetGroup {
    pub key: String,
    pub label: String,
    pub presets: Vec<Preset>,
}

#[derive(Debug, Deserialize)]
struct PresetTable {
    #[serde(default)]
    groups: Vec<PresetGroup>,
}

/// 不可变预设目录。
#[derive(Debug, Clone)]
pub struct PresetCatalog {
    groups: Vec<PresetGroup>,
    /// key → (组下标, 组内下标)
    index: HashMap<String, (usize, usize)>,
}

impl PresetCatalog {
    /// 加载内置预设表。
    ///
    /// # 示例
    /// ```rust
    /// use creative_portal::presets::PresetCatalog;
    ///
    /// let catalog = PresetCatalog::builtin()?;
    /// let preset = catalog.get("instagram_square")?;
    /// assert_eq!((preset.w, preset.h), (1080, 1080));
    /// # Ok::<(), creative_portal::presets::PresetError>(())
    /// ```
    pub fn builtin() -> Result<Self, PresetError> {
        Self::from_json(BUILTIN_PRESETS)
    }

    /// 从 JSON 文本构建目录。
    pub fn from_json(json: &str) -> Result<Self, PresetError> {
        let table: PresetTable = serde_json::from_str(json)
            .map_err(|e| PresetError::Invalid(format!("解析预设 JSON 失败：{}", e)))?;
        Self::from_groups(table.groups)
    }

    /// 从 JSON 文件构建目录。
    pub fn from_path(path: &Path) -> Result<Self, PresetError> {
        let content = fs::read_to_string(path).map_err(|e| {
            PresetError::Invalid(format!("读取预设文件 '{}' 失败：{}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_groups(groups: Vec<PresetGroup>) -> Result<Self, PresetError> {
        let mut index = HashMap::new();

        for (group_idx, group) in groups.iter().enumerate() {
            for (preset_idx, preset) in group.presets.iter().enumerate() {
                if preset.key.trim().is_empty() {
                    return Err(PresetError::Invalid(format!(
                        "分组 '{}' 中存在空 key",
                        group.key
                    )));
                }
                if preset.w == 0 || preset.h == 0 {
                    return Err(PresetError::Invalid(format!(
                        "预设 '{}' 的尺寸无效：{}x{}",
                        preset.key, preset.w, preset.h
                    )));
                }
                if index.insert(preset.key.clone(), (group_idx, preset_idx)).is_some() {
                    return Err(PresetError::Invalid(format!("预设 key 重复：{}", preset.key)));
                }
            }
        }

        Ok(Self { groups, index })
    }

    /// 按 key 查找预设。
    pub fn get(&self, key: &str) -> Result<&Preset, PresetError> {
        self.index
            .get(key)
            .map(|&(g, p)| &self.groups[g].presets[p])
            .ok_or_else(|| PresetError::NotFound(key.to_string()))
    }

    /// 按 key 解析出 (宽, 高)。
    pub fn dimensions(&self, key: &str) -> Result<(u32, u32), PresetError> {
        self.get(key).map(|preset| (preset.w, preset.h))
    }

    pub fn groups(&self) -> &[PresetGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_loads() {
        let catalog = PresetCatalog::builtin().expect("builtin presets should parse");

        assert!(!catalog.is_empty());
        assert_eq!(catalog.dimensions("instagram_story").ok(), Some((1080, 1920)));
        assert_eq!(catalog.groups()[0].key, "instagram");
    }

    #[test]
    fn unknown_key_is_not_found() {
        let catalog = PresetCatalog::builtin().expect("builtin presets should parse");
        assert!(matches!(catalog.get("myspace_banner"), Err(PresetError::NotFound(_))));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let json = r#"{"groups": [
            {"key": "a", "label": "A", "presets": [{"key": "dup", "label": "x", "w": 1, "h": 1}]},
            {"key": "b", "label": "B", "presets": [{"key": "dup", "label": "y", "w": 2, "h": 2}]}
        ]}"#;
        assert!(matches!(PresetCatalog::from_json(json), Err(PresetError::Invalid(_))));
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let json = r#"{"groups": [
            {"key": "a", "label": "A", "presets": [{"key": "flat", "label": "x", "w": 100, "h": 0}]}
        ]}"#;
        assert!(matches!(PresetCatalog::from_json(json), Err(PresetError::Invalid(_))));
    }

    #[test]
    fn malformed_json_is_invalid() {
        assert!(matches!(PresetCatalog::from_json("{not json"), Err(PresetError::Invalid(_))));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("presets.json");
        fs::write(
            &path,
            r#"{"groups": [{"key": "web", "label": "Web", "presets": [{"key": "og", "label": "OG", "w": 1200, "h": 630}]}]}"#,
        )
        .expect("write presets");

        let catalog = PresetCatalog::from_path(&path).expect("file presets should parse");
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.dimensions("og").ok(), Some((1200, 630)));
    }
}
