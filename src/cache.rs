//! 持久化翻译缓存
//!
//! 缓存文件是一个扁平的JSON对象，键为 `语言::原文`，值为带原始首尾空白的译文。
//! 每写入一条新译文就整体落盘一次，进程被中断时最多丢失正在进行的那一条。

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::translation_error;

/// 生成缓存键
pub fn cache_key(lang: &str, text: &str) -> String {
    format!("{}::{}", lang, text)
}

/// 基于JSON文件的翻译缓存
#[derive(Debug, Clone)]
pub struct TranslationCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl TranslationCache {
    /// 从文件加载缓存
    ///
    /// 文件不存在、无法读取或内容不是JSON对象时返回空缓存，从不报错。
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => parse_entries(&raw).unwrap_or_else(|| {
                warn!("⚠️  缓存文件内容无效，使用空缓存: {}", path.display());
                BTreeMap::new()
            }),
            Err(e) => {
                debug!("缓存文件不可读，使用空缓存: {} ({})", path.display(), e);
                BTreeMap::new()
            }
        };

        debug!("💾 已加载 {} 条缓存: {}", entries.len(), path.display());
        Self { path, entries }
    }

    /// 缓存文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 查询缓存，空译文视为未命中
    pub fn get(&self, lang: &str, text: &str) -> Option<&str> {
        self.entries
            .get(&cache_key(lang, text))
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// 写入一条译文并立即落盘
    pub fn put(&mut self, lang: &str, text: &str, translated: &str) -> Result<()> {
        self.entries
            .insert(cache_key(lang, text), translated.to_string());
        self.flush()
    }

    /// 将整个缓存写回文件
    ///
    /// 先写入同目录临时文件再重命名，已持久化的条目不会因写入中断而损坏。
    pub fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    translation_error!(file_op, parent.display(), "创建", e)
                })?;
            }
        }

        let json = serde_json::to_string_pretty(&self.entries)?;
        let tmp_path = self.temp_path();
        fs::write(&tmp_path, json)
            .map_err(|e| translation_error!(file_op, tmp_path.display(), "写入", e))?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| translation_error!(file_op, self.path.display(), "重命名", e))?;

        Ok(())
    }

    /// 缓存条目数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 缓存是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn parse_entries(raw: &str) -> Option<BTreeMap<String, String>> {
    match serde_json::from_str::<Value>(raw).ok()? {
        Value::Object(map) => Some(
            map.into_iter()
                .filter_map(|(key, value)| match value {
                    Value::String(s) => Some((key, s)),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache = TranslationCache::load(dir.path().join("missing.json"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalid_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(TranslationCache::load(&path).is_empty());

        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(TranslationCache::load(&path).is_empty());
    }

    #[test]
    fn test_put_is_durable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = TranslationCache::load(&path);
        cache.put("ru", " Hello ", " Привет ").unwrap();

        // 模拟进程重启
        let reloaded = TranslationCache::load(&path);
        assert_eq!(reloaded.get("ru", " Hello "), Some(" Привет "));
        assert_eq!(reloaded.get("ru", "Hello"), None);
        assert_eq!(reloaded.get("lv", " Hello "), None);
        assert!(!dir.path().join("cache.json.tmp").exists());
    }

    #[test]
    fn test_file_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = TranslationCache::load(&path);
        cache.put("lv", "Book Now", "Rezervēt tagad").unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["lv::Book Now"], "Rezervēt tagad");
        assert!(raw.contains("\n  \"lv::Book Now\""));
    }

    #[test]
    fn test_empty_value_is_miss_and_non_strings_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, r#"{"ru::A": "", "ru::B": 3, "ru::C": "В"}"#).unwrap();

        let cache = TranslationCache::load(&path);
        assert_eq!(cache.get("ru", "A"), None);
        assert_eq!(cache.get("ru", "B"), None);
        assert_eq!(cache.get("ru", "C"), Some("В"));
        assert_eq!(cache.len(), 2);
    }
}
