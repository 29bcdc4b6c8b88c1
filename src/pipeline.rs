//! 本地化流程编排
//!
//! 发现文件 → 逐语言重置输出目录 → 逐文件分派（HTML / 脚本 / 原样复制）。
//! 全程串行：一次只处理一个语言、一个文件、一个远程请求。
//! 单个文件的错误只记录日志，不影响其余文件和语言。

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Local;
use glob::{MatchOptions, Pattern};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::api_constants::pipeline_config::IGNORED_DIRS;
use crate::config::LocalizeConfig;
use crate::html_processor::localize_html;
use crate::script_processor::localize_script;
use crate::stats::{format_duration, LanguageReport, RunSummary};
use crate::translator::{TranslationBackend, Translator};
use crate::utils::{output_path_for, to_slash_path};

/// 按扩展名划分的文件处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Markup,
    Script,
    Copy,
}

impl FileKind {
    pub fn classify(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "html" | "htm" => FileKind::Markup,
            "js" | "mjs" | "cjs" | "jsx" => FileKind::Script,
            _ => FileKind::Copy,
        }
    }
}

/// 单个文件的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOutcome {
    Markup {
        units: usize,
        unique_texts: usize,
        failed: usize,
    },
    Script {
        units: usize,
        unique_texts: usize,
        failed: usize,
    },
    ParseFallback,
    Copied,
}

impl LanguageReport {
    fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Markup {
                units,
                unique_texts,
                failed,
            } => {
                self.html_files += 1;
                self.units += units;
                self.unique_texts += unique_texts;
                self.failed_texts += failed;
            }
            FileOutcome::Script {
                units,
                unique_texts,
                failed,
            } => {
                self.script_files += 1;
                self.units += units;
                self.unique_texts += unique_texts;
                self.failed_texts += failed;
            }
            FileOutcome::ParseFallback => self.parse_fallbacks += 1,
            FileOutcome::Copied => self.copied_files += 1,
        }
    }
}

fn is_ignored_dir(entry: &walkdir::DirEntry, out_dir: &Path) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    IGNORED_DIRS.contains(&name.as_ref()) || entry.path() == out_dir
}

/// 在根目录下按模式查找文件
///
/// 返回排序去重后的相对路径。匹配时 `*` 不跨越目录分隔符，`**` 匹配任意层目录。
pub fn discover_files(root: &Path, patterns: &[String], out_dir: &Path) -> Result<Vec<PathBuf>> {
    let compiled = patterns
        .iter()
        .map(|p| Pattern::new(p).with_context(|| format!("无效的匹配模式: {}", p)))
        .collect::<Result<Vec<_>>>()?;
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut files = BTreeSet::new();
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| !is_ignored_dir(entry, out_dir));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("⚠️  无法访问路径: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = match entry.path().strip_prefix(root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => continue,
        };
        let slash_path = to_slash_path(&relative);
        if compiled
            .iter()
            .any(|pattern| pattern.matches_with(&slash_path, options))
        {
            files.insert(relative);
        }
    }

    Ok(files.into_iter().collect())
}

fn write_output(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("创建目录失败: {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("写入文件失败: {}", path.display()))
}

/// 清空并重建某语言的输出目录
fn reset_output_dir(lang_dir: &Path) -> Result<()> {
    if lang_dir.exists() {
        fs::remove_dir_all(lang_dir)
            .with_context(|| format!("删除输出目录失败: {}", lang_dir.display()))?;
    }
    fs::create_dir_all(lang_dir)
        .with_context(|| format!("创建输出目录失败: {}", lang_dir.display()))
}

async fn process_file<B: TranslationBackend>(
    config: &LocalizeConfig,
    translator: &mut Translator<B>,
    lang: &str,
    relative: &Path,
) -> Result<FileOutcome> {
    let source_path = config.root().join(relative);
    let out_path = output_path_for(&config.out_dir(), lang, relative);

    match FileKind::classify(relative) {
        FileKind::Markup => {
            let html = fs::read_to_string(&source_path)
                .with_context(|| format!("读取文件失败: {}", source_path.display()))?;
            let doc = localize_html(&html, translator, lang)
                .await
                .with_context(|| format!("HTML处理失败: {}", source_path.display()))?;
            write_output(&out_path, doc.html.as_bytes())?;
            info!("[HTML] {} -> {}", source_path.display(), out_path.display());
            Ok(FileOutcome::Markup {
                units: doc.units,
                unique_texts: doc.unique_texts,
                failed: doc.failed,
            })
        }
        FileKind::Script => {
            let source = fs::read_to_string(&source_path)
                .with_context(|| format!("读取文件失败: {}", source_path.display()))?;
            let file_name = to_slash_path(relative);
            match localize_script(&source, &file_name, config.dialect(), translator, lang).await {
                Ok(script) => {
                    write_output(&out_path, script.source.as_bytes())?;
                    info!("[JS] {} -> {}", source_path.display(), out_path.display());
                    Ok(FileOutcome::Script {
                        units: script.literals,
                        unique_texts: script.unique_texts,
                        failed: script.failed,
                    })
                }
                Err(e) if e.is_script_parse() => {
                    warn!("⚠️  脚本解析失败，原样复制: {}", e);
                    write_output(&out_path, source.as_bytes())?;
                    Ok(FileOutcome::ParseFallback)
                }
                Err(e) => Err(e).with_context(|| {
                    format!("脚本处理失败: {}", source_path.display())
                }),
            }
        }
        FileKind::Copy => {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("创建目录失败: {}", parent.display()))?;
            }
            fs::copy(&source_path, &out_path).with_context(|| {
                format!(
                    "复制文件失败: {} -> {}",
                    source_path.display(),
                    out_path.display()
                )
            })?;
            debug!("[COPY] {} -> {}", source_path.display(), out_path.display());
            Ok(FileOutcome::Copied)
        }
    }
}

/// 执行一次完整的本地化
///
/// 只有输出目录无法重置等全局错误才会返回 `Err`；单个文件的失败计入统计后继续。
pub async fn run<B: TranslationBackend>(
    config: &LocalizeConfig,
    translator: &mut Translator<B>,
) -> Result<RunSummary> {
    // 语言代码会拼入待删除的目录路径，必须先校验
    config.validate()?;

    let start = Instant::now();
    info!("🚀 开始本地化");
    info!(
        "API: {} | 目标语言: {}",
        config.api_url(),
        config.target_langs().join(",")
    );

    let out_dir = config.out_dir();
    let files = discover_files(config.root(), config.patterns(), &out_dir)?;
    if files.is_empty() {
        info!(
            "未找到需要翻译的文件 (模式: {})，退出",
            config.patterns().join(", ")
        );
        return Ok(RunSummary::empty());
    }
    info!("📂 发现 {} 个文件", files.len());

    let mut languages = Vec::new();
    for lang in config.target_langs() {
        let lang_dir = out_dir.join(lang);
        reset_output_dir(&lang_dir)?;

        let mut report = LanguageReport::new(lang);
        for relative in &files {
            match process_file(config, translator, lang, relative).await {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    report.failed_files += 1;
                    error!("❌ 处理文件出错 {}: {:#}", relative.display(), e);
                }
            }
        }
        info!(
            "🌐 [{}] 完成: 写出 {} 个文件, 失败 {} 个",
            lang,
            report.written_files(),
            report.failed_files
        );
        languages.push(report);
    }

    let elapsed = start.elapsed();
    info!(
        "✅ 本地化完成，输出目录: {}，总耗时: {}",
        out_dir.display(),
        format_duration(elapsed)
    );

    Ok(RunSummary {
        files_discovered: files.len(),
        languages,
        translator: translator.stats(),
        elapsed,
        finished_at: Local::now(),
    })
}
