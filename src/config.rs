//! 配置管理模块
//!
//! 提供CLI参数解析和本地化配置管理功能。所有参数均可省略：
//! 未指定时依次回退到环境变量和默认值，因此无参数运行即可完成一次完整的本地化。

// 标准库导入
use std::path::{Path, PathBuf};

// 第三方crate导入
use clap::Parser;

// 本地模块导入
use crate::api_constants::{
    api_config, is_valid_api_url, parse_target_languages, pipeline_config, service_config,
};
use crate::error::Result;
use crate::script_processor::ScriptDialect;
use crate::translation_error;

/// 本地化配置结构体
///
/// 启动时构建一次，之后以只读方式传给流程各部分。支持Builder模式进行链式配置。
///
/// # Examples
///
/// ```rust
/// use site_localizer::config::LocalizeConfig;
///
/// let config = LocalizeConfig::new("/srv/site")
///     .with_api_url("http://localhost:5000/translate")
///     .with_target_languages(&["de", "fr"]);
/// assert_eq!(config.target_langs(), ["de", "fr"]);
/// ```
#[derive(Debug, Clone)]
pub struct LocalizeConfig {
    /// 项目根目录
    root: PathBuf,
    /// 输出目录（相对路径基于根目录）
    out_dir: PathBuf,
    /// 缓存文件（相对路径基于根目录）
    cache_file: PathBuf,
    /// 翻译API服务地址
    api_url: String,
    /// 可选API密钥
    api_key: Option<String>,
    /// 目标语言，按配置顺序处理
    target_langs: Vec<String>,
    /// 文件匹配模式
    patterns: Vec<String>,
    /// 脚本解析语法
    dialect: ScriptDialect,
}

impl LocalizeConfig {
    /// 创建新的配置实例
    ///
    /// 返回具有默认值的配置实例：
    /// - API地址: LibreTranslate公共接口
    /// - 目标语言: lv, ru
    /// - 输出目录: dist
    /// - 缓存文件: .translation-cache.json
    /// - 文件模式: **/*.html, **/*.js
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            out_dir: PathBuf::from(pipeline_config::DEFAULT_OUT_DIR),
            cache_file: PathBuf::from(pipeline_config::DEFAULT_CACHE_FILE),
            api_url: api_config::DEFAULT_API_URL.to_string(),
            api_key: None,
            target_langs: parse_target_languages(service_config::DEFAULT_TARGET_LANGS),
            patterns: pipeline_config::DEFAULT_FILE_GLOBS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            dialect: ScriptDialect::default(),
        }
    }

    /// 从命令行参数构建并验证配置
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let root = match &cli.root {
            Some(root) => root.clone(),
            None => std::env::current_dir()
                .map_err(|e| translation_error!(config, "root", e))?,
        };

        let mut config = Self::new(root)
            .with_api_url(&cli.api)
            .with_out_dir(&cli.out_dir)
            .with_cache_file(&cli.cache_file)
            .with_target_languages(&parse_target_languages(&cli.langs));

        if let Some(key) = &cli.api_key {
            config = config.with_api_key(key);
        }
        if !cli.include.is_empty() {
            config = config.with_patterns(&cli.include);
        }

        config.validate()?;
        Ok(config)
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        if !is_valid_api_url(&self.api_url) {
            return Err(translation_error!(
                config,
                "api_url",
                format!("无效的API地址: {}", self.api_url)
            ));
        }
        if self.target_langs.is_empty() {
            return Err(translation_error!(config, "target_langs", "未配置目标语言"));
        }
        if let Some(bad) = self.target_langs.iter().find(|l| !is_safe_path_component(l)) {
            return Err(translation_error!(
                config,
                "target_langs",
                format!("语言代码不能用作目录名: {:?}", bad)
            ));
        }
        if self.patterns.is_empty() {
            return Err(translation_error!(config, "patterns", "未配置文件匹配模式"));
        }
        if let Some(bad) = self
            .patterns
            .iter()
            .find(|p| glob::Pattern::new(p).is_err())
        {
            return Err(translation_error!(
                config,
                "patterns",
                format!("无效的匹配模式: {}", bad)
            ));
        }
        Ok(())
    }

    /// 获取项目根目录
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 获取输出目录
    pub fn out_dir(&self) -> PathBuf {
        self.root.join(&self.out_dir)
    }

    /// 获取缓存文件路径
    pub fn cache_file(&self) -> PathBuf {
        self.root.join(&self.cache_file)
    }

    /// 获取API地址
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// 获取API密钥
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// 获取目标语言列表
    pub fn target_langs(&self) -> &[String] {
        &self.target_langs
    }

    /// 获取文件匹配模式
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// 获取脚本解析语法
    pub fn dialect(&self) -> ScriptDialect {
        self.dialect
    }

    /// 设置API地址
    pub fn with_api_url(mut self, url: &str) -> Self {
        self.api_url = url.to_string();
        self
    }

    /// 设置API密钥，空字符串视为未设置
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string()).filter(|k| !k.is_empty());
        self
    }

    /// 设置目标语言
    pub fn with_target_languages<S: AsRef<str>>(mut self, langs: &[S]) -> Self {
        self.target_langs = langs.iter().map(|l| l.as_ref().to_string()).collect();
        self
    }

    /// 设置输出目录
    pub fn with_out_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.out_dir = dir.as_ref().to_path_buf();
        self
    }

    /// 设置缓存文件
    pub fn with_cache_file<P: AsRef<Path>>(mut self, file: P) -> Self {
        self.cache_file = file.as_ref().to_path_buf();
        self
    }

    /// 设置文件匹配模式
    pub fn with_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Self {
        self.patterns = patterns.iter().map(|p| p.as_ref().to_string()).collect();
        self
    }
}

/// 语言代码会成为输出目录名，只允许单个普通路径段
fn is_safe_path_component(lang: &str) -> bool {
    !lang.is_empty()
        && lang != "."
        && lang != ".."
        && !lang.contains(['/', '\\'])
        && !Path::new(lang).is_absolute()
}

/// CLI参数结构
#[derive(Parser, Debug)]
#[command(author, version, about = "静态站点本地化工具 - 翻译HTML与JavaScript并生成多语言目录", long_about = None)]
pub struct Cli {
    /// 翻译API地址
    #[arg(short, long, env = "TRANSLATE_API_URL", default_value = api_config::DEFAULT_API_URL)]
    pub api: String,

    /// 翻译API密钥 (可选)
    #[arg(long, env = "TRANSLATE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// 目标语言代码，逗号分隔 (如: lv,ru)
    #[arg(short, long, env = "TARGET_LANGS", default_value = service_config::DEFAULT_TARGET_LANGS)]
    pub langs: String,

    /// 项目根目录 (默认为当前目录)
    #[arg(long, env = "LOCALIZE_ROOT", value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// 输出目录 (相对于根目录)
    #[arg(long, value_name = "DIR", default_value = pipeline_config::DEFAULT_OUT_DIR)]
    pub out_dir: PathBuf,

    /// 翻译缓存文件 (相对于根目录)
    #[arg(long, value_name = "FILE", default_value = pipeline_config::DEFAULT_CACHE_FILE)]
    pub cache_file: PathBuf,

    /// 文件匹配模式，可重复指定 (默认: **/*.html, **/*.js)
    #[arg(long = "include", value_name = "GLOB")]
    pub include: Vec<String>,

    /// 详细输出模式
    #[arg(short, long)]
    pub verbose: bool,

    /// 静默模式 (仅输出错误)
    #[arg(short, long)]
    pub quiet: bool,

    /// 显示运行统计
    #[arg(long)]
    pub stats: bool,
}
