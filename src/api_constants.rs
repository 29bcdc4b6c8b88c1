/// 翻译API配置常量
///
/// 该文件定义了所有翻译服务及本地化流程相关的常量配置，方便统一管理和维护

/// 默认翻译API配置
pub mod api_config {
    /// 默认翻译API地址 (LibreTranslate兼容接口)
    pub const DEFAULT_API_URL: &str = "https://libretranslate.com/translate";

    /// 源文本语言
    pub const SOURCE_LANG: &str = "en";

    /// 请求文本格式
    pub const TEXT_FORMAT: &str = "text";

    /// 响应中可能携带译文的字段，按优先级排列
    pub const RESPONSE_TEXT_FIELDS: &[&str] = &["translatedText", "result", "translation"];
}

/// 翻译服务配置
pub mod service_config {
    /// 默认目标语言列表 (逗号分隔)
    pub const DEFAULT_TARGET_LANGS: &str = "lv,ru";

    /// 请求超时时间（秒）
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 20;

    /// 每次远程调用后的礼貌等待时间（毫秒）
    pub const POLITE_DELAY_MS: u64 = 100;

    /// 错误日志中截取的文本长度
    pub const LOG_TEXT_PREVIEW_CHARS: usize = 100;
}

/// 本地化流程配置
pub mod pipeline_config {
    /// 默认输出目录 (相对于项目根目录)
    pub const DEFAULT_OUT_DIR: &str = "dist";

    /// 默认缓存文件 (相对于项目根目录)
    pub const DEFAULT_CACHE_FILE: &str = ".translation-cache.json";

    /// 默认文件匹配模式
    pub const DEFAULT_FILE_GLOBS: &[&str] = &["**/*.html", "**/*.js"];

    /// 扫描时跳过的目录
    pub const IGNORED_DIRS: &[&str] = &["node_modules", "dist", ".git", ".github"];

    /// 需要翻译的HTML属性
    pub const HTML_ATTRS_TO_TRANSLATE: &[&str] =
        &["alt", "title", "placeholder", "aria-label", "value", "label"];

    /// 内容不参与翻译的HTML标签
    pub const SKIPPED_HTML_TAGS: &[&str] = &["script", "style"];

    /// 模块加载函数名
    pub const MODULE_LOADERS: &[&str] = &["require"];
}

/// 验证API URL是否有效
pub fn is_valid_api_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.scheme() == "http" || parsed.scheme() == "https",
        Err(_) => false,
    }
}

/// 解析逗号分隔的目标语言列表
///
/// 去除空白和空项，保留首次出现的顺序并去重
pub fn parse_target_languages(raw: &str) -> Vec<String> {
    let mut langs: Vec<String> = Vec::new();
    for lang in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !langs.iter().any(|l| l == lang) {
            langs.push(lang.to_string());
        }
    }
    langs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_validation() {
        assert!(is_valid_api_url("https://libretranslate.com/translate"));
        assert!(is_valid_api_url("http://localhost:5000/translate"));
        assert!(!is_valid_api_url("ftp://example.com"));
        assert!(!is_valid_api_url("invalid-url"));
    }

    #[test]
    fn test_parse_target_languages() {
        assert_eq!(parse_target_languages("lv,ru"), vec!["lv", "ru"]);
        assert_eq!(parse_target_languages(" de , ,fr,de "), vec!["de", "fr"]);
        assert!(parse_target_languages(" , ").is_empty());
    }

    #[test]
    fn test_default_languages() {
        assert_eq!(
            parse_target_languages(service_config::DEFAULT_TARGET_LANGS),
            vec!["lv", "ru"]
        );
    }
}
