//! 翻译客户端
//!
//! 先查缓存，未命中时向LibreTranslate兼容接口发送单条请求，
//! 成功后写入缓存并等待固定的礼貌间隔。不做重试，错误直接返回给调用方。

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::api_constants::{api_config, service_config};
use crate::cache::TranslationCache;
use crate::error::Result;
use crate::translation_error;
use crate::utils::{is_whitespace_only, preview_text, split_surrounding_whitespace};

/// 远程翻译服务抽象
pub trait TranslationBackend {
    /// 发送一次翻译请求，返回远程译文
    fn request(&self, text: &str, target: &str) -> impl Future<Output = Result<String>> + Send;
}

/// 基于reqwest的HTTP翻译后端
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl HttpBackend {
    /// 创建HTTP后端
    pub fn new(api_url: &str, api_key: Option<&str>) -> Result<Self> {
        Self::with_timeout(
            api_url,
            api_key,
            Duration::from_secs(service_config::REQUEST_TIMEOUT_SECONDS),
        )
    }

    /// 使用自定义超时创建HTTP后端
    pub fn with_timeout(api_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| translation_error!(config, "http_client", e))?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()).map(str::to_string),
        })
    }

    /// 构建请求体
    pub fn request_body(&self, text: &str, target: &str) -> Value {
        let mut payload = json!({
            "q": text,
            "source": api_config::SOURCE_LANG,
            "target": target,
            "format": api_config::TEXT_FORMAT,
        });
        if let Some(key) = &self.api_key {
            payload["api_key"] = Value::String(key.clone());
        }
        payload
    }
}

impl TranslationBackend for HttpBackend {
    async fn request(&self, text: &str, target: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.api_url)
            .json(&self.request_body(text, target))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(translation_error!(
                translation_api,
                status.as_u16(),
                message,
                self.api_url
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| translation_error!(malformed_response, e))?;

        Ok(parse_translation_response(&body))
    }
}

/// 从响应体中解析译文
///
/// 依次尝试JSON对象的已知字段、JSON字符串，最后退回到原始响应文本。
pub fn parse_translation_response(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => api_config::RESPONSE_TEXT_FIELDS
            .iter()
            .filter_map(|field| map.get(*field).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .unwrap_or(body)
            .to_string(),
        Ok(Value::String(s)) => s,
        _ => body.to_string(),
    }
}

/// 翻译客户端统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TranslatorStats {
    pub cache_hits: usize,
    pub remote_calls: usize,
    pub failures: usize,
}

/// 带缓存的翻译客户端
pub struct Translator<B> {
    backend: B,
    cache: TranslationCache,
    polite_delay: Duration,
    stats: TranslatorStats,
}

impl<B: TranslationBackend> Translator<B> {
    /// 创建翻译客户端，缓存句柄由调用方加载后传入
    pub fn new(backend: B, cache: TranslationCache) -> Self {
        Self {
            backend,
            cache,
            polite_delay: Duration::from_millis(service_config::POLITE_DELAY_MS),
            stats: TranslatorStats::default(),
        }
    }

    /// 设置远程调用后的等待时间
    pub fn with_polite_delay(mut self, delay: Duration) -> Self {
        self.polite_delay = delay;
        self
    }

    /// 翻译单条文本
    ///
    /// 译文 = 原文前导空白 + 远程译文 + 原文尾随空白
    pub async fn translate(&mut self, text: &str, target: &str) -> Result<String> {
        if is_whitespace_only(text) {
            return Ok(text.to_string());
        }

        if let Some(cached) = self.cache.get(target, text) {
            self.stats.cache_hits += 1;
            return Ok(cached.to_string());
        }

        self.stats.remote_calls += 1;
        let remote = match self.backend.request(text, target).await {
            Ok(remote) => remote,
            Err(e) => {
                self.stats.failures += 1;
                error!(
                    "翻译API错误，文本: {:?} -> {}",
                    preview_text(text, service_config::LOG_TEXT_PREVIEW_CHARS),
                    e
                );
                return Err(e);
            }
        };

        let (leading, _, trailing) = split_surrounding_whitespace(text);
        let translated = format!("{}{}{}", leading, remote, trailing);
        debug!("🌐 [{}] {:?} -> {:?}", target, text, translated);

        if let Err(e) = self.cache.put(target, text, &translated) {
            warn!("⚠️  缓存写入失败 {}: {}", self.cache.path().display(), e);
        }

        if !self.polite_delay.is_zero() {
            tokio::time::sleep(self.polite_delay).await;
        }

        Ok(translated)
    }

    /// 翻译后端
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 当前统计
    pub fn stats(&self) -> TranslatorStats {
        self.stats
    }

    /// 缓存句柄
    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// 记录调用的假翻译后端
    #[derive(Default)]
    pub struct FakeBackend {
        responses: HashMap<String, String>,
        failing: Vec<String>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl FakeBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// 为某段原文指定返回值，未指定时返回 `[目标语言] 原文`
        pub fn with_response(mut self, text: &str, translated: &str) -> Self {
            self.responses.insert(text.to_string(), translated.to_string());
            self
        }

        /// 使某段原文的请求失败
        pub fn failing_on(mut self, text: &str) -> Self {
            self.failing.push(text.to_string());
            self
        }

        pub fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl TranslationBackend for FakeBackend {
        async fn request(&self, text: &str, target: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((text.to_string(), target.to_string()));
            if self.failing.iter().any(|t| t == text) {
                return Err(translation_error!(network, "connection refused"));
            }
            Ok(self
                .responses
                .get(text)
                .cloned()
                .unwrap_or_else(|| format!("[{}] {}", target, text.trim())))
        }
    }

    /// 创建使用临时缓存文件、无等待的翻译客户端
    pub fn translator(backend: FakeBackend, dir: &tempfile::TempDir) -> Translator<FakeBackend> {
        let cache = TranslationCache::load(dir.path().join("cache.json"));
        Translator::new(backend, cache).with_polite_delay(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{translator, FakeBackend};
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_response_shapes() {
        assert_eq!(parse_translation_response(r#"{"translatedText":"Sveiki"}"#), "Sveiki");
        assert_eq!(parse_translation_response(r#"{"result":"Привет"}"#), "Привет");
        assert_eq!(
            parse_translation_response(r#"{"translatedText":"","translation":"Labdien"}"#),
            "Labdien"
        );
        assert_eq!(parse_translation_response(r#""Hallo""#), "Hallo");
        assert_eq!(parse_translation_response("plain text body"), "plain text body");
        assert_eq!(parse_translation_response(r#"{"other":1}"#), r#"{"other":1}"#);
    }

    #[test]
    fn test_request_body() {
        let backend = HttpBackend::new("http://localhost:5000/translate", Some("secret")).unwrap();
        let body = backend.request_body("Hello", "ru");
        assert_eq!(
            body,
            json!({"q": "Hello", "source": "en", "target": "ru", "format": "text", "api_key": "secret"})
        );

        let anonymous = HttpBackend::new("http://localhost:5000/translate", Some("")).unwrap();
        assert!(anonymous.request_body("Hello", "ru").get("api_key").is_none());
    }

    #[tokio::test]
    async fn test_whitespace_preserved() {
        let dir = TempDir::new().unwrap();
        let backend = FakeBackend::new().with_response("  Hello world  ", "Привет мир");
        let mut t = translator(backend, &dir);

        let out = t.translate("  Hello world  ", "ru").await.unwrap();
        assert_eq!(out, "  Привет мир  ");
        // 远程服务收到的是未裁剪的原文
        assert_eq!(t.backend().calls(), vec![("  Hello world  ".to_string(), "ru".to_string())]);
    }

    #[tokio::test]
    async fn test_whitespace_only_skips_remote() {
        let dir = TempDir::new().unwrap();
        let backend = FakeBackend::new();
        let mut t = translator(backend, &dir);

        assert_eq!(t.translate("  \n ", "ru").await.unwrap(), "  \n ");
        assert_eq!(t.translate("", "ru").await.unwrap(), "");
        assert!(t.backend().calls().is_empty());
        assert_eq!(t.stats(), TranslatorStats::default());
    }

    #[tokio::test]
    async fn test_cache_hit_avoids_remote() {
        let dir = TempDir::new().unwrap();
        let backend = FakeBackend::new();
        let mut t = translator(backend, &dir);

        let first = t.translate("Book Now", "lv").await.unwrap();
        let second = t.translate("Book Now", "lv").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(t.backend().calls().len(), 1);
        assert_eq!(
            t.stats(),
            TranslatorStats { cache_hits: 1, remote_calls: 1, failures: 0 }
        );

        // 不同语言使用不同的缓存键
        t.translate("Book Now", "ru").await.unwrap();
        assert_eq!(t.backend().calls().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_propagates_without_caching() {
        let dir = TempDir::new().unwrap();
        let backend = FakeBackend::new().failing_on("Broken");
        let mut t = translator(backend, &dir);

        assert!(t.translate("Broken", "ru").await.is_err());
        assert!(t.translate("Broken", "ru").await.is_err());
        assert_eq!(t.backend().calls().len(), 2);
        assert_eq!(t.stats().failures, 2);
        assert!(t.cache().get("ru", "Broken").is_none());
    }

    #[tokio::test]
    async fn test_translation_survives_restart() {
        let dir = TempDir::new().unwrap();
        {
            let mut t = translator(FakeBackend::new(), &dir);
            t.translate("Welcome", "ru").await.unwrap();
            assert_eq!(t.backend().calls().len(), 1);
        }

        // 重启后直接命中持久化缓存
        let mut t = translator(FakeBackend::new(), &dir);
        assert_eq!(t.translate("Welcome", "ru").await.unwrap(), "[ru] Welcome");
        assert!(t.backend().calls().is_empty());
        assert_eq!(t.stats().cache_hits, 1);
    }

    /// 启动只响应一次请求的本地HTTP服务，返回地址和收到的请求
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + length || n == 0 {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{}/translate", addr), handle)
    }

    #[tokio::test]
    async fn test_http_backend_round_trip() {
        let (url, server) = serve_once("HTTP/1.1 200 OK", r#"{"translatedText":"Sveiki"}"#).await;
        let backend = HttpBackend::new(&url, None).unwrap();

        let out = backend.request("Hello", "lv").await.unwrap();
        assert_eq!(out, "Sveiki");

        let request = server.await.unwrap();
        let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
        let sent: Value = serde_json::from_str(body).unwrap();
        assert_eq!(sent, json!({"q": "Hello", "source": "en", "target": "lv", "format": "text"}));
    }

    #[tokio::test]
    async fn test_http_backend_error_status() {
        let (url, server) = serve_once("HTTP/1.1 429 Too Many Requests", r#"{"error":"slow down"}"#).await;
        let backend = HttpBackend::new(&url, None).unwrap();

        let err = backend.request("Hello", "lv").await.unwrap_err();
        match err {
            crate::error::TranslationError::TranslationApi { status_code, .. } => {
                assert_eq!(status_code, 429)
            }
            other => panic!("unexpected error: {}", other),
        }
        server.await.unwrap();
    }
}
