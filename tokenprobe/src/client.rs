//! Client configuration and transport layer.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client as HttpClient, Proxy};

use crate::credentials::mask_api_key;
use crate::error::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";

/// Chat completions 客户端。
///
/// 凭据随客户端显式传递，不存在进程级全局状态。
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub http: HttpClient,
    pub config: ClientConfig,
    pub base_url: String,
}

/// 客户端配置。
#[derive(Clone)]
pub struct ClientConfig {
    /// API 密钥。
    pub api_key: String,
    /// 可选的组织 ID（`OpenAI-Organization` 头）。
    pub organization: Option<String>,
    /// HTTP 配置。
    pub http_options: HttpOptions,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &mask_api_key(&self.api_key))
            .field("organization", &self.organization)
            .field("http_options", &self.http_options)
            .finish()
    }
}

/// HTTP 配置。
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    pub timeout: Option<u64>,
    pub proxy: Option<String>,
    pub headers: HashMap<String, String>,
    pub base_url: Option<String>,
}

impl Client {
    /// 以 API Key 创建客户端。
    ///
    /// # Errors
    /// 当配置无效或构建客户端失败时返回错误。
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::builder().api_key(api_key).build()
    }

    /// 从环境变量创建客户端。
    ///
    /// # Errors
    /// 当环境变量缺失或构建客户端失败时返回错误。
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| Error::InvalidConfig {
            message: "OPENAI_API_KEY not found".into(),
        })?;
        Self::builder_from_env(api_key).build()
    }

    /// 以给定密钥创建 Builder，并应用环境变量中的其他覆盖项。
    #[must_use]
    pub fn builder_from_env(api_key: impl Into<String>) -> ClientBuilder {
        let mut builder = Self::builder().api_key(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            if !base_url.trim().is_empty() {
                builder = builder.base_url(base_url);
            }
        }
        if let Ok(organization) = std::env::var("OPENAI_ORG_ID") {
            if !organization.trim().is_empty() {
                builder = builder.organization(organization);
            }
        }
        builder
    }

    /// 创建 Builder。
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// 访问 Chat Completions API。
    #[must_use]
    pub fn completions(&self) -> crate::completions::Completions {
        crate::completions::Completions::new(self.inner.clone())
    }

    /// 客户端配置。
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// 当前使用的基础 URL（总以 `/` 结尾）。
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }
}

/// 客户端 Builder。
#[derive(Default)]
pub struct ClientBuilder {
    api_key: Option<String>,
    organization: Option<String>,
    http_options: HttpOptions,
}

impl ClientBuilder {
    /// 设置 API Key。
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// 设置组织 ID。
    #[must_use]
    pub fn organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// 设置请求超时（秒）。
    #[must_use]
    pub const fn timeout(mut self, secs: u64) -> Self {
        self.http_options.timeout = Some(secs);
        self
    }

    /// 设置代理。
    #[must_use]
    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.http_options.proxy = Some(url.into());
        self
    }

    /// 增加默认 HTTP 头。
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.http_options.headers.insert(key.into(), value.into());
        self
    }

    /// 设置自定义基础 URL。
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http_options.base_url = Some(base_url.into());
        self
    }

    /// 构建客户端。
    ///
    /// # Errors
    /// 当缺少密钥、参数无效或构建 HTTP 客户端失败时返回错误。
    pub fn build(self) -> Result<Client> {
        let Self {
            api_key,
            organization,
            http_options,
        } = self;

        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::InvalidConfig {
                message: "API key required".into(),
            })?;
        let headers = Self::build_headers(&http_options, &api_key, organization.as_deref())?;
        let http = Self::build_http_client(&http_options, headers)?;
        let base_url = http_options
            .base_url
            .as_deref()
            .map_or_else(|| DEFAULT_BASE_URL.to_string(), normalize_base_url);

        Ok(Client {
            inner: Arc::new(ClientInner {
                http,
                config: ClientConfig {
                    api_key,
                    organization,
                    http_options,
                },
                base_url,
            }),
        })
    }

    fn build_headers(
        http_options: &HttpOptions,
        api_key: &str,
        organization: Option<&str>,
    ) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (key, value) in &http_options.headers {
            let name =
                HeaderName::from_bytes(key.as_bytes()).map_err(|_| Error::InvalidConfig {
                    message: format!("Invalid header name: {key}"),
                })?;
            let value = HeaderValue::from_str(value).map_err(|_| Error::InvalidConfig {
                message: format!("Invalid header value for {key}"),
            })?;
            headers.insert(name, value);
        }

        if !headers.contains_key(AUTHORIZATION) {
            let mut header_value = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(
                |_| Error::InvalidConfig {
                    message: "Invalid API key value".into(),
                },
            )?;
            header_value.set_sensitive(true);
            headers.insert(AUTHORIZATION, header_value);
        }

        if let Some(organization) = organization {
            let name = HeaderName::from_static("openai-organization");
            if !headers.contains_key(&name) {
                let value =
                    HeaderValue::from_str(organization).map_err(|_| Error::InvalidConfig {
                        message: "Invalid organization value".into(),
                    })?;
                headers.insert(name, value);
            }
        }

        Ok(headers)
    }

    fn build_http_client(http_options: &HttpOptions, headers: HeaderMap) -> Result<HttpClient> {
        let mut http_builder = HttpClient::builder();
        if let Some(timeout) = http_options.timeout {
            http_builder = http_builder.timeout(Duration::from_secs(timeout));
        }

        if let Some(proxy_url) = &http_options.proxy {
            let proxy = Proxy::all(proxy_url).map_err(|e| Error::InvalidConfig {
                message: format!("Invalid proxy: {e}"),
            })?;
            http_builder = http_builder.proxy(proxy);
        }

        if !headers.is_empty() {
            http_builder = http_builder.default_headers(headers);
        }

        Ok(http_builder.build()?)
    }
}

impl ClientInner {
    /// 发送请求。
    ///
    /// # Errors
    /// 当请求构建或网络请求失败时返回错误。
    pub async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let request = request.build()?;
        tracing::debug!(method = %request.method(), url = %request.url(), "sending request");
        let response = self.http.execute(request).await?;
        tracing::debug!(status = response.status().as_u16(), "received response");
        Ok(response)
    }
}

fn normalize_base_url(base_url: &str) -> String {
    let mut value = base_url.trim().to_string();
    if !value.ends_with('/') {
        value.push('/');
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::with_env;

    #[test]
    fn test_client_from_api_key() {
        let client = Client::new("test-api-key").unwrap();
        assert_eq!(client.inner.config.api_key, "test-api-key");
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_client_builder() {
        let client = Client::builder()
            .api_key("test-key")
            .timeout(30)
            .organization("org-1")
            .build()
            .unwrap();
        assert_eq!(client.inner.config.http_options.timeout, Some(30));
        assert_eq!(client.inner.config.organization.as_deref(), Some("org-1"));
    }

    #[test]
    fn test_base_url_normalization() {
        let client = Client::builder()
            .api_key("test-key")
            .base_url("https://example.com/v1")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "https://example.com/v1/");
    }

    #[test]
    fn test_api_key_is_trimmed() {
        let client = Client::new("  sk-test \n").unwrap();
        assert_eq!(client.inner.config.api_key, "sk-test");
    }

    #[test]
    fn test_missing_api_key_errors() {
        assert!(Client::builder().build().is_err());
        assert!(matches!(
            Client::new("   ").err().unwrap(),
            Error::InvalidConfig { .. }
        ));
    }

    #[test]
    fn test_from_env_reads_overrides() {
        with_env(
            &[
                ("OPENAI_API_KEY", Some("env-key")),
                ("OPENAI_BASE_URL", Some("https://env.example.com/v1")),
                ("OPENAI_ORG_ID", Some("org-env")),
            ],
            || {
                let client = Client::from_env().unwrap();
                assert_eq!(client.base_url(), "https://env.example.com/v1/");
                assert_eq!(client.inner.config.api_key, "env-key");
                assert_eq!(client.inner.config.organization.as_deref(), Some("org-env"));
            },
        );
    }

    #[test]
    fn test_from_env_ignores_empty_overrides() {
        with_env(
            &[
                ("OPENAI_API_KEY", Some("env-key")),
                ("OPENAI_BASE_URL", Some("   ")),
                ("OPENAI_ORG_ID", Some("")),
            ],
            || {
                let client = Client::from_env().unwrap();
                assert_eq!(client.base_url(), DEFAULT_BASE_URL);
                assert!(client.inner.config.organization.is_none());
            },
        );
    }

    #[test]
    fn test_from_env_missing_key_errors() {
        with_env(
            &[("OPENAI_API_KEY", None), ("OPENAI_BASE_URL", None)],
            || {
                let result = Client::from_env();
                assert!(matches!(result, Err(Error::InvalidConfig { .. })));
            },
        );
    }

    #[test]
    fn test_valid_proxy_is_accepted() {
        let client = Client::builder()
            .api_key("test-key")
            .proxy("http://127.0.0.1:8888")
            .build();
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let result = Client::builder()
            .api_key("test-key")
            .proxy("not a url")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_header_name_is_rejected() {
        let result = Client::builder()
            .api_key("test-key")
            .header("bad header", "value")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_header_value_is_rejected() {
        let result = Client::builder()
            .api_key("test-key")
            .header("x-test", "bad\nvalue")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_masks_api_key() {
        let client = Client::new("sk-secret-value-1234").unwrap();
        let debug = format!("{:?}", client.config());
        assert!(!debug.contains("secret"));
        assert!(debug.contains("sk-…1234"));
    }

    #[test]
    fn test_invalid_api_key_value_is_rejected() {
        let err = Client::builder().api_key("bad\nkey").build().err().unwrap();
        assert!(
            matches!(err, Error::InvalidConfig { message } if message.contains("Invalid API key value"))
        );
    }
}
