//! Chat Completions API surface.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokenprobe_types::chat::{
    ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, FinishReason,
    Usage,
};
use tokenprobe_types::logprobs::TokenLogprob;

use crate::client::ClientInner;
use crate::error::{Error, Result};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "Complete the following sentence with factual information.";
pub const DEFAULT_MAX_TOKENS: u32 = 30;
pub const DEFAULT_TEMPERATURE: f64 = 1.0;
const MAX_TOP_LOGPROBS: u8 = 20;
const MAX_TEMPERATURE: f64 = 2.0;

/// Chat Completions API 句柄。
#[derive(Clone)]
pub struct Completions {
    pub(crate) inner: Arc<ClientInner>,
}

/// 带 logprobs 的补全请求参数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub model: String,
    /// `None` 表示不发送系统消息。
    pub system_prompt: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_logprobs: Option<u8>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            top_logprobs: None,
        }
    }
}

impl CompletionOptions {
    /// 构建请求体。
    ///
    /// # Errors
    /// 当 prompt 为空或参数越界时返回错误。
    pub fn to_request(&self, prompt: &str) -> Result<ChatCompletionRequest> {
        if prompt.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "Prompt must not be empty".into(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "Model must not be empty".into(),
            });
        }
        if !(0.0..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(Error::InvalidConfig {
                message: format!(
                    "Temperature {} out of range [0, {MAX_TEMPERATURE}]",
                    self.temperature
                ),
            });
        }
        if self.max_tokens == 0 {
            return Err(Error::InvalidConfig {
                message: "max_tokens must be positive".into(),
            });
        }
        if let Some(top) = self.top_logprobs {
            if top > MAX_TOP_LOGPROBS {
                return Err(Error::InvalidConfig {
                    message: format!("top_logprobs {top} exceeds {MAX_TOP_LOGPROBS}"),
                });
            }
        }

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = self.system_prompt.as_deref().filter(|s| !s.trim().is_empty()) {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(prompt));

        let mut request = ChatCompletionRequest::new(self.model.clone(), messages);
        request.temperature = Some(self.temperature);
        request.max_tokens = Some(self.max_tokens);
        request.logprobs = Some(true);
        request.top_logprobs = self.top_logprobs;
        Ok(request)
    }
}

/// 补全文本与逐 token 的对数概率。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResult {
    pub completion: String,
    pub model: String,
    pub tokens: Vec<TokenLogprob>,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<Usage>,
}

impl CompletionResult {
    /// 取第一个候选；没有 logprobs 时 token 列表为空。
    ///
    /// # Errors
    /// 当响应不含任何候选时返回错误。
    pub fn from_response(response: ChatCompletionResponse) -> Result<Self> {
        let ChatCompletionResponse {
            model,
            choices,
            usage,
            ..
        } = response;
        let choice = choices.into_iter().next().ok_or_else(|| Error::Parse {
            message: "Completion response contains no choices".into(),
        })?;
        let tokens = choice
            .logprobs
            .and_then(|logprobs| logprobs.content)
            .unwrap_or_default();
        Ok(Self {
            completion: choice.message.content.unwrap_or_default(),
            model,
            tokens,
            finish_reason: choice.finish_reason,
            usage,
        })
    }
}

impl Completions {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// 发送原始 chat completion 请求。
    ///
    /// # Errors
    /// 网络错误、非 2xx 响应或响应无法解析时返回错误。
    pub async fn create(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let url = format!("{}chat/completions", self.inner.base_url);
        let request = self.inner.http.post(url).json(request);
        let response = self.inner.send(request).await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), body));
        }
        serde_json::from_str(&body).map_err(|err| Error::Parse {
            message: format!("Invalid completion response: {err}"),
        })
    }

    /// 以 `logprobs: true` 请求补全并提取 token 列表。
    ///
    /// # Errors
    /// 参数无效、请求失败或响应不含候选时返回错误。
    pub async fn create_with_logprobs(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<CompletionResult> {
        let request = options.to_request(prompt)?;
        tracing::debug!(
            model = %request.model,
            temperature = options.temperature,
            max_tokens = options.max_tokens,
            "requesting completion with logprobs"
        );
        let response = self.create(&request).await?;
        let result = CompletionResult::from_response(response)?;
        tracing::debug!(tokens = result.tokens.len(), "completion received");
        Ok(result)
    }
}

fn api_error(status: u16, body: String) -> Error {
    let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body,
    };
    Error::ApiError { status, message }
}
