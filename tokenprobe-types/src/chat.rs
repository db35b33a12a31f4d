use serde::{Deserialize, Serialize};

use crate::logprobs::ChoiceLogprobs;

/// 消息角色。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// 对话消息。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refusal: Option<String>,
}

impl ChatMessage {
    /// 创建系统消息。
    pub fn system(text: impl Into<String>) -> Self {
        Self::from_text(text, Role::System)
    }

    /// 创建用户消息。
    pub fn user(text: impl Into<String>) -> Self {
        Self::from_text(text, Role::User)
    }

    fn from_text(text: impl Into<String>, role: Role) -> Self {
        Self {
            role,
            content: Some(text.into()),
            refusal: None,
        }
    }
}

/// Chat completion 请求体。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<bool>,
    /// Number of alternatives to return per position, 0..=20. Requires `logprobs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_logprobs: Option<u8>,
}

impl ChatCompletionRequest {
    /// 以模型和消息创建请求，其余参数留空。
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
            logprobs: None,
            top_logprobs: None,
        }
    }
}

/// 结束原因。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    FunctionCall,
    #[serde(other)]
    Unknown,
}

/// 响应候选。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ChatMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<ChoiceLogprobs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// Token 用量。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Chat completion 响应。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatCompletionResponse {
    /// 提取第一个候选的文本。
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

/// Error envelope returned with non-2xx responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorDetails {
    pub message: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_omits_unset_fields() {
        let request = ChatCompletionRequest::new("gpt-4o-mini", vec![ChatMessage::user("hi")]);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "hi"}]
            })
        );
    }

    #[test]
    fn request_serializes_logprob_options() {
        let mut request = ChatCompletionRequest::new(
            "gpt-4o-mini",
            vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
        );
        request.logprobs = Some(true);
        request.top_logprobs = Some(3);
        request.max_tokens = Some(30);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["logprobs"], json!(true));
        assert_eq!(value["top_logprobs"], json!(3));
        assert_eq!(value["max_tokens"], json!(30));
        assert_eq!(value["messages"][0]["role"], json!("system"));
    }

    #[test]
    fn response_parses_logprobs_and_usage() {
        let value = json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "model": "gpt-4o-mini-2024-07-18",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "The cat"},
                "logprobs": {
                    "content": [
                        {"token": "The", "logprob": -0.01, "bytes": [84, 104, 101], "top_logprobs": []},
                        {"token": " cat", "logprob": -0.22, "bytes": null, "top_logprobs": []}
                    ],
                    "refusal": null
                },
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 20, "completion_tokens": 2, "total_tokens": 22}
        });
        let response: ChatCompletionResponse = serde_json::from_value(value).unwrap();
        assert_eq!(response.text(), Some("The cat"));
        let choice = &response.choices[0];
        assert_eq!(choice.finish_reason, Some(FinishReason::Stop));
        let tokens = choice.logprobs.as_ref().unwrap().tokens();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].logprob, -0.22);
        assert_eq!(response.usage.unwrap().total_tokens, 22);
    }

    #[test]
    fn unknown_finish_reason_is_tolerated() {
        let choice: Choice = serde_json::from_value(json!({
            "message": {"role": "assistant", "content": null},
            "finish_reason": "something_new"
        }))
        .unwrap();
        assert_eq!(choice.finish_reason, Some(FinishReason::Unknown));
        assert!(choice.logprobs.is_none());
    }

    #[test]
    fn api_error_envelope_parses() {
        let value = json!({
            "error": {
                "message": "Incorrect API key provided",
                "type": "invalid_request_error",
                "param": null,
                "code": "invalid_api_key"
            }
        });
        let err: ApiErrorResponse = serde_json::from_value(value).unwrap();
        assert_eq!(err.error.message, "Incorrect API key provided");
        assert_eq!(err.error.kind.as_deref(), Some("invalid_request_error"));
        assert_eq!(err.error.code.as_deref(), Some("invalid_api_key"));
    }
}
