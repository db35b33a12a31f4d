use serde::{Deserialize, Deserializer, Serialize};

/// 单个 token 的候选替代项。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopLogprob {
    pub token: String,
    pub logprob: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<Vec<u8>>,
}

/// 生成序列中一个 token 及其对数概率（自然对数）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenLogprob {
    pub token: String,
    pub logprob: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<Vec<u8>>,
    #[serde(default, deserialize_with = "deserialize_null_as_empty")]
    pub top_logprobs: Vec<TopLogprob>,
}

impl TokenLogprob {
    /// 仅由 token 文本和对数概率构建。
    pub fn new(token: impl Into<String>, logprob: f64) -> Self {
        Self {
            token: token.into(),
            logprob,
            bytes: None,
            top_logprobs: Vec::new(),
        }
    }
}

// 部分兼容服务会显式返回 `null`。
fn deserialize_null_as_empty<'de, D>(deserializer: D) -> Result<Vec<TopLogprob>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<TopLogprob>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Logprobs attached to a choice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChoiceLogprobs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<TokenLogprob>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refusal: Option<Vec<TokenLogprob>>,
}

impl ChoiceLogprobs {
    /// 内容 token 列表；缺失时为空切片。
    #[must_use]
    pub fn tokens(&self) -> &[TokenLogprob] {
        self.content.as_deref().unwrap_or(&[])
    }
}
