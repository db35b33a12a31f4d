//! Fetch-then-score pipeline.

use serde::{Deserialize, Serialize};
use tokenprobe_types::logprobs::TokenLogprob;

use crate::client::Client;
use crate::completions::{CompletionOptions, CompletionResult};
use crate::error::Result;
use crate::scoring::{Scorer, SequenceScore, TokenScore};

/// 一次分析的完整结果。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub prompt: String,
    pub model: String,
    pub temperature: f64,
    pub completion: String,
    pub tokens: Vec<TokenScore>,
    /// 与 `tokens` 一一对应的候选替代项；未请求 `top_logprobs` 时均为空。
    #[serde(default, skip_serializing_if = "has_no_alternatives")]
    pub alternatives: Vec<Vec<TokenScore>>,
    /// 空补全时为 `None`。
    pub sequence: Option<SequenceScore>,
}

impl Analysis {
    /// 不经网络，直接由 token 列表构建。
    #[must_use]
    pub fn from_tokens(
        scorer: &Scorer,
        prompt: impl Into<String>,
        model: impl Into<String>,
        temperature: f64,
        completion: impl Into<String>,
        tokens: &[TokenLogprob],
    ) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            temperature,
            completion: completion.into(),
            tokens: scorer.score_tokens(tokens),
            alternatives: tokens
                .iter()
                .map(|token| scorer.score_alternatives(token))
                .collect(),
            sequence: scorer.score_token_sequence(tokens),
        }
    }

    fn from_completion(
        scorer: &Scorer,
        prompt: &str,
        options: &CompletionOptions,
        result: &CompletionResult,
    ) -> Self {
        // Echo the requested model when the response omits it.
        let model = if result.model.is_empty() {
            options.model.as_str()
        } else {
            result.model.as_str()
        };
        Self::from_tokens(
            scorer,
            prompt,
            model,
            options.temperature,
            result.completion.as_str(),
            &result.tokens,
        )
    }
}

fn has_no_alternatives(alternatives: &[Vec<TokenScore>]) -> bool {
    alternatives.iter().all(Vec::is_empty)
}

/// 分析器：客户端 + 评分器 + 请求参数。
#[derive(Clone)]
pub struct Analyzer {
    client: Client,
    scorer: Scorer,
    options: CompletionOptions,
}

impl Analyzer {
    #[must_use]
    pub fn new(client: Client, scorer: Scorer, options: CompletionOptions) -> Self {
        Self {
            client,
            scorer,
            options,
        }
    }

    #[must_use]
    pub const fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    #[must_use]
    pub const fn options(&self) -> &CompletionOptions {
        &self.options
    }

    /// 请求补全并评分。
    ///
    /// # Errors
    /// 补全请求失败时原样返回错误，不重试。
    pub async fn analyze(&self, prompt: &str) -> Result<Analysis> {
        let result = self
            .client
            .completions()
            .create_with_logprobs(prompt, &self.options)
            .await?;
        let analysis = Analysis::from_completion(&self.scorer, prompt, &self.options, &result);
        tracing::info!(
            model = %analysis.model,
            tokens = analysis.tokens.len(),
            perplexity = analysis.sequence.map(|seq| seq.perplexity),
            "analysis complete"
        );
        Ok(analysis)
    }
}
