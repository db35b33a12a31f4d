//! Token and sequence confidence scoring.
//!
//! Converts per-token log-probabilities into linear probabilities, an
//! aggregate Seq-Logprob score and a perplexity, and buckets each probability
//! into a [`ConfidenceClass`] through a configurable [`ConfidencePolicy`].
//! Everything here is pure and allocation-light; no I/O.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokenprobe_types::logprobs::TokenLogprob;

use crate::error::{Error, Result};

/// `exp(700)` is close to the largest finite f64 exponent.
const MAX_PERPLEXITY_EXPONENT: f64 = 700.0;

/// 对数概率的底数。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogBase {
    /// `e^logprob`，与 API 返回的自然对数一致。
    #[default]
    Natural,
    /// `2^logprob`，旧版展示使用的变换。
    Two,
}

impl LogBase {
    /// 将对数概率还原为线性概率。有限输入的结果不会下溢为 0。
    #[must_use]
    pub fn probability(self, logprob: f64) -> f64 {
        let probability = match self {
            Self::Natural => logprob.exp(),
            Self::Two => logprob.exp2(),
        };
        if logprob.is_finite() {
            probability.max(f64::MIN_POSITIVE)
        } else {
            probability
        }
    }
}

impl FromStr for LogBase {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "natural" | "e" | "ln" => Ok(Self::Natural),
            "two" | "2" | "log2" => Ok(Self::Two),
            other => Err(Error::InvalidConfig {
                message: format!("Unknown log base: {other} (expected natural or two)"),
            }),
        }
    }
}

impl fmt::Display for LogBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Natural => f.write_str("natural"),
            Self::Two => f.write_str("two"),
        }
    }
}

/// 置信度分档，从高到低。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceClass {
    High,
    Medium,
    Low,
    VeryLow,
}

impl ConfidenceClass {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::VeryLow => "very_low",
        }
    }
}

impl FromStr for ConfidenceClass {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" | "med" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            "very_low" | "very-low" | "vlow" => Ok(Self::VeryLow),
            other => Err(Error::InvalidConfig {
                message: format!("Unknown confidence class: {other}"),
            }),
        }
    }
}

/// Ordered `(threshold, class)` ladder with a floor class.
///
/// A probability belongs to the first tier whose threshold it reaches; the
/// lower bound of every tier is inclusive. Anything below the last threshold,
/// and NaN, falls through to the floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidencePolicy {
    tiers: Vec<(f64, ConfidenceClass)>,
    floor: ConfidenceClass,
}

impl ConfidencePolicy {
    /// 创建自定义分档策略。
    ///
    /// # Errors
    /// 当分档为空、阈值不在 (0, 1] 内或阈值未严格递减时返回错误。
    pub fn new(tiers: Vec<(f64, ConfidenceClass)>, floor: ConfidenceClass) -> Result<Self> {
        if tiers.is_empty() {
            return Err(Error::InvalidConfig {
                message: "Confidence policy needs at least one tier".into(),
            });
        }
        let mut previous = f64::INFINITY;
        for (threshold, class) in &tiers {
            if !threshold.is_finite() || *threshold <= 0.0 || *threshold > 1.0 {
                return Err(Error::InvalidConfig {
                    message: format!("Threshold for {} must be in (0, 1]", class.as_str()),
                });
            }
            if *threshold >= previous {
                return Err(Error::InvalidConfig {
                    message: "Confidence thresholds must be strictly descending".into(),
                });
            }
            previous = *threshold;
        }
        Ok(Self { tiers, floor })
    }

    /// High ≥ 0.80, Medium ≥ 0.50, Low ≥ 0.20, otherwise VeryLow.
    #[must_use]
    pub fn four_tier() -> Self {
        Self {
            tiers: vec![
                (0.80, ConfidenceClass::High),
                (0.50, ConfidenceClass::Medium),
                (0.20, ConfidenceClass::Low),
            ],
            floor: ConfidenceClass::VeryLow,
        }
    }

    /// High ≥ 0.80, Medium ≥ 0.50, otherwise Low.
    #[must_use]
    pub fn three_tier() -> Self {
        Self {
            tiers: vec![(0.80, ConfidenceClass::High), (0.50, ConfidenceClass::Medium)],
            floor: ConfidenceClass::Low,
        }
    }

    #[must_use]
    pub fn tiers(&self) -> &[(f64, ConfidenceClass)] {
        &self.tiers
    }

    #[must_use]
    pub const fn floor(&self) -> ConfidenceClass {
        self.floor
    }

    /// 为概率分档。
    #[must_use]
    pub fn classify(&self, probability: f64) -> ConfidenceClass {
        self.tiers
            .iter()
            .find(|(threshold, _)| probability >= *threshold)
            .map_or(self.floor, |(_, class)| *class)
    }
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self::four_tier()
    }
}

/// Accepts `four-tier`, `three-tier`, or a custom ladder such as
/// `0.9=high,0.6=medium,low` where the trailing bare class is the floor.
impl FromStr for ConfidencePolicy {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "four-tier" | "four_tier" | "4" => return Ok(Self::four_tier()),
            "three-tier" | "three_tier" | "3" => return Ok(Self::three_tier()),
            _ => {}
        }

        let mut tiers = Vec::new();
        let mut floor = None;
        for item in value.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            if floor.is_some() {
                return Err(Error::InvalidConfig {
                    message: "Floor class must be the last policy entry".into(),
                });
            }
            match item.split_once('=') {
                Some((threshold, class)) => {
                    let threshold = threshold.trim().parse::<f64>().map_err(|_| {
                        Error::InvalidConfig {
                            message: format!("Invalid threshold: {threshold}"),
                        }
                    })?;
                    tiers.push((threshold, class.parse()?));
                }
                None => floor = Some(item.parse()?),
            }
        }
        let floor = floor.ok_or_else(|| Error::InvalidConfig {
            message: "Confidence policy is missing a floor class".into(),
        })?;
        Self::new(tiers, floor)
    }
}

/// 单个对数概率的评分结果。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityScore {
    pub probability: f64,
    pub confidence: ConfidenceClass,
}

/// 单个 token 的评分。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenScore {
    pub token: String,
    pub probability: f64,
    pub log_probability: f64,
    pub confidence: ConfidenceClass,
}

/// Seq-Logprob aggregate over a non-empty token sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequenceScore {
    pub average_log_probability: f64,
    pub average_probability: f64,
    pub perplexity: f64,
    pub token_count: usize,
    pub sum_log_probability: f64,
    pub confidence: ConfidenceClass,
}

/// 评分器：底数 + 分档策略。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scorer {
    base: LogBase,
    policy: ConfidencePolicy,
}

impl Scorer {
    #[must_use]
    pub const fn new(base: LogBase, policy: ConfidencePolicy) -> Self {
        Self { base, policy }
    }

    #[must_use]
    pub const fn base(&self) -> LogBase {
        self.base
    }

    #[must_use]
    pub const fn policy(&self) -> &ConfidencePolicy {
        &self.policy
    }

    /// 对单个对数概率评分。对任意 f64 输入都有定义，非有限值原样传播并归入最低档。
    #[must_use]
    pub fn score_token(&self, logprob: f64) -> ProbabilityScore {
        let probability = self.base.probability(logprob);
        ProbabilityScore {
            probability,
            confidence: self.policy.classify(probability),
        }
    }

    /// 对带文本的 token 评分。
    #[must_use]
    pub fn score(&self, token: &TokenLogprob) -> TokenScore {
        let ProbabilityScore {
            probability,
            confidence,
        } = self.score_token(token.logprob);
        TokenScore {
            token: token.token.clone(),
            probability,
            log_probability: token.logprob,
            confidence,
        }
    }

    /// 对 token 的候选替代项逐一评分，顺序与 API 返回一致。
    #[must_use]
    pub fn score_alternatives(&self, token: &TokenLogprob) -> Vec<TokenScore> {
        token
            .top_logprobs
            .iter()
            .map(|alt| {
                let ProbabilityScore {
                    probability,
                    confidence,
                } = self.score_token(alt.logprob);
                TokenScore {
                    token: alt.token.clone(),
                    probability,
                    log_probability: alt.logprob,
                    confidence,
                }
            })
            .collect()
    }

    /// 逐个评分，顺序与输入一致。
    #[must_use]
    pub fn score_tokens(&self, tokens: &[TokenLogprob]) -> Vec<TokenScore> {
        tokens.iter().map(|token| self.score(token)).collect()
    }

    /// 计算序列级评分；空序列返回 `None`。
    #[must_use]
    pub fn score_sequence(&self, logprobs: &[f64]) -> Option<SequenceScore> {
        if logprobs.is_empty() {
            return None;
        }
        let token_count = logprobs.len();
        let sum_log_probability: f64 = logprobs.iter().sum();
        let average_log_probability = sum_log_probability / token_count as f64;
        let ProbabilityScore {
            probability: average_probability,
            confidence,
        } = self.score_token(average_log_probability);

        Some(SequenceScore {
            average_log_probability,
            average_probability,
            perplexity: perplexity(average_log_probability),
            token_count,
            sum_log_probability,
            confidence,
        })
    }

    /// 对 token 列表计算序列级评分；空列表返回 `None`。
    #[must_use]
    pub fn score_token_sequence(&self, tokens: &[TokenLogprob]) -> Option<SequenceScore> {
        let logprobs: Vec<f64> = tokens.iter().map(|token| token.logprob).collect();
        self.score_sequence(&logprobs)
    }
}

/// `exp(-average)`, always natural regardless of the display base.
fn perplexity(average_log_probability: f64) -> f64 {
    (-average_log_probability)
        .clamp(-MAX_PERPLEXITY_EXPONENT, MAX_PERPLEXITY_EXPONENT)
        .exp()
}
