//! Terminal rendering of analyses.

use std::fmt::Write as _;

use colored::{ColoredString, Colorize};

use crate::analysis::Analysis;
use crate::history::History;
use crate::scoring::{ConfidenceClass, TokenScore};

pub const DEFAULT_BAR_WIDTH: usize = 20;
pub const TOKEN_BAR_WIDTH: usize = 15;
const TOKEN_DISPLAY_CHARS: usize = 12;
const PROMPT_DISPLAY_CHARS: usize = 48;
const RULE_WIDTH: usize = 70;
const TABLE_RULE_WIDTH: usize = 55;

/// 由 `floor(p * width)` 个实心块和空心块组成的进度条。
#[must_use]
pub fn confidence_bar(probability: f64, width: usize) -> String {
    let filled = if probability.is_nan() {
        0
    } else {
        // `as usize` saturates negatives to zero.
        ((probability * width as f64).floor() as usize).min(width)
    };
    let mut bar = "█".repeat(filled);
    bar.push_str(&"░".repeat(width - filled));
    bar
}

/// 四字符宽的分档标签。
#[must_use]
pub const fn confidence_label(class: ConfidenceClass) -> &'static str {
    match class {
        ConfidenceClass::High => "HIGH",
        ConfidenceClass::Medium => "MED ",
        ConfidenceClass::Low => "LOW ",
        ConfidenceClass::VeryLow => "VLOW",
    }
}

/// 百分比，保留一位小数。
#[must_use]
pub fn format_percent(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}

/// 转义控制字符后按字符数截断。
#[must_use]
pub fn display_token(token: &str) -> String {
    truncate(&token.escape_debug().to_string(), TOKEN_DISPLAY_CHARS)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push('…');
    truncated
}

/// 终端渲染器。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renderer {
    pub color: bool,
    pub bar_width: usize,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            color: true,
            bar_width: DEFAULT_BAR_WIDTH,
        }
    }
}

impl Renderer {
    #[must_use]
    pub fn plain() -> Self {
        Self {
            color: false,
            ..Self::default()
        }
    }

    fn paint(&self, text: &str, class: ConfidenceClass) -> String {
        if !self.color {
            return text.to_string();
        }
        let colored: ColoredString = match class {
            ConfidenceClass::High => text.bright_green(),
            ConfidenceClass::Medium => text.bright_yellow(),
            ConfidenceClass::Low => text.bright_red(),
            ConfidenceClass::VeryLow => text.red(),
        };
        colored.to_string()
    }

    fn bold(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    /// 渲染完整报告。
    #[must_use]
    pub fn render(&self, analysis: &Analysis) -> String {
        let mut out = String::new();
        let rule = "=".repeat(RULE_WIDTH);

        let _ = writeln!(out, "\n{rule}");
        let _ = writeln!(out, "{} {}", self.bold("Prompt:"), analysis.prompt);
        let _ = writeln!(
            out,
            "{} {} | {} {}",
            self.bold("Model:"),
            analysis.model,
            self.bold("Temperature:"),
            analysis.temperature
        );
        let _ = writeln!(out, "{rule}");

        let _ = writeln!(out, "\n{}", self.bold("Overall Confidence (Seq-Logprob):"));
        match &analysis.sequence {
            Some(sequence) => {
                let bar = confidence_bar(sequence.average_probability, self.bar_width);
                let _ = writeln!(
                    out,
                    "  {} {} avg | logprob: {:.4} | perplexity: {:.2} | {}",
                    self.paint(&bar, sequence.confidence),
                    format_percent(sequence.average_probability),
                    sequence.average_log_probability,
                    sequence.perplexity,
                    self.paint(confidence_label(sequence.confidence), sequence.confidence),
                );
            }
            None => {
                let _ = writeln!(out, "  {}", self.dim("no score available (empty completion)"));
            }
        }

        let _ = writeln!(out, "\n{}", self.bold("Token Analysis:"));
        let _ = writeln!(out, "  {:<15} {:>8} {:>10}  Bar", "Token", "Prob", "Logprob");
        let _ = writeln!(out, "  {}", "-".repeat(TABLE_RULE_WIDTH));
        for (idx, token) in analysis.tokens.iter().enumerate() {
            out.push_str(&self.render_token_row(token));
            if let Some(alternatives) = analysis.alternatives.get(idx) {
                if !alternatives.is_empty() {
                    out.push_str(&self.render_alternatives(alternatives));
                }
            }
        }

        let _ = writeln!(out, "\n{}", self.bold("Complete Response:"));
        let _ = writeln!(out, "  {}", self.dim(&analysis.completion));
        out
    }

    fn render_token_row(&self, token: &TokenScore) -> String {
        let percent = format!("{:>7}", format_percent(token.probability));
        let bar = confidence_bar(token.probability, TOKEN_BAR_WIDTH);
        format!(
            "  {:<15} {} {:>10.4}  {}\n",
            display_token(&token.token),
            self.paint(&percent, token.confidence),
            token.log_probability,
            self.paint(&bar, token.confidence),
        )
    }

    fn render_alternatives(&self, alternatives: &[TokenScore]) -> String {
        let items: Vec<String> = alternatives
            .iter()
            .map(|alt| {
                let text = format!(
                    "{} {}",
                    display_token(&alt.token),
                    format_percent(alt.probability)
                );
                self.paint(&text, alt.confidence)
            })
            .collect();
        format!("      ↳ {}\n", items.join(" | "))
    }

    /// 每条历史记录一行，最近的在前。
    #[must_use]
    pub fn render_history(&self, history: &History) -> String {
        if history.is_empty() {
            return format!("{}\n", self.dim("history is empty"));
        }
        let mut out = String::new();
        for (idx, analysis) in history.iter().enumerate() {
            let prompt = truncate(
                &analysis.prompt.escape_debug().to_string(),
                PROMPT_DISPLAY_CHARS,
            );
            match &analysis.sequence {
                Some(sequence) => {
                    let _ = writeln!(
                        out,
                        "{:>3}. {} {:>7} ppl {:>6.2}  {}",
                        idx + 1,
                        self.paint(confidence_label(sequence.confidence), sequence.confidence),
                        format_percent(sequence.average_probability),
                        sequence.perplexity,
                        prompt
                    );
                }
                None => {
                    let _ = writeln!(
                        out,
                        "{:>3}. {}  {}",
                        idx + 1,
                        self.dim("----  no score"),
                        prompt
                    );
                }
            }
        }
        out
    }
}
