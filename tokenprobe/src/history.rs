//! In-memory display history.

use std::collections::VecDeque;

use crate::analysis::Analysis;

pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// 最近 N 次分析结果，最近的在前。仅用于展示，不持久化。
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Analysis>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl History {
    /// 容量为 0 时不保留任何记录。
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// 插入到最前；超出容量时淘汰最旧的一条。
    pub fn push(&mut self, analysis: Analysis) {
        if self.capacity == 0 {
            return;
        }
        self.entries.push_front(analysis);
        self.entries.truncate(self.capacity);
    }

    #[must_use]
    pub fn latest(&self) -> Option<&Analysis> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Analysis> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Scorer;

    fn analysis(prompt: &str) -> Analysis {
        Analysis::from_tokens(&Scorer::default(), prompt, "m", 1.0, "", &[])
    }

    #[test]
    fn test_most_recent_first() {
        let mut history = History::with_capacity(3);
        history.push(analysis("a"));
        history.push(analysis("b"));
        let prompts: Vec<&str> = history.iter().map(|a| a.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["b", "a"]);
        assert_eq!(history.latest().map(|a| a.prompt.as_str()), Some("b"));
    }

    #[test]
    fn test_oldest_is_evicted() {
        let mut history = History::with_capacity(2);
        for prompt in ["a", "b", "c"] {
            history.push(analysis(prompt));
        }
        let prompts: Vec<&str> = history.iter().map(|a| a.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["c", "b"]);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut history = History::with_capacity(0);
        history.push(analysis("a"));
        assert!(history.is_empty());
        assert!(history.latest().is_none());
    }

    #[test]
    fn test_clear() {
        let mut history = History::default();
        history.push(analysis("a"));
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), DEFAULT_HISTORY_CAPACITY);
    }
}
