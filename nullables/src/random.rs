//! Nullable random: deterministic reference number draws.

use std::collections::VecDeque;

use regsync_types::RefDraw;

/// A scripted draw source for testing.
///
/// Returns pre-configured values in order, cycling once exhausted, or
/// counts upward from a start value.
pub struct NullRandom {
    script: VecDeque<u64>,
    counter: Option<u64>,
    draws: usize,
}

impl NullRandom {
    /// Create with a sequence of draws returned in order.
    pub fn new(values: Vec<u64>) -> Self {
        Self {
            script: values.into(),
            counter: None,
            draws: 0,
        }
    }

    /// Create a source that yields `start`, `start + 1`, ...
    pub fn counting(start: u64) -> Self {
        Self {
            script: VecDeque::new(),
            counter: Some(start),
            draws: 0,
        }
    }

    /// Number of draws made so far.
    pub fn draws(&self) -> usize {
        self.draws
    }
}

impl RefDraw for NullRandom {
    fn draw(&mut self, low: u64, _high: u64) -> u64 {
        self.draws += 1;
        if let Some(next) = self.counter.as_mut() {
            let value = *next;
            *next += 1;
            return value;
        }
        match self.script.pop_front() {
            Some(value) => {
                self.script.push_back(value);
                value
            }
            None => low,
        }
    }
}
