//! Fixed-capacity sliding window used for per-axis moving averages

use std::collections::VecDeque;

/// Sliding window of past targets for one axis
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    values: VecDeque<f64>,
    capacity: usize,
}

impl HistoryBuffer {
    /// Create a buffer holding `capacity` copies of `initial`
    pub fn new(capacity: usize, initial: f64) -> Self {
        let capacity = capacity.max(1);
        let mut buffer = Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        };
        buffer.refill(initial);
        buffer
    }

    /// Append a value, evicting the oldest one when full
    pub fn push(&mut self, value: f64) {
        if self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Replace the whole window with `capacity` copies of `value`
    pub fn refill(&mut self, value: f64) {
        self.values.clear();
        self.values.extend(std::iter::repeat(value).take(self.capacity));
    }

    /// Arithmetic mean of the window
    pub fn mean(&self) -> f64 {
        let Some(&first) = self.values.front() else {
            return 0.0;
        };
        // A uniform window averages to its value exactly, without summation error
        if self.values.iter().all(|v| *v == first) {
            return first;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.values.iter()
    }
}
