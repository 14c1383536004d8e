use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// One scalar audio-level reading. `level` is in [0, 1], `timestamp` in
/// milliseconds on whatever monotonic clock the source uses.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub level: f64,
    pub timestamp: u64,
}

impl Sample {
    /// Build a sample, clamping the level into [0, 1]. Non-finite levels read as silence.
    pub fn new(level: f64, timestamp: u64) -> Self {
        let level = if level.is_finite() {
            level.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self { level, timestamp }
    }
}

/// Time-bounded, insertion-ordered sample window.
///
/// Eviction is by timestamp: after every push the span between the oldest and
/// newest retained sample is at most `window_ms`. A hard capacity bounds
/// memory when the source samples faster than expected.
#[derive(Clone, Debug)]
pub struct SampleHistory {
    samples: VecDeque<Sample>,
    window_ms: u64,
    capacity: usize,
}

impl SampleHistory {
    pub fn new(window_ms: u64, capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(1024)),
            window_ms,
            capacity: capacity.max(1),
        }
    }

    /// Append a sample. Returns false (and keeps nothing) when the sample is
    /// older than the newest retained one.
    pub fn push(&mut self, sample: Sample) -> bool {
        if let Some(last) = self.samples.back()
            && sample.timestamp < last.timestamp
        {
            return false;
        }

        self.samples.push_back(sample);

        let cutoff = sample.timestamp.saturating_sub(self.window_ms);
        while let Some(front) = self.samples.front() {
            if front.timestamp < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
        true
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Milliseconds between the oldest and newest retained sample.
    pub fn span_ms(&self) -> u64 {
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0,
        }
    }

    pub fn latest(&self) -> Option<Sample> {
        self.samples.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn levels(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.level).collect()
    }

    pub fn timestamps(&self) -> Vec<u64> {
        self.samples.iter().map(|s| s.timestamp).collect()
    }
}
