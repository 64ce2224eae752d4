// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rolling duration statistics for mapper round trips.

use std::time::Duration;

use serde::Serialize;

/// Min/max/average accumulator over duration samples.
///
/// Never evicts; lives as long as the component that owns it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceTracker {
    min_ms: f64,
    max_ms: f64,
    avg_ms: f64,
    samples: u64,
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self {
            min_ms: f64::INFINITY,
            max_ms: 0.0,
            avg_ms: 0.0,
            samples: 0,
        }
    }

    /// Record one sample. Stored at millisecond resolution with fractions.
    pub fn add_sample(&mut self, sample: Duration) {
        let ms = sample.as_secs_f64() * 1_000.0;
        self.min_ms = self.min_ms.min(ms);
        self.max_ms = self.max_ms.max(ms);
        self.avg_ms = (ms + self.samples as f64 * self.avg_ms) / (self.samples + 1) as f64;
        self.samples += 1;
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn snapshot(&self) -> PerfSnapshot {
        PerfSnapshot {
            min_ms: self.min_ms,
            max_ms: self.max_ms,
            avg_ms: self.avg_ms,
            samples: self.samples,
        }
    }
}

/// Point-in-time copy of a tracker, as reported to the framework.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfSnapshot {
    pub min_ms: f64,
    pub max_ms: f64,
    pub avg_ms: f64,
    pub samples: u64,
}
