use std::collections::VecDeque;
use std::time::Instant;

use serde::Serialize;

const WINDOW_SIZE: usize = 1000;

#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencyStats {
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub min_us: u64,
    pub max_us: u64,
    pub count: usize,
}

/// Rolling per-stage timings of the analysis pipeline: CSV parsing, the
/// detection engine, and JSON rendering of the result.
pub struct LatencyTracker {
    parse_latencies: VecDeque<u64>,
    analyze_latencies: VecDeque<u64>,
    render_latencies: VecDeque<u64>,
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self {
            parse_latencies: VecDeque::with_capacity(WINDOW_SIZE),
            analyze_latencies: VecDeque::with_capacity(WINDOW_SIZE),
            render_latencies: VecDeque::with_capacity(WINDOW_SIZE),
        }
    }

    pub fn reset(&mut self) {
        self.parse_latencies.clear();
        self.analyze_latencies.clear();
        self.render_latencies.clear();
    }

    pub fn start(&self) -> Instant {
        Instant::now()
    }

    pub fn record_parse(&mut self, start: Instant) {
        push_capped(&mut self.parse_latencies, elapsed_us(start));
    }

    pub fn record_analyze(&mut self, start: Instant) {
        push_capped(&mut self.analyze_latencies, elapsed_us(start));
    }

    pub fn record_render(&mut self, start: Instant) {
        push_capped(&mut self.render_latencies, elapsed_us(start));
    }

    pub fn parse_stats(&self) -> LatencyStats {
        compute_stats(&self.parse_latencies)
    }

    pub fn analyze_stats(&self) -> LatencyStats {
        compute_stats(&self.analyze_latencies)
    }

    pub fn render_stats(&self) -> LatencyStats {
        compute_stats(&self.render_latencies)
    }
}

fn elapsed_us(start: Instant) -> u64 {
    start.elapsed().as_micros() as u64
}

fn push_capped(q: &mut VecDeque<u64>, val: u64) {
    if q.len() >= WINDOW_SIZE {
        q.pop_front();
    }
    q.push_back(val);
}

fn compute_stats(q: &VecDeque<u64>) -> LatencyStats {
    if q.is_empty() {
        return LatencyStats::default();
    }
    let mut sorted: Vec<u64> = q.iter().copied().collect();
    sorted.sort_unstable();
    let n = sorted.len();
    LatencyStats {
        p50_us: sorted[n * 50 / 100],
        p95_us: sorted[n * 95 / 100],
        p99_us: sorted[(n * 99 / 100).min(n - 1)],
        min_us: sorted[0],
        max_us: sorted[n - 1],
        count: n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_over_known_samples() {
        let q: VecDeque<u64> = (1..=100).collect();
        let stats = compute_stats(&q);
        assert_eq!(stats.p50_us, 51);
        assert_eq!(stats.p95_us, 96);
        assert_eq!(stats.p99_us, 100);
        assert_eq!(stats.min_us, 1);
        assert_eq!(stats.max_us, 100);
        assert_eq!(stats.count, 100);
    }

    #[test]
    fn window_drops_oldest() {
        let mut q = VecDeque::new();
        for v in 0..(WINDOW_SIZE as u64 + 10) {
            push_capped(&mut q, v);
        }
        assert_eq!(q.len(), WINDOW_SIZE);
        assert_eq!(q.front(), Some(&10));
    }

    #[test]
    fn empty_tracker_reports_zeroes() {
        let tracker = LatencyTracker::new();
        assert_eq!(tracker.analyze_stats().count, 0);
        assert_eq!(tracker.parse_stats().p99_us, 0);
    }
}
