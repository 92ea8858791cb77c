//! Per-account score/tag/ring accumulator and the legitimate-hub filter.

use crate::config::Thresholds;
use crate::graph::TransactionGraph;

use super::shell::SHELL_TAG;

/// Ring-membership tag prefix; with the shell tag it exempts an account from hub suppression.
const SEVERE_TAG_PREFIX: &str = "scc_size_";

/// Scores, pattern tags and ring assignment for every node, indexed by the
/// graph's node index. Each detector stage takes `&mut Accumulator`.
#[derive(Debug, Clone)]
pub struct Accumulator {
    scores: Vec<f64>,
    patterns: Vec<Vec<String>>,
    rings: Vec<Option<String>>,
    /// Nodes in the order they first received a contribution.
    scored_order: Vec<usize>,
    touched: Vec<bool>,
}

impl Accumulator {
    pub fn new(node_count: usize) -> Self {
        Self {
            scores: vec![0.0; node_count],
            patterns: vec![Vec::new(); node_count],
            rings: vec![None; node_count],
            scored_order: Vec::new(),
            touched: vec![false; node_count],
        }
    }

    /// Add `points` and tag `pattern` (tags are kept once, in first-applied order).
    pub fn flag(&mut self, node: usize, pattern: &str, points: f64) {
        if !self.patterns[node].iter().any(|p| p == pattern) {
            self.patterns[node].push(pattern.to_string());
        }
        self.scores[node] += points;
        if !self.touched[node] {
            self.touched[node] = true;
            self.scored_order.push(node);
        }
    }

    /// Assign a ring unless the node already has one. Returns whether it was assigned.
    pub fn assign_ring(&mut self, node: usize, ring_id: &str) -> bool {
        if self.rings[node].is_some() {
            return false;
        }
        self.rings[node] = Some(ring_id.to_string());
        true
    }

    pub fn score(&self, node: usize) -> f64 {
        self.scores[node]
    }

    pub fn patterns(&self, node: usize) -> &[String] {
        &self.patterns[node]
    }

    pub fn ring(&self, node: usize) -> Option<&str> {
        self.rings[node].as_deref()
    }

    pub fn has_ring(&self, node: usize) -> bool {
        self.rings[node].is_some()
    }

    pub fn scored_order(&self) -> &[usize] {
        &self.scored_order
    }

    fn has_severe_pattern(&self, node: usize) -> bool {
        self.patterns[node]
            .iter()
            .any(|p| p.starts_with(SEVERE_TAG_PREFIX) || p == SHELL_TAG)
    }
}

/// Dampen probable merchants/exchanges: any node with total degree above the
/// hub threshold and no ring or shell tag loses `hub_penalty`, floored at 0.
/// Runs once over all nodes after every detector. Returns how many were dampened.
pub fn suppress_legitimate_hubs(graph: &TransactionGraph, acc: &mut Accumulator, th: &Thresholds) -> usize {
    let mut dampened = 0;
    for node in 0..graph.node_count() {
        if graph.total_degree(node) <= th.hub_min_degree || acc.has_severe_pattern(node) {
            continue;
        }
        if acc.scores[node] > 0.0 {
            acc.scores[node] = (acc.scores[node] - th.hub_penalty).max(0.0);
            dampened += 1;
        }
    }
    dampened
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_accumulates_and_keeps_first_tag_order() {
        let mut acc = Accumulator::new(3);
        acc.flag(2, "high_velocity", 25.0);
        acc.flag(0, "shell_network", 30.0);
        acc.flag(2, "smurfing_destination", 20.0);
        acc.flag(2, "high_velocity", 25.0);

        assert_eq!(acc.score(2), 70.0);
        assert_eq!(acc.patterns(2), &["high_velocity", "smurfing_destination"]);
        assert_eq!(acc.scored_order(), &[2, 0]);
        assert_eq!(acc.score(1), 0.0);
    }

    #[test]
    fn ring_assignment_never_overwrites() {
        let mut acc = Accumulator::new(1);
        assert!(acc.assign_ring(0, "RING_001"));
        assert!(!acc.assign_ring(0, "RING_002"));
        assert_eq!(acc.ring(0), Some("RING_001"));
    }
}
