//! Final report and the graph projection handed to visualisation consumers.

use std::collections::HashSet;
use std::time::Instant;

use crate::config::Thresholds;
use crate::detection::Detections;
use crate::explain::{explain, BehaviorTags};
use crate::graph::TransactionGraph;
use crate::types::{
    Analysis, AnalysisReport, EdgeType, GraphEdge, GraphNode, PatternType, Summary, SuspiciousAccount, Transaction,
    TIMESTAMP_FORMAT,
};

pub fn assemble(
    transactions: &[Transaction],
    graph: &TransactionGraph,
    detections: Detections,
    th: &Thresholds,
    started: Instant,
) -> Analysis {
    let Detections { accumulator: acc, rings, fan_in_hubs, fan_out_hubs } = detections;

    let mut behavior: Vec<Option<BehaviorTags>> = vec![None; graph.node_count()];
    let mut suspicious_accounts = Vec::new();

    for &node in acc.scored_order() {
        let raw = acc.score(node);
        if raw <= 0.0 {
            continue;
        }

        let incoming: Vec<&Transaction> = graph.incoming(node).iter().map(|&i| &transactions[i]).collect();
        let outgoing: Vec<&Transaction> = graph.outgoing(node).iter().map(|&i| &transactions[i]).collect();
        let explanation = explain(&incoming, &outgoing, acc.has_ring(node), th);
        behavior[node] = Some(explanation.tags);

        suspicious_accounts.push(SuspiciousAccount {
            account_id: graph.id(node).to_string(),
            suspicion_score: clamp_score(raw, th),
            detected_patterns: acc.patterns(node).to_vec(),
            ring_id: acc.ring(node).map(str::to_string),
            reasons: explanation.reasons,
            explanation: explanation.text,
        });
    }
    // Stable: equal scores keep the order they were first scored in.
    suspicious_accounts.sort_by(|a, b| b.suspicion_score.total_cmp(&a.suspicion_score));

    let mut ring_edges: HashSet<(usize, usize)> = HashSet::new();
    for ring in rings.iter().filter(|r| r.pattern_type == PatternType::Cycle) {
        let members: Vec<usize> = ring.member_accounts.iter().filter_map(|id| graph.index_of(id)).collect();
        for &a in &members {
            for &b in &members {
                if a != b {
                    ring_edges.insert((a, b));
                }
            }
        }
    }

    let nodes: Vec<GraphNode> = (0..graph.node_count())
        .map(|node| {
            let score = acc.score(node);
            GraphNode {
                id: graph.id(node).to_string(),
                in_degree: graph.in_degree(node),
                out_degree: graph.out_degree(node),
                total_amount: round_to(graph.volume(node), 2),
                is_suspicious: score > 0.0,
                ring_id: acc.ring(node).map(str::to_string),
                patterns: acc.patterns(node).to_vec(),
                score: clamp_score(score, th),
            }
        })
        .collect();

    let edges: Vec<GraphEdge> = transactions
        .iter()
        .enumerate()
        .map(|(i, tx)| {
            let (s, r) = graph.endpoints(i);
            let is_ring_edge = ring_edges.contains(&(s, r));
            GraphEdge {
                source: tx.sender_id.clone(),
                target: tx.receiver_id.clone(),
                amount: tx.amount,
                timestamp: tx.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                is_ring_edge,
                edge_type: classify_edge(is_ring_edge, behavior[s], behavior[r]),
            }
        })
        .collect();

    let summary = Summary {
        total_accounts_analyzed: graph.node_count(),
        suspicious_accounts_flagged: suspicious_accounts.len(),
        fraud_rings_detected: rings.len(),
        fan_in_accounts: fan_in_hubs,
        fan_out_accounts: fan_out_hubs,
        processing_time_seconds: round_to(started.elapsed().as_secs_f64(), 4),
    };

    Analysis {
        report: AnalysisReport { suspicious_accounts, fraud_rings: rings, summary },
        nodes,
        edges,
    }
}

/// Priority: ring transfer, sender pass-through, sender fan-out, receiver fan-in.
pub fn classify_edge(is_ring_edge: bool, sender: Option<BehaviorTags>, receiver: Option<BehaviorTags>) -> EdgeType {
    if is_ring_edge {
        return EdgeType::RingTransfer;
    }
    let sender = sender.unwrap_or_default();
    let receiver = receiver.unwrap_or_default();
    if sender.pass_through {
        EdgeType::PassThrough
    } else if sender.fan_out {
        EdgeType::FanOut
    } else if receiver.fan_in {
        EdgeType::FanIn
    } else {
        EdgeType::Normal
    }
}

/// Round to one decimal and bound to `[0, max_score]`. A negative or NaN
/// ceiling bounds to 0 instead of panicking.
fn clamp_score(raw: f64, th: &Thresholds) -> f64 {
    let ceiling = th.max_score.max(0.0);
    round_to(raw, 1).max(0.0).min(ceiling)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_edges_win_over_behavior() {
        let pass = BehaviorTags { pass_through: true, fan_out: true, ..Default::default() };
        let fan_in = BehaviorTags { fan_in: true, ..Default::default() };

        assert_eq!(classify_edge(true, Some(pass), Some(fan_in)), EdgeType::RingTransfer);
        assert_eq!(classify_edge(false, Some(pass), Some(fan_in)), EdgeType::PassThrough);
        assert_eq!(
            classify_edge(false, Some(BehaviorTags { fan_out: true, ..Default::default() }), Some(fan_in)),
            EdgeType::FanOut
        );
        assert_eq!(classify_edge(false, None, Some(fan_in)), EdgeType::FanIn);
        assert_eq!(classify_edge(false, None, None), EdgeType::Normal);
    }

    #[test]
    fn scores_clamp_and_round() {
        let th = Thresholds::default();
        assert_eq!(clamp_score(145.0, &th), 100.0);
        assert_eq!(clamp_score(-3.0, &th), 0.0);
        assert_eq!(clamp_score(42.26, &th), 42.3);
    }

    #[test]
    fn unusable_ceiling_does_not_panic() {
        let negative = Thresholds { max_score: -1.0, ..Thresholds::default() };
        assert_eq!(clamp_score(50.0, &negative), 0.0);

        let nan = Thresholds { max_score: f64::NAN, ..Thresholds::default() };
        assert_eq!(clamp_score(50.0, &nan), 0.0);
    }
}
