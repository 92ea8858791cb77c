use crate::config::Thresholds;
use crate::graph::TransactionGraph;
use crate::types::Transaction;

use super::Accumulator;

pub const VELOCITY_TAG: &str = "high_velocity";

/// Senders issuing more than `velocity_max_transactions` transfers inside any
/// one `velocity_window_secs` window starting at one of their transfers.
pub fn find_high_velocity(transactions: &[Transaction], graph: &TransactionGraph, th: &Thresholds) -> Vec<usize> {
    let window_ms = th.velocity_window_secs * 1000;

    graph
        .senders()
        .iter()
        .copied()
        .filter(|&sender| {
            let mut times: Vec<i64> = graph.outgoing(sender).iter().map(|&i| transactions[i].epoch_ms()).collect();
            times.sort_unstable();
            (0..times.len()).any(|i| {
                let in_window = times[i..].partition_point(|&t| t - times[i] <= window_ms);
                in_window > th.velocity_max_transactions
            })
        })
        .collect()
}

pub fn detect(transactions: &[Transaction], graph: &TransactionGraph, th: &Thresholds, acc: &mut Accumulator) -> usize {
    let hits = find_high_velocity(transactions, graph, th);
    for &node in &hits {
        acc.flag(node, VELOCITY_TAG, th.velocity_score);
    }
    hits.len()
}
