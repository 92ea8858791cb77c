//! Smurfing: fan-in collection (mule) hubs and fan-out distributors.

use std::collections::HashSet;

use crate::config::Thresholds;
use crate::graph::TransactionGraph;
use crate::types::{FraudRing, PatternType, Transaction};

use super::{ring_id, Accumulator};

pub const FAN_IN_TAG: &str = "fan_in_smurfing";
pub const FAN_OUT_TAG: &str = "fan_out_smurfing";
pub const SOURCE_TAG: &str = "smurfing_source";
pub const DESTINATION_TAG: &str = "smurfing_destination";

/// A hub and the counterparties that make it one, in first-seen order.
#[derive(Debug, Clone, PartialEq)]
pub struct SmurfHub {
    pub hub: usize,
    pub counterparties: Vec<usize>,
}

/// Fan-in: within a 24h window of incoming transfers, enough distinct small
/// senders whose funds mostly leave again within 24h of the first one.
/// The first qualifying window is grown over later transfers for as long as
/// it keeps qualifying, and its senders become the counterparties.
/// `excluded` holds accounts already claimed by a cycle ring.
pub fn find_fan_in(
    transactions: &[Transaction],
    graph: &TransactionGraph,
    th: &Thresholds,
    excluded: &[bool],
) -> Vec<SmurfHub> {
    let window_ms = th.fan_window_secs * 1000;
    let mut hubs = Vec::new();

    for &account in graph.receivers() {
        if excluded[account] {
            continue;
        }

        let incoming = sorted_by_time(transactions, graph.incoming(account));
        let outgoing: Vec<&Transaction> = graph.outgoing(account).iter().map(|&i| &transactions[i]).collect();
        let mut start = 0;

        for end in 0..incoming.len() {
            let end_time = incoming[end].epoch_ms();
            while end_time - incoming[start].epoch_ms() > window_ms {
                start += 1;
            }

            let window = &incoming[start..=end];
            if unique_parties(graph, window.iter().map(|tx| tx.sender_id.as_str())).len() < th.fan_min_counterparties {
                continue;
            }
            if !consolidates(window, &outgoing, th) {
                continue;
            }
            // Payroll-like inflow disqualifies the account outright.
            if is_salary_recipient(&incoming, th) {
                break;
            }

            let first_in = incoming[start].epoch_ms();
            let mut last = end;
            while last + 1 < incoming.len()
                && incoming[last + 1].epoch_ms() - first_in <= window_ms
                && consolidates(&incoming[start..=last + 1], &outgoing, th)
            {
                last += 1;
            }

            let senders = unique_parties(graph, incoming[start..=last].iter().map(|tx| tx.sender_id.as_str()));
            hubs.push(SmurfHub { hub: account, counterparties: senders });
            break;
        }
    }

    hubs
}

/// Small median transfer, and at least `consolidation_ratio` of the window's
/// inflow sent onward within 24h of its first transfer.
fn consolidates(window: &[&Transaction], outgoing: &[&Transaction], th: &Thresholds) -> bool {
    let amounts: Vec<f64> = window.iter().map(|tx| tx.amount).collect();
    if median(&amounts) >= th.fan_in_median_ceiling {
        return false;
    }

    let window_total: f64 = amounts.iter().sum();
    let first_in = window[0].epoch_ms();
    let horizon = first_in..=first_in + th.fan_window_secs * 1000;
    let forwarded: f64 = outgoing
        .iter()
        .filter(|tx| horizon.contains(&tx.epoch_ms()))
        .map(|tx| tx.amount)
        .sum();

    forwarded >= window_total * th.consolidation_ratio
}

/// Fan-out: enough outgoing transfers to enough distinct receivers, all
/// inside one 24h span.
pub fn find_fan_out(
    transactions: &[Transaction],
    graph: &TransactionGraph,
    th: &Thresholds,
    excluded: &[bool],
) -> Vec<SmurfHub> {
    let window_ms = th.fan_window_secs * 1000;
    let mut hubs = Vec::new();

    for &account in graph.senders() {
        let outgoing = graph.outgoing(account);
        if excluded[account] || outgoing.len() < th.fan_out_min_transactions {
            continue;
        }

        let receivers = unique_parties(graph, outgoing.iter().map(|&i| transactions[i].receiver_id.as_str()));
        if receivers.len() < th.fan_min_counterparties {
            continue;
        }

        let times = outgoing.iter().map(|&i| transactions[i].epoch_ms());
        let (first, last) = times.fold((i64::MAX, i64::MIN), |(lo, hi), t| (lo.min(t), hi.max(t)));
        if last - first <= window_ms {
            hubs.push(SmurfHub { hub: account, counterparties: receivers });
        }
    }

    hubs
}

/// Run both sub-detections and record hubs, counterparties and rings.
/// Fan-in rings are numbered before fan-out rings.
pub fn detect(
    transactions: &[Transaction],
    graph: &TransactionGraph,
    th: &Thresholds,
    acc: &mut Accumulator,
    rings: &mut Vec<FraudRing>,
) -> (usize, usize) {
    let excluded: Vec<bool> = (0..graph.node_count()).map(|n| acc.has_ring(n)).collect();

    let fan_in = find_fan_in(transactions, graph, th, &excluded);
    let fan_out = find_fan_out(transactions, graph, th, &excluded);

    for hit in &fan_in {
        record(graph, th, acc, rings, hit, PatternType::SmurfingFanIn);
    }
    for hit in &fan_out {
        record(graph, th, acc, rings, hit, PatternType::SmurfingFanOut);
    }

    (fan_in.len(), fan_out.len())
}

fn record(
    graph: &TransactionGraph,
    th: &Thresholds,
    acc: &mut Accumulator,
    rings: &mut Vec<FraudRing>,
    hit: &SmurfHub,
    pattern_type: PatternType,
) {
    let (hub_tag, party_tag, risk) = match pattern_type {
        PatternType::SmurfingFanIn => (FAN_IN_TAG, SOURCE_TAG, th.fan_in_risk),
        _ => (FAN_OUT_TAG, DESTINATION_TAG, th.fan_out_risk),
    };
    let id = ring_id(rings.len() + 1);

    acc.flag(hit.hub, hub_tag, th.smurf_hub_score);
    acc.assign_ring(hit.hub, &id);
    // Counterparties are scored but keep whatever ring they had (usually none).
    for &party in &hit.counterparties {
        acc.flag(party, party_tag, th.smurf_counterparty_score);
    }

    let mut members = Vec::with_capacity(hit.counterparties.len() + 1);
    members.push(graph.id(hit.hub).to_string());
    members.extend(hit.counterparties.iter().map(|&n| graph.id(n).to_string()));

    rings.push(FraudRing {
        ring_id: id,
        member_accounts: members,
        pattern_type,
        risk_score: risk.min(th.max_score),
    });
}

/// Repeated near-identical transfers from one sender roughly a day apart.
///
/// Evaluated over all of the account's incoming transfers rather than the
/// current 24h window. Salary gaps are themselves about a day, so a single
/// window rarely holds three payments; at account level a payroll recipient
/// is never a fan-in hub.
fn is_salary_recipient(incoming: &[&Transaction], th: &Thresholds) -> bool {
    let min_gap = th.salary_min_gap_secs * 1000;
    let max_gap = th.salary_max_gap_secs * 1000;

    let mut senders: Vec<&str> = Vec::new();
    for tx in incoming {
        if !senders.contains(&tx.sender_id.as_str()) {
            senders.push(&tx.sender_id);
        }
    }

    senders.into_iter().any(|sender| {
        // `incoming` is already time-sorted.
        let txs: Vec<&&Transaction> = incoming.iter().filter(|tx| tx.sender_id == sender).collect();
        if txs.len() < th.salary_min_transactions {
            return false;
        }
        let matches = txs
            .windows(2)
            .filter(|pair| {
                let gap = pair[1].epoch_ms() - pair[0].epoch_ms();
                let prev = pair[0].amount;
                (min_gap..=max_gap).contains(&gap)
                    && prev > 0.0
                    && (pair[1].amount - prev).abs() / prev < th.salary_amount_tolerance
            })
            .count();
        matches as f64 >= (txs.len() - 1) as f64 * th.salary_match_fraction
    })
}

fn sorted_by_time<'a>(transactions: &'a [Transaction], indices: &[usize]) -> Vec<&'a Transaction> {
    let mut txs: Vec<&Transaction> = indices.iter().map(|&i| &transactions[i]).collect();
    txs.sort_by_key(|tx| tx.epoch_ms());
    txs
}

/// Distinct node indices in first-seen order.
fn unique_parties<'a>(graph: &TransactionGraph, ids: impl Iterator<Item = &'a str>) -> Vec<usize> {
    let mut seen = HashSet::new();
    ids.filter_map(|id| graph.index_of(id))
        .filter(|&n| seen.insert(n))
        .collect()
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}
