//! Behavioural tags and plain-language rationale for flagged accounts.
//!
//! These tags are derived independently of the detector tags: they drive
//! prose and edge classification, never the score.

use std::collections::HashSet;

use crate::config::Thresholds;
use crate::types::Transaction;

const RING_SENTENCE: &str = "This account is a confirmed member of a fraud ring (SCC).";
const HUB_SENTENCE: &str = "This account acts as a high-velocity hub, aggregating and dispersing funds simultaneously.";
const MULE_SENTENCE: &str =
    "This account behaves like a mule/collection account, aggregating funds from multiple sources.";
const DISTRIBUTOR_SENTENCE: &str = "This account functions as a distributor, dispersing funds to multiple targets.";
const LAYERING_SENTENCE: &str =
    "The transaction velocity and concentration indicate layering activity with rapid fund pass-through.";
const DORMANCY_SENTENCE: &str = "It shows sudden activation after a long dormant period.";
const GENERIC_SENTENCE: &str = "This account shows suspicious activity patterns warranting further investigation.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BehaviorTags {
    pub fan_in: bool,
    pub fan_out: bool,
    pub pass_through: bool,
    pub dormant_activation: bool,
    pub ring_member: bool,
}

impl BehaviorTags {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub tags: BehaviorTags,
    pub reasons: Vec<String>,
    pub text: String,
}

/// Derive tags, reasons and the explanation paragraph for one account from
/// its incoming and outgoing transfers.
pub fn explain(incoming: &[&Transaction], outgoing: &[&Transaction], ring_member: bool, th: &Thresholds) -> Explanation {
    let mut tags = BehaviorTags::default();
    let mut reasons = Vec::new();

    let mut incoming = incoming.to_vec();
    incoming.sort_by_key(|tx| tx.epoch_ms());
    let mut outgoing = outgoing.to_vec();
    outgoing.sort_by_key(|tx| tx.epoch_ms());

    let window_ms = th.fan_window_secs * 1000;

    let senders = max_unique_in_window(&incoming, window_ms, |tx| tx.sender_id.as_str());
    if senders >= th.fan_min_counterparties {
        tags.fan_in = true;
        reasons.push(format!("Fan-In aggregation from {senders} unique accounts"));
    }

    let receivers = max_unique_in_window(&outgoing, window_ms, |tx| tx.receiver_id.as_str());
    if receivers >= th.fan_min_counterparties {
        tags.fan_out = true;
        reasons.push(format!("Fan-Out dispersion to {receivers} unique accounts"));
    }

    if let Some(ratio) = rapid_exit_ratio(&incoming, &outgoing, th.pass_through_window_secs * 1000) {
        if ratio >= th.pass_through_ratio {
            tags.pass_through = true;
            reasons.push(format!("{}% funds transferred within rapid window", (ratio * 100.0).round()));
        }
    }

    let mut timeline: Vec<i64> = incoming.iter().chain(&outgoing).map(|tx| tx.epoch_ms()).collect();
    timeline.sort_unstable();
    let max_gap = timeline.windows(2).map(|w| w[1] - w[0]).max().unwrap_or(0);
    if max_gap > th.dormancy_gap_secs * 1000 {
        tags.dormant_activation = true;
        reasons.push(format!(
            "Sudden activation after dormant period (>{})",
            describe_span(th.dormancy_gap_secs)
        ));
    }

    if ring_member {
        tags.ring_member = true;
        reasons.push("Connected to fraud ring".to_string());
    }

    Explanation {
        tags,
        reasons,
        text: compose(&tags),
    }
}

/// Sentences in fixed precedence: ring, hub/mule/distributor, layering, dormancy.
pub fn compose(tags: &BehaviorTags) -> String {
    let mut parts = Vec::new();
    if tags.ring_member {
        parts.push(RING_SENTENCE);
    }
    match (tags.fan_in, tags.fan_out) {
        (true, true) => parts.push(HUB_SENTENCE),
        (true, false) => parts.push(MULE_SENTENCE),
        (false, true) => parts.push(DISTRIBUTOR_SENTENCE),
        (false, false) => {}
    }
    if tags.pass_through {
        parts.push(LAYERING_SENTENCE);
    }
    if tags.dormant_activation {
        parts.push(DORMANCY_SENTENCE);
    }
    if parts.is_empty() {
        parts.push(GENERIC_SENTENCE);
    }
    parts.join(" ")
}

/// `7 days`, `36 hours`, `90 minutes`: the largest whole unit.
fn describe_span(secs: i64) -> String {
    let (n, unit) = if secs % 86_400 == 0 {
        (secs / 86_400, "day")
    } else if secs % 3_600 == 0 {
        (secs / 3_600, "hour")
    } else if secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// Largest number of distinct counterparties seen in any window ending at a
/// transfer. `txs` must be time-sorted.
fn max_unique_in_window<'a>(txs: &[&'a Transaction], window_ms: i64, party: impl Fn(&'a Transaction) -> &'a str) -> usize {
    let mut best = 0;
    let mut start = 0;
    for end in 0..txs.len() {
        let end_time = txs[end].epoch_ms();
        while end_time - txs[start].epoch_ms() > window_ms {
            start += 1;
        }
        let unique: HashSet<&str> = txs[start..=end].iter().map(|&tx| party(tx)).collect();
        best = best.max(unique.len());
    }
    best
}

/// Share of incoming volume leaving between the first incoming transfer and
/// `grace_ms` after the last one. `None` without both directions or volume.
fn rapid_exit_ratio(incoming: &[&Transaction], outgoing: &[&Transaction], grace_ms: i64) -> Option<f64> {
    let first_in = incoming.first()?.epoch_ms();
    let last_in = incoming.last()?.epoch_ms();
    if outgoing.is_empty() {
        return None;
    }

    let total_in: f64 = incoming.iter().map(|tx| tx.amount).sum();
    if total_in <= 0.0 {
        return None;
    }
    let rapid_out: f64 = outgoing
        .iter()
        .filter(|tx| (first_in..=last_in + grace_ms).contains(&tx.epoch_ms()))
        .map(|tx| tx.amount)
        .sum();
    Some(rapid_out / total_in)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn tx(s: &str, r: &str, amount: f64, minutes: i64) -> Transaction {
        let base = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        Transaction {
            transaction_id: format!("{s}-{r}-{minutes}"),
            sender_id: s.into(),
            receiver_id: r.into(),
            amount,
            timestamp: base + Duration::minutes(minutes),
        }
    }

    #[test]
    fn mule_with_rapid_exit() {
        let th = Thresholds::default();
        let incoming: Vec<Transaction> = (0..6).map(|i| tx(&format!("S{i}"), "M", 100.0, i * 10)).collect();
        let outgoing = vec![tx("M", "X", 540.0, 90)];
        let inc: Vec<&Transaction> = incoming.iter().collect();
        let out: Vec<&Transaction> = outgoing.iter().collect();

        let e = explain(&inc, &out, false, &th);

        assert!(e.tags.fan_in && e.tags.pass_through);
        assert!(!e.tags.fan_out && !e.tags.dormant_activation && !e.tags.ring_member);
        assert_eq!(
            e.reasons,
            vec!["Fan-In aggregation from 6 unique accounts", "90% funds transferred within rapid window"]
        );
        assert_eq!(e.text, format!("{MULE_SENTENCE} {LAYERING_SENTENCE}"));
    }

    #[test]
    fn dormancy_and_ring_sentences_keep_precedence() {
        let th = Thresholds::default();
        let incoming = vec![tx("A", "R", 10.0, 0)];
        let outgoing = vec![tx("R", "B", 1.0, 8 * 24 * 60)];
        let inc: Vec<&Transaction> = incoming.iter().collect();
        let out: Vec<&Transaction> = outgoing.iter().collect();

        let e = explain(&inc, &out, true, &th);

        assert!(e.tags.dormant_activation && e.tags.ring_member);
        assert!(!e.tags.pass_through);
        assert_eq!(e.text, format!("{RING_SENTENCE} {DORMANCY_SENTENCE}"));
        assert_eq!(e.reasons.last().map(String::as_str), Some("Connected to fraud ring"));
    }

    #[test]
    fn dormancy_reason_follows_configured_gap() {
        let incoming = vec![tx("A", "R", 10.0, 0)];
        let outgoing = vec![tx("R", "B", 1.0, 3 * 24 * 60)];
        let inc: Vec<&Transaction> = incoming.iter().collect();
        let out: Vec<&Transaction> = outgoing.iter().collect();

        let default = explain(&inc, &out, false, &Thresholds::default());
        assert!(!default.tags.dormant_activation);

        let th = Thresholds { dormancy_gap_secs: 2 * 86_400, ..Thresholds::default() };
        let e = explain(&inc, &out, false, &th);
        assert_eq!(e.reasons, vec!["Sudden activation after dormant period (>2 days)"]);

        let th = Thresholds { dormancy_gap_secs: 36 * 3_600, ..Thresholds::default() };
        let e = explain(&inc, &out, false, &th);
        assert_eq!(e.reasons, vec!["Sudden activation after dormant period (>36 hours)"]);
    }

    #[test]
    fn spans_use_largest_whole_unit() {
        assert_eq!(describe_span(7 * 86_400), "7 days");
        assert_eq!(describe_span(86_400), "1 day");
        assert_eq!(describe_span(90 * 60), "90 minutes");
        assert_eq!(describe_span(45), "45 seconds");
    }

    #[test]
    fn no_tags_gives_generic_sentence() {
        let e = explain(&[], &[], false, &Thresholds::default());
        assert!(e.tags.is_empty());
        assert!(e.reasons.is_empty());
        assert_eq!(e.text, GENERIC_SENTENCE);
    }

    #[test]
    fn hub_when_both_directions_fan() {
        let tags = BehaviorTags { fan_in: true, fan_out: true, ..Default::default() };
        assert_eq!(compose(&tags), HUB_SENTENCE);
    }
}
