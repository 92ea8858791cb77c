//! Forensic analysis of transaction ledgers: money-muling rings, smurfing,
//! shell chains and high-velocity accounts, with per-account explanations.
//!
//! [`analyze_csv`] is the usual entry point. [`analyze_transactions`] runs the
//! engine over an already-parsed ledger.

pub mod config;
pub mod detection;
pub mod error;
pub mod explain;
pub mod generator;
pub mod graph;
pub mod ingest;
pub mod latency;
pub mod report;
pub mod selfcheck;
pub mod stress;
pub mod types;
pub mod web;

use std::time::Instant;

use tracing::{debug, info};

use crate::config::Thresholds;
use crate::error::{AnalysisError, Result};
use crate::graph::TransactionGraph;
use crate::types::{Analysis, ColumnMapping, Transaction};

/// Run graph construction, every detector, scoring and report assembly.
/// Deterministic apart from `processing_time_seconds`.
pub fn analyze_transactions(transactions: &[Transaction], th: &Thresholds) -> Analysis {
    let started = Instant::now();

    let graph = TransactionGraph::build(transactions);
    let detections = detection::run(transactions, &graph, th);
    let analysis = report::assemble(transactions, &graph, detections, th, started);

    let summary = &analysis.report.summary;
    info!(
        transactions = transactions.len(),
        accounts = summary.total_accounts_analyzed,
        rings = summary.fraud_rings_detected,
        flagged = summary.suspicious_accounts_flagged,
        elapsed_s = summary.processing_time_seconds,
        "analysis complete"
    );
    analysis
}

/// Parse a CSV ledger and analyse it. Without a mapping the columns are
/// auto-mapped; failure to do so yields [`AnalysisError::NeedsMapping`].
pub fn analyze_csv(text: &str, mapping: Option<&ColumnMapping>, th: &Thresholds) -> Result<Analysis> {
    let auto;
    let mapping = match mapping {
        Some(m) => m,
        None => {
            let headers = ingest::read_headers(text)?;
            auto = ingest::auto_map(&headers).ok_or(AnalysisError::NeedsMapping { headers })?;
            debug!(?auto, "columns auto-mapped");
            &auto
        }
    };

    let outcome = ingest::parse_transactions(text, mapping)?;
    if outcome.dropped.total() > 0 {
        debug!(
            bad_amount = outcome.dropped.bad_amount,
            missing_party = outcome.dropped.missing_party,
            self_transfer = outcome.dropped.self_transfer,
            bad_timestamp = outcome.dropped.bad_timestamp,
            "rows dropped during parsing"
        );
    }
    if outcome.transactions.is_empty() {
        return Err(AnalysisError::NoValidTransactions);
    }

    Ok(analyze_transactions(&outcome.transactions, th))
}
