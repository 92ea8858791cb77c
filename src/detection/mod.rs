//! Batch detection pipeline over one transaction graph.
//!
//! Stage order is fixed: cycle rings, smurfing, shell chains, velocity, then
//! legitimate-hub suppression. Detectors only read the graph and ledger; all
//! writes go through the shared [`Accumulator`].

pub mod rings;
pub mod scoring;
pub mod shell;
pub mod smurfing;
pub mod velocity;

pub use scoring::Accumulator;

use crate::config::Thresholds;
use crate::graph::TransactionGraph;
use crate::types::{FraudRing, Transaction};

/// Combined output of every detector and the scorer.
#[derive(Debug, Clone)]
pub struct Detections {
    pub accumulator: Accumulator,
    pub rings: Vec<FraudRing>,
    pub fan_in_hubs: usize,
    pub fan_out_hubs: usize,
}

pub fn ring_id(n: usize) -> String {
    format!("RING_{n:03}")
}

pub fn run(transactions: &[Transaction], graph: &TransactionGraph, th: &Thresholds) -> Detections {
    let mut acc = Accumulator::new(graph.node_count());
    let mut rings = Vec::new();

    let cycles = rings::detect(graph, th, &mut acc, &mut rings);
    tracing::debug!(cycles, "ring detection done");

    let (fan_in_hubs, fan_out_hubs) = smurfing::detect(transactions, graph, th, &mut acc, &mut rings);
    tracing::debug!(fan_in_hubs, fan_out_hubs, "smurfing detection done");

    let shells = shell::detect(graph, th, &mut acc);
    tracing::debug!(shells, "shell chain detection done");

    let fast = velocity::detect(transactions, graph, th, &mut acc);
    tracing::debug!(high_velocity = fast, "velocity detection done");

    let dampened = scoring::suppress_legitimate_hubs(graph, &mut acc, th);
    tracing::debug!(dampened, "legitimate-hub suppression done");

    Detections {
        accumulator: acc,
        rings,
        fan_in_hubs,
        fan_out_hubs,
    }
}
