//! Directed transaction graph.
//!
//! Accounts are interned to dense indices in first-appearance order, and every
//! per-node list keeps insertion order. Ring and shell detection walk these
//! lists directly, so their output is deterministic for a given ledger.

use std::collections::{HashMap, HashSet};

use crate::types::Transaction;

#[derive(Debug, Clone, Default)]
pub struct TransactionGraph {
    ids: Vec<String>,
    index: HashMap<String, usize>,
    /// Deduplicated successors, in first-seen order.
    adjacency: Vec<Vec<usize>>,
    in_degree: Vec<u32>,
    out_degree: Vec<u32>,
    volume: Vec<f64>,
    /// Transaction indices per node.
    incoming: Vec<Vec<usize>>,
    outgoing: Vec<Vec<usize>>,
    /// (sender, receiver) node per transaction.
    endpoints: Vec<(usize, usize)>,
    /// Nodes in order of their first incoming / first outgoing transaction.
    receiver_order: Vec<usize>,
    sender_order: Vec<usize>,
}

impl TransactionGraph {
    pub fn build(transactions: &[Transaction]) -> Self {
        let mut graph = Self::default();
        let mut edges: HashSet<(usize, usize)> = HashSet::new();

        for (tx_idx, tx) in transactions.iter().enumerate() {
            let s = graph.intern(&tx.sender_id);
            let r = graph.intern(&tx.receiver_id);
            graph.endpoints.push((s, r));

            if edges.insert((s, r)) {
                graph.adjacency[s].push(r);
            }

            if graph.outgoing[s].is_empty() {
                graph.sender_order.push(s);
            }
            if graph.incoming[r].is_empty() {
                graph.receiver_order.push(r);
            }
            graph.outgoing[s].push(tx_idx);
            graph.incoming[r].push(tx_idx);

            graph.out_degree[s] += 1;
            graph.in_degree[r] += 1;
            graph.volume[s] += tx.amount;
            graph.volume[r] += tx.amount;
        }

        graph
    }

    fn intern(&mut self, id: &str) -> usize {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.ids.len();
        self.ids.push(id.to_string());
        self.index.insert(id.to_string(), idx);
        self.adjacency.push(Vec::new());
        self.in_degree.push(0);
        self.out_degree.push(0);
        self.volume.push(0.0);
        self.incoming.push(Vec::new());
        self.outgoing.push(Vec::new());
        idx
    }

    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    pub fn id(&self, node: usize) -> &str {
        &self.ids[node]
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn successors(&self, node: usize) -> &[usize] {
        &self.adjacency[node]
    }

    pub fn in_degree(&self, node: usize) -> u32 {
        self.in_degree[node]
    }

    pub fn out_degree(&self, node: usize) -> u32 {
        self.out_degree[node]
    }

    pub fn total_degree(&self, node: usize) -> u32 {
        self.in_degree[node] + self.out_degree[node]
    }

    /// Sum of all amounts sent or received.
    pub fn volume(&self, node: usize) -> f64 {
        self.volume[node]
    }

    pub fn incoming(&self, node: usize) -> &[usize] {
        &self.incoming[node]
    }

    pub fn outgoing(&self, node: usize) -> &[usize] {
        &self.outgoing[node]
    }

    pub fn endpoints(&self, tx_idx: usize) -> (usize, usize) {
        self.endpoints[tx_idx]
    }

    pub fn receivers(&self) -> &[usize] {
        &self.receiver_order
    }

    pub fn senders(&self) -> &[usize] {
        &self.sender_order
    }
}
