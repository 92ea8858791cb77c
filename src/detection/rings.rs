//! Cycle rings: strongly connected components of three or more accounts.

use crate::config::Thresholds;
use crate::graph::TransactionGraph;
use crate::types::{FraudRing, PatternType};

use super::{ring_id, Accumulator};

/// Tarjan's SCC algorithm with an explicit frame stack.
///
/// Roots are tried in node order and successors in adjacency order, exactly
/// as the recursive formulation would, so component order matches it.
pub fn strongly_connected_components(graph: &TransactionGraph) -> Vec<Vec<usize>> {
    let n = graph.node_count();
    let mut index: Vec<Option<usize>> = vec![None; n];
    let mut low = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut sccs = Vec::new();
    let mut counter = 0usize;

    for root in 0..n {
        if index[root].is_some() {
            continue;
        }

        // Frame: (node, next successor position)
        let mut frames: Vec<(usize, usize)> = vec![(root, 0)];
        index[root] = Some(counter);
        low[root] = counter;
        counter += 1;
        stack.push(root);
        on_stack[root] = true;

        while let Some(frame) = frames.last_mut() {
            let v = frame.0;
            let succ = graph.successors(v);

            if frame.1 < succ.len() {
                let w = succ[frame.1];
                frame.1 += 1;
                match index[w] {
                    None => {
                        index[w] = Some(counter);
                        low[w] = counter;
                        counter += 1;
                        stack.push(w);
                        on_stack[w] = true;
                        frames.push((w, 0));
                    }
                    Some(iw) if on_stack[w] => low[v] = low[v].min(iw),
                    Some(_) => {}
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                low[parent] = low[parent].min(low[v]);
            }

            if Some(low[v]) == index[v] {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                sccs.push(component);
            }
        }
    }

    sccs
}

/// Turn every qualifying component into a `cycle` ring, tag and score its members.
pub fn detect(graph: &TransactionGraph, th: &Thresholds, acc: &mut Accumulator, rings: &mut Vec<FraudRing>) -> usize {
    let before = rings.len();

    for component in strongly_connected_components(graph) {
        let size = component.len();
        if size < th.ring_min_members {
            continue;
        }

        let id = ring_id(rings.len() + 1);
        let mut members: Vec<String> = component.iter().map(|&n| graph.id(n).to_string()).collect();
        members.sort();

        let tag = format!("scc_size_{size}");
        for &node in &component {
            acc.assign_ring(node, &id);
            acc.flag(node, &tag, th.ring_member_score);
        }

        rings.push(FraudRing {
            ring_id: id,
            member_accounts: members,
            pattern_type: PatternType::Cycle,
            risk_score: (th.ring_base_risk + th.ring_risk_per_member * size as f64).min(th.max_score),
        });
    }

    rings.len() - before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Transaction;
    use chrono::NaiveDate;

    fn graph(edges: &[(&str, &str)]) -> TransactionGraph {
        let ts = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let txs: Vec<Transaction> = edges
            .iter()
            .enumerate()
            .map(|(i, (s, r))| Transaction {
                transaction_id: format!("T{i}"),
                sender_id: s.to_string(),
                receiver_id: r.to_string(),
                amount: 100.0,
                timestamp: ts,
            })
            .collect();
        TransactionGraph::build(&txs)
    }

    fn named(g: &TransactionGraph, sccs: &[Vec<usize>]) -> Vec<Vec<String>> {
        sccs.iter()
            .map(|c| {
                let mut names: Vec<String> = c.iter().map(|&n| g.id(n).to_string()).collect();
                names.sort();
                names
            })
            .collect()
    }

    #[test]
    fn finds_components_in_completion_order() {
        // Two cycles joined by a one-way bridge, plus a tail.
        let g = graph(&[("A", "B"), ("B", "C"), ("C", "A"), ("C", "D"), ("D", "E"), ("E", "F"), ("F", "D"), ("F", "G")]);
        let sccs = strongly_connected_components(&g);

        assert_eq!(
            named(&g, &sccs),
            vec![vec!["G"], vec!["D", "E", "F"], vec!["A", "B", "C"]]
        );
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let names: Vec<String> = (0..50_000).map(|i| format!("N{i}")).collect();
        let mut edges: Vec<(&str, &str)> = names.windows(2).map(|w| (w[0].as_str(), w[1].as_str())).collect();
        edges.push((names[names.len() - 1].as_str(), names[0].as_str()));
        let g = graph(&edges);

        let sccs = strongly_connected_components(&g);
        assert_eq!(sccs.len(), 1);
        assert_eq!(sccs[0].len(), 50_000);
    }
}
