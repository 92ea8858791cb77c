//! Shell chains: runs of low-activity intermediaries between two endpoints.

use crate::config::Thresholds;
use crate::graph::TransactionGraph;

use super::Accumulator;

pub const SHELL_TAG: &str = "shell_network";

/// Accounts sitting strictly inside some chain of at least
/// `shell_min_path_nodes` nodes whose interior nodes are all potential shells
/// (total degree 1..=`shell_max_degree`). Paths never repeat a node, are at
/// most `shell_max_hops` edges long, and only extend through potential shells.
pub fn find_shell_accounts(graph: &TransactionGraph, th: &Thresholds) -> Vec<bool> {
    let n = graph.node_count();
    let potential: Vec<bool> = (0..n)
        .map(|node| (1..=th.shell_max_degree).contains(&graph.total_degree(node)))
        .collect();
    let mut shell = vec![false; n];

    for start in 0..n {
        let mut stack: Vec<Vec<usize>> = vec![vec![start]];

        while let Some(path) = stack.pop() {
            if path.len() > th.shell_max_hops {
                continue;
            }
            let Some(&node) = path.last() else { continue };

            for &next in graph.successors(node) {
                if path.contains(&next) {
                    continue;
                }

                let interior = &path[1..];
                if path.len() + 1 >= th.shell_min_path_nodes && interior.iter().all(|&i| potential[i]) {
                    for &i in interior {
                        shell[i] = true;
                    }
                }

                if potential[next] {
                    let mut extended = path.clone();
                    extended.push(next);
                    stack.push(extended);
                }
            }
        }
    }

    shell
}

pub fn detect(graph: &TransactionGraph, th: &Thresholds, acc: &mut Accumulator) -> usize {
    let shell = find_shell_accounts(graph, th);
    let mut found = 0;
    for node in (0..graph.node_count()).filter(|&n| shell[n]) {
        acc.flag(node, SHELL_TAG, th.shell_score);
        found += 1;
    }
    found
}
