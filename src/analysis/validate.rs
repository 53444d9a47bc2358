//! 结构合法性检查：二分性、连通性、标识合法性、简单性、源点/汇点，
//! 以及行为分析之前的验证关卡。
use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use serde::Serialize;
use thiserror::Error;

use crate::net::{Network, NodeId, Tokens};

/// Why a network was refused by [`verify`].
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum VerifyError {
    #[error("invalid marking")]
    InvalidMarking,
    #[error("network is not bipartite")]
    NotBipartite,
    #[error("network is not connected")]
    NotConnected,
}

/// Undirected adjacency over node positions (network iteration order).
fn undirected_adjacency(net: &Network) -> Vec<Vec<usize>> {
    let mut adjacency = vec![Vec::new(); net.len()];
    for (source, (_, node)) in net.nodes().enumerate() {
        for arc in &node.outputs {
            if let Some(target) = net.index_of(arc.target.as_str()) {
                adjacency[source].push(target);
                adjacency[target].push(source);
            }
        }
    }
    adjacency
}

/// Two-colours the undirected view, component by component in network
/// order. Any edge between equally coloured nodes fails the check.
pub fn is_bipartite(net: &Network) -> bool {
    let adjacency = undirected_adjacency(net);
    let mut color: Vec<Option<bool>> = vec![None; net.len()];

    for start in 0..net.len() {
        if color[start].is_some() {
            continue;
        }
        color[start] = Some(false);
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            let node_color = color[node];
            for &neighbour in &adjacency[node] {
                match color[neighbour] {
                    None => {
                        color[neighbour] = node_color.map(|c| !c);
                        queue.push_back(neighbour);
                    }
                    Some(c) if Some(c) == node_color => {
                        log::debug!(
                            "bipartite conflict: {:?} <-> {:?}",
                            net.id_at(node),
                            net.id_at(neighbour)
                        );
                        return false;
                    }
                    Some(_) => {}
                }
            }
        }
    }
    true
}

/// The designated initial place must exist and be a place, the designated
/// initial token value must be non-negative, and so must every node's count.
pub fn marking_valid(net: &Network, initial_place: &str, initial_tokens: Tokens) -> bool {
    if !net.is_place(initial_place) {
        log::debug!("initial place {initial_place} is missing or not a place");
        return false;
    }
    if initial_tokens < 0 {
        return false;
    }
    net.nodes().all(|(_, node)| node.tokens >= 0)
}

/// BFS over the undirected view from the first node. An empty network is
/// connected.
pub fn is_connected(net: &Network) -> bool {
    if net.is_empty() {
        return true;
    }
    let adjacency = undirected_adjacency(net);
    let mut visited = vec![false; net.len()];
    let mut queue = VecDeque::from([0usize]);
    visited[0] = true;
    let mut reached = 1;

    while let Some(node) = queue.pop_front() {
        for &neighbour in &adjacency[node] {
            if !visited[neighbour] {
                visited[neighbour] = true;
                reached += 1;
                queue.push_back(neighbour);
            }
        }
    }
    reached == net.len()
}

/// No node has two arcs to the same destination.
pub fn is_simple(net: &Network) -> bool {
    net.nodes().all(|(_, node)| {
        let mut seen = FxHashSet::default();
        node.outputs.iter().all(|arc| seen.insert(&arc.target))
    })
}

/// Nodes without incoming arcs, in network order.
pub fn sources(net: &Network) -> Vec<NodeId> {
    let targets: FxHashSet<&NodeId> = net
        .nodes()
        .flat_map(|(_, node)| node.outputs.iter().map(|arc| &arc.target))
        .collect();
    net.node_ids()
        .filter(|id| !targets.contains(id))
        .cloned()
        .collect()
}

/// Nodes without outgoing arcs, in network order.
pub fn sinks(net: &Network) -> Vec<NodeId> {
    net.nodes()
        .filter(|(_, node)| node.is_sink())
        .map(|(id, _)| id.clone())
        .collect()
}

/// 行为分析前的验证关卡：依次检查标识合法性、二分性与连通性。
pub fn verify(net: &Network, initial_place: &str, initial_tokens: Tokens) -> Result<(), VerifyError> {
    if !marking_valid(net, initial_place, initial_tokens) {
        log::debug!("verify: invalid marking");
        return Err(VerifyError::InvalidMarking);
    }
    if !is_bipartite(net) {
        log::debug!("verify: not bipartite");
        return Err(VerifyError::NotBipartite);
    }
    if !is_connected(net) {
        log::debug!("verify: not connected");
        return Err(VerifyError::NotConnected);
    }
    Ok(())
}

/// Every structural fact about a network in one place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructureReport {
    pub places: usize,
    pub transitions: usize,
    pub arcs: usize,
    pub bipartite: bool,
    pub connected: bool,
    pub simple: bool,
    pub sources: Vec<NodeId>,
    pub sinks: Vec<NodeId>,
}

impl StructureReport {
    pub fn of(net: &Network) -> Self {
        Self {
            places: net.places().count(),
            transitions: net.transitions().count(),
            arcs: net.arc_count(),
            bipartite: is_bipartite(net),
            connected: is_connected(net),
            simple: is_simple(net),
            sources: sources(net),
            sinks: sinks(net),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::core::tests::canonical_net;

    fn ids(names: &[&str]) -> Vec<NodeId> {
        names.iter().copied().map(NodeId::from).collect()
    }

    #[test]
    fn canonical_structure() {
        let net = canonical_net();
        assert!(is_bipartite(&net));
        assert!(is_connected(&net));
        assert!(is_simple(&net));
        assert_eq!(sources(&net), ids(&["E1"]));
        assert_eq!(sinks(&net), ids(&["E3", "E5"]));
        assert_eq!(verify(&net, "E1", 5), Ok(()));
    }

    #[test]
    fn same_kind_arc_breaks_bipartiteness() {
        let mut net = canonical_net();
        net.add_arc("E3", "E5", 1).unwrap();
        assert!(!is_bipartite(&net));
        assert_eq!(verify(&net, "E1", 5), Err(VerifyError::NotBipartite));
    }

    #[test]
    fn bipartiteness_uses_undirected_view() {
        // two places feeding one transition is fine; q -> p closes an odd
        // cycle once arcs are read without direction
        let mut net = Network::new();
        net.add_place("p", 0).unwrap();
        net.add_place("q", 0).unwrap();
        net.add_transition("t").unwrap();
        net.add_arc("p", "t", 1).unwrap();
        net.add_arc("q", "t", 1).unwrap();
        assert!(is_bipartite(&net));

        net.add_arc("q", "p", 1).unwrap();
        assert!(!is_bipartite(&net));
    }

    #[test]
    fn disconnected_component_is_detected() {
        let mut net = canonical_net();
        net.add_place("lonely", 0).unwrap();
        assert!(!is_connected(&net));
        assert!(is_bipartite(&net));
        assert_eq!(verify(&net, "E1", 5), Err(VerifyError::NotConnected));
        assert!(is_connected(&Network::new()));
    }

    #[test]
    fn marking_validity() {
        let mut net = canonical_net();
        assert!(marking_valid(&net, "E1", 5));
        assert!(!marking_valid(&net, "E9", 5));
        assert!(!marking_valid(&net, "T1", 5));
        assert!(!marking_valid(&net, "E1", -1));

        net.set_tokens("E3", -2).unwrap();
        assert!(!marking_valid(&net, "E1", 5));
        assert_eq!(verify(&net, "E1", 5), Err(VerifyError::InvalidMarking));
    }

    #[test]
    fn parallel_arcs_are_not_simple() {
        let mut net = canonical_net();
        net.add_arc("E1", "T1", 1).unwrap();
        assert!(!is_simple(&net));
        // still structurally fine otherwise
        assert!(is_bipartite(&net));
    }

    #[test]
    fn report_collects_everything() {
        let report = StructureReport::of(&canonical_net());
        assert_eq!(report.places, 5);
        assert_eq!(report.transitions, 2);
        assert_eq!(report.arcs, 7);
        assert!(report.bipartite && report.connected && report.simple);
        assert_eq!(report.sinks, ids(&["E3", "E5"]));
    }
}
