//! 静态弧结构上的图分析：可达切片、节点间可达性与强连通分量。
//!
//! 这里只看弧，不看 token；所有遍历都用显式栈或队列，不依赖递归深度。
use std::collections::VecDeque;

use crate::net::{Network, NodeId};

/// Places reachable from `start` over directed arcs, in DFS visit order.
///
/// `start` itself is included when it is a place. An absent start gives an
/// empty slice.
pub fn reachable_places(net: &Network, start: &str) -> Vec<NodeId> {
    let Some(root) = net.index_of(start) else {
        log::warn!("reachable_places: {start} is not in the network");
        return Vec::new();
    };

    let mut visited = vec![false; net.len()];
    let mut stack = vec![root];
    let mut places = Vec::new();

    while let Some(index) = stack.pop() {
        if visited[index] {
            continue;
        }
        visited[index] = true;
        let Some(id) = net.id_at(index) else {
            continue;
        };
        if net.is_place(id.as_str()) {
            places.push(id.clone());
        }
        // reversed so the first arc is popped first
        let mut next: Vec<usize> = net
            .successors(id.as_str())
            .filter_map(|target| net.index_of(target.as_str()))
            .filter(|&target| !visited[target])
            .collect();
        next.reverse();
        stack.extend(next);
    }
    places
}

/// Whether a directed path leads from `from` to `to`. Every present node
/// reaches itself.
pub fn node_reachable(net: &Network, from: &str, to: &str) -> bool {
    let (Some(source), Some(target)) = (net.index_of(from), net.index_of(to)) else {
        return false;
    };
    if source == target {
        return true;
    }

    let mut visited = vec![false; net.len()];
    visited[source] = true;
    let mut queue = VecDeque::from([source]);
    while let Some(index) = queue.pop_front() {
        let Some(id) = net.id_at(index) else {
            continue;
        };
        for successor in net.successors(id.as_str()) {
            let Some(next) = net.index_of(successor.as_str()) else {
                continue;
            };
            if next == target {
                return true;
            }
            if !visited[next] {
                visited[next] = true;
                queue.push_back(next);
            }
        }
    }
    false
}

const UNVISITED: usize = usize::MAX;

/// One frame of the Tarjan work stack: a node and how many of its
/// successors have been looked at.
struct Frame {
    node: usize,
    next_edge: usize,
}

/// Tarjan 强连通分量（迭代实现）。
///
/// Each node gets a discovery index and a low-link; a node whose low-link
/// equals its own index roots a component, which is popped off the Tarjan
/// stack. Components are returned in the order they close, i.e. sinks of
/// the condensation first; members are in stack-pop order.
pub fn strongly_connected_components(net: &Network) -> Vec<Vec<NodeId>> {
    let n = net.len();
    let adjacency: Vec<Vec<usize>> = (0..n)
        .map(|index| {
            net.id_at(index)
                .map(|id| {
                    net.successors(id.as_str())
                        .filter_map(|target| net.index_of(target.as_str()))
                        .collect()
                })
                .unwrap_or_default()
        })
        .collect();

    let mut discovery = vec![UNVISITED; n];
    let mut low = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut tarjan_stack: Vec<usize> = Vec::new();
    let mut work: Vec<Frame> = Vec::new();
    let mut counter = 0usize;
    let mut components: Vec<Vec<NodeId>> = Vec::new();

    for root in 0..n {
        if discovery[root] != UNVISITED {
            continue;
        }
        discovery[root] = counter;
        low[root] = counter;
        counter += 1;
        tarjan_stack.push(root);
        on_stack[root] = true;
        work.push(Frame {
            node: root,
            next_edge: 0,
        });

        while let Some(frame) = work.last_mut() {
            let node = frame.node;
            if let Some(&successor) = adjacency[node].get(frame.next_edge) {
                frame.next_edge += 1;
                if discovery[successor] == UNVISITED {
                    discovery[successor] = counter;
                    low[successor] = counter;
                    counter += 1;
                    tarjan_stack.push(successor);
                    on_stack[successor] = true;
                    work.push(Frame {
                        node: successor,
                        next_edge: 0,
                    });
                } else if on_stack[successor] {
                    low[node] = low[node].min(discovery[successor]);
                }
                continue;
            }

            // all successors done
            work.pop();
            if let Some(parent) = work.last() {
                low[parent.node] = low[parent.node].min(low[node]);
            }
            if low[node] == discovery[node] {
                let mut component = Vec::new();
                while let Some(member) = tarjan_stack.pop() {
                    on_stack[member] = false;
                    if let Some(id) = net.id_at(member) {
                        component.push(id.clone());
                    }
                    if member == node {
                        break;
                    }
                }
                components.push(component);
            }
        }
    }

    log::debug!("{} strongly connected components over {n} nodes", components.len());
    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::core::tests::canonical_net;
    use petgraph::graph::DiGraph;

    fn ids(names: &[&str]) -> Vec<NodeId> {
        names.iter().copied().map(NodeId::from).collect()
    }

    /// p0 -> t0 -> p1 -> t1 -> ... -> p0, `n` places and `n` transitions.
    fn ring(n: usize) -> Network {
        let mut net = Network::new();
        for i in 0..n {
            net.add_place(format!("p{i}"), 0).unwrap();
            net.add_transition(format!("t{i}")).unwrap();
        }
        for i in 0..n {
            net.add_arc(format!("p{i}"), format!("t{i}"), 1).unwrap();
            net.add_arc(format!("t{i}"), format!("p{}", (i + 1) % n), 1)
                .unwrap();
        }
        net
    }

    #[test]
    fn canonical_slice() {
        let net = canonical_net();
        // E1, T1, then E2 before E4 since arcs are taken in insertion order
        assert_eq!(
            reachable_places(&net, "E1"),
            ids(&["E1", "E2", "E3", "E5", "E4"])
        );
        assert_eq!(reachable_places(&net, "T2"), ids(&["E3", "E5"]));
        assert_eq!(reachable_places(&net, "E3"), ids(&["E3"]));
        assert!(reachable_places(&net, "nope").is_empty());
    }

    #[test]
    fn directed_reachability() {
        let net = canonical_net();
        assert!(node_reachable(&net, "E1", "E5"));
        assert!(node_reachable(&net, "E4", "E4"));
        assert!(!node_reachable(&net, "E5", "E1"));
        assert!(!node_reachable(&net, "E2", "E4"));
        assert!(!node_reachable(&net, "E1", "missing"));
    }

    #[test]
    fn cycle_is_one_component() {
        for n in [1, 2, 5, 50] {
            let net = ring(n);
            let components = strongly_connected_components(&net);
            assert_eq!(components.len(), 1, "ring of {n}");
            assert_eq!(components[0].len(), 2 * n);
        }
    }

    #[test]
    fn acyclic_net_is_all_singletons() {
        let net = canonical_net();
        let components = strongly_connected_components(&net);
        assert_eq!(components.len(), 7);
        assert!(components.iter().all(|c| c.len() == 1));
        // sinks close first
        assert!(components[0] == ids(&["E3"]) || components[0] == ids(&["E5"]));
    }

    #[test]
    fn long_chain_does_not_recurse() {
        let mut net = Network::new();
        let len = 20_000;
        for i in 0..len {
            if i % 2 == 0 {
                net.add_place(format!("n{i}"), 0).unwrap();
            } else {
                net.add_transition(format!("n{i}")).unwrap();
            }
        }
        for i in 1..len {
            net.add_arc(format!("n{}", i - 1), format!("n{i}"), 1).unwrap();
        }
        net.add_arc(format!("n{}", len - 1), "n0", 1).unwrap();

        assert_eq!(strongly_connected_components(&net).len(), 1);
        assert_eq!(reachable_places(&net, "n0").len(), len / 2);
    }

    #[test]
    fn agrees_with_petgraph() {
        // ring of 3 plus a tail and a second ring hanging off it
        let mut net = ring(3);
        net.add_place("tail", 0).unwrap();
        net.add_transition("u0").unwrap();
        net.add_place("q0", 0).unwrap();
        net.add_transition("u1").unwrap();
        net.add_arc("t0", "tail", 1).unwrap();
        net.add_arc("tail", "u0", 1).unwrap();
        net.add_arc("u0", "q0", 1).unwrap();
        net.add_arc("q0", "u1", 1).unwrap();
        net.add_arc("u1", "q0", 1).unwrap();

        let mut graph = DiGraph::<(), ()>::new();
        let nodes: Vec<_> = (0..net.len()).map(|_| graph.add_node(())).collect();
        for arc in net.arcs() {
            let from = net.index_of(arc.source.as_str()).unwrap();
            let to = net.index_of(arc.target.as_str()).unwrap();
            graph.add_edge(nodes[from], nodes[to], ());
        }

        let mut ours: Vec<usize> = strongly_connected_components(&net)
            .iter()
            .map(Vec::len)
            .collect();
        let mut theirs: Vec<usize> = petgraph::algo::tarjan_scc(&graph)
            .iter()
            .map(Vec::len)
            .collect();
        ours.sort_unstable();
        theirs.sort_unstable();
        assert_eq!(ours, theirs);
        assert_eq!(ours, vec![1, 1, 2, 6]);
    }
}
