//! 可达标识图的穷举式广度优先探索。
//!
//! [`Explorer`] 维护前沿队列、已访问集合与探索预算；各行为分析通过访问者
//! 回调定制判定条件，而不是各自重写搜索。[`ReachabilityGraph`] 在同一探索
//! 之上构建完整的标识图。
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use petgraph::dot::{Config, Dot};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::Control;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::net::{Incidence, Marking, Network, NodeId};

/// What the explorer reports to its visitor.
#[derive(Debug, Clone, Copy)]
pub enum ExploreEvent<'a> {
    /// A marking seen for the first time, `depth` fires away from the start.
    Discover { marking: &'a Marking, depth: usize },
    /// `transition` fired in `source`, giving `target`. `fresh` is true when
    /// `target` has not been visited yet.
    Fire {
        source: &'a Marking,
        transition: &'a NodeId,
        target: &'a Marking,
        fresh: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<B> {
    /// The frontier emptied: every reachable marking was visited.
    Exhausted,
    /// The budget stopped the search before the frontier emptied.
    BudgetExhausted,
    /// The visitor broke off with a value.
    Interrupted(B),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExplorationStats {
    pub visited: usize,
    pub fires: usize,
    pub max_depth: usize,
}

#[derive(Debug, Clone)]
pub struct Exploration<B> {
    pub outcome: Outcome<B>,
    pub stats: ExplorationStats,
}

impl<B> Exploration<B> {
    pub fn truncated(&self) -> bool {
        matches!(self.outcome, Outcome::BudgetExhausted)
    }
}

pub struct Explorer<'n> {
    net: &'n Network,
    incidence: Incidence,
    budget: Option<usize>,
}

impl<'n> Explorer<'n> {
    pub fn new(net: &'n Network) -> Self {
        Self {
            net,
            incidence: Incidence::from_network(net),
            budget: None,
        }
    }

    /// Maximum number of markings to visit. `None` explores until the
    /// frontier empties, which only happens for finite state spaces.
    pub fn with_budget(mut self, budget: Option<usize>) -> Self {
        self.budget = budget;
        self
    }

    pub fn network(&self) -> &'n Network {
        self.net
    }

    pub fn incidence(&self) -> &Incidence {
        &self.incidence
    }

    fn within_budget(&self, visited: usize) -> bool {
        self.budget.is_none_or(|limit| visited < limit)
    }

    /// Breadth-first traversal of the marking graph from `start`.
    ///
    /// `Control::Prune` on a `Discover` keeps the marking from being
    /// expanded; on a `Fire` it keeps a fresh target from being visited.
    /// `Control::Break` stops the search at once.
    pub fn explore<B, F>(&self, start: Marking, mut visitor: F) -> Exploration<B>
    where
        F: FnMut(ExploreEvent<'_>) -> Control<B>,
    {
        let mut stats = ExplorationStats::default();
        if !self.within_budget(0) {
            return Exploration {
                outcome: Outcome::BudgetExhausted,
                stats,
            };
        }

        let mut visited: FxHashSet<Marking> = FxHashSet::default();
        let mut frontier: VecDeque<(Marking, usize)> = VecDeque::new();
        let mut truncated = false;

        visited.insert(start.clone());
        stats.visited = 1;
        match visitor(ExploreEvent::Discover {
            marking: &start,
            depth: 0,
        }) {
            Control::Break(value) => {
                return Exploration {
                    outcome: Outcome::Interrupted(value),
                    stats,
                };
            }
            Control::Prune => {}
            Control::Continue => frontier.push_back((start, 0)),
        }

        while let Some((marking, depth)) = frontier.pop_front() {
            for column in self.incidence.enabled(&marking) {
                let mut next = marking.clone();
                column.apply(&mut next);
                stats.fires += 1;

                let fresh = !visited.contains(&next);
                if fresh && !self.within_budget(visited.len()) {
                    truncated = true;
                    continue;
                }

                match visitor(ExploreEvent::Fire {
                    source: &marking,
                    transition: &column.transition,
                    target: &next,
                    fresh,
                }) {
                    Control::Break(value) => {
                        return Exploration {
                            outcome: Outcome::Interrupted(value),
                            stats,
                        };
                    }
                    Control::Prune => continue,
                    Control::Continue => {}
                }

                if !fresh {
                    continue;
                }
                visited.insert(next.clone());
                stats.visited += 1;
                stats.max_depth = stats.max_depth.max(depth + 1);

                match visitor(ExploreEvent::Discover {
                    marking: &next,
                    depth: depth + 1,
                }) {
                    Control::Break(value) => {
                        return Exploration {
                            outcome: Outcome::Interrupted(value),
                            stats,
                        };
                    }
                    Control::Prune => {}
                    Control::Continue => frontier.push_back((next, depth + 1)),
                }
            }
        }

        log::debug!(
            "exploration finished: {} markings, {} fires, depth {}{}",
            stats.visited,
            stats.fires,
            stats.max_depth,
            if truncated { " (budget exhausted)" } else { "" }
        );
        Exploration {
            outcome: if truncated {
                Outcome::BudgetExhausted
            } else {
                Outcome::Exhausted
            },
            stats,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReachabilityStats {
    pub state_count: usize,
    pub edge_count: usize,
    pub deadlock_count: usize,
    pub truncated: bool,
}

/// Markings as nodes, fires as edges labelled with the transition.
#[derive(Debug)]
pub struct ReachabilityGraph {
    pub graph: StableGraph<Marking, NodeId>,
    pub initial: NodeIndex,
    pub markings: FxHashMap<Marking, NodeIndex>,
    /// Markings that enable nothing.
    pub deadlocks: FxHashSet<NodeIndex>,
    pub truncated: bool,
}

impl ReachabilityGraph {
    pub fn build(net: &Network, budget: Option<usize>) -> Self {
        Self::from_marking(net, net.initial_marking(), budget)
    }

    pub fn from_marking(net: &Network, start: Marking, budget: Option<usize>) -> Self {
        let explorer = Explorer::new(net).with_budget(budget);
        let mut graph: StableGraph<Marking, NodeId> = StableGraph::new();
        let mut markings: FxHashMap<Marking, NodeIndex> = FxHashMap::default();
        let mut deadlocks = FxHashSet::default();

        let mut node_for = |graph: &mut StableGraph<Marking, NodeId>, marking: &Marking| {
            *markings
                .entry(marking.clone())
                .or_insert_with(|| graph.add_node(marking.clone()))
        };

        let exploration = explorer.explore::<(), _>(start.clone(), |event| {
            match event {
                ExploreEvent::Discover { marking, .. } => {
                    let index = node_for(&mut graph, marking);
                    if explorer.incidence().enabled(marking).next().is_none() {
                        deadlocks.insert(index);
                    }
                }
                ExploreEvent::Fire {
                    source,
                    transition,
                    target,
                    ..
                } => {
                    let from = node_for(&mut graph, source);
                    let to = node_for(&mut graph, target);
                    graph.add_edge(from, to, transition.clone());
                }
            }
            Control::Continue
        });

        let initial = node_for(&mut graph, &start);
        drop(node_for);

        Self {
            graph,
            initial,
            markings,
            deadlocks,
            truncated: exploration.truncated(),
        }
    }

    pub fn stats(&self) -> ReachabilityStats {
        ReachabilityStats {
            state_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            deadlock_count: self.deadlocks.len(),
            truncated: self.truncated,
        }
    }

    pub fn marking(&self, index: NodeIndex) -> &Marking {
        &self.graph[index]
    }

    pub fn index_of(&self, marking: &Marking) -> Option<NodeIndex> {
        self.markings.get(marking).copied()
    }

    pub fn contains_marking(&self, marking: &Marking) -> bool {
        self.markings.contains_key(marking)
    }

    pub fn dot(&self) -> String {
        fn escape(s: &str) -> String {
            s.replace('\\', "\\\\").replace('"', "\\\"")
        }

        type G = StableGraph<Marking, NodeId>;
        let edge_attr = |_: &G, edge: petgraph::stable_graph::EdgeReference<NodeId>| -> String {
            format!("label=\"{}\"", escape(edge.weight().as_str()))
        };
        let node_attr = |_: &G, (idx, marking): (NodeIndex, &Marking)| -> String {
            let shape = if self.deadlocks.contains(&idx) {
                ", shape=doublecircle"
            } else {
                ""
            };
            format!(
                "label=\"s{}\\n{}\"{}",
                idx.index(),
                escape(&marking.to_string()),
                shape
            )
        };

        format!(
            "{:?}",
            Dot::with_attr_getters(
                &self.graph,
                &[Config::EdgeNoLabel, Config::NodeNoLabel],
                &edge_attr,
                &node_attr
            )
        )
    }

    pub fn write_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.dot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::core::tests::canonical_net;

    /// p0 <-> p1 through t0/t1, one token circulating.
    fn cycle_net() -> Network {
        let mut net = Network::new();
        net.add_place("p0", 1).unwrap();
        net.add_transition("t0").unwrap();
        net.add_place("p1", 0).unwrap();
        net.add_transition("t1").unwrap();
        net.add_arc("p0", "t0", 1).unwrap();
        net.add_arc("t0", "p1", 1).unwrap();
        net.add_arc("p1", "t1", 1).unwrap();
        net.add_arc("t1", "p0", 1).unwrap();
        net
    }

    /// t0 keeps adding tokens to p1.
    fn generator_net() -> Network {
        let mut net = Network::new();
        net.add_place("p0", 1).unwrap();
        net.add_transition("t0").unwrap();
        net.add_place("p1", 0).unwrap();
        net.add_arc("p0", "t0", 1).unwrap();
        net.add_arc("t0", "p0", 1).unwrap();
        net.add_arc("t0", "p1", 1).unwrap();
        net
    }

    #[test]
    fn canonical_state_space() {
        let net = canonical_net();
        let mut discovered = Vec::new();
        let exploration = Explorer::new(&net).explore::<(), _>(net.initial_marking(), |event| {
            if let ExploreEvent::Discover { marking, .. } = event {
                discovered.push(marking.clone());
            }
            Control::Continue
        });

        assert_eq!(exploration.outcome, Outcome::Exhausted);
        // E1 = 5, 3, 1 and the T2 branch from E1 = 1
        assert_eq!(discovered.len(), 4);
        assert_eq!(exploration.stats.visited, 4);
        assert_eq!(exploration.stats.max_depth, 3);
        // the caller's network is untouched
        assert_eq!(net.tokens("E1"), Some(5));
    }

    #[test]
    fn revisits_are_suppressed() {
        let net = cycle_net();
        let mut stale_fires = 0;
        let exploration = Explorer::new(&net).explore::<(), _>(net.initial_marking(), |event| {
            if let ExploreEvent::Fire { fresh: false, .. } = event {
                stale_fires += 1;
            }
            Control::Continue
        });
        assert_eq!(exploration.stats.visited, 2);
        assert_eq!(exploration.stats.fires, 2);
        assert_eq!(stale_fires, 1);
    }

    #[test]
    fn budget_bounds_infinite_space() {
        let net = generator_net();
        let exploration = Explorer::new(&net)
            .with_budget(Some(50))
            .explore::<(), _>(net.initial_marking(), |_| Control::Continue);
        assert!(exploration.truncated());
        assert_eq!(exploration.stats.visited, 50);
    }

    #[test]
    fn break_carries_value() {
        let net = generator_net();
        let exploration = Explorer::new(&net).explore(net.initial_marking(), |event| match event {
            ExploreEvent::Discover { marking, depth } if marking.tokens("p1") == 3 => {
                Control::Break(depth)
            }
            _ => Control::Continue,
        });
        assert_eq!(exploration.outcome, Outcome::Interrupted(3));
    }

    #[test]
    fn graph_of_cycle() {
        let net = cycle_net();
        let graph = ReachabilityGraph::build(&net, None);
        let stats = graph.stats();
        assert_eq!(stats.state_count, 2);
        assert_eq!(stats.edge_count, 2);
        assert_eq!(stats.deadlock_count, 0);
        assert!(!stats.truncated);
        assert_eq!(graph.marking(graph.initial), &net.initial_marking());
        assert!(graph.dot().contains("t0"));
    }

    #[test]
    fn graph_records_deadlocks() {
        let net = canonical_net();
        let graph = ReachabilityGraph::build(&net, None);
        assert_eq!(graph.stats().state_count, 4);
        assert_eq!(graph.stats().deadlock_count, 1);
        let dead = *graph.deadlocks.iter().next().unwrap();
        assert_eq!(graph.marking(dead).tokens("E3"), 1);
    }

    #[test]
    fn truncated_graph_is_flagged() {
        let net = generator_net();
        let graph = ReachabilityGraph::build(&net, Some(5));
        assert!(graph.truncated);
        assert_eq!(graph.stats().state_count, 5);
    }
}
