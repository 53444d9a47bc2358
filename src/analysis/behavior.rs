//! 行为分析：死锁、有界性、T-不变量、守恒性（P-不变量）与活性。
//!
//! 除死锁外，所有分析都基于 [`Explorer`] 的可达标识探索，只在访问者回调里
//! 表达各自的判定条件；调用者的网络永远不会被修改。
use std::fmt;

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::visit::Control;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::analysis::reachability::{
    ExplorationStats, ExploreEvent, Explorer, Outcome, ReachabilityGraph,
};
use crate::net::{Incidence, Marking, Network, NodeId, Tokens};

/// 有界性检查结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BoundednessResult {
    /// No visited marking exceeded the bound. With `truncated` set the
    /// budget ran out first and unvisited markings may still exceed it.
    Bounded { explored: usize, truncated: bool },
    /// `place` held `tokens` (> bound) in `marking`.
    Exceeded {
        place: NodeId,
        tokens: Tokens,
        marking: Marking,
    },
}

impl BoundednessResult {
    pub fn is_bounded(&self) -> bool {
        matches!(self, BoundednessResult::Bounded { .. })
    }
}

impl fmt::Display for BoundednessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundednessResult::Bounded { explored, truncated } => {
                write!(f, "bounded over {explored} markings")?;
                if *truncated {
                    write!(f, " (budget exhausted, not exhaustive)")?;
                }
                Ok(())
            }
            BoundednessResult::Exceeded {
                place,
                tokens,
                marking,
            } => write!(f, "unbounded: {place} reaches {tokens} in {marking}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TransitionInvariantResult {
    /// Firing `transition` in `from` returns to the start marking.
    Found {
        from: Marking,
        transition: NodeId,
        depth: usize,
    },
    NotFound { explored: usize, truncated: bool },
}

impl TransitionInvariantResult {
    pub fn found(&self) -> bool {
        matches!(self, TransitionInvariantResult::Found { .. })
    }
}

impl fmt::Display for TransitionInvariantResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionInvariantResult::Found {
                from,
                transition,
                depth,
            } => write!(
                f,
                "firing {transition} in {from} (depth {depth}) restores the start marking"
            ),
            TransitionInvariantResult::NotFound {
                explored,
                truncated,
            } => {
                write!(f, "no return to the start marking over {explored} markings")?;
                if *truncated {
                    write!(f, " (budget exhausted)")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConservationResult {
    Conservative { explored: usize, truncated: bool },
    Violated {
        expected: Tokens,
        found: Tokens,
        marking: Marking,
    },
}

impl ConservationResult {
    pub fn is_conservative(&self) -> bool {
        matches!(self, ConservationResult::Conservative { .. })
    }
}

impl fmt::Display for ConservationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConservationResult::Conservative {
                explored,
                truncated,
            } => {
                write!(f, "token total preserved over {explored} markings")?;
                if *truncated {
                    write!(f, " (budget exhausted)")?;
                }
                Ok(())
            }
            ConservationResult::Violated {
                expected,
                found,
                marking,
            } => write!(f, "token total {found} != {expected} in {marking}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LivenessResult {
    Live { states: usize },
    /// No marking reachable from `marking` enables `transition`.
    NotLive { transition: NodeId, marking: Marking },
    /// The reachability graph hit the budget; no verdict.
    Unknown { states: usize },
}

impl LivenessResult {
    pub fn is_live(&self) -> bool {
        matches!(self, LivenessResult::Live { .. })
    }
}

impl fmt::Display for LivenessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LivenessResult::Live { states } => write!(f, "live over {states} markings"),
            LivenessResult::NotLive {
                transition,
                marking,
            } => write!(f, "{transition} is dead from {marking}"),
            LivenessResult::Unknown { states } => {
                write!(f, "unknown: state budget hit after {states} markings")
            }
        }
    }
}

/// Runs the behavioural analyses on one network with a shared state limit.
pub struct Analyzer<'n> {
    net: &'n Network,
    state_limit: Option<usize>,
}

impl<'n> Analyzer<'n> {
    /// No state limit: every analysis runs until the reachable set is
    /// exhausted, which terminates only when that set is finite.
    pub fn new(net: &'n Network) -> Self {
        Self {
            net,
            state_limit: None,
        }
    }

    pub fn with_state_limit(mut self, limit: Option<usize>) -> Self {
        self.state_limit = limit;
        self
    }

    fn explorer(&self) -> Explorer<'n> {
        Explorer::new(self.net).with_budget(self.state_limit)
    }

    /// Nothing is enabled in the current marking. No exploration.
    pub fn is_deadlock(&self) -> bool {
        let marking = self.net.initial_marking();
        Incidence::from_network(self.net)
            .enabled(&marking)
            .next()
            .is_none()
    }

    /// Stops at the first visited marking where some place holds more than
    /// `max_tokens`.
    ///
    /// A `Bounded` verdict with `truncated` set is not a proof: the state
    /// limit must cover the whole reachable set for the answer to be sound.
    pub fn boundedness(&self, max_tokens: Tokens) -> BoundednessResult {
        let exploration = self.explorer().explore(self.net.initial_marking(), |event| {
            let ExploreEvent::Discover { marking, .. } = event else {
                return Control::Continue;
            };
            match marking.iter().find(|(_, tokens)| *tokens > max_tokens) {
                Some((place, tokens)) => Control::Break(BoundednessResult::Exceeded {
                    place: place.clone(),
                    tokens,
                    marking: marking.clone(),
                }),
                None => Control::Continue,
            }
        });

        let result = match exploration.outcome {
            Outcome::Interrupted(exceeded) => exceeded,
            outcome => BoundednessResult::Bounded {
                explored: exploration.stats.visited,
                truncated: matches!(outcome, Outcome::BudgetExhausted),
            },
        };
        log::info!("boundedness (k = {max_tokens}): {result}");
        result
    }

    /// Looks for a fire that leads back to the start marking.
    pub fn transition_invariant(&self) -> TransitionInvariantResult {
        let start = self.net.initial_marking();
        let mut depths: FxHashMap<Marking, usize> = FxHashMap::default();
        let exploration = self.explorer().explore(start.clone(), |event| match event {
            ExploreEvent::Discover { marking, depth } => {
                depths.insert(marking.clone(), depth);
                Control::Continue
            }
            ExploreEvent::Fire {
                source,
                transition,
                target,
                ..
            } if *target == start => Control::Break(TransitionInvariantResult::Found {
                from: source.clone(),
                transition: transition.clone(),
                depth: depths.get(source).map_or(1, |depth| depth + 1),
            }),
            ExploreEvent::Fire { .. } => Control::Continue,
        });

        let result = finish(exploration.outcome, exploration.stats, |explored, truncated| {
            TransitionInvariantResult::NotFound {
                explored,
                truncated,
            }
        });
        log::info!("transition invariant: {result}");
        result
    }

    /// Every visited marking must hold the start marking's token total.
    pub fn conservation(&self) -> ConservationResult {
        let start = self.net.initial_marking();
        let expected = start.total();
        let exploration = self.explorer().explore(start, |event| {
            let ExploreEvent::Discover { marking, .. } = event else {
                return Control::Continue;
            };
            let found = marking.total();
            if found == expected {
                Control::Continue
            } else {
                Control::Break(ConservationResult::Violated {
                    expected,
                    found,
                    marking: marking.clone(),
                })
            }
        });

        let result = finish(exploration.outcome, exploration.stats, |explored, truncated| {
            ConservationResult::Conservative {
                explored,
                truncated,
            }
        });
        log::info!("conservation: {result}");
        result
    }

    /// 活性：对每个可达标识与每个变迁，都存在从该标识可达、且使该变迁可发生的标识。
    ///
    /// The reachability graph is condensed into strongly connected
    /// components; the transitions eventually enabled from a component are
    /// those enabled inside it plus those of every successor component, so
    /// one pass in reverse topological order answers every pair.
    pub fn liveness(&self) -> LivenessResult {
        let graph = ReachabilityGraph::build(self.net, self.state_limit);
        let states = graph.graph.node_count();
        if graph.truncated {
            log::info!("liveness: unknown, graph truncated at {states} markings");
            return LivenessResult::Unknown { states };
        }

        let incidence = Incidence::from_network(self.net);
        let transitions = incidence.transitions();
        let components = tarjan_scc(&graph.graph);
        let mut component_of = FxHashMap::default();
        for (idx, component) in components.iter().enumerate() {
            for &node in component {
                component_of.insert(node, idx);
            }
        }

        // sccs come out sinks first, so successors are always filled in
        let mut eventually: Vec<Vec<bool>> = Vec::with_capacity(components.len());
        for (idx, component) in components.iter().enumerate() {
            let mut enabled = vec![false; transitions];
            for &node in component {
                for transition in incidence.enabled_indices(graph.marking(node)) {
                    enabled[transition] = true;
                }
                for successor in graph.graph.neighbors_directed(node, Direction::Outgoing) {
                    let Some(&other) = component_of.get(&successor) else {
                        continue;
                    };
                    if other != idx {
                        for (slot, reached) in enabled.iter_mut().zip(&eventually[other]) {
                            *slot |= *reached;
                        }
                    }
                }
            }
            eventually.push(enabled);
        }

        let mut nodes: Vec<_> = graph.graph.node_indices().collect();
        nodes.sort();
        for node in nodes {
            let Some(&component) = component_of.get(&node) else {
                continue;
            };
            if let Some(dead) = eventually[component].iter().position(|reached| !reached) {
                let result = LivenessResult::NotLive {
                    transition: incidence.columns()[dead].transition.clone(),
                    marking: graph.marking(node).clone(),
                };
                log::info!("liveness: {result}");
                return result;
            }
        }

        log::info!("liveness: live over {states} markings");
        LivenessResult::Live { states }
    }
}

fn finish<T, F>(outcome: Outcome<T>, stats: ExplorationStats, exhausted: F) -> T
where
    F: FnOnce(usize, bool) -> T,
{
    match outcome {
        Outcome::Interrupted(value) => value,
        Outcome::Exhausted => exhausted(stats.visited, false),
        Outcome::BudgetExhausted => exhausted(stats.visited, true),
    }
}

/// No transition is enabled in the current marking.
pub fn is_deadlock(net: &Network) -> bool {
    Analyzer::new(net).is_deadlock()
}

/// Explores at most `budget` markings; see [`Analyzer::boundedness`] for
/// what a `true` answer means when the budget runs out.
pub fn is_bounded(net: &Network, max_tokens: Tokens, budget: usize) -> bool {
    Analyzer::new(net)
        .with_state_limit(Some(budget))
        .boundedness(max_tokens)
        .is_bounded()
}

pub fn has_transition_invariant(net: &Network) -> bool {
    Analyzer::new(net).transition_invariant().found()
}

pub fn is_conservative(net: &Network) -> bool {
    Analyzer::new(net).conservation().is_conservative()
}

pub fn is_live(net: &Network) -> bool {
    Analyzer::new(net).liveness().is_live()
}
