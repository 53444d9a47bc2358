//! 运行时: 可发生判定、发生语义与同步宏步.
use thiserror::Error;

use crate::net::core::Network;
use crate::net::ids::NodeId;
use crate::net::incidence::{Incidence, TransitionColumn};
use crate::net::structure::Marking;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FireError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),
    #[error("node {0} is a place, not a transition")]
    NotATransition(NodeId),
    #[error("transition {0} is not enabled under the current marking")]
    NotEnabled(NodeId),
}

/// Result of [`Network::run`]: what fired in each macro-step and where the
/// network ended up.
#[derive(Debug, Clone)]
pub struct SimulationTrace {
    pub steps: Vec<Vec<NodeId>>,
    pub network: Network,
    /// Whether the run stopped because nothing was enabled.
    pub deadlocked: bool,
}

impl Network {
    fn column_or_err(&self, transition: &str) -> Result<TransitionColumn, FireError> {
        match TransitionColumn::of(self, transition) {
            Some(column) => Ok(column),
            None if self.contains(transition) => {
                Err(FireError::NotATransition(NodeId::from(transition)))
            }
            None => Err(FireError::UnknownNode(NodeId::from(transition))),
        }
    }

    /// 每个输入库所的 token 数都不少于其指向 `transition` 的弧权重之和。
    /// 不存在的节点或库所永远不可发生。
    pub fn is_enabled(&self, transition: &str) -> bool {
        TransitionColumn::of(self, transition)
            .is_some_and(|column| column.is_enabled(&self.initial_marking()))
    }

    pub fn enabled_transitions(&self) -> Vec<NodeId> {
        let marking = self.initial_marking();
        Incidence::from_network(self)
            .enabled(&marking)
            .map(|column| column.transition.clone())
            .collect()
    }

    /// Fires `transition` in place: inputs lose their summed arc weight,
    /// then outputs gain theirs.
    ///
    /// Enablement is the caller's responsibility and is not checked; firing
    /// a disabled transition leaves negative counts behind. Use
    /// [`Network::try_fire`] for a checked commit.
    pub fn fire(&mut self, transition: &str) -> Result<(), FireError> {
        let column = self.column_or_err(transition)?;
        for (place, weight) in &column.pre {
            if let Some(tokens) = self.tokens_mut(place.as_str()) {
                *tokens -= weight;
            }
        }
        for (place, weight) in &column.post {
            if let Some(tokens) = self.tokens_mut(place.as_str()) {
                *tokens += weight;
            }
        }
        Ok(())
    }

    pub fn try_fire(&mut self, transition: &str) -> Result<(), FireError> {
        let column = self.column_or_err(transition)?;
        if !column.is_enabled(&self.initial_marking()) {
            return Err(FireError::NotEnabled(column.transition));
        }
        self.fire(transition)
    }

    /// The marking reached by firing `transition` from `marking`. Neither the
    /// marking nor the network is touched. An unknown transition yields an
    /// unchanged copy.
    pub fn compute_next_marking(&self, marking: &Marking, transition: &str) -> Marking {
        let mut next = marking.clone();
        match TransitionColumn::of(self, transition) {
            Some(column) => column.apply(&mut next),
            None => log::warn!("compute_next_marking: {transition} is not a transition"),
        }
        next
    }

    /// 同步宏步：在步开始时冻结的标识上判定可发生性，在另一份副本上提交所有发生。
    pub fn step(&self) -> Network {
        self.step_traced().0
    }

    /// Like [`Network::step`], also returning the transitions that fired, in
    /// network order.
    ///
    /// A transition enabled at the start of the step is skipped when an
    /// earlier fire of the same step already consumed the tokens it needs,
    /// so the step never drives a count negative. No transition can become
    /// enabled during the step.
    pub fn step_traced(&self) -> (Network, Vec<NodeId>) {
        let frozen = self.initial_marking();
        let mut working = frozen.clone();
        let incidence = Incidence::from_network(self);
        let mut fired = Vec::new();

        for column in incidence.columns() {
            if !column.is_enabled(&frozen) {
                continue;
            }
            if !column.is_enabled(&working) {
                log::debug!(
                    "step: {} lost a conflict within the step",
                    column.transition
                );
                continue;
            }
            column.apply(&mut working);
            fired.push(column.transition.clone());
        }

        let mut next = self.clone();
        next.apply_marking(&working);
        (next, fired)
    }

    /// Repeats the macro-step until nothing fires or `max_steps` is reached.
    pub fn run(&self, max_steps: usize) -> SimulationTrace {
        let mut network = self.clone();
        let mut steps = Vec::new();
        let mut deadlocked = false;

        for _ in 0..max_steps {
            let (next, fired) = network.step_traced();
            if fired.is_empty() {
                deadlocked = true;
                break;
            }
            log::debug!("step {}: fired {:?}", steps.len(), fired);
            steps.push(fired);
            network = next;
        }
        if !deadlocked && network.enabled_transitions().is_empty() {
            deadlocked = true;
        }

        SimulationTrace {
            steps,
            network,
            deadlocked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::core::tests::canonical_net;

    #[test]
    fn canonical_fire_sequence() {
        let mut net = canonical_net();
        assert!(net.is_enabled("T1"));
        assert!(!net.is_enabled("T2"));

        net.fire("T1").unwrap();
        assert_eq!(net.tokens("E1"), Some(3));
        assert_eq!(net.tokens("E2"), Some(1));
        assert_eq!(net.tokens("E4"), Some(1));
        assert!(!net.is_enabled("T2"));
    }

    #[test]
    fn unchecked_fire_goes_negative_only_when_disabled() {
        let mut net = canonical_net();
        net.fire("T1").unwrap();
        net.fire("T1").unwrap();
        assert_eq!(net.tokens("E1"), Some(1));
        assert!(net.initial_marking().iter().all(|(_, tokens)| tokens >= 0));

        assert!(!net.is_enabled("T1"));
        net.fire("T1").unwrap();
        assert_eq!(net.tokens("E1"), Some(-1));
    }

    #[test]
    fn try_fire_refuses_disabled() {
        let mut net = canonical_net();
        assert_eq!(
            net.try_fire("T2"),
            Err(FireError::NotEnabled(NodeId::from("T2")))
        );
        assert_eq!(net.tokens("E2"), Some(0));
        assert_eq!(
            net.fire("E1"),
            Err(FireError::NotATransition(NodeId::from("E1")))
        );
        assert_eq!(
            net.fire("T9"),
            Err(FireError::UnknownNode(NodeId::from("T9")))
        );
        assert!(!net.is_enabled("E1"));
        assert!(!net.is_enabled("T9"));
    }

    #[test]
    fn compute_next_marking_is_pure() {
        let net = canonical_net();
        let before = net.initial_marking();
        let snapshot = before.clone();

        let after = net.compute_next_marking(&before, "T1");
        assert_eq!(before, snapshot);
        assert_eq!(net.initial_marking(), snapshot);
        assert_eq!(after.tokens("E1"), 3);
        assert_eq!(after.tokens("E2"), 1);
        assert_eq!(after.tokens("E4"), 1);

        // even a disabled transition only touches the returned copy
        let _ = net.compute_next_marking(&before, "T2");
        assert_eq!(before, snapshot);
    }

    #[test]
    fn step_decides_on_frozen_marking() {
        // t1 moves a token into b, which would enable t2 in a sequential run
        let mut net = Network::new();
        net.add_place("a", 1).unwrap();
        net.add_transition("t1").unwrap();
        net.add_place("b", 0).unwrap();
        net.add_transition("t2").unwrap();
        net.add_place("c", 0).unwrap();
        net.add_arc("a", "t1", 1).unwrap();
        net.add_arc("t1", "b", 1).unwrap();
        net.add_arc("b", "t2", 1).unwrap();
        net.add_arc("t2", "c", 1).unwrap();

        let (next, fired) = net.step_traced();
        assert_eq!(fired, vec![NodeId::from("t1")]);
        assert_eq!(next.tokens("b"), Some(1));
        assert_eq!(next.tokens("c"), Some(0));
        // the caller's network is untouched
        assert_eq!(net.tokens("a"), Some(1));

        let (last, fired) = next.step_traced();
        assert_eq!(fired, vec![NodeId::from("t2")]);
        assert_eq!(last.tokens("c"), Some(1));
    }

    #[test]
    fn step_skips_conflicting_transition() {
        let mut net = Network::new();
        net.add_place("shared", 1).unwrap();
        net.add_transition("left").unwrap();
        net.add_transition("right").unwrap();
        net.add_place("l", 0).unwrap();
        net.add_place("r", 0).unwrap();
        net.add_arc("shared", "left", 1).unwrap();
        net.add_arc("shared", "right", 1).unwrap();
        net.add_arc("left", "l", 1).unwrap();
        net.add_arc("right", "r", 1).unwrap();

        let (next, fired) = net.step_traced();
        assert_eq!(fired, vec![NodeId::from("left")]);
        assert_eq!(next.tokens("shared"), Some(0));
        assert_eq!(next.tokens("r"), Some(0));
    }

    #[test]
    fn run_stops_at_deadlock() {
        let net = canonical_net();
        let trace = net.run(10);
        // E1: 5 -> 3 -> 1, then T2 once both E2 and E4 hold 2
        assert!(trace.deadlocked);
        assert_eq!(trace.network.tokens("E1"), Some(1));
        assert_eq!(trace.network.tokens("E3"), Some(1));
        assert_eq!(trace.network.tokens("E5"), Some(1));
        assert_eq!(trace.steps.len(), 3);
    }
}
