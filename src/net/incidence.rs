//! 变迁的前置/后置集合（按库所汇总弧权重）。
//!
//! 并行弧在此处合并：同一库所到同一变迁的多条弧权重相加，
//! 可激发判定与发射都只看汇总后的权重。
use smallvec::SmallVec;

use crate::net::core::Network;
use crate::net::ids::NodeId;
use crate::net::structure::{Marking, Tokens};

type SmallRow<T> = SmallVec<[T; 4]>;

/// Summed input and output weights of one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionColumn {
    pub transition: NodeId,
    /// `(place, summed weight)` for every place with arcs into the transition,
    /// in network order.
    pub pre: SmallRow<(NodeId, Tokens)>,
    /// `(place, summed weight)` for every place the transition feeds.
    pub post: SmallRow<(NodeId, Tokens)>,
}

impl TransitionColumn {
    /// Builds the column of `transition`, or `None` when it is not a
    /// transition of `net`.
    pub fn of(net: &Network, transition: &str) -> Option<Self> {
        let node = net.node(transition)?;
        if !node.kind.is_transition() {
            return None;
        }
        let transition = net.node_id(transition)?.clone();

        let mut pre = SmallRow::new();
        for (place_id, place) in net.places() {
            let weight: Tokens = place
                .outputs
                .iter()
                .filter(|arc| arc.target == transition)
                .map(|arc| Tokens::from(arc.weight))
                .sum();
            if weight > 0 {
                pre.push((place_id.clone(), weight));
            }
        }

        let mut post: SmallRow<(NodeId, Tokens)> = SmallRow::new();
        for arc in &node.outputs {
            if !net.is_place(arc.target.as_str()) {
                log::debug!(
                    "ignoring arc {} -> {}: target is not a place",
                    transition,
                    arc.target
                );
                continue;
            }
            match post.iter_mut().find(|(place, _)| *place == arc.target) {
                Some((_, weight)) => *weight += Tokens::from(arc.weight),
                None => post.push((arc.target.clone(), Tokens::from(arc.weight))),
            }
        }

        Some(Self {
            transition,
            pre,
            post,
        })
    }

    pub fn is_enabled(&self, marking: &Marking) -> bool {
        self.pre
            .iter()
            .all(|(place, weight)| marking.tokens(place.as_str()) >= *weight)
    }

    /// Consumes then produces on `marking` without checking enablement.
    pub fn apply(&self, marking: &mut Marking) {
        for (place, weight) in &self.pre {
            *marking.tokens_mut(place) -= weight;
        }
        for (place, weight) in &self.post {
            *marking.tokens_mut(place) += weight;
        }
    }

    /// Net token change caused by one firing.
    pub fn token_delta(&self) -> Tokens {
        let consumed: Tokens = self.pre.iter().map(|(_, w)| w).sum();
        let produced: Tokens = self.post.iter().map(|(_, w)| w).sum();
        produced - consumed
    }
}

/// Columns for every transition of a network, computed once and shared by
/// every expansion of a reachability exploration.
#[derive(Debug, Clone, Default)]
pub struct Incidence {
    columns: Vec<TransitionColumn>,
}

impl Incidence {
    pub fn from_network(net: &Network) -> Self {
        let columns = net
            .transitions()
            .filter_map(|(id, _)| TransitionColumn::of(net, id.as_str()))
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> &[TransitionColumn] {
        &self.columns
    }

    pub fn transitions(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, transition: &str) -> Option<&TransitionColumn> {
        self.columns
            .iter()
            .find(|column| column.transition.as_str() == transition)
    }

    /// Transitions enabled under `marking`, in network order.
    pub fn enabled<'a>(
        &'a self,
        marking: &'a Marking,
    ) -> impl Iterator<Item = &'a TransitionColumn> + 'a {
        self.columns
            .iter()
            .filter(move |column| column.is_enabled(marking))
    }

    /// Indices (into [`Incidence::columns`]) of transitions enabled under `marking`.
    pub fn enabled_indices(&self, marking: &Marking) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, column)| column.is_enabled(marking))
            .map(|(idx, _)| idx)
            .collect()
    }
}
