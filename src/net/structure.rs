//! 网络静态结构元素：节点、弧与标识。
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::net::ids::{NodeId, NodeKind};

/// Arc multiplicity. Always at least 1 for arcs stored in a [`crate::net::Network`].
pub type Weight = u32;

/// Token count. Signed so that firing a disabled transition (a caller bug)
/// shows up as a negative count instead of an overflow panic.
pub type Tokens = i64;

/// Outgoing arc of a node: destination and weight.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutArc {
    pub target: NodeId,
    pub weight: Weight,
}

impl OutArc {
    pub fn new(target: NodeId, weight: Weight) -> Self {
        Self { target, weight }
    }
}

impl fmt::Debug for OutArc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.target, self.weight)
    }
}

/// A fully resolved arc, as yielded by [`crate::net::Network::arcs`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Arc {
    pub source: NodeId,
    pub target: NodeId,
    pub weight: Weight,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    /// Token count; transitions always hold 0.
    pub tokens: Tokens,
    pub outputs: SmallVec<[OutArc; 4]>,
}

impl Node {
    pub fn place(tokens: Tokens) -> Self {
        Self {
            kind: NodeKind::Place,
            tokens,
            outputs: SmallVec::new(),
        }
    }

    pub fn transition() -> Self {
        Self {
            kind: NodeKind::Transition,
            tokens: 0,
            outputs: SmallVec::new(),
        }
    }

    pub fn is_sink(&self) -> bool {
        self.outputs.is_empty()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("tokens", &self.tokens)
            .field("outputs", &self.outputs)
            .finish()
    }
}

/// Token distribution over places, detached from the network it came from.
///
/// Places are kept sorted by id, so two markings built in different orders
/// compare and hash equal. The map itself is the canonical visited-set key.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Marking(BTreeMap<NodeId, Tokens>);

impl Marking {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, Tokens)> {
        self.0.iter().map(|(place, tokens)| (place, *tokens))
    }

    /// Tokens at `place`; places missing from the marking hold 0.
    pub fn tokens(&self, place: &str) -> Tokens {
        self.0.get(place).copied().unwrap_or(0)
    }

    pub fn set(&mut self, place: NodeId, tokens: Tokens) {
        self.0.insert(place, tokens);
    }

    pub fn tokens_mut(&mut self, place: &NodeId) -> &mut Tokens {
        self.0.entry(place.clone()).or_insert(0)
    }

    pub fn total(&self) -> Tokens {
        self.0.values().sum()
    }

    /// Largest count and the place holding it (first in id order on ties).
    pub fn max_place(&self) -> Option<(&NodeId, Tokens)> {
        self.iter()
            .fold(None, |best: Option<(&NodeId, Tokens)>, (place, tokens)| match best {
                Some((_, top)) if top >= tokens => best,
                _ => Some((place, tokens)),
            })
    }

    /// Sorted `(place, tokens)` pairs.
    pub fn canonical_key(&self) -> Vec<(NodeId, Tokens)> {
        self.0
            .iter()
            .map(|(place, tokens)| (place.clone(), *tokens))
            .collect()
    }

    pub fn hashable_key(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    pub fn into_inner(self) -> BTreeMap<NodeId, Tokens> {
        self.0
    }
}

impl FromIterator<(NodeId, Tokens)> for Marking {
    fn from_iter<I: IntoIterator<Item = (NodeId, Tokens)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Debug for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (place, tokens) in self.iter() {
            map.entry(&place.as_str(), &tokens);
        }
        map.finish()
    }
}

impl fmt::Display for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (idx, (place, tokens)) in self.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{place}: {tokens}")?;
        }
        write!(f, "}}")
    }
}
