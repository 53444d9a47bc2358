//! 网络容器：节点的插入顺序映射、带检查的构造接口与文本转储。
use std::fmt;

use indexmap::IndexMap;
use itertools::Itertools;
use thiserror::Error;

use crate::net::ids::{NodeId, NodeKind};
use crate::net::structure::{Arc, Marking, Node, OutArc, Tokens, Weight};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetError {
    #[error("node {0} already exists")]
    DuplicateNode(NodeId),
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),
    #[error("arc {from} -> {to} has zero weight")]
    ZeroWeight { from: NodeId, to: NodeId },
    #[error("node {0} is not a place")]
    NotAPlace(NodeId),
}

/// A token-flow network: places and transitions keyed by [`NodeId`], each
/// with its ordered list of outgoing arcs.
///
/// Iteration follows insertion order. Arcs between two nodes of the same
/// kind are accepted here; [`crate::analysis::validate::is_bipartite`]
/// reports them.
#[derive(Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Network {
    nodes: IndexMap<NodeId, Node>,
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.nodes.iter()).finish()
    }
}

impl Network {
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
        }
    }

    fn insert_node(&mut self, id: NodeId, node: Node) -> Result<(), NetError> {
        if self.nodes.contains_key(&id) {
            return Err(NetError::DuplicateNode(id));
        }
        self.nodes.insert(id, node);
        Ok(())
    }

    pub fn add_place(&mut self, id: impl Into<NodeId>, tokens: Tokens) -> Result<(), NetError> {
        self.insert_node(id.into(), Node::place(tokens))
    }

    pub fn add_transition(&mut self, id: impl Into<NodeId>) -> Result<(), NetError> {
        self.insert_node(id.into(), Node::transition())
    }

    /// 添加弧 source -> target。两端都必须已存在，权重至少为 1。
    /// 同一对节点之间允许重复添加（并行弧）。
    pub fn add_arc(
        &mut self,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        weight: Weight,
    ) -> Result<(), NetError> {
        let source = source.into();
        let target = target.into();
        if weight == 0 {
            return Err(NetError::ZeroWeight {
                from: source,
                to: target,
            });
        }
        if !self.nodes.contains_key(&target) {
            return Err(NetError::UnknownNode(target));
        }
        let Some(node) = self.nodes.get_mut(&source) else {
            return Err(NetError::UnknownNode(source));
        };
        node.outputs.push(OutArc::new(target, weight));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// The stored id equal to `id`.
    pub fn node_id(&self, id: &str) -> Option<&NodeId> {
        self.nodes.get_key_value(id).map(|(key, _)| key)
    }

    pub fn kind(&self, id: &str) -> Option<NodeKind> {
        self.node(id).map(|node| node.kind)
    }

    pub fn is_place(&self, id: &str) -> bool {
        self.kind(id).is_some_and(NodeKind::is_place)
    }

    pub fn is_transition(&self, id: &str) -> bool {
        self.kind(id).is_some_and(NodeKind::is_transition)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &Node)> {
        self.nodes.iter()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub fn places(&self) -> impl Iterator<Item = (&NodeId, &Node)> {
        self.nodes.iter().filter(|(_, node)| node.kind.is_place())
    }

    pub fn transitions(&self) -> impl Iterator<Item = (&NodeId, &Node)> {
        self.nodes.iter().filter(|(_, node)| node.kind.is_transition())
    }

    /// Position of `id` in iteration order.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.get_index_of(id)
    }

    pub fn id_at(&self, index: usize) -> Option<&NodeId> {
        self.nodes.get_index(index).map(|(id, _)| id)
    }

    pub fn arcs(&self) -> impl Iterator<Item = Arc> + '_ {
        self.nodes.iter().flat_map(|(source, node)| {
            node.outputs.iter().map(move |arc| Arc {
                source: source.clone(),
                target: arc.target.clone(),
                weight: arc.weight,
            })
        })
    }

    pub fn arc_count(&self) -> usize {
        self.nodes.values().map(|node| node.outputs.len()).sum()
    }

    pub fn successors<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a NodeId> + use<'a> {
        self.node(id)
            .into_iter()
            .flat_map(|node| node.outputs.iter().map(|arc| &arc.target))
    }

    /// Nodes with at least one arc into `id`, each listed once.
    pub fn predecessors<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a NodeId> + 'a {
        self.nodes
            .iter()
            .filter(move |(_, node)| node.outputs.iter().any(|arc| arc.target.as_str() == id))
            .map(|(source, _)| source)
    }

    pub fn out_degree(&self, id: &str) -> usize {
        self.node(id).map_or(0, |node| node.outputs.len())
    }

    /// Number of arcs ending in `id`, parallel arcs counted separately.
    pub fn in_degree(&self, id: &str) -> usize {
        self.nodes
            .values()
            .flat_map(|node| node.outputs.iter())
            .filter(|arc| arc.target.as_str() == id)
            .count()
    }

    pub fn tokens(&self, id: &str) -> Option<Tokens> {
        self.node(id).map(|node| node.tokens)
    }

    pub fn set_tokens(&mut self, id: &str, tokens: Tokens) -> Result<(), NetError> {
        match self.nodes.get_mut(id) {
            Some(node) if node.kind.is_place() => {
                node.tokens = tokens;
                Ok(())
            }
            Some(_) => Err(NetError::NotAPlace(NodeId::from(id))),
            None => Err(NetError::UnknownNode(NodeId::from(id))),
        }
    }

    pub(crate) fn tokens_mut(&mut self, id: &str) -> Option<&mut Tokens> {
        self.nodes.get_mut(id).map(|node| &mut node.tokens)
    }

    /// Snapshot of the current token counts of every place.
    pub fn initial_marking(&self) -> Marking {
        self.places()
            .map(|(id, node)| (id.clone(), node.tokens))
            .collect()
    }

    /// Copy of this network whose places carry the counts of `marking`.
    /// Places absent from `marking` are emptied.
    pub fn with_marking(&self, marking: &Marking) -> Network {
        let mut net = self.clone();
        net.apply_marking(marking);
        net
    }

    /// Writes the token counts of `marking` back into this network.
    pub fn apply_marking(&mut self, marking: &Marking) {
        for (id, node) in self.nodes.iter_mut() {
            if node.kind.is_place() {
                node.tokens = marking.tokens(id.as_str());
            }
        }
    }
}

/// One line per node: `key: [tokens, [dest, weight], ...]`. Sinks print only
/// their token count.
impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, node) in &self.nodes {
            if node.is_sink() {
                writeln!(f, "{}: [{}]", id, node.tokens)?;
            } else {
                let arcs = node
                    .outputs
                    .iter()
                    .map(|arc| format!("[{}, {}]", arc.target, arc.weight))
                    .join(", ");
                writeln!(f, "{}: [{}, {}]", id, node.tokens, arcs)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// E1(5) -2-> T1 -> {E2, E4} -2,2-> T2 -> {E3, E5}
    pub(crate) fn canonical_net() -> Network {
        let mut net = Network::new();
        net.add_place("E1", 5).unwrap();
        net.add_transition("T1").unwrap();
        net.add_place("E2", 0).unwrap();
        net.add_place("E4", 0).unwrap();
        net.add_transition("T2").unwrap();
        net.add_place("E3", 0).unwrap();
        net.add_place("E5", 0).unwrap();

        net.add_arc("E1", "T1", 2).unwrap();
        net.add_arc("T1", "E2", 1).unwrap();
        net.add_arc("T1", "E4", 1).unwrap();
        net.add_arc("E2", "T2", 2).unwrap();
        net.add_arc("E4", "T2", 2).unwrap();
        net.add_arc("T2", "E3", 1).unwrap();
        net.add_arc("T2", "E5", 1).unwrap();
        net
    }

    #[test]
    fn construction_rejects_bad_input() {
        let mut net = Network::new();
        net.add_place("p", 0).unwrap();
        net.add_transition("t").unwrap();

        assert_eq!(
            net.add_place("p", 1),
            Err(NetError::DuplicateNode(NodeId::from("p")))
        );
        assert_eq!(
            net.add_arc("p", "x", 1),
            Err(NetError::UnknownNode(NodeId::from("x")))
        );
        assert!(matches!(
            net.add_arc("p", "t", 0),
            Err(NetError::ZeroWeight { .. })
        ));
        assert_eq!(
            net.set_tokens("t", 3),
            Err(NetError::NotAPlace(NodeId::from("t")))
        );
        // same-kind arcs are a validation concern, not a construction error
        net.add_place("q", 0).unwrap();
        assert!(net.add_arc("p", "q", 1).is_ok());
    }

    #[test]
    fn degrees_and_neighbours() {
        let net = canonical_net();
        assert_eq!(net.len(), 7);
        assert_eq!(net.arc_count(), 7);
        assert_eq!(net.in_degree("T2"), 2);
        assert_eq!(net.out_degree("T2"), 2);
        assert_eq!(net.in_degree("E1"), 0);
        assert_eq!(
            net.predecessors("T2").map(NodeId::as_str).collect::<Vec<_>>(),
            vec!["E2", "E4"]
        );
        assert_eq!(
            net.successors("T1").map(NodeId::as_str).collect::<Vec<_>>(),
            vec!["E2", "E4"]
        );
    }

    #[test]
    fn marking_is_detached_snapshot() {
        let mut net = canonical_net();
        let marking = net.initial_marking();
        net.set_tokens("E1", 0).unwrap();

        assert_eq!(marking.tokens("E1"), 5);
        assert_eq!(marking.len(), 5);
        assert_eq!(net.with_marking(&marking).tokens("E1"), Some(5));
    }

    #[test]
    fn dump_follows_insertion_order() {
        let net = canonical_net();
        let dump = net.to_string();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines[0], "E1: [5, [T1, 2]]");
        assert_eq!(lines[1], "T1: [0, [E2, 1], [E4, 1]]");
        assert_eq!(lines[5], "E3: [0]");
        assert_eq!(lines.len(), 7);
    }
}
