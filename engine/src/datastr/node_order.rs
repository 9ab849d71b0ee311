use crate::datastr::graph::*;

pub type Rank = NodeId;

/// A permutation of the nodes, accessible in both directions.
/// Rank 0 is the least important node which gets contracted first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOrder {
    // rank -> node
    node_order: Vec<NodeId>,
    // node -> rank
    ranks: Vec<Rank>,
}

impl NodeOrder {
    pub fn identity(n: usize) -> NodeOrder {
        NodeOrder {
            node_order: (0..n as NodeId).collect(),
            ranks: (0..n as Rank).collect(),
        }
    }

    /// Build from the nodes listed by ascending rank.
    /// Panics if `node_order` is not a permutation.
    pub fn from_node_order(node_order: Vec<NodeId>) -> NodeOrder {
        let n = node_order.len();
        assert!(n < NodeId::MAX as usize);
        let mut ranks = vec![n as Rank; n];
        for (rank, &node) in node_order.iter().enumerate() {
            assert!((node as usize) < n && ranks[node as usize] == n as Rank, "node order is not a permutation");
            ranks[node as usize] = rank as Rank;
        }
        NodeOrder { node_order, ranks }
    }

    /// Build from the rank of each node.
    pub fn from_ranks(ranks: Vec<Rank>) -> NodeOrder {
        let n = ranks.len();
        assert!(n < NodeId::MAX as usize);
        let mut node_order = vec![n as NodeId; n];
        for (node, &rank) in ranks.iter().enumerate() {
            assert!((rank as usize) < n && node_order[rank as usize] == n as NodeId, "ranks are not a permutation");
            node_order[rank as usize] = node as NodeId;
        }
        NodeOrder { node_order, ranks }
    }

    pub fn order(&self) -> &[NodeId] {
        &self.node_order
    }

    pub fn ranks(&self) -> &[Rank] {
        &self.ranks
    }

    pub fn rank(&self, node: NodeId) -> Rank {
        self.ranks[node as usize]
    }

    pub fn node(&self, rank: Rank) -> NodeId {
        self.node_order[rank as usize]
    }

    pub fn len(&self) -> usize {
        self.node_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_order.is_empty()
    }
}
