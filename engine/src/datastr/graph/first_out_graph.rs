use super::*;

/// Topology only adjacency array.
/// The outgoing arcs of node `v` are `first_out[v]..first_out[v + 1]`, arc ids are the positions in `head`.
#[derive(Debug, Clone)]
pub struct UnweightedFirstOutGraph<FirstOutContainer, HeadContainer> {
    first_out: FirstOutContainer,
    head: HeadContainer,
}

pub type UnweightedOwnedGraph = UnweightedFirstOutGraph<Vec<EdgeId>, Vec<NodeId>>;

impl<FirstOutContainer, HeadContainer> UnweightedFirstOutGraph<FirstOutContainer, HeadContainer>
where
    FirstOutContainer: AsRef<[EdgeId]>,
    HeadContainer: AsRef<[NodeId]>,
{
    pub fn new(first_out: FirstOutContainer, head: HeadContainer) -> Self {
        assert!(!first_out.as_ref().is_empty());
        assert_eq!(*first_out.as_ref().last().unwrap() as usize, head.as_ref().len());
        UnweightedFirstOutGraph { first_out, head }
    }

    pub fn first_out(&self) -> &[EdgeId] {
        self.first_out.as_ref()
    }

    pub fn head(&self) -> &[NodeId] {
        self.head.as_ref()
    }

    pub fn decompose(self) -> (FirstOutContainer, HeadContainer) {
        (self.first_out, self.head)
    }
}

impl UnweightedOwnedGraph {
    pub fn from_adjacency_lists(adjacency_lists: Vec<Vec<NodeId>>) -> Self {
        let first_out = degrees_to_first_out(adjacency_lists.iter().map(|neighbors| neighbors.len() as EdgeId));
        let head = adjacency_lists.into_iter().flatten().collect();
        Self::new(first_out, head)
    }
}

impl<FirstOutContainer, HeadContainer> Graph for UnweightedFirstOutGraph<FirstOutContainer, HeadContainer>
where
    FirstOutContainer: AsRef<[EdgeId]>,
    HeadContainer: AsRef<[NodeId]>,
{
    fn num_nodes(&self) -> usize {
        self.first_out().len() - 1
    }

    fn num_arcs(&self) -> usize {
        self.head().len()
    }

    fn degree(&self, node: NodeId) -> usize {
        let range = self.neighbor_edge_indices_usize(node);
        range.end - range.start
    }
}

impl<FirstOutContainer, HeadContainer> EdgeRangeGraph for UnweightedFirstOutGraph<FirstOutContainer, HeadContainer>
where
    FirstOutContainer: AsRef<[EdgeId]>,
    HeadContainer: AsRef<[NodeId]>,
{
    #[inline(always)]
    fn neighbor_edge_indices(&self, node: NodeId) -> Range<EdgeId> {
        self.first_out()[node as usize]..self.first_out()[node as usize + 1]
    }
}

impl<FirstOutContainer, HeadContainer> LinkIterable<NodeIdT> for UnweightedFirstOutGraph<FirstOutContainer, HeadContainer>
where
    FirstOutContainer: AsRef<[EdgeId]>,
    HeadContainer: AsRef<[NodeId]>,
{
    type Iter<'a> = std::iter::Map<std::slice::Iter<'a, NodeId>, fn(&NodeId) -> NodeIdT> where Self: 'a;

    #[inline]
    fn link_iter(&self, node: NodeId) -> Self::Iter<'_> {
        self.head()[self.neighbor_edge_indices_usize(node)].iter().map(|&head| NodeIdT(head))
    }
}

/// The reversal of a graph where each reversed arc keeps the id of the arc it was created from.
/// Incoming arcs of each node are sorted by tail.
#[derive(Debug, Clone)]
pub struct ReversedGraphWithEdgeIds {
    first_out: Vec<EdgeId>,
    tail: Vec<NodeId>,
    edge_ids: Vec<EdgeId>,
}

impl ReversedGraphWithEdgeIds {
    pub fn reversed<G: LinkIterable<NodeIdT> + EdgeRangeGraph>(graph: &G) -> Self {
        let mut incoming: Vec<Vec<(NodeId, EdgeId)>> = vec![Vec::new(); graph.num_nodes()];
        for node in 0..graph.num_nodes() as NodeId {
            for (NodeIdT(head), edge) in graph.link_iter(node).zip(graph.neighbor_edge_indices(node)) {
                incoming[head as usize].push((node, edge));
            }
        }

        let first_out = degrees_to_first_out(incoming.iter().map(|arcs| arcs.len() as EdgeId));
        let (tail, edge_ids) = incoming
            .into_iter()
            .flat_map(|mut arcs| {
                arcs.sort_unstable();
                arcs
            })
            .unzip();

        ReversedGraphWithEdgeIds { first_out, tail, edge_ids }
    }
}

impl Graph for ReversedGraphWithEdgeIds {
    fn num_nodes(&self) -> usize {
        self.first_out.len() - 1
    }

    fn num_arcs(&self) -> usize {
        self.tail.len()
    }

    fn degree(&self, node: NodeId) -> usize {
        (self.first_out[node as usize + 1] - self.first_out[node as usize]) as usize
    }
}

impl LinkIterable<(NodeIdT, EdgeIdT)> for ReversedGraphWithEdgeIds {
    #[allow(clippy::type_complexity)]
    type Iter<'a> = std::iter::Map<std::iter::Zip<std::slice::Iter<'a, NodeId>, std::slice::Iter<'a, EdgeId>>, fn((&NodeId, &EdgeId)) -> (NodeIdT, EdgeIdT)>
    where
        Self: 'a;

    #[inline]
    fn link_iter(&self, node: NodeId) -> Self::Iter<'_> {
        let range = self.first_out[node as usize] as usize..self.first_out[node as usize + 1] as usize;
        self.tail[range.clone()]
            .iter()
            .zip(self.edge_ids[range].iter())
            .map(|(&tail, &edge)| (NodeIdT(tail), EdgeIdT(edge)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversal_keeps_edge_ids() {
        //
        //  0 --> 1 --> 2
        //  |           ^
        //  +-----------+
        //
        let graph = UnweightedOwnedGraph::from_adjacency_lists(vec![vec![1, 2], vec![2], vec![]]);
        assert_eq!(graph.num_arcs(), 3);
        assert_eq!(graph.first_out(), &[0, 2, 3, 3]);

        let reversed = ReversedGraphWithEdgeIds::reversed(&graph);
        assert_eq!(reversed.degree(0), 0);
        let into_two: Vec<_> = reversed.link_iter(2).collect();
        assert_eq!(into_two, vec![(NodeIdT(0), EdgeIdT(1)), (NodeIdT(1), EdgeIdT(2))]);
        assert_eq!(reversed.link_iter(1).collect::<Vec<_>>(), vec![(NodeIdT(0), EdgeIdT(0))]);
    }
}
