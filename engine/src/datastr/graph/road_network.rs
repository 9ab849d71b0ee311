use super::*;

/// Static attributes of an input edge as given in the network file.
/// Lengths are in meters, capacities in vehicles per hour and speeds in km/h.
/// Edges with zero capacity are demand edges whose travel cost grows linearly in the flow,
/// for them `speed` is the cost at zero flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeAttributes {
    pub tail: NodeId,
    pub head: NodeId,
    pub length: f64,
    pub capacity: f64,
    pub speed: f64,
}

/// The immutable input network.
///
/// Edge ids are the positions in the input edge list.
/// The forward adjacency array groups edges by tail and maps each arc back to its input edge.
/// The flow dependent state of the edges is kept by the solver, not in here.
#[derive(Debug, Clone)]
pub struct RoadNetwork {
    first_out: Vec<EdgeId>,
    adjacent_head: Vec<NodeId>,
    adjacent_edge: Vec<EdgeId>,
    tail: Vec<NodeId>,
    head: Vec<NodeId>,
    length: Vec<f64>,
    capacity: Vec<f64>,
    speed: Vec<f64>,
    free_flow_time: Vec<f64>,
}

impl RoadNetwork {
    /// Panics on edges with endpoints out of range, the input validation belongs to the importer.
    pub fn new(num_nodes: usize, edges: &[EdgeAttributes]) -> Self {
        assert!(num_nodes < NodeId::MAX as usize);
        assert!(edges.len() < EdgeId::MAX as usize);
        for edge in edges {
            assert!((edge.tail as usize) < num_nodes && (edge.head as usize) < num_nodes, "edge endpoint out of range: {:?}", edge);
        }

        let mut out_degrees = vec![0; num_nodes];
        for edge in edges {
            out_degrees[edge.tail as usize] += 1;
        }
        let first_out = degrees_to_first_out(out_degrees.into_iter());

        // counting sort by tail, stable so parallel edges keep their input order
        let mut next_slot: Vec<usize> = first_out[..num_nodes].iter().map(|&slot| slot as usize).collect();
        let mut adjacent_head = vec![0; edges.len()];
        let mut adjacent_edge = vec![0; edges.len()];
        for (edge_id, edge) in edges.iter().enumerate() {
            let slot = &mut next_slot[edge.tail as usize];
            adjacent_head[*slot] = edge.head;
            adjacent_edge[*slot] = edge_id as EdgeId;
            *slot += 1;
        }

        let free_flow_time = edges.iter().map(|edge| free_flow_time(edge.length, edge.speed)).collect();

        RoadNetwork {
            first_out,
            adjacent_head,
            adjacent_edge,
            tail: edges.iter().map(|edge| edge.tail).collect(),
            head: edges.iter().map(|edge| edge.head).collect(),
            length: edges.iter().map(|edge| edge.length).collect(),
            capacity: edges.iter().map(|edge| edge.capacity).collect(),
            speed: edges.iter().map(|edge| edge.speed).collect(),
            free_flow_time,
        }
    }

    pub fn num_edges(&self) -> usize {
        self.tail.len()
    }

    pub fn tail(&self, edge: EdgeId) -> NodeId {
        self.tail[edge as usize]
    }

    pub fn head(&self, edge: EdgeId) -> NodeId {
        self.head[edge as usize]
    }

    pub fn length(&self, edge: EdgeId) -> f64 {
        self.length[edge as usize]
    }

    pub fn capacity(&self, edge: EdgeId) -> f64 {
        self.capacity[edge as usize]
    }

    pub fn speed(&self, edge: EdgeId) -> f64 {
        self.speed[edge as usize]
    }

    /// Travel time in seconds on the empty edge.
    pub fn free_flow_time(&self, edge: EdgeId) -> f64 {
        self.free_flow_time[edge as usize]
    }

    pub fn is_demand_edge(&self, edge: EdgeId) -> bool {
        self.capacity[edge as usize] == 0.0
    }
}

fn free_flow_time(length: f64, speed: f64) -> f64 {
    if speed > 0.0 {
        3600.0 * (length / 1000.0) / speed
    } else {
        0.0
    }
}

impl Graph for RoadNetwork {
    fn num_nodes(&self) -> usize {
        self.first_out.len() - 1
    }

    fn num_arcs(&self) -> usize {
        self.adjacent_head.len()
    }

    fn degree(&self, node: NodeId) -> usize {
        let range = self.neighbor_edge_indices_usize(node);
        range.end - range.start
    }
}

/// Ranges are adjacency positions, map them to edge ids with the `(NodeIdT, EdgeIdT)` links.
impl EdgeRangeGraph for RoadNetwork {
    fn neighbor_edge_indices(&self, node: NodeId) -> Range<EdgeId> {
        self.first_out[node as usize]..self.first_out[node as usize + 1]
    }
}

impl LinkIterable<NodeIdT> for RoadNetwork {
    type Iter<'a> = std::iter::Map<std::slice::Iter<'a, NodeId>, fn(&NodeId) -> NodeIdT>;

    fn link_iter(&self, node: NodeId) -> Self::Iter<'_> {
        self.adjacent_head[self.neighbor_edge_indices_usize(node)].iter().map(|&head| NodeIdT(head))
    }
}

impl LinkIterable<(NodeIdT, EdgeIdT)> for RoadNetwork {
    #[allow(clippy::type_complexity)]
    type Iter<'a> = std::iter::Map<std::iter::Zip<std::slice::Iter<'a, NodeId>, std::slice::Iter<'a, EdgeId>>, fn((&NodeId, &EdgeId)) -> (NodeIdT, EdgeIdT)>;

    #[inline]
    fn link_iter(&self, node: NodeId) -> Self::Iter<'_> {
        let range = self.neighbor_edge_indices_usize(node);
        self.adjacent_head[range.clone()]
            .iter()
            .zip(self.adjacent_edge[range].iter())
            .map(|(&head, &edge)| (NodeIdT(head), EdgeIdT(edge)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(tail: NodeId, head: NodeId, length: f64) -> EdgeAttributes {
        EdgeAttributes {
            tail,
            head,
            length,
            capacity: 1000.0,
            speed: 36.0,
        }
    }

    #[test]
    fn adjacency_maps_back_to_input_edges() {
        let network = RoadNetwork::new(3, &[edge(1, 2, 100.0), edge(0, 1, 200.0), edge(1, 0, 300.0), edge(0, 2, 400.0)]);
        assert_eq!(network.num_nodes(), 3);
        assert_eq!(network.num_arcs(), 4);
        assert_eq!(network.degree(1), 2);

        let out_of_one: Vec<(NodeIdT, EdgeIdT)> = LinkIterable::<(NodeIdT, EdgeIdT)>::link_iter(&network, 1).collect();
        assert_eq!(out_of_one, vec![(NodeIdT(2), EdgeIdT(0)), (NodeIdT(0), EdgeIdT(2))]);
        let out_of_zero: Vec<NodeIdT> = LinkIterable::<NodeIdT>::link_iter(&network, 0).collect();
        assert_eq!(out_of_zero, vec![NodeIdT(1), NodeIdT(2)]);
        assert_eq!(network.tail(3), 0);
        assert_eq!(network.head(3), 2);
    }

    #[test]
    fn free_flow_time_in_seconds() {
        let network = RoadNetwork::new(2, &[edge(0, 1, 1000.0)]);
        // 1km at 36km/h
        assert!((network.free_flow_time(0) - 100.0).abs() < 1e-9);
        assert!(!network.is_demand_edge(0));
    }
}
