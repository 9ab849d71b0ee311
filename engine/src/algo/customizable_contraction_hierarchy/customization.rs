//! Metric dependent phase: weights for the chordal supergraph from the current edge costs.
//!
//! Each arc records how its weight came about, so paths and flows on the CCH can be mapped back to input edges.

use super::*;

/// How the weight of a CCH arc in one direction was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unpacking {
    /// No input edge and no lower triangle, the arc is unusable in this direction.
    None,
    /// The cheapest parallel input edge.
    Original(EdgeId),
    /// A lower triangle: first the `down` arc down to the middle node, then the `up` arc up again.
    Shortcut { down: EdgeId, up: EdgeId },
}

/// Customized weights of a `CCH`, one per arc and direction.
/// `upward` is the weight from tail to head (lower to higher rank), `downward` from head to tail.
#[derive(Debug, Clone)]
pub struct CustomizedMetric {
    pub upward: Vec<Weight>,
    pub downward: Vec<Weight>,
    upward_unpacking: Vec<Unpacking>,
    downward_unpacking: Vec<Unpacking>,
}

/// Basic customization, that is respecting the input weights and triangle relaxation bottom up.
/// Sufficient for elimination tree queries.
///
/// `input_arcs` and `weights` are both indexed by input edge id.
pub fn customize(cch: &CCH, input_arcs: &[InputArc], weights: &[Weight]) -> CustomizedMetric {
    assert_eq!(input_arcs.len(), weights.len());
    let m = cch.num_arcs();
    let n = cch.num_nodes();

    let mut upward = vec![INFINITY; m];
    let mut downward = vec![INFINITY; m];
    let mut upward_unpacking = vec![Unpacking::None; m];
    let mut downward_unpacking = vec![Unpacking::None; m];

    // of parallel edges, the cheapest wins, on ties the lowest id
    for (edge, (&arc, &weight)) in input_arcs.iter().zip(weights).enumerate() {
        let (arc_weights, unpacking, arc) = match arc {
            InputArc::Upward(arc) => (&mut upward, &mut upward_unpacking, arc as usize),
            InputArc::Downward(arc) => (&mut downward, &mut downward_unpacking, arc as usize),
            InputArc::Loop => continue,
        };
        if weight < arc_weights[arc] {
            arc_weights[arc] = weight;
            unpacking[arc] = Unpacking::Original(edge as EdgeId);
        }
    }

    // scratch space indexed by head rank, only valid for the upward neighbors of the current node
    let mut upward_workspace = vec![(INFINITY, Unpacking::None); n];
    let mut downward_workspace = vec![(INFINITY, Unpacking::None); n];

    for node in 0..n as NodeId {
        let arcs = cch.neighbor_edge_indices_usize(node);
        for arc in arcs.clone() {
            let head = cch.head()[arc] as usize;
            upward_workspace[head] = (upward[arc], upward_unpacking[arc]);
            downward_workspace[head] = (downward[arc], downward_unpacking[arc]);
        }

        // lower triangles (low, node, head) with low < node < head
        for (NodeIdT(low), EdgeIdT(first_arc)) in cch.inverted().link_iter(node) {
            let node_down_to_low = downward[first_arc as usize];
            let low_up_to_node = upward[first_arc as usize];

            for second_arc in cch.neighbor_edge_indices_usize(low).rev() {
                let head = cch.head()[second_arc];
                if head <= node {
                    break;
                }

                let via_low_up = node_down_to_low + upward[second_arc];
                if via_low_up < upward_workspace[head as usize].0 {
                    upward_workspace[head as usize] = (
                        via_low_up,
                        Unpacking::Shortcut {
                            down: first_arc,
                            up: second_arc as EdgeId,
                        },
                    );
                }

                let via_low_down = downward[second_arc] + low_up_to_node;
                if via_low_down < downward_workspace[head as usize].0 {
                    downward_workspace[head as usize] = (
                        via_low_down,
                        Unpacking::Shortcut {
                            down: second_arc as EdgeId,
                            up: first_arc,
                        },
                    );
                }
            }
        }

        for arc in arcs {
            let head = cch.head()[arc] as usize;
            (upward[arc], upward_unpacking[arc]) = upward_workspace[head];
            (downward[arc], downward_unpacking[arc]) = downward_workspace[head];
        }
    }

    CustomizedMetric {
        upward,
        downward,
        upward_unpacking,
        downward_unpacking,
    }
}

impl CustomizedMetric {
    /// Append the input edges the upward arc `arc` consists of to `path`.
    pub fn unpack_upward(&self, arc: EdgeId, path: &mut Vec<EdgeId>) {
        self.unpack(ArcDirection::Up(arc), path)
    }

    /// Append the input edges the downward arc `arc` consists of to `path`.
    pub fn unpack_downward(&self, arc: EdgeId, path: &mut Vec<EdgeId>) {
        self.unpack(ArcDirection::Down(arc), path)
    }

    fn unpack(&self, arc: ArcDirection, path: &mut Vec<EdgeId>) {
        let mut stack = vec![arc];
        while let Some(arc) = stack.pop() {
            match self.unpacking(arc) {
                Unpacking::Original(edge) => path.push(edge),
                Unpacking::Shortcut { down, up } => {
                    stack.push(ArcDirection::Up(up));
                    stack.push(ArcDirection::Down(down));
                }
                Unpacking::None => panic!("unpacking {:?} which has no finite weight", arc),
            }
        }
    }

    fn unpacking(&self, arc: ArcDirection) -> Unpacking {
        match arc {
            ArcDirection::Up(arc) => self.upward_unpacking[arc as usize],
            ArcDirection::Down(arc) => self.downward_unpacking[arc as usize],
        }
    }

    /// Push flow on CCH arcs down to the input edges.
    ///
    /// Arcs are processed by descending tail rank. Both halves of a shortcut have a lower tail than the shortcut itself,
    /// so all flow has arrived on an arc before it is passed on.
    /// Flows on the input edges get added to `input_flows`, the arc flows are consumed.
    pub fn propagate_flows(&self, cch: &CCH, upward_flows: &mut [f64], downward_flows: &mut [f64], input_flows: &mut [f64]) {
        assert_eq!(upward_flows.len(), cch.num_arcs());
        assert_eq!(downward_flows.len(), cch.num_arcs());

        for node in (0..cch.num_nodes() as NodeId).rev() {
            for arc in cch.neighbor_edge_indices_usize(node) {
                let flow = std::mem::take(&mut upward_flows[arc]);
                self.pass_on(self.upward_unpacking[arc], flow, upward_flows, downward_flows, input_flows);
                let flow = std::mem::take(&mut downward_flows[arc]);
                self.pass_on(self.downward_unpacking[arc], flow, upward_flows, downward_flows, input_flows);
            }
        }
    }

    fn pass_on(&self, unpacking: Unpacking, flow: f64, upward_flows: &mut [f64], downward_flows: &mut [f64], input_flows: &mut [f64]) {
        if flow == 0.0 {
            return;
        }
        match unpacking {
            Unpacking::Original(edge) => {
                assert!((edge as usize) < input_flows.len(), "flow on invalid edge {}", edge);
                input_flows[edge as usize] += flow;
            }
            Unpacking::Shortcut { down, up } => {
                downward_flows[down as usize] += flow;
                upward_flows[up as usize] += flow;
            }
            Unpacking::None => panic!("flow {} on an arc without finite weight", flow),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ArcDirection {
    Up(EdgeId),
    Down(EdgeId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_shortcut_replaces_expensive_edge() {
        // 0 -> 1 -> 2 costs 2, the direct edge 0 -> 2 costs 5, 2 -> 0 is a single expensive edge
        let edges: Vec<EdgeAttributes> = [(0, 1), (1, 2), (0, 2), (2, 0), (0, 2)]
            .iter()
            .map(|&(tail, head)| EdgeAttributes {
                tail,
                head,
                length: 1.0,
                capacity: 1.0,
                speed: 1.0,
            })
            .collect();
        let network = RoadNetwork::new(3, &edges);
        let weights = vec![1, 1, 5, 9, 5];

        // node 1 lowest, so 0 - 2 is the triangle's upper arc
        let order = NodeOrder::from_node_order(vec![1, 0, 2]);
        let cch = contract(&network, order);
        let input_arcs = cch.map_input_edges(&network);
        let metric = customize(&cch, &input_arcs, &weights);

        let arc = cch.edge_index(1, 2).unwrap();
        assert_eq!(metric.upward[arc as usize], 2);
        assert_eq!(metric.downward[arc as usize], 9);

        let mut path = Vec::new();
        metric.unpack_upward(arc, &mut path);
        assert_eq!(path, vec![0, 1]);
        path.clear();
        metric.unpack_downward(arc, &mut path);
        assert_eq!(path, vec![3]);

        let mut upward_flows = vec![0.0; cch.num_arcs()];
        let mut downward_flows = vec![0.0; cch.num_arcs()];
        let mut input_flows = vec![0.0; network.num_edges()];
        upward_flows[arc as usize] = 3.0;
        downward_flows[arc as usize] = 1.5;
        metric.propagate_flows(&cch, &mut upward_flows, &mut downward_flows, &mut input_flows);
        assert_eq!(input_flows, vec![3.0, 3.0, 0.0, 1.5, 0.0]);
    }

    #[test]
    fn parallel_edges_keep_lowest_id_on_ties() {
        let edges: Vec<EdgeAttributes> = [(0, 1), (0, 1), (0, 1)]
            .iter()
            .map(|&(tail, head)| EdgeAttributes {
                tail,
                head,
                length: 1.0,
                capacity: 1.0,
                speed: 1.0,
            })
            .collect();
        let network = RoadNetwork::new(2, &edges);
        let cch = contract(&network, NodeOrder::identity(2));
        let metric = customize(&cch, &cch.map_input_edges(&network), &[4, 3, 3]);
        let mut path = Vec::new();
        metric.unpack_upward(0, &mut path);
        assert_eq!(path, vec![1]);
        assert_eq!(metric.downward[0], INFINITY);
    }
}
