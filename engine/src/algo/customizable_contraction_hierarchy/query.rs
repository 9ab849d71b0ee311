//! Batched elimination tree queries.
//!
//! `k` one-to-one queries are answered together. Each node visited by any of the searches
//! keeps a row of `k` tentative distances, one lane per query, so every arc is relaxed once for all lanes.
//! The forward searches visit the elimination tree ancestors of the sources, the backward searches
//! those of the targets. Shortest paths meet at the common ancestor minimizing the sum of both labels.

use super::*;
use crate::datastr::timestamped_vector::TimestampedVector;

/// Labels of one search direction for all lanes.
#[derive(Debug)]
struct LaneLabels {
    k: usize,
    // node major, `k` consecutive entries per node
    distances: Vec<Weight>,
    parent_arcs: Vec<EdgeId>,
    in_search_space: TimestampedVector<bool>,
    // ascending by rank after `init`
    nodes: Vec<NodeId>,
}

impl LaneLabels {
    fn new(n: usize, k: usize) -> Self {
        LaneLabels {
            k,
            distances: vec![INFINITY; n * k],
            parent_arcs: vec![EdgeId::MAX; n * k],
            in_search_space: TimestampedVector::new(n, false),
            nodes: Vec::new(),
        }
    }

    fn init(&mut self, roots: &[NodeId], elimination_tree: &[InRangeOption<NodeId>]) {
        let k = self.k;
        self.in_search_space.reset();
        self.nodes.clear();

        for &root in roots {
            let mut next = Some(root);
            while let Some(node) = next {
                // everything above was collected by an earlier lane
                if self.in_search_space[node as usize] {
                    break;
                }
                self.in_search_space.set(node as usize, true);
                self.nodes.push(node);
                self.distances[node as usize * k..(node as usize + 1) * k].fill(INFINITY);
                next = elimination_tree[node as usize].value();
            }
        }
        self.nodes.sort_unstable();

        for (lane, &root) in roots.iter().enumerate() {
            self.distances[root as usize * k + lane] = 0;
        }
    }

    fn relax(&mut self, cch: &CCH, weights: &[Weight]) {
        let LaneLabels {
            k,
            distances,
            parent_arcs,
            nodes,
            ..
        } = self;
        let k = *k;

        for &node in nodes.iter() {
            let node = node as usize;
            for arc in cch.neighbor_edge_indices_usize(node as NodeId) {
                let weight = weights[arc];
                if weight >= INFINITY {
                    continue;
                }
                let head = cch.head()[arc] as usize;
                debug_assert!(head > node);

                let (below, above) = distances.split_at_mut(head * k);
                let tail_distances = &below[node * k..(node + 1) * k];
                let head_distances = &mut above[..k];
                let head_parents = &mut parent_arcs[head * k..(head + 1) * k];

                for ((&tail_distance, head_distance), parent) in tail_distances.iter().zip(head_distances.iter_mut()).zip(head_parents.iter_mut()) {
                    let distance = tail_distance + weight;
                    if distance < *head_distance {
                        *head_distance = distance;
                        *parent = arc as EdgeId;
                    }
                }
            }
        }
    }

    fn distance(&self, node: NodeId, lane: usize) -> Weight {
        self.distances[node as usize * self.k + lane]
    }

    /// Arcs of the search tree of `lane` from `node` back to `root`.
    fn arcs_to_root<'s>(&'s self, cch: &'s CCH, lane: usize, node: NodeId, root: NodeId) -> impl Iterator<Item = EdgeId> + 's {
        let mut node = node;
        std::iter::from_fn(move || {
            if node == root {
                return None;
            }
            let arc = self.parent_arcs[node as usize * self.k + lane];
            node = cch.tail()[arc as usize];
            Some(arc)
        })
    }
}

/// Query algorithm for up to `k` simultaneous queries on a customized CCH.
/// Node ids passed in are input ids, everything internal is in rank space.
#[derive(Debug)]
pub struct BatchedQuery<'a> {
    cch: &'a CCH,
    metric: &'a CustomizedMetric,
    forward: LaneLabels,
    backward: LaneLabels,
    sources: Vec<NodeId>,
    targets: Vec<NodeId>,
    meeting_nodes: Vec<NodeId>,
    distances: Vec<Weight>,
}

impl<'a> BatchedQuery<'a> {
    pub fn new(cch: &'a CCH, metric: &'a CustomizedMetric, k: usize) -> Self {
        assert!(k > 0, "batch size must be positive");
        let n = cch.num_nodes();
        BatchedQuery {
            cch,
            metric,
            forward: LaneLabels::new(n, k),
            backward: LaneLabels::new(n, k),
            sources: Vec::with_capacity(k),
            targets: Vec::with_capacity(k),
            meeting_nodes: Vec::with_capacity(k),
            distances: Vec::with_capacity(k),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.forward.k
    }

    /// Answer the queries, one lane per query.
    pub fn run(&mut self, queries: &[Query]) {
        assert!(queries.len() <= self.batch_size(), "more queries than lanes");
        let order = self.cch.node_order();
        self.sources.clear();
        self.sources.extend(queries.iter().map(|query| order.rank(query.from)));
        self.targets.clear();
        self.targets.extend(queries.iter().map(|query| order.rank(query.to)));

        self.forward.init(&self.sources, self.cch.elimination_tree());
        self.backward.init(&self.targets, self.cch.elimination_tree());
        self.forward.relax(self.cch, &self.metric.upward);
        self.backward.relax(self.cch, &self.metric.downward);

        self.distances.clear();
        self.distances.resize(queries.len(), INFINITY);
        self.meeting_nodes.clear();
        self.meeting_nodes.extend_from_slice(&self.targets);

        for &node in &self.backward.nodes {
            if !self.forward.in_search_space[node as usize] {
                continue;
            }
            for lane in 0..queries.len() {
                let distance = self.forward.distance(node, lane) + self.backward.distance(node, lane);
                if distance < self.distances[lane] {
                    self.distances[lane] = distance;
                    self.meeting_nodes[lane] = node;
                }
            }
        }
    }

    /// Distance of the query in `lane`, `None` if the target is unreachable.
    pub fn distance(&self, lane: usize) -> Option<Weight> {
        Some(self.distances[lane]).filter(|&distance| distance < INFINITY)
    }

    /// Add `volume` to the CCH arcs on the path of `lane`.
    /// `flows` holds the upward direction of all arcs followed by the downward direction.
    pub fn add_flow(&self, lane: usize, volume: f64, flows: &mut [f64]) {
        if self.distance(lane).is_none() {
            return;
        }
        let (upward_flows, downward_flows) = flows.split_at_mut(self.cch.num_arcs());
        let meeting_node = self.meeting_nodes[lane];
        for arc in self.forward.arcs_to_root(self.cch, lane, meeting_node, self.sources[lane]) {
            upward_flows[arc as usize] += volume;
        }
        for arc in self.backward.arcs_to_root(self.cch, lane, meeting_node, self.targets[lane]) {
            downward_flows[arc as usize] += volume;
        }
    }

    /// The input edges on the path of `lane`, from source to target.
    pub fn path(&self, lane: usize, path: &mut Vec<EdgeId>) {
        path.clear();
        if self.distance(lane).is_none() {
            return;
        }
        let meeting_node = self.meeting_nodes[lane];
        let mut up_arcs: Vec<EdgeId> = self.forward.arcs_to_root(self.cch, lane, meeting_node, self.sources[lane]).collect();
        up_arcs.reverse();
        for arc in up_arcs {
            self.metric.unpack_upward(arc, path);
        }
        for arc in self.backward.arcs_to_root(self.cch, lane, meeting_node, self.targets[lane]) {
            self.metric.unpack_downward(arc, path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::dijkstra::Server;

    //
    //      1 ---> 2
    //      ^      |
    //      |      v
    //      0 <--- 3 ---> 4      5
    //      |             ^
    //      +-------------+
    //
    fn network() -> (RoadNetwork, Vec<Weight>) {
        let edges: Vec<EdgeAttributes> = [(0, 1), (1, 2), (2, 3), (3, 0), (3, 4), (0, 4)]
            .iter()
            .map(|&(tail, head)| EdgeAttributes {
                tail,
                head,
                length: 1.0,
                capacity: 1.0,
                speed: 1.0,
            })
            .collect();
        (RoadNetwork::new(6, &edges), vec![2, 3, 1, 4, 1, 8])
    }

    #[test]
    fn lanes_match_dijkstra() {
        let (network, weights) = network();
        let cch = contract(&network, min_degree_order(&network));
        let metric = customize(&cch, &cch.map_input_edges(&network), &weights);
        let mut server = Server::new(&network, &weights);

        let mut query = BatchedQuery::new(&cch, &metric, 4);
        let mut expected_path = Vec::new();
        let mut path = Vec::new();
        for from in 0..6 {
            let queries: Vec<Query> = (0..4).map(|offset| Query { from, to: (from + offset + 1) % 6 }).collect();
            query.run(&queries);
            for (lane, q) in queries.iter().enumerate() {
                let expected = server.run(q.from, q.to, &mut expected_path);
                assert_eq!(query.distance(lane), expected, "{:?}", q);
                query.path(lane, &mut path);
                let length: Weight = path.iter().map(|&edge| weights[edge as usize]).sum();
                if let Some(distance) = expected {
                    assert_eq!(length, distance);
                    assert_eq!(network.tail(path[0]), q.from);
                    assert_eq!(network.head(*path.last().unwrap()), q.to);
                } else {
                    assert!(path.is_empty());
                }
            }
        }
    }

    #[test]
    fn flows_of_a_lane_reach_the_input_edges() {
        let (network, weights) = network();
        let cch = contract(&network, NodeOrder::identity(6));
        let metric = customize(&cch, &cch.map_input_edges(&network), &weights);
        let mut query = BatchedQuery::new(&cch, &metric, 2);
        query.run(&[Query { from: 1, to: 4 }, Query { from: 2, to: 2 }]);

        assert_eq!(query.distance(0), Some(5));
        assert_eq!(query.distance(1), Some(0));
        let mut path = vec![7];
        query.path(1, &mut path);
        assert!(path.is_empty());

        let mut flows = vec![0.0; 2 * cch.num_arcs()];
        query.add_flow(0, 2.0, &mut flows);
        query.add_flow(1, 5.0, &mut flows);
        let (upward, downward) = flows.split_at_mut(cch.num_arcs());
        let mut input_flows = vec![0.0; network.num_edges()];
        metric.propagate_flows(&cch, upward, downward, &mut input_flows);
        assert_eq!(input_flows, vec![0.0, 2.0, 2.0, 0.0, 2.0, 0.0]);
    }
}
