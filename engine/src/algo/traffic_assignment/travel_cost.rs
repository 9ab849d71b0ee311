//! Flow dependent travel costs of single edges.

use super::*;

/// The travel cost on an edge as a function of the flow on it.
/// Costs must be non decreasing in the flow, the line search relies on it.
pub trait TravelCostFunction: Sync {
    fn eval(&self, edge: EdgeId, flow: f64) -> f64;
    fn derivative(&self, edge: EdgeId, flow: f64) -> f64;
    fn second_derivative(&self, edge: EdgeId, flow: f64) -> f64;
    /// Integral of the cost from zero to `flow`.
    fn integral(&self, edge: EdgeId, flow: f64) -> f64;
}

/// Parameters of the Bureau of Public Roads function `t0 * (1 + alpha * (x / c)^beta)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BprParams {
    pub alpha: f64,
    pub beta: i32,
}

impl Default for BprParams {
    fn default() -> Self {
        BprParams { alpha: 0.15, beta: 4 }
    }
}

/// BPR costs in seconds on regular edges.
/// Demand edges (zero capacity) get the linear cost `length / 2 * x + speed` instead.
#[derive(Debug, Clone, Copy)]
pub struct BprFunction<'g> {
    network: &'g RoadNetwork,
    params: BprParams,
}

impl<'g> BprFunction<'g> {
    pub fn new(network: &'g RoadNetwork, params: BprParams) -> Self {
        assert!(params.beta >= 1, "BPR exponent must be at least one");
        assert!(params.alpha >= 0.0, "BPR factor must not be negative");
        BprFunction { network, params }
    }
}

impl<'g> TravelCostFunction for BprFunction<'g> {
    fn eval(&self, edge: EdgeId, flow: f64) -> f64 {
        if self.network.is_demand_edge(edge) {
            return self.network.length(edge) * flow * 0.5 + self.network.speed(edge);
        }
        let BprParams { alpha, beta } = self.params;
        let load = flow / self.network.capacity(edge);
        self.network.free_flow_time(edge) * (1.0 + alpha * load.powi(beta))
    }

    fn derivative(&self, edge: EdgeId, flow: f64) -> f64 {
        if self.network.is_demand_edge(edge) {
            return self.network.length(edge) * 0.5;
        }
        let BprParams { alpha, beta } = self.params;
        let capacity = self.network.capacity(edge);
        let load = flow / capacity;
        self.network.free_flow_time(edge) * alpha * beta as f64 * load.powi(beta - 1) / capacity
    }

    fn second_derivative(&self, edge: EdgeId, flow: f64) -> f64 {
        let BprParams { alpha, beta } = self.params;
        if self.network.is_demand_edge(edge) || beta < 2 {
            return 0.0;
        }
        let capacity = self.network.capacity(edge);
        let load = flow / capacity;
        self.network.free_flow_time(edge) * alpha * (beta * (beta - 1)) as f64 * load.powi(beta - 2) / (capacity * capacity)
    }

    fn integral(&self, edge: EdgeId, flow: f64) -> f64 {
        if self.network.is_demand_edge(edge) {
            return self.network.length(edge) * flow * flow * 0.25 + self.network.speed(edge) * flow;
        }
        let BprParams { alpha, beta } = self.params;
        let load = flow / self.network.capacity(edge);
        self.network.free_flow_time(edge) * flow * (1.0 + alpha * load.powi(beta) / (beta + 1) as f64)
    }
}

/// BPR up to `linearization_point` times the capacity, continued linearly beyond.
/// Keeps marginal costs moderate on heavily overloaded edges.
#[derive(Debug, Clone, Copy)]
pub struct ModifiedBprFunction<'g> {
    bpr: BprFunction<'g>,
    linearization_point: f64,
}

/// Parameters of `ModifiedBprFunction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModifiedBprParams {
    pub bpr: BprParams,
    pub linearization_point: f64,
}

impl Default for ModifiedBprParams {
    fn default() -> Self {
        ModifiedBprParams {
            bpr: BprParams::default(),
            linearization_point: 3.0,
        }
    }
}

impl<'g> ModifiedBprFunction<'g> {
    pub fn new(network: &'g RoadNetwork, params: ModifiedBprParams) -> Self {
        assert!(params.linearization_point >= 0.0, "linearization point must not be negative");
        ModifiedBprFunction {
            bpr: BprFunction::new(network, params.bpr),
            linearization_point: params.linearization_point,
        }
    }

    fn threshold(&self, edge: EdgeId) -> f64 {
        self.linearization_point * self.bpr.network.capacity(edge)
    }
}

impl<'g> TravelCostFunction for ModifiedBprFunction<'g> {
    fn eval(&self, edge: EdgeId, flow: f64) -> f64 {
        let threshold = self.threshold(edge);
        if flow <= threshold {
            self.bpr.eval(edge, flow)
        } else {
            self.bpr.eval(edge, threshold) + self.bpr.derivative(edge, threshold) * (flow - threshold)
        }
    }

    fn derivative(&self, edge: EdgeId, flow: f64) -> f64 {
        self.bpr.derivative(edge, flow.min(self.threshold(edge)))
    }

    fn second_derivative(&self, edge: EdgeId, flow: f64) -> f64 {
        if flow <= self.threshold(edge) {
            self.bpr.second_derivative(edge, flow)
        } else {
            0.0
        }
    }

    fn integral(&self, edge: EdgeId, flow: f64) -> f64 {
        let threshold = self.threshold(edge);
        if flow <= threshold {
            self.bpr.integral(edge, flow)
        } else {
            // exact for the linear part
            self.bpr.integral(edge, threshold) + (flow - threshold) * (self.eval(edge, threshold) + self.eval(edge, flow)) * 0.5
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn network() -> RoadNetwork {
        RoadNetwork::new(
            2,
            &[
                // 1km at 36km/h, 100s free flow
                EdgeAttributes {
                    tail: 0,
                    head: 1,
                    length: 1000.0,
                    capacity: 200.0,
                    speed: 36.0,
                },
                EdgeAttributes {
                    tail: 1,
                    head: 0,
                    length: 4.0,
                    capacity: 0.0,
                    speed: 10.0,
                },
            ],
        )
    }

    fn numeric_derivative(f: impl Fn(f64) -> f64, x: f64) -> f64 {
        let h = 1e-4 * x.max(1.0);
        (f(x + h) - f(x - h)) / (2.0 * h)
    }

    fn numeric_integral(f: impl Fn(f64) -> f64, upper: f64) -> f64 {
        let steps = 20000;
        let h = upper / steps as f64;
        (0..steps).map(|i| f((i as f64 + 0.5) * h) * h).sum()
    }

    #[test]
    fn bpr_values() {
        let network = network();
        let bpr = BprFunction::new(&network, BprParams::default());
        assert_relative_eq!(bpr.eval(0, 0.0), 100.0);
        assert_relative_eq!(bpr.eval(0, 200.0), 115.0);
        assert_relative_eq!(bpr.eval(0, 400.0), 100.0 * (1.0 + 0.15 * 16.0));
        assert_relative_eq!(bpr.derivative(0, 0.0), 0.0);
    }

    #[test]
    fn bpr_derivatives_and_integral_are_consistent() {
        let network = network();
        let bpr = BprFunction::new(&network, BprParams::default());
        for &flow in &[10.0, 150.0, 380.0] {
            assert_relative_eq!(bpr.derivative(0, flow), numeric_derivative(|x| bpr.eval(0, x), flow), max_relative = 1e-5);
            assert_relative_eq!(bpr.second_derivative(0, flow), numeric_derivative(|x| bpr.derivative(0, x), flow), max_relative = 1e-5);
            assert_relative_eq!(bpr.integral(0, flow), numeric_integral(|x| bpr.eval(0, x), flow), max_relative = 1e-6);
        }
    }

    #[test]
    fn demand_edges_are_linear() {
        let network = network();
        let bpr = BprFunction::new(&network, BprParams::default());
        assert_relative_eq!(bpr.eval(1, 0.0), 10.0);
        assert_relative_eq!(bpr.eval(1, 3.0), 16.0);
        assert_relative_eq!(bpr.derivative(1, 3.0), 2.0);
        assert_relative_eq!(bpr.second_derivative(1, 3.0), 0.0);
        assert_relative_eq!(bpr.integral(1, 3.0), numeric_integral(|x| bpr.eval(1, x), 3.0), max_relative = 1e-9);
    }

    #[test]
    fn modified_bpr_linearizes_beyond_threshold() {
        let network = network();
        let bpr = BprFunction::new(&network, BprParams::default());
        let modified = ModifiedBprFunction::new(&network, ModifiedBprParams::default());

        // below 3 * capacity both agree
        assert_relative_eq!(modified.eval(0, 500.0), bpr.eval(0, 500.0));
        assert_relative_eq!(modified.integral(0, 500.0), bpr.integral(0, 500.0));

        let threshold = 600.0;
        let slope = bpr.derivative(0, threshold);
        assert_relative_eq!(modified.eval(0, 800.0), bpr.eval(0, threshold) + slope * 200.0);
        assert_relative_eq!(modified.derivative(0, 800.0), slope);
        assert_relative_eq!(modified.second_derivative(0, 800.0), 0.0);
        assert!(modified.eval(0, 800.0) < bpr.eval(0, 800.0));
        assert_relative_eq!(modified.integral(0, 800.0), numeric_integral(|x| modified.eval(0, x), 800.0), max_relative = 1e-6);
    }

    #[test]
    fn linearization_point_is_per_instance() {
        let network = network();
        let early = ModifiedBprFunction::new(
            &network,
            ModifiedBprParams {
                linearization_point: 1.0,
                ..Default::default()
            },
        );
        let late = ModifiedBprFunction::new(&network, ModifiedBprParams::default());
        assert!(early.eval(0, 500.0) < late.eval(0, 500.0));
        assert_relative_eq!(early.derivative(0, 500.0), early.derivative(0, 200.0));
    }
}
