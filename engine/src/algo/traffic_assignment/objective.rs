//! Objectives Frank-Wolfe minimizes over the feasible flows.
//!
//! The derivative of the objective with respect to the flow on an edge is the cost
//! the all-or-nothing assignment routes with.

use super::*;

pub trait ObjectiveFunction: Sync {
    type TravelCost: TravelCostFunction;

    fn travel_cost_function(&self) -> &Self::TravelCost;
    /// Objective value for the given flows, indexed by edge id.
    fn value(&self, flows: &[f64]) -> f64;
    fn derivative(&self, edge: EdgeId, flow: f64) -> f64;
    fn second_derivative(&self, edge: EdgeId, flow: f64) -> f64;
}

/// Each driver takes their individually fastest route (Wardrop's first principle).
/// The objective is the Beckmann function, the sum of the integrals of the edge costs.
#[derive(Debug, Clone, Copy)]
pub struct UserEquilibrium<C> {
    travel_cost: C,
}

impl<C: TravelCostFunction> UserEquilibrium<C> {
    pub fn new(travel_cost: C) -> Self {
        UserEquilibrium { travel_cost }
    }
}

impl<C: TravelCostFunction> ObjectiveFunction for UserEquilibrium<C> {
    type TravelCost = C;

    fn travel_cost_function(&self) -> &C {
        &self.travel_cost
    }

    fn value(&self, flows: &[f64]) -> f64 {
        flows
            .iter()
            .enumerate()
            .map(|(edge, &flow)| self.travel_cost.integral(edge as EdgeId, flow))
            .sum()
    }

    fn derivative(&self, edge: EdgeId, flow: f64) -> f64 {
        self.travel_cost.eval(edge, flow)
    }

    fn second_derivative(&self, edge: EdgeId, flow: f64) -> f64 {
        self.travel_cost.derivative(edge, flow)
    }
}

/// Minimal total travel time over all drivers (Wardrop's second principle).
#[derive(Debug, Clone, Copy)]
pub struct SystemOptimum<C> {
    travel_cost: C,
}

impl<C: TravelCostFunction> SystemOptimum<C> {
    pub fn new(travel_cost: C) -> Self {
        SystemOptimum { travel_cost }
    }
}

impl<C: TravelCostFunction> ObjectiveFunction for SystemOptimum<C> {
    type TravelCost = C;

    fn travel_cost_function(&self) -> &C {
        &self.travel_cost
    }

    fn value(&self, flows: &[f64]) -> f64 {
        total_travel_cost(&self.travel_cost, flows)
    }

    fn derivative(&self, edge: EdgeId, flow: f64) -> f64 {
        self.travel_cost.eval(edge, flow) + flow * self.travel_cost.derivative(edge, flow)
    }

    fn second_derivative(&self, edge: EdgeId, flow: f64) -> f64 {
        2.0 * self.travel_cost.derivative(edge, flow) + flow * self.travel_cost.second_derivative(edge, flow)
    }
}

/// Convex combination `alpha * system optimum + (1 - alpha) * user equilibrium`.
#[derive(Debug, Clone, Copy)]
pub struct CombinedEquilibrium<C> {
    alpha: f64,
    system_optimum: SystemOptimum<C>,
    user_equilibrium: UserEquilibrium<C>,
}

impl<C: TravelCostFunction + Clone> CombinedEquilibrium<C> {
    /// Panics unless `alpha` is in `[0, 1]`.
    pub fn new(travel_cost: C, alpha: f64) -> Self {
        assert!((0.0..=1.0).contains(&alpha), "combination parameter {} outside of [0, 1]", alpha);
        CombinedEquilibrium {
            alpha,
            system_optimum: SystemOptimum::new(travel_cost.clone()),
            user_equilibrium: UserEquilibrium::new(travel_cost),
        }
    }
}

impl<C: TravelCostFunction> ObjectiveFunction for CombinedEquilibrium<C> {
    type TravelCost = C;

    fn travel_cost_function(&self) -> &C {
        self.user_equilibrium.travel_cost_function()
    }

    fn value(&self, flows: &[f64]) -> f64 {
        self.alpha * self.system_optimum.value(flows) + (1.0 - self.alpha) * self.user_equilibrium.value(flows)
    }

    fn derivative(&self, edge: EdgeId, flow: f64) -> f64 {
        self.alpha * self.system_optimum.derivative(edge, flow) + (1.0 - self.alpha) * self.user_equilibrium.derivative(edge, flow)
    }

    fn second_derivative(&self, edge: EdgeId, flow: f64) -> f64 {
        self.alpha * self.system_optimum.second_derivative(edge, flow) + (1.0 - self.alpha) * self.user_equilibrium.second_derivative(edge, flow)
    }
}

/// Sum of flow times cost over all edges.
pub fn total_travel_cost<C: TravelCostFunction + ?Sized>(travel_cost: &C, flows: &[f64]) -> f64 {
    flows
        .iter()
        .enumerate()
        .map(|(edge, &flow)| flow * travel_cost.eval(edge as EdgeId, flow))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn network() -> RoadNetwork {
        let edge = |tail, head, capacity| EdgeAttributes {
            tail,
            head,
            length: 500.0,
            capacity,
            speed: 50.0,
        };
        RoadNetwork::new(3, &[edge(0, 1, 100.0), edge(1, 2, 300.0)])
    }

    #[test]
    fn user_equilibrium_routes_with_travel_costs() {
        let network = network();
        let bpr = BprFunction::new(&network, BprParams::default());
        let ue = UserEquilibrium::new(bpr);
        assert_relative_eq!(ue.derivative(0, 120.0), bpr.eval(0, 120.0));
        assert_relative_eq!(ue.second_derivative(1, 50.0), bpr.derivative(1, 50.0));
        assert_relative_eq!(ue.value(&[120.0, 40.0]), bpr.integral(0, 120.0) + bpr.integral(1, 40.0));
    }

    #[test]
    fn system_optimum_routes_with_marginal_costs() {
        let network = network();
        let bpr = BprFunction::new(&network, BprParams::default());
        let so = SystemOptimum::new(bpr);
        let flow = 150.0;
        assert_relative_eq!(so.derivative(0, flow), bpr.eval(0, flow) + flow * bpr.derivative(0, flow));
        assert!(so.derivative(0, flow) > bpr.eval(0, flow));
        assert_relative_eq!(so.value(&[flow, 0.0]), flow * bpr.eval(0, flow));
        assert_relative_eq!(so.value(&[flow, 0.0]), total_travel_cost(&bpr, &[flow, 0.0]));
    }

    #[test]
    fn combination_interpolates() {
        let network = network();
        let bpr = BprFunction::new(&network, BprParams::default());
        let flows = [80.0, 320.0];
        let pure_ue = CombinedEquilibrium::new(bpr, 0.0);
        let pure_so = CombinedEquilibrium::new(bpr, 1.0);
        let half = CombinedEquilibrium::new(bpr, 0.5);

        assert_relative_eq!(pure_ue.value(&flows), UserEquilibrium::new(bpr).value(&flows));
        assert_relative_eq!(pure_so.derivative(1, 320.0), SystemOptimum::new(bpr).derivative(1, 320.0));
        assert_relative_eq!(half.derivative(0, 80.0), 0.5 * (pure_ue.derivative(0, 80.0) + pure_so.derivative(0, 80.0)), max_relative = 1e-12);
        assert_relative_eq!(
            half.second_derivative(0, 80.0),
            0.5 * (pure_ue.second_derivative(0, 80.0) + pure_so.second_derivative(0, 80.0)),
            max_relative = 1e-12
        );
    }

    #[test]
    #[should_panic]
    fn combination_parameter_out_of_range() {
        let network = network();
        CombinedEquilibrium::new(BprFunction::new(&network, BprParams::default()), 1.5);
    }
}
