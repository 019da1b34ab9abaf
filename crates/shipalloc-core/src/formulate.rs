use std::collections::BTreeMap;

use log::{debug, info, warn};
use shipalloc_solver::{ConstraintOp, LpProblem, LpSolver, SolutionStatus};

use crate::aggregate::ShipmentTotals;
use crate::allocation::{Allocation, AllocationCell};
use crate::config::{AllocationConfig, ConfigError, ShareBounds};
use crate::error::Error;
use crate::shipment::{Mode, ShipmentRecord, Warehouse};

/// Slack when comparing summed share fractions against 1
const SHARE_EPSILON: f64 = 1e-9;
/// Allowed relative gap between reported and recomputed objective
const OBJECTIVE_DRIFT: f64 = 1e-6;

pub const TOTAL_WEIGHT_CONSTRAINT: &str = "total_weight";

pub fn min_share_constraint(mode: Mode) -> String {
    format!("min_{}_allocation", mode)
}

pub fn max_share_constraint(mode: Mode) -> String {
    format!("max_{}_allocation", mode)
}

pub fn capacity_constraint(warehouse: Warehouse) -> String {
    format!("capacity_{}", warehouse)
}

/// The allocation LP for one dataset.
///
/// One variable per (warehouse, mode) pair, warehouse-major: observed
/// warehouses in block order, then modelled modes in declaration order.
#[derive(Debug, Clone)]
pub struct AllocationModel {
    warehouses: Vec<Warehouse>,
    modes: Vec<Mode>,
    totals: ShipmentTotals,
    rates: BTreeMap<Mode, f64>,
    capacity_factor: f64,
    problem: LpProblem,
}

impl AllocationModel {
    /// Build the LP, failing before any solve if the model is invalid or
    /// provably infeasible.
    pub fn build(totals: &ShipmentTotals, config: &AllocationConfig) -> Result<Self, Error> {
        config.validate()?;

        let warehouses: Vec<Warehouse> = totals.warehouses().collect();
        if warehouses.is_empty() {
            return Err(ConfigError::NoWarehouses.into());
        }

        let total_kg = totals.total_kg;
        if !total_kg.is_finite() || total_kg < 0.0 {
            return Err(ConfigError::InvalidTotalWeight(total_kg).into());
        }

        config.cost_per_kg.validate_covers(totals.modes())?;
        let modes: Vec<Mode> = config.cost_per_kg.modes().collect();
        if modes.is_empty() {
            return Err(ConfigError::NoModes.into());
        }
        for &mode in &modes {
            if totals.mode_kg(mode) == 0.0 {
                warn!("Mode {} has no shipments in the data but is still allocated", mode);
            }
        }

        let mut rates = BTreeMap::new();
        let mut shares = Vec::with_capacity(modes.len());
        for &mode in &modes {
            rates.insert(mode, config.cost_per_kg.cost_per_kg(mode)?);
            shares.push((mode, config.share(mode)?));
        }

        check_shares(&shares)?;
        check_capacity(totals, config.capacity_factor)?;

        let variables: Vec<String> = warehouses
            .iter()
            .flat_map(|w| modes.iter().map(move |m| format!("weight_{}_{}", w, m)))
            .collect();
        let n = variables.len();
        let index = |wi: usize, mi: usize| wi * modes.len() + mi;

        let mut lp = LpProblem::new(variables);

        // Minimize total shipping cost
        let mut costs = vec![0.0; n];
        for wi in 0..warehouses.len() {
            for (mi, mode) in modes.iter().enumerate() {
                costs[index(wi, mi)] = rates[mode];
            }
        }
        lp.set_objective(costs, true);

        // Ship exactly the observed total
        lp.add_constraint(TOTAL_WEIGHT_CONSTRAINT, vec![1.0; n], ConstraintOp::Eq, total_kg);

        // Keep every mode inside its share band
        let mode_row = |mi: usize| {
            let mut row = vec![0.0; n];
            for wi in 0..warehouses.len() {
                row[index(wi, mi)] = 1.0;
            }
            row
        };
        for (mi, (mode, bounds)) in shares.iter().enumerate() {
            lp.add_constraint(min_share_constraint(*mode), mode_row(mi), ConstraintOp::Ge, bounds.min * total_kg);
        }
        for (mi, (mode, bounds)) in shares.iter().enumerate() {
            lp.add_constraint(max_share_constraint(*mode), mode_row(mi), ConstraintOp::Le, bounds.max * total_kg);
        }

        // Respect warehouse capacity
        for (wi, &warehouse) in warehouses.iter().enumerate() {
            let mut row = vec![0.0; n];
            for mi in 0..modes.len() {
                row[index(wi, mi)] = 1.0;
            }
            let capacity = config.capacity_factor * totals.warehouse_kg(warehouse);
            lp.add_constraint(capacity_constraint(warehouse), row, ConstraintOp::Le, capacity);
        }

        debug!(
            "Built allocation model: {} warehouses x {} modes, {} constraints, {:.3} kg",
            warehouses.len(),
            modes.len(),
            lp.num_constraints(),
            total_kg
        );

        Ok(Self {
            warehouses,
            modes,
            totals: totals.clone(),
            rates,
            capacity_factor: config.capacity_factor,
            problem: lp,
        })
    }

    pub fn problem(&self) -> &LpProblem {
        &self.problem
    }

    pub fn warehouses(&self) -> &[Warehouse] {
        &self.warehouses
    }

    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    pub fn variable_index(&self, warehouse: Warehouse, mode: Mode) -> Option<usize> {
        let wi = self.warehouses.iter().position(|&w| w == warehouse)?;
        let mi = self.modes.iter().position(|&m| m == mode)?;
        Some(wi * self.modes.len() + mi)
    }

    /// Hand the model to `solver` and turn an optimal solution into an
    /// [`Allocation`]. Any other outcome is an error; nothing is retried.
    pub fn solve<S: LpSolver + ?Sized>(&self, solver: &S) -> Result<Allocation, Error> {
        info!(
            "Solving allocation model ({} variables, {} constraints)",
            self.problem.num_variables(),
            self.problem.num_constraints()
        );

        let solution = solver
            .solve(&self.problem)
            .map_err(|e| Error::Model(format!("solver rejected the model: {}", e)))?;

        match solution.status {
            SolutionStatus::Optimal => {}
            SolutionStatus::Infeasible => {
                return Err(Error::InfeasibleModel(
                    "no allocation satisfies every constraint".to_string(),
                ));
            }
            SolutionStatus::Unbounded => {
                return Err(Error::Model("solver reported an unbounded objective".to_string()));
            }
            SolutionStatus::IterationLimit => {
                return Err(Error::Model(format!(
                    "solver stopped after {} pivots without proving optimality",
                    solution.iterations
                )));
            }
        }

        if solution.values.len() != self.problem.num_variables() {
            return Err(Error::Model(format!(
                "solver returned {} values for {} variables",
                solution.values.len(),
                self.problem.num_variables()
            )));
        }
        self.verify(&solution.values, solution.objective_value, solver.tolerance())?;

        let cells = self
            .warehouses
            .iter()
            .flat_map(|&warehouse| self.modes.iter().map(move |&mode| (warehouse, mode)))
            .zip(&solution.values)
            .map(|((warehouse, mode), &weight_kg)| AllocationCell {
                warehouse,
                mode,
                weight_kg,
            })
            .collect();

        info!(
            "Optimal allocation: total cost {:.2} after {} pivots",
            solution.objective_value, solution.iterations
        );

        Ok(Allocation {
            cells,
            total_cost: solution.objective_value,
            totals: self.totals.clone(),
            rates: self.rates.clone(),
            capacity_factor: self.capacity_factor,
            binding_constraints: solution.binding_constraints,
        })
    }

    /// Re-check a returned point against the model before anyone reports it
    fn verify(&self, values: &[f64], objective: f64, tolerance: f64) -> Result<(), Error> {
        let scale = 1.0 + self.problem.constraints.iter().map(|c| c.rhs.abs()).fold(0.0, f64::max);
        let violations = self.problem.check(values, tolerance * scale);
        if let Some(worst) = violations.first() {
            return Err(Error::Model(format!(
                "solution violates {} constraint(s); worst: {}",
                violations.len(),
                worst.description
            )));
        }

        let recomputed = self.problem.objective_value(values);
        if (recomputed - objective).abs() > OBJECTIVE_DRIFT * recomputed.abs().max(1.0) {
            return Err(Error::Model(format!(
                "reported objective {} differs from recomputed {}",
                objective, recomputed
            )));
        }

        Ok(())
    }
}

/// Aggregate, formulate and solve in one call
pub fn optimize<S: LpSolver + ?Sized>(
    records: &[ShipmentRecord],
    config: &AllocationConfig,
    solver: &S,
) -> Result<Allocation, Error> {
    let totals = ShipmentTotals::from_records(records)?;
    AllocationModel::build(&totals, config)?.solve(solver)
}

/// The equality forces shares to sum to exactly 1, which the bands must allow
fn check_shares(shares: &[(Mode, ShareBounds)]) -> Result<(), Error> {
    let min_sum: f64 = shares.iter().map(|(_, b)| b.min).sum();
    let max_sum: f64 = shares.iter().map(|(_, b)| b.max).sum();

    if min_sum > 1.0 + SHARE_EPSILON {
        return Err(Error::InfeasibleModel(format!(
            "minimum mode shares sum to {:.4}, more than the whole shipment",
            min_sum
        )));
    }
    if max_sum < 1.0 - SHARE_EPSILON {
        return Err(Error::InfeasibleModel(format!(
            "maximum mode shares sum to {:.4}, less than the whole shipment",
            max_sum
        )));
    }
    Ok(())
}

fn check_capacity(totals: &ShipmentTotals, capacity_factor: f64) -> Result<(), Error> {
    let observed: f64 = totals.by_warehouse.values().sum();
    let capacity = capacity_factor * observed;

    if capacity < totals.total_kg - SHARE_EPSILON * (1.0 + totals.total_kg) {
        return Err(Error::InfeasibleModel(format!(
            "warehouse capacity {:.3} kg cannot carry the total {:.3} kg",
            capacity, totals.total_kg
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipalloc_solver::{Solution, Solver, SolverError};

    /// Warehouse A ships 600 kg, B 400 kg
    fn scenario_totals() -> ShipmentTotals {
        let records = vec![
            ShipmentRecord::new(Warehouse::A, Mode::Flight, 350_000.0),
            ShipmentRecord::new(Warehouse::A, Mode::Ship, 250_000.0),
            ShipmentRecord::new(Warehouse::B, Mode::Road, 400_000.0),
        ];
        ShipmentTotals::from_records(&records).unwrap()
    }

    struct Scripted(Solution);

    impl LpSolver for Scripted {
        fn solve(&self, _problem: &LpProblem) -> Result<Solution, SolverError> {
            Ok(self.0.clone())
        }

        fn tolerance(&self) -> f64 {
            1e-9
        }
    }

    struct MustNotSolve;

    impl LpSolver for MustNotSolve {
        fn solve(&self, _problem: &LpProblem) -> Result<Solution, SolverError> {
            panic!("solver invoked for a model that should have been rejected");
        }

        fn tolerance(&self) -> f64 {
            1e-9
        }
    }

    #[test]
    fn test_model_shape() {
        let model = AllocationModel::build(&scenario_totals(), &AllocationConfig::default()).unwrap();
        let lp = model.problem();

        assert_eq!(lp.num_variables(), 6);
        // 1 total + 2 per mode + 1 per warehouse
        assert_eq!(lp.num_constraints(), 1 + 6 + 2);
        assert_eq!(lp.variables[0], "weight_A_Flight");
        assert_eq!(lp.variables[5], "weight_B_Road");
        assert_eq!(model.variable_index(Warehouse::B, Mode::Ship), Some(4));
        assert_eq!(model.variable_index(Warehouse::C, Mode::Ship), None);
        assert_eq!(lp.objective.coefficients, vec![20.0, 10.0, 5.0, 20.0, 10.0, 5.0]);
        assert!(lp.objective.minimize);

        let names: Vec<&str> = lp.constraints.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "total_weight",
                "min_Flight_allocation",
                "min_Ship_allocation",
                "min_Road_allocation",
                "max_Flight_allocation",
                "max_Ship_allocation",
                "max_Road_allocation",
                "capacity_A",
                "capacity_B",
            ]
        );

        let total = &lp.constraints[0];
        assert_eq!(total.op, ConstraintOp::Eq);
        assert!((total.rhs - 1000.0).abs() < 1e-9);

        let min_ship = &lp.constraints[2];
        assert_eq!(min_ship.coefficients, vec![0.0, 1.0, 0.0, 0.0, 1.0, 0.0]);
        assert!((min_ship.rhs - 200.0).abs() < 1e-9);

        let capacity_a = &lp.constraints[7];
        assert_eq!(capacity_a.op, ConstraintOp::Le);
        assert_eq!(capacity_a.coefficients, vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
        assert!((capacity_a.rhs - 660.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_warehouse_scenario_costs_9500() {
        let totals = scenario_totals();
        let allocation = AllocationModel::build(&totals, &AllocationConfig::default())
            .unwrap()
            .solve(&Solver::new())
            .unwrap();

        // 20% Flight, 30% Ship, 50% Road
        assert!((allocation.total_cost - 9500.0).abs() < 1e-6, "cost = {}", allocation.total_cost);
        assert!((allocation.mode_kg(Mode::Flight) - 200.0).abs() < 1e-6);
        assert!((allocation.mode_kg(Mode::Ship) - 300.0).abs() < 1e-6);
        assert!((allocation.mode_kg(Mode::Road) - 500.0).abs() < 1e-6);
        assert!((allocation.allocated_kg() - 1000.0).abs() < 1e-4);
        assert!(allocation.warehouse_kg(Warehouse::A) <= 660.0 + 1e-6);
        assert!(allocation.warehouse_kg(Warehouse::B) <= 440.0 + 1e-6);

        let recomputed: f64 = allocation.cells.iter().map(|c| allocation.cell_cost(c)).sum();
        assert!((recomputed - allocation.total_cost).abs() <= 1e-6 * allocation.total_cost);

        for name in ["total_weight", "min_Flight_allocation", "max_Road_allocation"] {
            assert!(
                allocation.binding_constraints.iter().any(|b| b == name),
                "{} should bind, binding = {:?}",
                name,
                allocation.binding_constraints
            );
        }
    }

    #[test]
    fn test_resolve_is_identical() {
        let model = AllocationModel::build(&scenario_totals(), &AllocationConfig::default()).unwrap();
        let first = model.solve(&Solver::new()).unwrap();
        let second = model.solve(&Solver::new()).unwrap();

        assert_eq!(first.total_cost, second.total_cost);
        assert_eq!(first.cells, second.cells);
    }

    #[test]
    fn test_overcommitted_minimum_shares_fail_before_solving() {
        let config = AllocationConfig::default().with_uniform_share(ShareBounds::new(0.4, 0.5));
        let model = AllocationModel::build(&scenario_totals(), &config);

        assert!(matches!(model, Err(Error::InfeasibleModel(_))));
        // Never gets far enough to need a solver
        assert!(model.and_then(|m| m.solve(&MustNotSolve)).is_err());
    }

    #[test]
    fn test_undercommitted_maximum_shares_fail_before_solving() {
        let config = AllocationConfig::default().with_uniform_share(ShareBounds::new(0.0, 0.3));
        assert!(matches!(
            AllocationModel::build(&scenario_totals(), &config),
            Err(Error::InfeasibleModel(_))
        ));
    }

    #[test]
    fn test_capacity_below_total_is_infeasible() {
        let config = AllocationConfig::default().with_capacity_factor(0.8);
        assert!(matches!(
            AllocationModel::build(&scenario_totals(), &config),
            Err(Error::InfeasibleModel(_))
        ));
    }

    #[test]
    fn test_data_mode_without_rate_is_config_error() {
        let mut config = AllocationConfig::default();
        config.cost_per_kg = crate::cost::CostModel::new([(Mode::Flight, 20.0), (Mode::Ship, 10.0)]).unwrap();

        let result = AllocationModel::build(&scenario_totals(), &config);

        assert!(matches!(result, Err(Error::Config(ConfigError::MissingModeCost(Mode::Road)))));
    }

    #[test]
    fn test_rate_for_absent_mode_still_gets_variables() {
        let records = vec![
            ShipmentRecord::new(Warehouse::C, Mode::Ship, 500_000.0),
            ShipmentRecord::new(Warehouse::D, Mode::Road, 500_000.0),
        ];
        let totals = ShipmentTotals::from_records(&records).unwrap();

        let allocation = AllocationModel::build(&totals, &AllocationConfig::default())
            .unwrap()
            .solve(&Solver::new())
            .unwrap();

        assert!((allocation.mode_kg(Mode::Flight) - 200.0).abs() < 1e-6);
        assert!((allocation.total_cost - 9500.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_warehouse_set() {
        let totals = ShipmentTotals {
            record_count: 0,
            total_kg: 0.0,
            by_warehouse: BTreeMap::new(),
            by_mode: BTreeMap::new(),
        };
        assert!(matches!(
            AllocationModel::build(&totals, &AllocationConfig::default()),
            Err(Error::Config(ConfigError::NoWarehouses))
        ));
    }

    #[test]
    fn test_negative_total_weight() {
        let mut totals = scenario_totals();
        totals.total_kg = -1.0;
        assert!(matches!(
            AllocationModel::build(&totals, &AllocationConfig::default()),
            Err(Error::Config(ConfigError::InvalidTotalWeight(_)))
        ));
    }

    #[test]
    fn test_solver_statuses_map_to_errors() {
        let model = AllocationModel::build(&scenario_totals(), &AllocationConfig::default()).unwrap();

        let infeasible = model.solve(&Scripted(Solution::infeasible(3)));
        assert!(matches!(infeasible, Err(Error::InfeasibleModel(_))));

        let unbounded = model.solve(&Scripted(Solution::unbounded(3)));
        assert!(matches!(unbounded, Err(Error::Model(_))));

        let stalled = model.solve(&Scripted(Solution::iteration_limit(10)));
        assert!(matches!(stalled, Err(Error::Model(_))));
    }

    #[test]
    fn test_backend_optimum_is_verified() {
        let model = AllocationModel::build(&scenario_totals(), &AllocationConfig::default()).unwrap();

        // Everything on Road breaks the 50% cap
        let bogus = vec![0.0, 0.0, 600.0, 0.0, 0.0, 400.0];
        let objective = model.problem().objective_value(&bogus);
        let result = model.solve(&Scripted(Solution::optimal(bogus, objective, Vec::new(), 1)));
        assert!(matches!(result, Err(Error::Model(ref msg)) if msg.contains("max_Road_allocation")));

        // Feasible point, but the reported objective drifted
        let valid = vec![200.0, 300.0, 100.0, 0.0, 0.0, 400.0];
        let result = model.solve(&Scripted(Solution::optimal(valid.clone(), 9000.0, Vec::new(), 1)));
        assert!(matches!(result, Err(Error::Model(_))));

        // Feasible point with honest objective passes through untouched
        let allocation = model
            .solve(&Scripted(Solution::optimal(valid, 9500.0, Vec::new(), 1)))
            .unwrap();
        assert_eq!(allocation.weight(Warehouse::A, Mode::Ship), 300.0);
        assert_eq!(allocation.weight(Warehouse::B, Mode::Road), 400.0);
    }

    #[test]
    fn test_wrong_value_count() {
        let model = AllocationModel::build(&scenario_totals(), &AllocationConfig::default()).unwrap();
        let result = model.solve(&Scripted(Solution::optimal(vec![1000.0], 5000.0, Vec::new(), 1)));
        assert!(matches!(result, Err(Error::Model(_))));
    }

    #[test]
    fn test_optimize_from_records() {
        let records = vec![
            ShipmentRecord::new(Warehouse::A, Mode::Flight, 600_000.0),
            ShipmentRecord::new(Warehouse::B, Mode::Road, 400_000.0),
        ];

        let allocation = optimize(&records, &AllocationConfig::default(), &Solver::new()).unwrap();

        assert!((allocation.total_cost - 9500.0).abs() < 1e-6);
    }
}
