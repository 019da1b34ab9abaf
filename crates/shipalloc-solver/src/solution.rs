/// The result of solving an LP problem
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Optimal values for each variable (empty unless optimal)
    pub values: Vec<f64>,
    /// Optimal objective value
    pub objective_value: f64,
    /// Constraints that hold with equality at the optimum
    pub binding_constraints: Vec<String>,
    /// Simplex pivots performed across both phases
    pub iterations: usize,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The problem is unbounded
    Unbounded,
    /// The pivot budget ran out before optimality was proven
    IterationLimit,
}

impl Solution {
    pub fn optimal(values: Vec<f64>, objective_value: f64, binding_constraints: Vec<String>, iterations: usize) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            values,
            objective_value,
            binding_constraints,
            iterations,
        }
    }

    pub fn infeasible(iterations: usize) -> Self {
        Self::without_values(SolutionStatus::Infeasible, f64::INFINITY, iterations)
    }

    pub fn unbounded(iterations: usize) -> Self {
        Self::without_values(SolutionStatus::Unbounded, f64::NEG_INFINITY, iterations)
    }

    pub fn iteration_limit(iterations: usize) -> Self {
        Self::without_values(SolutionStatus::IterationLimit, f64::NAN, iterations)
    }

    fn without_values(status: SolutionStatus, objective_value: f64, iterations: usize) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective_value,
            binding_constraints: Vec::new(),
            iterations,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }
}
