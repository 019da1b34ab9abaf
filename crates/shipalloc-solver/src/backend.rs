use crate::error::SolverError;
use crate::problem::LpProblem;
use crate::solution::Solution;

/// Anything that can take an [`LpProblem`] to a [`Solution`].
///
/// Callers depend only on the returned [`SolutionStatus`](crate::SolutionStatus),
/// never on how a backend reaches it. `Err` is reserved for problems that are
/// malformed (dimension mismatches, NaN coefficients); infeasible and unbounded
/// models are reported through the status instead.
pub trait LpSolver {
    fn solve(&self, problem: &LpProblem) -> Result<Solution, SolverError>;

    /// Absolute tolerance the backend uses for feasibility checks
    fn tolerance(&self) -> f64;
}
