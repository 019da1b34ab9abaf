mod backend;
mod error;
mod problem;
mod simplex;
mod solution;

pub use backend::LpSolver;
pub use error::SolverError;
pub use problem::{Constraint, ConstraintOp, ConstraintViolation, LpProblem, Objective};
pub use simplex::Solver;
pub use solution::{Solution, SolutionStatus};
