use thiserror::Error;

/// A problem the solver refuses to tableau-ize
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Objective has {found} coefficients but the problem has {expected} variables")]
    ObjectiveDimension { expected: usize, found: usize },
    #[error("Constraint {name} has {found} coefficients but the problem has {expected} variables")]
    ConstraintDimension {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Non-finite coefficient or right-hand side in {0}")]
    NonFinite(String),
}
