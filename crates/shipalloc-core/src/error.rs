use thiserror::Error;

use crate::config::ConfigError;
use crate::shipment::DataError;

/// Any failure that aborts an allocation run
#[derive(Error, Debug)]
pub enum Error {
    #[error("Data error: {0}")]
    Data(#[from] DataError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// The constraints cannot all hold; a modelling problem, not a transient one
    #[error("Infeasible model: {0}")]
    InfeasibleModel(String),
    /// The solver returned something a correctly built model cannot produce
    #[error("Model error: {0}")]
    Model(String),
    #[error("Chart error: {0}")]
    Chart(String),
}
