pub mod aggregate;
pub mod allocation;
pub mod chart;
pub mod config;
pub mod cost;
pub mod error;
pub mod formulate;
pub mod report;
pub mod shipment;

pub use aggregate::ShipmentTotals;
pub use allocation::{Allocation, AllocationCell};
pub use chart::{render_svg, render_svg_string};
pub use config::{AllocationConfig, ConfigError, ShareBounds};
pub use cost::CostModel;
pub use error::Error;
pub use formulate::{AllocationModel, optimize};
pub use report::{ModeSummary, Report, ReportRow, WarehouseSummary};
pub use shipment::{DataError, Mode, ShipmentRecord, Warehouse, load_shipments, read_shipments};

pub use shipalloc_solver::{LpProblem, LpSolver, Solution, SolutionStatus, Solver};
