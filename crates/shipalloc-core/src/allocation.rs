use std::collections::BTreeMap;

use serde::Serialize;

use crate::aggregate::ShipmentTotals;
use crate::shipment::{Mode, Warehouse};

/// Kilograms the optimum assigns to one warehouse/mode pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AllocationCell {
    pub warehouse: Warehouse,
    pub mode: Mode,
    pub weight_kg: f64,
}

/// A solved allocation. Built once from an optimal solution inside this
/// crate; callers only get read access.
#[derive(Debug, Clone, Serialize)]
pub struct Allocation {
    /// One cell per decision variable, warehouse-major
    pub(crate) cells: Vec<AllocationCell>,
    /// Objective value reported by the solver
    pub(crate) total_cost: f64,
    /// Observed weights the model was built from
    pub(crate) totals: ShipmentTotals,
    /// Rates of the modelled modes
    pub(crate) rates: BTreeMap<Mode, f64>,
    pub(crate) capacity_factor: f64,
    pub(crate) binding_constraints: Vec<String>,
}

impl Allocation {
    pub fn cells(&self) -> &[AllocationCell] {
        &self.cells
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    pub fn totals(&self) -> &ShipmentTotals {
        &self.totals
    }

    pub fn capacity_factor(&self) -> f64 {
        self.capacity_factor
    }

    /// Constraints that hold with equality at the optimum
    pub fn binding_constraints(&self) -> &[String] {
        &self.binding_constraints
    }

    pub fn warehouses(&self) -> impl Iterator<Item = Warehouse> + '_ {
        self.totals.warehouses()
    }

    pub fn modes(&self) -> impl Iterator<Item = Mode> + '_ {
        self.rates.keys().copied()
    }

    pub fn weight(&self, warehouse: Warehouse, mode: Mode) -> f64 {
        self.cells
            .iter()
            .find(|c| c.warehouse == warehouse && c.mode == mode)
            .map(|c| c.weight_kg)
            .unwrap_or(0.0)
    }

    pub fn warehouse_kg(&self, warehouse: Warehouse) -> f64 {
        self.cells.iter().filter(|c| c.warehouse == warehouse).map(|c| c.weight_kg).sum()
    }

    pub fn mode_kg(&self, mode: Mode) -> f64 {
        self.cells.iter().filter(|c| c.mode == mode).map(|c| c.weight_kg).sum()
    }

    pub fn allocated_kg(&self) -> f64 {
        self.cells.iter().map(|c| c.weight_kg).sum()
    }

    pub fn rate(&self, mode: Mode) -> f64 {
        self.rates.get(&mode).copied().unwrap_or(0.0)
    }

    pub fn cell_cost(&self, cell: &AllocationCell) -> f64 {
        cell.weight_kg * self.rate(cell.mode)
    }

    pub fn capacity_kg(&self, warehouse: Warehouse) -> f64 {
        self.capacity_factor * self.totals.warehouse_kg(warehouse)
    }
}
