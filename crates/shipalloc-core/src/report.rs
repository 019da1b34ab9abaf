use std::fmt;

use serde::Serialize;

use crate::allocation::Allocation;
use crate::shipment::{Mode, Warehouse};

/// Kilograms and cost for one warehouse/mode pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub warehouse: Warehouse,
    pub mode: Mode,
    pub weight_kg: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeSummary {
    pub mode: Mode,
    pub rate: f64,
    pub weight_kg: f64,
    /// Fraction of the total allocated weight
    pub share: f64,
    pub cost: f64,
    pub observed_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarehouseSummary {
    pub warehouse: Warehouse,
    pub weight_kg: f64,
    pub cost: f64,
    pub observed_kg: f64,
    pub capacity_kg: f64,
}

/// Presentation of a solved allocation. Every figure comes from the solved
/// values; nothing is re-derived from the shipment data except the observed
/// and capacity columns shown for comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub total_weight_kg: f64,
    pub total_cost: f64,
    pub rows: Vec<ReportRow>,
    pub modes: Vec<ModeSummary>,
    pub warehouses: Vec<WarehouseSummary>,
    pub binding_constraints: Vec<String>,
}

impl Report {
    pub fn from_allocation(allocation: &Allocation) -> Self {
        let rows: Vec<ReportRow> = allocation
            .cells
            .iter()
            .map(|cell| ReportRow {
                warehouse: cell.warehouse,
                mode: cell.mode,
                weight_kg: cell.weight_kg,
                cost: allocation.cell_cost(cell),
            })
            .collect();

        let total_weight_kg = allocation.allocated_kg();

        let modes = allocation
            .modes()
            .map(|mode| {
                let weight_kg = allocation.mode_kg(mode);
                ModeSummary {
                    mode,
                    rate: allocation.rate(mode),
                    weight_kg,
                    share: if total_weight_kg > 0.0 { weight_kg / total_weight_kg } else { 0.0 },
                    cost: rows.iter().filter(|r| r.mode == mode).map(|r| r.cost).sum(),
                    observed_kg: allocation.totals.mode_kg(mode),
                }
            })
            .collect();

        let warehouses = allocation
            .warehouses()
            .map(|warehouse| WarehouseSummary {
                warehouse,
                weight_kg: allocation.warehouse_kg(warehouse),
                cost: rows.iter().filter(|r| r.warehouse == warehouse).map(|r| r.cost).sum(),
                observed_kg: allocation.totals.warehouse_kg(warehouse),
                capacity_kg: allocation.capacity_kg(warehouse),
            })
            .collect();

        Self {
            total_weight_kg,
            total_cost: allocation.total_cost,
            rows,
            modes,
            warehouses,
            binding_constraints: allocation.binding_constraints.clone(),
        }
    }

    pub fn row(&self, warehouse: Warehouse, mode: Mode) -> Option<&ReportRow> {
        self.rows.iter().find(|r| r.warehouse == warehouse && r.mode == mode)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Optimization Results ===")?;
        writeln!(f, "Total weight: {:.2} kg", self.total_weight_kg)?;
        writeln!(f, "Minimized total cost: {:.2}", self.total_cost)?;
        writeln!(f)?;

        writeln!(f, "=== Mode Distribution ===")?;
        for m in &self.modes {
            writeln!(
                f,
                "{:8} {:12.1} kg ({:5.1}%) | rate {:6.2}/kg | cost {:12.2} | observed {:10.1} kg",
                m.mode.as_str(),
                m.weight_kg,
                m.share * 100.0,
                m.rate,
                m.cost,
                m.observed_kg
            )?;
        }
        writeln!(f)?;

        writeln!(f, "=== Warehouse Allocation ===")?;
        for w in &self.warehouses {
            writeln!(
                f,
                "Warehouse {}: {:.1} kg (observed {:.1} kg, capacity {:.1} kg) cost {:.2}",
                w.warehouse, w.weight_kg, w.observed_kg, w.capacity_kg, w.cost
            )?;
            for r in self.rows.iter().filter(|r| r.warehouse == w.warehouse) {
                writeln!(f, "  {:8} {:12.1} kg", r.mode.as_str(), r.weight_kg)?;
            }
        }

        if !self.binding_constraints.is_empty() {
            writeln!(f)?;
            writeln!(f, "Binding constraints:")?;
            for name in &self.binding_constraints {
                writeln!(f, "  - {}", name)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::aggregate::ShipmentTotals;
    use crate::allocation::AllocationCell;
    use crate::shipment::ShipmentRecord;

    fn allocation() -> Allocation {
        let totals = ShipmentTotals::from_records(&[
            ShipmentRecord::new(Warehouse::A, Mode::Flight, 600_000.0),
            ShipmentRecord::new(Warehouse::B, Mode::Road, 400_000.0),
        ])
        .unwrap();

        let cell = |warehouse, mode, weight_kg| AllocationCell {
            warehouse,
            mode,
            weight_kg,
        };

        Allocation {
            cells: vec![
                cell(Warehouse::A, Mode::Flight, 200.0),
                cell(Warehouse::A, Mode::Ship, 300.0),
                cell(Warehouse::A, Mode::Road, 100.0),
                cell(Warehouse::B, Mode::Flight, 0.0),
                cell(Warehouse::B, Mode::Ship, 0.0),
                cell(Warehouse::B, Mode::Road, 400.0),
            ],
            total_cost: 9500.0,
            totals,
            rates: BTreeMap::from([(Mode::Flight, 20.0), (Mode::Ship, 10.0), (Mode::Road, 5.0)]),
            capacity_factor: 1.1,
            binding_constraints: vec!["total_weight".to_string(), "max_Road_allocation".to_string()],
        }
    }

    #[test]
    fn test_rows_and_totals_reconcile() {
        let report = Report::from_allocation(&allocation());

        assert_eq!(report.rows.len(), 6);
        assert_eq!(report.total_weight_kg, 1000.0);
        assert_eq!(report.total_cost, 9500.0);

        let row_cost: f64 = report.rows.iter().map(|r| r.cost).sum();
        let mode_cost: f64 = report.modes.iter().map(|m| m.cost).sum();
        let warehouse_cost: f64 = report.warehouses.iter().map(|w| w.cost).sum();
        assert!((row_cost - report.total_cost).abs() < 1e-9);
        assert!((mode_cost - report.total_cost).abs() < 1e-9);
        assert!((warehouse_cost - report.total_cost).abs() < 1e-9);

        assert_eq!(report.row(Warehouse::A, Mode::Ship).unwrap().cost, 3000.0);
    }

    #[test]
    fn test_mode_summary() {
        let report = Report::from_allocation(&allocation());

        let road = report.modes.iter().find(|m| m.mode == Mode::Road).unwrap();
        assert_eq!(road.weight_kg, 500.0);
        assert_eq!(road.share, 0.5);
        assert_eq!(road.cost, 2500.0);
        assert_eq!(road.observed_kg, 400.0);

        let ship = report.modes.iter().find(|m| m.mode == Mode::Ship).unwrap();
        assert_eq!(ship.observed_kg, 0.0);
    }

    #[test]
    fn test_warehouse_summary() {
        let report = Report::from_allocation(&allocation());

        let a = &report.warehouses[0];
        assert_eq!(a.warehouse, Warehouse::A);
        assert_eq!(a.weight_kg, 600.0);
        assert_eq!(a.observed_kg, 600.0);
        assert!((a.capacity_kg - 660.0).abs() < 1e-9);
    }

    #[test]
    fn test_text_rendering() {
        let text = Report::from_allocation(&allocation()).to_string();

        assert!(text.contains("Minimized total cost: 9500.00"));
        assert!(text.contains("Warehouse A: 600.0 kg"));
        assert!(text.contains("Road"));
        assert!(text.contains("( 50.0%)"));
        assert!(text.contains("  - max_Road_allocation"));
    }

    #[test]
    fn test_json_rendering() {
        let json = Report::from_allocation(&allocation()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["total_cost"], 9500.0);
        assert_eq!(value["rows"][0]["warehouse"], "A");
        assert_eq!(value["rows"][0]["mode"], "Flight");
        assert_eq!(value["modes"].as_array().unwrap().len(), 3);
    }
}
