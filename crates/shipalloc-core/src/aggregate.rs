use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use crate::shipment::{DataError, Mode, ShipmentRecord, Warehouse};

/// Observed shipped weight, in kilograms
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentTotals {
    pub record_count: usize,
    pub total_kg: f64,
    pub by_warehouse: BTreeMap<Warehouse, f64>,
    pub by_mode: BTreeMap<Mode, f64>,
}

impl ShipmentTotals {
    /// Sum record weights per warehouse and per mode.
    ///
    /// Records built in code bypass CSV validation, so weights are checked
    /// again here.
    pub fn from_records(records: &[ShipmentRecord]) -> Result<Self, DataError> {
        if records.is_empty() {
            return Err(DataError::Empty);
        }

        let mut total_kg = 0.0;
        let mut by_warehouse = BTreeMap::new();
        let mut by_mode = BTreeMap::new();

        for (i, r) in records.iter().enumerate() {
            let record = i + 1;
            if !r.weight_gms.is_finite() {
                return Err(DataError::InvalidWeight {
                    record,
                    value: r.weight_gms.to_string(),
                });
            }
            if r.weight_gms < 0.0 {
                return Err(DataError::NegativeWeight {
                    record,
                    value: r.weight_gms,
                });
            }

            let kg = r.weight_kg();
            total_kg += kg;
            *by_warehouse.entry(r.warehouse).or_insert(0.0) += kg;
            *by_mode.entry(r.mode).or_insert(0.0) += kg;
        }

        debug!(
            "Aggregated {} records: {:.3} kg across {} warehouses, {} modes",
            records.len(),
            total_kg,
            by_warehouse.len(),
            by_mode.len()
        );

        Ok(Self {
            record_count: records.len(),
            total_kg,
            by_warehouse,
            by_mode,
        })
    }

    /// Warehouses with at least one record, in block order
    pub fn warehouses(&self) -> impl Iterator<Item = Warehouse> + '_ {
        self.by_warehouse.keys().copied()
    }

    /// Modes with at least one record
    pub fn modes(&self) -> impl Iterator<Item = Mode> + '_ {
        self.by_mode.keys().copied()
    }

    pub fn warehouse_kg(&self, warehouse: Warehouse) -> f64 {
        self.by_warehouse.get(&warehouse).copied().unwrap_or(0.0)
    }

    pub fn mode_kg(&self, mode: Mode) -> f64 {
        self.by_mode.get(&mode).copied().unwrap_or(0.0)
    }
}
