use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const WAREHOUSE_COLUMN: &str = "Warehouse_block";
pub const MODE_COLUMN: &str = "Mode_of_Shipment";
pub const WEIGHT_COLUMN: &str = "Weight_in_gms";
pub const PRODUCT_COST_COLUMN: &str = "Cost_of_the_Product";
pub const DISCOUNT_COLUMN: &str = "Discount_offered";
pub const ON_TIME_COLUMN: &str = "Reached.on.Time_Y.N";

/// Malformed or missing shipment data. Record numbers are 1-based and count
/// data rows only (the header is not a record).
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("Record {record}: missing weight")]
    MissingWeight { record: usize },
    #[error("Record {record}: weight '{value}' is not a finite number")]
    InvalidWeight { record: usize, value: String },
    #[error("Record {record}: negative weight {value}")]
    NegativeWeight { record: usize, value: f64 },
    #[error("Record {record}: unknown warehouse '{value}'")]
    UnknownWarehouse { record: usize, value: String },
    #[error("Record {record}: unknown shipment mode '{value}'")]
    UnknownMode { record: usize, value: String },
    #[error("No shipment records")]
    Empty,
}

/// Warehouse blocks present in the shipping dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Warehouse {
    A,
    B,
    C,
    D,
    F,
}

impl Warehouse {
    pub const ALL: [Warehouse; 5] = [Warehouse::A, Warehouse::B, Warehouse::C, Warehouse::D, Warehouse::F];

    pub fn as_str(&self) -> &'static str {
        match self {
            Warehouse::A => "A",
            Warehouse::B => "B",
            Warehouse::C => "C",
            Warehouse::D => "D",
            Warehouse::F => "F",
        }
    }

    /// Case-sensitive lookup by block name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.as_str() == name)
    }
}

impl fmt::Display for Warehouse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shipment modes. Declaration order is the order used for variables,
/// reports and chart stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Mode {
    Flight,
    Ship,
    Road,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Flight, Mode::Ship, Mode::Road];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Flight => "Flight",
            Mode::Ship => "Ship",
            Mode::Road => "Road",
        }
    }

    /// Case-sensitive lookup by mode name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the shipping dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentRecord {
    pub warehouse: Warehouse,
    pub mode: Mode,
    pub weight_gms: f64,
    /// Not used by the optimization
    pub product_cost: Option<f64>,
    /// Not used by the optimization
    pub discount_offered: Option<f64>,
    /// Not used by the optimization
    pub reached_on_time: Option<bool>,
}

impl ShipmentRecord {
    pub fn new(warehouse: Warehouse, mode: Mode, weight_gms: f64) -> Self {
        Self {
            warehouse,
            mode,
            weight_gms,
            product_cost: None,
            discount_offered: None,
            reached_on_time: None,
        }
    }

    pub fn weight_kg(&self) -> f64 {
        self.weight_gms / 1000.0
    }
}

/// Read shipments from a CSV file with a header row
pub fn load_shipments(path: impl AsRef<Path>) -> Result<Vec<ShipmentRecord>, DataError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!("Loading shipments from {}", path.display());
    read_shipments(BufReader::new(file))
}

/// Read shipments from CSV text. Required columns are matched by exact
/// header name, in any order; unknown columns are ignored.
pub fn read_shipments<R: Read>(reader: R) -> Result<Vec<ShipmentRecord>, DataError> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::Fields).from_reader(reader);
    let columns = Columns::locate(csv.headers()?)?;

    let mut records = Vec::new();
    for (i, row) in csv.records().enumerate() {
        records.push(columns.parse(&row?, i + 1)?);
    }

    if records.is_empty() {
        return Err(DataError::Empty);
    }

    debug!("Read {} shipment records", records.len());
    Ok(records)
}

struct Columns {
    warehouse: usize,
    mode: usize,
    weight: usize,
    product_cost: Option<usize>,
    discount: Option<usize>,
    on_time: Option<usize>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, DataError> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let require = |name: &'static str| find(name).ok_or(DataError::MissingColumn(name));

        Ok(Self {
            warehouse: require(WAREHOUSE_COLUMN)?,
            mode: require(MODE_COLUMN)?,
            weight: require(WEIGHT_COLUMN)?,
            product_cost: find(PRODUCT_COST_COLUMN),
            discount: find(DISCOUNT_COLUMN),
            on_time: find(ON_TIME_COLUMN),
        })
    }

    fn parse(&self, row: &csv::StringRecord, record: usize) -> Result<ShipmentRecord, DataError> {
        let field = |idx: usize| row.get(idx).unwrap_or("");

        let warehouse_name = field(self.warehouse);
        let warehouse = Warehouse::from_name(warehouse_name).ok_or_else(|| DataError::UnknownWarehouse {
            record,
            value: warehouse_name.to_string(),
        })?;

        let mode_name = field(self.mode);
        let mode = Mode::from_name(mode_name).ok_or_else(|| DataError::UnknownMode {
            record,
            value: mode_name.to_string(),
        })?;

        let weight_gms = parse_weight(field(self.weight), record)?;

        let optional_number = |idx: Option<usize>| idx.and_then(|i| field(i).parse::<f64>().ok());

        Ok(ShipmentRecord {
            warehouse,
            mode,
            weight_gms,
            product_cost: optional_number(self.product_cost),
            discount_offered: optional_number(self.discount),
            reached_on_time: self.on_time.and_then(|i| match field(i) {
                "1" => Some(true),
                "0" => Some(false),
                _ => None,
            }),
        })
    }
}

fn parse_weight(raw: &str, record: usize) -> Result<f64, DataError> {
    if raw.is_empty() {
        return Err(DataError::MissingWeight { record });
    }
    let value = raw
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| DataError::InvalidWeight {
            record,
            value: raw.to_string(),
        })?;
    if value < 0.0 {
        return Err(DataError::NegativeWeight { record, value });
    }
    Ok(value)
}
