use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::ConfigError;
use crate::shipment::Mode;

/// Cost per kilogram for each shipment mode. Deserializing validates the
/// rates the same way [`CostModel::new`] does.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CostModel {
    rates: BTreeMap<Mode, f64>,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            rates: BTreeMap::from([(Mode::Flight, 20.0), (Mode::Ship, 10.0), (Mode::Road, 5.0)]),
        }
    }
}

impl<'de> Deserialize<'de> for CostModel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rates = BTreeMap::<Mode, f64>::deserialize(deserializer)?;
        CostModel::new(rates).map_err(serde::de::Error::custom)
    }
}

impl CostModel {
    pub fn new(rates: impl IntoIterator<Item = (Mode, f64)>) -> Result<Self, ConfigError> {
        let model = Self {
            rates: rates.into_iter().collect(),
        };
        model.validate()?;
        Ok(model)
    }

    pub fn cost_per_kg(&self, mode: Mode) -> Result<f64, ConfigError> {
        self.rates.get(&mode).copied().ok_or(ConfigError::MissingModeCost(mode))
    }

    /// Modes with a rate, in declaration order
    pub fn modes(&self) -> impl Iterator<Item = Mode> + '_ {
        self.rates.keys().copied()
    }

    pub fn rates(&self) -> &BTreeMap<Mode, f64> {
        &self.rates
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Rates must be finite and non-negative
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (&mode, &rate) in &self.rates {
            if !rate.is_finite() || rate < 0.0 {
                return Err(ConfigError::InvalidCost { mode, rate });
            }
        }
        Ok(())
    }

    /// Every mode seen in the data needs a rate
    pub fn validate_covers(&self, modes: impl IntoIterator<Item = Mode>) -> Result<(), ConfigError> {
        for mode in modes {
            self.cost_per_kg(mode)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rates() {
        let costs = CostModel::default();
        assert_eq!(costs.cost_per_kg(Mode::Flight).unwrap(), 20.0);
        assert_eq!(costs.cost_per_kg(Mode::Ship).unwrap(), 10.0);
        assert_eq!(costs.cost_per_kg(Mode::Road).unwrap(), 5.0);
        assert_eq!(costs.modes().collect::<Vec<_>>(), Mode::ALL.to_vec());
    }

    #[test]
    fn test_missing_mode() {
        let costs = CostModel::new([(Mode::Flight, 20.0), (Mode::Road, 5.0)]).unwrap();

        assert!(matches!(costs.cost_per_kg(Mode::Ship), Err(ConfigError::MissingModeCost(Mode::Ship))));
        assert!(costs.validate_covers([Mode::Flight, Mode::Road]).is_ok());
        assert!(matches!(
            costs.validate_covers(Mode::ALL),
            Err(ConfigError::MissingModeCost(Mode::Ship))
        ));
    }

    #[test]
    fn test_rejects_invalid_rates() {
        assert!(matches!(
            CostModel::new([(Mode::Ship, -1.0)]),
            Err(ConfigError::InvalidCost { mode: Mode::Ship, .. })
        ));
        assert!(CostModel::new([(Mode::Ship, f64::NAN)]).is_err());
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&CostModel::default()).unwrap();
        assert_eq!(json, r#"{"Flight":20.0,"Ship":10.0,"Road":5.0}"#);

        let parsed: CostModel = serde_json::from_str(r#"{"Road": 4.5}"#).unwrap();
        assert_eq!(parsed.cost_per_kg(Mode::Road).unwrap(), 4.5);
    }

    #[test]
    fn test_deserialize_rejects_negative_rate() {
        let err = serde_json::from_str::<CostModel>(r#"{"Flight": 20.0, "Ship": -3.0}"#).unwrap_err();

        assert!(err.to_string().contains("Invalid cost rate -3 for mode Ship"));
    }
}
