use serde::{Deserialize, Serialize};

use super::units::{self, QuantityError};

/// A quantity as it is persisted: an optional number plus its unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantityData {
    pub quantity: Option<f64>,
    pub unit: String,
}

impl QuantityData {
    pub fn new(quantity: Option<f64>, unit: &str) -> Self {
        Self {
            quantity,
            unit: unit.to_string(),
        }
    }

    pub fn is_defined(&self) -> bool {
        self.quantity.is_some()
    }
}

/// Per-subject properties needed to turn volumes and pieces into grams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkProperties {
    #[serde(default)]
    pub g_per_ml: Option<f64>,
    #[serde(default)]
    pub piece_mass_g: Option<f64>,
}

impl BulkProperties {
    /// Mass in grams of `quantity` expressed in `unit`.
    pub fn grams_of(&self, quantity: f64, unit: &str) -> Result<f64, QuantityError> {
        units::convert(quantity, unit, "g", self.g_per_ml, self.piece_mass_g)
    }
}

/// Checks a bulk property value (density or piece mass): must be finite and
/// strictly positive when present.
pub fn validate_bulk_value(value: Option<f64>) -> Result<Option<f64>, QuantityError> {
    match value {
        None => Ok(None),
        Some(v) => {
            let v = units::validate_quantity(v)?;
            if v == 0.0 {
                return Err(QuantityError::ZeroQuantity);
            }
            Ok(Some(v))
        }
    }
}
