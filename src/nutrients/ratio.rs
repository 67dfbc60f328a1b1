use serde::{Deserialize, Serialize};

use crate::quantity::QuantityData;

/// "X of nutrient per Y of subject", in whatever units the user entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientRatioData {
    pub nutrient_mass_data: QuantityData,
    pub subject_ref_qty_data: QuantityData,
}

impl NutrientRatioData {
    pub fn new(
        nutrient_mass: Option<f64>,
        nutrient_mass_unit: &str,
        subject_qty: f64,
        subject_qty_unit: &str,
    ) -> Self {
        Self {
            nutrient_mass_data: QuantityData::new(nutrient_mass, nutrient_mass_unit),
            subject_ref_qty_data: QuantityData::new(Some(subject_qty), subject_qty_unit),
        }
    }

    /// `0 g per 100 g`, used when a previously undefined ratio has to be zeroed.
    pub fn zero_default() -> Self {
        Self::new(Some(0.0), "g", 100.0, "g")
    }

    /// The same units and reference quantity with the nutrient mass set to zero.
    pub fn zeroed(&self) -> Self {
        Self {
            nutrient_mass_data: QuantityData::new(Some(0.0), &self.nutrient_mass_data.unit),
            subject_ref_qty_data: self.subject_ref_qty_data.clone(),
        }
    }

    pub fn is_defined(&self) -> bool {
        self.nutrient_mass_data.is_defined()
    }
}

/// Read-only snapshot of one defined ratio. Mutation only happens through
/// the ratio store, so holding one of these never bypasses validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NutrientRatio {
    nutrient_name: String,
    data: NutrientRatioData,
    g_per_subject_g: f64,
}

impl NutrientRatio {
    pub(crate) fn new(nutrient_name: &str, data: NutrientRatioData, g_per_subject_g: f64) -> Self {
        Self {
            nutrient_name: nutrient_name.to_string(),
            data,
            g_per_subject_g,
        }
    }

    pub fn nutrient_name(&self) -> &str {
        &self.nutrient_name
    }

    pub fn data(&self) -> &NutrientRatioData {
        &self.data
    }

    pub fn g_per_subject_g(&self) -> f64 {
        self.g_per_subject_g
    }

    pub fn g_per_100g(&self) -> f64 {
        self.g_per_subject_g * 100.0
    }

    pub fn is_zero(&self) -> bool {
        self.g_per_subject_g == 0.0
    }
}

/// Result of looking a ratio up without treating absence as an error.
#[derive(Debug, Clone, PartialEq)]
pub enum RatioLookup {
    Defined(NutrientRatio),
    Undefined,
}

impl RatioLookup {
    pub fn is_defined(&self) -> bool {
        matches!(self, RatioLookup::Defined(_))
    }

    pub fn defined(self) -> Option<NutrientRatio> {
        match self {
            RatioLookup::Defined(ratio) => Some(ratio),
            RatioLookup::Undefined => None,
        }
    }
}

/// The three states a related nutrient can be in when judging a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatioState {
    Undefined,
    Zero,
    NonZero,
}

impl RatioState {
    pub fn of(data: Option<&NutrientRatioData>) -> Self {
        match data.and_then(|d| d.nutrient_mass_data.quantity) {
            None => RatioState::Undefined,
            Some(q) if q == 0.0 => RatioState::Zero,
            Some(_) => RatioState::NonZero,
        }
    }

    pub fn is_defined(&self) -> bool {
        !matches!(self, RatioState::Undefined)
    }
}

/// Grams of nutrient per gram of subject, if the subject states it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MassLookup {
    Defined(f64),
    Undefined,
}

impl MassLookup {
    pub fn value(&self) -> Option<f64> {
        match self {
            MassLookup::Defined(v) => Some(*v),
            MassLookup::Undefined => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_state_of() {
        assert_eq!(RatioState::of(None), RatioState::Undefined);
        let undefined = NutrientRatioData::new(None, "g", 100.0, "g");
        assert_eq!(RatioState::of(Some(&undefined)), RatioState::Undefined);
        assert_eq!(RatioState::of(Some(&NutrientRatioData::zero_default())), RatioState::Zero);
        let some = NutrientRatioData::new(Some(3.0), "mg", 1.0, "kg");
        assert_eq!(RatioState::of(Some(&some)), RatioState::NonZero);
    }

    #[test]
    fn test_zeroed_keeps_units() {
        let data = NutrientRatioData::new(Some(12.0), "mg", 2.0, "tbsp");
        let zeroed = data.zeroed();
        assert_eq!(zeroed.nutrient_mass_data, QuantityData::new(Some(0.0), "mg"));
        assert_eq!(zeroed.subject_ref_qty_data, data.subject_ref_qty_data);
    }

    #[test]
    fn test_ratio_data_json_shape() {
        let data = NutrientRatioData::new(Some(40.0), "g", 100.0, "g");
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["nutrient_mass_data"]["quantity"], 40.0);
        assert_eq!(value["subject_ref_qty_data"]["unit"], "g");
    }
}
