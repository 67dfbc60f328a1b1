use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::catalog::NutrientCatalog;
use super::error::NutrientError;
use super::family::{validate_family_masses, MASS_TOLERANCE};
use super::ratio::{MassLookup, NutrientRatio, NutrientRatioData, RatioLookup, RatioState};
use crate::quantity::{units, BulkProperties, QuantityError};

/// What the store needs from its surroundings to validate a ratio: the
/// nutrient graph and the subject's bulk properties for unit conversion.
#[derive(Debug, Clone, Copy)]
pub struct RatioContext<'a> {
    pub catalog: &'a NutrientCatalog,
    pub bulk: BulkProperties,
}

impl<'a> RatioContext<'a> {
    pub fn new(catalog: &'a NutrientCatalog, bulk: BulkProperties) -> Self {
        Self { catalog, bulk }
    }
}

/// Grams of nutrient and grams of subject described by `data`.
fn ratio_grams(bulk: &BulkProperties, data: &NutrientRatioData) -> Result<(f64, f64), NutrientError> {
    let nutrient_qty = data
        .nutrient_mass_data
        .quantity
        .map(units::validate_quantity)
        .transpose()?
        .unwrap_or(0.0);
    let nutrient_g = units::convert(nutrient_qty, &data.nutrient_mass_data.unit, "g", None, None)?;

    let subject_qty = data
        .subject_ref_qty_data
        .quantity
        .ok_or(QuantityError::ZeroQuantity)?;
    let subject_g = bulk.grams_of(subject_qty, &data.subject_ref_qty_data.unit)?;
    if subject_g == 0.0 {
        return Err(QuantityError::ZeroQuantity.into());
    }
    Ok((nutrient_g, subject_g))
}

/// The nutrient ratios one subject declares, keyed by primary name.
///
/// Ratios only change through [`set`](Self::set), [`undefine`](Self::undefine)
/// and [`zero`](Self::zero); each of them leaves the store exactly as it was
/// when it returns an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NutrientRatioStore {
    ratios: BTreeMap<String, NutrientRatioData>,
}

impl NutrientRatioStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ratios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }

    pub fn defined_names(&self) -> impl Iterator<Item = &str> {
        self.ratios.keys().map(String::as_str)
    }

    /// Raw persisted data, keyed by primary name.
    pub fn data(&self) -> &BTreeMap<String, NutrientRatioData> {
        &self.ratios
    }

    pub fn state_of(&self, catalog: &NutrientCatalog, nutrient_name: &str) -> Result<RatioState, NutrientError> {
        let primary = catalog.resolve_primary_name(nutrient_name)?;
        Ok(RatioState::of(self.ratios.get(&primary)))
    }

    /// Grams of nutrient per gram of subject for an already-resolved primary name.
    pub fn mass_of(&self, bulk: &BulkProperties, primary_name: &str) -> Result<MassLookup, NutrientError> {
        match self.ratios.get(primary_name) {
            None => Ok(MassLookup::Undefined),
            Some(data) => {
                let (nutrient_g, subject_g) = ratio_grams(bulk, data)?;
                Ok(MassLookup::Defined(nutrient_g / subject_g))
            }
        }
    }

    pub fn lookup(&self, ctx: &RatioContext<'_>, nutrient_name: &str) -> Result<RatioLookup, NutrientError> {
        let primary = ctx.catalog.resolve_primary_name(nutrient_name)?;
        match self.ratios.get(&primary) {
            None => Ok(RatioLookup::Undefined),
            Some(data) => {
                let (nutrient_g, subject_g) = ratio_grams(&ctx.bulk, data)?;
                Ok(RatioLookup::Defined(NutrientRatio::new(
                    &primary,
                    data.clone(),
                    nutrient_g / subject_g,
                )))
            }
        }
    }

    pub fn get(&self, ctx: &RatioContext<'_>, nutrient_name: &str) -> Result<NutrientRatio, NutrientError> {
        match self.lookup(ctx, nutrient_name)? {
            RatioLookup::Defined(ratio) => Ok(ratio),
            RatioLookup::Undefined => Err(NutrientError::UndefinedNutrientRatio(
                ctx.catalog.resolve_primary_name(nutrient_name)?,
            )),
        }
    }

    /// Sets (or, with a null nutrient mass, removes) the ratio for a nutrient.
    pub fn set(
        &mut self,
        ctx: &RatioContext<'_>,
        nutrient_name: &str,
        data: NutrientRatioData,
    ) -> Result<(), NutrientError> {
        let primary = ctx.catalog.resolve_primary_name(nutrient_name)?;

        let subject_qty = data
            .subject_ref_qty_data
            .quantity
            .ok_or(QuantityError::ZeroQuantity)?;
        if units::validate_quantity(subject_qty)? == 0.0 {
            return Err(QuantityError::ZeroQuantity.into());
        }

        if data.nutrient_mass_data.quantity.is_none() {
            self.remove(&primary);
            return Ok(());
        }

        let mut data = data;
        data.nutrient_mass_data.unit = units::validate_mass_unit(&data.nutrient_mass_data.unit)?;
        data.subject_ref_qty_data.unit = units::normalise_unit(&data.subject_ref_qty_data.unit)?;

        let backup = self.ratios.get(&primary).cloned();
        self.ratios.insert(primary.clone(), data);
        if let Err(err) = self.validate_entry(ctx, &primary) {
            self.restore(&primary, backup);
            return Err(err);
        }
        tracing::debug!(nutrient = %primary, "Set nutrient ratio");
        Ok(())
    }

    pub fn undefine(&mut self, ctx: &RatioContext<'_>, nutrient_name: &str) -> Result<(), NutrientError> {
        let primary = ctx.catalog.resolve_primary_name(nutrient_name)?;
        self.remove(&primary);
        Ok(())
    }

    /// Sets the nutrient mass to zero, keeping the ratio's current units and
    /// reference quantity (or `0 g per 100 g` if it was undefined).
    pub fn zero(&mut self, ctx: &RatioContext<'_>, nutrient_name: &str) -> Result<(), NutrientError> {
        let primary = ctx.catalog.resolve_primary_name(nutrient_name)?;
        let data = self
            .ratios
            .get(&primary)
            .map(NutrientRatioData::zeroed)
            .unwrap_or_else(NutrientRatioData::zero_default);
        self.set(ctx, &primary, data)
    }

    /// Re-checks every ratio, e.g. after the subject's bulk properties changed.
    pub fn revalidate(&self, ctx: &RatioContext<'_>) -> Result<(), NutrientError> {
        for primary in self.ratios.keys() {
            self.validate_entry(ctx, primary)?;
        }
        Ok(())
    }

    fn validate_entry(&self, ctx: &RatioContext<'_>, primary: &str) -> Result<(), NutrientError> {
        if let Some(data) = self.ratios.get(primary) {
            let (nutrient_g, subject_g) = ratio_grams(&ctx.bulk, data)?;
            if nutrient_g > subject_g + MASS_TOLERANCE {
                return Err(NutrientError::NutrientExceedsSubject {
                    nutrient_name: primary.to_string(),
                    nutrient_g,
                    subject_g,
                });
            }
        }
        validate_family_masses(ctx.catalog, primary, |name| self.mass_of(&ctx.bulk, name))
    }

    fn remove(&mut self, primary: &str) {
        if self.ratios.remove(primary).is_some() {
            tracing::debug!(nutrient = %primary, "Undefined nutrient ratio");
        }
    }

    fn restore(&mut self, primary: &str, backup: Option<NutrientRatioData>) {
        match backup {
            Some(previous) => {
                self.ratios.insert(primary.to_string(), previous);
            }
            None => {
                self.ratios.remove(primary);
            }
        }
        tracing::debug!(nutrient = %primary, "Rolled back nutrient ratio");
    }
}
