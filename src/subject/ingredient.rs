use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;

use super::{SupportsFlags, SupportsNutrientRatios};
use crate::catalogs::Catalogs;
use crate::flags::{self, FlagDofState, FlagError};
use crate::nutrients::{NutrientError, NutrientRatio, NutrientRatioData, NutrientRatioStore, RatioLookup};
use crate::persistence::IngredientRecord;
use crate::quantity::{validate_bulk_value, BulkProperties};

/// A single food item with its nutrient ratios and dietary flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingredient {
    name: String,
    bulk: BulkProperties,
    nutrient_ratios: NutrientRatioStore,
    flag_dofs: FlagDofState,
}

impl Ingredient {
    pub fn new(name: &str, catalogs: &Catalogs) -> Self {
        Self {
            name: name.trim().to_string(),
            bulk: BulkProperties::default(),
            nutrient_ratios: NutrientRatioStore::new(),
            flag_dofs: FlagDofState::for_catalog(&catalogs.flags),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_density(&mut self, catalogs: &Catalogs, g_per_ml: Option<f64>) -> Result<(), NutrientError> {
        let bulk = BulkProperties {
            g_per_ml: validate_bulk_value(g_per_ml)?,
            ..self.bulk
        };
        self.update_bulk(catalogs, bulk)
    }

    pub fn set_piece_mass(&mut self, catalogs: &Catalogs, piece_mass_g: Option<f64>) -> Result<(), NutrientError> {
        let bulk = BulkProperties {
            piece_mass_g: validate_bulk_value(piece_mass_g)?,
            ..self.bulk
        };
        self.update_bulk(catalogs, bulk)
    }

    // Ratios expressed per ml or per piece change meaning with the bulk
    // properties, so every ratio is re-checked before the change sticks.
    fn update_bulk(&mut self, catalogs: &Catalogs, bulk: BulkProperties) -> Result<(), NutrientError> {
        let previous = self.bulk;
        self.bulk = bulk;
        if let Err(err) = self.nutrient_ratios.revalidate(&catalogs.ratio_context(self.bulk)) {
            self.bulk = previous;
            tracing::debug!(ingredient = %self.name, error = %err, "Rolled back bulk property change");
            return Err(err);
        }
        Ok(())
    }

    /// Sets `nutrient_mass` of a nutrient per `subject_qty` of this
    /// ingredient. A `None` mass undefines the ratio.
    pub fn set_nutrient_ratio(
        &mut self,
        catalogs: &Catalogs,
        nutrient_name: &str,
        nutrient_mass: Option<f64>,
        nutrient_mass_unit: &str,
        subject_qty: f64,
        subject_qty_unit: &str,
    ) -> Result<(), NutrientError> {
        let data = NutrientRatioData::new(nutrient_mass, nutrient_mass_unit, subject_qty, subject_qty_unit);
        self.nutrient_ratios
            .set(&catalogs.ratio_context(self.bulk), nutrient_name, data)
    }

    pub fn undefine_nutrient_ratio(&mut self, catalogs: &Catalogs, nutrient_name: &str) -> Result<(), NutrientError> {
        self.nutrient_ratios
            .undefine(&catalogs.ratio_context(self.bulk), nutrient_name)
    }

    pub fn get_nutrient_ratio(&self, catalogs: &Catalogs, nutrient_name: &str) -> Result<NutrientRatio, NutrientError> {
        self.nutrient_ratios
            .get(&catalogs.ratio_context(self.bulk), nutrient_name)
    }

    pub fn nutrient_ratio_lookup(&self, catalogs: &Catalogs, nutrient_name: &str) -> Result<RatioLookup, NutrientError> {
        self.nutrient_ratios
            .lookup(&catalogs.ratio_context(self.bulk), nutrient_name)
    }

    pub fn defined_nutrient_names(&self) -> impl Iterator<Item = &str> {
        self.nutrient_ratios.defined_names()
    }

    /// Energy per gram of ingredient from the calorie-bearing nutrients it
    /// defines. Undefined ratios contribute nothing.
    pub fn calories_per_g(&self, catalogs: &Catalogs) -> Result<f64, NutrientError> {
        let mut kcal = 0.0;
        for nutrient in catalogs.nutrients.caloric_nutrients() {
            if let Some(g_per_g) = self.nutrient_ratios.mass_of(&self.bulk, nutrient.primary_name())?.value() {
                kcal += g_per_g * nutrient.calories_per_g();
            }
        }
        Ok(kcal)
    }

    pub fn get_flag_value(&self, catalogs: &Catalogs, flag_name: &str) -> Result<Option<bool>, FlagError> {
        flags::get_flag_value(&catalogs.flags, self, flag_name)
    }

    pub fn set_flag_value(
        &mut self,
        catalogs: &Catalogs,
        flag_name: &str,
        value: Option<bool>,
        allow_nutrient_edits: bool,
    ) -> Result<(), FlagError> {
        flags::set_flag_value(catalogs, self, flag_name, value, allow_nutrient_edits)
    }

    /// Every flag in the catalog with its current value.
    pub fn flag_summary(&self, catalogs: &Catalogs) -> BTreeMap<String, Option<bool>> {
        catalogs
            .flags
            .iter()
            .map(|flag| (flag.name().to_string(), flags::flag_value(flag, self)))
            .collect()
    }

    pub fn undefined_flag_names(&self, catalogs: &Catalogs) -> Vec<String> {
        self.flag_summary(catalogs)
            .into_iter()
            .filter_map(|(name, value)| value.is_none().then_some(name))
            .collect()
    }

    pub fn to_record(&self) -> IngredientRecord {
        IngredientRecord {
            name: self.name.clone(),
            bulk: self.bulk,
            nutrient_ratios: self.nutrient_ratios.data().clone(),
            flag_dofs: self.flag_dofs.values().clone(),
        }
    }

    /// Rebuilds an ingredient from persisted data. Every ratio goes back
    /// through the validating setter, so an edited file cannot introduce an
    /// inconsistent state.
    pub fn from_record(catalogs: &Catalogs, record: &IngredientRecord) -> Result<Self> {
        if record.name.trim().is_empty() {
            return Err(anyhow!("Ingredient record has an empty name"));
        }
        let mut ingredient = Self::new(&record.name, catalogs);
        ingredient.bulk = BulkProperties {
            g_per_ml: validate_bulk_value(record.bulk.g_per_ml)
                .with_context(|| format!("Invalid density for '{}'", record.name))?,
            piece_mass_g: validate_bulk_value(record.bulk.piece_mass_g)
                .with_context(|| format!("Invalid piece mass for '{}'", record.name))?,
        };

        let ctx = catalogs.ratio_context(ingredient.bulk);
        for (nutrient, data) in &record.nutrient_ratios {
            ingredient
                .nutrient_ratios
                .set(&ctx, nutrient, data.clone())
                .with_context(|| format!("Invalid '{}' ratio for '{}'", nutrient, record.name))?;
        }

        ingredient.flag_dofs = FlagDofState::from_values(&catalogs.flags, &record.flag_dofs)
            .with_context(|| format!("Invalid flag values for '{}'", record.name))?;
        Ok(ingredient)
    }
}

impl SupportsNutrientRatios for Ingredient {
    fn nutrient_ratios(&self) -> &NutrientRatioStore {
        &self.nutrient_ratios
    }

    fn nutrient_ratios_mut(&mut self) -> &mut NutrientRatioStore {
        &mut self.nutrient_ratios
    }

    fn bulk(&self) -> BulkProperties {
        self.bulk
    }
}

impl SupportsFlags for Ingredient {
    fn flag_dofs(&self) -> &FlagDofState {
        &self.flag_dofs
    }

    fn flag_dofs_mut(&mut self) -> &mut FlagDofState {
        &mut self.flag_dofs
    }
}
