//! Subjects: things that carry nutrient ratios and flags.
//!
//! A subject is composed of small owned components (bulk properties, a
//! [`NutrientRatioStore`], a [`FlagDofState`]). Free functions such as the
//! family mass validator and the flag conflict resolver work against the
//! capability traits below rather than against a concrete subject type.

pub mod ingredient;

pub use ingredient::Ingredient;

use crate::flags::FlagDofState;
use crate::nutrients::NutrientRatioStore;
use crate::quantity::BulkProperties;

pub trait SupportsNutrientRatios {
    fn nutrient_ratios(&self) -> &NutrientRatioStore;

    fn nutrient_ratios_mut(&mut self) -> &mut NutrientRatioStore;

    fn bulk(&self) -> BulkProperties;
}

pub trait SupportsFlags: SupportsNutrientRatios {
    fn flag_dofs(&self) -> &FlagDofState;

    fn flag_dofs_mut(&mut self) -> &mut FlagDofState;
}
