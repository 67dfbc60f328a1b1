pub mod catalog;
pub mod error;
pub mod family;
pub mod ratio;
pub mod store;

pub use catalog::{normalise_name, Nutrient, NutrientCatalog};
pub use error::NutrientError;
pub use family::{validate_family_masses, validate_subject_family_masses};
pub use ratio::{MassLookup, NutrientRatio, NutrientRatioData, RatioLookup, RatioState};
pub use store::{NutrientRatioStore, RatioContext};
