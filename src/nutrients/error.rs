use crate::quantity::QuantityError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NutrientError {
    #[error("Nutrient name not recognised: {0}")]
    NameNotRecognised(String),

    #[error("Nutrient ratio is not defined for: {0}")]
    UndefinedNutrientRatio(String),

    #[error(
        "Mass of {nutrient_name} ({nutrient_g} g) exceeds the subject reference quantity ({subject_g} g)"
    )]
    NutrientExceedsSubject {
        nutrient_name: String,
        nutrient_g: f64,
        subject_g: f64,
    },

    #[error("The nutrients inside group '{group_name}' add up to more than the group's own mass")]
    ChildNutrientExceedsParentMass { group_name: String },

    #[error(transparent)]
    Quantity(#[from] QuantityError),
}
