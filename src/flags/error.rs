use crate::nutrients::NutrientError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FlagError {
    #[error("Flag name not recognised: {0}")]
    NameNotRecognised(String),

    #[error("Flag '{flag_name}' needs non-zero values for {nutrient_names:?}, which cannot be chosen automatically")]
    NonZeroConflict {
        flag_name: String,
        nutrient_names: Vec<String>,
    },

    #[error("Flag '{flag_name}' can only be undefined by undefining one of {nutrient_names:?}, and the choice is ambiguous")]
    MultipleUndefinedRelatedNutrients {
        flag_name: String,
        nutrient_names: Vec<String>,
    },

    #[error("Flag '{flag_name}' conflicts with nutrient ratios (to zero: {need_zero:?}, to undefine: {need_undefining:?}); retry with nutrient edits allowed")]
    FixableConflict {
        flag_name: String,
        need_zero: Vec<String>,
        need_undefining: Option<String>,
    },

    #[error(transparent)]
    Nutrient(#[from] NutrientError),
}
