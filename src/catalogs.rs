use crate::config::{CatalogConfig, ConfigError};
use crate::flags::FlagCatalog;
use crate::nutrients::{NutrientCatalog, RatioContext};
use crate::quantity::BulkProperties;

/// The nutrient and flag catalogs, built once at startup and passed by
/// reference to everything that needs them.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalogs {
    pub nutrients: NutrientCatalog,
    pub flags: FlagCatalog,
}

impl Catalogs {
    pub fn from_config(config: &CatalogConfig) -> Result<Self, ConfigError> {
        let nutrients = NutrientCatalog::build(config)?;
        let flags = FlagCatalog::build(config, &nutrients)?;
        tracing::info!(
            nutrients = nutrients.len(),
            flags = flags.len(),
            "Catalogs ready"
        );
        Ok(Self { nutrients, flags })
    }

    pub fn ratio_context(&self, bulk: BulkProperties) -> RatioContext<'_> {
        RatioContext::new(&self.nutrients, bulk)
    }
}
