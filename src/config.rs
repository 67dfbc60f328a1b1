//! Static catalog configuration and runtime settings.
//!
//! The nutrient and flag catalogs are built once from a [`CatalogConfig`],
//! either the built-in table returned by `CatalogConfig::default()` or one
//! loaded from a JSON file. Malformed configuration is reported as a
//! [`ConfigError`] when the catalogs are built and the process should not
//! continue past that point.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::flags::FlagImplication;

pub const DATA_DIR_ENV_VAR: &str = "DIET_PLANNER_DATA_DIR";
pub const CONFIG_PATH_ENV_VAR: &str = "DIET_PLANNER_CONFIG";
const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Nutrient name declared more than once: {0}")]
    DuplicatePrimaryName(String),

    #[error("Alias '{alias}' collides with an existing nutrient name or alias")]
    AliasCollision { alias: String },

    #[error("Aliases declared for unknown nutrient: {0}")]
    UnknownAliasTarget(String),

    #[error("Group '{group}' references unknown nutrient '{member}'")]
    UnknownGroupMember { group: String, member: String },

    #[error("Group key is not a declared nutrient: {0}")]
    UnknownGroup(String),

    #[error("Calorie entry references unknown nutrient: {0}")]
    UnknownCalorieNutrient(String),

    #[error("Calories per gram for '{0}' must be a non-negative number")]
    InvalidCalories(String),

    #[error("Nutrient '{0}' is its own ascendant")]
    CyclicGroup(String),

    #[error("Flag declared more than once: {0}")]
    DuplicateFlag(String),

    #[error("Flag '{flag}' references unknown nutrient '{nutrient}'")]
    UnknownFlagNutrient { flag: String, nutrient: String },

    #[error("Flag '{0}' is a direct alias but has no nutrient relations")]
    DirectAliasWithoutNutrients(String),

    #[error("Name must not be empty")]
    EmptyName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagConfig {
    pub name: String,
    #[serde(default)]
    pub nutrient_relations: BTreeMap<String, FlagImplication>,
    #[serde(default)]
    pub direct_alias: bool,
}

/// Everything the catalogs are built from.
///
/// `nutrients` is a list rather than a map so duplicated names can be
/// reported instead of silently collapsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub nutrients: Vec<String>,
    #[serde(default)]
    pub aliases: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub calories_per_g: BTreeMap<String, f64>,
    #[serde(default)]
    pub flags: Vec<FlagConfig>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let nutrients = names(&[
            "protein",
            "histidine",
            "isoleucine",
            "leucine",
            "lysine",
            "methionine",
            "phenylalanine",
            "threonine",
            "tryptophan",
            "valine",
            "carbohydrate",
            "sugar",
            "glucose",
            "fructose",
            "sucrose",
            "lactose",
            "maltose",
            "galactose",
            "starch",
            "fibre",
            "fat",
            "saturated_fat",
            "monounsaturated_fat",
            "polyunsaturated_fat",
            "trans_fat",
            "omega_3",
            "omega_6",
            "cholesterol",
            "alcohol",
            "caffeine",
            "gluten",
            "water",
            "sodium",
            "potassium",
            "calcium",
            "iron",
            "magnesium",
            "zinc",
            "vitamin_a",
            "vitamin_b12",
            "vitamin_c",
            "vitamin_d",
        ]);

        let mut aliases = BTreeMap::new();
        aliases.insert("carbohydrate".into(), names(&["carbohydrates", "carbs"]));
        aliases.insert("sugar".into(), names(&["sugars", "total_sugars"]));
        aliases.insert("fibre".into(), names(&["fiber", "dietary_fibre"]));
        aliases.insert("saturated_fat".into(), names(&["sat_fat", "saturates"]));
        aliases.insert("monounsaturated_fat".into(), names(&["mufa"]));
        aliases.insert("polyunsaturated_fat".into(), names(&["pufa"]));
        aliases.insert("vitamin_c".into(), names(&["ascorbic_acid"]));
        aliases.insert("vitamin_b12".into(), names(&["cobalamin"]));
        aliases.insert("alcohol".into(), names(&["ethanol"]));

        let mut groups = BTreeMap::new();
        groups.insert(
            "protein".into(),
            names(&[
                "histidine",
                "isoleucine",
                "leucine",
                "lysine",
                "methionine",
                "phenylalanine",
                "threonine",
                "tryptophan",
                "valine",
            ]),
        );
        groups.insert("carbohydrate".into(), names(&["sugar", "starch"]));
        groups.insert(
            "sugar".into(),
            names(&["glucose", "fructose", "sucrose", "lactose", "maltose", "galactose"]),
        );
        groups.insert(
            "fat".into(),
            names(&["saturated_fat", "monounsaturated_fat", "polyunsaturated_fat", "trans_fat"]),
        );
        groups.insert("polyunsaturated_fat".into(), names(&["omega_3", "omega_6"]));

        let mut calories_per_g = BTreeMap::new();
        calories_per_g.insert("protein".into(), 4.0);
        calories_per_g.insert("carbohydrate".into(), 4.0);
        calories_per_g.insert("fat".into(), 9.0);
        calories_per_g.insert("alcohol".into(), 7.0);

        let direct = |name: &str, nutrient: &str| FlagConfig {
            name: name.to_string(),
            nutrient_relations: BTreeMap::from([(nutrient.to_string(), FlagImplication::Zero)]),
            direct_alias: true,
        };
        let flags = vec![
            direct("alcohol_free", "alcohol"),
            direct("caffeine_free", "caffeine"),
            direct("gluten_free", "gluten"),
            direct("lactose_free", "lactose"),
            direct("sugar_free", "sugar"),
            FlagConfig {
                name: "vegan".into(),
                nutrient_relations: BTreeMap::from([
                    ("cholesterol".to_string(), FlagImplication::Zero),
                    ("lactose".to_string(), FlagImplication::Zero),
                ]),
                direct_alias: false,
            },
            FlagConfig {
                name: "vegetarian".into(),
                nutrient_relations: BTreeMap::new(),
                direct_alias: false,
            },
            FlagConfig {
                name: "nut_free".into(),
                nutrient_relations: BTreeMap::new(),
                direct_alias: false,
            },
        ];

        Self {
            nutrients,
            aliases,
            groups,
            calories_per_g,
            flags,
        }
    }
}

/// Reads a catalog configuration from a JSON file.
pub async fn load_catalog_config(path: &Path) -> Result<CatalogConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read catalog config file {:?}", path))?;
    let config: CatalogConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse catalog config file {:?}", path))?;
    tracing::debug!(
        path = %path.display(),
        nutrients = config.nutrients.len(),
        flags = config.flags.len(),
        "Loaded catalog config"
    );
    Ok(config)
}

/// Runtime settings resolved from the environment (and a `.env` file, if any).
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub config_path: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self {
            data_dir: env::var(DATA_DIR_ENV_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR)),
            config_path: env::var(CONFIG_PATH_ENV_VAR).ok().map(PathBuf::from),
        }
    }
}
