use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::error::FlagError;
use crate::config::{CatalogConfig, ConfigError};
use crate::nutrients::{normalise_name, NutrientCatalog, NutrientRatioStore, RatioState};

/// What a flag being true says about one related nutrient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagImplication {
    Zero,
    NonZero,
}

impl FlagImplication {
    /// `None` when the ratio is undefined and so neither agrees nor disagrees.
    pub fn agrees_with(&self, state: RatioState) -> Option<bool> {
        match (self, state) {
            (_, RatioState::Undefined) => None,
            (FlagImplication::Zero, RatioState::Zero) | (FlagImplication::NonZero, RatioState::NonZero) => {
                Some(true)
            }
            _ => Some(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Flag {
    name: String,
    nutrient_relations: BTreeMap<String, FlagImplication>,
    direct_alias: bool,
}

impl Flag {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Related nutrients keyed by primary name.
    pub fn nutrient_relations(&self) -> &BTreeMap<String, FlagImplication> {
        &self.nutrient_relations
    }

    pub fn direct_alias(&self) -> bool {
        self.direct_alias
    }

    /// Whether the flag keeps an independently stored value per subject.
    pub fn has_dof(&self) -> bool {
        !self.direct_alias
    }

    /// The flag's value for a subject holding `ratios`, with `dof` as the
    /// stored value for flags that keep one.
    ///
    /// Any related ratio contradicting its implication makes the flag false.
    /// Otherwise a direct alias is true once every related ratio is defined
    /// (and undefined until then), and any other flag falls back to `dof`.
    pub fn value(&self, ratios: &NutrientRatioStore, dof: Option<bool>) -> Option<bool> {
        let mut any_undefined = false;
        for (nutrient, implication) in &self.nutrient_relations {
            match implication.agrees_with(RatioState::of(ratios.data().get(nutrient))) {
                Some(false) => return Some(false),
                Some(true) => {}
                None => any_undefined = true,
            }
        }
        if !self.direct_alias {
            dof
        } else if any_undefined {
            None
        } else {
            Some(true)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlagCatalog {
    flags: BTreeMap<String, Flag>,
}

impl FlagCatalog {
    pub fn build(config: &CatalogConfig, nutrients: &NutrientCatalog) -> Result<Self, ConfigError> {
        let mut flags = BTreeMap::new();
        for flag_config in &config.flags {
            let name = normalise_name(&flag_config.name);
            if name.is_empty() {
                return Err(ConfigError::EmptyName);
            }
            if flags.contains_key(&name) {
                return Err(ConfigError::DuplicateFlag(name));
            }

            let mut nutrient_relations = BTreeMap::new();
            for (nutrient, implication) in &flag_config.nutrient_relations {
                let primary = nutrients.resolve_primary_name(nutrient).map_err(|_| {
                    ConfigError::UnknownFlagNutrient {
                        flag: name.clone(),
                        nutrient: nutrient.clone(),
                    }
                })?;
                nutrient_relations.insert(primary, *implication);
            }
            if flag_config.direct_alias && nutrient_relations.is_empty() {
                return Err(ConfigError::DirectAliasWithoutNutrients(name));
            }

            flags.insert(
                name.clone(),
                Flag {
                    name,
                    nutrient_relations,
                    direct_alias: flag_config.direct_alias,
                },
            );
        }
        tracing::debug!(flags = flags.len(), "Built flag catalog");
        Ok(Self { flags })
    }

    pub fn get(&self, name: &str) -> Result<&Flag, FlagError> {
        self.flags
            .get(&normalise_name(name))
            .ok_or_else(|| FlagError::NameNotRecognised(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.flags.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.values()
    }

    /// Flags that keep a per-subject degree of freedom.
    pub fn dof_flag_names(&self) -> BTreeSet<&str> {
        self.flags
            .values()
            .filter(|f| f.has_dof())
            .map(Flag::name)
            .collect()
    }

    /// Flags whose value depends on the given nutrient.
    pub fn flags_related_to<'a>(&'a self, primary_name: &'a str) -> impl Iterator<Item = &'a Flag> + 'a {
        self.flags
            .values()
            .filter(move |f| f.nutrient_relations.contains_key(primary_name))
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}
