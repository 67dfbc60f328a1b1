use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::error::NutrientError;
use crate::config::{CatalogConfig, ConfigError};

/// Canonical form of a user-supplied name: trimmed, lower-case, with spaces
/// and hyphens turned into underscores.
pub fn normalise_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// One entry of the nutrient arena. Relationships are stored as primary
/// names, never as references to other entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Nutrient {
    primary_name: String,
    aliases: Vec<String>,
    calories_per_g: f64,
    children: BTreeSet<String>,
    parents: BTreeSet<String>,
    siblings: BTreeSet<String>,
    ascendants: BTreeSet<String>,
    descendants: BTreeSet<String>,
    relatives: BTreeSet<String>,
}

impl Nutrient {
    pub fn primary_name(&self) -> &str {
        &self.primary_name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn calories_per_g(&self) -> f64 {
        self.calories_per_g
    }

    pub fn children(&self) -> &BTreeSet<String> {
        &self.children
    }

    pub fn parents(&self) -> &BTreeSet<String> {
        &self.parents
    }

    pub fn siblings(&self) -> &BTreeSet<String> {
        &self.siblings
    }

    pub fn ascendants(&self) -> &BTreeSet<String> {
        &self.ascendants
    }

    pub fn descendants(&self) -> &BTreeSet<String> {
        &self.descendants
    }

    /// Ascendants, descendants and siblings together, excluding the nutrient itself.
    pub fn relatives(&self) -> &BTreeSet<String> {
        &self.relatives
    }

    pub fn is_group(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Read-only table of every known nutrient, indexed by primary name.
#[derive(Debug, Clone, PartialEq)]
pub struct NutrientCatalog {
    nutrients: BTreeMap<String, Nutrient>,
    alias_index: HashMap<String, String>,
}

/// Depth-first closure over `edges` starting from (and excluding) `start`.
/// The visited set keeps this finite even if the edges contain a cycle.
fn collect_transitive(start: &str, edges: &BTreeMap<String, BTreeSet<String>>) -> BTreeSet<String> {
    let mut visited = BTreeSet::new();
    let mut stack: Vec<&str> = edges
        .get(start)
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect();
    while let Some(next) = stack.pop() {
        if visited.insert(next.to_string()) {
            if let Some(more) = edges.get(next) {
                stack.extend(more.iter().map(String::as_str));
            }
        }
    }
    visited
}

impl NutrientCatalog {
    pub fn build(config: &CatalogConfig) -> Result<Self, ConfigError> {
        let mut primary: BTreeSet<String> = BTreeSet::new();
        for raw in &config.nutrients {
            let name = normalise_name(raw);
            if name.is_empty() {
                return Err(ConfigError::EmptyName);
            }
            if !primary.insert(name.clone()) {
                return Err(ConfigError::DuplicatePrimaryName(name));
            }
        }

        let mut alias_index: HashMap<String, String> = HashMap::new();
        let mut aliases_of: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (target, alias_list) in &config.aliases {
            let target = normalise_name(target);
            if !primary.contains(&target) {
                return Err(ConfigError::UnknownAliasTarget(target));
            }
            for alias in alias_list {
                let alias = normalise_name(alias);
                if alias.is_empty() {
                    return Err(ConfigError::EmptyName);
                }
                if primary.contains(&alias) || alias_index.contains_key(&alias) {
                    return Err(ConfigError::AliasCollision { alias });
                }
                alias_index.insert(alias.clone(), target.clone());
                aliases_of.entry(target.clone()).or_default().push(alias);
            }
        }

        let mut children: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut parents: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (group, members) in &config.groups {
            let group = normalise_name(group);
            if !primary.contains(&group) {
                return Err(ConfigError::UnknownGroup(group));
            }
            for member in members {
                let member = normalise_name(member);
                if !primary.contains(&member) {
                    return Err(ConfigError::UnknownGroupMember { group, member });
                }
                children.entry(group.clone()).or_default().insert(member.clone());
                parents.entry(member).or_default().insert(group.clone());
            }
        }

        let mut calories: BTreeMap<String, f64> = BTreeMap::new();
        for (name, kcal) in &config.calories_per_g {
            let name = normalise_name(name);
            if !primary.contains(&name) {
                return Err(ConfigError::UnknownCalorieNutrient(name));
            }
            if !kcal.is_finite() || *kcal < 0.0 {
                return Err(ConfigError::InvalidCalories(name));
            }
            calories.insert(name, *kcal);
        }

        let mut nutrients = BTreeMap::new();
        for name in &primary {
            let ascendants = collect_transitive(name, &parents);
            if ascendants.contains(name) {
                return Err(ConfigError::CyclicGroup(name.clone()));
            }
            let descendants = collect_transitive(name, &children);
            let direct_parents = parents.get(name).cloned().unwrap_or_default();
            let siblings: BTreeSet<String> = direct_parents
                .iter()
                .filter_map(|parent| children.get(parent))
                .flatten()
                .filter(|sibling| *sibling != name)
                .cloned()
                .collect();
            let mut relatives: BTreeSet<String> = ascendants
                .iter()
                .chain(descendants.iter())
                .chain(siblings.iter())
                .cloned()
                .collect();
            relatives.remove(name);

            nutrients.insert(
                name.clone(),
                Nutrient {
                    primary_name: name.clone(),
                    aliases: aliases_of.remove(name).unwrap_or_default(),
                    calories_per_g: calories.get(name).copied().unwrap_or(0.0),
                    children: children.get(name).cloned().unwrap_or_default(),
                    parents: direct_parents,
                    siblings,
                    ascendants,
                    descendants,
                    relatives,
                },
            );
        }

        tracing::debug!(
            nutrients = nutrients.len(),
            aliases = alias_index.len(),
            groups = children.len(),
            "Built nutrient catalog"
        );
        Ok(Self {
            nutrients,
            alias_index,
        })
    }

    /// Normalises `name` and resolves aliases to the primary name.
    pub fn resolve_primary_name(&self, name: &str) -> Result<String, NutrientError> {
        let normalised = normalise_name(name);
        if self.nutrients.contains_key(&normalised) {
            return Ok(normalised);
        }
        self.alias_index
            .get(&normalised)
            .cloned()
            .ok_or_else(|| NutrientError::NameNotRecognised(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Result<&Nutrient, NutrientError> {
        let primary = self.resolve_primary_name(name)?;
        self.nutrients
            .get(&primary)
            .ok_or(NutrientError::NameNotRecognised(primary))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve_primary_name(name).is_ok()
    }

    pub fn calories_per_gram(&self, name: &str) -> Result<f64, NutrientError> {
        Ok(self.get(name)?.calories_per_g())
    }

    pub fn primary_names(&self) -> impl Iterator<Item = &str> {
        self.nutrients.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Nutrient> {
        self.nutrients.values()
    }

    /// Nutrients with a non-zero energy density.
    pub fn caloric_nutrients(&self) -> impl Iterator<Item = &Nutrient> {
        self.nutrients.values().filter(|n| n.calories_per_g > 0.0)
    }

    pub fn len(&self) -> usize {
        self.nutrients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nutrients.is_empty()
    }
}
