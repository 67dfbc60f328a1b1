//! Family mass validation.
//!
//! A group nutrient (e.g. "sugar") can never weigh less than the sum of what
//! its children provably contribute. Contributions are lower bounds: a child
//! with a stated mass contributes that mass, an unstated child that is itself
//! a group contributes its own provable minimum, and anything else
//! contributes nothing. The check therefore never needs every leaf to be
//! defined.

use std::collections::BTreeMap;

use super::catalog::NutrientCatalog;
use super::error::NutrientError;
use super::ratio::MassLookup;
use crate::subject::SupportsNutrientRatios;

/// Absorbs float noise such as `0.06 + 0.04 > 0.1`.
pub(crate) const MASS_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
struct FamilyEntry {
    stated_value: Option<f64>,
    min_value: f64,
    // min_value has been summed from the children
    done: bool,
    // stated_value has been compared against min_value
    checked: bool,
}

struct FamilyWalk<'a, F> {
    catalog: &'a NutrientCatalog,
    entries: BTreeMap<String, FamilyEntry>,
    mass_of: F,
}

impl<'a, F> FamilyWalk<'a, F>
where
    F: FnMut(&str) -> Result<MassLookup, NutrientError>,
{
    fn stated(&mut self, name: &str) -> Result<Option<f64>, NutrientError> {
        if let Some(entry) = self.entries.get(name) {
            return Ok(entry.stated_value);
        }
        let stated_value = (self.mass_of)(name)?.value();
        self.entries.insert(
            name.to_string(),
            FamilyEntry {
                stated_value,
                min_value: 0.0,
                done: false,
                checked: false,
            },
        );
        Ok(stated_value)
    }

    fn min_value(&mut self, name: &str) -> Result<f64, NutrientError> {
        self.stated(name)?;
        if let Some(entry) = self.entries.get(name) {
            if entry.done {
                return Ok(entry.min_value);
            }
        }

        let children: Vec<String> = self.catalog.get(name)?.children().iter().cloned().collect();
        let mut min_value = 0.0;
        for child in &children {
            min_value += match self.stated(child)? {
                Some(stated) => stated,
                None => self.min_value(child)?,
            };
        }

        if let Some(entry) = self.entries.get_mut(name) {
            entry.min_value = min_value;
            entry.done = true;
        }
        Ok(min_value)
    }

    fn walk_up(&mut self, name: &str) -> Result<(), NutrientError> {
        let parents: Vec<String> = self.catalog.get(name)?.parents().iter().cloned().collect();
        for parent in parents {
            if self.entries.get(&parent).is_some_and(|e| e.checked) {
                continue;
            }
            let min_value = self.min_value(&parent)?;
            let stated = self.stated(&parent)?;
            if let Some(entry) = self.entries.get_mut(&parent) {
                entry.checked = true;
            }
            if let Some(stated) = stated {
                if min_value > stated + MASS_TOLERANCE {
                    tracing::debug!(
                        group = %parent,
                        stated,
                        min_value,
                        "Children exceed group mass"
                    );
                    return Err(NutrientError::ChildNutrientExceedsParentMass { group_name: parent });
                }
            }
            self.walk_up(&parent)?;
        }
        Ok(())
    }
}

/// Checks every group in the family of `nutrient_name` against the masses
/// reported by `mass_of` (grams of nutrient per gram of subject).
///
/// Read-only: callers that mutated state before calling this are
/// responsible for restoring it when an error comes back.
pub fn validate_family_masses<F>(
    catalog: &NutrientCatalog,
    nutrient_name: &str,
    mass_of: F,
) -> Result<(), NutrientError>
where
    F: FnMut(&str) -> Result<MassLookup, NutrientError>,
{
    let nutrient = catalog.get(nutrient_name)?;
    let members: Vec<String> = std::iter::once(nutrient.primary_name().to_string())
        .chain(nutrient.relatives().iter().cloned())
        .collect();

    let mut walk = FamilyWalk {
        catalog,
        entries: BTreeMap::new(),
        mass_of,
    };
    for member in &members {
        walk.stated(member)?;
    }

    let mut endpoints = Vec::new();
    for member in &members {
        if !catalog.get(member)?.is_group() {
            endpoints.push(member);
        }
    }
    for endpoint in endpoints {
        walk.walk_up(endpoint)?;
    }
    Ok(())
}

/// [`validate_family_masses`] against the ratios a subject currently holds.
pub fn validate_subject_family_masses<S>(
    catalog: &NutrientCatalog,
    subject: &S,
    nutrient_name: &str,
) -> Result<(), NutrientError>
where
    S: SupportsNutrientRatios + ?Sized,
{
    let bulk = subject.bulk();
    let ratios = subject.nutrient_ratios();
    validate_family_masses(catalog, nutrient_name, |name| ratios.mass_of(&bulk, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogConfig;

    fn fixture_catalog() -> NutrientCatalog {
        let config = CatalogConfig {
            nutrients: ["regatur", "tirbur", "cufmagif", "docbe", "bar", "busskie", "bingtong"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            aliases: BTreeMap::new(),
            groups: BTreeMap::from([
                ("regatur".to_string(), vec!["tirbur".to_string(), "cufmagif".to_string()]),
                ("docbe".to_string(), vec!["regatur".to_string(), "bar".to_string()]),
                ("busskie".to_string(), vec!["bingtong".to_string(), "tirbur".to_string()]),
            ]),
            calories_per_g: BTreeMap::new(),
            flags: vec![],
        };
        NutrientCatalog::build(&config).unwrap()
    }

    fn check(catalog: &NutrientCatalog, nutrient: &str, masses: &[(&str, f64)]) -> Result<(), NutrientError> {
        let masses: BTreeMap<String, f64> = masses.iter().map(|(n, m)| (n.to_string(), *m)).collect();
        validate_family_masses(catalog, nutrient, |name| {
            Ok(masses.get(name).map_or(MassLookup::Undefined, |m| MassLookup::Defined(*m)))
        })
    }

    #[test]
    fn test_children_exceeding_group_is_detected() {
        let catalog = fixture_catalog();
        let result = check(&catalog, "bar", &[("docbe", 0.10), ("regatur", 0.06), ("bar", 0.06)]);
        assert_eq!(
            result.unwrap_err(),
            NutrientError::ChildNutrientExceedsParentMass { group_name: "docbe".to_string() }
        );
    }

    #[test]
    fn test_undefined_children_contribute_nothing() {
        let catalog = fixture_catalog();
        assert!(check(&catalog, "bar", &[("docbe", 0.10), ("bar", 0.04)]).is_ok());
        assert!(check(&catalog, "docbe", &[("docbe", 0.10), ("bar", 0.04)]).is_ok());
    }

    #[test]
    fn test_undefined_group_contributes_its_own_minimum() {
        let catalog = fixture_catalog();
        // regatur is unstated but its children prove at least 0.09.
        let result = check(
            &catalog,
            "bar",
            &[("docbe", 0.10), ("tirbur", 0.05), ("cufmagif", 0.04), ("bar", 0.02)],
        );
        assert_eq!(
            result.unwrap_err(),
            NutrientError::ChildNutrientExceedsParentMass { group_name: "docbe".to_string() }
        );
    }

    #[test]
    fn test_each_parent_of_a_multi_parent_child_is_checked() {
        let catalog = fixture_catalog();
        let result = check(&catalog, "tirbur", &[("tirbur", 0.3), ("regatur", 0.5), ("busskie", 0.2)]);
        assert_eq!(
            result.unwrap_err(),
            NutrientError::ChildNutrientExceedsParentMass { group_name: "busskie".to_string() }
        );
    }

    #[test]
    fn test_group_checked_when_its_own_mass_changes() {
        let catalog = fixture_catalog();
        let result = check(&catalog, "regatur", &[("regatur", 0.01), ("tirbur", 0.02)]);
        assert_eq!(
            result.unwrap_err(),
            NutrientError::ChildNutrientExceedsParentMass { group_name: "regatur".to_string() }
        );
    }

    #[test]
    fn test_exact_fit_passes_despite_float_noise() {
        let catalog = fixture_catalog();
        assert!(check(&catalog, "bar", &[("docbe", 0.1), ("regatur", 0.06), ("bar", 0.04)]).is_ok());
    }

    #[test]
    fn test_unknown_nutrient_is_reported() {
        let catalog = fixture_catalog();
        assert_eq!(
            check(&catalog, "nope", &[]).unwrap_err(),
            NutrientError::NameNotRecognised("nope".to_string())
        );
    }

    #[test]
    fn test_mass_lookup_errors_propagate() {
        let catalog = fixture_catalog();
        let result = validate_family_masses(&catalog, "bar", |_| {
            Err(NutrientError::UndefinedNutrientRatio("bar".to_string()))
        });
        assert!(result.is_err());
    }
}
