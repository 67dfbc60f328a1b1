//! Flag/nutrient conflict resolution.
//!
//! Changing a flag must never leave it out of step with the nutrient ratios
//! that imply it. [`classify_conflicts`] works out which related ratios stand
//! in the way of a proposed value; [`set_flag_value`] decides whether those
//! conflicts can be fixed automatically, applies the fixes when allowed, and
//! restores every ratio if any fix fails.

use super::catalog::{Flag, FlagCatalog, FlagImplication};
use super::error::FlagError;
use crate::catalogs::Catalogs;
use crate::nutrients::{NutrientError, NutrientRatioStore, RatioContext, RatioState};
use crate::subject::SupportsFlags;

/// Related ratios standing in the way of one proposed flag value.
/// Only lives for the duration of a single flag change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictRecord {
    /// Ratios that must become zero.
    pub need_zero: Vec<String>,
    /// Ratios that must become non-zero; no value can be picked for them.
    pub need_non_zero: Vec<String>,
    /// The single ratio to undefine.
    pub need_undefining: Option<String>,
    /// Defined ratios when more than one would have to be undefined.
    pub preventing_undefine: Vec<String>,
    /// Undefined ratios that would have to become non-zero for the flag to be false.
    pub preventing_false: Vec<String>,
}

impl ConflictRecord {
    pub fn is_empty(&self) -> bool {
        self.need_zero.is_empty()
            && self.need_non_zero.is_empty()
            && self.need_undefining.is_none()
            && self.preventing_undefine.is_empty()
            && self.preventing_false.is_empty()
    }

    /// Whether any ratio has to be zeroed or undefined.
    pub fn has_fixes(&self) -> bool {
        !self.need_zero.is_empty() || self.need_undefining.is_some()
    }

    fn push_undefine_candidate(&mut self, nutrient: &str) {
        if let Some(prior) = self.need_undefining.take() {
            self.preventing_undefine.push(prior);
        }
        if self.preventing_undefine.is_empty() {
            self.need_undefining = Some(nutrient.to_string());
        } else {
            self.preventing_undefine.push(nutrient.to_string());
        }
    }
}

/// Current value of `flag` for `subject`.
pub fn flag_value<S>(flag: &Flag, subject: &S) -> Option<bool>
where
    S: SupportsFlags + ?Sized,
{
    flag.value(subject.nutrient_ratios(), subject.flag_dofs().get(flag.name()))
}

pub fn get_flag_value<S>(flags: &FlagCatalog, subject: &S, flag_name: &str) -> Result<Option<bool>, FlagError>
where
    S: SupportsFlags + ?Sized,
{
    Ok(flag_value(flags.get(flag_name)?, subject))
}

/// Buckets every ratio related to `flag` according to what it would take
/// for the flag to read `proposed`. Ratios that already agree are left out.
pub fn classify_conflicts<S>(flag: &Flag, proposed: Option<bool>, subject: &S) -> ConflictRecord
where
    S: SupportsFlags + ?Sized,
{
    use FlagImplication::{NonZero, Zero};
    use RatioState::{NonZero as IsNonZero, Undefined, Zero as IsZero};

    let ratios = subject.nutrient_ratios();
    let direct = flag.direct_alias();
    let mut record = ConflictRecord::default();

    for (nutrient, implication) in flag.nutrient_relations() {
        let state = RatioState::of(ratios.data().get(nutrient));
        match proposed {
            None => {
                let contradicts = implication.agrees_with(state) == Some(false);
                if state.is_defined() && (direct || contradicts) {
                    record.push_undefine_candidate(nutrient);
                }
            }
            Some(true) => match (implication, state) {
                (Zero, IsNonZero) => record.need_zero.push(nutrient.clone()),
                (Zero, Undefined) if direct => record.need_zero.push(nutrient.clone()),
                (NonZero, IsZero) => record.need_non_zero.push(nutrient.clone()),
                (NonZero, Undefined) if direct => record.need_non_zero.push(nutrient.clone()),
                _ => {}
            },
            Some(false) => match (implication, state) {
                (Zero, IsZero) => record.need_non_zero.push(nutrient.clone()),
                (NonZero, IsNonZero) => record.need_zero.push(nutrient.clone()),
                (Zero, Undefined) if direct => record.preventing_false.push(nutrient.clone()),
                (NonZero, Undefined) if direct => record.need_zero.push(nutrient.clone()),
                _ => {}
            },
        }
    }

    tracing::debug!(flag = %flag.name(), ?proposed, conflicts = ?record, "Classified flag conflicts");
    record
}

fn apply_edits(
    ctx: &RatioContext<'_>,
    ratios: &mut NutrientRatioStore,
    conflicts: &ConflictRecord,
) -> Result<(), NutrientError> {
    if let Some(nutrient) = &conflicts.need_undefining {
        ratios.undefine(ctx, nutrient)?;
    }
    for nutrient in &conflicts.need_zero {
        ratios.zero(ctx, nutrient)?;
    }
    Ok(())
}

/// Sets `flag_name` to `proposed` on `subject`.
///
/// Zeroing or undefining related ratios only happens with
/// `allow_nutrient_edits`; without it a fixable conflict is returned so the
/// caller can ask and retry. All edits for one call succeed together or are
/// all rolled back.
pub fn set_flag_value<S>(
    catalogs: &Catalogs,
    subject: &mut S,
    flag_name: &str,
    proposed: Option<bool>,
    allow_nutrient_edits: bool,
) -> Result<(), FlagError>
where
    S: SupportsFlags + ?Sized,
{
    let flag = catalogs.flags.get(flag_name)?;
    if flag_value(flag, subject) == proposed {
        return Ok(());
    }

    let conflicts = classify_conflicts(flag, proposed, subject);

    if !conflicts.need_non_zero.is_empty() || !conflicts.preventing_false.is_empty() {
        return Err(FlagError::NonZeroConflict {
            flag_name: flag.name().to_string(),
            nutrient_names: conflicts
                .need_non_zero
                .iter()
                .chain(conflicts.preventing_false.iter())
                .cloned()
                .collect(),
        });
    }
    if !conflicts.preventing_undefine.is_empty() {
        return Err(FlagError::MultipleUndefinedRelatedNutrients {
            flag_name: flag.name().to_string(),
            nutrient_names: conflicts.preventing_undefine,
        });
    }
    if conflicts.has_fixes() {
        if !allow_nutrient_edits {
            return Err(FlagError::FixableConflict {
                flag_name: flag.name().to_string(),
                need_zero: conflicts.need_zero,
                need_undefining: conflicts.need_undefining,
            });
        }

        let snapshot = subject.nutrient_ratios().clone();
        let ctx = catalogs.ratio_context(subject.bulk());
        if let Err(err) = apply_edits(&ctx, subject.nutrient_ratios_mut(), &conflicts) {
            *subject.nutrient_ratios_mut() = snapshot;
            tracing::debug!(flag = %flag.name(), error = %err, "Rolled back nutrient edits for flag");
            return Err(err.into());
        }
        tracing::info!(
            flag = %flag.name(),
            zeroed = ?conflicts.need_zero,
            undefined = ?conflicts.need_undefining,
            "Edited nutrient ratios to satisfy flag"
        );
    }

    if flag.has_dof() {
        subject.flag_dofs_mut().set(flag.name(), proposed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CatalogConfig, FlagConfig};
    use crate::subject::Ingredient;
    use std::collections::BTreeMap;

    fn catalogs() -> Catalogs {
        let nutrients = ["foo", "foobing", "foobar", "zam"];
        let config = CatalogConfig {
            nutrients: nutrients.iter().map(|s| s.to_string()).collect(),
            aliases: BTreeMap::new(),
            groups: BTreeMap::from([("zam".to_string(), vec!["foobar".to_string()])]),
            calories_per_g: BTreeMap::new(),
            flags: vec![
                FlagConfig {
                    name: "foo_free".to_string(),
                    nutrient_relations: BTreeMap::from([
                        ("foo".to_string(), FlagImplication::Zero),
                        ("foobing".to_string(), FlagImplication::NonZero),
                        ("foobar".to_string(), FlagImplication::Zero),
                    ]),
                    direct_alias: true,
                },
                FlagConfig {
                    name: "foo_ish".to_string(),
                    nutrient_relations: BTreeMap::from([
                        ("foo".to_string(), FlagImplication::NonZero),
                        ("foobar".to_string(), FlagImplication::Zero),
                    ]),
                    direct_alias: false,
                },
                FlagConfig {
                    name: "foo_zam_free".to_string(),
                    nutrient_relations: BTreeMap::from([
                        ("foo".to_string(), FlagImplication::Zero),
                        ("zam".to_string(), FlagImplication::Zero),
                    ]),
                    direct_alias: true,
                },
            ],
        };
        Catalogs::from_config(&config).unwrap()
    }

    fn with_ratios(catalogs: &Catalogs, ratios: &[(&str, f64)]) -> Ingredient {
        let mut ingredient = Ingredient::new("test", catalogs);
        for (name, g_per_g) in ratios {
            ingredient
                .set_nutrient_ratio(catalogs, name, Some(g_per_g * 100.0), "g", 100.0, "g")
                .unwrap();
        }
        ingredient
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_classify_true_collects_nutrients_to_zero() {
        let catalogs = catalogs();
        let ingredient = with_ratios(&catalogs, &[("foo", 0.2), ("foobing", 0.9), ("foobar", 0.1)]);
        let flag = catalogs.flags.get("foo_free").unwrap();

        let record = classify_conflicts(flag, Some(true), &ingredient);
        assert_eq!(
            record,
            ConflictRecord {
                need_zero: names(&["foo", "foobar"]),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_classify_true_on_undefined_direct_alias_relations() {
        let catalogs = catalogs();
        let ingredient = with_ratios(&catalogs, &[]);
        let flag = catalogs.flags.get("foo_free").unwrap();

        let record = classify_conflicts(flag, Some(true), &ingredient);
        assert_eq!(record.need_zero, names(&["foo", "foobar"]));
        assert_eq!(record.need_non_zero, names(&["foobing"]));
    }

    #[test]
    fn test_classify_none_with_one_and_many_defined() {
        let catalogs = catalogs();
        let flag = catalogs.flags.get("foo_free").unwrap();

        let one = with_ratios(&catalogs, &[("foo", 0.0)]);
        let record = classify_conflicts(flag, None, &one);
        assert_eq!(record.need_undefining, Some("foo".to_string()));
        assert!(record.preventing_undefine.is_empty());

        let many = with_ratios(&catalogs, &[("foo", 0.0), ("foobing", 0.3), ("foobar", 0.0)]);
        let record = classify_conflicts(flag, None, &many);
        assert_eq!(record.need_undefining, None);
        assert_eq!(record.preventing_undefine, names(&["foo", "foobar", "foobing"]));
    }

    #[test]
    fn test_none_on_dof_flag_undefines_only_contradicting_ratio() {
        let catalogs = catalogs();
        let flag = catalogs.flags.get("foo_ish").unwrap();
        let mut ingredient = with_ratios(&catalogs, &[("foo", 0.3), ("foobar", 0.2)]);
        assert_eq!(flag_value(flag, &ingredient), Some(false));

        let record = classify_conflicts(flag, None, &ingredient);
        assert_eq!(record.need_undefining, Some("foobar".to_string()));
        assert!(record.preventing_undefine.is_empty());

        set_flag_value(&catalogs, &mut ingredient, "foo_ish", None, true).unwrap();
        assert_eq!(ingredient.get_flag_value(&catalogs, "foo_ish").unwrap(), None);
        assert!(!ingredient.nutrient_ratio_lookup(&catalogs, "foobar").unwrap().is_defined());
        assert!(ingredient.nutrient_ratio_lookup(&catalogs, "foo").unwrap().is_defined());
    }

    #[test]
    fn test_classify_false_on_direct_alias() {
        let catalogs = catalogs();
        let flag = catalogs.flags.get("foo_free").unwrap();
        let ingredient = with_ratios(&catalogs, &[("foo", 0.0), ("foobing", 0.5)]);

        let record = classify_conflicts(flag, Some(false), &ingredient);
        assert_eq!(record.need_non_zero, names(&["foo"]));
        assert_eq!(record.need_zero, names(&["foobing"]));
        assert_eq!(record.preventing_false, names(&["foobar"]));
    }

    #[test]
    fn test_classify_false_on_dof_flag_ignores_undefined() {
        let catalogs = catalogs();
        let flag = catalogs.flags.get("foo_ish").unwrap();
        let ingredient = with_ratios(&catalogs, &[("foo", 0.3), ("foobar", 0.0)]);
        let record = classify_conflicts(flag, Some(false), &ingredient);
        assert_eq!(record.need_zero, names(&["foo"]));
        assert_eq!(record.need_non_zero, names(&["foobar"]));
        assert!(record.preventing_false.is_empty());

        let empty = with_ratios(&catalogs, &[]);
        assert!(classify_conflicts(flag, Some(false), &empty).is_empty());
    }

    #[test]
    fn test_set_flag_value_is_noop_when_unchanged() {
        let catalogs = catalogs();
        let mut ingredient = with_ratios(&catalogs, &[("foo", 0.2)]);
        let before = ingredient.clone();
        let current = ingredient.get_flag_value(&catalogs, "foo_free").unwrap();
        assert_eq!(current, Some(false));

        set_flag_value(&catalogs, &mut ingredient, "foo_free", current, false).unwrap();
        assert_eq!(ingredient, before);
    }

    #[test]
    fn test_fixable_conflict_requires_permission() {
        let catalogs = catalogs();
        let mut ingredient = with_ratios(&catalogs, &[("foo", 0.2), ("foobing", 0.9), ("foobar", 0.1)]);
        let before = ingredient.clone();

        let err = set_flag_value(&catalogs, &mut ingredient, "foo_free", Some(true), false).unwrap_err();
        assert_eq!(
            err,
            FlagError::FixableConflict {
                flag_name: "foo_free".to_string(),
                need_zero: names(&["foo", "foobar"]),
                need_undefining: None,
            }
        );
        assert_eq!(ingredient, before);

        set_flag_value(&catalogs, &mut ingredient, "foo_free", Some(true), true).unwrap();
        assert_eq!(ingredient.get_flag_value(&catalogs, "foo_free").unwrap(), Some(true));
        assert!(ingredient.get_nutrient_ratio(&catalogs, "foo").unwrap().is_zero());
        assert!(ingredient.get_nutrient_ratio(&catalogs, "foobar").unwrap().is_zero());
    }

    #[test]
    fn test_non_zero_conflict_is_unfixable() {
        let catalogs = catalogs();
        let mut ingredient = with_ratios(&catalogs, &[("foobing", 0.0)]);
        let err = set_flag_value(&catalogs, &mut ingredient, "foo_free", Some(true), true).unwrap_err();
        assert!(matches!(err, FlagError::NonZeroConflict { ref nutrient_names, .. } if nutrient_names == &names(&["foobing"])));
        assert_eq!(ingredient.get_flag_value(&catalogs, "foo_free").unwrap(), Some(false));
    }

    #[test]
    fn test_undefine_single_related_nutrient() {
        let catalogs = catalogs();
        let mut ingredient = with_ratios(&catalogs, &[("foo", 0.0)]);
        // foo is zero, foobing and foobar undefined: already undefined overall
        assert_eq!(ingredient.get_flag_value(&catalogs, "foo_free").unwrap(), None);

        let mut defined = with_ratios(&catalogs, &[("foo", 0.4)]);
        assert_eq!(defined.get_flag_value(&catalogs, "foo_free").unwrap(), Some(false));
        set_flag_value(&catalogs, &mut defined, "foo_free", None, true).unwrap();
        assert_eq!(defined.get_flag_value(&catalogs, "foo_free").unwrap(), None);
        assert!(!defined.nutrient_ratio_lookup(&catalogs, "foo").unwrap().is_defined());

        set_flag_value(&catalogs, &mut ingredient, "foo_free", None, false).unwrap();
    }

    #[test]
    fn test_multiple_undefine_candidates_are_ambiguous() {
        let catalogs = catalogs();
        let mut ingredient = with_ratios(&catalogs, &[("foo", 0.4), ("foobar", 0.0)]);
        let err = set_flag_value(&catalogs, &mut ingredient, "foo_free", None, true).unwrap_err();
        assert_eq!(
            err,
            FlagError::MultipleUndefinedRelatedNutrients {
                flag_name: "foo_free".to_string(),
                nutrient_names: names(&["foo", "foobar"]),
            }
        );
    }

    #[test]
    fn test_failed_edit_rolls_back_every_ratio() {
        let catalogs = catalogs();
        // Zeroing foo succeeds, zeroing zam cannot: its child foobar is stated.
        let mut ingredient = with_ratios(&catalogs, &[("foo", 0.2), ("foobar", 0.1), ("zam", 0.1)]);
        let before = ingredient.clone();

        let err = set_flag_value(&catalogs, &mut ingredient, "foo_zam_free", Some(true), true).unwrap_err();
        assert_eq!(
            err,
            FlagError::Nutrient(NutrientError::ChildNutrientExceedsParentMass {
                group_name: "zam".to_string()
            })
        );
        assert_eq!(ingredient, before);
        assert!(!ingredient.get_nutrient_ratio(&catalogs, "foo").unwrap().is_zero());
    }

    #[test]
    fn test_dof_flag_stores_value() {
        let catalogs = catalogs();
        let mut ingredient = with_ratios(&catalogs, &[]);
        assert_eq!(ingredient.get_flag_value(&catalogs, "foo_ish").unwrap(), None);

        set_flag_value(&catalogs, &mut ingredient, "foo_ish", Some(true), false).unwrap();
        assert_eq!(ingredient.get_flag_value(&catalogs, "foo_ish").unwrap(), Some(true));

        set_flag_value(&catalogs, &mut ingredient, "foo_ish", Some(false), false).unwrap();
        assert_eq!(ingredient.get_flag_value(&catalogs, "foo_ish").unwrap(), Some(false));
    }

    #[test]
    fn test_dof_flag_false_zeroes_agreeing_non_zero_ratio() {
        let catalogs = catalogs();
        let mut ingredient = with_ratios(&catalogs, &[("foo", 0.3)]);
        set_flag_value(&catalogs, &mut ingredient, "foo_ish", Some(true), false).unwrap();

        let err = set_flag_value(&catalogs, &mut ingredient, "foo_ish", Some(false), false).unwrap_err();
        assert!(matches!(err, FlagError::FixableConflict { ref need_zero, .. } if need_zero == &names(&["foo"])));
        assert_eq!(ingredient.get_flag_value(&catalogs, "foo_ish").unwrap(), Some(true));

        set_flag_value(&catalogs, &mut ingredient, "foo_ish", Some(false), true).unwrap();
        assert!(ingredient.get_nutrient_ratio(&catalogs, "foo").unwrap().is_zero());
        assert_eq!(ingredient.get_flag_value(&catalogs, "foo_ish").unwrap(), Some(false));
    }

    #[test]
    fn test_dof_flag_true_zeroes_contradicting_ratio() {
        let catalogs = catalogs();
        let mut ingredient = with_ratios(&catalogs, &[("foo", 0.3), ("foobar", 0.2)]);
        assert_eq!(ingredient.get_flag_value(&catalogs, "foo_ish").unwrap(), Some(false));

        set_flag_value(&catalogs, &mut ingredient, "foo_ish", Some(true), true).unwrap();
        assert!(ingredient.get_nutrient_ratio(&catalogs, "foobar").unwrap().is_zero());
        assert_eq!(ingredient.get_flag_value(&catalogs, "foo_ish").unwrap(), Some(true));
    }
}
