use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::catalog::FlagCatalog;
use super::error::FlagError;

/// Stored values of the flags that are not direct aliases, for one subject.
/// A missing entry reads as undefined.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagDofState {
    values: BTreeMap<String, Option<bool>>,
}

impl FlagDofState {
    /// One undefined slot per flag that keeps a degree of freedom.
    pub fn for_catalog(flags: &FlagCatalog) -> Self {
        Self {
            values: flags
                .dof_flag_names()
                .into_iter()
                .map(|name| (name.to_string(), None))
                .collect(),
        }
    }

    /// Rebuilds the state from persisted values, keyed by any flag spelling.
    /// Entries for direct-alias flags carry no information and are dropped.
    pub fn from_values(
        flags: &FlagCatalog,
        values: &BTreeMap<String, Option<bool>>,
    ) -> Result<Self, FlagError> {
        let mut state = Self::for_catalog(flags);
        for (name, value) in values {
            let flag = flags.get(name)?;
            if flag.has_dof() {
                state.values.insert(flag.name().to_string(), *value);
            } else {
                tracing::warn!(flag = %flag.name(), "Ignoring stored value for direct-alias flag");
            }
        }
        Ok(state)
    }

    pub fn get(&self, flag_name: &str) -> Option<bool> {
        self.values.get(flag_name).copied().flatten()
    }

    pub(crate) fn set(&mut self, flag_name: &str, value: Option<bool>) {
        self.values.insert(flag_name.to_string(), value);
    }

    pub fn values(&self) -> &BTreeMap<String, Option<bool>> {
        &self.values
    }
}
