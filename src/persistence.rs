use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::nutrients::{normalise_name, NutrientRatioData};
use crate::quantity::BulkProperties;

const RECORD_EXTENSION: &str = "json";

/// Persisted form of an ingredient. Only the data that cannot be derived
/// from the catalogs is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientRecord {
    pub name: String,
    #[serde(default)]
    pub bulk: BulkProperties,
    #[serde(default)]
    pub nutrient_ratios: BTreeMap<String, NutrientRatioData>,
    #[serde(default)]
    pub flag_dofs: BTreeMap<String, Option<bool>>,
}

/// Storage for ingredient records, keyed by unique name.
pub trait IngredientRepository {
    fn save(&self, record: &IngredientRecord) -> Result<()>;

    fn load(&self, name: &str) -> Result<IngredientRecord>;

    fn exists(&self, name: &str) -> Result<bool>;

    fn delete(&self, name: &str) -> Result<()>;

    /// File-safe unique names of every stored record, sorted.
    fn list_names(&self) -> Result<Vec<String>>;
}

/// One pretty-printed JSON file per ingredient under a root directory.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    root: PathBuf,
}

impl JsonFileRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        let unique_name = normalise_name(name);
        if unique_name.is_empty() {
            return Err(anyhow!("Ingredient name is empty"));
        }
        if unique_name.contains(['/', '\\']) || unique_name.starts_with('.') {
            return Err(anyhow!("Ingredient name '{}' cannot be used as a file name", name));
        }
        Ok(self.root.join(format!("{}.{}", unique_name, RECORD_EXTENSION)))
    }
}

impl IngredientRepository for JsonFileRepository {
    fn save(&self, record: &IngredientRecord) -> Result<()> {
        let path = self.path_for(&record.name)?;
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create data directory {:?}", self.root))?;
        let content = serde_json::to_string_pretty(record)
            .with_context(|| format!("Failed to serialise ingredient '{}'", record.name))?;
        fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))?;
        tracing::debug!(ingredient = %record.name, path = %path.display(), "Saved ingredient");
        Ok(())
    }

    fn load(&self, name: &str) -> Result<IngredientRecord> {
        let path = self.path_for(name)?;
        let content = fs::read_to_string(&path)
            .with_context(|| format!("No stored ingredient '{}' at {:?}", name, path))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.path_for(name)?.is_file())
    }

    fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        fs::remove_file(&path).with_context(|| format!("Failed to delete {:?}", path))?;
        tracing::debug!(ingredient = %name, "Deleted ingredient");
        Ok(())
    }

    fn list_names(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read data directory {:?}", self.root))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
