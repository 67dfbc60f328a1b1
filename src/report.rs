use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

use crate::catalogs::Catalogs;
use crate::subject::Ingredient;

#[derive(Debug, Serialize)]
struct NutrientReportRow<'a> {
    nutrient: &'a str,
    g_per_100g: f64,
    nutrient_mass: Option<f64>,
    nutrient_mass_unit: &'a str,
    subject_qty: Option<f64>,
    subject_qty_unit: &'a str,
    kcal_per_g: f64,
}

/// Writes one CSV row per defined nutrient ratio of `ingredient`, in
/// primary name order.
pub fn write_nutrient_report<W: Write>(catalogs: &Catalogs, ingredient: &Ingredient, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut rows = 0;
    for name in ingredient.defined_nutrient_names() {
        let ratio = ingredient
            .get_nutrient_ratio(catalogs, name)
            .with_context(|| format!("Failed to read '{}' ratio of '{}'", name, ingredient.name()))?;
        let data = ratio.data();
        wtr.serialize(NutrientReportRow {
            nutrient: ratio.nutrient_name(),
            g_per_100g: ratio.g_per_100g(),
            nutrient_mass: data.nutrient_mass_data.quantity,
            nutrient_mass_unit: &data.nutrient_mass_data.unit,
            subject_qty: data.subject_ref_qty_data.quantity,
            subject_qty_unit: &data.subject_ref_qty_data.unit,
            kcal_per_g: catalogs.nutrients.calories_per_gram(name)?,
        })?;
        rows += 1;
    }
    wtr.flush()?;
    tracing::debug!(ingredient = %ingredient.name(), rows, "Wrote nutrient report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogConfig;

    #[test]
    fn test_report_lists_defined_ratios() -> Result<()> {
        let catalogs = Catalogs::from_config(&CatalogConfig::default())?;
        let mut ingredient = Ingredient::new("yoghurt", &catalogs);
        ingredient.set_nutrient_ratio(&catalogs, "protein", Some(5.0), "g", 100.0, "g")?;
        ingredient.set_nutrient_ratio(&catalogs, "fat", Some(1500.0), "mg", 100.0, "g")?;

        let mut out = Vec::new();
        write_nutrient_report(&catalogs, &ingredient, &mut out)?;
        let text = String::from_utf8(out)?;
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "nutrient,g_per_100g,nutrient_mass,nutrient_mass_unit,subject_qty,subject_qty_unit,kcal_per_g"
        );
        assert_eq!(lines.len(), 3);
        let fat: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(fat[0], "fat");
        assert!((fat[1].parse::<f64>()? - 1.5).abs() < 1e-9);
        assert_eq!(&fat[2..6], &["1500.0", "mg", "100.0", "g"]);
        assert_eq!(fat[6].parse::<f64>()?, 9.0);

        let protein: Vec<&str> = lines[2].split(',').collect();
        assert_eq!(protein[0], "protein");
        assert!((protein[1].parse::<f64>()? - 5.0).abs() < 1e-9);
        assert_eq!(protein[6].parse::<f64>()?, 4.0);
        Ok(())
    }

    #[test]
    fn test_empty_ingredient_writes_nothing() -> Result<()> {
        let catalogs = Catalogs::from_config(&CatalogConfig::default())?;
        let ingredient = Ingredient::new("water", &catalogs);
        let mut out = Vec::new();
        write_nutrient_report(&catalogs, &ingredient, &mut out)?;
        assert!(out.is_empty());
        Ok(())
    }
}
