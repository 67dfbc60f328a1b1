use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io;
use tracing_subscriber::EnvFilter;

use diet_planner::catalogs::Catalogs;
use diet_planner::cli::{parse_args, Command};
use diet_planner::config::{load_catalog_config, CatalogConfig, Settings};
use diet_planner::flags::FlagError;
use diet_planner::persistence::{IngredientRepository, JsonFileRepository};
use diet_planner::report::write_nutrient_report;
use diet_planner::subject::{Ingredient, SupportsNutrientRatios};

fn load_ingredient(catalogs: &Catalogs, repo: &JsonFileRepository, name: &str) -> Result<Ingredient> {
    let record = repo.load(name)?;
    Ingredient::from_record(catalogs, &record)
}

fn save_ingredient(repo: &JsonFileRepository, ingredient: &Ingredient) -> Result<()> {
    repo.save(&ingredient.to_record())
}

fn format_value(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "true",
        Some(false) => "false",
        None => "undefined",
    }
}

fn print_ingredient(catalogs: &Catalogs, ingredient: &Ingredient) -> Result<()> {
    println!("Ingredient: {}", ingredient.name());
    let bulk = ingredient.bulk();
    if let Some(g_per_ml) = bulk.g_per_ml {
        println!("  density: {} g/ml", g_per_ml);
    }
    if let Some(piece_mass_g) = bulk.piece_mass_g {
        println!("  piece mass: {} g", piece_mass_g);
    }

    println!("\nNutrients (g per 100 g):");
    for name in ingredient.defined_nutrient_names() {
        let ratio = ingredient.get_nutrient_ratio(catalogs, name)?;
        println!("  {:<24} {:>10.3}", name, ratio.g_per_100g());
    }
    println!("  energy: {:.1} kcal/100 g", ingredient.calories_per_g(catalogs)? * 100.0);

    println!("\nFlags:");
    for (flag, value) in ingredient.flag_summary(catalogs) {
        println!("  {:<24} {}", flag, format_value(value));
    }
    Ok(())
}

fn print_family(catalogs: &Catalogs, name: &str) -> Result<()> {
    let nutrient = catalogs.nutrients.get(name)?;
    let join = |names: &std::collections::BTreeSet<String>| {
        names.iter().cloned().collect::<Vec<_>>().join(", ")
    };
    println!("Nutrient: {}", nutrient.primary_name());
    println!("  aliases: {}", nutrient.aliases().join(", "));
    println!("  kcal/g: {}", nutrient.calories_per_g());
    println!("  parents: {}", join(nutrient.parents()));
    println!("  children: {}", join(nutrient.children()));
    println!("  siblings: {}", join(nutrient.siblings()));
    println!("  ascendants: {}", join(nutrient.ascendants()));
    println!("  descendants: {}", join(nutrient.descendants()));
    Ok(())
}

fn run(command: Command, catalogs: &Catalogs, repo: &JsonFileRepository) -> Result<()> {
    match command {
        Command::CheckConfig => {
            println!(
                "Catalogs OK: {} nutrients, {} flags",
                catalogs.nutrients.len(),
                catalogs.flags.len()
            );
            for flag in catalogs.flags.iter() {
                let kind = if flag.direct_alias() { "direct alias" } else { "degree of freedom" };
                println!("  {:<24} {}", flag.name(), kind);
            }
            println!("Stored ingredients: {}", repo.list_names()?.len());
        }
        Command::Family { nutrient } => print_family(catalogs, &nutrient)?,
        Command::New { ingredient } => {
            if repo.exists(&ingredient)? {
                return Err(anyhow!("Ingredient '{}' already exists", ingredient));
            }
            save_ingredient(repo, &Ingredient::new(&ingredient, catalogs))?;
            println!("Created ingredient '{}'", ingredient);
        }
        Command::Show { ingredient } => {
            let ingredient = load_ingredient(catalogs, repo, &ingredient)?;
            print_ingredient(catalogs, &ingredient)?;
        }
        Command::SetRatio {
            ingredient,
            nutrient,
            mass,
            mass_unit,
            qty,
            qty_unit,
        } => {
            let mut subject = load_ingredient(catalogs, repo, &ingredient)?;
            subject.set_nutrient_ratio(catalogs, &nutrient, Some(mass), &mass_unit, qty, &qty_unit)?;
            save_ingredient(repo, &subject)?;
            println!("Set {} {} per {} {} of '{}'", mass, mass_unit, qty, qty_unit, ingredient);
        }
        Command::UndefineRatio { ingredient, nutrient } => {
            let mut subject = load_ingredient(catalogs, repo, &ingredient)?;
            subject.undefine_nutrient_ratio(catalogs, &nutrient)?;
            save_ingredient(repo, &subject)?;
            println!("Undefined {} for '{}'", nutrient, ingredient);
        }
        Command::SetFlag {
            ingredient,
            flag,
            value,
            allow_nutrient_edits,
        } => {
            let mut subject = load_ingredient(catalogs, repo, &ingredient)?;
            match subject.set_flag_value(catalogs, &flag, value.value(), allow_nutrient_edits) {
                Ok(()) => {}
                Err(err @ FlagError::FixableConflict { .. }) => {
                    eprintln!("Re-run with --allow-nutrient-edits to apply the edits listed below.");
                    return Err(err.into());
                }
                Err(err) => return Err(err.into()),
            }
            save_ingredient(repo, &subject)?;
            println!(
                "Set {} to {} for '{}'",
                flag,
                format_value(subject.get_flag_value(catalogs, &flag)?),
                ingredient
            );
        }
        Command::SetBulk {
            ingredient,
            g_per_ml,
            piece_mass_g,
        } => {
            let mut subject = load_ingredient(catalogs, repo, &ingredient)?;
            if g_per_ml.is_some() {
                subject.set_density(catalogs, g_per_ml)?;
            }
            if piece_mass_g.is_some() {
                subject.set_piece_mass(catalogs, piece_mass_g)?;
            }
            save_ingredient(repo, &subject)?;
            println!("Updated bulk properties of '{}'", ingredient);
        }
        Command::Export { ingredient, output } => {
            let subject = load_ingredient(catalogs, repo, &ingredient)?;
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Failed to create report file {:?}", path))?;
                    write_nutrient_report(catalogs, &subject, file)?;
                    println!("Wrote report for '{}' to {:?}", ingredient, path);
                }
                None => write_nutrient_report(catalogs, &subject, io::stdout().lock())?,
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli_args = parse_args();
    let config_path = cli_args.config.or(settings.config_path);
    let data_dir = cli_args.data_dir.unwrap_or(settings.data_dir);

    let config = match &config_path {
        Some(path) => load_catalog_config(path).await?,
        None => CatalogConfig::default(),
    };
    let catalogs = Catalogs::from_config(&config).context("Invalid catalog configuration")?;
    let repo = JsonFileRepository::new(data_dir);

    if let Err(e) = run(cli_args.command, &catalogs, &repo) {
        eprintln!("\nError: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
