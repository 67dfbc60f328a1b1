use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a JSON catalog configuration (built-in table when omitted)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding one JSON file per ingredient
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the catalogs and report what they contain
    CheckConfig,
    /// Show a nutrient's aliases and relatives
    Family { nutrient: String },
    /// Create an empty ingredient
    New { ingredient: String },
    /// Print an ingredient's ratios, flags and energy density
    Show { ingredient: String },
    /// Set `mass` of a nutrient per `qty` of the ingredient
    SetRatio {
        ingredient: String,
        nutrient: String,
        mass: f64,
        mass_unit: String,
        qty: f64,
        qty_unit: String,
    },
    /// Remove a nutrient ratio from the ingredient
    UndefineRatio { ingredient: String, nutrient: String },
    /// Set a flag, optionally letting related nutrient ratios be edited
    SetFlag {
        ingredient: String,
        flag: String,
        value: FlagArg,
        #[arg(long)]
        allow_nutrient_edits: bool,
    },
    /// Set density and piece mass, used to convert volumes and pieces to grams
    SetBulk {
        ingredient: String,
        /// Density in grams per millilitre
        #[arg(long)]
        g_per_ml: Option<f64>,
        /// Mass of one piece in grams
        #[arg(long)]
        piece_mass_g: Option<f64>,
    },
    /// Write the ingredient's nutrient ratios as CSV (stdout by default)
    Export {
        ingredient: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum FlagArg {
    True,
    False,
    None,
}

impl FlagArg {
    pub fn value(self) -> Option<bool> {
        match self {
            FlagArg::True => Some(true),
            FlagArg::False => Some(false),
            FlagArg::None => None,
        }
    }
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_flag() {
        let cli = Cli::parse_from([
            "diet_planner",
            "--data-dir",
            "/tmp/foods",
            "set-flag",
            "milk",
            "lactose_free",
            "true",
            "--allow-nutrient-edits",
        ]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/foods")));
        match cli.command {
            Command::SetFlag { flag, value, allow_nutrient_edits, .. } => {
                assert_eq!(flag, "lactose_free");
                assert_eq!(value.value(), Some(true));
                assert!(allow_nutrient_edits);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_set_ratio() {
        let cli = Cli::parse_from(["diet_planner", "set-ratio", "egg", "protein", "6.5", "g", "1", "pc"]);
        assert!(matches!(
            cli.command,
            Command::SetRatio { ref nutrient, mass, qty, .. } if nutrient == "protein" && mass == 6.5 && qty == 1.0
        ));
    }

    #[test]
    fn test_every_subcommand_has_help() {
        use clap::CommandFactory;
        let command = Cli::command();
        for sub in command.get_subcommands().filter(|sub| sub.get_name() != "help") {
            assert!(sub.get_about().is_some(), "{} has no help text", sub.get_name());
        }
    }

    #[test]
    fn test_flag_arg_rejects_other_words() {
        assert!(Cli::try_parse_from(["diet_planner", "set-flag", "milk", "vegan", "maybe"]).is_err());
    }
}
