pub mod catalogs;
pub mod cli;
pub mod config;
pub mod flags;
pub mod nutrients;
pub mod persistence;
pub mod quantity;
pub mod report;
pub mod subject;

pub use catalogs::Catalogs;
pub use subject::Ingredient;
