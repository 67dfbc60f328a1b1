pub mod data;
pub mod units;

pub use data::{validate_bulk_value, BulkProperties, QuantityData};
pub use units::{convert, validate_mass_unit, validate_quantity, QuantityError, UnitKind};
