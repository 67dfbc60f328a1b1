pub mod catalog;
pub mod dof;
pub mod error;
pub mod resolver;

pub use catalog::{Flag, FlagCatalog, FlagImplication};
pub use dof::FlagDofState;
pub use error::FlagError;
pub use resolver::{classify_conflicts, flag_value, get_flag_value, set_flag_value, ConflictRecord};
