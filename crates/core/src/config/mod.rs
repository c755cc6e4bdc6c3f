pub mod database;
pub mod validation;

pub use database::*;
pub use validation::*;
