pub mod check;
pub mod migrate;
