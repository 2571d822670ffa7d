pub mod catalog;
pub mod executor;
pub mod row;

pub use executor::QueryOutcome;
pub use row::{ResultSet, Scalar};
