//! Database module for PostgreSQL persistence.

mod aggregates;
mod history;
mod pool;

pub use aggregates::*;
pub use history::*;
pub use pool::*;
