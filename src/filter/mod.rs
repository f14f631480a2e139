//! Query descriptions (`FilterData`) and the two ways of running them: SQL
//! rendering for Postgres and in-process row matching for the memory store.

pub mod error;
pub mod filter;
pub mod filter_match;
pub mod filter_order;
pub mod filter_where;
pub mod types;

pub use error::FilterError;
pub use filter::Filter;
pub use types::*;
