pub mod connection;
pub mod error;
pub mod executor;
pub mod helpers;
pub mod macros;
pub mod predicate;
pub mod query;
pub mod traits;

pub use connection::Database;
pub use executor::Executor;
pub use helpers::*;
pub use predicate::{Filter, Predicate};
pub use query::*;
pub use traits::{Expression, FromRow};
