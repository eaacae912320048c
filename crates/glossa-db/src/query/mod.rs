//! The query builder.
//!
//! [`QueryBuilder`] collects clauses into a [`QueryState`] through chainable
//! methods, then compiles and executes the state in one step. Bound values
//! are kept per clause type in [`ArgumentBuckets`] and flattened in a fixed
//! priority order at compile time, so the positional arguments always line up
//! with the placeholders regardless of the order in which clauses were added.
//!
//! # Submodules
//!
//! - [`bind`]: Argument buckets and their priority order.
//! - [`clause`]: Clause types shared by the compilers.
//! - [`state`]: The accumulated builder state.
//! - [`select`], [`insert`], [`update`], [`delete`]: Statement compilers.
//! - [`builder`]: The fluent [`QueryBuilder`].

pub mod bind;
pub mod builder;
pub mod clause;
pub mod delete;
pub mod insert;
pub mod select;
pub mod state;
pub mod update;

pub use bind::{ArgumentBuckets, Bucket};
pub use builder::{Projection, QueryBuilder, QueryOutcome};
pub use clause::{Direction, JoinType};
pub use state::{CompiledStatement, QueryState};
