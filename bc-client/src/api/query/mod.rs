//! OData query building
//!
//! Assembles a resource-relative URI from a base resource path, an optional
//! key predicate, and the structured query options. The builder is consumed
//! by [`QueryBuilder::build`] so no mutable state survives finalization.

pub mod builder;
pub mod orderby;

pub use builder::{Expand, QueryBuilder};
pub use orderby::{Direction, OrderBy};
