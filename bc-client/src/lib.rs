//! Typed client library for the Dynamics 365 Business Central OData v4 API
//!
//! The crate is split into three layers:
//! - [`api`] — the runtime client: literal encoding, filter expressions,
//!   query building, the generic entity model with dirty tracking, and the
//!   repository surface that composes them over a pluggable transport.
//! - [`metadata`] — a typed in-memory model of the service's EDM/CSDL
//!   `$metadata` document plus the parser that builds it.
//! - [`codegen`] — walks a parsed [`metadata::Metadata`] and emits one typed
//!   record/repository pair per entity set (see the `bc-generate` binary).

pub mod api;
pub mod codegen;
pub mod error;
pub mod metadata;

pub use api::entity::{DataStream, Entity, EntityCollection, EntityDescriptor, RelationKind};
pub use api::filter::{CompareOp, Filter, FilterValue};
pub use api::http::{HttpTransport, StaticToken, TokenProvider};
pub use api::query::{Direction, Expand, OrderBy, QueryBuilder};
pub use api::repository::{FindOptions, Record, Repository};
pub use api::transport::{Request, Response, Transport};
pub use api::value::ODataValue;
pub use error::{Error, Result};
