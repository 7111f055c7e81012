//! Business Central Web API client module
//!
//! Provides the runtime half of the crate: OData literal encoding, filter
//! expressions, query building, the generic entity model with dirty tracking
//! and lazy relation hydration, and the repository surface with full CRUD,
//! query, and batch operations over a pluggable transport.

pub mod constants;
pub mod entity;
pub mod filter;
pub mod http;
pub mod query;
pub mod repository;
pub mod transport;
pub mod value;

pub use entity::{DataStream, Entity, EntityCollection, EntityDescriptor, RelationKind, Slot};
pub use filter::{CompareOp, Filter, FilterValue};
pub use http::{HttpTransport, StaticToken, TokenProvider};
pub use query::{Direction, Expand, OrderBy, QueryBuilder};
pub use repository::{FindOptions, Record, Repository};
pub use transport::{
    BatchRequest, BatchResponse, BatchSubRequest, BatchSubResponse, Request, Response, Transport,
};
pub use value::ODataValue;
