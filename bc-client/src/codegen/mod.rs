//! Typed-code generation from parsed metadata
//!
//! The metadata walk produces a language-agnostic IR (field, relation, and
//! enum descriptors); an [`Emitter`](rust::Emitter) renders the IR into
//! source text. Only the Rust emitter ships, but the seam keeps the walk
//! testable without committing to output syntax.

pub mod generator;
pub mod ir;
pub mod rust;

pub use generator::{Generator, Summary, SYSTEM_ENTITY_SETS};
pub use ir::{EnumDef, EnumVariant, FieldDef, FieldKind, RecordDef, RelationDef, RelationTarget};
pub use rust::{Emitter, RustEmitter};
