//! Metadata parsing and models for the service's EDM schema
//!
//! The `$metadata` document describes every entity set the API exposes;
//! [`parse`] turns it into the typed [`Metadata`] model the code generator
//! walks.

pub mod models;
pub mod parser;

pub use models::{
    BoundAction, EntitySet, EntityType, EnumType, Metadata, NavigationProperty, Property,
};
pub use parser::parse;
