//! Typed in-memory model of an EDM/CSDL schema

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Capability annotation key controlling deletes.
pub const CAP_DELETABLE: &str = "Capabilities.DeleteRestrictions.Deletable";
/// Capability annotation key controlling inserts.
pub const CAP_INSERTABLE: &str = "Capabilities.InsertRestrictions.Insertable";
/// Capability annotation key controlling updates.
pub const CAP_UPDATABLE: &str = "Capabilities.UpdateRestrictions.Updatable";
/// Capability annotation key controlling `$orderby`.
pub const CAP_SORTABLE: &str = "Capabilities.SortRestrictions.Sortable";

/// Complete schema model, built once from a `$metadata` document and
/// immutable afterwards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Prefix qualifying schema-local type names (e.g. `Microsoft.NAV`)
    pub namespace: String,
    pub entity_types: BTreeMap<String, EntityType>,
    pub entity_sets: BTreeMap<String, EntitySet>,
    pub enum_types: BTreeMap<String, EnumType>,
    pub actions: Vec<BoundAction>,
}

impl Metadata {
    /// Qualify a schema-local type name with the schema namespace.
    pub fn qualify(&self, name: &str) -> String {
        format!("{}.{}", self.namespace, name)
    }

    /// Strip the schema namespace from a qualified type name, when it
    /// carries one.
    pub fn local_name<'a>(&self, qualified: &'a str) -> &'a str {
        qualified
            .strip_prefix(&self.namespace)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(qualified)
    }

    /// Entity type backing an entity set.
    pub fn entity_type_of(&self, set: &EntitySet) -> Option<&EntityType> {
        self.entity_types.get(&set.entity_type)
    }
}

/// One schema-declared entity type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityType {
    pub name: String,
    /// Name of the single declared key property
    pub key: String,
    pub properties: BTreeMap<String, Property>,
    pub navigation_properties: BTreeMap<String, NavigationProperty>,
}

/// One plain property of an entity type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    /// EDM type string, e.g. `Edm.String` or a namespace-qualified enum type
    pub edm_type: String,
    /// Nullable unless the schema says `Nullable="false"`
    pub nullable: bool,
    pub max_length: Option<u32>,
}

/// One schema-declared relation between entity types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationProperty {
    /// Target type, single (`NS.customer`) or `Collection(NS.customer)`
    pub target_type: String,
    pub partner: Option<String>,
    /// Referential constraint, local field to referenced field
    pub constraints: BTreeMap<String, String>,
}

impl NavigationProperty {
    pub fn is_collection(&self) -> bool {
        self.target_type.starts_with("Collection(")
    }

    /// Target type with any `Collection(...)` wrapper removed, still
    /// namespace-qualified.
    pub fn target_type_name(&self) -> &str {
        self.target_type
            .strip_prefix("Collection(")
            .and_then(|s| s.strip_suffix(')'))
            .unwrap_or(&self.target_type)
    }
}

/// One entity set declared in the schema's container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySet {
    pub name: String,
    /// Local name of the backing entity type
    pub entity_type: String,
    /// Capability annotations; absence of a key means the capability is
    /// permitted
    pub capabilities: BTreeMap<String, bool>,
}

impl EntitySet {
    /// Check a capability annotation; unannotated capabilities default to
    /// permitted.
    pub fn allows(&self, capability: &str) -> bool {
        *self.capabilities.get(capability).unwrap_or(&true)
    }

    pub fn is_deletable(&self) -> bool {
        self.allows(CAP_DELETABLE)
    }

    pub fn is_insertable(&self) -> bool {
        self.allows(CAP_INSERTABLE)
    }

    pub fn is_updatable(&self) -> bool {
        self.allows(CAP_UPDATABLE)
    }

    pub fn is_sortable(&self) -> bool {
        self.allows(CAP_SORTABLE)
    }
}

/// One schema enum type; keys are the declared numeric member values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumType {
    pub name: String,
    pub members: BTreeMap<i64, String>,
}

/// A server-side operation bound to one entity type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundAction {
    pub name: String,
    /// Local name of the entity type the action is bound to
    pub entity_type: String,
}
