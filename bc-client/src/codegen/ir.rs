//! Language-agnostic descriptors produced by the metadata walk

/// Host-side kind of one plain property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    Int32,
    Int64,
    Float,
    Bool,
    Guid,
    Date,
    DateTime,
    /// Schema-local enum type, by generated type name
    Enum(String),
}

/// One plain property of a record
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Wire name, e.g. `displayName`
    pub name: String,
    /// Accessor identifier, e.g. `display_name`
    pub ident: String,
    /// Property-enum variant identifier, e.g. `DisplayName`
    pub variant: String,
    pub kind: FieldKind,
    pub nullable: bool,
    /// Suppressed when the entity set forbids updates
    pub with_setter: bool,
    pub max_length: Option<u32>,
}

/// What a relation accessor resolves to
#[derive(Debug, Clone)]
pub enum RelationTarget {
    /// Another generated record type, by type name
    Record(String),
    /// An entity type without a generated record; hydrates generically
    Generic,
    /// A binary media resource
    Stream,
}

/// One navigation or media property of a record
#[derive(Debug, Clone)]
pub struct RelationDef {
    pub name: String,
    pub ident: String,
    pub variant: String,
    pub target: RelationTarget,
    pub collection: bool,
}

/// One member of a schema enum type
#[derive(Debug, Clone)]
pub struct EnumVariant {
    /// Derived identifier with unicode-escape artifacts stripped
    pub ident: String,
    /// Declared numeric value
    pub value: i64,
    /// Wire name as declared in the schema
    pub member: String,
}

/// One schema enum type
#[derive(Debug, Clone)]
pub struct EnumDef {
    /// Generated type name, prefix included
    pub name: String,
    /// Schema-local name
    pub schema_name: String,
    pub variants: Vec<EnumVariant>,
}

/// One generated record/repository pair
#[derive(Debug, Clone)]
pub struct RecordDef {
    /// Generated record type name, prefix included
    pub name: String,
    /// Generated property-enum type name
    pub field_enum: String,
    /// Repository constructor identifier
    pub repo_fn: String,
    /// Entity set resource path
    pub resource: String,
    /// Schema-local entity type name
    pub entity_type: String,
    pub primary_key: String,
    pub fields: Vec<FieldDef>,
    pub relations: Vec<RelationDef>,
}
