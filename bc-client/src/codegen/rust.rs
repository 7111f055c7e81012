//! Rust source emitter
//!
//! Renders the IR into one file per schema enum and one file per entity set
//! (property enum, record type, repository constructor). Rendering is fully
//! deterministic so regeneration over unchanged metadata is byte-identical.

use super::ir::{EnumDef, FieldDef, FieldKind, RecordDef, RelationDef, RelationTarget};

/// Per-target-language rendering seam
pub trait Emitter {
    fn enum_file_name(&self, def: &EnumDef) -> String;
    fn record_file_name(&self, def: &RecordDef) -> String;
    fn index_file_name(&self) -> &'static str;
    fn render_enum(&self, def: &EnumDef) -> String;
    fn render_record(&self, def: &RecordDef) -> String;
    /// Render the module index tying the generated files together.
    fn render_index(&self, modules: &[String]) -> String;
}

/// Emits idiomatic Rust: enums with wire-name round-tripping, newtype
/// records over [`Entity`](crate::api::entity::Entity), and preconfigured
/// repository constructors
#[derive(Debug, Default)]
pub struct RustEmitter;

const GENERATED_HEADER: &str =
    "//! Generated by bc-generate from the service metadata.\n//! Manual edits will be lost when the file is regenerated.\n";

impl RustEmitter {
    fn render_field(&self, out: &mut String, field: &FieldDef) {
        let FieldDef {
            name, ident, kind, ..
        } = field;
        let (return_type, getter, setter_type, setter) = match kind {
            FieldKind::Str => (
                "Option<String>".to_string(),
                format!("self.entity.get_str(\"{name}\")"),
                "Option<&str>".to_string(),
                format!("self.entity.set_str(\"{name}\", value);"),
            ),
            FieldKind::Int32 => (
                "Option<i32>".to_string(),
                format!("Ok(self.entity.get_i64(\"{name}\")?.map(|value| value as i32))"),
                "Option<i32>".to_string(),
                format!("self.entity.set_i64(\"{name}\", value.map(i64::from));"),
            ),
            FieldKind::Int64 => (
                "Option<i64>".to_string(),
                format!("self.entity.get_i64(\"{name}\")"),
                "Option<i64>".to_string(),
                format!("self.entity.set_i64(\"{name}\", value);"),
            ),
            FieldKind::Float => (
                "Option<f64>".to_string(),
                format!("self.entity.get_f64(\"{name}\")"),
                "Option<f64>".to_string(),
                format!("self.entity.set_f64(\"{name}\", value);"),
            ),
            FieldKind::Bool => (
                "Option<bool>".to_string(),
                format!("self.entity.get_bool(\"{name}\")"),
                "Option<bool>".to_string(),
                format!("self.entity.set_bool(\"{name}\", value);"),
            ),
            FieldKind::Guid => (
                "Option<Uuid>".to_string(),
                format!("self.entity.get_guid(\"{name}\")"),
                "Option<Uuid>".to_string(),
                format!("self.entity.set_guid(\"{name}\", value);"),
            ),
            FieldKind::Date => (
                "Option<NaiveDate>".to_string(),
                format!("self.entity.get_date(\"{name}\")"),
                "Option<NaiveDate>".to_string(),
                format!("self.entity.set_date(\"{name}\", value);"),
            ),
            FieldKind::DateTime => (
                "Option<DateTime<Utc>>".to_string(),
                format!("self.entity.get_datetime(\"{name}\")"),
                "Option<DateTime<Utc>>".to_string(),
                format!("self.entity.set_datetime(\"{name}\", value);"),
            ),
            FieldKind::Enum(enum_name) => (
                format!("Option<{enum_name}>"),
                format!(
                    "Ok(self.entity.get_str(\"{name}\")?.and_then(|value| {enum_name}::parse(&value)))"
                ),
                format!("Option<{enum_name}>"),
                format!(
                    "self.entity.set_str(\"{name}\", value.map(|value| value.as_str()));"
                ),
            ),
        };

        out.push_str(&format!(
            "    pub fn {ident}(&self) -> Result<{return_type}> {{\n        {getter}\n    }}\n\n"
        ));
        if field.with_setter {
            let setter_ident = ident.trim_start_matches("r#");
            out.push_str(&format!(
                "    pub fn set_{setter_ident}(&mut self, value: {setter_type}) {{\n        {setter}\n    }}\n\n"
            ));
        }
    }

    fn render_relation_accessor(&self, out: &mut String, relation: &RelationDef) {
        let RelationDef { name, ident, .. } = relation;
        match (&relation.target, relation.collection) {
            (RelationTarget::Stream, _) => {
                out.push_str(&format!(
                    "    pub fn {ident}(&self) -> Result<Option<&DataStream>> {{\n        self.entity.media(\"{name}\")\n    }}\n\n"
                ));
            }
            (_, true) => {
                out.push_str(&format!(
                    "    pub fn {ident}(&self) -> Result<&EntityCollection> {{\n        self.entity.many(\"{name}\")\n    }}\n\n"
                ));
            }
            (_, false) => {
                out.push_str(&format!(
                    "    pub fn {ident}(&self) -> Result<Option<&Entity>> {{\n        self.entity.one(\"{name}\")\n    }}\n\n"
                ));
            }
        }
    }

    fn relation_kind_expr(relation: &RelationDef) -> String {
        let descriptor = match &relation.target {
            RelationTarget::Stream => return "RelationKind::Stream".to_string(),
            RelationTarget::Record(record) => format!("{record}::descriptor"),
            RelationTarget::Generic => "EntityDescriptor::generic".to_string(),
        };
        if relation.collection {
            format!("RelationKind::Collection({descriptor})")
        } else {
            format!("RelationKind::Single({descriptor})")
        }
    }

    fn imports(def: &RecordDef) -> String {
        let mut lines = vec!["use std::sync::Arc;".to_string(), String::new()];

        let mut chrono_types = Vec::new();
        if def.fields.iter().any(|f| f.kind == FieldKind::DateTime) {
            chrono_types.extend(["DateTime", "Utc"]);
        }
        if def.fields.iter().any(|f| f.kind == FieldKind::Date) {
            chrono_types.insert(0, "NaiveDate");
        }
        if !chrono_types.is_empty() {
            chrono_types.sort_unstable();
            lines.push(format!("use chrono::{{{}}};", chrono_types.join(", ")));
        }
        if def.fields.iter().any(|f| f.kind == FieldKind::Guid) {
            lines.push("use uuid::Uuid;".to_string());
        }
        if lines.last().is_some_and(|l| !l.is_empty()) {
            lines.push(String::new());
        }

        let mut entity_imports = vec!["Entity", "EntityDescriptor", "RelationKind"];
        if def
            .relations
            .iter()
            .any(|r| r.collection && !matches!(r.target, RelationTarget::Stream))
        {
            entity_imports.insert(1, "EntityCollection");
        }
        if def
            .relations
            .iter()
            .any(|r| matches!(r.target, RelationTarget::Stream))
        {
            entity_imports.insert(0, "DataStream");
        }
        lines.push(format!(
            "use bc_client::api::entity::{{{}}};",
            entity_imports.join(", ")
        ));
        lines.push("use bc_client::api::repository::{Record, Repository};".to_string());
        lines.push("use bc_client::api::transport::Transport;".to_string());
        lines.push("use bc_client::Result;".to_string());
        lines.push(String::new());
        lines.push("use super::*;".to_string());
        lines.join("\n")
    }
}

impl Emitter for RustEmitter {
    fn enum_file_name(&self, def: &EnumDef) -> String {
        format!("{}.rs", to_module_name(&def.name))
    }

    fn record_file_name(&self, def: &RecordDef) -> String {
        format!("{}.rs", to_module_name(&def.name))
    }

    fn index_file_name(&self) -> &'static str {
        "mod.rs"
    }

    fn render_enum(&self, def: &EnumDef) -> String {
        let mut out = String::from(GENERATED_HEADER);
        out.push('\n');
        out.push_str(&format!(
            "/// Members of the `{}` schema enum.\n",
            def.schema_name
        ));
        out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq)]\n");
        out.push_str(&format!("pub enum {} {{\n", def.name));
        for variant in &def.variants {
            out.push_str(&format!("    {},\n", variant.ident));
        }
        out.push_str("}\n\n");

        out.push_str(&format!("impl {} {{\n", def.name));
        out.push_str("    /// Wire name of this member.\n");
        out.push_str("    pub fn as_str(&self) -> &'static str {\n        match self {\n");
        for variant in &def.variants {
            out.push_str(&format!(
                "            Self::{} => \"{}\",\n",
                variant.ident, variant.member
            ));
        }
        out.push_str("        }\n    }\n\n");

        out.push_str("    /// Declared numeric value of this member.\n");
        out.push_str("    pub fn value(&self) -> i64 {\n        match self {\n");
        for variant in &def.variants {
            out.push_str(&format!(
                "            Self::{} => {},\n",
                variant.ident, variant.value
            ));
        }
        out.push_str("        }\n    }\n\n");

        out.push_str("    /// Parse a wire name back into a member.\n");
        out.push_str("    pub fn parse(value: &str) -> Option<Self> {\n        match value {\n");
        for variant in &def.variants {
            out.push_str(&format!(
                "            \"{}\" => Some(Self::{}),\n",
                variant.member, variant.ident
            ));
        }
        out.push_str("            _ => None,\n        }\n    }\n}\n");
        out
    }

    fn render_record(&self, def: &RecordDef) -> String {
        let mut out = String::from(GENERATED_HEADER);
        out.push('\n');
        out.push_str(&Self::imports(def));
        out.push_str("\n\n");

        // Property-name enum, plain properties first, navigation after
        out.push_str(&format!(
            "/// Property names of the `{}` entity set.\n",
            def.resource
        ));
        out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq)]\n");
        out.push_str(&format!("pub enum {} {{\n", def.field_enum));
        for field in &def.fields {
            out.push_str(&format!("    {},\n", field.variant));
        }
        if !def.relations.is_empty() {
            out.push_str("    // Navigation properties\n");
            for relation in &def.relations {
                out.push_str(&format!("    {},\n", relation.variant));
            }
        }
        out.push_str("}\n\n");

        out.push_str(&format!("impl {} {{\n", def.field_enum));
        out.push_str("    /// Wire name of this property.\n");
        out.push_str("    pub fn as_str(&self) -> &'static str {\n        match self {\n");
        for field in &def.fields {
            out.push_str(&format!(
                "            Self::{} => \"{}\",\n",
                field.variant, field.name
            ));
        }
        for relation in &def.relations {
            out.push_str(&format!(
                "            Self::{} => \"{}\",\n",
                relation.variant, relation.name
            ));
        }
        out.push_str("        }\n    }\n}\n\n");

        // Record type
        out.push_str(&format!(
            "/// Typed record over the `{}` entity type.\n",
            def.entity_type
        ));
        out.push_str("#[derive(Debug, Clone)]\n");
        out.push_str(&format!("pub struct {} {{\n    entity: Entity,\n}}\n\n", def.name));

        out.push_str(&format!("impl {} {{\n", def.name));
        out.push_str(
            "    pub fn new() -> Self {\n        Self {\n            entity: Entity::new(<Self as Record>::descriptor()),\n        }\n    }\n\n",
        );
        for field in &def.fields {
            self.render_field(&mut out, field);
        }
        for relation in &def.relations {
            self.render_relation_accessor(&mut out, relation);
        }
        // Drop the trailing blank line inside the impl block
        if out.ends_with("\n\n") {
            out.pop();
        }
        out.push_str("}\n\n");

        out.push_str(&format!(
            "impl Default for {} {{\n    fn default() -> Self {{\n        Self::new()\n    }}\n}}\n\n",
            def.name
        ));

        // Record wiring: descriptor, resource, entity plumbing
        out.push_str(&format!("impl Record for {} {{\n", def.name));
        out.push_str("    fn descriptor() -> EntityDescriptor {\n");
        out.push_str("        EntityDescriptor {\n");
        out.push_str(&format!("            primary_key: \"{}\",\n", def.primary_key));
        if def.relations.is_empty() {
            out.push_str("            relations: &[],\n");
        } else {
            out.push_str("            relations: &[\n");
            for relation in &def.relations {
                out.push_str(&format!(
                    "                (\"{}\", {}),\n",
                    relation.name,
                    Self::relation_kind_expr(relation)
                ));
            }
            out.push_str("            ],\n");
        }
        out.push_str("        }\n    }\n\n");
        out.push_str(&format!(
            "    fn resource() -> &'static str {{\n        \"{}\"\n    }}\n\n",
            def.resource
        ));
        out.push_str(
            "    fn from_entity(entity: Entity) -> Self {\n        Self { entity }\n    }\n\n",
        );
        out.push_str("    fn entity(&self) -> &Entity {\n        &self.entity\n    }\n\n");
        out.push_str(
            "    fn entity_mut(&mut self) -> &mut Entity {\n        &mut self.entity\n    }\n}\n\n",
        );

        // Preconfigured repository
        out.push_str(&format!(
            "/// Repository over the `{}` entity set.\n",
            def.resource
        ));
        out.push_str(&format!(
            "pub fn {}(transport: Arc<dyn Transport>) -> Repository<{}> {{\n    Repository::new(transport)\n}}\n",
            def.repo_fn, def.name
        ));
        out
    }

    fn render_index(&self, modules: &[String]) -> String {
        let mut out = String::from(GENERATED_HEADER);
        out.push('\n');
        for module in modules {
            out.push_str(&format!("pub mod {module};\n"));
        }
        out.push('\n');
        for module in modules {
            out.push_str(&format!("pub use {module}::*;\n"));
        }
        out
    }
}

/// Module/file name for a generated type name.
pub fn to_module_name(type_name: &str) -> String {
    let mut out = String::with_capacity(type_name.len() + 4);
    for (index, ch) in type_name.chars().enumerate() {
        if ch.is_uppercase() {
            if index > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::super::ir::EnumVariant;
    use super::*;

    fn status_enum() -> EnumDef {
        EnumDef {
            name: "SalesOrderStatus".into(),
            schema_name: "salesOrderStatus".into(),
            variants: vec![
                EnumVariant {
                    ident: "Draft".into(),
                    value: 0,
                    member: "Draft".into(),
                },
                EnumVariant {
                    ident: "InReview".into(),
                    value: 1,
                    member: "In_x0020_Review".into(),
                },
            ],
        }
    }

    #[test]
    fn test_enum_rendering_round_trips_wire_names() {
        let emitter = RustEmitter;
        let rendered = emitter.render_enum(&status_enum());
        assert!(rendered.contains("pub enum SalesOrderStatus {"));
        assert!(rendered.contains("Self::InReview => \"In_x0020_Review\","));
        assert!(rendered.contains("\"In_x0020_Review\" => Some(Self::InReview),"));
        assert!(rendered.contains("Self::Draft => 0,"));
    }

    #[test]
    fn test_module_names() {
        assert_eq!(to_module_name("SalesOrderStatus"), "sales_order_status");
        assert_eq!(to_module_name("Customer"), "customer");
    }

    #[test]
    fn test_record_rendering_wires_descriptor() {
        let emitter = RustEmitter;
        let def = RecordDef {
            name: "Customer".into(),
            field_enum: "CustomerField".into(),
            repo_fn: "customers".into(),
            resource: "customers".into(),
            entity_type: "customer".into(),
            primary_key: "id".into(),
            fields: vec![FieldDef {
                name: "displayName".into(),
                ident: "display_name".into(),
                variant: "DisplayName".into(),
                kind: FieldKind::Str,
                nullable: true,
                with_setter: true,
                max_length: Some(100),
            }],
            relations: vec![RelationDef {
                name: "shipToAddresses".into(),
                ident: "ship_to_addresses".into(),
                variant: "ShipToAddresses".into(),
                target: RelationTarget::Record("ShipToAddress".into()),
                collection: true,
            }],
        };
        let rendered = emitter.render_record(&def);
        assert!(rendered.contains("pub struct Customer {"));
        assert!(rendered.contains(
            "(\"shipToAddresses\", RelationKind::Collection(ShipToAddress::descriptor)),"
        ));
        assert!(rendered.contains("pub fn display_name(&self) -> Result<Option<String>>"));
        assert!(rendered.contains("pub fn set_display_name(&mut self, value: Option<&str>)"));
        assert!(rendered.contains("fn resource() -> &'static str {\n        \"customers\"\n    }"));
        assert!(rendered.contains("pub fn customers(transport: Arc<dyn Transport>)"));
        assert!(rendered.contains("// Navigation properties\n    ShipToAddresses,"));
    }

    #[test]
    fn test_readonly_set_emits_no_setters() {
        let emitter = RustEmitter;
        let def = RecordDef {
            name: "AgedReceivable".into(),
            field_enum: "AgedReceivableField".into(),
            repo_fn: "aged_receivables".into(),
            resource: "agedAccountsReceivables".into(),
            entity_type: "agedAccountsReceivable".into(),
            primary_key: "customerId".into(),
            fields: vec![FieldDef {
                name: "balanceDue".into(),
                ident: "balance_due".into(),
                variant: "BalanceDue".into(),
                kind: FieldKind::Float,
                nullable: true,
                with_setter: false,
                max_length: None,
            }],
            relations: Vec::new(),
        };
        let rendered = emitter.render_record(&def);
        assert!(rendered.contains("pub fn balance_due"));
        assert!(!rendered.contains("pub fn set_balance_due"));
    }
}
