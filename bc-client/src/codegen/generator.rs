//! Metadata walk and file emission
//!
//! Builds the IR for every requested entity set, renders it through the
//! configured emitter, and writes the results under the output root.
//! Existing files are preserved unless overwrite is requested.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::metadata::models::{EntitySet, Metadata};

use super::ir::{EnumDef, EnumVariant, FieldDef, FieldKind, RecordDef, RelationDef, RelationTarget};
use super::rust::{Emitter, RustEmitter};

/// Internal entity sets that `generate_all` never emits code for.
pub const SYSTEM_ENTITY_SETS: &[&str] = &[
    "entityDefinitions",
    "externalbusinesseventdefinitions",
    "externaleventsubscriptions",
];

/// Unicode-escape artifacts in schema identifiers, e.g. `In_x0020_Review`.
static UNICODE_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_x[0-9A-Fa-f]{4}_").unwrap());

/// What one generator run did
#[derive(Debug, Default)]
pub struct Summary {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

impl Summary {
    fn merge(&mut self, other: Summary) {
        self.written.extend(other.written);
        self.skipped.extend(other.skipped);
    }
}

/// Emits typed records and repositories for a parsed schema
pub struct Generator<'a> {
    metadata: &'a Metadata,
    emitter: Box<dyn Emitter>,
    out_dir: PathBuf,
    prefix: String,
    overwrite: bool,
}

impl<'a> Generator<'a> {
    pub fn new(metadata: &'a Metadata, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            metadata,
            emitter: Box::new(RustEmitter),
            out_dir: out_dir.into(),
            prefix: String::new(),
            overwrite: false,
        }
    }

    /// Prefix for every generated type name.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn emitter(mut self, emitter: Box<dyn Emitter>) -> Self {
        self.emitter = emitter;
        self
    }

    /// Generate every schema enum and every entity set outside the
    /// system deny-list, plus the module index.
    pub fn generate_all(&self) -> Result<Summary> {
        let mut summary = Summary::default();
        let mut modules = Vec::new();

        for enum_type in self.metadata.enum_types.values() {
            let def = self.build_enum(&enum_type.name)?;
            let file = self.emitter.enum_file_name(&def);
            modules.push(module_of(&file));
            self.emit(&file, &self.emitter.render_enum(&def), &mut summary)?;
        }

        for set in self.metadata.entity_sets.values() {
            if SYSTEM_ENTITY_SETS.contains(&set.name.as_str()) {
                log::debug!("skipping system entity set '{}'", set.name);
                continue;
            }
            let def = self.build_record(set)?;
            let file = self.emitter.record_file_name(&def);
            modules.push(module_of(&file));
            self.emit(&file, &self.emitter.render_record(&def), &mut summary)?;
        }

        modules.sort_unstable();
        summary.merge(self.emit_index(&modules)?);
        log::info!(
            "generation finished: {} files written, {} preserved",
            summary.written.len(),
            summary.skipped.len()
        );
        Ok(summary)
    }

    /// Generate one entity set (plus the enum types its fields use) and
    /// refresh the module index.
    pub fn generate_set(&self, set_name: &str) -> Result<Summary> {
        let set = self.metadata.entity_sets.get(set_name).ok_or_else(|| {
            Error::Schema(format!("unknown entity set '{set_name}'"))
        })?;
        let mut summary = Summary::default();
        let mut modules = Vec::new();

        let def = self.build_record(set)?;
        for field in &def.fields {
            if let FieldKind::Enum(enum_name) = &field.kind {
                let schema_name = self
                    .metadata
                    .enum_types
                    .values()
                    .find(|e| self.type_name(&e.name) == *enum_name)
                    .map(|e| e.name.clone())
                    .ok_or_else(|| {
                        Error::Schema(format!("unknown enum type behind '{enum_name}'"))
                    })?;
                let enum_def = self.build_enum(&schema_name)?;
                let file = self.emitter.enum_file_name(&enum_def);
                modules.push(module_of(&file));
                self.emit(&file, &self.emitter.render_enum(&enum_def), &mut summary)?;
            }
        }

        let file = self.emitter.record_file_name(&def);
        modules.push(module_of(&file));
        self.emit(&file, &self.emitter.render_record(&def), &mut summary)?;

        modules.sort_unstable();
        summary.merge(self.emit_index(&modules)?);
        Ok(summary)
    }

    fn type_name(&self, schema_name: &str) -> String {
        format!("{}{}", self.prefix, to_pascal_case(schema_name))
    }

    fn build_enum(&self, schema_name: &str) -> Result<EnumDef> {
        let enum_type = self.metadata.enum_types.get(schema_name).ok_or_else(|| {
            Error::Schema(format!("unknown enum type '{schema_name}'"))
        })?;

        let mut seen = BTreeSet::new();
        let mut variants = Vec::new();
        for (&value, member) in &enum_type.members {
            let ident = enum_member_ident(member, value);
            if !seen.insert(ident.clone()) {
                return Err(Error::Schema(format!(
                    "enum '{schema_name}': members collide on identifier '{ident}'"
                )));
            }
            variants.push(EnumVariant {
                ident,
                value,
                member: member.clone(),
            });
        }

        Ok(EnumDef {
            name: self.type_name(schema_name),
            schema_name: schema_name.to_string(),
            variants,
        })
    }

    fn build_record(&self, set: &EntitySet) -> Result<RecordDef> {
        let entity_type = self.metadata.entity_type_of(set).ok_or_else(|| {
            Error::Schema(format!(
                "entity set '{}' references unknown entity type '{}'",
                set.name, set.entity_type
            ))
        })?;

        let with_setter = set.is_updatable();
        let mut fields = Vec::new();
        let mut relations = Vec::new();
        let mut variants = BTreeSet::new();

        for (prop_name, property) in &entity_type.properties {
            let variant = to_pascal_case(prop_name);
            if !variants.insert(variant.clone()) {
                return Err(Error::Schema(format!(
                    "entity type '{}': properties collide on identifier '{variant}'",
                    entity_type.name
                )));
            }
            if property.edm_type == "Edm.Stream" {
                relations.push(RelationDef {
                    name: prop_name.clone(),
                    ident: method_ident(prop_name),
                    variant,
                    target: RelationTarget::Stream,
                    collection: false,
                });
                continue;
            }
            fields.push(FieldDef {
                name: prop_name.clone(),
                ident: method_ident(prop_name),
                variant,
                kind: self.field_kind(&property.edm_type)?,
                nullable: property.nullable,
                with_setter,
                max_length: property.max_length,
            });
        }

        for (nav_name, nav) in &entity_type.navigation_properties {
            let variant = to_pascal_case(nav_name);
            if !variants.insert(variant.clone()) {
                return Err(Error::Schema(format!(
                    "entity type '{}': properties collide on identifier '{variant}'",
                    entity_type.name
                )));
            }
            let target_local = self.metadata.local_name(nav.target_type_name());
            relations.push(RelationDef {
                name: nav_name.clone(),
                ident: method_ident(nav_name),
                variant,
                target: if self.has_record_for(target_local) {
                    RelationTarget::Record(self.type_name(target_local))
                } else {
                    RelationTarget::Generic
                },
                collection: nav.is_collection(),
            });
        }

        let name = self.type_name(&entity_type.name);
        Ok(RecordDef {
            field_enum: format!("{name}Field"),
            repo_fn: method_ident(&set.name),
            resource: set.name.clone(),
            entity_type: entity_type.name.clone(),
            primary_key: entity_type.key.clone(),
            name,
            fields,
            relations,
        })
    }

    /// Whether a record type will exist for the given entity type, i.e. a
    /// non-system entity set is backed by it.
    fn has_record_for(&self, entity_type: &str) -> bool {
        self.metadata.entity_sets.values().any(|set| {
            set.entity_type == entity_type && !SYSTEM_ENTITY_SETS.contains(&set.name.as_str())
        })
    }

    fn field_kind(&self, edm_type: &str) -> Result<FieldKind> {
        Ok(match edm_type {
            "Edm.String" | "Edm.Binary" => FieldKind::Str,
            "Edm.Boolean" => FieldKind::Bool,
            "Edm.Byte" | "Edm.SByte" | "Edm.Int16" | "Edm.Int32" => FieldKind::Int32,
            "Edm.Int64" => FieldKind::Int64,
            "Edm.Decimal" | "Edm.Double" | "Edm.Single" => FieldKind::Float,
            "Edm.Guid" => FieldKind::Guid,
            "Edm.Date" => FieldKind::Date,
            "Edm.DateTimeOffset" => FieldKind::DateTime,
            other if other.starts_with("Collection(") => {
                return Err(Error::Schema(format!(
                    "collection-shaped property type '{other}' has no host mapping"
                )));
            }
            other => {
                let local = self.metadata.local_name(other);
                if self.metadata.enum_types.contains_key(local) {
                    FieldKind::Enum(self.type_name(local))
                } else {
                    return Err(Error::Schema(format!(
                        "EDM type '{other}' has no host mapping"
                    )));
                }
            }
        })
    }

    fn emit(&self, file_name: &str, content: &str, summary: &mut Summary) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join(file_name);
        if path.exists() && !self.overwrite {
            log::debug!("preserving existing file {}", path.display());
            summary.skipped.push(path);
            return Ok(());
        }
        fs::write(&path, content)?;
        log::debug!("wrote {}", path.display());
        summary.written.push(path);
        Ok(())
    }

    /// The module index is rewritten whenever its content changes, so it is
    /// exempt from the overwrite flag; an up-to-date index is never touched.
    /// Modules declared by earlier runs stay in the index, which keeps
    /// single-set generation additive.
    fn emit_index(&self, modules: &[String]) -> Result<Summary> {
        let mut summary = Summary::default();
        let path = self.out_dir.join(self.emitter.index_file_name());

        let mut all: BTreeSet<String> = modules.iter().cloned().collect();
        if path.exists() {
            for line in fs::read_to_string(&path)?.lines() {
                if let Some(module) = line
                    .strip_prefix("pub mod ")
                    .and_then(|rest| rest.strip_suffix(';'))
                {
                    all.insert(module.to_string());
                }
            }
        }
        let all: Vec<String> = all.into_iter().collect();

        let content = self.emitter.render_index(&all);
        if path.exists() && fs::read_to_string(&path)? == content {
            summary.skipped.push(path);
            return Ok(summary);
        }
        fs::write(&path, content)?;
        summary.written.push(path);
        Ok(summary)
    }
}

fn module_of(file_name: &str) -> String {
    file_name.trim_end_matches(".rs").to_string()
}

/// Derive a variant identifier from an enum member name: strip `_xNNNN_`
/// escape artifacts, drop any remaining non-identifier characters, and
/// PascalCase the rest. An empty result falls back to a placeholder.
fn enum_member_ident(member: &str, value: i64) -> String {
    let stripped = UNICODE_ESCAPE.replace_all(member, " ");
    let cleaned: String = stripped
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { ' ' })
        .collect();
    let ident = to_pascal_case(cleaned.trim());
    if ident.is_empty() {
        return format!("Value{value}");
    }
    if ident.starts_with(|ch: char| ch.is_ascii_digit()) {
        return format!("Value{ident}");
    }
    ident
}

/// `displayName` / `ship_to_address` / `Sales Order` -> PascalCase.
fn to_pascal_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut upper_next = true;
    for ch in input.chars() {
        if !ch.is_ascii_alphanumeric() {
            upper_next = true;
            continue;
        }
        if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Accessor identifier: snake_case, raw-prefixed when it would collide with
/// a keyword.
fn method_ident(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    let mut prev_lower = false;
    for ch in input.chars() {
        if !ch.is_ascii_alphanumeric() {
            if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
            prev_lower = false;
            continue;
        }
        if ch.is_ascii_uppercase() {
            if prev_lower && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = true;
        }
    }
    let out = out.trim_matches('_').to_string();
    if RUST_KEYWORDS.contains(&out.as_str()) {
        format!("r#{out}")
    } else {
        out
    }
}

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata;

    const SCHEMA: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<edmx:Edmx xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx" Version="4.0">
  <edmx:DataServices>
    <Schema xmlns="http://docs.oasis-open.org/odata/ns/edm" Namespace="Microsoft.NAV">
      <EnumType Name="itemType">
        <Member Name="Inventory" Value="0"/>
        <Member Name="Non_x002D_Inventory" Value="2"/>
      </EnumType>
      <EntityType Name="item">
        <Key><PropertyRef Name="id"/></Key>
        <Property Name="id" Type="Edm.Guid" Nullable="false"/>
        <Property Name="displayName" Type="Edm.String" MaxLength="100"/>
        <Property Name="type" Type="Microsoft.NAV.itemType"/>
        <Property Name="unitPrice" Type="Edm.Decimal"/>
        <Property Name="lastModifiedDateTime" Type="Edm.DateTimeOffset"/>
        <Property Name="picture" Type="Edm.Stream"/>
        <NavigationProperty Name="itemCategory" Type="Microsoft.NAV.itemCategory"/>
      </EntityType>
      <EntityType Name="itemCategory">
        <Key><PropertyRef Name="id"/></Key>
        <Property Name="id" Type="Edm.Guid" Nullable="false"/>
        <Property Name="code" Type="Edm.String"/>
      </EntityType>
      <EntityContainer Name="NAV">
        <EntitySet Name="items" EntityType="Microsoft.NAV.item"/>
        <EntitySet Name="itemCategories" EntityType="Microsoft.NAV.itemCategory">
          <Annotation Term="Capabilities.UpdateRestrictions">
            <Record><PropertyValue Property="Updatable" Bool="false"/></Record>
          </Annotation>
        </EntitySet>
      </EntityContainer>
    </Schema>
  </edmx:DataServices>
</edmx:Edmx>"#;

    fn parsed() -> Metadata {
        metadata::parse(SCHEMA).unwrap()
    }

    #[test]
    fn test_ident_helpers() {
        assert_eq!(to_pascal_case("displayName"), "DisplayName");
        assert_eq!(to_pascal_case("ship_to_address"), "ShipToAddress");
        assert_eq!(method_ident("displayName"), "display_name");
        assert_eq!(method_ident("lastModifiedDateTime"), "last_modified_date_time");
        assert_eq!(method_ident("type"), "r#type");
    }

    #[test]
    fn test_enum_member_ident_strips_escape_artifacts() {
        assert_eq!(enum_member_ident("Non_x002D_Inventory", 2), "NonInventory");
        assert_eq!(enum_member_ident("In_x0020_Review", 1), "InReview");
        assert_eq!(enum_member_ident("_x002D_", 4), "Value4");
        assert_eq!(enum_member_ident("3rdParty", 5), "Value3rdParty");
    }

    #[test]
    fn test_record_ir_from_schema() {
        let metadata = parsed();
        let generator = Generator::new(&metadata, "unused");
        let def = generator
            .build_record(&metadata.entity_sets["items"])
            .unwrap();

        assert_eq!(def.name, "Item");
        assert_eq!(def.resource, "items");
        assert_eq!(def.primary_key, "id");

        let type_field = def.fields.iter().find(|f| f.name == "type").unwrap();
        assert_eq!(type_field.kind, FieldKind::Enum("ItemType".into()));
        assert_eq!(type_field.ident, "r#type");

        let price = def.fields.iter().find(|f| f.name == "unitPrice").unwrap();
        assert_eq!(price.kind, FieldKind::Float);
        assert!(price.with_setter);

        // The stream property and the navigation both land in relations
        assert!(def
            .relations
            .iter()
            .any(|r| r.name == "picture" && matches!(r.target, RelationTarget::Stream)));
        assert!(def.relations.iter().any(|r| r.name == "itemCategory"
            && matches!(&r.target, RelationTarget::Record(t) if t == "ItemCategory")));
    }

    #[test]
    fn test_non_updatable_set_suppresses_setters() {
        let metadata = parsed();
        let generator = Generator::new(&metadata, "unused");
        let def = generator
            .build_record(&metadata.entity_sets["itemCategories"])
            .unwrap();
        assert!(def.fields.iter().all(|f| !f.with_setter));
    }

    #[test]
    fn test_prefix_applies_to_type_names() {
        let metadata = parsed();
        let generator = Generator::new(&metadata, "unused").prefix("Bc");
        let def = generator
            .build_record(&metadata.entity_sets["items"])
            .unwrap();
        assert_eq!(def.name, "BcItem");
        assert_eq!(def.field_enum, "BcItemField");
        let type_field = def.fields.iter().find(|f| f.name == "type").unwrap();
        assert_eq!(type_field.kind, FieldKind::Enum("BcItemType".into()));
    }

    #[test]
    fn test_unmapped_edm_type_is_fatal() {
        let metadata = parsed();
        let generator = Generator::new(&metadata, "unused");
        assert!(matches!(
            generator.field_kind("Edm.GeographyPoint"),
            Err(Error::Schema(_))
        ));
        assert!(matches!(
            generator.field_kind("Collection(Edm.String)"),
            Err(Error::Schema(_))
        ));
    }

    #[test]
    fn test_generate_all_writes_expected_files() {
        let metadata = parsed();
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(&metadata, dir.path());
        let summary = generator.generate_all().unwrap();

        assert!(summary.skipped.is_empty());
        let names: Vec<String> = summary
            .written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"item_type.rs".to_string()));
        assert!(names.contains(&"item.rs".to_string()));
        assert!(names.contains(&"item_category.rs".to_string()));
        assert!(names.contains(&"mod.rs".to_string()));
    }

    #[test]
    fn test_second_run_without_overwrite_preserves_files() {
        let metadata = parsed();
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(&metadata, dir.path());
        let first = generator.generate_all().unwrap();

        // Make a file recognizably hand-edited
        let item_file = dir.path().join("item.rs");
        fs::write(&item_file, "// edited\n").unwrap();

        let second = generator.generate_all().unwrap();
        assert!(second.written.is_empty());
        assert_eq!(second.skipped.len(), first.written.len());
        assert_eq!(fs::read_to_string(&item_file).unwrap(), "// edited\n");
    }

    #[test]
    fn test_overwrite_regenerates_byte_identical_output() {
        let metadata = parsed();
        let dir = tempfile::tempdir().unwrap();

        Generator::new(&metadata, dir.path())
            .generate_all()
            .unwrap();
        let before = fs::read_to_string(dir.path().join("item.rs")).unwrap();

        fs::write(dir.path().join("item.rs"), "// edited\n").unwrap();
        Generator::new(&metadata, dir.path())
            .overwrite(true)
            .generate_all()
            .unwrap();
        let after = fs::read_to_string(dir.path().join("item.rs")).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_generate_single_set_emits_record_and_used_enums() {
        let metadata = parsed();
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(&metadata, dir.path());
        let summary = generator.generate_set("items").unwrap();

        let names: Vec<String> = summary
            .written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"item.rs".to_string()));
        assert!(names.contains(&"item_type.rs".to_string()));
        assert!(!names.contains(&"item_category.rs".to_string()));
    }

    #[test]
    fn test_generate_unknown_set_fails() {
        let metadata = parsed();
        let generator = Generator::new(&metadata, "unused");
        assert!(matches!(
            generator.generate_set("ghosts"),
            Err(Error::Schema(_))
        ));
    }
}
