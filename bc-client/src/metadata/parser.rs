//! EDM/CSDL `$metadata` parser

use std::collections::BTreeMap;

use roxmltree::{Document, Node};

use crate::error::{Error, Result};

use super::models::{
    BoundAction, EntitySet, EntityType, EnumType, Metadata, NavigationProperty, Property,
};

/// Parse a `$metadata` document into the typed schema model.
///
/// Every dangling reference (an entity set naming an unknown entity type, a
/// navigation property targeting one, an action bound to one) is a fatal
/// error rather than a silent skip.
pub fn parse(metadata_xml: &str) -> Result<Metadata> {
    log::info!(
        "parsing metadata document, {} bytes",
        metadata_xml.len()
    );
    let doc = Document::parse(metadata_xml)?;

    let schema = doc
        .descendants()
        .find(|node| node.tag_name().name() == "Schema")
        .ok_or_else(|| Error::Schema("document has no Schema element".into()))?;
    let namespace = schema
        .attribute("Namespace")
        .ok_or_else(|| Error::Schema("Schema element has no Namespace".into()))?
        .to_string();

    let mut metadata = Metadata {
        namespace,
        entity_types: BTreeMap::new(),
        entity_sets: BTreeMap::new(),
        enum_types: BTreeMap::new(),
        actions: Vec::new(),
    };

    for node in schema.children().filter(Node::is_element) {
        match node.tag_name().name() {
            "EnumType" => {
                let enum_type = parse_enum_type(&node)?;
                metadata.enum_types.insert(enum_type.name.clone(), enum_type);
            }
            "EntityType" => {
                let entity_type = parse_entity_type(&node)?;
                metadata
                    .entity_types
                    .insert(entity_type.name.clone(), entity_type);
            }
            _ => {}
        }
    }

    // Second pass: the container and the actions reference entity types, so
    // they resolve against the complete type map
    for node in schema.children().filter(Node::is_element) {
        match node.tag_name().name() {
            "EntityContainer" => {
                for set_node in node
                    .children()
                    .filter(|n| n.tag_name().name() == "EntitySet")
                {
                    let set = parse_entity_set(&set_node, &metadata)?;
                    metadata.entity_sets.insert(set.name.clone(), set);
                }
            }
            "Action" => {
                if let Some(action) = parse_action(&node, &metadata)? {
                    metadata.actions.push(action);
                }
            }
            _ => {}
        }
    }

    // Navigation targets must resolve too
    for entity_type in metadata.entity_types.values() {
        for (nav_name, nav) in &entity_type.navigation_properties {
            let target = metadata.local_name(nav.target_type_name()).to_string();
            if !metadata.entity_types.contains_key(&target) {
                return Err(Error::Schema(format!(
                    "navigation property '{}.{}' targets unknown entity type '{}'",
                    entity_type.name, nav_name, target
                )));
            }
        }
    }

    log::info!(
        "parsed {} entity types, {} entity sets, {} enum types, {} bound actions",
        metadata.entity_types.len(),
        metadata.entity_sets.len(),
        metadata.enum_types.len(),
        metadata.actions.len()
    );
    Ok(metadata)
}

fn parse_enum_type(node: &Node) -> Result<EnumType> {
    let name = required_attribute(node, "Name")?;
    let mut members = BTreeMap::new();
    for (position, member) in node
        .children()
        .filter(|n| n.tag_name().name() == "Member")
        .enumerate()
    {
        let member_name = required_attribute(&member, "Name")?;
        // Declared numeric values are the mapping keys; members without one
        // fall back to their position
        let value = match member.attribute("Value") {
            Some(raw) => raw.parse::<i64>().map_err(|_| {
                Error::Schema(format!(
                    "enum '{name}' member '{member_name}' has non-numeric value '{raw}'"
                ))
            })?,
            None => position as i64,
        };
        members.insert(value, member_name);
    }
    Ok(EnumType { name, members })
}

fn parse_entity_type(node: &Node) -> Result<EntityType> {
    let name = required_attribute(node, "Name")?;

    let key = node
        .children()
        .find(|n| n.tag_name().name() == "Key")
        .and_then(|key_node| {
            key_node
                .children()
                .find(|n| n.tag_name().name() == "PropertyRef")
        })
        .and_then(|prop_ref| prop_ref.attribute("Name"))
        .ok_or_else(|| Error::Schema(format!("entity type '{name}' declares no key property")))?
        .to_string();

    let mut properties = BTreeMap::new();
    let mut navigation_properties = BTreeMap::new();
    for child in node.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "Property" => {
                let prop_name = required_attribute(&child, "Name")?;
                properties.insert(
                    prop_name,
                    Property {
                        edm_type: required_attribute(&child, "Type")?,
                        nullable: child.attribute("Nullable") != Some("false"),
                        max_length: child
                            .attribute("MaxLength")
                            .and_then(|v| v.parse().ok()),
                    },
                );
            }
            "NavigationProperty" => {
                let nav_name = required_attribute(&child, "Name")?;
                let mut constraints = BTreeMap::new();
                for constraint in child
                    .children()
                    .filter(|n| n.tag_name().name() == "ReferentialConstraint")
                {
                    if let (Some(local), Some(referenced)) = (
                        constraint.attribute("Property"),
                        constraint.attribute("ReferencedProperty"),
                    ) {
                        constraints.insert(local.to_string(), referenced.to_string());
                    }
                }
                navigation_properties.insert(
                    nav_name,
                    NavigationProperty {
                        target_type: required_attribute(&child, "Type")?,
                        partner: child.attribute("Partner").map(str::to_string),
                        constraints,
                    },
                );
            }
            _ => {}
        }
    }

    Ok(EntityType {
        name,
        key,
        properties,
        navigation_properties,
    })
}

fn parse_entity_set(node: &Node, metadata: &Metadata) -> Result<EntitySet> {
    let name = required_attribute(node, "Name")?;
    let qualified_type = required_attribute(node, "EntityType")?;
    let entity_type = metadata.local_name(&qualified_type).to_string();
    if !metadata.entity_types.contains_key(&entity_type) {
        return Err(Error::Schema(format!(
            "entity set '{name}' references unknown entity type '{qualified_type}'"
        )));
    }

    // Capability annotations: <Annotation Term="..."><Record><PropertyValue
    // Property="..." Bool="..."/></Record></Annotation>
    let mut capabilities = BTreeMap::new();
    for annotation in node
        .children()
        .filter(|n| n.tag_name().name() == "Annotation")
    {
        let Some(term) = annotation.attribute("Term") else {
            continue;
        };
        for property_value in annotation
            .descendants()
            .filter(|n| n.tag_name().name() == "PropertyValue")
        {
            if let (Some(property), Some(flag)) = (
                property_value.attribute("Property"),
                property_value.attribute("Bool"),
            ) {
                capabilities.insert(format!("{term}.{property}"), flag == "true");
            }
        }
    }

    Ok(EntitySet {
        name,
        entity_type,
        capabilities,
    })
}

fn parse_action(node: &Node, metadata: &Metadata) -> Result<Option<BoundAction>> {
    if node.attribute("IsBound") != Some("true") {
        return Ok(None);
    }
    let name = required_attribute(node, "Name")?;
    let binding = node
        .children()
        .find(|n| n.tag_name().name() == "Parameter")
        .and_then(|p| p.attribute("Type"))
        .ok_or_else(|| {
            Error::Schema(format!("bound action '{name}' has no binding parameter"))
        })?;
    let stripped = binding
        .strip_prefix("Collection(")
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(binding);
    let entity_type = metadata.local_name(stripped).to_string();
    if !metadata.entity_types.contains_key(&entity_type) {
        return Err(Error::Schema(format!(
            "bound action '{name}' is bound to unknown entity type '{binding}'"
        )));
    }
    Ok(Some(BoundAction { name, entity_type }))
}

fn required_attribute(node: &Node, attribute: &str) -> Result<String> {
    node.attribute(attribute)
        .map(str::to_string)
        .ok_or_else(|| {
            Error::Schema(format!(
                "element '{}' is missing the '{attribute}' attribute",
                node.tag_name().name()
            ))
        })
}
