//! Generic entity model
//!
//! An [`Entity`] is a property bag over the JSON shape the service returns:
//! plain data fields live in `raw`, declared relations live in hydrated
//! slots, and a snapshot taken when a concurrency token is present drives
//! dirty tracking for partial updates. Relation hydration only ever happens
//! from data already in hand; nothing here touches the network.

pub mod collection;
pub mod descriptor;
pub mod stream;

pub use collection::EntityCollection;
pub use descriptor::{DescriptorFn, EntityDescriptor, RelationKind};
pub use stream::DataStream;

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{Error, Result};

use super::constants::{
    CONTEXT_FIELD, ETAG_FIELD, MEDIA_EDIT_LINK_SUFFIX, MEDIA_READ_LINK_SUFFIX,
};
use super::value::{format_date, format_datetime, parse_date, parse_datetime, ODataValue};

static EMPTY_COLLECTION: EntityCollection = EntityCollection::new();

/// Hydration state of one declared relation
#[derive(Debug, Clone, Default)]
pub enum Slot {
    /// Declared but not loaded; reads as null / empty collection
    #[default]
    Empty,
    One(Box<Entity>),
    Many(EntityCollection),
    Stream(DataStream),
}

/// Generic representation of one API resource instance
#[derive(Debug, Clone)]
pub struct Entity {
    descriptor: EntityDescriptor,
    /// Plain fields as last loaded from the server (or set locally)
    raw: Map<String, Value>,
    /// Baseline snapshot; present only while a concurrency token is held
    original: Option<Map<String, Value>>,
    /// Hydrated relation slots, one per declared relation plus any media
    /// links discovered during load
    slots: BTreeMap<String, Slot>,
    /// Server-provided resource context path, kept for diagnostics
    context: Option<String>,
}

impl Entity {
    pub fn new(descriptor: EntityDescriptor) -> Self {
        let mut slots = BTreeMap::new();
        for (name, _) in descriptor.relations {
            slots.insert((*name).to_string(), Slot::Empty);
        }
        Self {
            descriptor,
            raw: Map::new(),
            original: None,
            slots,
            context: None,
        }
    }

    /// Untyped entity: identity field `id`, no declared relations.
    pub fn generic() -> Self {
        Self::new(EntityDescriptor::generic())
    }

    /// Construct and load in one step.
    pub fn from_object(descriptor: EntityDescriptor, data: Map<String, Value>) -> Self {
        let mut entity = Self::new(descriptor);
        entity.load(data);
        entity
    }

    pub fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    /// Server-provided resource path for this instance, if one was loaded.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Merge a server response into this instance.
    ///
    /// Media-link keys construct a [`DataStream`] slot for their base
    /// property name, declared relation names hydrate their slot, and
    /// everything else lands in the plain fields. If the merged data carries
    /// a concurrency token, the result becomes the new clean baseline.
    pub fn load(&mut self, data: Map<String, Value>) {
        for (key, value) in data {
            if key == CONTEXT_FIELD {
                if let Value::String(path) = value {
                    self.context = Some(path);
                }
                continue;
            }
            if let Some(base) = key
                .strip_suffix(MEDIA_READ_LINK_SUFFIX)
                .or_else(|| key.strip_suffix(MEDIA_EDIT_LINK_SUFFIX))
            {
                if let Value::String(url) = value {
                    let slot = self.slots.entry(base.to_string()).or_default();
                    // First link seen wins; read and edit links address the
                    // same resource
                    if !matches!(slot, Slot::Stream(_)) {
                        *slot = Slot::Stream(DataStream::new(url));
                    }
                }
                continue;
            }
            if let Some(kind) = self.descriptor.relation(&key) {
                let slot = Self::hydrate(kind, value);
                self.slots.insert(key, slot);
                continue;
            }
            self.raw.insert(key, value);
        }
        if self.raw.contains_key(ETAG_FIELD) {
            self.original = Some(self.raw.clone());
        }
    }

    /// Hydrate one relation value according to its declared kind. The
    /// declared cardinality always wins over the JSON shape: a lone object
    /// in a collection slot becomes a one-element collection.
    fn hydrate(kind: RelationKind, value: Value) -> Slot {
        match (kind, value) {
            (_, Value::Null) => Slot::Empty,
            (RelationKind::Single(target), Value::Object(map)) => {
                Slot::One(Box::new(Entity::from_object(target(), map)))
            }
            (RelationKind::Collection(target), Value::Array(items)) => {
                let mut collection = EntityCollection::new();
                for item in items {
                    match item {
                        Value::Object(map) => {
                            collection.push(Entity::from_object(target(), map));
                        }
                        other => {
                            log::warn!("skipping non-object collection member: {other}");
                        }
                    }
                }
                Slot::Many(collection)
            }
            (RelationKind::Collection(target), Value::Object(map)) => {
                let mut collection = EntityCollection::new();
                collection.push(Entity::from_object(target(), map));
                Slot::Many(collection)
            }
            (RelationKind::Stream, Value::String(url)) => Slot::Stream(DataStream::new(url)),
            (kind, other) => {
                log::warn!("cannot hydrate {other} into a {kind:?} slot");
                Slot::Empty
            }
        }
    }

    // --- plain field access ---

    /// Raw value of a plain field. Declared relations must be read through
    /// the relation accessors; unknown names fail.
    pub fn get_raw(&self, name: &str) -> Result<&Value> {
        if self.slots.contains_key(name) {
            return Err(Error::Property(format!(
                "'{name}' is an expanded property; use the relation accessors"
            )));
        }
        self.raw
            .get(name)
            .ok_or_else(|| Error::Property(format!("entity has no property '{name}'")))
    }

    pub fn get_str(&self, name: &str) -> Result<Option<String>> {
        Ok(match self.get_raw(name)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            other => Some(other.to_string()),
        })
    }

    pub fn get_i64(&self, name: &str) -> Result<Option<i64>> {
        Ok(match self.get_raw(name)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }

    pub fn get_f64(&self, name: &str) -> Result<Option<f64>> {
        Ok(match self.get_raw(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }

    pub fn get_bool(&self, name: &str) -> Result<Option<bool>> {
        Ok(match self.get_raw(name)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }

    /// GUID value of a field; the all-zero GUID reads as `None`.
    pub fn get_guid(&self, name: &str) -> Result<Option<Uuid>> {
        Ok(match self.get_raw(name)? {
            Value::String(s) => match Uuid::parse_str(s) {
                Ok(guid) if guid.is_nil() => None,
                Ok(guid) => Some(guid),
                Err(_) => None,
            },
            _ => None,
        })
    }

    /// Date-time value of a field; the year-zero placeholder reads as
    /// `None`.
    pub fn get_datetime(&self, name: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(match self.get_raw(name)? {
            Value::String(s) => parse_datetime(s),
            _ => None,
        })
    }

    pub fn get_date(&self, name: &str) -> Result<Option<NaiveDate>> {
        Ok(match self.get_raw(name)? {
            Value::String(s) => parse_date(s),
            _ => None,
        })
    }

    /// Store a raw value. Declared relation names re-hydrate their slot
    /// instead; storing `Null` clears the field to null.
    pub fn set(&mut self, name: &str, value: Value) {
        if let Some(kind) = self.descriptor.relation(name) {
            let slot = Self::hydrate(kind, value);
            self.slots.insert(name.to_string(), slot);
            return;
        }
        self.raw.insert(name.to_string(), value);
    }

    pub fn set_str(&mut self, name: &str, value: Option<&str>) {
        self.set(
            name,
            value.map_or(Value::Null, |s| Value::String(s.to_string())),
        );
    }

    pub fn set_i64(&mut self, name: &str, value: Option<i64>) {
        self.set(name, value.map_or(Value::Null, Value::from));
    }

    pub fn set_f64(&mut self, name: &str, value: Option<f64>) {
        self.set(name, value.map_or(Value::Null, Value::from));
    }

    pub fn set_bool(&mut self, name: &str, value: Option<bool>) {
        self.set(name, value.map_or(Value::Null, Value::Bool));
    }

    pub fn set_guid(&mut self, name: &str, value: Option<Uuid>) {
        self.set(
            name,
            value.map_or(Value::Null, |g| Value::String(g.to_string())),
        );
    }

    /// Store a date-time through the fixed wire format.
    pub fn set_datetime(&mut self, name: &str, value: Option<DateTime<Utc>>) {
        self.set(
            name,
            value.map_or(Value::Null, |dt| Value::String(format_datetime(&dt))),
        );
    }

    /// Store a date through the fixed wire format.
    pub fn set_date(&mut self, name: &str, value: Option<NaiveDate>) {
        self.set(
            name,
            value.map_or(Value::Null, |d| Value::String(format_date(&d))),
        );
    }

    // --- relation access ---

    fn slot(&self, name: &str) -> Result<&Slot> {
        self.slots.get(name).ok_or_else(|| {
            Error::Property(format!("'{name}' is not a declared relation of this entity"))
        })
    }

    /// Single related entity; `None` while the slot is not loaded.
    pub fn one(&self, name: &str) -> Result<Option<&Entity>> {
        match self.slot(name)? {
            Slot::Empty => Ok(None),
            Slot::One(entity) => Ok(Some(entity)),
            _ => Err(Error::Property(format!(
                "'{name}' is not a single-entity relation"
            ))),
        }
    }

    pub fn one_mut(&mut self, name: &str) -> Result<Option<&mut Entity>> {
        match self.slots.get_mut(name) {
            Some(Slot::Empty) => Ok(None),
            Some(Slot::One(entity)) => Ok(Some(entity)),
            Some(_) => Err(Error::Property(format!(
                "'{name}' is not a single-entity relation"
            ))),
            None => Err(Error::Property(format!(
                "'{name}' is not a declared relation of this entity"
            ))),
        }
    }

    /// Related collection; empty while the slot is not loaded.
    pub fn many(&self, name: &str) -> Result<&EntityCollection> {
        match self.slot(name)? {
            Slot::Empty => Ok(&EMPTY_COLLECTION),
            Slot::Many(collection) => Ok(collection),
            _ => Err(Error::Property(format!(
                "'{name}' is not a collection relation"
            ))),
        }
    }

    /// Mutable related collection, materializing an empty one on first use.
    pub fn many_mut(&mut self, name: &str) -> Result<&mut EntityCollection> {
        match self.slots.get_mut(name) {
            Some(slot @ Slot::Empty) => {
                *slot = Slot::Many(EntityCollection::new());
                match slot {
                    Slot::Many(collection) => Ok(collection),
                    _ => unreachable!(),
                }
            }
            Some(Slot::Many(collection)) => Ok(collection),
            Some(_) => Err(Error::Property(format!(
                "'{name}' is not a collection relation"
            ))),
            None => Err(Error::Property(format!(
                "'{name}' is not a declared relation of this entity"
            ))),
        }
    }

    /// Media resource reference; `None` until a media link has been loaded.
    pub fn media(&self, name: &str) -> Result<Option<&DataStream>> {
        match self.slot(name)? {
            Slot::Empty => Ok(None),
            Slot::Stream(stream) => Ok(Some(stream)),
            _ => Err(Error::Property(format!("'{name}' is not a media property"))),
        }
    }

    /// Replace a single-entity slot with an already-hydrated instance.
    pub fn set_related(&mut self, name: &str, entity: Entity) -> Result<()> {
        match self.descriptor.relation(name) {
            Some(RelationKind::Single(_)) => {
                self.slots.insert(name.to_string(), Slot::One(Box::new(entity)));
                Ok(())
            }
            _ => Err(Error::Property(format!(
                "'{name}' is not a single-entity relation"
            ))),
        }
    }

    /// Replace a collection slot with an already-hydrated collection.
    pub fn set_collection(&mut self, name: &str, collection: EntityCollection) -> Result<()> {
        match self.descriptor.relation(name) {
            Some(RelationKind::Collection(_)) => {
                self.slots.insert(name.to_string(), Slot::Many(collection));
                Ok(())
            }
            _ => Err(Error::Property(format!(
                "'{name}' is not a collection relation"
            ))),
        }
    }

    // --- dirty tracking ---

    /// Plain fields that differ from the clean baseline; every field when no
    /// baseline exists. Annotation fields never appear in the diff.
    pub fn changes(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, value) in &self.raw {
            if key.starts_with('@') {
                continue;
            }
            let unchanged = self
                .original
                .as_ref()
                .is_some_and(|baseline| baseline.get(key) == Some(value));
            if !unchanged {
                out.insert(key.clone(), value.clone());
            }
        }
        out
    }

    /// Like [`Self::changes`], additionally walking every hydrated relation
    /// slot. Collection slots contribute a position-keyed object of their
    /// changed members; empty contributions are omitted.
    pub fn changes_deep(&self) -> Map<String, Value> {
        let mut out = self.changes();
        for (name, slot) in &self.slots {
            match slot {
                Slot::One(entity) => {
                    let diff = entity.changes();
                    if !diff.is_empty() {
                        out.insert(name.clone(), Value::Object(diff));
                    }
                }
                Slot::Many(collection) => {
                    let diff = collection.changes();
                    if !diff.is_empty() {
                        out.insert(name.clone(), Value::Object(diff));
                    }
                }
                _ => {}
            }
        }
        out
    }

    pub fn is_dirty(&self) -> bool {
        !self.changes_deep().is_empty()
    }

    // --- identity and concurrency token ---

    /// Concurrency token, URL-decoded. Presence means this instance is known
    /// to exist on the server.
    pub fn etag(&self) -> Option<String> {
        match self.raw.get(ETAG_FIELD)? {
            Value::String(s) => Some(
                urlencoding::decode(s)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or_else(|_| s.clone()),
            ),
            _ => None,
        }
    }

    pub fn set_etag(&mut self, etag: impl Into<String>) {
        self.raw.insert(ETAG_FIELD.to_string(), Value::String(etag.into()));
    }

    /// Drop the concurrency token and the clean baseline with it; the
    /// instance reads as never persisted afterwards.
    pub fn clear_etag(&mut self) {
        self.raw.remove(ETAG_FIELD);
        self.original = None;
    }

    pub fn primary_key(&self) -> Option<&Value> {
        self.raw.get(self.descriptor.primary_key)
    }

    /// Identity value rendered as a URI literal, for key predicates.
    pub fn primary_key_literal(&self) -> Option<String> {
        self.primary_key().map(|v| ODataValue::from(v).encode())
    }

    pub fn set_primary_key(&mut self, value: Value) {
        self.raw
            .insert(self.descriptor.primary_key.to_string(), value);
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::generic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn line_descriptor() -> EntityDescriptor {
        EntityDescriptor::generic()
    }

    fn order_descriptor() -> EntityDescriptor {
        EntityDescriptor {
            primary_key: "id",
            relations: &[
                ("salesOrderLines", RelationKind::Collection(line_descriptor)),
                ("customer", RelationKind::Single(line_descriptor)),
                ("picture", RelationKind::Stream),
            ],
        }
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn loaded_order() -> Entity {
        let mut entity = Entity::new(order_descriptor());
        entity.load(object(json!({
            "@odata.etag": "W/\"JzE2OzE3Nzc2OTcc\"",
            "id": "f3c1c612-fc83-f011-a6f5-000d3a4b6d9d",
            "number": "S-ORD-1001",
            "status": "Open",
            "totalAmount": 1250.75,
        })));
        entity
    }

    #[test]
    fn test_clean_after_load_with_etag() {
        let entity = loaded_order();
        assert!(entity.etag().is_some());
        assert!(entity.changes().is_empty());
        assert!(!entity.is_dirty());
    }

    #[test]
    fn test_diff_contains_exactly_the_changed_field() {
        let mut entity = loaded_order();
        entity.set_str("status", Some("Released"));
        let diff = entity.changes();
        assert_eq!(diff.len(), 1);
        assert_eq!(diff.get("status"), Some(&json!("Released")));
    }

    #[test]
    fn test_setting_baseline_value_is_not_a_change() {
        let mut entity = loaded_order();
        entity.set_str("status", Some("Open"));
        assert!(entity.changes().is_empty());
    }

    #[test]
    fn test_all_fields_are_new_without_etag() {
        let mut entity = Entity::new(order_descriptor());
        entity.load(object(json!({"number": "S-ORD-1002", "status": "Draft"})));
        let diff = entity.changes();
        assert_eq!(diff.len(), 2);
    }

    #[test]
    fn test_unknown_property_fails() {
        let entity = loaded_order();
        match entity.get_str("noSuchField") {
            Err(Error::Property(msg)) => assert!(msg.contains("noSuchField")),
            other => panic!("expected property error, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_read_of_relation_fails() {
        let entity = loaded_order();
        assert!(matches!(
            entity.get_str("salesOrderLines"),
            Err(Error::Property(_))
        ));
    }

    #[test]
    fn test_unloaded_relation_reads_as_empty() {
        let entity = loaded_order();
        assert!(entity.one("customer").unwrap().is_none());
        assert!(entity.many("salesOrderLines").unwrap().is_empty());
        assert!(entity.media("picture").unwrap().is_none());
    }

    #[test]
    fn test_zero_guid_reads_as_none() {
        let mut entity = Entity::generic();
        entity.load(object(json!({
            "id": "00000000-0000-0000-0000-000000000000"
        })));
        assert_eq!(entity.get_guid("id").unwrap(), None);
    }

    #[test]
    fn test_year_zero_datetime_reads_as_none() {
        let mut entity = Entity::generic();
        entity.load(object(json!({
            "lastModified": "0000-01-01T00:00:00Z",
            "postingDate": "0000-01-01",
        })));
        assert_eq!(entity.get_datetime("lastModified").unwrap(), None);
        assert_eq!(entity.get_date("postingDate").unwrap(), None);
    }

    #[test]
    fn test_collection_hydration_from_array() {
        let mut entity = Entity::new(order_descriptor());
        entity.load(object(json!({
            "id": "x",
            "salesOrderLines": [
                {"sequence": 10000, "description": "Bicycle"},
                {"sequence": 20000, "description": "Helmet"},
            ],
        })));
        let lines = entity.many("salesOrderLines").unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines.get(0).unwrap().get_str("description").unwrap(),
            Some("Bicycle".to_string())
        );
    }

    #[test]
    fn test_lone_object_hydrates_as_one_element_collection() {
        let mut entity = Entity::new(order_descriptor());
        entity.load(object(json!({
            "salesOrderLines": {"sequence": 10000, "description": "Bicycle"},
        })));
        assert_eq!(entity.many("salesOrderLines").unwrap().len(), 1);
    }

    #[test]
    fn test_single_relation_hydration() {
        let mut entity = Entity::new(order_descriptor());
        entity.load(object(json!({
            "customer": {"displayName": "Adatum Corporation"},
        })));
        let customer = entity.one("customer").unwrap().unwrap();
        assert_eq!(
            customer.get_str("displayName").unwrap(),
            Some("Adatum Corporation".to_string())
        );
    }

    #[test]
    fn test_null_relation_stays_empty() {
        let mut entity = Entity::new(order_descriptor());
        entity.load(object(json!({"customer": null})));
        assert!(entity.one("customer").unwrap().is_none());
    }

    #[test]
    fn test_media_links_build_stream_slots() {
        let mut entity = Entity::new(order_descriptor());
        entity.load(object(json!({
            "picture@odata.mediaReadLink": "https://api/pictures(1)/content",
            "picture@odata.mediaEditLink": "https://api/pictures(1)/content",
        })));
        let stream = entity.media("picture").unwrap().unwrap();
        assert_eq!(stream.url(), "https://api/pictures(1)/content");
        // The link key never becomes a plain field
        assert!(entity.get_str("picture@odata.mediaReadLink").is_err());
    }

    #[test]
    fn test_deep_changes_tag_collection_members_by_position() {
        let mut entity = loaded_order();
        entity.set_collection("salesOrderLines", {
            let mut lines = EntityCollection::new();
            let mut clean = Entity::generic();
            clean.load(object(json!({"@odata.etag": "W/\"a\"", "sequence": 10000})));
            lines.push(clean);
            let mut changed = Entity::generic();
            changed.load(object(json!({"@odata.etag": "W/\"b\"", "sequence": 20000})));
            changed.set_i64("quantity", Some(3));
            lines.push(changed);
            lines
        })
        .unwrap();

        let deep = entity.changes_deep();
        let lines = deep.get("salesOrderLines").unwrap().as_object().unwrap();
        assert!(lines.get("0").is_none());
        assert_eq!(lines.get("1").unwrap(), &json!({"quantity": 3}));
    }

    #[test]
    fn test_deep_changes_omit_clean_slots() {
        let entity = loaded_order();
        assert!(entity.changes_deep().is_empty());
    }

    #[test]
    fn test_etag_is_url_decoded() {
        let mut entity = Entity::generic();
        entity.set_etag("W/%22JzE2Oyc%22");
        assert_eq!(entity.etag().unwrap(), "W/\"JzE2Oyc\"");
    }

    #[test]
    fn test_clear_etag_drops_baseline() {
        let mut entity = loaded_order();
        entity.clear_etag();
        assert!(entity.etag().is_none());
        // Without a baseline every remaining field counts as new
        assert!(!entity.changes().is_empty());
    }

    #[test]
    fn test_primary_key_literal() {
        let entity = loaded_order();
        assert_eq!(
            entity.primary_key_literal().unwrap(),
            "f3c1c612-fc83-f011-a6f5-000d3a4b6d9d"
        );
    }

    #[test]
    fn test_set_null_clears_field() {
        let mut entity = loaded_order();
        entity.set_str("status", None);
        assert_eq!(entity.get_str("status").unwrap(), None);
        assert_eq!(entity.changes().get("status"), Some(&Value::Null));
    }

    #[test]
    fn test_set_datetime_stores_wire_format() {
        use chrono::TimeZone;
        let mut entity = Entity::generic();
        let dt = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        entity.set_datetime("shipmentDate", Some(dt));
        assert_eq!(
            entity.get_raw("shipmentDate").unwrap(),
            &json!("2026-03-14T09:26:53.000Z")
        );
        assert_eq!(entity.get_datetime("shipmentDate").unwrap(), Some(dt));
    }
}
