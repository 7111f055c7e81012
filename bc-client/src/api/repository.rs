//! Generic repository over one entity set
//!
//! Composes the query builder, the entity model, and the transport
//! collaborator into the CRUD/query surface the generated repositories
//! expose. Every operation issues exactly one wire call (or exactly one
//! composite batch call) and fully processes the response before returning.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Error, Result};

use super::constants::BATCH_ENDPOINT;
use super::entity::{Entity, EntityDescriptor};
use super::filter::Filter;
use super::query::{Expand, OrderBy, QueryBuilder};
use super::transport::{
    BatchRequest, BatchResponse, BatchSubRequest, Request, Response, Transport,
};
use super::value::ODataValue;

/// A typed record over one entity set. Generated types implement this; the
/// repository only ever goes through the embedded [`Entity`].
pub trait Record: Send {
    /// Field registry of the record's entity type.
    fn descriptor() -> EntityDescriptor;
    /// Resource path of the backing entity set, e.g. `customers`.
    fn resource() -> &'static str;
    fn from_entity(entity: Entity) -> Self;
    fn entity(&self) -> &Entity;
    fn entity_mut(&mut self) -> &mut Entity;
}

/// Optional query modifiers for [`Repository::find_by`]
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub order: Vec<OrderBy>,
    pub limit: Option<u32>,
    pub skip: Option<u32>,
    pub expand: Vec<Expand>,
}

impl FindOptions {
    pub fn order(mut self, order: impl Into<OrderBy>) -> Self {
        self.order.push(order.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn expand(mut self, expand: Expand) -> Self {
        self.expand.push(expand);
        self
    }
}

/// CRUD and query operations over one entity set
pub struct Repository<T: Record> {
    transport: Arc<dyn Transport>,
    resource: String,
    marker: PhantomData<fn() -> T>,
}

impl<T: Record> Repository<T> {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            resource: T::resource().to_string(),
            marker: PhantomData,
        }
    }

    /// Override the entity set path, e.g. to address a company-scoped route.
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    fn ensure_success(response: &Response) -> Result<()> {
        if response.is_success() {
            Ok(())
        } else {
            Err(Error::from_status_body(response.status, &response.text()))
        }
    }

    fn hydrate(&self, body: Value) -> Result<T> {
        match body {
            Value::Object(map) => Ok(T::from_entity(Entity::from_object(T::descriptor(), map))),
            other => Err(Error::from_status_body(
                200,
                &format!("expected a JSON object, got: {other}"),
            )),
        }
    }

    /// Query the entity set with filter criteria and optional modifiers.
    pub async fn find_by(&self, criteria: Vec<Filter>, options: FindOptions) -> Result<Vec<T>> {
        let mut query = QueryBuilder::new(&self.resource)
            .filter_all(criteria)
            .expand_all(options.expand)
            .order_by_all(options.order);
        if let Some(limit) = options.limit {
            query = query.top(limit);
        }
        if let Some(skip) = options.skip {
            query = query.skip(skip);
        }
        let uri = query.build()?;

        log::debug!("GET {uri}");
        let response = self.transport.send(Request::get(uri)).await?;
        Self::ensure_success(&response)?;

        let envelope: Value = response.json()?;
        let Some(items) = envelope.get("value").and_then(Value::as_array) else {
            log::warn!("response envelope for {} carried no result list", self.resource);
            return Ok(Vec::new());
        };
        let mut records = Vec::with_capacity(items.len());
        for item in items {
            records.push(self.hydrate(item.clone())?);
        }
        log::debug!("{} returned {} records", self.resource, records.len());
        Ok(records)
    }

    pub async fn find_all(&self) -> Result<Vec<T>> {
        self.find_by(Vec::new(), FindOptions::default()).await
    }

    /// First record matching the criteria, if any.
    pub async fn find_one_by(&self, criteria: Vec<Filter>) -> Result<Option<T>> {
        let mut records = self
            .find_by(criteria, FindOptions::default().limit(1))
            .await?;
        Ok(if records.is_empty() {
            None
        } else {
            Some(records.swap_remove(0))
        })
    }

    /// Fetch one record by key. A 404 means "no result", not an error.
    pub async fn get(&self, key: impl Into<ODataValue>, expand: Vec<Expand>) -> Result<Option<T>> {
        let uri = QueryBuilder::new(&self.resource)
            .key(key)
            .expand_all(expand)
            .build()?;

        log::debug!("GET {uri}");
        let response = self.transport.send(Request::get(uri)).await?;
        if response.is_not_found() {
            return Ok(None);
        }
        Self::ensure_success(&response)?;
        Ok(Some(self.hydrate(response.json()?)?))
    }

    /// Fetch one record by key without expansion.
    pub async fn find(&self, key: impl Into<ODataValue>) -> Result<Option<T>> {
        self.get(key, Vec::new()).await
    }

    /// Create the record on the server and re-hydrate it in place, making
    /// server-assigned fields (key, concurrency token) visible immediately.
    pub async fn create(&self, record: &mut T) -> Result<()> {
        if record.entity().etag().is_some() {
            return Err(Error::Precondition(
                "entity already carries a concurrency token; it exists on the server".into(),
            ));
        }
        let body = Value::Object(record.entity().changes_deep());

        log::debug!("POST {}", self.resource);
        let request = Request::post(&self.resource).json(&body)?;
        let response = self.transport.send(request).await?;
        if !response.is_created() {
            return Err(Error::from_status_body(response.status, &response.text()));
        }
        self.reload(record, response.json()?)
    }

    /// Push the plain-field diff of a persisted record. A clean record is a
    /// no-op; the concurrency token rides along as a precondition.
    pub async fn update(&self, record: &mut T) -> Result<()> {
        let Some(etag) = record.entity().etag() else {
            return Err(Error::Precondition(
                "entity has no concurrency token; create it first".into(),
            ));
        };
        let diff = record.entity().changes();
        if diff.is_empty() {
            log::debug!("{}: no pending changes, skipping update", self.resource);
            return Ok(());
        }
        let key = record.entity().primary_key_literal().ok_or_else(|| {
            Error::Precondition("entity has no primary key value".into())
        })?;
        let uri = format!("{}({})", self.resource, key);

        log::debug!("PATCH {uri}");
        let request = Request::patch(uri)
            .if_match(&etag)
            .json(&Value::Object(diff))?;
        let response = self.transport.send(request).await?;
        Self::ensure_success(&response)?;
        if response.body.is_empty() {
            return Ok(());
        }
        self.reload(record, response.json()?)
    }

    /// Delete a persisted record; its concurrency token is cleared on
    /// success.
    pub async fn delete(&self, record: &mut T) -> Result<()> {
        let Some(etag) = record.entity().etag() else {
            return Err(Error::Precondition(
                "entity has no concurrency token; nothing to delete".into(),
            ));
        };
        let key = record.entity().primary_key_literal().ok_or_else(|| {
            Error::Precondition("entity has no primary key value".into())
        })?;
        let uri = format!("{}({})", self.resource, key);

        log::debug!("DELETE {uri}");
        let response = self
            .transport
            .send(Request::delete(uri).if_match(&etag))
            .await?;
        if !response.is_no_content() {
            return Err(Error::from_status_body(response.status, &response.text()));
        }
        record.entity_mut().clear_etag();
        Ok(())
    }

    /// Update when persisted, create otherwise.
    pub async fn save(&self, record: &mut T) -> Result<()> {
        if record.entity().etag().is_some() {
            self.update(record).await
        } else {
            self.create(record).await
        }
    }

    /// Send every dirty record in one batch envelope: PATCH for persisted
    /// records, POST for transient ones. Clean records are skipped; with no
    /// dirty records at all, no wire call is made. Each record re-hydrates
    /// from its correspondingly-keyed sub-response.
    pub async fn batch_update(&self, records: &mut [T]) -> Result<()> {
        let mut requests = Vec::new();
        let mut targets: HashMap<String, usize> = HashMap::new();

        for (index, record) in records.iter().enumerate() {
            let entity = record.entity();
            let sub = if let Some(etag) = entity.etag() {
                let diff = entity.changes();
                if diff.is_empty() {
                    continue;
                }
                let key = entity.primary_key_literal().ok_or_else(|| {
                    Error::Precondition("entity has no primary key value".into())
                })?;
                BatchSubRequest {
                    id: (index + 1).to_string(),
                    method: "PATCH".to_string(),
                    url: format!("{}({})", self.resource, key),
                    headers: HashMap::from([("If-Match".to_string(), etag)]),
                    body: Some(Value::Object(diff)),
                }
            } else {
                let diff = entity.changes_deep();
                if diff.is_empty() {
                    continue;
                }
                BatchSubRequest {
                    id: (index + 1).to_string(),
                    method: "POST".to_string(),
                    url: self.resource.clone(),
                    headers: HashMap::new(),
                    body: Some(Value::Object(diff)),
                }
            };
            targets.insert(sub.id.clone(), index);
            requests.push(sub);
        }

        if requests.is_empty() {
            log::debug!("{}: no dirty entities, skipping batch", self.resource);
            return Ok(());
        }

        log::debug!(
            "POST {} with {} sub-requests",
            BATCH_ENDPOINT,
            requests.len()
        );
        let envelope = serde_json::to_value(BatchRequest { requests })?;
        let request = Request::post(BATCH_ENDPOINT).json(&envelope)?;
        let response = self.transport.send(request).await?;
        Self::ensure_success(&response)?;

        let batch: BatchResponse = response.json()?;
        for sub in batch.responses {
            let Some(&index) = targets.get(&sub.id) else {
                log::warn!("batch response carried unknown sub-request id '{}'", sub.id);
                continue;
            };
            if let Some(Value::Object(map)) = sub.body {
                records[index].entity_mut().load(map);
            }
        }
        Ok(())
    }

    fn reload(&self, record: &mut T, body: Value) -> Result<()> {
        match body {
            Value::Object(map) => {
                record.entity_mut().load(map);
                Ok(())
            }
            other => Err(Error::from_status_body(
                200,
                &format!("expected a JSON object, got: {other}"),
            )),
        }
    }
}
