//! Transport collaborator boundary
//!
//! The core never talks HTTP directly; every wire call goes through the
//! [`Transport`] trait with a plain request/response value pair. Retries,
//! timeouts, and token refresh live behind the trait, not here.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// One wire call: method, resource-relative (or absolute) URL, headers, and
/// an optional body
#[derive(Debug, Clone)]
pub struct Request {
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl Request {
    fn new(method: &'static str, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new("POST", url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new("PATCH", url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new("DELETE", url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach the concurrency token as an `If-Match` precondition.
    pub fn if_match(self, etag: &str) -> Self {
        self.header("If-Match", etag)
    }

    /// Attach a JSON body with the matching content type.
    pub fn json(mut self, body: &Value) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self.header("Content-Type", "application/json"))
    }

    /// Attach a raw binary body with the given content type.
    pub fn bytes(mut self, body: Vec<u8>, content_type: &str) -> Self {
        self.body = Some(body);
        self.header("Content-Type", content_type)
    }
}

/// Response to one wire call
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn is_created(&self) -> bool {
        self.status == 201
    }

    pub fn is_no_content(&self) -> bool {
        self.status == 204
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Blocking-per-call transport collaborator. One `send` is one wire call;
/// the core never retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response>;
}

/// Envelope for a batch of sub-requests, POSTed to the `$batch` endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub requests: Vec<BatchSubRequest>,
}

/// One logical request inside a batch envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSubRequest {
    pub id: String,
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Envelope answering a batch request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub responses: Vec<BatchSubResponse>,
}

/// One logical response inside a batch envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSubResponse {
    pub id: String,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub body: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let req = Request::patch("customers(1)")
            .if_match("W/\"etag\"")
            .json(&serde_json::json!({"displayName": "Adatum"}))
            .unwrap();
        assert_eq!(req.method, "PATCH");
        assert!(req
            .headers
            .iter()
            .any(|(k, v)| k == "If-Match" && v == "W/\"etag\""));
        assert!(req
            .headers
            .iter()
            .any(|(k, v)| k == "Content-Type" && v == "application/json"));
        assert!(req.body.is_some());
    }

    #[test]
    fn test_response_status_helpers() {
        assert!(Response::new(200, "").is_success());
        assert!(Response::new(201, "").is_created());
        assert!(Response::new(204, "").is_no_content());
        assert!(Response::new(404, "").is_not_found());
        assert!(!Response::new(500, "").is_success());
    }

    #[test]
    fn test_batch_envelope_shape() {
        let envelope = BatchRequest {
            requests: vec![BatchSubRequest {
                id: "1".into(),
                method: "PATCH".into(),
                url: "customers(1)".into(),
                headers: HashMap::from([("If-Match".to_string(), "*".to_string())]),
                body: Some(serde_json::json!({"displayName": "Adatum"})),
            }],
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["requests"][0]["id"], "1");
        assert_eq!(json["requests"][0]["method"], "PATCH");
        assert_eq!(json["requests"][0]["url"], "customers(1)");

        let parsed: BatchResponse = serde_json::from_value(serde_json::json!({
            "responses": [{"id": "1", "body": {"displayName": "Adatum"}}]
        }))
        .unwrap();
        assert_eq!(parsed.responses[0].id, "1");
        assert_eq!(parsed.responses[0].status, None);
    }
}
