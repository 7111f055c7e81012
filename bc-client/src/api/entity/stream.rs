//! Binary media resources addressed by URL

use crate::error::{Error, Result};

use super::super::transport::{Request, Transport};

/// Reference to a binary media resource (a picture, an attachment body)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataStream {
    url: String,
}

impl DataStream {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the raw bytes of the media resource.
    pub async fn download(&self, transport: &dyn Transport) -> Result<Vec<u8>> {
        log::debug!("downloading media resource from {}", self.url);
        let response = transport.send(Request::get(&self.url)).await?;
        if !response.is_success() {
            return Err(Error::from_status_body(response.status, &response.text()));
        }
        Ok(response.body)
    }

    /// Replace the media resource's content. The server must acknowledge
    /// with a no-content status.
    pub async fn upload(
        &self,
        transport: &dyn Transport,
        content: Vec<u8>,
        etag: Option<&str>,
    ) -> Result<()> {
        log::debug!(
            "uploading {} bytes to media resource {}",
            content.len(),
            self.url
        );
        let mut request = Request::patch(&self.url).bytes(content, "application/octet-stream");
        if let Some(etag) = etag {
            request = request.if_match(etag);
        }
        let response = transport.send(request).await?;
        if !response.is_no_content() {
            return Err(Error::from_status_body(response.status, &response.text()));
        }
        Ok(())
    }
}
