//! GCS 驱动实现

use async_trait::async_trait;
use anyhow::{anyhow, Result};
use futures::TryStreamExt;
use reqwest::Client;
use serde::Deserialize;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

use crate::storage::{ObjectEntry, StorageDriver};
use super::auth::{Authenticator, TokenSource};
use super::config::GcsConfig;

/// Page size requested from objects.list (the API maximum)
const PAGE_SIZE: &str = "1000";
const LIST_FIELDS: &str = "items(name,size,contentType),nextPageToken";

// ============ API响应结构 ============

/// objects.list 响应
#[derive(Debug, Deserialize)]
struct ObjectsResponse {
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
    #[serde(default)]
    items: Vec<GcsObject>,
}

#[derive(Debug, Deserialize)]
struct GcsObject {
    name: String,
    /// uint64 encoded as a string
    size: Option<String>,
    #[serde(rename = "contentType")]
    content_type: Option<String>,
}

/// API错误
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    code: i32,
    message: String,
}

impl From<GcsObject> for ObjectEntry {
    fn from(obj: GcsObject) -> Self {
        ObjectEntry {
            name: obj.name,
            size: obj.size.and_then(|s| s.parse().ok()),
            content_type: obj.content_type.filter(|c| !c.is_empty()),
        }
    }
}

pub struct GcsDriver {
    endpoint: String,
    client: Client,
    auth: Authenticator,
}

impl GcsDriver {
    /// 创建新的驱动实例
    pub fn new(config: GcsConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("bucket-index/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;
        let source = TokenSource::from_config(&config)?;
        let endpoint = config.endpoint.trim().trim_end_matches('/').to_string();
        if endpoint.is_empty() {
            return Err(anyhow!("GCS endpoint is empty"));
        }

        Ok(Self {
            endpoint,
            auth: Authenticator::new(source, client.clone()),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn token_source(&self) -> &TokenSource {
        self.auth.source()
    }

    fn objects_url(&self, bucket: &str) -> String {
        format!("{}/storage/v1/b/{}/o", self.endpoint, urlencoding::encode(bucket))
    }

    /// Object names are a single path segment in the JSON API, `/` included
    fn object_url(&self, bucket: &str, object: &str) -> String {
        format!("{}/{}", self.objects_url(bucket), urlencoding::encode(object))
    }

    /// 发起API请求
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        let mut request = self.client.get(url).query(query);
        if let Some(header) = self.auth.authorization().await? {
            request = request.header("Authorization", header);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiError>(&body) {
            Ok(api) => Err(anyhow!("GCS API error {}: {}", api.error.code, api.error.message)),
            Err(_) => Err(anyhow!("GCS request failed: HTTP {} {}", status, body.trim())),
        }
    }
}

#[async_trait]
impl StorageDriver for GcsDriver {
    fn name(&self) -> &str {
        "gcs"
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectEntry>> {
        let url = self.objects_url(bucket);
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("maxResults", PAGE_SIZE), ("fields", LIST_FIELDS)];
            if let Some(ref token) = page_token {
                query.push(("pageToken", token.as_str()));
            }

            let page: ObjectsResponse = self.get(&url, &query).await?.json().await?;
            tracing::debug!("GCS list {}: {} objects in page", bucket, page.items.len());
            entries.extend(page.items.into_iter().map(ObjectEntry::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(entries)
    }

    async fn open_reader(
        &self,
        bucket: &str,
        object: &str,
    ) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
        let url = self.object_url(bucket, object);
        let response = self.get(&url, &[("alt", "media")]).await?;

        let stream = response.bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let reader = StreamReader::new(stream);
        Ok(Box::new(reader))
    }
}
