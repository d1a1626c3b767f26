//! Bucket file server / 存储桶文件服务
//!
//! The object list is read once, when the server is built. The route table is
//! a snapshot: objects added or removed later stay invisible until restart.

use std::collections::HashMap;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use tokio_util::io::ReaderStream;

use crate::error::ServeError;
use crate::index::{render_index, PageModel};
use crate::storage::{DriverBox, ObjectEntry};
use crate::utils::{decode_path, escape_path, guess_content_type};

pub struct BucketFileServer {
    bucket: String,
    driver: DriverBox,
    /// Enumeration order, duplicates kept
    objects: Vec<ObjectEntry>,
    /// Object path -> index into `objects`; later entries overwrite earlier ones
    routes: HashMap<String, usize>,
}

impl BucketFileServer {
    /// List every object in `bucket` and build the route table.
    /// Any listing error fails construction.
    pub async fn new(driver: DriverBox, bucket: impl Into<String>) -> Result<Self> {
        let bucket = bucket.into();
        let objects = driver
            .list_objects(&bucket)
            .await
            .with_context(|| format!("bucket {}", bucket))?;

        let mut routes = HashMap::with_capacity(objects.len());
        for (i, obj) in objects.iter().enumerate() {
            if routes.insert(obj.name.clone(), i).is_some() {
                tracing::warn!("Duplicate object path in {}: {}, last one wins", bucket, obj.name);
            }
        }

        tracing::info!("Bucket {} ready: {} objects", bucket, objects.len());
        Ok(Self {
            bucket,
            driver,
            objects,
            routes,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object paths in enumeration order
    pub fn object_paths(&self) -> impl Iterator<Item = &str> {
        self.objects.iter().map(|o| o.name.as_str())
    }

    /// Listing page model: base `/<bucket>`, one link per object
    pub fn page(&self) -> PageModel {
        let prefix = format!("/{}/", escape_path(&self.bucket));
        let mut page = PageModel::new(format!("/{}", self.bucket));
        for obj in &self.objects {
            page.push(format!("{}{}", prefix, escape_path(&obj.name)), obj.name.as_str());
        }
        page
    }

    /// Handle a request whose `/<bucket>` prefix was already stripped.
    /// `relative_path` is the raw (still percent-encoded) path, starting with `/`.
    pub async fn handle(&self, relative_path: &str) -> Response {
        if relative_path == "/" {
            return self.render_index().into_response();
        }
        match self.lookup(relative_path) {
            Ok(entry) => self.serve_object(entry).await.into_response(),
            Err(e) => e.into_response(),
        }
    }

    /// Exact match only: no prefix fallback, no directory semantics
    fn lookup(&self, relative_path: &str) -> Result<&ObjectEntry, ServeError> {
        let not_found = || ServeError::NotFound(format!("/{}{}", self.bucket, relative_path));

        let raw = relative_path.strip_prefix('/').ok_or_else(not_found)?;
        let name = decode_path(raw).ok_or_else(not_found)?;
        self.routes
            .get(&name)
            .map(|&i| &self.objects[i])
            .ok_or_else(not_found)
    }

    pub fn render_index(&self) -> Result<Response, ServeError> {
        let html = render_index(&self.page())?;
        Ok(Html(html).into_response())
    }

    /// Stream one object. Errors before the first chunk become a 500;
    /// later errors abort the body, since the status line is already sent.
    pub async fn serve_object(&self, entry: &ObjectEntry) -> Result<Response, ServeError> {
        let reader = self
            .driver
            .open_reader(&self.bucket, &entry.name)
            .await
            .map_err(|e| ServeError::Open {
                bucket: self.bucket.clone(),
                object: entry.name.clone(),
                message: format!("{:#}", e),
            })?;

        let mut stream = ReaderStream::new(reader);
        let first = match stream.next().await {
            Some(Ok(chunk)) => Some(chunk),
            Some(Err(source)) => {
                return Err(ServeError::Copy {
                    bucket: self.bucket.clone(),
                    object: entry.name.clone(),
                    source,
                })
            }
            None => None,
        };

        let content_type = entry
            .content_type
            .clone()
            .unwrap_or_else(|| guess_content_type(&entry.name));
        let content_type = HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

        let body = match first {
            Some(chunk) => {
                let bucket = self.bucket.clone();
                let name = entry.name.clone();
                let rest = stream.inspect_err(move |e| {
                    tracing::warn!("Stream of {}/{} aborted: {}", bucket, name, e);
                });
                let head = futures::stream::once(async move { Ok::<Bytes, std::io::Error>(chunk) });
                Body::from_stream(head.chain(rest))
            }
            None => Body::empty(),
        };

        Ok((StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryDriver;
    use std::sync::Arc;

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    fn photos() -> Arc<MemoryDriver> {
        Arc::new(
            MemoryDriver::new()
                .with_object("photos", "a", b"alpha")
                .with_object("photos", "b", b"bravo")
                .with_object("photos", "c", b"charlie"),
        )
    }

    #[tokio::test]
    async fn test_lists_once_at_construction() {
        let driver = photos();
        let server = BucketFileServer::new(driver.clone(), "photos").await.unwrap();
        assert_eq!(driver.list_calls(), 1);

        for _ in 0..3 {
            server.handle("/").await;
            server.handle("/a").await;
        }
        assert_eq!(driver.list_calls(), 1);
        assert_eq!(server.object_paths().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_listing_failure_fails_construction() {
        let driver = Arc::new(MemoryDriver::new().with_bucket("photos").failing_list("photos"));
        let err = BucketFileServer::new(driver, "photos").await.err().unwrap();
        assert!(format!("{:#}", err).contains("bucket photos"));
        assert!(format!("{:#}", err).contains("permission denied"));
    }

    #[tokio::test]
    async fn test_index_page_links() {
        let server = BucketFileServer::new(photos(), "photos").await.unwrap();
        let response = server.handle("/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = String::from_utf8(body_bytes(response).await).unwrap();

        assert!(html.contains("<h1>/photos Directory</h1>"));
        assert_eq!(html.matches("<li>").count(), 3);
        for name in ["a", "b", "c"] {
            assert!(html.contains(&format!("<a href=\"/photos/{}\">{}</a>", name, name)));
        }
    }

    #[tokio::test]
    async fn test_serves_object_bytes() {
        let server = BucketFileServer::new(photos(), "photos").await.unwrap();
        let response = server.handle("/c").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"charlie");
    }

    #[tokio::test]
    async fn test_repeated_requests_identical() {
        let driver = photos();
        let server = BucketFileServer::new(driver.clone(), "photos").await.unwrap();
        let first = body_bytes(server.handle("/b").await).await;
        let second = body_bytes(server.handle("/b").await).await;
        assert_eq!(first, second);
        assert_eq!(driver.open_calls(), 2);
    }

    #[tokio::test]
    async fn test_unregistered_paths_are_not_found() {
        let server = BucketFileServer::new(photos(), "photos").await.unwrap();
        for path in ["/d", "/a/", "/A", "/a/b", "//a", "/%FF"] {
            let response = server.handle(path).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "path {}", path);
        }
    }

    #[tokio::test]
    async fn test_escaped_names_round_trip() {
        let driver = Arc::new(
            MemoryDriver::new()
                .with_object("docs", "dir/a b.txt", b"spaced")
                .with_object("docs", "50%.csv", b"percent")
                .with_object("docs", "<x>.html", b"angle"),
        );
        let server = BucketFileServer::new(driver, "docs").await.unwrap();

        let html = String::from_utf8(body_bytes(server.handle("/").await).await).unwrap();
        assert!(html.contains("<a href=\"/docs/dir/a%20b.txt\">dir/a b.txt</a>"));
        assert!(html.contains("<a href=\"/docs/50%25.csv\">50%.csv</a>"));
        assert!(html.contains("<a href=\"/docs/%3Cx%3E.html\">&lt;x&gt;.html</a>"));

        assert_eq!(body_bytes(server.handle("/dir/a%20b.txt").await).await, b"spaced");
        assert_eq!(body_bytes(server.handle("/50%25.csv").await).await, b"percent");
        assert_eq!(body_bytes(server.handle("/%3Cx%3E.html").await).await, b"angle");
    }

    #[tokio::test]
    async fn test_duplicate_paths_last_wins() {
        let driver = Arc::new(
            MemoryDriver::new()
                .with_object("dup", "same", b"first")
                .with_object("dup", "same", b"second"),
        );
        let server = BucketFileServer::new(driver, "dup").await.unwrap();
        assert_eq!(server.routes.len(), 1);
        assert_eq!(server.object_paths().count(), 2);
        assert_eq!(body_bytes(server.handle("/same").await).await, b"second");
    }

    #[tokio::test]
    async fn test_open_failure_is_server_error() {
        let driver = Arc::new(
            MemoryDriver::new()
                .with_object("photos", "locked", b"x")
                .failing_open("locked"),
        );
        let server = BucketFileServer::new(driver, "photos").await.unwrap();
        let response = server.handle("/locked").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(body.contains("object locked is unavailable"));
    }

    #[tokio::test]
    async fn test_read_failure_before_first_byte_is_server_error() {
        let driver = Arc::new(
            MemoryDriver::new()
                .with_object("photos", "broken", b"x")
                .failing_read("broken"),
        );
        let server = BucketFileServer::new(driver, "photos").await.unwrap();
        let response = server.handle("/broken").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(body.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_read_failure_mid_stream_aborts_body() {
        let driver = Arc::new(
            MemoryDriver::new()
                .with_object("photos", "partial", b"head and tail")
                .failing_read_after("partial", 4),
        );
        let server = BucketFileServer::new(driver, "photos").await.unwrap();
        let response = server.handle("/partial").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await;
        assert!(body.is_err());
    }

    #[tokio::test]
    async fn test_content_type() {
        let driver = Arc::new(
            MemoryDriver::new()
                .with_object("web", "index.html", b"<p>hi</p>")
                .with_object("web", "empty.bin", b""),
        );
        let server = BucketFileServer::new(driver, "web").await.unwrap();

        let response = server.handle("/index.html").await;
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");

        let response = server.handle("/empty.bin").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_stored_content_type_preferred() {
        let server = BucketFileServer {
            bucket: "b".to_string(),
            driver: Arc::new(MemoryDriver::new().with_object("b", "report", b"%PDF")),
            objects: vec![ObjectEntry::new("report").content_type("application/pdf")],
            routes: HashMap::from([("report".to_string(), 0)]),
        };
        let response = server.handle("/report").await;
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    }
}
