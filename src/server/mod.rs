//! HTTP front end / HTTP 服务
//!
//! One router with two entries: `/` for the bucket list and a fallback that
//! dispatches `/<bucket>/...` to the matching [`BucketFileServer`].

pub mod bucket;

pub use bucket::BucketFileServer;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use futures::future::try_join_all;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::ServeError;
use crate::index::{render_index, PageModel};
use crate::storage::DriverBox;
use crate::utils::{decode_path, escape_path};

/// Bucket name -> file server, plus the configured display order
pub struct Dispatcher {
    buckets: Vec<String>,
    servers: HashMap<String, Arc<BucketFileServer>>,
}

impl Dispatcher {
    /// Build every bucket server concurrently. The first failure aborts startup.
    pub async fn build(config: &AppConfig, driver: DriverBox) -> Result<Self> {
        let servers = try_join_all(config.buckets.iter().map(|bucket| {
            let driver = driver.clone();
            async move {
                BucketFileServer::new(driver, bucket.as_str())
                    .await
                    .with_context(|| format!("Failed to build file server for bucket {}", bucket))
            }
        }))
        .await?;

        Ok(Self {
            buckets: config.buckets.clone(),
            servers: servers
                .into_iter()
                .map(|s| (s.bucket().to_string(), Arc::new(s)))
                .collect(),
        })
    }

    pub fn buckets(&self) -> &[String] {
        &self.buckets
    }

    /// Root page: one link per configured bucket / 存储桶列表页
    pub fn root_page(&self) -> PageModel {
        let mut page = PageModel::new("/");
        for bucket in &self.buckets {
            page.push(format!("/{}/", escape_path(bucket)), bucket.as_str());
        }
        page
    }

    pub fn render_root(&self) -> Result<Response, ServeError> {
        let html = render_index(&self.root_page())?;
        Ok(Html(html).into_response())
    }

    /// Route a request path to the root page, a redirect or a bucket server
    pub async fn dispatch(&self, uri: &Uri) -> Response {
        let path = uri.path();
        if path == "/" {
            return self.render_root().into_response();
        }

        let rest = path.strip_prefix('/').unwrap_or(path);
        let (raw_bucket, relative) = match rest.find('/') {
            Some(i) => (&rest[..i], Some(&rest[i..])),
            None => (rest, None),
        };

        let server = match decode_path(raw_bucket).and_then(|b| self.servers.get(&b)) {
            Some(server) => server,
            None => return ServeError::NotFound(path.to_string()).into_response(),
        };

        match relative {
            Some(relative) => server.handle(relative).await,
            None => redirect_to_dir(server.bucket()),
        }
    }
}

/// `/<bucket>` -> `/<bucket>/`, 301 like a classic file server
fn redirect_to_dir(bucket: &str) -> Response {
    let location = format!("/{}/", escape_path(bucket));
    match HeaderValue::from_str(&location) {
        Ok(location) => {
            (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
        }
        Err(_) => ServeError::NotFound(format!("/{}", bucket)).into_response(),
    }
}

async fn root_index(State(dispatcher): State<Arc<Dispatcher>>) -> Response {
    dispatcher.render_root().into_response()
}

async fn dispatch(State(dispatcher): State<Arc<Dispatcher>>, uri: Uri) -> Response {
    dispatcher.dispatch(&uri).await
}

pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/", get(root_index))
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(dispatcher)
}

/// Enumerate every configured bucket and assemble the HTTP application
pub async fn build_app(config: &AppConfig, driver: DriverBox) -> Result<Router> {
    let dispatcher = Dispatcher::build(config, driver).await?;
    tracing::info!(
        "Serving {} buckets: {}",
        dispatcher.buckets().len(),
        dispatcher.buckets().join(", ")
    );
    Ok(router(Arc::new(dispatcher)))
}
