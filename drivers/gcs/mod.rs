//! Google Cloud Storage 存储驱动
//!
//! Talks to the GCS JSON API with reqwest. Supports the storage emulator,
//! static access tokens, authorized_user credential files (refresh_token)
//! and the GCE metadata server.

mod auth;
mod config;
mod driver;
mod factory;

pub use auth::{Authenticator, TokenSource};
pub use config::GcsConfig;
pub use driver::GcsDriver;
pub use factory::GcsDriverFactory;
