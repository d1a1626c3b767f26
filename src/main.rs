use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bucket_index::{config, create_storage_driver, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bucket_index=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "bucket-index {} (built {})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME")
    );

    // Load configuration / 加载配置
    let app_config = config::load_config().context("Failed to load configuration")?;
    let bind_addr = app_config.get_bind_address()?;
    tracing::info!("Server will listen on {}", bind_addr);

    // Create storage driver / 创建存储驱动
    let driver = create_storage_driver(&app_config.storage)
        .with_context(|| format!("Failed to create {} storage driver", app_config.storage.driver))?;

    // Enumerate every bucket before binding; any failure is fatal / 启动前枚举所有存储桶
    let app = server::build_app(&app_config, driver).await?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
