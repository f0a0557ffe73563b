use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use broker_api::BatchStore;
use store_memory::MemoryBatchStore;
use stream_engine::{FlushConfig, StreamBroker, spawn_flush_scheduler};

use crate::config::{ServeArgs, ServerConfig, StoreKind};
use crate::error::ServerError;

pub async fn run(args: ServeArgs) -> Result<(), ServerError> {
    tracing::info!("streamhub-server starting");

    // --- Load config ---
    let config = ServerConfig::load(&args.config)?;
    tracing::info!(config = %args.config, "loaded config");

    // --- CancellationToken for graceful shutdown ---
    let token = CancellationToken::new();

    // --- Durable store ---
    let store: Arc<dyn BatchStore> = match config.store {
        StoreKind::Memory => Arc::new(MemoryBatchStore::new()),
    };
    tracing::info!(store = %config.store, "store ready");

    // --- Broker ---
    let broker = Arc::new(StreamBroker::new(store, config.batch_size));
    tracing::info!(batch_size = config.batch_size, "broker ready");

    // --- Flush scheduler ---
    let flush_config = FlushConfig {
        check_interval: Duration::from_millis(config.check_interval_ms),
        flush_interval: Duration::from_millis(config.flush_interval_ms),
    };
    let scheduler_handle = spawn_flush_scheduler(broker.clone(), flush_config, token.clone());
    tracing::info!(
        check_interval_ms = config.check_interval_ms,
        flush_interval_ms = config.flush_interval_ms,
        "flush scheduler running"
    );

    // --- API server (HTTP + WS) ---
    let api_broker = broker.clone();
    let api_port = config.api_port;
    let session_buffer = config.session_buffer;
    let session_overflow = config.session_overflow;
    let api_token = token.clone();
    let api_handle = tokio::spawn(async move {
        if let Err(e) = stream_api_server::run(
            api_port,
            api_broker,
            session_buffer,
            session_overflow,
            api_token,
        )
        .await
        {
            tracing::error!(error = %e, "api server error");
        }
    });

    tracing::info!(port = config.api_port, "api server (http+ws) listening");
    tracing::info!("server ready");

    // --- Wait for Ctrl+C ---
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down...");

    // Signal all tasks to stop cooperatively
    token.cancel();

    // Drain: wait up to 5s for tasks to finish gracefully
    tokio::time::sleep(Duration::from_secs(5)).await;

    // Abort anything still running
    if !scheduler_handle.is_finished() {
        scheduler_handle.abort();
    }
    if !api_handle.is_finished() {
        api_handle.abort();
    }
    let _ = scheduler_handle.await;
    let _ = api_handle.await;

    // Push whatever is still buffered to the store before exiting.
    for topic in broker.topics().await {
        match broker.flush_topic(&topic).await {
            Ok(0) => {}
            Ok(records) => tracing::info!(topic = %topic, records, "final flush"),
            Err(e) => tracing::error!(topic = %topic, error = %e, "final flush error"),
        }
    }

    tracing::info!("shutdown complete");
    Ok(())
}
