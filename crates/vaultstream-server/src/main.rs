//! Vaultstream delivery server binary.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use vaultstream_auth::{AccessResolver, JsonRpcLedger};
use vaultstream_server::config::PinningConfig;
use vaultstream_server::pin::{BlobPinner, LocalPinner, RemotePinner};
use vaultstream_server::{router, AppState, ArtifactCache, Config};
use vaultstream_server::originality::OriginalityClient;
use vaultstream_server::watermark::FfmpegWatermarker;
use vaultstream_store::SqliteStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;

    let store = Arc::new(
        SqliteStore::open(config.db_path())
            .with_context(|| format!("opening database {}", config.db_path().display()))?,
    );

    let ledger = Arc::new(JsonRpcLedger::new(
        config.rpc_url.clone(),
        config.licensing_contract.clone(),
    ));
    let resolver = Arc::new(AccessResolver::new(store.clone(), ledger));

    let cache = Arc::new(ArtifactCache::new(config.cache_dir()).context("creating cache dir")?);
    let originality = Arc::new(OriginalityClient::new(config.engine_endpoints.clone()));
    let pinner: Arc<dyn BlobPinner> = match &config.pinning {
        PinningConfig::Local => {
            Arc::new(LocalPinner::new(config.pin_dir()).context("creating pin dir")?)
        }
        PinningConfig::Remote {
            endpoint,
            api_key,
            secret,
        } => Arc::new(RemotePinner::new(
            endpoint.clone(),
            api_key.clone(),
            secret.clone(),
        )),
    };
    let watermarker = Arc::new(FfmpegWatermarker::new(config.ffmpeg_binary.clone()));

    let state = AppState {
        assets: store.clone(),
        grants: store,
        resolver,
        cache,
        originality,
        pinner,
        watermarker,
    };

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "delivery server listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
