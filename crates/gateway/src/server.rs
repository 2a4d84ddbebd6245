//! # ワーカー
//!
//! 各ワーカーは専用スレッド上のシングルスレッドランタイムで動作し、
//! 自身のAsset Registry（ローカルキャッシュ・共有ストア接続プール）を持つ。
//! ワーカー間で共有するのは共有ストアと待ち受けソケットのみ。

use std::sync::Arc;
use std::thread::JoinHandle;

use assetgate_registry::{
    AssetRegistry, LocalStateCache, MemoryStateStore, RedisStateStore, SharedStateStore,
};
use axum::routing::{post, put};
use axum::Router;
use tokio::sync::{mpsc, watch};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::{GatewayConfig, GatewayState, StateBackend};
use crate::endpoints::{handle_confirm_upload, handle_download_url, handle_upload_url};
use crate::storage::BlobStorage;

/// axumルーターを構築する。
pub fn build_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/asset", post(handle_upload_url))
        .route("/asset/", post(handle_upload_url))
        .route(
            "/asset/{asset_id}",
            put(handle_confirm_upload).get(handle_download_url),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// ワーカー起動に必要な、プロセス全体で共有する資源。
pub struct WorkerContext {
    pub worker_id: usize,
    pub config: Arc<GatewayConfig>,
    pub blob_storage: Arc<dyn BlobStorage>,
    /// `StateBackend::Memory` 時に全ワーカーで共有するストア
    pub memory_store: Arc<MemoryStateStore>,
    pub listener: std::net::TcpListener,
    pub shutdown: watch::Receiver<bool>,
    pub exited: mpsc::UnboundedSender<usize>,
}

/// ワーカー終了（正常終了・エラー・パニック）をメインスレッドに通知する。
struct ExitNotice {
    worker_id: usize,
    exited: mpsc::UnboundedSender<usize>,
}

impl Drop for ExitNotice {
    fn drop(&mut self) {
        let _ = self.exited.send(self.worker_id);
    }
}

/// ワーカースレッドを起動する。
pub fn spawn_worker(ctx: WorkerContext) -> std::io::Result<JoinHandle<anyhow::Result<()>>> {
    std::thread::Builder::new()
        .name(format!("assetgate-worker-{}", ctx.worker_id))
        .spawn(move || {
            let _notice = ExitNotice {
                worker_id: ctx.worker_id,
                exited: ctx.exited.clone(),
            };
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(run_worker(ctx))
        })
}

async fn run_worker(ctx: WorkerContext) -> anyhow::Result<()> {
    let worker = ctx.worker_id;
    let config = ctx.config;

    // 共有ストア接続プールはワーカー起動時に確立し、終了時に解放する
    let shared: Arc<dyn SharedStateStore> = match config.state_backend {
        StateBackend::Redis => {
            Arc::new(RedisStateStore::connect(&config.redis_pool_config()).await?)
        }
        StateBackend::Memory => ctx.memory_store,
    };

    let local = LocalStateCache::new(config.local_cache_ttl())
        .with_max_entries(config.local_cache_max_entries());
    let registry = AssetRegistry::new(shared, local);
    let state = Arc::new(GatewayState::new(registry, ctx.blob_storage, &config));

    let listener = tokio::net::TcpListener::from_std(ctx.listener)?;
    tracing::info!(worker, "ワーカーを起動しました");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(wait_for_shutdown(ctx.shutdown))
        .await?;

    tracing::info!(worker, "ワーカーを停止しました");
    Ok(())
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    // 送信側が破棄された場合も停止する
    let _ = shutdown.wait_for(|stop| *stop).await;
}
