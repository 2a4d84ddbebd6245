//! # assetgate Gateway
//!
//! Blob Storeへの期限付きアクセスを仲介するHTTPゲートウェイ。
//!
//! ## 役割
//! - アップロード用・ダウンロード用の署名付きURL発行
//! - アセットごとのアップロード状態の追跡（ローカルキャッシュ + 共有ストア）
//! - ダウンロードURL発行前のBlob存在確認
//!
//! ## API エンドポイント
//! - `POST /asset` — 署名付きアップロードURL発行 + アセット登録
//! - `PUT /asset/{asset_id}` — アップロード完了通知
//! - `GET /asset/{asset_id}` — 署名付きダウンロードURL発行

mod config;
mod endpoints;
mod error;
mod server;
mod storage;

use std::sync::Arc;

use assetgate_registry::MemoryStateStore;
use tokio::sync::{mpsc, watch};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{GatewayConfig, StateBackend};
use crate::server::{spawn_worker, WorkerContext};
use crate::storage::{BlobStorage, S3BlobStorage};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "assetgate=info,assetgate_registry=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(GatewayConfig::from_env()?);

    // Blob Store（S3互換）。署名付きURL生成はステートレスなので全ワーカーで共有する
    let blob_storage: Arc<dyn BlobStorage> = Arc::new(S3BlobStorage::from_config(&config)?);
    tracing::info!(
        bucket = %config.s3_bucket,
        region = %config.aws_region,
        "Blob Storeを設定"
    );

    let memory_store = Arc::new(MemoryStateStore::new());
    if config.state_backend == StateBackend::Memory {
        tracing::warn!("STATE_BACKEND=memory: 共有ストアはこのプロセス内に限定されます（開発環境用）");
    }

    let addr = config.listen_addr();
    let listener = std::net::TcpListener::bind(&addr)?;
    listener.set_nonblocking(true)?;
    tracing::info!("Gatewayを {} で起動します (workers={})", addr, config.workers);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (exited_tx, mut exited_rx) = mpsc::unbounded_channel();

    let mut handles = Vec::with_capacity(config.workers);
    for worker_id in 0..config.workers {
        let handle = spawn_worker(WorkerContext {
            worker_id,
            config: config.clone(),
            blob_storage: blob_storage.clone(),
            memory_store: memory_store.clone(),
            listener: listener.try_clone()?,
            shutdown: shutdown_rx.clone(),
            exited: exited_tx.clone(),
        })?;
        handles.push(handle);
    }
    drop(listener);

    tokio::select! {
        _ = shutdown_signal() => {
            tracing::info!("停止シグナルを受信しました");
        }
        Some(worker_id) = exited_rx.recv() => {
            tracing::error!(worker = worker_id, "ワーカーが予期せず終了しました");
        }
    }

    let _ = shutdown_tx.send(true);

    let mut failed = false;
    for handle in handles {
        match tokio::task::spawn_blocking(move || handle.join()).await? {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!("ワーカーがエラーで終了しました: {e:#}");
                failed = true;
            }
            Err(_) => {
                tracing::error!("ワーカースレッドがパニックしました");
                failed = true;
            }
        }
    }

    anyhow::ensure!(!failed, "1つ以上のワーカーが異常終了しました");
    tracing::info!("Gatewayを停止しました");
    Ok(())
}

/// Ctrl-C または SIGTERM を待つ。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Ctrl-Cハンドラの登録に失敗: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("SIGTERMハンドラの登録に失敗: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
