//! # GET /asset/{asset_id}
//!
//! ダウンロード用署名付きURL発行。

use std::sync::Arc;

use assetgate_types::{AssetId, AssetStatus, DownloadGrantQuery, DownloadGrantResponse};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;

use crate::config::GatewayState;
use crate::error::GatewayError;

/// GET /asset/{asset_id} — ダウンロード用署名付きURL発行。
///
/// 以下をすべて満たす場合のみURLを発行する。
/// 1. アセットが `Uploaded` である
/// 2. Blob Storeにオブジェクトが実際に存在する（状態フラグだけでは信用しない）
///
/// 有効期限は `?timeout=` で上書きできる（許容範囲は設定値）。
pub async fn handle_download_url(
    State(state): State<Arc<GatewayState>>,
    Path(asset_id): Path<String>,
    query: Result<Query<DownloadGrantQuery>, QueryRejection>,
) -> Result<Json<DownloadGrantResponse>, GatewayError> {
    let Query(query) = query
        .map_err(|e| GatewayError::BadRequest(format!("クエリパラメータが不正です: {e}")))?;
    let expiry_secs = state.download_ttl.resolve(query.timeout)?;

    let id = AssetId::from(asset_id);
    let status = state.registry.get_status(&id).await?;
    if status != AssetStatus::Uploaded {
        return Err(GatewayError::NotFound(
            "アセットがアップロード済みに更新されていません".to_string(),
        ));
    }

    tracing::info!(asset_id = %id, "Blob Storeのオブジェクト存在を確認");
    if !state.blob_storage.object_exists(id.as_str()).await? {
        return Err(GatewayError::NotFound(
            "Blob Storeにオブジェクトが存在しません".to_string(),
        ));
    }

    let download_url = state
        .blob_storage
        .presign_download(id.as_str(), expiry_secs)
        .await?;

    tracing::info!(asset_id = %id, expiry_secs, "ダウンロードURLを発行");
    Ok(Json(DownloadGrantResponse { download_url }))
}
