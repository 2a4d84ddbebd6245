//! # PUT /asset/{asset_id}
//!
//! アップロード完了通知。

use std::sync::Arc;

use assetgate_types::{AssetId, ConfirmUploadRequest};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::config::GatewayState;
use crate::error::GatewayError;

/// PUT /asset/{asset_id} — アセットをアップロード済みに更新する。
///
/// ボディは `{"Status": "uploaded"}` のみ受け付ける。Content-Typeは問わない。
/// ボディの検証はアセットの存在確認より先に行う。
pub async fn handle_confirm_upload(
    State(state): State<Arc<GatewayState>>,
    Path(asset_id): Path<String>,
    body: Bytes,
) -> Result<StatusCode, GatewayError> {
    serde_json::from_slice::<ConfirmUploadRequest>(&body).map_err(|e| {
        GatewayError::BadRequest(format!(
            r#"{{"Status": "uploaded"}} 形式のJSONが必要です ({e})"#
        ))
    })?;

    let id = AssetId::from(asset_id);
    state.registry.mark_uploaded(&id).await?;

    Ok(StatusCode::OK)
}
