//! # POST /asset
//!
//! アップロード用署名付きURL発行とアセット登録。

use std::sync::Arc;

use assetgate_types::{AssetId, UploadGrantResponse};
use axum::extract::State;
use axum::Json;

use crate::config::GatewayState;
use crate::error::GatewayError;

/// POST /asset — アップロード用署名付きURL発行。
///
/// 署名付きURLの生成に成功した場合のみアセットを `NotUploaded` として登録する。
/// 登録（共有ストアへの書き込み）が確認されるまでIDは返さない。
pub async fn handle_upload_url(
    State(state): State<Arc<GatewayState>>,
) -> Result<Json<UploadGrantResponse>, GatewayError> {
    let id = AssetId::generate();

    let upload_url = state
        .blob_storage
        .presign_upload(id.as_str(), state.upload_url_ttl_secs)
        .await?;

    state.registry.register(&id).await?;

    Ok(Json(UploadGrantResponse { upload_url, id }))
}
