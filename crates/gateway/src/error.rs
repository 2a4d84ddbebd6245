//! # Gateway エラー型
//!
//! 全エンドポイントで共通のエラー型。HTTPステータスへの対応:
//! - `NotFound` → 404
//! - `BadRequest` → 400
//! - `BackingStore` / `Upstream` / `Internal` → 500（詳細はログのみに出力）

use assetgate_registry::RegistryError;
use assetgate_types::ErrorBody;
use axum::http::StatusCode;
use axum::Json;

/// Gatewayエラー型。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// アセットが存在しない、要求された状態にない、またはBlobが存在しない
    #[error("{0}")]
    NotFound(String),
    /// 不正なリクエスト（ボディ・クエリパラメータ）
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),
    /// 共有ストアの読み書きに失敗
    #[error("共有ストア操作に失敗: {0}")]
    BackingStore(String),
    /// Blob Store操作（署名付きURL生成・存在確認）に失敗
    #[error("Blob Store操作に失敗: {0}")]
    Upstream(String),
    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl From<RegistryError> for GatewayError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(_) => {
                GatewayError::NotFound("アセットIDが見つかりません".to_string())
            }
            RegistryError::BackingStoreUnavailable(e) => GatewayError::BackingStore(e.to_string()),
            e @ RegistryError::CorruptRecord { .. } => GatewayError::Internal(e.to_string()),
        }
    }
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            GatewayError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            GatewayError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            GatewayError::BackingStore(_) => {
                tracing::error!(error = %self, "共有ストアエラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "アセット状態の読み書き中にエラーが発生しました".to_string(),
                )
            }
            GatewayError::Upstream(_) => {
                tracing::error!(error = %self, "Blob Storeエラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Blob Storeとの通信中にエラーが発生しました".to_string(),
                )
            }
            GatewayError::Internal(_) => {
                tracing::error!(error = %self, "内部エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
        };
        (status, Json(ErrorBody { message })).into_response()
    }
}
