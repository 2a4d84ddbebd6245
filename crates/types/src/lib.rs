//! # assetgate 共有型定義
//!
//! アセットID・アップロード状態・HTTP APIのリクエスト/レスポンスを
//! Rust構造体として提供する。
//!
//! ## 永続化表現
//! - 共有ストアにはアセットIDをキー、状態トークン（`"NOT_UPLOADED"` / `"UPLOADED"`）を値として保存する。
//! - アセットIDはBlob Storeのオブジェクトキーとしてもそのまま使用する。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// アセットID
// ---------------------------------------------------------------------------

/// アセットの一意識別子。
///
/// 新規発行時はUUID v4（128bitランダム）のハイフン区切り文字列。
/// パスパラメータから受け取る場合は任意の文字列を許容し、
/// 存在しないIDは状態照会で `NotFound` となる。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    /// 新しいランダムIDを生成する。
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AssetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AssetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for AssetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// アップロード状態
// ---------------------------------------------------------------------------

/// アセットのアップロード状態。
///
/// 遷移は `NotUploaded → Uploaded` の一方向のみ。
/// `Ord` はこの遷移順序に一致する（`NotUploaded < Uploaded`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetStatus {
    /// 署名付きアップロードURL発行済み、アップロード未確認
    NotUploaded,
    /// クライアントがアップロード完了を通知済み
    Uploaded,
}

impl AssetStatus {
    /// 共有ストアに保存する状態トークン。
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::NotUploaded => "NOT_UPLOADED",
            AssetStatus::Uploaded => "UPLOADED",
        }
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 未知の状態トークン。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("未知の状態トークン: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for AssetStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOT_UPLOADED" => Ok(AssetStatus::NotUploaded),
            "UPLOADED" => Ok(AssetStatus::Uploaded),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP API
// ---------------------------------------------------------------------------

/// POST /asset のレスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadGrantResponse {
    /// 署名付きアップロードURL（PUT）
    pub upload_url: String,
    /// 発行されたアセットID
    pub id: AssetId,
}

/// PUT /asset/{id} のリクエストボディ。
///
/// 受け付けるのは `{"Status": "uploaded"}` のみ。
/// 余分なフィールドや他の値はパースエラーとなる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfirmUploadRequest {
    #[serde(rename = "Status")]
    pub status: ConfirmedStatus,
}

/// アップロード完了通知で指定できる状態値。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmedStatus {
    #[serde(rename = "uploaded")]
    Uploaded,
}

/// GET /asset/{id} のクエリパラメータ。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadGrantQuery {
    /// ダウンロードURLの有効期限（秒）。省略時は設定値。
    pub timeout: Option<u32>,
}

/// GET /asset/{id} のレスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadGrantResponse {
    /// 署名付きダウンロードURL（GET）
    pub download_url: String,
}

/// エラーレスポンスのボディ。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_token_roundtrip() {
        for status in [AssetStatus::NotUploaded, AssetStatus::Uploaded] {
            assert_eq!(status.as_str().parse::<AssetStatus>().unwrap(), status);
        }
        assert_eq!(
            serde_json::to_string(&AssetStatus::NotUploaded).unwrap(),
            "\"NOT_UPLOADED\""
        );
    }

    #[test]
    fn test_status_rejects_unknown_token() {
        let err = "uploaded".parse::<AssetStatus>().unwrap_err();
        assert_eq!(err, UnknownStatus("uploaded".to_string()));
    }

    #[test]
    fn test_status_order_follows_lifecycle() {
        assert!(AssetStatus::NotUploaded < AssetStatus::Uploaded);
    }

    #[test]
    fn test_generated_ids_are_uuid_v4() {
        let a = AssetId::generate();
        let b = AssetId::generate();
        assert_ne!(a, b);
        let parsed = uuid::Uuid::parse_str(a.as_str()).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_confirm_request_accepts_only_uploaded() {
        let ok: ConfirmUploadRequest = serde_json::from_str(r#"{"Status": "uploaded"}"#).unwrap();
        assert_eq!(ok.status, ConfirmedStatus::Uploaded);

        assert!(serde_json::from_str::<ConfirmUploadRequest>(r#"{"data": "stax"}"#).is_err());
        assert!(serde_json::from_str::<ConfirmUploadRequest>(r#"{"Status": "UPLOADED"}"#).is_err());
        assert!(
            serde_json::from_str::<ConfirmUploadRequest>(r#"{"Status": "uploaded", "x": 1}"#)
                .is_err()
        );
    }

    #[test]
    fn test_upload_grant_response_shape() {
        let body = UploadGrantResponse {
            upload_url: "https://bucket/key".to_string(),
            id: AssetId::from("abc"),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["id"], "abc");
        assert_eq!(value["upload_url"], "https://bucket/key");
    }
}
