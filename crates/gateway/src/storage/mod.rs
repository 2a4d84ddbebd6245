//! # Blob Storage
//!
//! 署名付きURLの発行とオブジェクト存在確認の抽象インターフェース。
//! S3互換ストレージ実装は `s3` サブモジュールを参照。
//!
//! オブジェクトキーにはアセットIDをそのまま使用する。

pub mod s3;

pub use self::s3::S3BlobStorage;

use crate::error::GatewayError;

/// Blob Storeの抽象インターフェース。
///
/// 失敗はすべて `GatewayError::Upstream` として返す。
#[async_trait::async_trait]
pub trait BlobStorage: Send + Sync {
    /// クライアントが1オブジェクトを書き込むための署名付きURL（PUT）を生成する。
    async fn presign_upload(&self, object_key: &str, expiry_secs: u32)
        -> Result<String, GatewayError>;

    /// クライアントがオブジェクトを取得するための署名付きURL（GET）を生成する。
    async fn presign_download(
        &self,
        object_key: &str,
        expiry_secs: u32,
    ) -> Result<String, GatewayError>;

    /// オブジェクトが実際に存在するかを確認する。
    async fn object_exists(&self, object_key: &str) -> Result<bool, GatewayError>;
}
