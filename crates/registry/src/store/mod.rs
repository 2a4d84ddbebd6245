//! # Shared State Store
//!
//! 全ワーカーから参照される状態の正本。キーはアセットID、値は状態トークン。
//! Redis実装は `redis` サブモジュールを参照。

#[cfg(feature = "backend-redis")]
pub mod redis;

use std::collections::HashMap;
use std::sync::Mutex;

use assetgate_types::{AssetId, AssetStatus};

use crate::error::StoreError;

/// 共有ストアの抽象インターフェース。
///
/// 読み取りは少なくとも自身の書き込みを観測できること（read-your-writes）を前提とする。
/// キーをまたぐトランザクションは要求しない。
#[async_trait::async_trait]
pub trait SharedStateStore: Send + Sync {
    /// アセットの状態を取得する。レコードが存在しなければ `None`。
    async fn get_status(&self, id: &AssetId) -> Result<Option<AssetStatus>, StoreError>;

    /// アセットの状態を書き込む。書き込みが確認されてから返る。
    async fn set_status(&self, id: &AssetId, status: AssetStatus) -> Result<(), StoreError>;
}

/// 保存された状態トークンを解釈する。
pub(crate) fn parse_status(key: &str, raw: String) -> Result<AssetStatus, StoreError> {
    raw.parse().map_err(|_| StoreError::InvalidValue {
        key: key.to_string(),
        value: raw,
    })
}

/// プロセス内の共有ストア。
///
/// 開発環境とテスト用。同一プロセス内の全ワーカーで1インスタンスを共有する。
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 生の値を直接書き込む。
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
    }

    /// 生の値を取得する。
    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

#[async_trait::async_trait]
impl SharedStateStore for MemoryStateStore {
    async fn get_status(&self, id: &AssetId) -> Result<Option<AssetStatus>, StoreError> {
        self.get_raw(id.as_str())
            .map(|raw| parse_status(id.as_str(), raw))
            .transpose()
    }

    async fn set_status(&self, id: &AssetId, status: AssetStatus) -> Result<(), StoreError> {
        self.insert_raw(id.as_str(), status.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_persists_status_tokens() {
        let store = MemoryStateStore::new();
        let id = AssetId::from("asset-1");

        assert!(store.get_status(&id).await.unwrap().is_none());

        store.set_status(&id, AssetStatus::NotUploaded).await.unwrap();
        assert_eq!(store.get_raw("asset-1").as_deref(), Some("NOT_UPLOADED"));

        store.set_status(&id, AssetStatus::Uploaded).await.unwrap();
        assert_eq!(store.get_raw("asset-1").as_deref(), Some("UPLOADED"));
        assert_eq!(
            store.get_status(&id).await.unwrap(),
            Some(AssetStatus::Uploaded)
        );
    }

    #[tokio::test]
    async fn test_memory_store_rejects_unknown_token() {
        let store = MemoryStateStore::new();
        store.insert_raw("asset-1", "DELETED");

        let err = store.get_status(&AssetId::from("asset-1")).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidValue { ref key, ref value } if key == "asset-1" && value == "DELETED"
        ));
    }
}
