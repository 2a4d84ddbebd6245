//! # Asset Registry
//!
//! アセット状態のライフサイクル `∅ → NotUploaded → Uploaded` を管理する。
//!
//! ## 整合性ルール
//! - 変更操作は共有ストアを先に書き込み、確認後にローカルキャッシュへ反映する。
//!   共有ストアへの書き込みが失敗した場合、ローカルキャッシュは変更しない。
//! - 参照はローカルキャッシュを優先し、ミス時のみ共有ストアに問い合わせる。
//!   共有ストアで見つかった状態はローカルキャッシュに格納する（read-through）。
//! - 「存在しない」という結果はキャッシュしない。他ワーカーが作成直後のレコードを
//!   隠してしまうため。

use std::sync::Arc;

use assetgate_types::{AssetId, AssetStatus};

use crate::cache::LocalStateCache;
use crate::error::RegistryError;
use crate::store::SharedStateStore;

/// ワーカーごとのAsset Registry。
pub struct AssetRegistry {
    shared: Arc<dyn SharedStateStore>,
    local: LocalStateCache,
}

impl AssetRegistry {
    pub fn new(shared: Arc<dyn SharedStateStore>, local: LocalStateCache) -> Self {
        Self { shared, local }
    }

    pub fn local_cache(&self) -> &LocalStateCache {
        &self.local
    }

    /// 新しいIDを生成し `NotUploaded` として登録する。
    pub async fn create_asset(&self) -> Result<AssetId, RegistryError> {
        let id = AssetId::generate();
        self.register(&id).await?;
        Ok(id)
    }

    /// 呼び出し元が生成したIDを `NotUploaded` として登録する。
    ///
    /// 共有ストアへの書き込みが確認されるまで返らない。
    pub async fn register(&self, id: &AssetId) -> Result<(), RegistryError> {
        self.shared
            .set_status(id, AssetStatus::NotUploaded)
            .await?;
        self.local.record(id, AssetStatus::NotUploaded);

        tracing::info!(asset_id = %id, "アセットを登録");
        Ok(())
    }

    /// レコードが存在するかを返す。
    pub async fn exists(&self, id: &AssetId) -> Result<bool, RegistryError> {
        Ok(self.lookup(id).await?.is_some())
    }

    /// アップロード済みとしてマークする。既に `Uploaded` の場合も成功する。
    pub async fn mark_uploaded(&self, id: &AssetId) -> Result<(), RegistryError> {
        if !self.exists(id).await? {
            return Err(RegistryError::NotFound(id.clone()));
        }

        self.shared.set_status(id, AssetStatus::Uploaded).await?;
        self.local.record(id, AssetStatus::Uploaded);

        tracing::info!(asset_id = %id, "アセットをアップロード済みに更新");
        Ok(())
    }

    /// 現在の状態を返す。
    pub async fn get_status(&self, id: &AssetId) -> Result<AssetStatus, RegistryError> {
        self.lookup(id)
            .await?
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    async fn lookup(&self, id: &AssetId) -> Result<Option<AssetStatus>, RegistryError> {
        if let Some(status) = self.local.get(id) {
            tracing::debug!(asset_id = %id, %status, "ローカルキャッシュにヒット");
            return Ok(Some(status));
        }

        tracing::debug!(asset_id = %id, "ローカルキャッシュにないため共有ストアを参照");
        match self.shared.get_status(id).await? {
            Some(observed) => {
                let status = self.local.record(id, observed);
                tracing::debug!(asset_id = %id, %status, "共有ストアの状態をキャッシュ");
                Ok(Some(status))
            }
            None => {
                tracing::debug!(asset_id = %id, "共有ストアにレコードなし");
                Ok(None)
            }
        }
    }
}
