//! # エンドポイントテスト用共通ヘルパー
//!
//! Blob Storeのモック、障害を注入できる共有ストア、GatewayStateの構築。

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use assetgate_registry::{
    AssetRegistry, LocalStateCache, MemoryStateStore, SharedStateStore, StoreError,
};
use assetgate_types::{AssetId, AssetStatus};

use crate::config::{DownloadTtlPolicy, GatewayState};
use crate::error::GatewayError;
use crate::storage::BlobStorage;

/// テスト用のモックBlobStorage。
/// S3への接続なしで署名付きURLのダミーを返し、存在するオブジェクトを手動で登録できる。
#[derive(Default)]
pub struct MockBlobStorage {
    objects: Mutex<HashSet<String>>,
    fail_presign: AtomicBool,
    fail_head: AtomicBool,
}

impl MockBlobStorage {
    /// クライアントが署名付きURLでアップロードした状態を再現する。
    pub fn put_object(&self, key: &str) {
        self.objects.lock().unwrap().insert(key.to_string());
    }

    pub fn fail_presign(&self) {
        self.fail_presign.store(true, Ordering::SeqCst);
    }

    pub fn fail_head(&self) {
        self.fail_head.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl BlobStorage for MockBlobStorage {
    async fn presign_upload(
        &self,
        object_key: &str,
        expiry_secs: u32,
    ) -> Result<String, GatewayError> {
        if self.fail_presign.load(Ordering::SeqCst) {
            return Err(GatewayError::Upstream("AccessDenied".to_string()));
        }
        Ok(format!(
            "http://mock-storage/upload/{object_key}?X-Amz-Expires={expiry_secs}&sig=test"
        ))
    }

    async fn presign_download(
        &self,
        object_key: &str,
        expiry_secs: u32,
    ) -> Result<String, GatewayError> {
        if self.fail_presign.load(Ordering::SeqCst) {
            return Err(GatewayError::Upstream("AccessDenied".to_string()));
        }
        Ok(format!(
            "http://mock-storage/download/{object_key}?X-Amz-Expires={expiry_secs}&sig=test"
        ))
    }

    async fn object_exists(&self, object_key: &str) -> Result<bool, GatewayError> {
        if self.fail_head.load(Ordering::SeqCst) {
            return Err(GatewayError::Upstream("HeadObjectがHTTP 403を返しました".to_string()));
        }
        Ok(self.objects.lock().unwrap().contains(object_key))
    }
}

/// `fail_all` 以降のすべての操作が失敗する共有ストア。
#[derive(Default)]
pub struct FailingStateStore {
    inner: MemoryStateStore,
    failing: AtomicBool,
}

impl FailingStateStore {
    pub fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SharedStateStore for FailingStateStore {
    async fn get_status(&self, id: &AssetId) -> Result<Option<AssetStatus>, StoreError> {
        self.check()?;
        self.inner.get_status(id).await
    }

    async fn set_status(&self, id: &AssetId, status: AssetStatus) -> Result<(), StoreError> {
        self.check()?;
        self.inner.set_status(id, status).await
    }
}

/// テスト用のGatewayStateと、その背後のストア群。
pub struct TestContext {
    pub state: Arc<GatewayState>,
    pub store: Arc<MemoryStateStore>,
    pub blobs: Arc<MockBlobStorage>,
}

/// テスト用GatewayStateを構築するヘルパー
pub fn test_context() -> TestContext {
    let store = Arc::new(MemoryStateStore::new());
    let blobs = Arc::new(MockBlobStorage::default());
    let state = test_state_with(store.clone(), blobs.clone());
    TestContext {
        state,
        store,
        blobs,
    }
}

/// 既存のストアを共有する別ワーカー相当のGatewayStateを構築する。
pub fn test_state_with(
    store: Arc<MemoryStateStore>,
    blobs: Arc<MockBlobStorage>,
) -> Arc<GatewayState> {
    test_state_with_store(store, blobs)
}

/// 任意の共有ストア実装でGatewayStateを構築する。
pub fn test_state_with_store(
    shared: Arc<dyn SharedStateStore>,
    blobs: Arc<MockBlobStorage>,
) -> Arc<GatewayState> {
    Arc::new(GatewayState {
        registry: AssetRegistry::new(shared, LocalStateCache::unbounded()),
        blob_storage: blobs,
        upload_url_ttl_secs: 3600,
        download_ttl: DownloadTtlPolicy {
            default_secs: 3600,
            min_secs: 1,
            max_secs: 86_400,
        },
    })
}
