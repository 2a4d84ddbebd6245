//! # assetgate Asset Registry
//!
//! アセットのアップロード状態を管理する二層キャッシュ。
//!
//! ## 構成
//! - [`SharedStateStore`]: 全ワーカーが参照する共有ストア（正本）
//! - [`LocalStateCache`]: ワーカーごとのインメモリキャッシュ（派生ビュー）
//! - [`AssetRegistry`]: 状態遷移 `∅ → NotUploaded → Uploaded` を管理し、
//!   二層間の読み書き順序を保証する
//!
//! ## 書き込み順序
//! 変更操作は常に共有ストアを先に更新し、成功した場合のみローカルキャッシュを更新する。

pub mod cache;
pub mod error;
pub mod registry;
pub mod store;

pub use cache::LocalStateCache;
pub use error::{RegistryError, StoreError};
pub use registry::AssetRegistry;
pub use store::{MemoryStateStore, SharedStateStore};

#[cfg(feature = "backend-redis")]
pub use store::redis::{RedisPoolConfig, RedisStateStore};
