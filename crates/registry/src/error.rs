//! # Registry エラー型
//!
//! 共有ストアの転送エラー（[`StoreError`]）と、
//! Registry操作の結果として呼び出し元に返すエラー（[`RegistryError`]）。

use assetgate_types::AssetId;

/// 共有ストアの操作エラー。
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 接続・コマンド実行の失敗
    #[error("共有ストアへの接続に失敗: {0}")]
    Unavailable(String),
    /// コマンドが制限時間内に完了しなかった
    #[error("共有ストアのコマンドがタイムアウトしました: {0}")]
    Timeout(&'static str),
    /// 保存されている値が状態トークンとして解釈できない
    #[error("共有ストアの値が不正です: {key} = {value}")]
    InvalidValue { key: String, value: String },
}

/// Asset Registryのエラー型。
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// 指定IDのレコードが存在しない
    #[error("アセットが見つかりません: {0}")]
    NotFound(AssetId),
    /// 共有ストアの読み書きに失敗。ローカルキャッシュは変更されていない。
    #[error("共有ストアを利用できません: {0}")]
    BackingStoreUnavailable(#[source] StoreError),
    /// 共有ストアに未知の状態トークンが保存されている
    #[error("アセット {id} の状態レコードが不正です: {value}")]
    CorruptRecord { id: String, value: String },
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidValue { key, value } => RegistryError::CorruptRecord { id: key, value },
            other => RegistryError::BackingStoreUnavailable(other),
        }
    }
}
