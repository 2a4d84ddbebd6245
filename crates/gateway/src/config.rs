//! # Gateway設定・共有状態
//!
//! 環境変数からの設定読み込みとGatewayの共有状態の定義。
//!
//! 環境変数名はフィールド名の大文字表記（例: `upload_url_ttl` → `UPLOAD_URL_TTL`）。

use std::sync::Arc;
use std::time::Duration;

use assetgate_registry::{AssetRegistry, RedisPoolConfig};
use serde::Deserialize;

use crate::error::GatewayError;
use crate::storage::BlobStorage;

/// SigV4署名付きURLの有効期限の上限（7日）
pub const MAX_PRESIGN_EXPIRY_SECS: u32 = 604_800;

/// 共有ストアのバックエンド種別。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    /// Redis（本番用）
    #[default]
    Redis,
    /// プロセス内メモリ（開発環境用）。全ワーカーで1インスタンスを共有する。
    Memory,
}

/// 環境変数から読み込むGateway設定。
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    // Blob Store
    #[serde(default = "default_region")]
    pub aws_region: String,
    /// S3互換エンドポイント（MinIO等）。未指定時はAWSのリージョンエンドポイント。
    #[serde(default)]
    pub s3_endpoint: Option<String>,
    /// クライアント向け署名付きURLに使用するエンドポイント。
    /// 内部ホスト名と外部ホスト名が異なる場合に指定する。
    #[serde(default)]
    pub s3_public_endpoint: Option<String>,
    pub s3_bucket: String,
    #[serde(default)]
    pub s3_path_style: bool,
    /// アップロードオブジェクトに付与するcanned ACL
    #[serde(default = "default_file_acl")]
    pub file_acl: String,

    // 署名付きURLの有効期限（秒）
    #[serde(default = "default_url_ttl")]
    pub upload_url_ttl: u32,
    #[serde(default = "default_url_ttl")]
    pub download_url_ttl: u32,
    #[serde(default = "default_download_ttl_min")]
    pub download_url_ttl_min: u32,
    #[serde(default = "default_download_ttl_max")]
    pub download_url_ttl_max: u32,

    // 共有ストア
    #[serde(default)]
    pub state_backend: StateBackend,
    #[serde(default = "default_redis_host")]
    pub redis_host: String,
    #[serde(default = "default_redis_port")]
    pub redis_port: u16,
    #[serde(default)]
    pub redis_db: i64,
    #[serde(default = "default_redis_pool_min")]
    pub redis_pool_min: usize,
    #[serde(default = "default_redis_pool_max")]
    pub redis_pool_max: usize,
    #[serde(default = "default_redis_timeout_ms")]
    pub redis_timeout_ms: u64,

    /// ローカルキャッシュの `NotUploaded` エントリを信頼する秒数。0は無期限。
    #[serde(default = "default_local_cache_ttl")]
    pub local_cache_ttl: u64,
    /// ローカルキャッシュのエントリ数上限。0は上限なし。
    #[serde(default = "default_local_cache_max_entries")]
    pub local_cache_max_entries: usize,

    // サーバー
    #[serde(default = "default_api_host")]
    pub api_host: String,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_file_acl() -> String {
    "private".to_string()
}

fn default_url_ttl() -> u32 {
    3600
}

fn default_download_ttl_min() -> u32 {
    1
}

fn default_download_ttl_max() -> u32 {
    MAX_PRESIGN_EXPIRY_SECS
}

fn default_redis_host() -> String {
    "127.0.0.1".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_redis_pool_min() -> usize {
    5
}

fn default_redis_pool_max() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    2000
}

fn default_local_cache_ttl() -> u64 {
    5
}

fn default_local_cache_max_entries() -> usize {
    100_000
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8000
}

fn default_workers() -> usize {
    1
}

impl GatewayConfig {
    /// プロセスの環境変数から読み込む。
    pub fn from_env() -> anyhow::Result<Self> {
        Self::load(::config::Environment::default())
    }

    /// 指定した変数セットから読み込む。
    #[cfg(test)]
    pub fn from_vars(vars: std::collections::HashMap<String, String>) -> anyhow::Result<Self> {
        Self::load(::config::Environment::default().source(Some(vars)))
    }

    fn load(environment: ::config::Environment) -> anyhow::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(environment.try_parsing(true))
            .build()?;

        let config: GatewayConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 設定値の整合性を検証する。
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.s3_bucket.trim().is_empty(), "S3_BUCKET が空です");
        anyhow::ensure!(self.workers > 0, "WORKERS は1以上である必要があります");
        anyhow::ensure!(
            (1..=MAX_PRESIGN_EXPIRY_SECS).contains(&self.upload_url_ttl),
            "UPLOAD_URL_TTL は1〜{MAX_PRESIGN_EXPIRY_SECS}秒の範囲である必要があります: {}",
            self.upload_url_ttl
        );
        anyhow::ensure!(
            self.download_url_ttl_min >= 1
                && self.download_url_ttl_min <= self.download_url_ttl_max
                && self.download_url_ttl_max <= MAX_PRESIGN_EXPIRY_SECS,
            "DOWNLOAD_URL_TTL_MIN/MAX が不正です: {}..{}",
            self.download_url_ttl_min,
            self.download_url_ttl_max
        );
        anyhow::ensure!(
            (self.download_url_ttl_min..=self.download_url_ttl_max)
                .contains(&self.download_url_ttl),
            "DOWNLOAD_URL_TTL がMIN/MAXの範囲外です: {}",
            self.download_url_ttl
        );
        anyhow::ensure!(
            self.redis_pool_min >= 1 && self.redis_pool_min <= self.redis_pool_max,
            "REDIS_POOL_MIN/MAX が不正です: {}..{}",
            self.redis_pool_min,
            self.redis_pool_max
        );
        anyhow::ensure!(self.redis_timeout_ms > 0, "REDIS_TIMEOUT_MS は1以上である必要があります");
        Ok(())
    }

    pub fn redis_pool_config(&self) -> RedisPoolConfig {
        RedisPoolConfig {
            host: self.redis_host.clone(),
            port: self.redis_port,
            db: self.redis_db,
            min_connections: self.redis_pool_min,
            max_connections: self.redis_pool_max,
            command_timeout: Duration::from_millis(self.redis_timeout_ms),
        }
    }

    pub fn local_cache_ttl(&self) -> Option<Duration> {
        match self.local_cache_ttl {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn local_cache_max_entries(&self) -> Option<usize> {
        match self.local_cache_max_entries {
            0 => None,
            max => Some(max),
        }
    }

    pub fn download_ttl_policy(&self) -> DownloadTtlPolicy {
        DownloadTtlPolicy {
            default_secs: self.download_url_ttl,
            min_secs: self.download_url_ttl_min,
            max_secs: self.download_url_ttl_max,
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

/// ダウンロードURL有効期限の既定値と、呼び出し元指定値の許容範囲。
#[derive(Debug, Clone, Copy)]
pub struct DownloadTtlPolicy {
    pub default_secs: u32,
    pub min_secs: u32,
    pub max_secs: u32,
}

impl DownloadTtlPolicy {
    /// `?timeout=` の値を検証し、使用する有効期限を返す。
    pub fn resolve(&self, requested: Option<u32>) -> Result<u32, GatewayError> {
        match requested {
            None => Ok(self.default_secs),
            Some(secs) if (self.min_secs..=self.max_secs).contains(&secs) => Ok(secs),
            Some(secs) => Err(GatewayError::BadRequest(format!(
                "timeout は{}〜{}秒の範囲で指定してください: {secs}",
                self.min_secs, self.max_secs
            ))),
        }
    }
}

/// Gatewayの共有状態。ワーカーごとに1つ構築する。
pub struct GatewayState {
    /// ワーカーローカルのAsset Registry
    pub registry: AssetRegistry,
    /// Blob Store（S3互換等、トレイトで抽象化）
    pub blob_storage: Arc<dyn BlobStorage>,
    /// アップロードURLの有効期限（秒）
    pub upload_url_ttl_secs: u32,
    pub download_ttl: DownloadTtlPolicy,
}

impl GatewayState {
    pub fn new(
        registry: AssetRegistry,
        blob_storage: Arc<dyn BlobStorage>,
        config: &GatewayConfig,
    ) -> Self {
        Self {
            registry,
            blob_storage,
            upload_url_ttl_secs: config.upload_url_ttl,
            download_ttl: config.download_ttl_policy(),
        }
    }
}
