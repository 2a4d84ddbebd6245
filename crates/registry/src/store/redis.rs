//! # Redis Shared State Store 実装
//!
//! `GET` / `SET` でアセットIDごとの状態トークンを読み書きする。
//!
//! ワーカー起動時に `min_connections` 本の多重化接続を確立し、ラウンドロビンで使用する。
//! 同時実行コマンド数は `max_connections` で制限する。

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use assetgate_types::{AssetId, AssetStatus};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult};
use tokio::sync::Semaphore;

use super::{parse_status, SharedStateStore};
use crate::error::StoreError;

/// Redis接続プールの設定。
#[derive(Debug, Clone)]
pub struct RedisPoolConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,
    /// 起動時に確立する接続数
    pub min_connections: usize,
    /// 同時実行コマンド数の上限
    pub max_connections: usize,
    /// 接続確立・コマンド実行ごとの制限時間
    pub command_timeout: Duration,
}

impl RedisPoolConfig {
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }
}

/// Redisを正本とする共有ストア。
pub struct RedisStateStore {
    connections: Vec<ConnectionManager>,
    next: AtomicUsize,
    in_flight: Semaphore,
    command_timeout: Duration,
}

impl RedisStateStore {
    /// 接続プールを確立する。
    pub async fn connect(config: &RedisPoolConfig) -> Result<Self, StoreError> {
        let client = redis::Client::open(config.url())
            .map_err(|e| StoreError::Unavailable(format!("Redis接続設定が不正: {e}")))?;

        let size = config.min_connections.max(1);
        let mut connections = Vec::with_capacity(size);
        for _ in 0..size {
            let conn = tokio::time::timeout(
                config.command_timeout,
                ConnectionManager::new(client.clone()),
            )
            .await
            .map_err(|_| StoreError::Timeout("CONNECT"))?
            .map_err(|e| StoreError::Unavailable(format!("Redis接続確立失敗: {e}")))?;
            connections.push(conn);
        }

        tracing::info!(
            redis_host = %config.host,
            redis_port = config.port,
            connections = connections.len(),
            max_in_flight = config.max_connections,
            "Redis接続プールを確立"
        );

        Ok(Self {
            connections,
            next: AtomicUsize::new(0),
            in_flight: Semaphore::new(config.max_connections.max(1)),
            command_timeout: config.command_timeout,
        })
    }

    fn pick(&self) -> ConnectionManager {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        self.connections[index].clone()
    }

    /// 空きを待ってコマンドを1つ実行する。待ち時間も制限時間に含む。
    async fn run<T, F, Fut>(&self, command: &'static str, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(ConnectionManager) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let exec = async {
            let _permit = self
                .in_flight
                .acquire()
                .await
                .map_err(|e| StoreError::Unavailable(format!("接続プールが閉じています: {e}")))?;
            f(self.pick())
                .await
                .map_err(|e| StoreError::Unavailable(format!("{command} 失敗: {e}")))
        };

        tokio::time::timeout(self.command_timeout, exec)
            .await
            .map_err(|_| StoreError::Timeout(command))?
    }
}

#[async_trait::async_trait]
impl SharedStateStore for RedisStateStore {
    async fn get_status(&self, id: &AssetId) -> Result<Option<AssetStatus>, StoreError> {
        let key = id.to_string();
        let raw: Option<String> = self
            .run("GET", move |mut conn| async move { conn.get(key).await })
            .await?;

        raw.map(|value| parse_status(id.as_str(), value)).transpose()
    }

    async fn set_status(&self, id: &AssetId, status: AssetStatus) -> Result<(), StoreError> {
        let key = id.to_string();
        self.run("SET", move |mut conn| async move {
            conn.set::<_, _, ()>(key, status.as_str()).await
        })
        .await
    }
}

impl Drop for RedisStateStore {
    fn drop(&mut self) {
        self.in_flight.close();
        tracing::debug!(connections = self.connections.len(), "Redis接続プールを解放");
    }
}
