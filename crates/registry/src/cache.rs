//! # Local State Cache
//!
//! ワーカーごとのインメモリ状態キャッシュ。共有ストアの派生ビューであり、
//! 他ワーカーの書き込みに対しては古くなり得る。
//!
//! - `Uploaded` は終端状態なので期限なしで保持する。
//! - `NotUploaded` は `not_uploaded_ttl` 経過後に失効し、次回参照で共有ストアから再取得される。
//!   `None` の場合は失効しない（一度読み込んだ値を保持し続ける）。
//! - 記録は単調マージ: `Uploaded` のエントリを `NotUploaded` で上書きしない。
//! - 失効エントリは `SWEEP_INTERVAL` 件の新規記録ごとにまとめて削除する。
//! - `max_entries` に達した場合は観測時刻の古いものから追い出す。
//!   追い出されたIDは次回参照時に共有ストアから再取得される。

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use assetgate_types::{AssetId, AssetStatus};
use tokio::time::Instant;

/// 失効エントリを一括削除する間隔（新規記録数）
const SWEEP_INTERVAL: usize = 256;

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    status: AssetStatus,
    observed_at: Instant,
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<AssetId, CacheEntry>,
    inserts_since_sweep: usize,
}

/// ワーカーローカルなアセット状態キャッシュ。
///
/// ロックは同期区間でのみ保持し、`.await` をまたがない。
#[derive(Debug)]
pub struct LocalStateCache {
    entries: Mutex<Entries>,
    not_uploaded_ttl: Option<Duration>,
    max_entries: Option<usize>,
}

impl LocalStateCache {
    /// 空のキャッシュを構築する。エントリ数の上限はない。
    pub fn new(not_uploaded_ttl: Option<Duration>) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            not_uploaded_ttl,
            max_entries: None,
        }
    }

    /// `NotUploaded` エントリも失効しないキャッシュ。
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// エントリ数の上限を設定する。`None` は上限なし。
    pub fn with_max_entries(mut self, max_entries: Option<usize>) -> Self {
        self.max_entries = max_entries.map(|max| max.max(1));
        self
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        // 保持中にパニックする区間はないため、ポイズンは無視して続行する
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// キャッシュされている状態を返す。失効したエントリは削除して `None` を返す。
    pub fn get(&self, id: &AssetId) -> Option<AssetStatus> {
        let mut entries = self.entries();
        let entry = *entries.map.get(id)?;

        if self.is_expired(&entry, Instant::now()) {
            entries.map.remove(id);
            return None;
        }
        Some(entry.status)
    }

    /// 状態を記録し、記録後に有効な状態を返す。
    ///
    /// 既存エントリより前の状態は無視される（単調マージ）。
    pub fn record(&self, id: &AssetId, status: AssetStatus) -> AssetStatus {
        let now = Instant::now();
        let mut entries = self.entries();

        if let Some(entry) = entries.map.get_mut(id) {
            if status >= entry.status {
                entry.status = status;
                entry.observed_at = now;
            }
            return entry.status;
        }

        entries.inserts_since_sweep += 1;
        if entries.inserts_since_sweep >= SWEEP_INTERVAL || self.is_full(&entries) {
            self.sweep(&mut entries, now);
        }
        if let Some(max) = self.max_entries {
            if entries.map.len() >= max {
                // 一度に上限の1/16を空けて、追い出しの頻度を抑える
                Self::evict_oldest(&mut entries.map, max - 1 - max / 16);
            }
        }

        entries.map.insert(
            id.clone(),
            CacheEntry {
                status,
                observed_at: now,
            },
        );
        status
    }

    pub fn len(&self) -> usize {
        self.entries().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_full(&self, entries: &Entries) -> bool {
        self.max_entries.is_some_and(|max| entries.map.len() >= max)
    }

    fn sweep(&self, entries: &mut Entries, now: Instant) {
        entries.inserts_since_sweep = 0;
        if self.not_uploaded_ttl.is_none() {
            return;
        }
        let before = entries.map.len();
        entries.map.retain(|_, entry| !self.is_expired(entry, now));
        let removed = before - entries.map.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = entries.map.len(), "失効したキャッシュエントリを削除");
        }
    }

    /// `keep` 件以下になるまで観測時刻の古いエントリを削除する。
    fn evict_oldest(map: &mut HashMap<AssetId, CacheEntry>, keep: usize) {
        if map.len() <= keep {
            return;
        }
        let mut by_age: Vec<(Instant, AssetId)> = map
            .iter()
            .map(|(id, entry)| (entry.observed_at, id.clone()))
            .collect();
        by_age.sort_unstable_by_key(|(observed_at, _)| *observed_at);

        let evicted = map.len() - keep;
        for (_, id) in by_age.into_iter().take(evicted) {
            map.remove(&id);
        }
        tracing::debug!(evicted, remaining = map.len(), "上限超過のためキャッシュエントリを追い出し");
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        match (entry.status, self.not_uploaded_ttl) {
            (AssetStatus::NotUploaded, Some(ttl)) => now.duration_since(entry.observed_at) >= ttl,
            _ => false,
        }
    }
}

impl Default for LocalStateCache {
    fn default() -> Self {
        Self::unbounded()
    }
}
