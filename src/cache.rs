use crate::store::{KeyValueStore, OrderedWriter};
use crate::types::{AnalysisRequest, AnalysisResult, HealthSnapshot, UserProfile};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

const STORE_KEY: &str = "result_cache.entries";

pub const DEFAULT_TTL_MS: u64 = 60 * 60 * 1000;
pub const DEFAULT_CAPACITY: usize = 50;

/// Minimum source-data similarity for a cached result to be reused.
pub const SIMILARITY_THRESHOLD: f64 = 0.9;

/// Snapshot timestamps are bucketed to this granularity before hashing.
const TIME_BUCKET_SECS: i64 = 60 * 60;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    /// Stable across processes: SHA-256 over the request kind, the local-only
    /// flag, language, an hour-bucketed digest of the snapshot, and the
    /// profile's stable fields. Forced-local requests never share a key with
    /// routed ones.
    pub fn derive(req: &AnalysisRequest) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(req.kind.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update([u8::from(req.force_local)]);
        hasher.update(req.language.to_ascii_lowercase().as_bytes());
        hasher.update([0u8]);
        hash_snapshot(&mut hasher, &req.snapshot);
        hash_profile(&mut hasher, &req.profile);
        Fingerprint(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn hash_snapshot(hasher: &mut Sha256, snapshot: &HealthSnapshot) {
    let bucket = snapshot.captured_at.timestamp().div_euclid(TIME_BUCKET_SECS);
    hasher.update(bucket.to_le_bytes());
    for (name, value) in snapshot.readings() {
        hasher.update(name.as_bytes());
        // One decimal place keeps sensor jitter from splitting the key.
        hasher.update(((value * 10.0).round() as i64).to_le_bytes());
    }
}

fn hash_profile(hasher: &mut Sha256, profile: &UserProfile) {
    hasher.update(profile.age.unwrap_or(0).to_le_bytes());
    hasher.update(format!("{:?}", profile.gender).as_bytes());
    let mut goals = profile.goals.clone();
    goals.sort();
    goals.dedup();
    for goal in goals {
        hasher.update(format!("{goal:?}").as_bytes());
    }
    hasher.update(format!("{:?}", profile.exercise_frequency).as_bytes());
    let mut conditions: Vec<String> = profile
        .chronic_conditions
        .iter()
        .map(|c| c.trim().to_lowercase())
        .collect();
    conditions.sort();
    for condition in conditions {
        hasher.update(condition.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(format!("{:?}", profile.privacy).as_bytes());
}

/// Similarity of two snapshots judged by how far apart they were captured.
pub fn similarity(cached: DateTime<Utc>, current: DateTime<Utc>) -> f64 {
    let delta = (current - cached).abs();
    if delta < Duration::hours(1) {
        0.95
    } else if delta < Duration::days(1) {
        0.8
    } else {
        0.5
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub result: Arc<AnalysisResult>,
    pub source_captured_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub hit_count: u64,
}

impl CacheEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
}

/// Bounded TTL cache of completed analyses. Lookups and writes each take the
/// single lock, so a check-then-write on one fingerprint cannot interleave.
pub struct ResultCache {
    entries: Mutex<HashMap<Fingerprint, CacheEntry>>,
    ttl: Duration,
    capacity: usize,
    store: Option<Arc<dyn KeyValueStore>>,
    writer: OrderedWriter,
}

impl ResultCache {
    pub fn new(capacity: usize, ttl_ms: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::milliseconds(ttl_ms as i64),
            capacity: capacity.max(1),
            store: None,
            writer: OrderedWriter::new(),
        }
    }

    /// Cache backed by `store`; live persisted entries are reloaded. Store
    /// failures only cost warm entries.
    pub async fn with_store(capacity: usize, ttl_ms: u64, store: Arc<dyn KeyValueStore>) -> Self {
        let mut cache = Self::new(capacity, ttl_ms);
        let now = Utc::now();
        match store.get(STORE_KEY).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<CacheEntry>>(&bytes) {
                Ok(entries) => {
                    let mut map = cache.entries.lock();
                    for entry in entries.into_iter().filter(|e| e.is_live(now)) {
                        map.insert(entry.fingerprint.clone(), entry);
                    }
                    evict(&mut map, cache.capacity, now);
                    tracing::info!(entries = map.len(), "restored result cache");
                }
                Err(err) => tracing::warn!("discarding unreadable result cache: {err}"),
            },
            Ok(None) => {}
            Err(err) => tracing::warn!("result cache store unavailable: {err}"),
        }
        cache.store = Some(store);
        cache
    }

    pub async fn lookup(
        &self,
        fingerprint: &Fingerprint,
        captured_at: DateTime<Utc>,
    ) -> Option<AnalysisResult> {
        self.lookup_at(fingerprint, captured_at, Utc::now())
    }

    /// Hit only when the entry is live and its source data is similar enough.
    /// A hit bumps the entry's hit count and returns the result flagged as
    /// served from cache.
    pub fn lookup_at(
        &self,
        fingerprint: &Fingerprint,
        captured_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<AnalysisResult> {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(fingerprint)?;
        if !entry.is_live(now) {
            entries.remove(fingerprint);
            return None;
        }
        if similarity(entry.source_captured_at, captured_at) < SIMILARITY_THRESHOLD {
            return None;
        }
        entry.hit_count += 1;
        let mut result = (*entry.result).clone();
        result.metrics.cache_hit = true;
        Some(result)
    }

    pub async fn insert(
        &self,
        fingerprint: Fingerprint,
        result: Arc<AnalysisResult>,
        captured_at: DateTime<Utc>,
    ) {
        let snapshot = self.write_entry(fingerprint, result, captured_at, Utc::now());
        if let (Some(store), Some((ticket, bytes))) = (self.store.as_ref(), snapshot) {
            match self.writer.write(store.as_ref(), STORE_KEY, ticket, bytes).await {
                Ok(true) => {}
                Ok(false) => tracing::debug!(ticket, "newer result cache already stored"),
                Err(err) => tracing::warn!("failed to persist result cache: {err}"),
            }
        }
    }

    /// Replace any entry for `fingerprint`, unless the existing entry is live
    /// and holds a newer result. Returns the serialized cache when a store is
    /// attached and the write took effect.
    pub fn insert_at(
        &self,
        fingerprint: Fingerprint,
        result: Arc<AnalysisResult>,
        captured_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<Vec<u8>> {
        self.write_entry(fingerprint, result, captured_at, now)
            .map(|(_, bytes)| bytes)
    }

    /// Apply the write and, with a store attached, serialize the cache along
    /// with the write ticket taken under the same lock.
    fn write_entry(
        &self,
        fingerprint: Fingerprint,
        result: Arc<AnalysisResult>,
        captured_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<(u64, Vec<u8>)> {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&fingerprint) {
            if existing.is_live(now) && existing.result.generated_at > result.generated_at {
                tracing::debug!(
                    fingerprint = fingerprint.as_str(),
                    "keeping newer cached result"
                );
                return None;
            }
        }
        entries.insert(
            fingerprint.clone(),
            CacheEntry {
                fingerprint,
                result,
                source_captured_at: captured_at,
                created_at: now,
                expires_at: now + self.ttl,
                hit_count: 0,
            },
        );
        evict(&mut entries, self.capacity, now);

        if self.store.is_some() {
            let list: Vec<&CacheEntry> = entries.values().collect();
            serde_json::to_vec(&list)
                .ok()
                .map(|bytes| (self.writer.ticket(), bytes))
        } else {
            None
        }
    }

    pub fn hit_count(&self, fingerprint: &Fingerprint) -> Option<u64> {
        self.entries.lock().get(fingerprint).map(|e| e.hit_count)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.lock().contains_key(fingerprint)
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        CacheStats {
            entries: entries.len(),
            hits: entries.values().map(|e| e.hit_count).sum(),
        }
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Drop expired entries, then the oldest by creation time until within
/// capacity.
fn evict(entries: &mut HashMap<Fingerprint, CacheEntry>, capacity: usize, now: DateTime<Utc>) {
    entries.retain(|_, entry| entry.is_live(now));
    while entries.len() > capacity {
        let oldest = entries
            .values()
            .min_by_key(|entry| entry.created_at)
            .map(|entry| entry.fingerprint.clone());
        match oldest {
            Some(fingerprint) => {
                entries.remove(&fingerprint);
            }
            None => break,
        }
    }
}
