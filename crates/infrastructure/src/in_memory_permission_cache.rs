use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use demodeck_application::{PermissionCache, PermissionCacheEntry, PermissionCacheStats};
use demodeck_core::{AppError, AppResult, ProjectId, UserId};


/// Reference lifetime of a cached decision.
pub const DEFAULT_PERMISSION_CACHE_TTL: Duration = Duration::from_secs(60);

/// Reference number of cached decisions.
pub const DEFAULT_PERMISSION_CACHE_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy)]
struct CachedDecision {
    allowed: bool,
    written_at: Instant,
    last_used: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<(ProjectId, UserId), CachedDecision>,
    clock: u64,
    generation: u64,
}

impl CacheState {
    fn advance_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    fn touch(&mut self) -> u64 {
        self.clock = self.clock.wrapping_add(1);
        self.clock
    }

    fn purge_expired(&mut self, ttl: Duration, now: Instant) {
        self.entries
            .retain(|_, entry| now.duration_since(entry.written_at) < ttl);
    }

    fn evict_least_recently_used(&mut self) {
        if let Some(key) = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| *key)
        {
            self.entries.remove(&key);
        }
    }
}

/// Process-wide permission cache with TTL expiry and least-recently-used eviction.
///
/// Critical sections never await, so a blocking mutex is enough.
#[derive(Debug)]
pub struct InMemoryPermissionCache {
    state: Mutex<CacheState>,
    ttl: Duration,
    capacity: usize,
}

impl InMemoryPermissionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    fn state(&self) -> AppResult<MutexGuard<'_, CacheState>> {
        self.state.lock().map_err(|error| {
            AppError::Internal(format!("permission cache lock poisoned: {error}"))
        })
    }
}

impl Default for InMemoryPermissionCache {
    fn default() -> Self {
        Self::new(
            DEFAULT_PERMISSION_CACHE_TTL,
            DEFAULT_PERMISSION_CACHE_CAPACITY,
        )
    }
}

#[async_trait]
impl PermissionCache for InMemoryPermissionCache {
    async fn get(&self, project_id: ProjectId, user_id: UserId) -> AppResult<Option<bool>> {
        let mut state = self.state()?;
        let key = (project_id, user_id);
        let Some(entry) = state.entries.get(&key).copied() else {
            return Ok(None);
        };

        if entry.written_at.elapsed() >= self.ttl {
            state.entries.remove(&key);
            return Ok(None);
        }

        let last_used = state.touch();
        if let Some(entry) = state.entries.get_mut(&key) {
            entry.last_used = last_used;
        }
        Ok(Some(entry.allowed))
    }

    async fn generation(&self) -> AppResult<u64> {
        Ok(self.state()?.generation)
    }

    async fn set(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        allowed: bool,
        generation: u64,
    ) -> AppResult<bool> {
        let mut state = self.state()?;
        if state.generation != generation {
            return Ok(false);
        }
        let key = (project_id, user_id);
        let now = Instant::now();

        if !state.entries.contains_key(&key) && state.entries.len() >= self.capacity {
            state.purge_expired(self.ttl, now);
            if state.entries.len() >= self.capacity {
                state.evict_least_recently_used();
            }
        }

        let last_used = state.touch();
        state.entries.insert(
            key,
            CachedDecision {
                allowed,
                written_at: now,
                last_used,
            },
        );
        Ok(true)
    }

    async fn invalidate_project(&self, project_id: ProjectId) -> AppResult<()> {
        let mut state = self.state()?;
        state.advance_generation();
        state
            .entries
            .retain(|(stored_project_id, _), _| *stored_project_id != project_id);
        Ok(())
    }

    async fn invalidate_user(&self, user_id: UserId) -> AppResult<()> {
        let mut state = self.state()?;
        state.advance_generation();
        state
            .entries
            .retain(|(_, stored_user_id), _| *stored_user_id != user_id);
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        let mut state = self.state()?;
        state.advance_generation();
        state.entries.clear();
        Ok(())
    }

    async fn stats(&self) -> AppResult<PermissionCacheStats> {
        let mut state = self.state()?;
        state.purge_expired(self.ttl, Instant::now());
        Ok(PermissionCacheStats {
            size: state.entries.len(),
            capacity: self.capacity,
            ttl_seconds: self.ttl.as_secs(),
        })
    }

    async fn entries(&self) -> AppResult<Vec<PermissionCacheEntry>> {
        let mut state = self.state()?;
        let now = Instant::now();
        state.purge_expired(self.ttl, now);

        let mut entries: Vec<_> = state
            .entries
            .iter()
            .map(|((project_id, user_id), entry)| PermissionCacheEntry {
                project_id: *project_id,
                user_id: *user_id,
                allowed: entry.allowed,
                age_ms: u64::try_from(now.duration_since(entry.written_at).as_millis())
                    .unwrap_or(u64::MAX),
            })
            .collect();
        entries.sort_by_key(|entry| entry.age_ms);
        Ok(entries)
    }
}
