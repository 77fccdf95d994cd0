//! Memoised health check over storage and the core node.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::HistoryStore;
use crate::stellarcore::CoreInfo;
use crate::Error;

/// Deadline for the storage ping.
pub const DB_PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for the core info query.
pub const CORE_INFO_TIMEOUT: Duration = Duration::from_secs(5);

/// Default lifetime of a cached health response.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub database_connected: bool,
    pub core_up: bool,
    pub core_synced: bool,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.database_connected && self.core_up && self.core_synced
    }
}

#[derive(Debug, Clone, Copy)]
struct Cached {
    response: HealthResponse,
    last_update: DateTime<Utc>,
}

/// Last computed response and when it was computed.
#[derive(Debug)]
pub struct HealthCache {
    ttl: Duration,
    entry: Mutex<Option<Cached>>,
}

impl HealthCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Cache seeded with a response computed at `last_update`.
    pub fn with_response(ttl: Duration, response: HealthResponse, last_update: DateTime<Utc>) -> Self {
        Self {
            ttl,
            entry: Mutex::new(Some(Cached {
                response,
                last_update,
            })),
        }
    }

    /// The cached response if it is still fresh at `now`.
    pub fn get(&self, now: DateTime<Utc>) -> Option<HealthResponse> {
        let entry = *self.entry.lock().unwrap_or_else(PoisonError::into_inner);
        let cached = entry?;
        let fresh = match (now - cached.last_update).to_std() {
            Ok(elapsed) => elapsed < self.ttl,
            // Clock went backwards.
            Err(_) => false,
        };
        fresh.then_some(cached.response)
    }

    pub fn set(&self, response: HealthResponse, now: DateTime<Utc>) {
        *self.entry.lock().unwrap_or_else(PoisonError::into_inner) = Some(Cached {
            response,
            last_update: now,
        });
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.entry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|cached| cached.last_update)
    }
}

/// Health check backing `GET /health`.
pub struct HealthCheck {
    store: Arc<dyn HistoryStore>,
    core: Arc<dyn CoreInfo>,
    cache: HealthCache,
    db_ping_timeout: Duration,
    core_info_timeout: Duration,
}

impl HealthCheck {
    pub fn new(store: Arc<dyn HistoryStore>, core: Arc<dyn CoreInfo>, cache: HealthCache) -> Self {
        Self {
            store,
            core,
            cache,
            db_ping_timeout: DB_PING_TIMEOUT,
            core_info_timeout: CORE_INFO_TIMEOUT,
        }
    }

    /// Override the storage and core deadlines.
    pub fn with_timeouts(mut self, db_ping: Duration, core_info: Duration) -> Self {
        self.db_ping_timeout = db_ping;
        self.core_info_timeout = core_info;
        self
    }

    pub async fn check(&self) -> HealthResponse {
        self.check_at(Utc::now()).await
    }

    /// Serve from the cache while fresh, otherwise check storage and core
    /// concurrently and cache the result. The lock is never held across the
    /// checks, so concurrent callers may each check once.
    pub async fn check_at(&self, now: DateTime<Utc>) -> HealthResponse {
        if let Some(response) = self.cache.get(now) {
            return response;
        }

        let (ping, info) = tokio::join!(
            tokio::time::timeout(self.db_ping_timeout, self.store.ping(self.db_ping_timeout)),
            tokio::time::timeout(self.core_info_timeout, self.core.info())
        );
        let ping = ping.unwrap_or_else(|_| {
            Err(Error::Storage(format!(
                "db ping deadline of {:?} exceeded",
                self.db_ping_timeout
            )))
        });
        let info = info.unwrap_or_else(|_| {
            Err(Error::Internal(format!(
                "core info deadline of {:?} exceeded",
                self.core_info_timeout
            )))
        });

        if let Err(e) = &ping {
            tracing::warn!(error = %e, "could not ping db");
        }
        let (core_up, core_synced) = match info {
            Ok(info) => (true, info.is_synced()),
            Err(e) => {
                tracing::warn!(error = %e, "could not access core info");
                (false, false)
            }
        };

        let response = HealthResponse {
            database_connected: ping.is_ok(),
            core_up,
            core_synced,
        };
        self.cache.set(response, now);
        response
    }
}
