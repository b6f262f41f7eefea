use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info};

use crate::error::FetchError;
use crate::http_client::{RawResponse, Transport};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    stored_at: Instant,
    ttl: Duration,
}

/// Process-wide memo of provider responses, keyed by endpoint + parameters.
#[derive(Debug, Default)]
pub struct TtlCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached<F>(&self, key: &str, ttl_secs: u64, supplier: F) -> Result<Value, FetchError>
    where
        F: FnOnce() -> Result<Value, FetchError>,
    {
        self.cached_at(key, ttl_secs, Instant::now(), supplier)
    }

    pub fn cached_at<F>(
        &self,
        key: &str,
        ttl_secs: u64,
        now: Instant,
        supplier: F,
    ) -> Result<Value, FetchError>
    where
        F: FnOnce() -> Result<Value, FetchError>,
    {
        if let Some(value) = self.lookup(key, now) {
            debug!(key, "cache hit");
            return Ok(value);
        }
        debug!(key, "cache miss");
        // Lock is released while the supplier runs; identical keys racing
        // inside one ttl window resolve last-writer-wins.
        let value = supplier()?;
        let mut guard = self.entries.lock().expect("ttl cache lock poisoned");
        guard.insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                stored_at: now,
                ttl: Duration::from_secs(ttl_secs),
            },
        );
        Ok(value)
    }

    fn lookup(&self, key: &str, now: Instant) -> Option<Value> {
        let guard = self.entries.lock().expect("ttl cache lock poisoned");
        let entry = guard.get(key)?;
        let age = now.saturating_duration_since(entry.stored_at);
        (age < entry.ttl).then(|| entry.value.clone())
    }

    /// Drops every key containing `pattern`; `None` clears everything.
    pub fn clear(&self, pattern: Option<&str>) {
        let mut guard = self.entries.lock().expect("ttl cache lock poisoned");
        match pattern {
            Some(pattern) => guard.retain(|key, _| !key.contains(pattern)),
            None => guard.clear(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("ttl cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owns one provider's outbound slot. The slot mutex is held across the
/// wait and the send, so calls through one client never overlap and are
/// spaced by at least `min_delay`.
pub struct RateLimitedClient {
    provider: &'static str,
    transport: Arc<dyn Transport>,
    min_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimitedClient {
    pub fn new(provider: &'static str, transport: Arc<dyn Transport>, min_delay: Duration) -> Self {
        Self {
            provider,
            transport,
            min_delay,
            last_request: Mutex::new(None),
        }
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    pub fn fetch(&self, url: &str, headers: &[(&str, &str)]) -> Result<RawResponse, FetchError> {
        self.gated(|transport| transport.get(url, headers))
    }

    pub fn fetch_json(&self, url: &str, headers: &[(&str, &str)]) -> Result<Value, FetchError> {
        self.fetch(url, headers)?.json(self.provider)
    }

    pub fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<RawResponse, FetchError> {
        self.gated(|transport| transport.post_json(url, headers, body))
    }

    fn gated<F>(&self, send: F) -> Result<RawResponse, FetchError>
    where
        F: FnOnce(&dyn Transport) -> Result<RawResponse, String>,
    {
        let mut slot = self
            .last_request
            .lock()
            .expect("rate limiter lock poisoned");
        let wait = match *slot {
            Some(last) => self.min_delay.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        };
        if !wait.is_zero() {
            info!(provider = self.provider, waited_ms = wait.as_millis() as u64, "rate limit wait");
            thread::sleep(wait);
        }
        *slot = Some(Instant::now());
        let result = send(self.transport.as_ref());
        drop(slot);

        let resp = result.map_err(|message| FetchError::Transport {
            provider: self.provider,
            message,
        })?;
        resp.into_checked(self.provider)
    }
}
