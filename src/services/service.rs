// Uniform lifecycle around each external data source.
//
// Every source - JSON API or scraped markup - is wrapped in the same
// load-once / fetch / bookkeeping shell so that the aggregation layer can
// treat them as interchangeable, independently-failing tasks.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service never loaded and the lazy retry failed too.
    #[error("{0} is not loaded")]
    NotLoaded(&'static str),
    /// The transport gave up waiting.
    #[error("request timed out: {0:#}")]
    Timeout(anyhow::Error),
    /// Anything else the fetch reported.
    #[error("{0:#}")]
    Fetch(anyhow::Error),
}

/// A human-followable URL attached to failures.
///
/// The wrapper resets it to the service's default before every fetch; a fetch
/// that learns a more specific page (e.g. the exact shop product) updates it
/// mid-flight so that a later failure still points somewhere useful.
#[derive(Debug, Default)]
pub struct Locator {
    url: Mutex<Option<String>>,
}

impl Locator {
    pub fn set(&self, url: impl Into<String>) {
        *self.url.lock().unwrap() = Some(url.into());
    }

    pub fn get(&self) -> Option<String> {
        self.url.lock().unwrap().clone()
    }
}

/// One external data source.
#[async_trait]
pub trait Service: Send + Sync {
    /// What the service is queried with.
    type Query: Sync;
    /// Structured payload returned on a hit.
    type Payload: Serialize + Send;

    fn name(&self) -> &'static str;

    /// Default error locator for a query.
    fn fallback_url(&self, query: &Self::Query) -> String;

    /// One-time setup (resolving endpoints, downloading lookup tables).
    async fn load(&self) -> Result<()> {
        Ok(())
    }

    /// Single query against the source. `Ok(None)` means the source has no
    /// data for this subject - an absence, not an error.
    async fn fetch(&self, query: &Self::Query, locator: &Locator) -> Result<Option<Self::Payload>>;
}

#[derive(Debug, Default)]
struct Stats {
    load_time: Option<Duration>,
    speed_history: Vec<Duration>,
    timeout_count: u64,
    error_count: u64,
}

/// Snapshot of one service's diagnostics.
#[derive(Debug, Clone)]
pub struct ServiceStats {
    pub name: &'static str,
    pub load_time: Option<Duration>,
    pub speed_history: Vec<Duration>,
    pub timeout_count: u64,
    pub error_count: u64,
}

/// The instrumented shell around a [`Service`].
pub struct Instrumented<S> {
    service: S,
    run_lock: tokio::sync::Mutex<()>,
    load_lock: tokio::sync::Mutex<()>,
    locator: Locator,
    stats: Mutex<Stats>,
}

impl<S: Service> Instrumented<S> {
    pub fn new(service: S) -> Self {
        tracing::debug!(service = service.name(), "initialized");
        Self {
            service,
            run_lock: tokio::sync::Mutex::new(()),
            load_lock: tokio::sync::Mutex::new(()),
            locator: Locator::default(),
            stats: Mutex::new(Stats::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.service.name()
    }

    /// Access to source-specific extras (name lookup, wishlist, ...).
    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn is_loaded(&self) -> bool {
        self.stats.lock().unwrap().load_time.is_some()
    }

    /// Load the service and record how long it took. A second call once
    /// loaded is a no-op.
    pub async fn load(&self) -> Result<(), ServiceError> {
        let _guard = self.load_lock.lock().await;
        if self.is_loaded() {
            return Ok(());
        }

        tracing::debug!(service = self.name(), "loading");
        let started = Instant::now();
        self.service.load().await.map_err(ServiceError::Fetch)?;
        let elapsed = started.elapsed();

        self.stats.lock().unwrap().load_time = Some(elapsed);
        tracing::debug!(service = self.name(), ?elapsed, "loaded");
        Ok(())
    }

    /// Retry `load()` once if it never succeeded. If that also fails the
    /// dependent call must not proceed.
    pub async fn ensure_loaded(&self) -> Result<(), ServiceError> {
        if self.is_loaded() {
            return Ok(());
        }
        if let Err(err) = self.load().await {
            tracing::warn!(service = self.name(), %err, "lazy load failed");
            return Err(ServiceError::NotLoaded(self.name()));
        }
        Ok(())
    }

    /// Run one fetch as an independently-awaitable task.
    ///
    /// At most one invocation per service executes at a time; concurrent
    /// callers queue on the per-service lock. Timing and failure counters are
    /// recorded uniformly here, and errors re-raise - they are tallied, never
    /// swallowed.
    pub async fn run_task(&self, query: &S::Query) -> Result<Option<S::Payload>, ServiceError> {
        self.ensure_loaded().await?;

        let _guard = self.run_lock.lock().await;
        self.locator.set(self.service.fallback_url(query));

        tracing::debug!(service = self.name(), "starting task");
        let started = Instant::now();
        let result = self.service.fetch(query, &self.locator).await;
        let elapsed = started.elapsed();

        let mut stats = self.stats.lock().unwrap();
        match result {
            Ok(payload) => {
                stats.speed_history.push(elapsed);
                tracing::debug!(service = self.name(), ?elapsed, "task finished");
                Ok(payload)
            }
            Err(err) if is_timeout(&err) => {
                stats.timeout_count += 1;
                tracing::error!(service = self.name(), "task timed out: {err:#}");
                Err(ServiceError::Timeout(err))
            }
            Err(err) => {
                stats.error_count += 1;
                tracing::error!(service = self.name(), "task failed: {err:#}");
                Err(ServiceError::Fetch(err))
            }
        }
    }

    /// Locator recorded during the last run, or the service default.
    pub fn error_url(&self, query: &S::Query) -> String {
        self.locator
            .get()
            .unwrap_or_else(|| self.service.fallback_url(query))
    }

    pub fn stats(&self) -> ServiceStats {
        let stats = self.stats.lock().unwrap();
        ServiceStats {
            name: self.service.name(),
            load_time: stats.load_time,
            speed_history: stats.speed_history.clone(),
            timeout_count: stats.timeout_count,
            error_count: stats.error_count,
        }
    }
}

fn is_timeout(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(req) = cause.downcast_ref::<reqwest::Error>() {
            return req.is_timeout();
        }
        cause.downcast_ref::<tokio::time::error::Elapsed>().is_some()
    })
}
