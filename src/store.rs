/// Durable key-value storage and the typed `siteInfo` aggregate layer
use crate::clock::DayKey;
use crate::error::{StoreError, StoreResult};
use crate::site_info::SiteInfo;
use serde_json::Value;

/// Asynchronous key-value store (chrome.storage.local in the extension)
///
/// A missing key is `Ok(None)`, never an error.
#[allow(async_fn_in_trait)]
pub trait Store {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> StoreResult<()>;
}

/// Whether a flush also counts a visit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushKind {
    WithSession,
    TimeOnly,
}

/// Read-modify-write access to the per-day aggregates
pub struct SiteInfoStore<S> {
    inner: S,
    key: String,
}

impl<S: Store> SiteInfoStore<S> {
    pub fn new(inner: S, key: impl Into<String>) -> Self {
        SiteInfoStore {
            inner,
            key: key.into(),
        }
    }

    pub async fn load(&self) -> StoreResult<SiteInfo> {
        match self.inner.get(&self.key).await? {
            Some(Value::Null) | None => Ok(SiteInfo::new()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    async fn save(&self, info: &SiteInfo) -> StoreResult<()> {
        let value = serde_json::to_value(info)?;
        self.inner.set(&self.key, value).await
    }

    /// Add `seconds` to `domain` on `day`, counting a visit for
    /// `FlushKind::WithSession`. Zero seconds is a no-op.
    pub async fn flush(&self, domain: &str, seconds: u64, day: &DayKey, kind: FlushKind) -> StoreResult<()> {
        if seconds == 0 {
            return Ok(());
        }
        let visits = match kind {
            FlushKind::WithSession => 1,
            FlushKind::TimeOnly => 0,
        };
        self.add_visits(domain, day, seconds, visits).await
    }

    /// Add `seconds` and `visits` to `domain` on `day` in a single write
    pub async fn add_visits(&self, domain: &str, day: &DayKey, seconds: u64, visits: u64) -> StoreResult<()> {
        if domain.is_empty() || (seconds == 0 && visits == 0) {
            return Ok(());
        }

        let mut info = self.load().await?;
        let record = info.day_mut(day);
        let total = record.add_time(domain, seconds);
        let sessions = record.add_sessions(domain, visits);
        self.save(&info).await?;

        log::debug!(
            "Updated {} on {}: +{}s (total: {}s, sessions: {})",
            domain,
            day,
            seconds,
            total,
            sessions
        );
        Ok(())
    }

    pub async fn flush_with_session(&self, domain: &str, seconds: u64, day: &DayKey) -> StoreResult<()> {
        self.flush(domain, seconds, day, FlushKind::WithSession).await
    }

    pub async fn flush_time_only(&self, domain: &str, seconds: u64, day: &DayKey) -> StoreResult<()> {
        self.flush(domain, seconds, day, FlushKind::TimeOnly).await
    }

    /// Count a visit whose time was already committed by time-only flushes
    pub async fn record_visit(&self, domain: &str, day: &DayKey) -> StoreResult<()> {
        self.add_visits(domain, day, 0, 1).await
    }

    /// Seconds already committed for `domain` on `day`
    pub async fn domain_time(&self, domain: &str, day: &DayKey) -> StoreResult<u64> {
        Ok(self.load().await?.time_for(day, domain))
    }
}
