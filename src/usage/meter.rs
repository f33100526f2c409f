//! Quota checks and usage recording

use super::{MemoryUsageStore, RestUsageStore, Tier, UsageRecord, UsageStatus, UsageStore};
use crate::config::UsageSettings;
use crate::error::{InsightError, Result};
use crate::network::HttpClient;
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Daily limits per tier; None means unlimited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    pub free: Option<u32>,
    pub pro: Option<u32>,
    pub enterprise: Option<u32>,
}

impl Default for TierLimits {
    fn default() -> Self {
        Self::from_settings(&UsageSettings::default())
    }
}

impl TierLimits {
    pub fn from_settings(settings: &UsageSettings) -> Self {
        Self {
            free: Some(settings.free_daily_limit),
            pro: Some(settings.pro_daily_limit),
            enterprise: settings.enterprise_daily_limit,
        }
    }

    pub fn limit(&self, tier: Tier) -> Option<u32> {
        match tier {
            Tier::Free => self.free,
            Tier::Pro => self.pro,
            Tier::Enterprise => self.enterprise,
        }
    }
}

/// Gate and count insight searches per user and day
pub struct UsageMeter {
    store: Arc<dyn UsageStore>,
    limits: TierLimits,
    enabled: bool,
    /// Serializes load-increment-save so concurrent records are not lost
    write_lock: Mutex<()>,
}

impl UsageMeter {
    pub fn new(store: Arc<dyn UsageStore>, limits: TierLimits) -> Self {
        Self {
            store,
            limits,
            enabled: true,
            write_lock: Mutex::new(()),
        }
    }

    /// Meter that never blocks and stores nothing
    pub fn disabled() -> Self {
        Self {
            store: Arc::new(MemoryUsageStore::new()),
            limits: TierLimits::default(),
            enabled: false,
            write_lock: Mutex::new(()),
        }
    }

    /// Build a meter on the configured store, in memory when no URL is set
    pub fn from_settings(settings: &UsageSettings, client: &HttpClient) -> Self {
        if !settings.enabled {
            info!("Usage metering disabled");
            return Self::disabled();
        }

        let limits = TierLimits::from_settings(settings);
        let store: Arc<dyn UsageStore> = match settings.store_url {
            Some(ref url) => {
                info!("Usage counters stored at {}", url);
                Arc::new(RestUsageStore::new(
                    client.clone(),
                    url.clone(),
                    settings.store_api_key.clone().unwrap_or_default(),
                    settings.table.clone(),
                ))
            }
            None => {
                info!("Usage counters kept in memory");
                Arc::new(MemoryUsageStore::new())
            }
        };

        Self::new(store, limits)
    }

    /// Current position without enforcing the limit
    pub async fn status(&self, user_id: &str, today: NaiveDate) -> Result<UsageStatus> {
        if !self.enabled {
            return Ok(unmetered());
        }
        let record = self.current(user_id, today).await?;
        Ok(self.status_of(&record))
    }

    /// Fail with `QuotaExceeded` when the user has no searches left today
    pub async fn check(&self, user_id: &str, today: NaiveDate) -> Result<UsageStatus> {
        self.check_capacity(user_id, today, 1).await
    }

    /// Fail with `QuotaExceeded` unless `searches` more fit in today's limit
    pub async fn check_capacity(
        &self,
        user_id: &str,
        today: NaiveDate,
        searches: u32,
    ) -> Result<UsageStatus> {
        let status = self.status(user_id, today).await?;

        if let Some(limit) = status.limit {
            if status.used.saturating_add(searches) > limit {
                info!(
                    user_id,
                    tier = status.tier.as_str(),
                    requested = searches,
                    "Daily quota exhausted"
                );
                return Err(InsightError::QuotaExceeded {
                    tier: status.tier.as_str().to_string(),
                    limit,
                });
            }
        }

        Ok(status)
    }

    /// Count one completed search
    pub async fn record(&self, user_id: &str, today: NaiveDate) -> Result<UsageStatus> {
        self.record_many(user_id, today, 1).await
    }

    /// Count `searches` completed searches in one store write
    pub async fn record_many(
        &self,
        user_id: &str,
        today: NaiveDate,
        searches: u32,
    ) -> Result<UsageStatus> {
        if !self.enabled {
            return Ok(unmetered());
        }

        let _write = self.write_lock.lock().await;
        let mut record = self.current(user_id, today).await?;
        record.count = record.count.saturating_add(searches);
        self.store.save(&record).await?;

        debug!(user_id, count = record.count, "Recorded usage");
        Ok(self.status_of(&record))
    }

    async fn current(&self, user_id: &str, today: NaiveDate) -> Result<UsageRecord> {
        let mut record = self
            .store
            .load(user_id)
            .await?
            .unwrap_or_else(|| UsageRecord::new(user_id, today));
        record.roll_over(today);
        Ok(record)
    }

    fn status_of(&self, record: &UsageRecord) -> UsageStatus {
        UsageStatus::new(record.tier, record.count, self.limits.limit(record.tier))
    }
}

fn unmetered() -> UsageStatus {
    UsageStatus::new(Tier::Free, 0, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn meter(store: Arc<MemoryUsageStore>) -> UsageMeter {
        UsageMeter::new(
            store,
            TierLimits {
                free: Some(2),
                pro: Some(100),
                enterprise: None,
            },
        )
    }

    #[tokio::test]
    async fn test_new_user_starts_on_free() {
        let meter = meter(Arc::new(MemoryUsageStore::new()));
        let status = assert_ok!(meter.check("new-user", day(1)).await);
        assert_eq!(status.tier, Tier::Free);
        assert_eq!(status.used, 0);
        assert_eq!(status.remaining, Some(2));
    }

    #[tokio::test]
    async fn test_quota_exceeded_after_limit() {
        let meter = meter(Arc::new(MemoryUsageStore::new()));

        meter.record("u1", day(1)).await.unwrap();
        let status = meter.record("u1", day(1)).await.unwrap();
        assert!(status.is_exhausted());

        let err = assert_err!(meter.check("u1", day(1)).await);
        assert!(matches!(
            err,
            InsightError::QuotaExceeded { ref tier, limit: 2 } if tier == "free"
        ));
    }

    #[tokio::test]
    async fn test_new_day_resets_count() {
        let store = Arc::new(MemoryUsageStore::new());
        let meter = meter(store.clone());

        meter.record("u1", day(1)).await.unwrap();
        meter.record("u1", day(1)).await.unwrap();
        assert_err!(meter.check("u1", day(1)).await);

        let status = meter.check("u1", day(2)).await.unwrap();
        assert_eq!(status.used, 0);

        let status = meter.record("u1", day(2)).await.unwrap();
        assert_eq!(status.used, 1);
        assert_eq!(store.load("u1").await.unwrap().unwrap().period, day(2));
    }

    #[tokio::test]
    async fn test_enterprise_is_unlimited() {
        let store = Arc::new(MemoryUsageStore::new());
        let mut record = UsageRecord::new("big-co", day(1));
        record.tier = Tier::Enterprise;
        record.count = 10_000;
        store.save(&record).await.unwrap();

        let status = meter(store).check("big-co", day(1)).await.unwrap();
        assert_eq!(status.limit, None);
        assert_eq!(status.used, 10_000);
    }

    #[tokio::test]
    async fn test_check_does_not_consume_quota() {
        let meter = meter(Arc::new(MemoryUsageStore::new()));
        for _ in 0..5 {
            assert_ok!(meter.check("u1", day(1)).await);
        }
        assert_eq!(meter.status("u1", day(1)).await.unwrap().used, 0);
    }

    #[tokio::test]
    async fn test_disabled_meter_never_blocks() {
        let meter = UsageMeter::disabled();
        for _ in 0..10 {
            meter.record("u1", day(1)).await.unwrap();
        }
        let status = meter.check("u1", day(1)).await.unwrap();
        assert_eq!(status.limit, None);
        assert_eq!(status.used, 0);
    }

    #[test]
    fn test_limits_from_settings() {
        let limits = TierLimits::from_settings(&UsageSettings::default());
        assert_eq!(limits.limit(Tier::Free), Some(5));
        assert_eq!(limits.limit(Tier::Pro), Some(100));
        assert_eq!(limits.limit(Tier::Enterprise), None);
    }

    #[tokio::test]
    async fn test_capacity_counts_requested_searches() {
        let meter = meter(Arc::new(MemoryUsageStore::new()));
        meter.record("u1", day(1)).await.unwrap();

        assert_ok!(meter.check_capacity("u1", day(1), 1).await);
        let err = assert_err!(meter.check_capacity("u1", day(1), 2).await);
        assert!(matches!(err, InsightError::QuotaExceeded { limit: 2, .. }));
    }

    #[tokio::test]
    async fn test_concurrent_records_are_not_lost() {
        let store = Arc::new(MemoryUsageStore::new());
        let meter = UsageMeter::new(store, TierLimits::default());

        let records = (0..8).map(|_| meter.record("u1", day(1)));
        futures::future::join_all(records).await;

        assert_eq!(meter.status("u1", day(1)).await.unwrap().used, 8);
    }

    #[tokio::test]
    async fn test_record_many() {
        let meter = meter(Arc::new(MemoryUsageStore::new()));
        let status = meter.record_many("u1", day(1), 2).await.unwrap();
        assert_eq!(status.used, 2);
        assert!(status.is_exhausted());
    }
}
