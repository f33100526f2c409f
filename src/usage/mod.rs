//! Per-user daily quotas by subscription tier
//!
//! Counters live in an external store; the meter only reads, resets and
//! increments them.

mod meter;
mod store;

pub use meter::{TierLimits, UsageMeter};
pub use store::{MemoryUsageStore, RestUsageStore, UsageStore};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Subscription tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Pro,
    Enterprise,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
            Tier::Enterprise => "enterprise",
        }
    }
}

/// Stored usage row, one per user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub user_id: String,
    #[serde(default)]
    pub tier: Tier,
    /// Searches performed during `period`
    #[serde(default)]
    pub count: u32,
    /// Day the count belongs to (UTC)
    pub period: NaiveDate,
}

impl UsageRecord {
    /// Fresh free-tier record
    pub fn new(user_id: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            tier: Tier::Free,
            count: 0,
            period: today,
        }
    }

    /// Zero the count when the stored period is not `today`
    pub fn roll_over(&mut self, today: NaiveDate) {
        if self.period != today {
            self.count = 0;
            self.period = today;
        }
    }
}

/// Quota position reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStatus {
    pub tier: Tier,
    pub used: u32,
    /// None when the tier is unlimited
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
}

impl UsageStatus {
    fn new(tier: Tier, used: u32, limit: Option<u32>) -> Self {
        Self {
            tier,
            used,
            limit,
            remaining: limit.map(|l| l.saturating_sub(used)),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_roll_over_resets_stale_count() {
        let mut record = UsageRecord::new("u1", day(1));
        record.count = 4;

        record.roll_over(day(1));
        assert_eq!(record.count, 4);

        record.roll_over(day(2));
        assert_eq!(record.count, 0);
        assert_eq!(record.period, day(2));
    }

    #[test]
    fn test_status_remaining() {
        assert_eq!(UsageStatus::new(Tier::Free, 3, Some(5)).remaining, Some(2));
        assert!(UsageStatus::new(Tier::Free, 7, Some(5)).is_exhausted());
        assert_eq!(UsageStatus::new(Tier::Enterprise, 900, None).remaining, None);
    }

    #[test]
    fn test_record_serialization() {
        let record: UsageRecord = serde_json::from_str(
            r#"{"user_id": "u1", "tier": "pro", "count": 2, "period": "2024-05-01"}"#,
        )
        .unwrap();
        assert_eq!(record.tier, Tier::Pro);
        assert_eq!(record.period, day(1));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["tier"], "pro");
        assert_eq!(json["period"], "2024-05-01");
    }
}
