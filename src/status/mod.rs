//! Range aggregation over the check log.
//!
//! Derived views only; nothing here is stored or cached.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use thiserror::Error;

use crate::db::{DbError, SiteCheck, SiteStatus, Store, TimeRange};

/// Aggregation error types.
#[derive(Error, Debug)]
pub enum StatusError {
    #[error("site not found")]
    NotFound,
    #[error("store error: {0}")]
    Store(DbError),
}

impl From<DbError> for StatusError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound => StatusError::NotFound,
            other => StatusError::Store(other),
        }
    }
}

/// Computes uptime and latency aggregates over the append-only check
/// log.
pub struct StatusService {
    store: Arc<Store>,
}

impl StatusService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Aggregate status for a site over `range`, defaulting to the
    /// trailing 24 hours. The clock is sampled once per call so the
    /// default window stays consistent across its sub-computations.
    ///
    /// The latest check is unconstrained by the window. A window with
    /// zero checks yields absent uptime and latency, not zero.
    pub fn site_status(
        &self,
        id: &str,
        range: Option<TimeRange>,
    ) -> Result<SiteStatus, StatusError> {
        let site = self.store.get_site(id)?;

        let range = range.unwrap_or_else(|| {
            let now = Utc::now();
            TimeRange::new(now - ChronoDuration::hours(24), now)
        });

        let last_check = self.store.latest_check(id)?;
        let checks = self.store.checks_in_range(id, &range)?;

        let (uptime_percentage, average_response_time_ms) = aggregate(&checks);

        Ok(SiteStatus {
            site,
            last_check,
            uptime_percentage,
            average_response_time_ms,
            checks,
        })
    }

    /// Uptime percentage over `range`, or `None` when the range holds
    /// no checks. An unknown site is an error, not an absence.
    pub fn uptime_percentage(
        &self,
        id: &str,
        range: &TimeRange,
    ) -> Result<Option<f64>, StatusError> {
        self.store.get_site(id)?;
        let checks = self.store.checks_in_range(id, range)?;
        Ok(aggregate(&checks).0)
    }
}

/// Uptime percentage and mean latency for a set of in-range checks.
/// Both absent when the set is empty.
fn aggregate(checks: &[SiteCheck]) -> (Option<f64>, Option<f64>) {
    if checks.is_empty() {
        return (None, None);
    }

    let total = checks.len() as f64;
    let successes = checks.iter().filter(|c| c.success).count() as f64;
    let latency_sum: i64 = checks.iter().map(|c| c.response_time_ms).sum();

    (
        Some(successes / total * 100.0),
        Some(latency_sum as f64 / total),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewSite;
    use chrono::{DateTime, TimeZone};
    use tempfile::NamedTempFile;
    use uuid::Uuid;

    fn setup() -> (Arc<Store>, StatusService, String, NamedTempFile) {
        let tmp = NamedTempFile::new().unwrap();
        let store = Arc::new(Store::new(tmp.path()).unwrap());
        let site = store
            .create_site(NewSite {
                url: "https://example.com".to_string(),
                name: "Example".to_string(),
                active: true,
            })
            .unwrap();
        let service = StatusService::new(store.clone());
        (store, service, site.id, tmp)
    }

    fn check_at(
        site_id: &str,
        timestamp: DateTime<Utc>,
        success: bool,
        response_time_ms: i64,
    ) -> SiteCheck {
        SiteCheck {
            id: Uuid::new_v4().to_string(),
            site_id: site_id.to_string(),
            timestamp,
            status: if success { 200 } else { 503 },
            response_time_ms,
            success,
            error: if success {
                None
            } else {
                Some("Received status code 503".to_string())
            },
        }
    }

    #[test]
    fn test_uptime_matches_manual_count() {
        let (store, service, site_id, _tmp) = setup();

        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        // 3 successes and 1 failure inside the window.
        for (offset, success, latency) in [(0, true, 100), (60, true, 200), (120, false, 50), (180, true, 150)] {
            store
                .append_check(&check_at(
                    &site_id,
                    t0 + ChronoDuration::seconds(offset),
                    success,
                    latency,
                ))
                .unwrap();
        }

        let range = TimeRange::new(t0, t0 + ChronoDuration::seconds(180));
        let status = service.site_status(&site_id, Some(range)).unwrap();

        assert_eq!(status.checks.len(), 4);
        assert_eq!(status.uptime_percentage, Some(75.0));
        assert_eq!(status.average_response_time_ms, Some(125.0));

        let uptime = service.uptime_percentage(&site_id, &range).unwrap();
        assert_eq!(uptime, Some(75.0));
    }

    #[test]
    fn test_empty_range_is_absent_not_zero() {
        let (_store, service, site_id, _tmp) = setup();

        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let range = TimeRange::new(t0, t0 + ChronoDuration::hours(1));

        let status = service.site_status(&site_id, Some(range)).unwrap();
        assert!(status.checks.is_empty());
        assert_eq!(status.uptime_percentage, None);
        assert_eq!(status.average_response_time_ms, None);

        // No data is a valid absence, not an error.
        let uptime = service.uptime_percentage(&site_id, &range).unwrap();
        assert_eq!(uptime, None);
    }

    #[test]
    fn test_unknown_site_is_not_found() {
        let (_store, service, _site_id, _tmp) = setup();

        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let range = TimeRange::new(t0, t0 + ChronoDuration::hours(1));

        assert!(matches!(
            service.site_status("missing", None),
            Err(StatusError::NotFound)
        ));
        assert!(matches!(
            service.uptime_percentage("missing", &range),
            Err(StatusError::NotFound)
        ));
    }

    #[test]
    fn test_last_check_is_independent_of_range() {
        let (store, service, site_id, _tmp) = setup();

        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        store.append_check(&check_at(&site_id, t0, true, 80)).unwrap();

        // Query a window that excludes the only check.
        let range = TimeRange::new(
            t0 + ChronoDuration::hours(1),
            t0 + ChronoDuration::hours(2),
        );
        let status = service.site_status(&site_id, Some(range)).unwrap();

        assert!(status.checks.is_empty());
        assert_eq!(status.uptime_percentage, None);
        let last = status.last_check.expect("latest check is range-independent");
        assert_eq!(last.timestamp, t0);
    }

    #[test]
    fn test_default_window_is_trailing_24_hours() {
        let (store, service, site_id, _tmp) = setup();

        let now = Utc::now();
        store
            .append_check(&check_at(&site_id, now - ChronoDuration::minutes(5), true, 90))
            .unwrap();
        store
            .append_check(&check_at(&site_id, now - ChronoDuration::hours(25), false, 60))
            .unwrap();

        let status = service.site_status(&site_id, None).unwrap();

        // Only the recent check falls inside the default window.
        assert_eq!(status.checks.len(), 1);
        assert_eq!(status.uptime_percentage, Some(100.0));
        assert_eq!(status.average_response_time_ms, Some(90.0));
    }

    #[test]
    fn test_range_endpoints_are_inclusive() {
        let (store, service, site_id, _tmp) = setup();

        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 13, 0, 0).unwrap();
        store.append_check(&check_at(&site_id, t0, true, 10)).unwrap();
        store.append_check(&check_at(&site_id, t1, false, 20)).unwrap();

        let status = service
            .site_status(&site_id, Some(TimeRange::new(t0, t1)))
            .unwrap();

        assert_eq!(status.checks.len(), 2);
        assert_eq!(status.uptime_percentage, Some(50.0));
    }
}
