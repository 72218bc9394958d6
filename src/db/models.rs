//! Database model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A monitored endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub url: String,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a site. The store assigns id and timestamps.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSite {
    pub url: String,
    pub name: String,
    pub active: bool,
}

/// Partial update for a site. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteUpdate {
    pub url: Option<String>,
    pub name: Option<String>,
    pub active: Option<bool>,
}

/// The immutable outcome of one availability probe.
///
/// `status` is 0 when no response was obtained at all (timeout, DNS,
/// connection or TLS failure); `error` is populated for every
/// unsuccessful check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteCheck {
    pub id: String,
    pub site_id: String,
    /// Probe start instant.
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    pub response_time_ms: i64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A closed timestamp interval, inclusive on both ends.
///
/// Callers must ensure `start <= end`; queries do not reorder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

/// Derived health view for a site. Recomputed on every query.
///
/// `uptime_percentage` and `average_response_time_ms` are absent, not
/// zero, when the window holds no checks.
#[derive(Debug, Clone, Serialize)]
pub struct SiteStatus {
    pub site: Site,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_check: Option<SiteCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_response_time_ms: Option<f64>,
    pub checks: Vec<SiteCheck>,
}
