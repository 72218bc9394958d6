//! SQLite database store implementation.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

use super::models::*;

/// Database error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Not found")]
    NotFound,
}

/// Thread-safe database store.
///
/// Sites are plain key-value rows; checks are append-only and queried
/// by site and time range.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Create a new store with the given database path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init()?;
        Ok(store)
    }

    /// Initialize the database with migrations.
    fn init(&self) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(include_str!("../../migrations/000001_init.up.sql"))
            .map_err(|e| DbError::Migration(format!("Migration 1 failed: {}", e)))?;

        Ok(())
    }

    // --- Site CRUD ---

    /// Create a site, assigning its id and timestamps.
    pub fn create_site(&self, new: NewSite) -> Result<Site, DbError> {
        let now = Utc::now();
        let site = Site {
            id: Uuid::new_v4().to_string(),
            url: new.url,
            name: new.name,
            active: new.active,
            created_at: now,
            updated_at: now,
        };

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO sites (id, url, name, active, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                site.id,
                site.url,
                site.name,
                site.active,
                format_db_time(site.created_at),
                format_db_time(site.updated_at),
            ],
        )?;
        Ok(site)
    }

    /// Get a site by id.
    pub fn get_site(&self, id: &str) -> Result<Site, DbError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, url, name, active, created_at, updated_at FROM sites WHERE id = ?1",
            params![id],
            site_from_row,
        )
        .map_err(not_found_or_sqlite)
    }

    /// Apply a partial update to a site and return the new row.
    pub fn update_site(&self, id: &str, update: SiteUpdate) -> Result<Site, DbError> {
        let mut site = self.get_site(id)?;

        if let Some(url) = update.url {
            site.url = url;
        }
        if let Some(name) = update.name {
            site.name = name;
        }
        if let Some(active) = update.active {
            site.active = active;
        }
        site.updated_at = Utc::now();

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE sites SET url=?1, name=?2, active=?3, updated_at=?4 WHERE id=?5",
            params![
                site.url,
                site.name,
                site.active,
                format_db_time(site.updated_at),
                site.id,
            ],
        )?;
        Ok(site)
    }

    /// Delete a site and its checks.
    pub fn delete_site(&self, id: &str) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM checks WHERE site_id = ?1", params![id])?;
        let deleted = conn.execute("DELETE FROM sites WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    /// Get all sites.
    pub fn list_sites(&self) -> Result<Vec<Site>, DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, url, name, active, created_at, updated_at FROM sites")?;

        let sites = stmt
            .query_map([], site_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(sites)
    }

    // --- Check log ---

    /// Append a check to the log. Checks are never updated or deleted
    /// individually.
    pub fn append_check(&self, check: &SiteCheck) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO checks (id, site_id, timestamp, status, response_time_ms, success, error) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                check.id,
                check.site_id,
                format_db_time(check.timestamp),
                check.status as i64,
                check.response_time_ms,
                check.success,
                check.error,
            ],
        )?;
        Ok(())
    }

    /// Get checks for a site within a time range, inclusive on both
    /// ends, in ascending timestamp order.
    pub fn checks_in_range(
        &self,
        site_id: &str,
        range: &TimeRange,
    ) -> Result<Vec<SiteCheck>, DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, site_id, timestamp, status, response_time_ms, success, error FROM checks
             WHERE site_id = ?1 AND timestamp >= ?2 AND timestamp <= ?3 ORDER BY timestamp ASC",
        )?;

        let checks = stmt
            .query_map(
                params![
                    site_id,
                    format_db_time(range.start),
                    format_db_time(range.end),
                ],
                check_from_row,
            )?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(checks)
    }

    /// Get the most recent checks for a site, newest first.
    pub fn latest_checks(&self, site_id: &str, limit: u32) -> Result<Vec<SiteCheck>, DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, site_id, timestamp, status, response_time_ms, success, error FROM checks
             WHERE site_id = ?1 ORDER BY timestamp DESC LIMIT ?2",
        )?;

        let checks = stmt
            .query_map(params![site_id, limit], check_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(checks)
    }

    /// Get the single most recent check for a site, if any.
    pub fn latest_check(&self, site_id: &str) -> Result<Option<SiteCheck>, DbError> {
        let conn = self.conn.lock().unwrap();
        let check = conn
            .query_row(
                "SELECT id, site_id, timestamp, status, response_time_ms, success, error FROM checks
                 WHERE site_id = ?1 ORDER BY timestamp DESC LIMIT 1",
                params![site_id],
                check_from_row,
            )
            .optional()?;
        Ok(check)
    }
}

fn site_from_row(row: &rusqlite::Row<'_>) -> SqlResult<Site> {
    let created_str: String = row.get(4)?;
    let updated_str: String = row.get(5)?;
    Ok(Site {
        id: row.get(0)?,
        url: row.get(1)?,
        name: row.get(2)?,
        active: row.get(3)?,
        created_at: parse_db_time(&created_str).unwrap_or_else(Utc::now),
        updated_at: parse_db_time(&updated_str).unwrap_or_else(Utc::now),
    })
}

fn check_from_row(row: &rusqlite::Row<'_>) -> SqlResult<SiteCheck> {
    let time_str: String = row.get(2)?;
    let status: i64 = row.get(3)?;
    Ok(SiteCheck {
        id: row.get(0)?,
        site_id: row.get(1)?,
        timestamp: parse_db_time(&time_str).unwrap_or_else(Utc::now),
        status: status as u16,
        response_time_ms: row.get(4)?,
        success: row.get(5)?,
        error: row.get(6)?,
    })
}

fn not_found_or_sqlite(e: rusqlite::Error) -> DbError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound,
        other => DbError::Sqlite(other),
    }
}

/// Format a datetime for storage. Fixed-width fractional seconds keep
/// lexicographic order equal to chronological order.
fn format_db_time(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Parse a datetime string from the database.
fn parse_db_time(s: &str) -> Option<DateTime<Utc>> {
    // Try various formats
    let formats = [
        "%Y-%m-%d %H:%M:%S%.6f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];

    for fmt in &formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    // Try ISO 8601
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    None
}
