//! Configuration module for SiteWatch.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the web server (default: 8080)
    pub http_port: u16,
    /// Path to the SQLite database file (default: "sitewatch.db")
    pub db_path: String,
    /// Total timeout for a single probe, in milliseconds (default: 5000)
    pub probe_timeout_ms: u64,
    /// Seconds between scheduled sweeps (default: 300)
    pub sweep_interval_secs: u64,
    /// Cap on simultaneous in-flight probes during a sweep (default: 16)
    pub max_concurrent_probes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            db_path: "sitewatch.db".to_string(),
            probe_timeout_ms: 5000,
            sweep_interval_secs: 300,
            max_concurrent_probes: 16,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SITEWATCH_HTTP_PORT`: HTTP port (default: 8080)
    /// - `SITEWATCH_DB_PATH`: Database file path (default: "sitewatch.db")
    /// - `SITEWATCH_PROBE_TIMEOUT_MS`: Probe timeout (default: 5000)
    /// - `SITEWATCH_SWEEP_INTERVAL_SECS`: Sweep cadence (default: 300)
    /// - `SITEWATCH_MAX_CONCURRENT_PROBES`: Probe pool size (default: 16)
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Ok(port_str) = env::var("SITEWATCH_HTTP_PORT") {
            if let Ok(port) = port_str.parse() {
                cfg.http_port = port;
            }
        }

        if let Ok(db_path) = env::var("SITEWATCH_DB_PATH") {
            cfg.db_path = db_path;
        }

        if let Ok(timeout_str) = env::var("SITEWATCH_PROBE_TIMEOUT_MS") {
            if let Ok(timeout) = timeout_str.parse() {
                cfg.probe_timeout_ms = timeout;
            }
        }

        if let Ok(interval_str) = env::var("SITEWATCH_SWEEP_INTERVAL_SECS") {
            if let Ok(interval) = interval_str.parse() {
                cfg.sweep_interval_secs = interval;
            }
        }

        if let Ok(pool_str) = env::var("SITEWATCH_MAX_CONCURRENT_PROBES") {
            if let Ok(pool) = pool_str.parse::<usize>() {
                if pool > 0 {
                    cfg.max_concurrent_probes = pool;
                }
            }
        }

        cfg
    }
}
