//! HTTP availability probe.
//!
//! Issues exactly one outbound request per call and classifies the
//! outcome. Transport faults are not errors here; they are recorded
//! check outcomes.

use std::time::{Duration, Instant};

use chrono::Utc;
use uuid::Uuid;

use crate::db::{Site, SiteCheck};

/// Classify an HTTP status code. Success is exactly the 2xx range.
pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Executes availability probes with a fixed total timeout.
#[derive(Debug, Clone)]
pub struct Prober {
    timeout: Duration,
}

impl Prober {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Probe a site once and classify the result.
    ///
    /// Every received status code is captured as-is. Timeouts, DNS
    /// failures, refused connections and TLS faults yield status 0
    /// with the fault's message. Latency is wall-clock from request
    /// start to terminal outcome, in whole milliseconds.
    pub async fn probe(&self, site: &Site) -> SiteCheck {
        tracing::debug!("Checking site: {} ({})", site.name, site.url);

        let started_at = Utc::now();
        let timer = Instant::now();

        let (status, success, error) = match self.request(&site.url).await {
            Ok(status) => {
                let success = is_success_status(status);
                let error = if success {
                    None
                } else {
                    Some(format!("Received status code {}", status))
                };
                (status, success, error)
            }
            Err(message) => (0, false, Some(message)),
        };

        let response_time_ms = timer.elapsed().as_millis() as i64;

        let check = SiteCheck {
            id: Uuid::new_v4().to_string(),
            site_id: site.id.clone(),
            timestamp: started_at,
            status,
            response_time_ms,
            success,
            error,
        };

        tracing::info!(
            "Check completed for {}: status {}, response time {}ms, success {}",
            site.url,
            check.status,
            check.response_time_ms,
            check.success
        );

        check
    }

    /// Issue the single outbound request and return the observed
    /// status code, or the transport fault's message.
    async fn request(&self, address: &str) -> Result<u16, String> {
        let url = if address.starts_with("http://") || address.starts_with("https://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        };

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| e.to_string())?;

        let response = client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                format!("probe timed out after {:?}", self.timeout)
            } else {
                e.to_string()
            }
        })?;

        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use std::net::SocketAddr;

    fn site(url: &str) -> Site {
        Site {
            id: "site-1".to_string(),
            url: url.to_string(),
            name: "Test".to_string(),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn spawn_server(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    #[test]
    fn test_status_classification() {
        for status in 100u16..=599 {
            let expected = (200..300).contains(&status);
            assert_eq!(is_success_status(status), expected, "status {}", status);
        }
    }

    #[tokio::test]
    async fn test_probe_success() {
        let addr = spawn_server(Router::new().route("/", get(|| async { "ok" }))).await;

        let prober = Prober::new(Duration::from_secs(5));
        let check = prober.probe(&site(&format!("http://{}", addr))).await;

        assert_eq!(check.status, 200);
        assert!(check.success);
        assert!(check.error.is_none());
        assert_eq!(check.site_id, "site-1");
        assert!(check.response_time_ms >= 0);
    }

    #[tokio::test]
    async fn test_probe_non_2xx_is_failure() {
        let addr = spawn_server(
            Router::new().route("/", get(|| async { StatusCode::SERVICE_UNAVAILABLE })),
        )
        .await;

        let prober = Prober::new(Duration::from_secs(5));
        let check = prober.probe(&site(&format!("http://{}", addr))).await;

        assert_eq!(check.status, 503);
        assert!(!check.success);
        assert_eq!(check.error.as_deref(), Some("Received status code 503"));
    }

    #[tokio::test]
    async fn test_probe_connection_refused() {
        // Bind and drop to get a port with no listener.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let prober = Prober::new(Duration::from_millis(1000));
        let check = prober.probe(&site(&format!("http://{}", addr))).await;

        assert_eq!(check.status, 0);
        assert!(!check.success);
        let message = check.error.expect("transport fault must carry a message");
        assert!(!message.is_empty());
    }

    #[tokio::test]
    async fn test_probe_timeout_is_bounded() {
        let addr = spawn_server(Router::new().route(
            "/",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        ))
        .await;

        let prober = Prober::new(Duration::from_millis(300));
        let timer = Instant::now();
        let check = prober.probe(&site(&format!("http://{}", addr))).await;
        let elapsed = timer.elapsed();

        assert_eq!(check.status, 0);
        assert!(!check.success);
        assert!(check.error.is_some());
        // Terminal well before the remote would have answered.
        assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_probe_defaults_to_http_scheme() {
        let addr = spawn_server(Router::new().route("/", get(|| async { "ok" }))).await;

        let prober = Prober::new(Duration::from_secs(5));
        let check = prober.probe(&site(&addr.to_string())).await;

        assert_eq!(check.status, 200);
        assert!(check.success);
    }
}
