//! Content loading and load-outcome classification.

use std::fmt;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use crate::browser::BrowserSession;

/// Status reported for successful loads that produced no HTTP response.
pub const SYNTHETIC_OK: u16 = 200;

/// Result of putting content into the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(u16),
    TransportError(TransportCause),
    HttpError(u16),
}

/// Why the target could not be reached. Each variant keeps the engine's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCause {
    DnsResolution(String),
    Connection(String),
    Certificate(String),
    Timeout(String),
    Other(String),
}

impl TransportCause {
    /// Classifies engine error text by Chromium's `net::ERR_*` codes.
    pub fn classify(message: &str) -> Self {
        let detail = message.to_string();
        let upper = message.to_ascii_uppercase();

        if upper.contains("ERR_NAME_NOT_RESOLVED") || upper.contains("ERR_NAME_RESOLUTION_FAILED")
        {
            TransportCause::DnsResolution(detail)
        } else if upper.contains("ERR_CERT_") || upper.contains("ERR_SSL_") {
            TransportCause::Certificate(detail)
        } else if upper.contains("TIMED_OUT") || upper.contains("TIMEOUT") {
            TransportCause::Timeout(detail)
        } else if upper.contains("ERR_CONNECTION_")
            || upper.contains("ERR_ADDRESS_UNREACHABLE")
            || upper.contains("ERR_INTERNET_DISCONNECTED")
            || upper.contains("ERR_EMPTY_RESPONSE")
        {
            TransportCause::Connection(detail)
        } else {
            TransportCause::Other(detail)
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            TransportCause::DnsResolution(d)
            | TransportCause::Connection(d)
            | TransportCause::Certificate(d)
            | TransportCause::Timeout(d)
            | TransportCause::Other(d) => d,
        }
    }
}

impl fmt::Display for TransportCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransportCause::DnsResolution(_) => "DNS resolution failed",
            TransportCause::Connection(_) => "connection failed",
            TransportCause::Certificate(_) => "TLS certificate rejected",
            TransportCause::Timeout(_) => "timed out",
            TransportCause::Other(_) => "load failed",
        };
        write!(f, "{}: {}", label, self.detail())
    }
}

/// Maps a final main-document status. Statuses above 299 are failures.
pub fn classify_status(status: Option<u16>) -> LoadOutcome {
    match status {
        Some(code) if code > 299 => LoadOutcome::HttpError(code),
        Some(code) => LoadOutcome::Loaded(code),
        None => LoadOutcome::Loaded(SYNTHETIC_OK),
    }
}

/// Sets the page's document to `html`.
pub async fn load_html<S>(session: &mut S, html: &str) -> LoadOutcome
where
    S: BrowserSession + ?Sized,
{
    match session.set_content(html).await {
        Ok(()) => LoadOutcome::Loaded(SYNTHETIC_OK),
        Err(err) => LoadOutcome::TransportError(TransportCause::Other(err.to_string())),
    }
}

/// Navigates to `url`, bounded by `nav_timeout` including the network-idle wait.
pub async fn load_url<S>(session: &mut S, url: &str, nav_timeout: Duration) -> LoadOutcome
where
    S: BrowserSession + ?Sized,
{
    match timeout(nav_timeout, session.navigate(url)).await {
        Err(_) => LoadOutcome::TransportError(TransportCause::Timeout(format!(
            "navigation to {url} exceeded {} ms",
            nav_timeout.as_millis()
        ))),
        Ok(Err(err)) => {
            debug!(url, error = %err, "Navigation failed");
            LoadOutcome::TransportError(TransportCause::classify(&err.to_string()))
        }
        Ok(Ok(navigation)) => classify_status(navigation.status),
    }
}
