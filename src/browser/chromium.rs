//! Chromium sessions driven over the DevTools protocol.
//!
//! Every call to [`ChromiumSessions::acquire`] launches a fresh browser with
//! its own profile directory, so jobs never share cookies, cache or tabs.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
    EventResponseReceived, ResourceType,
};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport as CdpViewport;
use chromiumoxide::Page;
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::network_idle::{NetworkEvent, NetworkIdle};
use super::{BrowserSession, Navigation, PrintParams, ScrollMetrics, SessionManager};
use crate::config::LaunchConfig;
use crate::{EngineError, Viewport};

/// Launch flags applied to every browser; not configurable.
pub const HARDENING_FLAGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--ignore-certificate-errors",
    "--dns-prefetch-disable",
    "--disable-gpu",
    "--disable-dev-shm-usage",
];

/// Per-command protocol timeout. Kept above every pipeline timeout so the
/// pipeline's own deadlines are the ones that fire.
pub const PROTOCOL_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

const SCROLL_METRICS_SCRIPT: &str = "JSON.stringify({ scrollHeight: document.documentElement ? document.documentElement.scrollHeight : 0, viewportHeight: window.innerHeight })";

/// Configuration options for launching Chromium.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Browser executable; chromiumoxide searches the usual locations when absent.
    pub chrome: Option<PathBuf>,
    pub headless: bool,
    pub viewport: Viewport,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            chrome: None,
            headless: true,
            viewport: Viewport::default(),
        }
    }
}

impl From<&LaunchConfig> for LaunchOptions {
    fn from(cfg: &LaunchConfig) -> Self {
        Self {
            chrome: cfg.chrome.clone(),
            headless: cfg.headless,
            viewport: cfg.viewport,
        }
    }
}

impl LaunchOptions {
    fn browser_config(&self, profile: &TempDir) -> Result<BrowserConfig, EngineError> {
        let mut builder = BrowserConfig::builder()
            .args(HARDENING_FLAGS.iter().copied())
            .user_data_dir(profile.path())
            .request_timeout(PROTOCOL_REQUEST_TIMEOUT)
            .window_size(self.viewport.width, self.viewport.height)
            .viewport(CdpViewport {
                width: self.viewport.width,
                height: self.viewport.height,
                ..CdpViewport::default()
            });
        if let Some(chrome) = &self.chrome {
            builder = builder.chrome_executable(chrome);
        }
        if !self.headless {
            builder = builder.with_head();
        }
        builder.build().map_err(EngineError::Launch)
    }
}

/// Launches one Chromium process per session.
#[derive(Debug, Clone, Default)]
pub struct ChromiumSessions {
    options: LaunchOptions,
}

impl ChromiumSessions {
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LaunchOptions {
        &self.options
    }
}

#[async_trait]
impl SessionManager for ChromiumSessions {
    type Session = ChromiumSession;

    async fn acquire(&self) -> Result<ChromiumSession, EngineError> {
        let profile = tempfile::Builder::new()
            .prefix("pagepress-profile-")
            .tempdir()
            .map_err(|e| EngineError::Launch(format!("Failed to create browser profile: {e}")))?;
        let config = self.options.browser_config(&profile)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| map_launch_error(e, self.options.chrome.as_ref()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "DevTools handler reported an error");
                }
            }
        });

        let mut session = ChromiumSession {
            browser: Some(browser),
            page: None,
            handler: Some(handler),
            profile: Some(profile),
        };

        let page = match session.browser.as_ref() {
            Some(browser) => browser.new_page("about:blank").await,
            None => return Err(EngineError::Closed),
        };
        match page {
            Ok(page) => {
                session.page = Some(page);
                debug!("Chromium session ready");
                Ok(session)
            }
            Err(err) => {
                session.close().await;
                Err(EngineError::Launch(format!("Failed to open page: {err}")))
            }
        }
    }

    async fn release(&self, mut session: ChromiumSession) {
        session.close().await;
    }
}

/// A running browser process with one open page.
pub struct ChromiumSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
    profile: Option<TempDir>,
}

impl std::fmt::Debug for ChromiumSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromiumSession")
            .field("browser", &self.browser.is_some())
            .field("page", &self.page.is_some())
            .finish()
    }
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page, EngineError> {
        self.page.as_ref().ok_or(EngineError::Closed)
    }

    /// Close whatever was opened. Idempotent; close-time errors are logged
    /// and dropped so they cannot mask the job's own outcome.
    pub async fn close(&mut self) {
        if let Some(page) = self.page.take() {
            if let Err(err) = page.close().await {
                debug!(error = %err, "Failed to close page");
            }
        }
        if let Some(mut browser) = self.browser.take() {
            if let Err(err) = browser.close().await {
                warn!(error = %err, "Failed to close browser cleanly");
            }
            if let Err(err) = browser.wait().await {
                warn!(error = %err, "Failed to reap browser process");
            }
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        if let Some(profile) = self.profile.take() {
            if let Err(err) = profile.close() {
                debug!(error = %err, "Failed to remove browser profile");
            }
        }
    }

    async fn network_activity(page: &Page) -> Result<BoxStream<'static, NetworkEvent>, EngineError> {
        let started = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(map_protocol_error)?
            .map(|e| NetworkEvent::Started(e.request_id.inner().clone()));
        let finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(map_protocol_error)?
            .map(|e| NetworkEvent::Finished(e.request_id.inner().clone()));
        let failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(map_protocol_error)?
            .map(|e| NetworkEvent::Finished(e.request_id.inner().clone()));

        Ok(stream::select_all(vec![started.boxed(), finished.boxed(), failed.boxed()]).boxed())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        // Browser's own Drop kills the child process; only the handler task
        // would outlive us.
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn set_content(&mut self, html: &str) -> Result<(), EngineError> {
        self.page()?
            .set_content(html)
            .await
            .map_err(map_protocol_error)?;
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<Navigation, EngineError> {
        let page = self.page()?;
        page.execute(EnableParams::default())
            .await
            .map_err(map_protocol_error)?;
        let main_frame = page.mainframe().await.map_err(map_protocol_error)?;
        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(map_protocol_error)?;
        let mut activity = Self::network_activity(page).await?;

        page.goto(url).await.map_err(map_navigation_error)?;

        // Redirect hops do not emit responseReceived, so the last main-frame
        // document response is the final one.
        let mut status = None;
        while let Some(Some(event)) = responses.next().now_or_never() {
            let main_document = event.r#type == ResourceType::Document
                && (main_frame.is_none() || event.frame_id == main_frame);
            if main_document {
                status = u16::try_from(event.response.status).ok();
            }
        }

        let mut idle = NetworkIdle::default();
        idle.wait(&mut activity).await;
        debug!(url, ?status, "Navigation settled on network idle");

        Ok(Navigation { status })
    }

    async fn scroll_metrics(&mut self) -> Result<ScrollMetrics, EngineError> {
        let raw: String = self
            .page()?
            .evaluate(SCROLL_METRICS_SCRIPT)
            .await
            .map_err(map_protocol_error)?
            .into_value()
            .map_err(|e| EngineError::Protocol(format!("Unexpected scroll metrics: {e}")))?;
        serde_json::from_str(&raw)
            .map_err(|e| EngineError::Protocol(format!("Unexpected scroll metrics: {e}")))
    }

    async fn scroll_by(&mut self, dy: u32) -> Result<(), EngineError> {
        self.page()?
            .evaluate(format!("window.scrollBy(0, {dy})"))
            .await
            .map_err(map_protocol_error)?;
        Ok(())
    }

    async fn print_pdf(&mut self, params: &PrintParams) -> Result<Vec<u8>, EngineError> {
        let params = PrintToPdfParams {
            landscape: Some(false),
            print_background: Some(params.print_background),
            paper_width: Some(params.paper_width),
            paper_height: Some(params.paper_height),
            scale: Some(params.scale),
            margin_top: Some(params.margin_top),
            margin_right: Some(params.margin_right),
            margin_bottom: Some(params.margin_bottom),
            margin_left: Some(params.margin_left),
            display_header_footer: Some(params.display_header_footer),
            header_template: Some(params.header_template.clone()),
            footer_template: Some(params.footer_template.clone()),
            ..PrintToPdfParams::default()
        };
        self.page()?.pdf(params).await.map_err(map_protocol_error)
    }
}

/// Maps a launch failure, pointing at the executable when that is the cause.
pub(crate) fn map_launch_error(err: CdpError, chrome: Option<&PathBuf>) -> EngineError {
    let message = err.to_string();
    let lower = message.to_ascii_lowercase();
    if lower.contains("could not auto detect") || lower.contains("no such file") {
        let location = chrome
            .map(|p| format!("'{}'", p.display()))
            .unwrap_or_else(|| "on PATH".to_string());
        EngineError::Launch(format!(
            "Chromium executable not found {location}: {message}"
        ))
    } else {
        EngineError::Launch(message)
    }
}

/// Navigation failures carry Chromium's `net::ERR_*` text; keep it intact
/// for transport classification.
pub(crate) fn map_navigation_error(err: CdpError) -> EngineError {
    match err {
        CdpError::Timeout => EngineError::Navigation("navigation timeout exceeded".to_string()),
        other => EngineError::Navigation(other.to_string()),
    }
}

pub(crate) fn map_protocol_error(err: CdpError) -> EngineError {
    EngineError::Protocol(err.to_string())
}
