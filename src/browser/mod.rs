//! Browser session management for headless page rendering.
//!
//! The orchestrator only talks to the two traits defined here, so the engine
//! behind them can be swapped without touching the pipeline.
//!
//! # Module Structure
//!
//! - [`chromium`] - Chromium over the DevTools protocol (one browser per job)
//! - [`bounded`] - Semaphore-capped wrapper around any [`SessionManager`]
//! - [`scripted`] - In-process engine with scripted page behavior
//! - `network_idle` - In-flight request tracking used while navigating
//!
//! # Example
//!
//! ```no_run
//! use pagepress_lib::browser::{ChromiumSessions, LaunchOptions, SessionManager};
//!
//! # async fn example() -> Result<(), pagepress_lib::EngineError> {
//! let sessions = ChromiumSessions::new(LaunchOptions::default());
//! let session = sessions.acquire().await?;
//! // ... load, settle, export
//! sessions.release(session).await;
//! # Ok(())
//! # }
//! ```

pub mod bounded;
pub mod chromium;
mod network_idle;
pub mod scripted;

use async_trait::async_trait;
use serde::Deserialize;

use crate::options::RenderOptions;
use crate::EngineError;

pub use bounded::{BoundedSession, BoundedSessions};
pub use chromium::{ChromiumSession, ChromiumSessions, LaunchOptions, HARDENING_FLAGS};
pub use scripted::{NavigationScript, PageScript, PdfScript, ScriptedSessions, SessionStats};

/// Result of a completed top-level navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    /// Status of the final main-document response, if the engine saw one.
    pub status: Option<u16>,
}

/// Scroll geometry of the loaded document, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollMetrics {
    pub scroll_height: f64,
    pub viewport_height: f64,
}

impl ScrollMetrics {
    /// Distance that must be scrolled before the bottom edge is in view.
    pub fn scrollable(&self) -> f64 {
        (self.scroll_height - self.viewport_height).max(0.0)
    }
}

/// Engine-neutral print parameters; lengths are inches.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintParams {
    pub print_background: bool,
    pub paper_width: f64,
    pub paper_height: f64,
    pub scale: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub display_header_footer: bool,
    pub header_template: String,
    pub footer_template: String,
}

impl From<&RenderOptions> for PrintParams {
    fn from(options: &RenderOptions) -> Self {
        let (paper_width, paper_height) = options.format.paper_size();
        Self {
            print_background: true,
            paper_width,
            paper_height,
            scale: options.scale,
            margin_top: options.margins.top.inches(),
            margin_right: options.margins.right.inches(),
            margin_bottom: options.margins.bottom.inches(),
            margin_left: options.margins.left.inches(),
            display_header_footer: options.display_header_footer,
            header_template: options.header_template.clone(),
            footer_template: options.footer_template.clone(),
        }
    }
}

/// One browser process plus one page, owned by a single job.
#[async_trait]
pub trait BrowserSession: Send {
    /// Replace the page's document with `html`.
    async fn set_content(&mut self, html: &str) -> Result<(), EngineError>;

    /// Navigate to `url` and wait for the network to go quiet.
    ///
    /// Not time-bounded by itself; callers wrap it in their own timeout.
    async fn navigate(&mut self, url: &str) -> Result<Navigation, EngineError>;

    async fn scroll_metrics(&mut self) -> Result<ScrollMetrics, EngineError>;

    async fn scroll_by(&mut self, dy: u32) -> Result<(), EngineError>;

    async fn print_pdf(&mut self, params: &PrintParams) -> Result<Vec<u8>, EngineError>;
}

/// Hands out sessions and takes them back.
///
/// `release` must close whatever the session actually holds, must be safe on
/// a partially built session, and must never fail.
#[async_trait]
pub trait SessionManager: Send + Sync {
    type Session: BrowserSession;

    async fn acquire(&self) -> Result<Self::Session, EngineError>;

    async fn release(&self, session: Self::Session);
}
