//! pagepress library
//!
//! Renders raw HTML or a remote URL to PDF by driving a headless browser
//! through content loading, lazy-content settling and print-to-PDF export.
//!
//! # Module Overview
//!
//! - [`options`] - Lenient normalization of caller-supplied print options
//! - [`browser`] - Browser session management (Chromium, bounded, scripted)
//! - [`loader`] - HTML/URL loading and load-outcome classification
//! - [`settle`] - Scroll-driven lazy-content settling
//! - [`export`] - Print-to-PDF export
//! - [`job`] - Job orchestration and request validation
//! - [`observer`] - Injected job logging hooks
//! - [`config`] - Configuration file support
//! - [`output`] - JSON output schemas
//!
//! # Example
//!
//! ```no_run
//! use pagepress_lib::browser::{ChromiumSessions, LaunchOptions};
//! use pagepress_lib::{Config, RawRenderOptions, Renderer};
//!
//! # async fn example() -> Result<(), pagepress_lib::JobError> {
//! let config = Config::default();
//! let sessions = ChromiumSessions::new(LaunchOptions::from(&config.launch));
//! let renderer = Renderer::new(sessions, &config);
//!
//! let artifact = renderer
//!     .render_from_html("<html><body>short</body></html>", &RawRenderOptions::default())
//!     .await?;
//! std::fs::write("short.pdf", artifact.bytes()).ok();
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod config;
pub mod error;
pub mod export;
pub mod job;
pub mod loader;
pub mod observer;
pub mod options;
pub mod output;
pub mod settle;
pub mod viewport;

pub use browser::{BrowserSession, SessionManager};
pub use config::Config;
pub use error::{EngineError, ErrorCategory, ErrorPayload, JobError, JobErrorKind, PressError, Result};
pub use export::RenderArtifact;
pub use job::{RenderRequest, Renderer, SourceKind};
pub use loader::{LoadOutcome, TransportCause};
pub use observer::{JobId, JobObserver, JobStage, ProgressCallback, ProgressObserver, TracingObserver};
pub use options::{normalize, PageFormat, RawRenderOptions, RenderOptions};
pub use output::{ErrorOutput, PressOutput, RenderOutput, SourceDescriptor, OUTPUT_VERSION};
pub use settle::{SettleOutcome, SettleReport};
pub use viewport::Viewport;
