//! In-process engine whose page behavior is scripted up front.
//!
//! Used by the test suite and by the CLI's mock mode (`PAGEPRESS_MOCK_ENGINE`)
//! to exercise the whole pipeline without a Chromium install. It also counts
//! acquires, releases and scroll steps so callers can check session hygiene.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{BrowserSession, Navigation, PrintParams, ScrollMetrics, SessionManager};
use crate::EngineError;

const POINTS_PER_INCH: f64 = 72.0;

/// How a scripted navigation ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationScript {
    Status(u16),
    /// Navigation succeeds without a main-document response.
    NoResponse,
    /// Engine error text, e.g. `net::ERR_NAME_NOT_RESOLVED`.
    Fail(String),
    /// Never completes.
    Hang,
}

/// How a scripted print call ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfScript {
    /// A minimal one-page PDF sized from the print parameters.
    Document,
    Bytes(Vec<u8>),
    Fail(String),
    Hang,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageScript {
    pub launch_error: Option<String>,
    pub content_error: Option<String>,
    pub navigation: NavigationScript,
    pub scroll_height: f64,
    pub viewport_height: f64,
    /// Added to the scroll height after every scroll step (infinite scroll).
    pub growth_per_scroll: f64,
    pub scroll_error: Option<String>,
    pub pdf: PdfScript,
}

impl Default for PageScript {
    fn default() -> Self {
        Self {
            launch_error: None,
            content_error: None,
            navigation: NavigationScript::Status(200),
            scroll_height: 0.0,
            viewport_height: 800.0,
            growth_per_scroll: 0.0,
            scroll_error: None,
            pdf: PdfScript::Document,
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionStats {
    acquired: AtomicUsize,
    released: AtomicUsize,
    scrolls: AtomicUsize,
}

impl SessionStats {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn open(&self) -> usize {
        self.acquired().saturating_sub(self.released())
    }

    pub fn scrolls(&self) -> usize {
        self.scrolls.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedSessions {
    script: PageScript,
    stats: Arc<SessionStats>,
}

impl ScriptedSessions {
    pub fn new(script: PageScript) -> Self {
        Self {
            script,
            stats: Arc::new(SessionStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<SessionStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl SessionManager for ScriptedSessions {
    type Session = ScriptedSession;

    async fn acquire(&self) -> Result<ScriptedSession, EngineError> {
        if let Some(message) = &self.script.launch_error {
            return Err(EngineError::Launch(message.clone()));
        }
        self.stats.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedSession {
            scroll_height: self.script.scroll_height,
            script: self.script.clone(),
            stats: Arc::clone(&self.stats),
            content_len: 0,
            closed: false,
        })
    }

    async fn release(&self, mut session: ScriptedSession) {
        if !session.closed {
            session.closed = true;
            self.stats.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Debug)]
pub struct ScriptedSession {
    script: PageScript,
    stats: Arc<SessionStats>,
    scroll_height: f64,
    content_len: usize,
    closed: bool,
}

impl ScriptedSession {
    fn ensure_open(&self) -> Result<(), EngineError> {
        if self.closed {
            Err(EngineError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn set_content(&mut self, html: &str) -> Result<(), EngineError> {
        self.ensure_open()?;
        if let Some(message) = &self.script.content_error {
            return Err(EngineError::Protocol(message.clone()));
        }
        self.content_len = html.len();
        Ok(())
    }

    async fn navigate(&mut self, _url: &str) -> Result<Navigation, EngineError> {
        self.ensure_open()?;
        match &self.script.navigation {
            NavigationScript::Status(status) => Ok(Navigation {
                status: Some(*status),
            }),
            NavigationScript::NoResponse => Ok(Navigation { status: None }),
            NavigationScript::Fail(message) => Err(EngineError::Navigation(message.clone())),
            NavigationScript::Hang => futures::future::pending().await,
        }
    }

    async fn scroll_metrics(&mut self) -> Result<ScrollMetrics, EngineError> {
        self.ensure_open()?;
        Ok(ScrollMetrics {
            scroll_height: self.scroll_height,
            viewport_height: self.script.viewport_height,
        })
    }

    async fn scroll_by(&mut self, _dy: u32) -> Result<(), EngineError> {
        self.ensure_open()?;
        if let Some(message) = &self.script.scroll_error {
            return Err(EngineError::Protocol(message.clone()));
        }
        self.stats.scrolls.fetch_add(1, Ordering::SeqCst);
        self.scroll_height += self.script.growth_per_scroll;
        Ok(())
    }

    async fn print_pdf(&mut self, params: &PrintParams) -> Result<Vec<u8>, EngineError> {
        self.ensure_open()?;
        match &self.script.pdf {
            PdfScript::Document => Ok(minimal_pdf(params, self.content_len)),
            PdfScript::Bytes(bytes) => Ok(bytes.clone()),
            PdfScript::Fail(message) => Err(EngineError::Protocol(message.clone())),
            PdfScript::Hang => futures::future::pending().await,
        }
    }
}

/// One blank page; deterministic for identical inputs.
fn minimal_pdf(params: &PrintParams, content_len: usize) -> Vec<u8> {
    let width = (params.paper_width * POINTS_PER_INCH).round();
    let height = (params.paper_height * POINTS_PER_INCH).round();
    format!(
        "%PDF-1.4\n\
         1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n\
         2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n\
         3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 {width} {height}] >> endobj\n\
         4 0 obj << /Producer (pagepress scripted engine) /SourceLength {content_len} >> endobj\n\
         trailer << /Root 1 0 R /Info 4 0 R >>\n\
         %%EOF\n"
    )
    .into_bytes()
}
