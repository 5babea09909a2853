//! Caps the number of concurrently open sessions.
//!
//! Wraps any [`SessionManager`]; jobs beyond the cap wait for a permit
//! before their browser is launched.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::{BrowserSession, Navigation, PrintParams, ScrollMetrics, SessionManager};
use crate::EngineError;

#[derive(Debug, Clone)]
pub struct BoundedSessions<M> {
    inner: M,
    semaphore: Arc<Semaphore>,
}

impl<M: SessionManager> BoundedSessions<M> {
    /// A cap of zero is treated as one.
    pub fn new(inner: M, max_concurrent_sessions: usize) -> Self {
        Self {
            inner,
            semaphore: Arc::new(Semaphore::new(max_concurrent_sessions.max(1))),
        }
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// A session that holds its concurrency permit until released.
#[derive(Debug)]
pub struct BoundedSession<S> {
    inner: S,
    _permit: OwnedSemaphorePermit,
}

#[async_trait]
impl<M: SessionManager> SessionManager for BoundedSessions<M> {
    type Session = BoundedSession<M::Session>;

    async fn acquire(&self) -> Result<Self::Session, EngineError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| EngineError::Launch("Session limiter unavailable".to_string()))?;
        let inner = self.inner.acquire().await?;
        Ok(BoundedSession {
            inner,
            _permit: permit,
        })
    }

    async fn release(&self, session: Self::Session) {
        let BoundedSession { inner, _permit } = session;
        self.inner.release(inner).await;
        drop(_permit);
    }
}

#[async_trait]
impl<S: BrowserSession> BrowserSession for BoundedSession<S> {
    async fn set_content(&mut self, html: &str) -> Result<(), EngineError> {
        self.inner.set_content(html).await
    }

    async fn navigate(&mut self, url: &str) -> Result<Navigation, EngineError> {
        self.inner.navigate(url).await
    }

    async fn scroll_metrics(&mut self) -> Result<ScrollMetrics, EngineError> {
        self.inner.scroll_metrics().await
    }

    async fn scroll_by(&mut self, dy: u32) -> Result<(), EngineError> {
        self.inner.scroll_by(dy).await
    }

    async fn print_pdf(&mut self, params: &PrintParams) -> Result<Vec<u8>, EngineError> {
        self.inner.print_pdf(params).await
    }
}
