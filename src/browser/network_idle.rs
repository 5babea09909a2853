//! Network-idle detection for top-level navigations.
//!
//! A page counts as idle once no more than [`MAX_INFLIGHT`] requests have
//! been outstanding for [`QUIET_WINDOW`].

use futures::{Stream, StreamExt};
use std::collections::HashSet;
use std::time::Duration;

pub(crate) const MAX_INFLIGHT: usize = 2;
pub(crate) const QUIET_WINDOW: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NetworkEvent {
    Started(String),
    Finished(String),
}

#[derive(Debug)]
pub(crate) struct NetworkIdle {
    inflight: HashSet<String>,
    max_inflight: usize,
    quiet_window: Duration,
}

impl Default for NetworkIdle {
    fn default() -> Self {
        Self::new(MAX_INFLIGHT, QUIET_WINDOW)
    }
}

impl NetworkIdle {
    pub(crate) fn new(max_inflight: usize, quiet_window: Duration) -> Self {
        Self {
            inflight: HashSet::new(),
            max_inflight,
            quiet_window,
        }
    }

    pub(crate) fn apply(&mut self, event: NetworkEvent) {
        match event {
            // Redirects reuse the request id, so a set keeps the count honest.
            NetworkEvent::Started(id) => {
                self.inflight.insert(id);
            }
            NetworkEvent::Finished(id) => {
                self.inflight.remove(&id);
            }
        }
    }

    pub(crate) fn inflight(&self) -> usize {
        self.inflight.len()
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.inflight.len() <= self.max_inflight
    }

    /// Consume `events` until the quiet window elapses while idle, or the
    /// stream ends.
    pub(crate) async fn wait<S>(&mut self, events: &mut S)
    where
        S: Stream<Item = NetworkEvent> + Unpin,
    {
        loop {
            if self.is_idle() {
                match tokio::time::timeout(self.quiet_window, events.next()).await {
                    Err(_) | Ok(None) => return,
                    Ok(Some(event)) => self.apply(event),
                }
            } else {
                match events.next().await {
                    None => return,
                    Some(event) => self.apply(event),
                }
            }
        }
    }
}
