//! Lazy-content settling.
//!
//! Lazy images and infinite lists only load once they scroll into view, so
//! before export the page is scrolled down in fixed steps until its bottom
//! edge has been reached. The scroll height is re-read every tick; a page that
//! keeps growing is cut off by the ceiling and still counts as settled.

use std::time::Duration;
use tokio::time::{interval, timeout_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::browser::BrowserSession;
use crate::config::SettleConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// Scrolled far enough to bring the bottom edge into view.
    ReachedBottom,
    /// Ran out of time before reaching the bottom.
    CeilingReached,
    /// The engine stopped answering scroll calls.
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleReport {
    pub outcome: SettleOutcome,
    pub steps: u32,
    pub elapsed: Duration,
}

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Scrolls `session` until settled. Never fails, and never runs past
/// `ceiling`: engine calls that hang are cut off at the deadline.
pub async fn settle<S>(session: &mut S, config: &SettleConfig, ceiling: Duration) -> SettleReport
where
    S: BrowserSession + ?Sized,
{
    let start = Instant::now();
    let deadline = start + ceiling;
    let step = config.step_px.max(1);
    let mut ticker = interval(config.interval.max(MIN_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    let mut scrolled = 0.0_f64;
    let mut steps = 0_u32;

    let outcome = loop {
        let metrics = match timeout_at(deadline, session.scroll_metrics()).await {
            Ok(Ok(metrics)) => metrics,
            Ok(Err(err)) => {
                warn!(error = %err, "Scroll metrics unavailable; exporting as-is");
                break SettleOutcome::Interrupted;
            }
            Err(_) => break SettleOutcome::CeilingReached,
        };
        if scrolled >= metrics.scrollable() {
            break SettleOutcome::ReachedBottom;
        }
        if Instant::now() >= deadline {
            break SettleOutcome::CeilingReached;
        }
        match timeout_at(deadline, session.scroll_by(step)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(error = %err, "Scrolling failed; exporting as-is");
                break SettleOutcome::Interrupted;
            }
            Err(_) => break SettleOutcome::CeilingReached,
        }
        scrolled += f64::from(step);
        steps += 1;
        if timeout_at(deadline, ticker.tick()).await.is_err() {
            break SettleOutcome::CeilingReached;
        }
    };

    let report = SettleReport {
        outcome,
        steps,
        elapsed: start.elapsed(),
    };
    debug!(
        outcome = ?report.outcome,
        steps = report.steps,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Settling finished"
    );
    report
}
