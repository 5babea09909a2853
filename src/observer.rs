//! Job observation hooks.
//!
//! The orchestrator holds no logging or alerting state of its own; it reports
//! stage transitions and failures to whatever [`JobObserver`] it was given.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{JobError, JobErrorKind};
use crate::export::RenderArtifact;

pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Correlation id for one render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job state machine positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Start,
    Acquiring,
    Loading,
    Settling,
    Exporting,
    Done,
    Errored(JobErrorKind),
}

impl JobStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStage::Done | JobStage::Errored(_))
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStage::Start => f.write_str("start"),
            JobStage::Acquiring => f.write_str("acquiring browser"),
            JobStage::Loading => f.write_str("loading content"),
            JobStage::Settling => f.write_str("settling lazy content"),
            JobStage::Exporting => f.write_str("exporting PDF"),
            JobStage::Done => f.write_str("done"),
            JobStage::Errored(kind) => write!(f, "errored ({kind})"),
        }
    }
}

pub trait JobObserver: Send + Sync {
    fn stage(&self, job: &JobId, stage: JobStage);

    fn failed(&self, job: &JobId, error: &JobError) {
        let _ = (job, error);
    }

    fn completed(&self, job: &JobId, artifact: &RenderArtifact, elapsed: Duration) {
        let _ = (job, artifact, elapsed);
    }
}

/// Structured logs through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl JobObserver for TracingObserver {
    fn stage(&self, job: &JobId, stage: JobStage) {
        debug!(job = %job, stage = %stage, "Job stage");
    }

    fn failed(&self, job: &JobId, error: &JobError) {
        match error.kind {
            JobErrorKind::LaunchFailure | JobErrorKind::ExportFailure => {
                error!(job = %job, kind = %error.kind, message = %error.message, "Render job failed")
            }
            _ => warn!(job = %job, kind = %error.kind, message = %error.message, "Render job rejected"),
        }
    }

    fn completed(&self, job: &JobId, artifact: &RenderArtifact, elapsed: Duration) {
        info!(
            job = %job,
            bytes = artifact.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Render job finished"
        );
    }
}

/// Forwards human-readable progress lines to a callback.
#[derive(Clone)]
pub struct ProgressObserver {
    callback: ProgressCallback,
}

impl ProgressObserver {
    pub fn new(callback: ProgressCallback) -> Self {
        Self { callback }
    }
}

impl fmt::Debug for ProgressObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressObserver").finish_non_exhaustive()
    }
}

impl JobObserver for ProgressObserver {
    fn stage(&self, _job: &JobId, stage: JobStage) {
        if !stage.is_terminal() && stage != JobStage::Start {
            (self.callback)(&format!("{}{}", capitalize(&stage.to_string()), '\u{2026}'));
        }
    }

    fn failed(&self, _job: &JobId, error: &JobError) {
        (self.callback)(&format!("Failed: {error}"));
    }

    fn completed(&self, _job: &JobId, artifact: &RenderArtifact, elapsed: Duration) {
        (self.callback)(&format!(
            "Rendered {} bytes in {:.1}s",
            artifact.len(),
            elapsed.as_secs_f32()
        ));
    }
}

/// Sends every event to each observer in order.
#[derive(Clone, Default)]
pub struct Observers(Vec<Arc<dyn JobObserver>>);

impl Observers {
    pub fn new(observers: Vec<Arc<dyn JobObserver>>) -> Self {
        Self(observers)
    }
}

impl JobObserver for Observers {
    fn stage(&self, job: &JobId, stage: JobStage) {
        self.0.iter().for_each(|o| o.stage(job, stage));
    }

    fn failed(&self, job: &JobId, error: &JobError) {
        self.0.iter().for_each(|o| o.failed(job, error));
    }

    fn completed(&self, job: &JobId, artifact: &RenderArtifact, elapsed: Duration) {
        self.0.iter().for_each(|o| o.completed(job, artifact, elapsed));
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
