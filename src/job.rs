//! Render job orchestration.
//!
//! A job walks `Start -> Acquiring -> Loading -> Settling -> Exporting -> Done`
//! and may stop in `Errored(kind)` from any non-terminal stage. Whatever
//! happens after a session is acquired, it is released exactly once before
//! the job reports its terminal stage.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;
use url::Url;

use crate::browser::SessionManager;
use crate::config::{Config, SettleConfig, Timeouts};
use crate::error::JobError;
use crate::export::{export, RenderArtifact};
use crate::loader::{load_html, load_url, LoadOutcome};
use crate::observer::{JobId, JobObserver, JobStage, TracingObserver};
use crate::options::{normalize, RawRenderOptions, RenderOptions};
use crate::settle::settle;

const URL_SCHEMES: &[&str] = &["http", "https", "file", "data"];

/// A validated render job input. Carries exactly one source.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderRequest {
    FromHtml { html: String, options: RenderOptions },
    FromUrl { url: String },
}

impl RenderRequest {
    /// Builds a request from optional sources. Empty strings count as absent.
    pub fn from_parts(
        html: Option<&str>,
        url: Option<&str>,
        raw: &RawRenderOptions,
    ) -> Result<Self, JobError> {
        let html = html.filter(|h| !h.is_empty());
        let url = url.map(str::trim).filter(|u| !u.is_empty());
        match (html, url) {
            (Some(html), None) => Ok(RenderRequest::FromHtml {
                html: html.to_string(),
                options: normalize(raw),
            }),
            (None, Some(url)) => Ok(RenderRequest::FromUrl {
                url: validate_url(url)?,
            }),
            (None, None) => Err(JobError::bad_request(
                "Request carries no source; provide html or url",
            )),
            (Some(_), Some(_)) => Err(JobError::bad_request(
                "Request carries both html and url; provide exactly one",
            )),
        }
    }

    pub fn from_html(html: &str, raw: &RawRenderOptions) -> Result<Self, JobError> {
        Self::from_parts(Some(html), None, raw)
    }

    pub fn from_url(url: &str) -> Result<Self, JobError> {
        Self::from_parts(None, Some(url), &RawRenderOptions::default())
    }

    pub fn source(&self) -> SourceKind {
        match self {
            RenderRequest::FromHtml { .. } => SourceKind::Html,
            RenderRequest::FromUrl { .. } => SourceKind::Url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Html,
    Url,
}

fn validate_url(raw: &str) -> Result<String, JobError> {
    let parsed = Url::parse(raw)
        .map_err(|e| JobError::bad_request(format!("Invalid url '{raw}': {e}")))?;
    if !URL_SCHEMES.contains(&parsed.scheme()) {
        return Err(JobError::bad_request(format!(
            "Unsupported url scheme '{}'; expected http, https, file or data",
            parsed.scheme()
        )));
    }
    Ok(parsed.to_string())
}

/// Drives render jobs against a [`SessionManager`].
pub struct Renderer<M> {
    sessions: M,
    timeouts: Timeouts,
    settle: SettleConfig,
    observer: Arc<dyn JobObserver>,
}

impl<M: SessionManager> Renderer<M> {
    pub fn new(sessions: M, config: &Config) -> Self {
        Self {
            sessions,
            timeouts: config.timeouts,
            settle: config.settle,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn JobObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn sessions(&self) -> &M {
        &self.sessions
    }

    pub async fn render_from_html(
        &self,
        html: &str,
        raw: &RawRenderOptions,
    ) -> Result<RenderArtifact, JobError> {
        self.render_parts(Some(html), None, raw).await
    }

    pub async fn render_from_url(&self, url: &str) -> Result<RenderArtifact, JobError> {
        self.render_parts(None, Some(url), &RawRenderOptions::default())
            .await
    }

    /// Validates the sources and renders. A malformed request never acquires a session.
    pub async fn render_parts(
        &self,
        html: Option<&str>,
        url: Option<&str>,
        raw: &RawRenderOptions,
    ) -> Result<RenderArtifact, JobError> {
        let job = JobId::new();
        self.observer.stage(&job, JobStage::Start);
        match RenderRequest::from_parts(html, url, raw) {
            Ok(request) => self.run(&job, &request).await,
            Err(err) => Err(self.fail(&job, err)),
        }
    }

    pub async fn render(&self, request: &RenderRequest) -> Result<RenderArtifact, JobError> {
        let job = JobId::new();
        self.observer.stage(&job, JobStage::Start);
        self.run(&job, request).await
    }

    async fn run(&self, job: &JobId, request: &RenderRequest) -> Result<RenderArtifact, JobError> {
        let started = Instant::now();
        self.observer.stage(job, JobStage::Acquiring);
        let mut session = match self.sessions.acquire().await {
            Ok(session) => session,
            Err(err) => return Err(self.fail(job, JobError::launch(err))),
        };

        let result = self.drive(job, &mut session, request).await;
        self.sessions.release(session).await;

        match result {
            Ok(artifact) => {
                self.observer.completed(job, &artifact, started.elapsed());
                self.observer.stage(job, JobStage::Done);
                Ok(artifact)
            }
            Err(err) => Err(self.fail(job, err)),
        }
    }

    async fn drive(
        &self,
        job: &JobId,
        session: &mut M::Session,
        request: &RenderRequest,
    ) -> Result<RenderArtifact, JobError> {
        self.observer.stage(job, JobStage::Loading);
        let url_defaults;
        let (outcome, options, export_timeout) = match request {
            RenderRequest::FromHtml { html, options } => (
                load_html(session, html).await,
                options,
                self.timeouts.html_export,
            ),
            RenderRequest::FromUrl { url } => {
                url_defaults = RenderOptions::default();
                (
                    load_url(session, url, self.timeouts.navigation).await,
                    &url_defaults,
                    self.timeouts.url_export,
                )
            }
        };

        match outcome {
            LoadOutcome::Loaded(status) => debug!(job = %job, status, "Content loaded"),
            LoadOutcome::TransportError(cause) => return Err(JobError::transport(&cause)),
            LoadOutcome::HttpError(status) => return Err(JobError::remote_status(status)),
        }

        self.observer.stage(job, JobStage::Settling);
        let report = settle(session, &self.settle, self.settle.ceiling(export_timeout)).await;
        debug!(job = %job, outcome = ?report.outcome, steps = report.steps, "Settled");

        self.observer.stage(job, JobStage::Exporting);
        export(session, options, export_timeout)
            .await
            .map_err(JobError::export)
    }

    fn fail(&self, job: &JobId, err: JobError) -> JobError {
        self.observer.failed(job, &err);
        self.observer.stage(job, JobStage::Errored(err.kind));
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{NavigationScript, PageScript, PdfScript, ScriptedSessions};
    use crate::error::JobErrorKind;
    use crate::options::{LooseValue, PageFormat};
    use std::sync::Mutex;
    use std::time::Duration;

    const SHORT_HTML: &str = "<html><body>short</body></html>";

    fn renderer(script: PageScript) -> Renderer<ScriptedSessions> {
        Renderer::new(ScriptedSessions::new(script), &Config::default())
    }

    fn url_renderer(navigation: NavigationScript) -> Renderer<ScriptedSessions> {
        renderer(PageScript {
            navigation,
            ..PageScript::default()
        })
    }

    fn assert_balanced(renderer: &Renderer<ScriptedSessions>, acquired: usize) {
        let stats = renderer.sessions().stats();
        assert_eq!(stats.acquired(), acquired, "acquire count");
        assert_eq!(stats.released(), acquired, "release count");
    }

    #[derive(Default)]
    struct RecordingObserver {
        stages: Mutex<Vec<JobStage>>,
    }

    impl JobObserver for RecordingObserver {
        fn stage(&self, _job: &JobId, stage: JobStage) {
            self.stages.lock().unwrap().push(stage);
        }
    }

    #[test]
    fn request_needs_exactly_one_source() {
        let raw = RawRenderOptions::default();
        let neither = RenderRequest::from_parts(None, None, &raw).unwrap_err();
        assert_eq!(neither.kind, JobErrorKind::BadRequest);

        let both =
            RenderRequest::from_parts(Some("<p>x</p>"), Some("https://example.com"), &raw)
                .unwrap_err();
        assert_eq!(both.kind, JobErrorKind::BadRequest);

        let empty = RenderRequest::from_parts(Some(""), Some("  "), &raw).unwrap_err();
        assert_eq!(empty.kind, JobErrorKind::BadRequest);
    }

    #[test]
    fn request_rejects_relative_and_unsupported_urls() {
        let relative = RenderRequest::from_url("/just/a/path").unwrap_err();
        assert_eq!(relative.kind, JobErrorKind::BadRequest);

        let ftp = RenderRequest::from_url("ftp://example.com/file").unwrap_err();
        assert!(ftp.message.contains("ftp"));

        let ok = RenderRequest::from_url("https://example.com").unwrap();
        assert_eq!(ok.source(), SourceKind::Url);
    }

    #[test]
    fn html_request_normalizes_options() {
        let raw = RawRenderOptions {
            format: Some(LooseValue::Text("letter".to_string())),
            ..RawRenderOptions::default()
        };
        match RenderRequest::from_html(SHORT_HTML, &raw).unwrap() {
            RenderRequest::FromHtml { options, .. } => {
                assert_eq!(options.format, PageFormat::Letter)
            }
            other => panic!("expected html request, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn short_html_renders_pdf() {
        let renderer = renderer(PageScript::default());
        let artifact = renderer
            .render_from_html(SHORT_HTML, &RawRenderOptions::default())
            .await
            .expect("artifact");

        assert!(!artifact.is_empty());
        assert_eq!(artifact.media_type(), "application/pdf");
        assert_balanced(&renderer, 1);
    }

    #[tokio::test]
    async fn missing_source_never_acquires() {
        let renderer = renderer(PageScript::default());
        let err = renderer
            .render_parts(None, None, &RawRenderOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind, JobErrorKind::BadRequest);
        assert_eq!(err.http_status(), 400);
        assert_balanced(&renderer, 0);
    }

    #[tokio::test]
    async fn launch_failure_is_reported() {
        let renderer = renderer(PageScript {
            launch_error: Some("out of memory".to_string()),
            ..PageScript::default()
        });
        let err = renderer.render_from_url("https://example.com").await.unwrap_err();

        assert_eq!(err.kind, JobErrorKind::LaunchFailure);
        assert!(err.message.contains("out of memory"));
        assert_balanced(&renderer, 0);
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let renderer = url_renderer(NavigationScript::Fail(
            "net::ERR_NAME_NOT_RESOLVED".to_string(),
        ));
        let err = renderer
            .render_from_url("https://no-such-host.invalid")
            .await
            .unwrap_err();

        assert_eq!(err.kind, JobErrorKind::Transport);
        assert_eq!(err.http_status(), 500);
        assert_balanced(&renderer, 1);
    }

    #[tokio::test]
    async fn not_found_keeps_remote_status() {
        let renderer = url_renderer(NavigationScript::Status(404));
        let err = renderer
            .render_from_url("https://example.com/missing")
            .await
            .unwrap_err();

        assert_eq!(err.kind, JobErrorKind::RemoteStatus(Some(404)));
        assert_eq!(err.http_status(), 404);
        assert_balanced(&renderer, 1);
    }

    #[tokio::test]
    async fn url_without_response_renders() {
        let renderer = url_renderer(NavigationScript::NoResponse);
        let artifact = renderer.render_from_url("data:text/html,<p>hi</p>").await;
        assert!(artifact.is_ok());
        assert_balanced(&renderer, 1);
    }

    #[tokio::test]
    async fn zero_height_page_exports() {
        let renderer = renderer(PageScript {
            scroll_height: 0.0,
            ..PageScript::default()
        });
        let artifact = renderer
            .render_from_html(SHORT_HTML, &RawRenderOptions::default())
            .await;

        assert!(artifact.is_ok());
        assert_eq!(renderer.sessions().stats().scrolls(), 0);
    }

    #[tokio::test]
    async fn identical_html_renders_have_equal_length() {
        let renderer = renderer(PageScript::default());
        let raw = RawRenderOptions::default();
        let first = renderer.render_from_html(SHORT_HTML, &raw).await.unwrap();
        let second = renderer.render_from_html(SHORT_HTML, &raw).await.unwrap();

        assert_eq!(first.len(), second.len());
        assert_balanced(&renderer, 2);
    }

    #[tokio::test]
    async fn export_failure_releases_session() {
        let renderer = renderer(PageScript {
            pdf: PdfScript::Fail("Printing failed".to_string()),
            ..PageScript::default()
        });
        let err = renderer
            .render_from_html(SHORT_HTML, &RawRenderOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind, JobErrorKind::ExportFailure);
        assert_balanced(&renderer, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unvalidated_settle_config_still_releases_session() {
        let mut config = Config::default();
        config.settle.interval = Duration::ZERO;
        config.settle.ceiling_fraction = f64::NAN;
        let renderer = Renderer::new(
            ScriptedSessions::new(PageScript {
                scroll_height: 1800.0,
                viewport_height: 800.0,
                ..PageScript::default()
            }),
            &config,
        );
        let artifact = renderer
            .render_from_html(SHORT_HTML, &RawRenderOptions::default())
            .await;

        assert!(artifact.is_ok());
        assert_balanced(&renderer, 1);
        assert_eq!(renderer.sessions().stats().open(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_export_times_out_as_export_failure() {
        let renderer = renderer(PageScript {
            pdf: PdfScript::Hang,
            ..PageScript::default()
        });
        let err = renderer
            .render_from_url("https://example.com")
            .await
            .unwrap_err();

        assert_eq!(err.kind, JobErrorKind::ExportFailure);
        assert!(err.message.contains("timed out"), "got: {}", err.message);
        assert_balanced(&renderer, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_navigation_is_transport_timeout() {
        let renderer = url_renderer(NavigationScript::Hang);
        let started = Instant::now();
        let err = renderer
            .render_from_url("https://example.com")
            .await
            .unwrap_err();

        assert_eq!(err.kind, JobErrorKind::Transport);
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert_balanced(&renderer, 1);
    }

    #[tokio::test]
    async fn observer_sees_every_stage_in_order() {
        let observer = Arc::new(RecordingObserver::default());
        let renderer = renderer(PageScript::default()).with_observer(observer.clone());
        renderer
            .render_from_html(SHORT_HTML, &RawRenderOptions::default())
            .await
            .unwrap();

        let stages = observer.stages.lock().unwrap();
        assert_eq!(
            stages.as_slice(),
            [
                JobStage::Start,
                JobStage::Acquiring,
                JobStage::Loading,
                JobStage::Settling,
                JobStage::Exporting,
                JobStage::Done,
            ]
        );
    }

    #[tokio::test]
    async fn observer_sees_errored_terminal_stage() {
        let observer = Arc::new(RecordingObserver::default());
        let renderer = url_renderer(NavigationScript::Status(503)).with_observer(observer.clone());
        let _ = renderer.render_from_url("https://example.com").await;

        let stages = observer.stages.lock().unwrap();
        assert_eq!(
            stages.last(),
            Some(&JobStage::Errored(JobErrorKind::RemoteStatus(Some(503))))
        );
        assert!(!stages.contains(&JobStage::Settling));
    }
}
