use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::time::Instant;

use pagepress_lib::browser::{BoundedSessions, ChromiumSessions, LaunchOptions, ScriptedSessions};
use pagepress_lib::observer::Observers;
use pagepress_lib::{
    normalize, Config, JobError, JobObserver, PressError, PressOutput, ProgressObserver,
    RawRenderOptions, RenderArtifact, RenderOutput, Renderer, SessionManager, SourceDescriptor,
    SourceKind, TracingObserver, OUTPUT_VERSION,
};

use crate::cli::{EngineArgs, OutputFormat};
use crate::formatting::{render_error, write_output};
use crate::settings::{apply_engine_args, load_config, log_effective_config, mock_script};

/// What a CLI invocation asks to render.
enum Source<'a> {
    Html {
        html: &'a str,
        raw: &'a RawRenderOptions,
    },
    Url(&'a str),
}

/// Run the html command.
pub async fn run_html(
    config_path: Option<PathBuf>,
    verbose: bool,
    input: PathBuf,
    options: Option<PathBuf>,
    output: PathBuf,
    engine: EngineArgs,
    format: OutputFormat,
) -> ExitCode {
    let result = render_html(
        config_path.as_deref(),
        verbose,
        &input,
        options.as_deref(),
        &output,
        &engine,
    )
    .await;
    finish(result, format)
}

/// Run the url command.
pub async fn run_url(
    config_path: Option<PathBuf>,
    verbose: bool,
    url: String,
    output: PathBuf,
    engine: EngineArgs,
    format: OutputFormat,
) -> ExitCode {
    let result = render_url(config_path.as_deref(), verbose, &url, &output, &engine).await;
    finish(result, format)
}

fn finish(result: Result<PressOutput, PressError>, format: OutputFormat) -> ExitCode {
    match result {
        Ok(body) => match write_output(&body, format) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => render_error(err.into(), format),
        },
        Err(err) => render_error(err, format),
    }
}

async fn render_html(
    config_path: Option<&Path>,
    verbose: bool,
    input: &Path,
    options: Option<&Path>,
    output: &Path,
    engine: &EngineArgs,
) -> Result<PressOutput, PressError> {
    let mut config = load_config(config_path)?;
    apply_engine_args(&mut config, engine, SourceKind::Html)?;

    let html = read_input(input).await?;
    let raw = match options {
        Some(path) => {
            let text = tokio::fs::read_to_string(path).await?;
            serde_json::from_str::<RawRenderOptions>(&text)?
        }
        None => RawRenderOptions::default(),
    };
    let page_format = normalize(&raw).format;

    let started = Instant::now();
    let artifact = render_source(
        config_path,
        &config,
        verbose,
        Source::Html {
            html: &html,
            raw: &raw,
        },
    )
    .await?;
    tokio::fs::write(output, artifact.bytes()).await?;

    Ok(summary(
        SourceKind::Html,
        input.display().to_string(),
        output,
        &artifact,
        Some(page_format),
        started,
    ))
}

async fn render_url(
    config_path: Option<&Path>,
    verbose: bool,
    url: &str,
    output: &Path,
    engine: &EngineArgs,
) -> Result<PressOutput, PressError> {
    let mut config = load_config(config_path)?;
    apply_engine_args(&mut config, engine, SourceKind::Url)?;

    let started = Instant::now();
    let artifact = render_source(config_path, &config, verbose, Source::Url(url)).await?;
    tokio::fs::write(output, artifact.bytes()).await?;

    Ok(summary(
        SourceKind::Url,
        url.to_string(),
        output,
        &artifact,
        None,
        started,
    ))
}

async fn read_input(input: &Path) -> Result<String, PressError> {
    if input == Path::new("-") {
        let mut html = String::new();
        tokio::io::stdin().read_to_string(&mut html).await?;
        Ok(html)
    } else {
        Ok(tokio::fs::read_to_string(input).await?)
    }
}

/// Picks the engine (mock, bounded Chromium or plain Chromium) and renders.
async fn render_source(
    config_path: Option<&Path>,
    config: &Config,
    verbose: bool,
    source: Source<'_>,
) -> Result<RenderArtifact, PressError> {
    let mock = mock_script()?;
    if verbose {
        log_effective_config(config_path, config, mock.is_some());
    }
    let observer = job_observer(verbose);

    let result = match mock {
        Some(script) => render_with(ScriptedSessions::new(script), config, observer, source).await,
        None => {
            let sessions = ChromiumSessions::new(LaunchOptions::from(&config.launch));
            match config.launch.max_concurrent_sessions {
                Some(max) => {
                    render_with(BoundedSessions::new(sessions, max), config, observer, source)
                        .await
                }
                None => render_with(sessions, config, observer, source).await,
            }
        }
    };
    Ok(result?)
}

async fn render_with<M: SessionManager>(
    sessions: M,
    config: &Config,
    observer: Arc<dyn JobObserver>,
    source: Source<'_>,
) -> Result<RenderArtifact, JobError> {
    let renderer = Renderer::new(sessions, config).with_observer(observer);
    match source {
        Source::Html { html, raw } => renderer.render_from_html(html, raw).await,
        Source::Url(url) => renderer.render_from_url(url).await,
    }
}

fn job_observer(verbose: bool) -> Arc<dyn JobObserver> {
    if verbose {
        let progress = ProgressObserver::new(Arc::new(|line: &str| eprintln!("{line}")));
        Arc::new(Observers::new(vec![
            Arc::new(TracingObserver),
            Arc::new(progress),
        ]))
    } else {
        Arc::new(TracingObserver)
    }
}

fn summary(
    kind: SourceKind,
    value: String,
    output: &Path,
    artifact: &RenderArtifact,
    format: Option<pagepress_lib::PageFormat>,
    started: Instant,
) -> PressOutput {
    PressOutput::Render(RenderOutput {
        version: OUTPUT_VERSION.to_string(),
        source: SourceDescriptor { kind, value },
        output_path: output.to_path_buf(),
        bytes: artifact.len(),
        media_type: artifact.media_type().to_string(),
        format,
        elapsed_ms: started.elapsed().as_millis() as u64,
    })
}
