use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::process::ExitCode;

use pagepress_lib::{
    ErrorOutput, JobErrorKind, PressError, PressOutput, SourceKind, OUTPUT_VERSION,
};

use crate::cli::OutputFormat;

/// Write a summary in the requested format to stdout.
pub fn write_output(body: &PressOutput, format: OutputFormat) -> Result<(), serde_json::Error> {
    let content = match format {
        OutputFormat::Json => serde_json::to_string(body)?,
        OutputFormat::Pretty if io::stdout().is_terminal() => format_pretty(body, true),
        // Non-tty: keep JSON shape for pipelines.
        OutputFormat::Pretty => serde_json::to_string_pretty(body)?,
    };
    println!("{content}");
    Ok(())
}

/// Render an error and return the appropriate exit code.
pub fn render_error(err: PressError, format: OutputFormat) -> ExitCode {
    let code = exit_code_for(&err);
    let error_payload = err.to_payload();
    let payload = PressOutput::Error(ErrorOutput {
        version: OUTPUT_VERSION.to_string(),
        message: Some(error_payload.message.clone()),
        error: error_payload,
    });

    if let Err(write_err) = write_output(&payload, format) {
        eprintln!("Failed to write error output: {}", write_err);
        println!("{{\"mode\":\"error\"}}");
    }
    code
}

/// 2: bad request or config, 3: transport or remote status, 4: engine failure.
pub fn exit_code_for(err: &PressError) -> ExitCode {
    match err {
        PressError::Job(job) => match job.kind {
            JobErrorKind::BadRequest => ExitCode::from(2),
            JobErrorKind::Transport | JobErrorKind::RemoteStatus(_) => ExitCode::from(3),
            JobErrorKind::LaunchFailure | JobErrorKind::ExportFailure => ExitCode::from(4),
        },
        PressError::Io(_) | PressError::Serialization(_) | PressError::Config(_) => {
            ExitCode::from(2)
        }
    }
}

/// Format output for human consumption in a terminal.
pub fn format_pretty(body: &PressOutput, colorize: bool) -> String {
    let mut buf = String::new();
    match body {
        PressOutput::Render(out) => {
            let header = color("[PDF]", "32", colorize);
            let kind = match out.source.kind {
                SourceKind::Html => "html",
                SourceKind::Url => "url",
            };
            writeln!(buf, "{} {}", header, out.output_path.display()).ok();
            writeln!(buf, "Source: {} ({})", out.source.value, kind).ok();
            writeln!(
                buf,
                "Size: {} bytes ({}), {:.1}s",
                out.bytes,
                out.media_type,
                out.elapsed_ms as f64 / 1000.0
            )
            .ok();
            if let Some(format) = out.format {
                writeln!(buf, "Page format: {format}").ok();
            }
        }
        PressOutput::Error(out) => {
            let header = color("[ERROR]", "31", colorize);
            let message = out
                .message
                .as_deref()
                .unwrap_or(out.error.message.as_str());
            writeln!(buf, "{} {}", header, message).ok();
            if let Some(status) = out.error.http_status {
                writeln!(buf, "HTTP status: {status}").ok();
            }
            if let Some(remediation) = &out.error.remediation {
                writeln!(buf, "Hint: {}", remediation).ok();
            }
        }
    }
    buf
}

/// Apply ANSI color codes when enabled.
fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}
