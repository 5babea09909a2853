use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ErrorPayload;
use crate::job::SourceKind;
use crate::options::PageFormat;

/// Schema version for output payloads.
pub const OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum PressOutput {
    Render(RenderOutput),
    Error(ErrorOutput),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    pub kind: SourceKind,
    /// Input file (`-` for stdin) or the requested URL.
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOutput {
    pub version: String,
    pub source: SourceDescriptor,
    pub output_path: PathBuf,
    pub bytes: usize,
    pub media_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<PageFormat>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub error: ErrorPayload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn render_output_serializes() {
        let output = PressOutput::Render(RenderOutput {
            version: OUTPUT_VERSION.to_string(),
            source: SourceDescriptor {
                kind: SourceKind::Url,
                value: "https://example.com/".to_string(),
            },
            output_path: PathBuf::from("out.pdf"),
            bytes: 1024,
            media_type: "application/pdf".to_string(),
            format: None,
            elapsed_ms: 812,
        });

        let json = serde_json::to_string(&output).expect("serialize render output");
        assert!(json.contains("\"mode\":\"render\""));
        assert!(json.contains("\"kind\":\"url\""));
        assert!(json.contains("\"mediaType\":\"application/pdf\""));
        assert!(json.contains("\"outputPath\":\"out.pdf\""));
        assert!(!json.contains("\"format\""));
    }

    #[test]
    fn error_output_serializes_http_status() {
        let mut error = ErrorPayload::new(
            ErrorCategory::Remote,
            "Remote page answered with HTTP 404".to_string(),
            "verify the URL",
        );
        error.http_status = Some(404);
        let output = PressOutput::Error(ErrorOutput {
            version: OUTPUT_VERSION.to_string(),
            message: None,
            error,
        });

        let json = serde_json::to_string(&output).expect("serialize error output");
        assert!(json.contains("\"mode\":\"error\""));
        assert!(json.contains("\"category\":\"remote\""));
        assert!(json.contains("\"httpStatus\":404"));
    }
}
