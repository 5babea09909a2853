//! PDF export.
//!
//! Prints the settled page with the job's options. A hung print is cut off at
//! the export timeout and an empty document counts as a failure.

use std::time::Duration;
use tokio::time::timeout;

use crate::browser::{BrowserSession, PrintParams};
use crate::options::RenderOptions;
use crate::EngineError;

/// A rendered PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderArtifact {
    bytes: Vec<u8>,
}

impl RenderArtifact {
    pub const MEDIA_TYPE: &'static str = "application/pdf";

    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn media_type(&self) -> &'static str {
        Self::MEDIA_TYPE
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Prints the loaded page with `options`, giving up after `export_timeout`.
pub async fn export<S>(
    session: &mut S,
    options: &RenderOptions,
    export_timeout: Duration,
) -> Result<RenderArtifact, EngineError>
where
    S: BrowserSession + ?Sized,
{
    let params = PrintParams::from(options);
    let bytes = timeout(export_timeout, session.print_pdf(&params))
        .await
        .map_err(|_| EngineError::timeout("PDF export", export_timeout))??;
    if bytes.is_empty() {
        return Err(EngineError::EmptyOutput);
    }
    Ok(RenderArtifact::new(bytes))
}
