//! Render option normalization.
//!
//! Callers submit a loose option bag (form fields or JSON). [`normalize`]
//! turns it into a fully-defaulted [`RenderOptions`] and never fails: any
//! missing, zero, empty or unparseable value falls back to its default.

use serde::{Deserialize, Serialize};
use std::fmt;

const CSS_PX_PER_INCH: f64 = 96.0;
const CM_PER_INCH: f64 = 2.54;
const MM_PER_INCH: f64 = 25.4;

/// Smallest and largest scale factor the print engine accepts.
pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 2.0;

/// A single value as it arrives from a form or JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl LooseValue {
    /// Falsy in the form-submission sense: `false`, `0`, `""`, `null`, and
    /// anything that is not a scalar.
    pub fn is_falsy(&self) -> bool {
        match self {
            LooseValue::Bool(b) => !b,
            LooseValue::Number(n) => *n == 0.0 || n.is_nan(),
            LooseValue::Text(s) => s.trim().is_empty(),
            LooseValue::Other(_) => true,
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            LooseValue::Text(s) => Some(s.trim()),
            _ => None,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            LooseValue::Number(n) => Some(*n),
            LooseValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn is_truthy_flag(&self) -> bool {
        match self {
            LooseValue::Bool(b) => *b,
            LooseValue::Number(n) => *n == 1.0,
            LooseValue::Text(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "on" | "yes"
            ),
            LooseValue::Other(_) => false,
        }
    }
}

/// Partial option bag as submitted by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawRenderOptions {
    pub margin_top: Option<LooseValue>,
    pub margin_right: Option<LooseValue>,
    pub margin_bottom: Option<LooseValue>,
    pub margin_left: Option<LooseValue>,
    #[serde(alias = "pageFormat")]
    pub format: Option<LooseValue>,
    pub scale: Option<LooseValue>,
    pub header_template: Option<LooseValue>,
    pub footer_template: Option<LooseValue>,
    pub display_header_footer: Option<LooseValue>,
}

/// A print length, stored in inches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Length {
    inches: f64,
}

impl Length {
    pub const ZERO: Length = Length { inches: 0.0 };

    pub fn from_inches(inches: f64) -> Self {
        Self { inches }
    }

    pub fn from_px(px: f64) -> Self {
        Self::from_inches(px / CSS_PX_PER_INCH)
    }

    pub fn inches(&self) -> f64 {
        self.inches
    }

    /// Parses `"12px"`, `"1in"`, `"2.5cm"`, `"10mm"` or a unitless pixel count.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim().to_ascii_lowercase();
        let (number, divisor) = if let Some(n) = text.strip_suffix("px") {
            (n, CSS_PX_PER_INCH)
        } else if let Some(n) = text.strip_suffix("in") {
            (n, 1.0)
        } else if let Some(n) = text.strip_suffix("cm") {
            (n, CM_PER_INCH)
        } else if let Some(n) = text.strip_suffix("mm") {
            (n, MM_PER_INCH)
        } else {
            (text.as_str(), CSS_PX_PER_INCH)
        };
        let value: f64 = number.trim().parse().ok()?;
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        Some(Self::from_inches(value / divisor))
    }

    fn from_loose(value: Option<&LooseValue>) -> Self {
        match value {
            Some(v) if !v.is_falsy() => match v {
                LooseValue::Number(px) if px.is_finite() && *px > 0.0 => Self::from_px(*px),
                LooseValue::Text(s) => Self::parse(s).unwrap_or_default(),
                _ => Self::ZERO,
            },
            _ => Self::ZERO,
        }
    }
}

/// Paper sizes understood by the exporter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageFormat {
    Letter,
    Legal,
    Tabloid,
    Ledger,
    A0,
    A1,
    A2,
    A3,
    #[default]
    A4,
    A5,
    A6,
}

impl PageFormat {
    /// Paper `(width, height)` in inches, portrait orientation.
    pub fn paper_size(&self) -> (f64, f64) {
        match self {
            PageFormat::Letter => (8.5, 11.0),
            PageFormat::Legal => (8.5, 14.0),
            PageFormat::Tabloid => (11.0, 17.0),
            PageFormat::Ledger => (17.0, 11.0),
            PageFormat::A0 => (33.1, 46.8),
            PageFormat::A1 => (23.4, 33.1),
            PageFormat::A2 => (16.54, 23.4),
            PageFormat::A3 => (11.7, 16.54),
            PageFormat::A4 => (8.27, 11.7),
            PageFormat::A5 => (5.83, 8.27),
            PageFormat::A6 => (4.13, 5.83),
        }
    }

    /// Case-insensitive lookup; `None` for names we do not know.
    pub fn from_name(name: &str) -> Option<Self> {
        let format = match name.trim().to_ascii_lowercase().as_str() {
            "letter" => PageFormat::Letter,
            "legal" => PageFormat::Legal,
            "tabloid" => PageFormat::Tabloid,
            "ledger" => PageFormat::Ledger,
            "a0" => PageFormat::A0,
            "a1" => PageFormat::A1,
            "a2" => PageFormat::A2,
            "a3" => PageFormat::A3,
            "a4" => PageFormat::A4,
            "a5" => PageFormat::A5,
            "a6" => PageFormat::A6,
            _ => return None,
        };
        Some(format)
    }
}

impl fmt::Display for PageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Per-side print margins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: Length,
    pub right: Length,
    pub bottom: Length,
    pub left: Length,
}

/// Canonical, fully-defaulted rendering configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions {
    pub margins: Margins,
    pub format: PageFormat,
    pub scale: f64,
    pub header_template: String,
    pub footer_template: String,
    pub display_header_footer: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            margins: Margins::default(),
            format: PageFormat::A4,
            scale: 1.0,
            header_template: String::new(),
            footer_template: String::new(),
            display_header_footer: false,
        }
    }
}

/// Normalizes a raw option bag. Never fails.
pub fn normalize(raw: &RawRenderOptions) -> RenderOptions {
    let margins = Margins {
        top: Length::from_loose(raw.margin_top.as_ref()),
        right: Length::from_loose(raw.margin_right.as_ref()),
        bottom: Length::from_loose(raw.margin_bottom.as_ref()),
        left: Length::from_loose(raw.margin_left.as_ref()),
    };

    let format = raw
        .format
        .as_ref()
        .and_then(LooseValue::as_text)
        .and_then(PageFormat::from_name)
        .unwrap_or_default();

    let scale = raw
        .scale
        .as_ref()
        .filter(|v| !v.is_falsy())
        .and_then(LooseValue::as_number)
        .filter(|s| s.is_finite() && *s > 0.0)
        .map(|s| s.clamp(MIN_SCALE, MAX_SCALE))
        .unwrap_or(1.0);

    RenderOptions {
        margins,
        format,
        scale,
        header_template: template(raw.header_template.as_ref()),
        footer_template: template(raw.footer_template.as_ref()),
        display_header_footer: raw
            .display_header_footer
            .as_ref()
            .is_some_and(LooseValue::is_truthy_flag),
    }
}

fn template(value: Option<&LooseValue>) -> String {
    match value {
        Some(LooseValue::Text(s)) if !s.trim().is_empty() => s.clone(),
        _ => String::new(),
    }
}
