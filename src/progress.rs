use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Marker leading every progress line the extractor prints for us.
pub const PROGRESS_MARKER: &str = "tubefetch";

/// Template passed as `--progress-template`; lines come back as
/// `tubefetch|<status>|<percent>`.
pub fn progress_template() -> String {
    format!("download:{PROGRESS_MARKER}|%(progress.status)s|%(progress._percent_str)s")
}

/// Progress as the extractor reports it, before normalization.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawProgress {
    pub status: String,          // "downloading", "finished", "error", ...
    pub percent: Option<String>, // e.g. "\x1b[0;94m 45.2%\x1b[0m"
}

impl RawProgress {
    pub fn new(status: impl Into<String>, percent: Option<&str>) -> Self {
        RawProgress { status: status.into(), percent: percent.map(|s| s.to_string()) }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum ProgressEvent {
    /// Percent is None when the extractor's text could not be read as a number.
    Downloading { percent: Option<f64> },
    /// Download done, the extractor is merging/post-processing.
    Processing,
}

impl ProgressEvent {
    /// Whole percent for a progress bar, clamped into 0..=100.
    pub fn display_percent(&self) -> Option<u8> {
        match self {
            ProgressEvent::Downloading { percent } => percent.map(|p| p.clamp(0.0, 100.0) as u8),
            ProgressEvent::Processing => Some(100),
        }
    }

    /// Status text shown under the progress bar.
    pub fn label(&self) -> String {
        match self {
            ProgressEvent::Downloading { percent: Some(p) } => format!("Downloading: {}%", p),
            ProgressEvent::Downloading { percent: None } => "Downloading...".to_string(),
            ProgressEvent::Processing => "Processing downloaded file...".to_string(),
        }
    }
}

fn ansi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid ANSI pattern"))
}

pub fn strip_ansi(s: &str) -> String {
    ansi_re().replace_all(s, "").into_owned()
}

/// Read a percent string like `" 45.2%"`, with or without color codes.
pub fn parse_percent(s: &str) -> Option<f64> {
    let cleaned = strip_ansi(s);
    let number = cleaned.trim().trim_end_matches('%').trim();
    number.parse::<f64>().ok().filter(|p| !p.is_nan())
}

/// Map a raw progress report to the signal the UI consumes.
/// Unknown statuses produce nothing.
pub fn normalize(raw: &RawProgress) -> Option<ProgressEvent> {
    match raw.status.as_str() {
        "downloading" => Some(ProgressEvent::Downloading {
            percent: raw.percent.as_deref().and_then(parse_percent),
        }),
        "finished" => Some(ProgressEvent::Processing),
        _ => None,
    }
}

/// Parse one line of extractor output produced by [`progress_template`].
pub fn parse_progress_line(line: &str) -> Option<RawProgress> {
    let line = strip_ansi(line);
    let idx = line.find(PROGRESS_MARKER)?;
    let rest = line[idx + PROGRESS_MARKER.len()..].strip_prefix('|')?;

    let mut parts = rest.splitn(2, '|');
    let status = parts.next()?.trim();
    if status.is_empty() {
        return None;
    }
    let percent = parts.next().map(str::trim).filter(|p| !p.is_empty() && *p != "NA");
    Some(RawProgress::new(status, percent))
}
