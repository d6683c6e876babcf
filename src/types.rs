use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of the extractor's raw `formats` list.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamFormat {
    pub format_id: Option<String>, // Extractor-specific id ("137", "hls-720p")
    pub video_codec: String,       // "avc1.64001f", "vp9", "none"; empty when absent
    pub height: Option<u32>,       // Vertical resolution; None or 0 for audio-only tracks
    pub ext: Option<String>,       // Container extension ("mp4", "m4a", "webm")
}

impl StreamFormat {
    /// Read a format from the extractor's untyped dictionary.
    /// Missing or mistyped fields degrade to their empty value instead of failing.
    pub fn from_value(v: &serde_json::Value) -> Option<Self> {
        let obj = v.as_object()?;

        let video_codec = obj.get("vcodec")
            .and_then(|x| x.as_str())
            .unwrap_or_default()
            .to_string();

        // yt-dlp reports integers, but some extractors hand back floats
        let height = obj.get("height").and_then(|x| {
            x.as_u64()
                .or_else(|| x.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                .and_then(|h| u32::try_from(h).ok())
        });

        let format_id = obj.get("format_id").and_then(|x| x.as_str()).map(|s| s.to_string());
        let ext = obj.get("ext").and_then(|x| x.as_str()).map(|s| s.to_string());

        Some(StreamFormat { format_id, video_codec, height, ext })
    }
}

/// Lift the `formats` array out of the extractor's info dictionary.
pub fn parse_formats(info: &serde_json::Value) -> Vec<StreamFormat> {
    info.get("formats")
        .and_then(|f| f.as_array())
        .map(|arr| arr.iter().filter_map(StreamFormat::from_value).collect())
        .unwrap_or_default()
}

/// Distinct vertical resolutions, highest first.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct ResolutionList(Vec<u32>);

impl ResolutionList {
    /// Callers must hand over a strictly descending sequence.
    pub(crate) fn from_descending(heights: Vec<u32>) -> Self {
        debug_assert!(heights.windows(2).all(|w| w[0] > w[1]));
        ResolutionList(heights)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, height: u32) -> bool {
        self.0.contains(&height)
    }

    /// Labels shown in the resolution picker ("1080p", "720p").
    pub fn labels(&self) -> Vec<String> {
        self.0.iter().map(|h| format!("{}p", h)).collect()
    }
}

/// Format-selection expression handed verbatim to the extractor.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct StreamSpec(pub(crate) String);

impl StreamSpec {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The part of the extractor's metadata kept between the info and download phases.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub title: String,              // Video title, "" when the extractor has none
    pub url: String,                // Cleaned URL the info was fetched for
    pub formats: Vec<StreamFormat>, // Raw format list
}

impl VideoInfo {
    pub fn from_value(url: &str, v: &serde_json::Value) -> Self {
        VideoInfo {
            title: v.get("title").and_then(|t| t.as_str()).unwrap_or_default().to_string(),
            url: url.to_string(),
            formats: parse_formats(v),
        }
    }
}

/// Terminal outcome of one job phase.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub success: bool,
    pub message: String,
}

impl JobResult {
    pub fn ok(message: impl Into<String>) -> Self {
        JobResult { success: true, message: message.into() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        JobResult { success: false, message: message.into() }
    }
}

/// Options record handed to the extractor for a download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOptions {
    pub format: Option<StreamSpec>,     // None lets the extractor pick
    pub output_path_template: String,   // "<dir>/<title>.%(ext)s"
    pub merge_output_format: String,    // Always "mp4"
    pub ffmpeg_directory: String,       // Directory holding the located ffmpeg
    pub quiet: bool,                    // Suppress extractor chatter (progress still reported)
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RequestInfoParams {
    pub url: String,             // Video page URL as pasted by the user
    pub destination_dir: String, // Directory the download will land in
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RequestDownloadParams {
    #[serde(default)]
    pub selected_height: Option<u32>, // One of the offered resolutions, or None for best
    #[serde(default)]
    pub output_title: String,         // File name without extension; empty uses the video title
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_reads_known_fields() {
        let f = StreamFormat::from_value(&json!({
            "format_id": "137", "vcodec": "avc1.640028", "height": 1080, "ext": "mp4"
        })).unwrap();
        assert_eq!(f.format_id.as_deref(), Some("137"));
        assert_eq!(f.video_codec, "avc1.640028");
        assert_eq!(f.height, Some(1080));
        assert_eq!(f.ext.as_deref(), Some("mp4"));
    }

    #[test]
    fn from_value_tolerates_nulls_and_floats() {
        let f = StreamFormat::from_value(&json!({ "vcodec": null, "height": 720.0 })).unwrap();
        assert_eq!(f.video_codec, "");
        assert_eq!(f.height, Some(720));

        let f = StreamFormat::from_value(&json!({ "vcodec": "avc1", "height": "tall" })).unwrap();
        assert_eq!(f.height, None);
    }

    #[test]
    fn parse_formats_skips_non_objects() {
        let info = json!({ "formats": [ {"vcodec": "avc1", "height": 360}, 42, "x", null ] });
        let formats = parse_formats(&info);
        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0].height, Some(360));
    }

    #[test]
    fn parse_formats_without_list_is_empty() {
        assert!(parse_formats(&json!({ "title": "no formats" })).is_empty());
    }

    #[test]
    fn video_info_defaults_missing_title() {
        let info = VideoInfo::from_value("https://example.com/v", &json!({ "formats": [] }));
        assert_eq!(info.title, "");
        assert_eq!(info.url, "https://example.com/v");
    }

    #[test]
    fn download_params_default_optional_fields() {
        let p: RequestDownloadParams = serde_json::from_value(json!({})).unwrap();
        assert_eq!(p.selected_height, None);
        assert_eq!(p.output_title, "");
    }
}
