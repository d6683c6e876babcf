use crate::catalog::H264_PREFIXES;
use crate::types::StreamSpec;

/// Audio half of every merged selection.
const AUDIO: &str = "bestaudio[ext=m4a]";

/// Filter restricting video to the same codec family the catalog offers.
fn codec_filter() -> String {
    format!("[vcodec~='^({})']", H264_PREFIXES.join("|"))
}

/// Build the extractor's format expression for a chosen height, or for the best
/// available H.264 stream when `selected` is None.
///
/// The exact-height video+audio merge is tried first; the fallback after `/`
/// takes the best single stream at or below that height.
pub fn build_spec(selected: Option<u32>) -> StreamSpec {
    let codec = codec_filter();
    let expr = match selected {
        Some(h) => format!(
            "bestvideo[height={h}]{codec}+{AUDIO}/best[height<={h}]{codec}"
        ),
        None => format!("bestvideo{codec}+{AUDIO}/best{codec}"),
    };
    StreamSpec(expr)
}
