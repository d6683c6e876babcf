use crate::types::{ResolutionList, StreamFormat};
use std::collections::BTreeSet;

/// Codec tags of the H.264 family as the extractor reports them.
pub const H264_PREFIXES: [&str; 2] = ["avc1", "h264"];

/// Case-sensitive, like the extractor's own codec strings.
pub fn is_h264(video_codec: &str) -> bool {
    H264_PREFIXES.iter().any(|p| video_codec.starts_with(p))
}

/// Heights of every H.264 video track, deduplicated, highest first.
pub fn build_catalog(formats: &[StreamFormat]) -> ResolutionList {
    let heights: BTreeSet<u32> = formats
        .iter()
        .filter(|f| is_h264(&f.video_codec))
        .filter_map(|f| f.height.filter(|h| *h > 0))
        .collect();

    ResolutionList::from_descending(heights.into_iter().rev().collect())
}
