use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Longest file stem we hand to the extractor; leaves room for the extension.
const MAX_STEM_CHARS: usize = 200;

fn youtube_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})").expect("valid video id pattern"))
}

fn is_youtube(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.contains("youtube.com") || lower.contains("youtu.be")
}

/// Reduce a YouTube link to its bare watch URL, dropping playlist and tracking
/// parameters. Other URLs are returned trimmed but otherwise untouched.
pub fn clean_url(raw: &str) -> String {
    let url = raw.trim();
    if !is_youtube(url) {
        return url.to_string();
    }
    match youtube_id_re().captures(url).and_then(|c| c.get(1)) {
        Some(id) => format!("https://www.youtube.com/watch?v={}", id.as_str()),
        None => url.to_string(),
    }
}

/// Make a user-supplied title safe as a file stem on every platform.
///
/// Path separators, characters reserved on Windows and control characters
/// become `_`; trailing dots and spaces are dropped. May return an empty string.
pub fn sanitize_title(raw: &str) -> String {
    let replaced: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(MAX_STEM_CHARS)
        .collect();

    replaced.trim_end_matches(['.', ' ']).to_string()
}

/// Output template for the extractor: `<dir>/<stem>.%(ext)s`.
/// `%` in the stem is doubled so the extractor does not read it as a field.
pub fn output_template(destination_dir: &Path, stem: &str) -> String {
    let escaped = stem.replace('%', "%%");
    destination_dir
        .join(format!("{}.%(ext)s", escaped))
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playlist_parameters_are_dropped() {
        assert_eq!(
            clean_url(" https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL123&index=4 "),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert_eq!(clean_url("https://youtu.be/dQw4w9WgXcQ?t=42"), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(clean_url("https://www.youtube.com/shorts/dQw4w9WgXcQ"), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn other_urls_are_untouched() {
        let vimeo = "https://vimeo.com/channels/staffpicks/123456789";
        assert_eq!(clean_url(vimeo), vimeo);
        assert_eq!(clean_url("https://www.youtube.com/"), "https://www.youtube.com/");
    }

    #[test]
    fn separators_and_reserved_chars_are_replaced() {
        assert_eq!(sanitize_title("AC/DC: Live? <1991> \"Donington\""), "AC_DC_ Live_ _1991_ _Donington_");
        assert_eq!(sanitize_title("a\\b|c*d"), "a_b_c_d");
        assert_eq!(sanitize_title("tab\there"), "tab_here");
    }

    #[test]
    fn trailing_dots_and_blanks_are_trimmed() {
        assert_eq!(sanitize_title("  Wait for it...  "), "Wait for it");
        assert_eq!(sanitize_title(".."), "");
        assert_eq!(sanitize_title("   "), "");
    }

    #[test]
    fn long_titles_are_capped() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_title(&long).chars().count(), MAX_STEM_CHARS);
    }

    #[test]
    fn template_escapes_percent() {
        let t = output_template(Path::new("/home/u/Downloads"), "100% Pure");
        assert_eq!(t, "/home/u/Downloads/100%% Pure.%(ext)s");
    }
}
