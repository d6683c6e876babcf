use crate::error::{FetchError, FetchResult};
use crate::locator::PackagingMode;
use std::path::PathBuf;

pub const ENV_YTDLP: &str = "TUBEFETCH_YTDLP";
pub const ENV_PACKAGING: &str = "TUBEFETCH_PACKAGING";
pub const ENV_VERBOSE: &str = "TUBEFETCH_VERBOSE";
pub const DEFAULT_LOG_FILTER: &str = "tubefetch=info";

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub ytdlp_path: Option<PathBuf>,     // Explicit yt-dlp binary; None searches PATH
    pub packaging: Option<PackagingMode>, // None auto-detects from the executable location
    pub quiet: bool,                      // Pass --quiet to yt-dlp downloads
    pub log_filter: String,               // tracing EnvFilter directive
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ytdlp_path: None,
            packaging: None,
            quiet: true,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> FetchResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source; blank values count as unset.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> FetchResult<Self> {
        let get = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Config::default();

        if let Some(path) = get(ENV_YTDLP) {
            config.ytdlp_path = Some(PathBuf::from(path));
        }

        if let Some(mode) = get(ENV_PACKAGING) {
            config.packaging = match mode.to_ascii_lowercase().as_str() {
                "auto" => None,
                other => Some(PackagingMode::parse(other).ok_or_else(|| {
                    FetchError::Config(format!("{} must be bundled, development or auto, got '{}'", ENV_PACKAGING, mode))
                })?),
            };
        }

        if let Some(verbose) = get(ENV_VERBOSE) {
            config.quiet = !matches!(verbose.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }

        if let Some(filter) = get("RUST_LOG") {
            config.log_filter = filter;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> FetchResult<Config> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(load(&[]).unwrap(), Config::default());
    }

    #[test]
    fn every_key_is_read() {
        let c = load(&[
            (ENV_YTDLP, "/opt/bin/yt-dlp"),
            (ENV_PACKAGING, "Development"),
            (ENV_VERBOSE, "true"),
            ("RUST_LOG", "tubefetch=debug"),
        ]).unwrap();
        assert_eq!(c.ytdlp_path, Some(PathBuf::from("/opt/bin/yt-dlp")));
        assert_eq!(c.packaging, Some(PackagingMode::Development));
        assert!(!c.quiet);
        assert_eq!(c.log_filter, "tubefetch=debug");
    }

    #[test]
    fn auto_and_blank_values_mean_unset() {
        let c = load(&[(ENV_PACKAGING, "auto"), (ENV_YTDLP, "  "), (ENV_VERBOSE, "0")]).unwrap();
        assert_eq!(c.packaging, None);
        assert_eq!(c.ytdlp_path, None);
        assert!(c.quiet);
    }

    #[test]
    fn unknown_packaging_is_rejected() {
        assert!(matches!(load(&[(ENV_PACKAGING, "frozen")]), Err(FetchError::Config(_))));
    }
}
