//! Format lookup and download core for a desktop video grabber.
//!
//! The UI talks to this crate through the `tubefetch` sidecar binary (JSON
//! lines over stdio, see [`rpc`]). Extraction and downloading are delegated
//! to yt-dlp; muxing to the ffmpeg shipped alongside the app.

pub mod catalog;
pub mod config;
pub mod error;
pub mod extractor;
pub mod locator;
pub mod naming;
pub mod orchestrator;
pub mod progress;
pub mod rpc;
pub mod selector;
pub mod types;
pub mod worker;

pub use catalog::build_catalog;
pub use error::{FetchError, FetchResult};
pub use extractor::{Extractor, YtDlp};
pub use locator::{locate, ExecutablePath, LocateContext, PackagingMode, Platform};
pub use orchestrator::{JobEvent, JobState, Orchestrator};
pub use progress::{normalize, ProgressEvent, RawProgress};
pub use selector::build_spec;
pub use types::{JobResult, ResolutionList, StreamFormat, StreamSpec, VideoInfo};
pub use worker::{Command, Worker};
