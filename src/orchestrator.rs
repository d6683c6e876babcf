//! One fetch job: look up formats for a URL, then optionally download it.
//!
//! Every phase ends in exactly one [`JobEvent::Result`]; failures never escape
//! as errors. A download is only possible after a successful info fetch.

use crate::catalog::build_catalog;
use crate::error::{FetchError, FetchResult};
use crate::extractor::Extractor;
use crate::locator::{locate, LocateContext};
use crate::naming::{clean_url, output_template, sanitize_title};
use crate::progress::{normalize, ProgressEvent, RawProgress};
use crate::selector::build_spec;
use crate::types::{DownloadOptions, JobResult, ResolutionList, VideoInfo};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

pub const INFO_OK: &str = "Video information retrieved successfully";
pub const DOWNLOAD_OK: &str = "Download completed successfully!";

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum JobState {
    Idle,
    FetchingInfo,
    InfoReady,
    Downloading,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Progress(ProgressEvent),
    InfoReady { title: String, resolutions: ResolutionList },
    Result(JobResult),
}

/// What a successful info fetch leaves behind for the download phase.
#[derive(Debug, Clone)]
struct Session {
    info: VideoInfo,
    destination_dir: PathBuf,
    resolutions: ResolutionList,
}

pub struct Orchestrator<E> {
    extractor: E,
    locate_ctx: LocateContext,
    quiet: bool,
    state: JobState,
    session: Option<Session>,
}

impl<E: Extractor> Orchestrator<E> {
    pub fn new(extractor: E, locate_ctx: LocateContext) -> Self {
        Orchestrator {
            extractor,
            locate_ctx,
            quiet: true,
            state: JobState::Idle,
            session: None,
        }
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn video_info(&self) -> Option<&VideoInfo> {
        self.session.as_ref().map(|s| &s.info)
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Fetch metadata for `url` and emit the resolutions it offers.
    pub async fn request_info(
        &mut self,
        url: &str,
        destination_dir: &str,
        mut emit: impl FnMut(JobEvent) + Send,
    ) -> JobResult {
        let result = match self.fetch_info(url, destination_dir, &mut emit).await {
            Ok(()) => {
                self.state = JobState::InfoReady;
                JobResult::ok(INFO_OK)
            }
            Err(e) => self.fail(e),
        };
        emit(JobEvent::Result(result.clone()));
        result
    }

    /// Download the previously inspected video at `selected_height` (None = best).
    pub async fn request_download(
        &mut self,
        selected_height: Option<u32>,
        output_title: &str,
        mut emit: impl FnMut(JobEvent) + Send,
    ) -> JobResult {
        let result = match self.download(selected_height, output_title, &mut emit).await {
            Ok(()) => {
                self.state = JobState::Succeeded;
                self.session = None;
                JobResult::ok(DOWNLOAD_OK)
            }
            Err(e) => self.fail(e),
        };
        emit(JobEvent::Result(result.clone()));
        result
    }

    fn fail(&mut self, e: FetchError) -> JobResult {
        if e.is_user_error() {
            // Rejected before anything ran; the job stays where it was
            warn!(error = %e, "request rejected");
            return JobResult::failed(e.to_string());
        }
        warn!(error = %e, state = ?self.state, "job phase failed");
        if self.state == JobState::FetchingInfo {
            self.session = None;
        }
        self.state = JobState::Failed;
        JobResult::failed(format!("Error: {}", e))
    }

    async fn fetch_info(
        &mut self,
        url: &str,
        destination_dir: &str,
        emit: &mut (impl FnMut(JobEvent) + Send),
    ) -> FetchResult<()> {
        let url = clean_url(url);
        if url.is_empty() {
            return Err(FetchError::invalid("Please enter a video URL"));
        }
        let destination_dir = destination_dir.trim();
        if destination_dir.is_empty() {
            return Err(FetchError::invalid("Please select a download location"));
        }

        self.state = JobState::FetchingInfo;
        self.session = None;
        info!(%url, "fetching video info");

        let ffmpeg = locate(&self.locate_ctx)?;
        let raw = self.extractor.extract_info(&url, &ffmpeg.directory()).await?;

        let info = VideoInfo::from_value(&url, &raw);
        let resolutions = build_catalog(&info.formats);
        info!(title = %info.title, formats = info.formats.len(), resolutions = ?resolutions.as_slice(), "video info ready");

        emit(JobEvent::InfoReady {
            title: info.title.clone(),
            resolutions: resolutions.clone(),
        });
        self.session = Some(Session {
            info,
            destination_dir: PathBuf::from(destination_dir),
            resolutions,
        });
        Ok(())
    }

    async fn download(
        &mut self,
        selected_height: Option<u32>,
        output_title: &str,
        emit: &mut (impl FnMut(JobEvent) + Send),
    ) -> FetchResult<()> {
        let session = self
            .session
            .clone()
            .ok_or_else(|| FetchError::invalid("Please check formats first"))?;

        if let Some(h) = selected_height {
            if !session.resolutions.contains(h) {
                warn!(height = h, "requested height was not offered, extractor will fall back");
            }
        }

        let mut stem = sanitize_title(output_title);
        if stem.is_empty() {
            stem = sanitize_title(&session.info.title);
        }
        if stem.is_empty() {
            // Let the extractor name the file after the video
            stem = "%(title)s".to_string();
        }

        self.state = JobState::Downloading;
        let ffmpeg = locate(&self.locate_ctx)?;

        let output_path_template = if stem == "%(title)s" {
            session.destination_dir.join("%(title)s.%(ext)s").to_string_lossy().into_owned()
        } else {
            output_template(&session.destination_dir, &stem)
        };
        let opts = DownloadOptions {
            format: Some(build_spec(selected_height)),
            output_path_template,
            merge_output_format: "mp4".to_string(),
            ffmpeg_directory: ffmpeg.directory().to_string_lossy().into_owned(),
            quiet: self.quiet,
        };
        info!(url = %session.info.url, format = ?opts.format, output = %opts.output_path_template, "starting download");

        let mut on_progress = |raw: RawProgress| {
            if let Some(event) = normalize(&raw) {
                emit(JobEvent::Progress(event));
            }
        };
        self.extractor.download(&session.info.url, &opts, &mut on_progress).await
    }
}
