use crate::error::{FetchError, FetchResult};
use crate::progress::{parse_progress_line, progress_template, RawProgress};
use crate::types::DownloadOptions;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tracing::{debug, trace};

/// The external tool that reads video metadata and performs downloads.
pub trait Extractor: Send + Sync {
    /// Full metadata dictionary for `url`, without downloading anything.
    fn extract_info(
        &self,
        url: &str,
        ffmpeg_directory: &Path,
    ) -> impl Future<Output = FetchResult<serde_json::Value>> + Send;

    /// Download `url`, reporting progress through `on_progress` until done.
    fn download(
        &self,
        url: &str,
        opts: &DownloadOptions,
        on_progress: &mut (dyn FnMut(RawProgress) + Send),
    ) -> impl Future<Output = FetchResult<()>> + Send;
}

/// yt-dlp driven as a subprocess.
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
}

impl YtDlp {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        YtDlp { binary: binary.into() }
    }

    /// Use `explicit` when given, otherwise look yt-dlp up on PATH.
    pub fn discover(explicit: Option<PathBuf>) -> FetchResult<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(FetchError::ExtractorUnavailable(format!("{} does not exist", path.display())));
            }
            return Ok(YtDlp::new(path));
        }
        let name = if cfg!(target_os = "windows") { "yt-dlp.exe" } else { "yt-dlp" };
        which::which(name)
            .map(YtDlp::new)
            .map_err(|e| FetchError::ExtractorUnavailable(e.to_string()))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self) -> TokioCommand {
        let mut cmd = TokioCommand::new(&self.binary);
        cmd.stdin(Stdio::null())
           .kill_on_drop(true);
        #[cfg(windows)]
        cmd.creation_flags(0x08000000); // CREATE_NO_WINDOW
        cmd
    }
}

/// Arguments for a metadata-only run.
pub fn info_args(url: &str, ffmpeg_directory: &Path) -> Vec<String> {
    vec![
        "-J".into(),                                           // Dump the info dictionary as JSON
        "--no-playlist".into(),                                // Only the video the URL points at
        "--no-warnings".into(),
        "--ffmpeg-location".into(), ffmpeg_directory.to_string_lossy().into_owned(),
        "--".into(), url.into(),
    ]
}

/// Arguments for a download run, mirroring the fields of `DownloadOptions`.
pub fn download_args(url: &str, opts: &DownloadOptions) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    if let Some(spec) = &opts.format {
        args.extend(["-f".into(), spec.to_string()]);
    }
    args.extend([
        "-o".into(), opts.output_path_template.clone(),
        "--merge-output-format".into(), opts.merge_output_format.clone(),
        "--ffmpeg-location".into(), opts.ffmpeg_directory.clone(),
        "--no-playlist".into(),
        "--newline".into(),                                    // One progress report per line
        "--progress-template".into(), progress_template(),
    ]);
    if opts.quiet {
        // --quiet alone would also silence the progress template
        args.extend(["--quiet".into(), "--progress".into(), "--no-warnings".into()]);
    }
    args.extend(["--".into(), url.into()]);
    args
}

/// yt-dlp prints its reason on the last stderr line ("ERROR: [youtube] ...: Video unavailable").
fn failure_text(stderr: &str, fallback: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or(fallback)
        .to_string()
}

/// Next line of child output with the line ending removed. yt-dlp writes in the
/// console codepage on some systems, so bytes are decoded lossily.
async fn read_lossy_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

impl Extractor for YtDlp {
    async fn extract_info(&self, url: &str, ffmpeg_directory: &Path) -> FetchResult<serde_json::Value> {
        let args = info_args(url, ffmpeg_directory);
        debug!(binary = %self.binary.display(), ?args, "running yt-dlp for info");

        let out = self.command()
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| FetchError::extraction(format!("Failed to execute yt-dlp: {}", e)))?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(FetchError::extraction(failure_text(&stderr, "yt-dlp failed")));
        }

        serde_json::from_slice(&out.stdout)
            .map_err(|e| FetchError::extraction(format!("Failed to parse yt-dlp response: {}", e)))
    }

    async fn download(
        &self,
        url: &str,
        opts: &DownloadOptions,
        on_progress: &mut (dyn FnMut(RawProgress) + Send),
    ) -> FetchResult<()> {
        let args = download_args(url, opts);
        debug!(binary = %self.binary.display(), ?args, "running yt-dlp download");

        let mut child = self.command()
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FetchError::extraction(format!("Failed to execute yt-dlp: {}", e)))?;

        let stdout = child.stdout.take()
            .ok_or_else(|| FetchError::extraction("yt-dlp stdout unavailable"))?;
        let stderr = child.stderr.take()
            .ok_or_else(|| FetchError::extraction("yt-dlp stderr unavailable"))?;

        // Drain stderr concurrently so a chatty child never blocks on a full pipe
        let stderr_task = tokio::spawn(async move {
            let mut collected = String::new();
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            while let Ok(Some(line)) = read_lossy_line(&mut reader, &mut buf).await {
                trace!(target: "tubefetch::yt_dlp", "{}", line);
                collected.push_str(&line);
                collected.push('\n');
            }
            collected
        });

        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        while let Some(line) = read_lossy_line(&mut reader, &mut buf).await? {
            match parse_progress_line(&line) {
                Some(raw) => on_progress(raw),
                None => trace!(target: "tubefetch::yt_dlp", "{}", line),
            }
        }

        let status = child.wait().await?;
        let stderr_text = stderr_task.await.unwrap_or_default();
        if !status.success() {
            return Err(FetchError::extraction(failure_text(&stderr_text, "yt-dlp download failed")));
        }
        Ok(())
    }
}
