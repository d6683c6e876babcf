//! tubefetch sidecar: JSON-lines requests on stdin, responses and events on stdout.
//! Logs go to stderr so they never interleave with the protocol.

use anyhow::Context;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tubefetch::config::{Config, DEFAULT_LOG_FILTER};
use tubefetch::rpc::{Accepted, RpcError, RpcEvent, RpcRequest, RpcResponse};
use tubefetch::types::{RequestDownloadParams, RequestInfoParams};
use tubefetch::{Command, Extractor, LocateContext, Orchestrator, Worker, YtDlp};

type Outbox = mpsc::UnboundedSender<String>;

fn send(out: &Outbox, msg: &impl Serialize) {
    match serde_json::to_string(msg) {
        Ok(line) => {
            // Receiver only goes away during shutdown
            let _ = out.send(line);
        }
        Err(e) => error!(error = %e, "failed to serialize outgoing message"),
    }
}

fn reject(out: &Outbox, id: String, error: String) {
    warn!(%id, %error, "request rejected");
    send(out, &RpcError { id, error });
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Handle one request. Returns false when the sidecar should stop reading.
fn dispatch<E: Extractor + 'static>(worker: &Worker<E>, out: &Outbox, req: RpcRequest) -> bool {
    let RpcRequest { id, method, params } = req;
    let params = if params.is_null() { serde_json::json!({}) } else { params };

    let command = match method.as_str() {
        "ping" => {
            send(out, &RpcResponse { id, result: serde_json::json!({ "pong": true, "busy": worker.is_busy() }) });
            return true;
        }
        "shutdown" => {
            send(out, &RpcResponse { id, result: Accepted { accepted: true } });
            return false;
        }
        "requestInfo" => match serde_json::from_value::<RequestInfoParams>(params) {
            Ok(p) => Command::Info { url: p.url, destination_dir: p.destination_dir },
            Err(e) => {
                reject(out, id, format!("Invalid params: {}", e));
                return true;
            }
        },
        "requestDownload" => match serde_json::from_value::<RequestDownloadParams>(params) {
            Ok(p) => Command::Download { selected_height: p.selected_height, output_title: p.output_title },
            Err(e) => {
                reject(out, id, format!("Invalid params: {}", e));
                return true;
            }
        },
        other => {
            reject(out, id, format!("Unknown method: {}", other));
            return true;
        }
    };

    match worker.begin() {
        Ok(permit) => {
            // Ack first so it always precedes the job's events
            send(out, &RpcResponse { id: id.clone(), result: Accepted { accepted: true } });
            let events = out.clone();
            let event_id = id.clone();
            permit.spawn(id, command, move |ev| send(&events, &RpcEvent::from_job(&event_id, ev)));
        }
        Err(e) => reject(out, id, e.to_string()),
    }
    true
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config);
    info!(version = env!("CARGO_PKG_VERSION"), "tubefetch starting");

    let ctx = LocateContext::detect(config.packaging)
        .context("failed to inspect the running executable")?;
    let extractor = YtDlp::discover(config.ytdlp_path.clone())
        .context("yt-dlp is required")?;
    info!(ytdlp = %extractor.binary().display(), mode = ?ctx.mode, platform = ?ctx.platform, "ready");

    let worker = Worker::new(Orchestrator::new(extractor, ctx).with_quiet(config.quiet));

    let (out, mut outbox) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = outbox.recv().await {
            let written = async {
                stdout.write_all(line.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await
            };
            if let Err(e) = written.await {
                error!(error = %e, "stdout closed");
                break;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let req: RpcRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                reject(&out, String::new(), format!("Invalid request: {}", e));
                continue;
            }
        };
        if !dispatch(&worker, &out, req) {
            break;
        }
    }

    // A running phase keeps its own sender and is allowed to finish
    drop(out);
    let _ = writer.await;
    info!("tubefetch stopped");
    Ok(())
}
