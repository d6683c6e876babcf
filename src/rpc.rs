use crate::orchestrator::JobEvent;
use crate::progress::ProgressEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;


#[derive(Serialize, Deserialize, Debug)]
pub struct RpcRequest {
    #[serde(default = "new_id")]       // UIs that don't track ids get one assigned
    pub id: String,                    // Echoed on the response and on every event of the job
    pub method: String,                // "requestInfo", "requestDownload", "ping", "shutdown"
    #[serde(default)]                  // If params is missing in JSON, use default (null)
    pub params: serde_json::Value,     // Method-specific input
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RpcResponse<T> {
    pub id: String,     // Same ID as the request
    pub result: T,      // Acknowledgement payload; job outcomes arrive later as events
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RpcError {
    pub id: String,      // Same ID as the request that failed
    pub error: String,   // Human-readable reason the request was not accepted
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Accepted {
    pub accepted: bool,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase")]  // JSON will have an "event" field indicating the type
pub enum RpcEvent {
    // Download progress; percent is None when the extractor's text was unreadable
    #[serde(rename_all = "camelCase")]
    Progress {
        id: String,
        phase: String,           // "downloading" | "processing"
        percent: Option<f64>,    // Raw percentage, unclamped
        bar: Option<u8>,         // Clamped whole percent for a progress bar
        status: String,          // "Downloading: 45.2%"
    },
    // Formats are known; the UI can offer resolutions
    #[serde(rename_all = "camelCase")]
    InfoReady {
        id: String,
        title: String,
        resolutions: Vec<u32>,   // Highest first
        labels: Vec<String>,     // "1080p", "720p", ...
    },
    // Terminal outcome of one phase, sent exactly once
    Result {
        id: String,
        success: bool,
        message: String,
    },
}

impl RpcEvent {
    pub fn from_job(id: &str, event: JobEvent) -> Self {
        match event {
            JobEvent::Progress(p) => RpcEvent::Progress {
                id: id.into(),
                phase: match p {
                    ProgressEvent::Downloading { .. } => "downloading".into(),
                    ProgressEvent::Processing => "processing".into(),
                },
                percent: match p {
                    ProgressEvent::Downloading { percent } => percent,
                    ProgressEvent::Processing => None,
                },
                bar: p.display_percent(),
                status: p.label(),
            },
            JobEvent::InfoReady { title, resolutions } => RpcEvent::InfoReady {
                id: id.into(),
                title,
                labels: resolutions.labels(),
                resolutions: resolutions.as_slice().to_vec(),
            },
            JobEvent::Result(r) => RpcEvent::Result {
                id: id.into(),
                success: r.success,
                message: r.message,
            },
        }
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
