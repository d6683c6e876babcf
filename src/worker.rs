use crate::error::{FetchError, FetchResult};
use crate::extractor::Extractor;
use crate::orchestrator::{JobEvent, Orchestrator};
use crate::types::JobResult;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{info_span, Instrument};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Info { url: String, destination_dir: String },
    Download { selected_height: Option<u32>, output_title: String },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Info { .. } => "info",
            Command::Download { .. } => "download",
        }
    }
}

/// Runs job phases in the background, one at a time.
pub struct Worker<E> {
    job: Arc<Mutex<Orchestrator<E>>>,
}

impl<E> Clone for Worker<E> {
    fn clone(&self) -> Self {
        Worker { job: Arc::clone(&self.job) }
    }
}

/// Exclusive right to run the next phase, held from acceptance until the phase ends.
pub struct JobPermit<E> {
    guard: OwnedMutexGuard<Orchestrator<E>>,
}

impl<E: Extractor + 'static> Worker<E> {
    pub fn new(orchestrator: Orchestrator<E>) -> Self {
        Worker { job: Arc::new(Mutex::new(orchestrator)) }
    }

    /// Claim the worker, or fail with `Busy` while a phase is still running.
    pub fn begin(&self) -> FetchResult<JobPermit<E>> {
        Arc::clone(&self.job)
            .try_lock_owned()
            .map(|guard| JobPermit { guard })
            .map_err(|_| FetchError::Busy)
    }

    pub fn is_busy(&self) -> bool {
        self.job.try_lock().is_err()
    }
}

impl<E: Extractor + 'static> JobPermit<E> {
    /// Run `command` on a background task. Events flow through `emit`; the
    /// handle resolves to the same result that was emitted last.
    pub fn spawn<F>(self, id: String, command: Command, emit: F) -> JoinHandle<JobResult>
    where
        F: FnMut(JobEvent) + Send + 'static,
    {
        let span = info_span!("job", %id, phase = command.name());
        let mut guard = self.guard;
        tokio::spawn(
            async move {
                match command {
                    Command::Info { url, destination_dir } => {
                        guard.request_info(&url, &destination_dir, emit).await
                    }
                    Command::Download { selected_height, output_title } => {
                        guard.request_download(selected_height, &output_title, emit).await
                    }
                }
            }
            .instrument(span),
        )
    }
}
