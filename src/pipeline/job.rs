//! Background render jobs.
//!
//! [`start_render`] moves a [`RenderSession`] onto its own thread and hands
//! back a [`RenderJob`]. Progress and the terminal outcome arrive as
//! [`RenderEvent`]s on a channel so a UI can poll without blocking.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use super::{PipelineError, RenderOutcome, RenderProgress, RenderSession};

/// Terminal state as carried on the event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderSummary {
    Completed(PathBuf),
    Cancelled,
    Failed(String),
}

impl From<&RenderOutcome> for RenderSummary {
    fn from(outcome: &RenderOutcome) -> Self {
        match outcome {
            RenderOutcome::Completed(path) => RenderSummary::Completed(path.clone()),
            RenderOutcome::Cancelled => RenderSummary::Cancelled,
            RenderOutcome::Failed(e) => RenderSummary::Failed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    Progress(RenderProgress),
    /// Always the last event of a job.
    Finished(RenderSummary),
}

/// Handle to a render running on a worker thread.
///
/// Dropping the handle cancels the render and waits for the worker.
pub struct RenderJob {
    cancel: Arc<AtomicBool>,
    events: Receiver<RenderEvent>,
    handle: Option<JoinHandle<RenderOutcome>>,
}

/// Start rendering `session` to `output` in the background.
///
/// `bounded` turns the render into a preview of that many seconds; see
/// [`RenderSession::limit_duration`].
pub fn start_render(
    mut session: RenderSession,
    output: impl Into<PathBuf>,
    bounded: Option<f64>,
) -> Result<RenderJob, PipelineError> {
    if let Some(seconds) = bounded {
        session.limit_duration(seconds)?;
    }
    RenderJob::spawn(session, output.into())
}

impl RenderJob {
    fn spawn(mut session: RenderSession, output: PathBuf) -> Result<Self, PipelineError> {
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, events) = crossbeam_channel::unbounded();
        let worker_cancel = Arc::clone(&cancel);

        let handle = thread::Builder::new()
            .name("render".to_string())
            .spawn(move || run(&mut session, &output, &worker_cancel, &tx))
            .map_err(PipelineError::Thread)?;

        Ok(Self {
            cancel,
            events,
            handle: Some(handle),
        })
    }

    /// Request cancellation; observed before the next frame.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> &Receiver<RenderEvent> {
        &self.events
    }

    /// Whether the worker thread has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Wait for the worker and return its outcome.
    pub fn join(mut self) -> RenderOutcome {
        self.wait()
    }

    fn wait(&mut self) -> RenderOutcome {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .unwrap_or(RenderOutcome::Failed(PipelineError::WorkerPanicked)),
            None => RenderOutcome::Failed(PipelineError::WorkerPanicked),
        }
    }
}

impl Drop for RenderJob {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel();
            let _ = self.wait();
        }
    }
}

fn run(
    session: &mut RenderSession,
    output: &std::path::Path,
    cancel: &AtomicBool,
    tx: &Sender<RenderEvent>,
) -> RenderOutcome {
    let outcome = session.render_cancellable(output, cancel, |progress| {
        let _ = tx.send(RenderEvent::Progress(progress));
    });
    let _ = tx.send(RenderEvent::Finished(RenderSummary::from(&outcome)));
    outcome
}
