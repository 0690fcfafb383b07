//! Intake worker: probes dropped files for their image dimensions.

use crate::formats;
use crate::worker::IntakeEvent;
use crate::worker::WorkerEvent;
use crate::worker::WorkerState;
use crate::worker::lock_unpoisoned;
use std::collections::VecDeque;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::mpsc::Sender;
use std::thread;
use std::thread::JoinHandle;
use tracing::debug;

/// Queue and lifecycle state, behind a single mutex so the drain-or-exit
/// decision and a racing submit can never disagree.
struct Inner {
    queue: VecDeque<PathBuf>,
    state: WorkerState,
}

pub(crate) struct Shared {
    inner: Mutex<Inner>,
    cancel: AtomicBool,
    events: Sender<WorkerEvent>,
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared").finish_non_exhaustive()
    }
}

impl Shared {
    pub(crate) fn request_cancel(&self) {
        let mut inner = lock_unpoisoned(&self.inner);
        if inner.state == WorkerState::Running {
            inner.state = WorkerState::CancelRequested;
            self.cancel.store(true, Ordering::Relaxed);
        }
    }
}

/// Background task that probes queued paths one at a time and reports each
/// outcome over the event channel.
///
/// Submissions coalesce: paths queued while a run is in flight join that run
/// instead of starting a second one, so observers see one `Done` per drain.
#[derive(Debug)]
pub struct IntakeWorker {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl IntakeWorker {
    #[must_use]
    pub fn new(events: Sender<WorkerEvent>) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    queue: VecDeque::new(),
                    state: WorkerState::Idle,
                }),
                cancel: AtomicBool::new(false),
                events,
            }),
            handle: None,
        }
    }

    /// Queue paths for probing. Returns true when this submission started a
    /// new run, false when it joined a run already in flight.
    pub fn submit(&mut self, paths: Vec<PathBuf>) -> bool {
        let mut inner = lock_unpoisoned(&self.shared.inner);
        inner.queue.extend(paths);
        if inner.state != WorkerState::Idle {
            return false;
        }
        inner.state = WorkerState::Running;
        self.shared.cancel.store(false, Ordering::Relaxed);
        drop(inner);

        let shared = Arc::clone(&self.shared);
        self.handle = Some(thread::spawn(move || run(&shared)));
        true
    }

    #[must_use]
    pub fn state(&self) -> WorkerState {
        lock_unpoisoned(&self.shared.inner).state
    }

    /// Ask the current run to stop after the in-flight item. No-op when idle;
    /// idempotent while a cancellation is already pending.
    pub fn request_cancel(&self) {
        self.shared.request_cancel();
    }

    pub(crate) fn shared(&self) -> Arc<Shared> {
        Arc::clone(&self.shared)
    }

    /// Wait for the most recent run's thread to finish.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(shared: &Shared) {
    loop {
        let next = {
            let mut inner = lock_unpoisoned(&shared.inner);
            if shared.cancel.load(Ordering::Relaxed) || inner.queue.is_empty() {
                // Queue is cleared on the way out so a cancelled run drops
                // whatever was still pending
                inner.queue.clear();
                inner.state = WorkerState::Idle;
                shared.cancel.store(false, Ordering::Relaxed);
                None
            } else {
                inner.queue.pop_front()
            }
        };
        let Some(path) = next else {
            break;
        };

        let _ = shared
            .events
            .send(WorkerEvent::Intake(IntakeEvent::Probing(path.clone())));
        match probe_dimensions(&path) {
            Ok((width, height)) => {
                let _ = shared.events.send(WorkerEvent::Intake(IntakeEvent::Probed {
                    path,
                    width,
                    height,
                }));
            }
            Err(e) => {
                debug!("Probe failed for {}: {}", path.display(), e);
                let _ = shared
                    .events
                    .send(WorkerEvent::Intake(IntakeEvent::Failed(path)));
            }
        }
    }

    let _ = shared.events.send(WorkerEvent::Intake(IntakeEvent::Done));
}

/// Read only as much of the file as is needed to learn its dimensions;
/// full pixel decode is deferred to the resize worker.
fn probe_dimensions(path: &Path) -> eyre::Result<(u32, u32)> {
    if !formats::is_resizable(path) {
        eyre::bail!("not a resizable image format: {}", path.display());
    }
    let reader = image::ImageReader::open(path)?.with_guessed_format()?;
    Ok(reader.into_dimensions()?)
}
