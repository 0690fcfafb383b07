//! Resize worker: decodes, rescales, and overwrites files in place.

use crate::worker::ResizeEvent;
use crate::worker::WorkerEvent;
use crate::worker::WorkerState;
use crate::worker::lock_unpoisoned;
use image::imageops::FilterType;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::mpsc::Sender;
use std::thread;
use std::thread::JoinHandle;
use tracing::warn;

/// One work item: the file and the exact dimensions to rewrite it at.
pub type ResizeItem = (PathBuf, (u32, u32));

pub(crate) struct Shared {
    state: Mutex<WorkerState>,
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
        let mut state = lock_unpoisoned(&self.state);
        if *state == WorkerState::Running {
            *state = WorkerState::CancelRequested;
            self.cancel.store(true, Ordering::Relaxed);
        }
    }
}

/// Background task that rewrites a snapshot of files at their target sizes.
///
/// Unlike intake there is no coalescing queue: the caller must only submit
/// while this worker is idle. The controller enforces that, plus the rule
/// that intake and resize never run at the same time; a submit while busy is
/// ignored with a warning rather than trusted.
#[derive(Debug)]
pub struct ResizeWorker {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl ResizeWorker {
    #[must_use]
    pub fn new(events: Sender<WorkerEvent>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(WorkerState::Idle),
                cancel: AtomicBool::new(false),
                events,
            }),
            handle: None,
        }
    }

    /// Start rewriting `items` strictly in order. Returns false (and does
    /// nothing) if a run is already in flight.
    pub fn submit(&mut self, items: Vec<ResizeItem>) -> bool {
        let mut state = lock_unpoisoned(&self.shared.state);
        if *state != WorkerState::Idle {
            warn!("Resize submitted while the worker is busy; ignoring");
            return false;
        }
        *state = WorkerState::Running;
        self.shared.cancel.store(false, Ordering::Relaxed);
        drop(state);

        let shared = Arc::clone(&self.shared);
        self.handle = Some(thread::spawn(move || run(&shared, items)));
        true
    }

    #[must_use]
    pub fn state(&self) -> WorkerState {
        *lock_unpoisoned(&self.shared.state)
    }

    /// Ask the current run to stop after the item in flight. No-op when idle;
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

fn run(shared: &Shared, items: Vec<ResizeItem>) {
    let mut failures = Vec::new();
    let mut aborted = false;

    for (path, (width, height)) in items {
        let _ = shared
            .events
            .send(WorkerEvent::Resize(ResizeEvent::Resizing(path.clone())));

        if let Err(e) = resize_file(&path, width, height) {
            warn!("Failed to resize {}: {}", path.display(), e);
            failures.push(path.clone());
        }

        // Emitted regardless of success; the file's row is spent either way
        let _ = shared
            .events
            .send(WorkerEvent::Resize(ResizeEvent::Resized(path)));

        // Cancellation boundary: after each item, never mid-file
        if shared.cancel.load(Ordering::Relaxed) {
            aborted = true;
            break;
        }
    }

    *lock_unpoisoned(&shared.state) = WorkerState::Idle;
    shared.cancel.store(false, Ordering::Relaxed);
    let _ = shared
        .events
        .send(WorkerEvent::Resize(ResizeEvent::Done { aborted, failures }));
}

/// Decode the whole image, rescale to exactly the target (the target already
/// encodes the desired aspect ratio), and overwrite the original file. The
/// output format follows the file's extension, so no format conversion
/// happens.
fn resize_file(path: &Path, width: u32, height: u32) -> eyre::Result<()> {
    let img = image::open(path)?;
    let resized = img.resize_exact(width, height, FilterType::Lanczos3);
    resized.save(path)?;
    Ok(())
}
