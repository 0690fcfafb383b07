//! Background workers for the intake and resize phases.
//!
//! Both workers run on plain threads and report back over a shared
//! `mpsc::Sender`. They never touch controller state directly; every event
//! carries owned values the controller copies into its own bookkeeping.

pub mod intake;
pub mod resize;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

/// Lifecycle of a worker. Cancellation is cooperative: `CancelRequested` is
/// honored at the next item boundary, after which the worker returns to
/// `Idle` on its own.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WorkerState {
    Idle,
    Running,
    CancelRequested,
}

/// Everything a worker can tell the controller.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum WorkerEvent {
    Intake(IntakeEvent),
    Resize(ResizeEvent),
}

/// Events emitted by the intake worker, in probe order, terminated by exactly
/// one `Done` per run. `Done` does not distinguish a completed run from a
/// cancelled one.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum IntakeEvent {
    /// A file is about to be probed (progress signal).
    Probing(PathBuf),
    /// The file is a resizable image of the given dimensions.
    Probed {
        path: PathBuf,
        width: u32,
        height: u32,
    },
    /// The file could not be opened as a resizable image.
    Failed(PathBuf),
    /// The queue drained (or cancellation was honored); worker is idle again.
    Done,
}

/// Events emitted by the resize worker, in submission order, terminated by
/// exactly one `Done` per run.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ResizeEvent {
    /// Work on this file is starting.
    Resizing(PathBuf),
    /// Work on this file finished, successfully or not.
    Resized(PathBuf),
    /// Terminal: `aborted` distinguishes cancellation from completion, and
    /// `failures` lists the paths that could not be rewritten.
    Done {
        aborted: bool,
        failures: Vec<PathBuf>,
    },
}

/// A cloneable, thread-safe handle that asks both workers to stop at their
/// next item boundary. Safe to invoke from a signal handler.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    pub(crate) intake: Arc<intake::Shared>,
    pub(crate) resize: Arc<resize::Shared>,
}

impl CancelHandle {
    /// Request cancellation on whichever worker is running; no-op otherwise.
    pub fn cancel(&self) {
        self.intake.request_cancel();
        self.resize.request_cancel();
    }
}

/// Lock a mutex, shrugging off poisoning: worker state stays usable even if a
/// probe panicked while holding the lock.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
