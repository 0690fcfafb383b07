//! Orchestration of the intake and resize workers.
//!
//! The controller is the only component the collaborator (CLI or any other
//! frontend) talks to. It owns the pending set, the active policy, and the
//! intake failure list; workers only ever hand it events over a channel.

use crate::expand;
use crate::policy::ResizePolicy;
use crate::worker::CancelHandle;
use crate::worker::IntakeEvent;
use crate::worker::ResizeEvent;
use crate::worker::WorkerEvent;
use crate::worker::intake::IntakeWorker;
use crate::worker::resize::ResizeWorker;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// One probed file waiting to be resized.
///
/// Entries only exist for files whose dimensions resolved; unprobeable paths
/// go to the intake failure list instead.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FileEntry {
    /// Normalized path, unique within the pending set.
    pub path: PathBuf,
    /// Dimensions read by the probe.
    pub original: (u32, u32),
    /// Dimensions the resize will produce; recomputed on every policy change.
    pub target: (u32, u32),
}

/// Synchronous refusals at the controller boundary. No partial work is
/// attempted when one of these comes back.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Rejection {
    /// Files are still being probed.
    IntakeRunning,
    /// A batch resize is in progress.
    ResizeRunning,
    /// There are no pending files to resize.
    NothingToResize,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::IntakeRunning => write!(f, "files are still being processed"),
            Rejection::ResizeRunning => write!(f, "a resize is already running"),
            Rejection::NothingToResize => write!(f, "there are no files to resize"),
        }
    }
}

impl std::error::Error for Rejection {}

/// Did the batch run to the end or stop at a cancellation boundary?
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BatchOutcome {
    Completed,
    Aborted,
}

/// Events republished to the collaborator, in delivery order.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ControllerEvent {
    /// Intake is probing this file (progress).
    Probing(PathBuf),
    /// The file joined the pending set with these dimensions.
    Probed { entry: FileEntry },
    /// The file could not be opened as a resizable image.
    ProbeFailed(PathBuf),
    /// Intake went idle; `failures` is the drained intake failure list.
    IntakeFinished { failures: Vec<PathBuf> },
    /// The resize worker is rewriting this file.
    Resizing(PathBuf),
    /// The resize worker finished with this file (successfully or not).
    Resized(PathBuf),
    /// The batch terminated; `failures` lists files that could not be
    /// rewritten before the terminal point.
    ResizeFinished {
        outcome: BatchOutcome,
        failures: Vec<PathBuf>,
    },
}

/// Which phase the pipeline is in, from the controller's point of view.
/// Advanced on submit, released only when the matching terminal event is
/// observed, so the mutual-exclusion checks stay deterministic for callers
/// that have not polled yet.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Phase {
    Idle,
    Intake,
    Resize,
}

/// Owner of the pending set and both workers. Construct one per frontend;
/// dropping it cancels and joins any in-flight background work.
#[derive(Debug)]
pub struct BatchController {
    pending: Vec<FileEntry>,
    policy: ResizePolicy,
    intake_failures: Vec<PathBuf>,
    phase: Phase,
    /// Coalesced intake submissions share a run; the counter keeps the phase
    /// held until the last outstanding run terminates.
    intake_runs: usize,
    intake: IntakeWorker,
    resize: ResizeWorker,
    events: Receiver<WorkerEvent>,
}

impl BatchController {
    #[must_use]
    pub fn new(policy: ResizePolicy) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            pending: Vec::new(),
            policy,
            intake_failures: Vec::new(),
            phase: Phase::Idle,
            intake_runs: 0,
            intake: IntakeWorker::new(tx.clone()),
            resize: ResizeWorker::new(tx),
            events: rx,
        }
    }

    #[must_use]
    pub fn policy(&self) -> ResizePolicy {
        self.policy
    }

    /// The ordered pending set, as the collaborator should display it.
    #[must_use]
    pub fn pending(&self) -> &[FileEntry] {
        &self.pending
    }

    /// True while either worker has not yet reported its terminal event.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// A handle that can cancel in-flight work from another thread, e.g. a
    /// Ctrl-C handler.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            intake: self.intake.shared(),
            resize: self.resize.shared(),
        }
    }

    /// Expand dropped roots and forward the not-yet-pending files to intake.
    /// Returns how many files were forwarded (0 is fine: everything was
    /// already pending, silently de-duplicated).
    ///
    /// # Errors
    ///
    /// Rejected while a resize is running; dropping during intake is allowed
    /// and coalesces into the running probe.
    pub fn drop_paths(&mut self, roots: &[PathBuf]) -> Result<usize, Rejection> {
        if self.phase == Phase::Resize {
            return Err(Rejection::ResizeRunning);
        }
        let fresh: Vec<PathBuf> = expand::expand(roots)
            .into_iter()
            .filter(|p| !self.pending.iter().any(|e| e.path == *p))
            .collect();
        if fresh.is_empty() {
            return Ok(0);
        }
        let count = fresh.len();
        if self.intake.submit(fresh) {
            self.intake_runs += 1;
        }
        self.phase = Phase::Intake;
        Ok(count)
    }

    /// Replace the active policy and recompute every pending target in place.
    /// Count and order of entries are untouched.
    pub fn set_policy(&mut self, policy: ResizePolicy) {
        self.policy = policy;
        for entry in &mut self.pending {
            entry.target = policy.target(entry.original.0, entry.original.1);
        }
    }

    /// Snapshot the pending set and hand it to the resize worker. Returns how
    /// many files the batch will rewrite.
    ///
    /// # Errors
    ///
    /// Rejected while either worker is running or when nothing is pending.
    pub fn start_resize(&mut self) -> Result<usize, Rejection> {
        match self.phase {
            Phase::Intake => return Err(Rejection::IntakeRunning),
            Phase::Resize => return Err(Rejection::ResizeRunning),
            Phase::Idle => {}
        }
        if self.pending.is_empty() {
            return Err(Rejection::NothingToResize);
        }
        let items: Vec<_> = self
            .pending
            .iter()
            .map(|e| (e.path.clone(), e.target))
            .collect();
        let count = items.len();
        self.resize.submit(items);
        self.phase = Phase::Resize;
        Ok(count)
    }

    /// Forward cancellation to whichever worker is running. No-op when idle.
    pub fn request_cancel(&self) {
        self.intake.request_cancel();
        self.resize.request_cancel();
    }

    /// Drop all pending entries.
    ///
    /// # Errors
    ///
    /// Rejected while either worker is running.
    pub fn clear(&mut self) -> Result<(), Rejection> {
        match self.phase {
            Phase::Intake => Err(Rejection::IntakeRunning),
            Phase::Resize => Err(Rejection::ResizeRunning),
            Phase::Idle => {
                self.pending.clear();
                Ok(())
            }
        }
    }

    /// Drain every event currently buffered, without blocking.
    pub fn poll(&mut self) -> Vec<ControllerEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(self.apply(event));
        }
        out
    }

    /// Block up to `timeout` for the next event. `None` means nothing arrived
    /// in time (or both worker channels are gone).
    pub fn next_event(&mut self, timeout: Duration) -> Option<ControllerEvent> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Some(self.apply(event)),
            Err(_) => None,
        }
    }

    /// Fold one worker event into controller state and republish it.
    fn apply(&mut self, event: WorkerEvent) -> ControllerEvent {
        match event {
            WorkerEvent::Intake(IntakeEvent::Probing(path)) => ControllerEvent::Probing(path),
            WorkerEvent::Intake(IntakeEvent::Probed {
                path,
                width,
                height,
            }) => {
                let entry = FileEntry {
                    path,
                    original: (width, height),
                    target: self.policy.target(width, height),
                };
                // Uniqueness guard; duplicates were filtered at drop time but
                // a file dropped twice in quick succession can still race in
                if !self.pending.iter().any(|e| e.path == entry.path) {
                    self.pending.push(entry.clone());
                }
                ControllerEvent::Probed { entry }
            }
            WorkerEvent::Intake(IntakeEvent::Failed(path)) => {
                self.intake_failures.push(path.clone());
                ControllerEvent::ProbeFailed(path)
            }
            WorkerEvent::Intake(IntakeEvent::Done) => {
                self.intake_runs = self.intake_runs.saturating_sub(1);
                if self.intake_runs == 0 && self.phase == Phase::Intake {
                    self.phase = Phase::Idle;
                }
                ControllerEvent::IntakeFinished {
                    failures: std::mem::take(&mut self.intake_failures),
                }
            }
            WorkerEvent::Resize(ResizeEvent::Resizing(path)) => ControllerEvent::Resizing(path),
            WorkerEvent::Resize(ResizeEvent::Resized(path)) => {
                // Completion order equals snapshot order, so the head entry
                // is always the one that just finished
                if !self.pending.is_empty() {
                    self.pending.remove(0);
                }
                ControllerEvent::Resized(path)
            }
            WorkerEvent::Resize(ResizeEvent::Done { aborted, failures }) => {
                if self.phase == Phase::Resize {
                    self.phase = Phase::Idle;
                }
                // Destructive batch, start fresh: anything not rewritten is
                // dropped along with everything else
                self.pending.clear();
                ControllerEvent::ResizeFinished {
                    outcome: if aborted {
                        BatchOutcome::Aborted
                    } else {
                        BatchOutcome::Completed
                    },
                    failures,
                }
            }
        }
    }
}

impl Drop for BatchController {
    /// Cancel and join both workers so no background task outlives the
    /// pipeline's owner.
    fn drop(&mut self) {
        self.intake.request_cancel();
        self.resize.request_cancel();
        self.intake.join();
        self.resize.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const TIMEOUT: Duration = Duration::from_secs(30);

    fn write_png(path: &Path, width: u32, height: u32) {
        image::RgbImage::new(width, height).save(path).unwrap();
    }

    /// Pump events until intake reports its terminal, collecting everything.
    fn pump_intake(controller: &mut BatchController) -> Vec<ControllerEvent> {
        let mut events = Vec::new();
        loop {
            let event = controller
                .next_event(TIMEOUT)
                .expect("timed out waiting for intake");
            let done = matches!(event, ControllerEvent::IntakeFinished { .. });
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    fn pump_resize(controller: &mut BatchController) -> Vec<ControllerEvent> {
        let mut events = Vec::new();
        loop {
            let event = controller
                .next_event(TIMEOUT)
                .expect("timed out waiting for resize");
            let done = matches!(event, ControllerEvent::ResizeFinished { .. });
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    #[test]
    fn resize_with_empty_pending_set_is_rejected() {
        let mut controller = BatchController::new(ResizePolicy::Percentage(50));
        assert_eq!(controller.start_resize(), Err(Rejection::NothingToResize));
    }

    #[test]
    fn resize_during_intake_is_rejected_and_state_unchanged() {
        let td = tempdir().unwrap();
        let img = td.path().join("a.png");
        write_png(&img, 10, 10);

        let mut controller = BatchController::new(ResizePolicy::Percentage(50));
        controller.drop_paths(&[img.clone()]).unwrap();

        // Intake terminal not yet polled: the controller still counts the
        // probe as running, whatever the worker thread has managed so far
        assert_eq!(controller.start_resize(), Err(Rejection::IntakeRunning));
        assert!(controller.is_busy());

        pump_intake(&mut controller);
        assert_eq!(controller.pending().len(), 1);
        // Original untouched: the rejection really was a no-op
        assert_eq!(image::image_dimensions(&img).unwrap(), (10, 10));
    }

    #[test]
    fn drop_during_resize_is_rejected() {
        let td = tempdir().unwrap();
        let img = td.path().join("a.png");
        write_png(&img, 10, 10);

        let mut controller = BatchController::new(ResizePolicy::Percentage(50));
        controller.drop_paths(&[img.clone()]).unwrap();
        pump_intake(&mut controller);
        controller.start_resize().unwrap();

        assert_eq!(
            controller.drop_paths(&[img]),
            Err(Rejection::ResizeRunning)
        );
        assert_eq!(controller.clear(), Err(Rejection::ResizeRunning));
        pump_resize(&mut controller);
    }

    #[test]
    fn policy_change_recomputes_targets_without_reordering() {
        let td = tempdir().unwrap();
        let mut paths = Vec::new();
        for (i, (w, h)) in [(100, 50), (60, 60), (20, 80), (90, 30), (10, 10)]
            .iter()
            .enumerate()
        {
            let p = td.path().join(format!("img{i}.png"));
            write_png(&p, *w, *h);
            paths.push(p);
        }

        let mut controller = BatchController::new(ResizePolicy::Percentage(50));
        controller.drop_paths(&paths).unwrap();
        pump_intake(&mut controller);
        assert_eq!(controller.pending().len(), 5);
        let order_before: Vec<_> = controller.pending().iter().map(|e| e.path.clone()).collect();

        controller.set_policy(ResizePolicy::AbsoluteMax(10));
        let order_after: Vec<_> = controller.pending().iter().map(|e| e.path.clone()).collect();
        assert_eq!(order_before, order_after);
        assert_eq!(controller.pending()[0].target, (10, 5));
        assert_eq!(controller.pending()[1].target, (10, 10));
        assert_eq!(controller.pending()[2].target, (2, 10)); // floor(20*10/80)
    }

    #[test]
    fn dropping_the_same_file_twice_keeps_one_entry() {
        let td = tempdir().unwrap();
        let img = td.path().join("a.png");
        write_png(&img, 10, 10);

        let mut controller = BatchController::new(ResizePolicy::Percentage(50));
        controller.drop_paths(&[img.clone()]).unwrap();
        pump_intake(&mut controller);
        assert_eq!(controller.pending().len(), 1);

        // Second drop of an already-pending path: silently filtered
        assert_eq!(controller.drop_paths(&[img]), Ok(0));
        assert_eq!(controller.pending().len(), 1);
    }

    #[test]
    fn resize_failure_is_reported_and_batch_continues() {
        let td = tempdir().unwrap();
        let doomed = td.path().join("doomed.png");
        let ok = td.path().join("ok.png");
        write_png(&doomed, 10, 10);
        write_png(&ok, 10, 10);

        let mut controller = BatchController::new(ResizePolicy::Percentage(50));
        controller
            .drop_paths(&[doomed.clone(), ok.clone()])
            .unwrap();
        pump_intake(&mut controller);

        // Pull the rug out from under the first item
        fs::remove_file(&doomed).unwrap();

        controller.start_resize().unwrap();
        let events = pump_resize(&mut controller);
        let Some(ControllerEvent::ResizeFinished { outcome, failures }) = events.last() else {
            panic!("expected a terminal event, got {events:?}");
        };
        assert_eq!(*outcome, BatchOutcome::Completed);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].ends_with("doomed.png"));
        assert_eq!(image::image_dimensions(&ok).unwrap(), (5, 5));
        assert!(controller.pending().is_empty());
    }

    #[test]
    fn clear_empties_the_pending_set_when_idle() {
        let td = tempdir().unwrap();
        let img = td.path().join("a.png");
        write_png(&img, 10, 10);

        let mut controller = BatchController::new(ResizePolicy::Percentage(50));
        controller.drop_paths(&[img]).unwrap();
        pump_intake(&mut controller);
        assert_eq!(controller.pending().len(), 1);

        controller.clear().unwrap();
        assert!(controller.pending().is_empty());
    }

    #[test]
    fn cancel_when_idle_changes_nothing() {
        let mut controller = BatchController::new(ResizePolicy::Percentage(50));
        controller.request_cancel();
        assert!(!controller.is_busy());
        assert!(controller.poll().is_empty());
    }
}
