//! End-to-end pipeline scenario: mixed drop, policy change, batch resize.

use picshrink::BatchController;
use picshrink::BatchOutcome;
use picshrink::ControllerEvent;
use picshrink::ResizePolicy;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

const TIMEOUT: Duration = Duration::from_secs(30);

fn write_image(path: &Path, width: u32, height: u32) {
    let format = match path.extension().and_then(|s| s.to_str()) {
        Some("jpg") => image::ImageFormat::Jpeg,
        _ => image::ImageFormat::Png,
    };
    image::RgbImage::new(width, height)
        .save_with_format(path, format)
        .unwrap();
}

fn pump_until<F>(controller: &mut BatchController, mut terminal: F) -> Vec<ControllerEvent>
where
    F: FnMut(&ControllerEvent) -> bool,
{
    let mut events = Vec::new();
    loop {
        let event = controller
            .next_event(TIMEOUT)
            .expect("timed out waiting for the pipeline");
        let done = terminal(&event);
        events.push(event);
        if done {
            break;
        }
    }
    events
}

#[test]
fn mixed_drop_then_policy_change_then_resize() {
    let td = tempdir().unwrap();
    let photo1 = td.path().join("photo1.jpg");
    let notes = td.path().join("notes.txt");
    let photo2 = td.path().join("photo2.png");
    write_image(&photo1, 800, 600);
    fs::write(&notes, "definitely not pixels").unwrap();
    write_image(&photo2, 300, 300);

    let mut controller = BatchController::new(ResizePolicy::AbsoluteMax(1000));
    let submitted = controller
        .drop_paths(&[photo1.clone(), notes.clone(), photo2.clone()])
        .unwrap();
    assert_eq!(submitted, 3);

    // Intake phase: results arrive in submission order, one terminal event
    let events = pump_until(&mut controller, |e| {
        matches!(e, ControllerEvent::IntakeFinished { .. })
    });
    let meaningful: Vec<&ControllerEvent> = events
        .iter()
        .filter(|e| !matches!(e, ControllerEvent::Probing(_)))
        .collect();
    assert_eq!(meaningful.len(), 4);
    match (meaningful[0], meaningful[1], meaningful[2], meaningful[3]) {
        (
            ControllerEvent::Probed { entry: first },
            ControllerEvent::ProbeFailed(failed),
            ControllerEvent::Probed { entry: second },
            ControllerEvent::IntakeFinished { failures },
        ) => {
            assert_eq!(first.original, (800, 600));
            assert!(first.path.ends_with("photo1.jpg"));
            assert!(failed.ends_with("notes.txt"));
            assert_eq!(second.original, (300, 300));
            assert!(second.path.ends_with("photo2.png"));
            assert_eq!(failures.len(), 1);
            assert!(failures[0].ends_with("notes.txt"));
        }
        other => panic!("unexpected intake event order: {other:?}"),
    }

    // Unprobeable files never make it into the pending set
    assert_eq!(controller.pending().len(), 2);

    // Switching policies recomputes every target in place
    controller.set_policy(ResizePolicy::Percentage(50));
    assert_eq!(controller.pending()[0].target, (400, 300));
    assert_eq!(controller.pending()[1].target, (150, 150));

    // Resize phase: every file rewritten, no failures, pending set drained
    assert_eq!(controller.start_resize().unwrap(), 2);
    let events = pump_until(&mut controller, |e| {
        matches!(e, ControllerEvent::ResizeFinished { .. })
    });
    let resized = events
        .iter()
        .filter(|e| matches!(e, ControllerEvent::Resized(_)))
        .count();
    assert_eq!(resized, 2);
    let Some(ControllerEvent::ResizeFinished { outcome, failures }) = events.last() else {
        panic!("expected a terminal resize event, got {events:?}");
    };
    assert_eq!(*outcome, BatchOutcome::Completed);
    assert!(failures.is_empty());
    assert!(controller.pending().is_empty());

    assert_eq!(image::image_dimensions(&photo1).unwrap(), (400, 300));
    assert_eq!(image::image_dimensions(&photo2).unwrap(), (150, 150));
    // The failed file is untouched
    assert_eq!(fs::read_to_string(&notes).unwrap(), "definitely not pixels");
}

#[test]
fn directory_drop_flattens_recursively() {
    let td = tempdir().unwrap();
    let sub = td.path().join("sub");
    fs::create_dir_all(&sub).unwrap();
    write_image(&td.path().join("a.png"), 10, 10);
    write_image(&sub.join("b.png"), 20, 20);

    let mut controller = BatchController::new(ResizePolicy::Percentage(50));
    assert_eq!(controller.drop_paths(&[td.path().to_path_buf()]).unwrap(), 2);
    pump_until(&mut controller, |e| {
        matches!(e, ControllerEvent::IntakeFinished { .. })
    });

    let names: Vec<String> = controller
        .pending()
        .iter()
        .map(|e| e.path.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["a.png", "b.png"]);
}
