mod common;

use common::*;
use planscope::calibration::{Gesture, StoredCalibration};
use planscope::error::CalibrationError;

fn draw_line(calibrator: &mut ScaleCalibrator, from: (f64, f64), to: (f64, f64)) {
    calibrator.set_drawing_mode(true);
    assert!(calibrator.pointer_down(&PointerEvent::unscaled(from.0, from.1, PLAN_SIZE)));
    assert!(calibrator.pointer_move(&PointerEvent::unscaled(to.0, to.1, PLAN_SIZE)));
    assert!(calibrator.pointer_up(&PointerEvent::unscaled(to.0, to.1, PLAN_SIZE)));
}

#[test]
fn test_commit_computes_pixels_per_unit() -> anyhow::Result<()> {
    let (mut calibrator, store) = make_calibrator("session-d");
    draw_line(&mut calibrator, (0.0, 0.0), (100.0, 0.0));
    assert!(calibrator.is_modal_open());

    let calibration = calibrator.commit("5", Unit::Meters)?.clone();
    assert_eq!(calibration.pixels_per_unit, 20.0);
    assert_eq!(calibration.real_world_length, 5.0);
    assert_eq!(calibration.label(), "5 meters");
    assert!(!calibrator.is_modal_open());
    assert!(!calibrator.drawing_mode());
    assert_eq!(calibrator.gesture(), Gesture::Idle);

    let json = store
        .get("scale_calibration:session-d")?
        .expect("calibration persisted");
    let stored: StoredCalibration = serde_json::from_str(&json)?;
    assert_eq!(stored.pixels_per_unit, 20.0);
    assert_eq!(stored.scale_line, calibration);

    let raw: serde_json::Value = serde_json::from_str(&json)?;
    assert_eq!(raw["scaleLine"]["realWorldLength"], 5.0);
    assert_eq!(raw["scaleLine"]["unit"], "meters");
    Ok(())
}

#[test]
fn test_invalid_length_keeps_line_and_store() -> anyhow::Result<()> {
    let (mut calibrator, store) = make_calibrator("session-bad");
    draw_line(&mut calibrator, (10.0, 10.0), (40.0, 50.0));
    let pending = calibrator.gesture();

    for input in ["0", "-3", "abc", "", "NaN", "inf"] {
        let err = calibrator.commit(input, Unit::Feet).unwrap_err();
        assert!(matches!(err, CalibrationError::InvalidLength(_)), "input {input:?}");
        assert_eq!(calibrator.gesture(), pending);
        assert!(calibrator.is_modal_open());
        assert!(store.is_empty());
    }

    // Retry with a valid value succeeds on the same line
    let calibration = calibrator.commit("2.5", Unit::Feet)?;
    assert_eq!(calibration.pixels_per_unit, 50.0 / 2.5);
    Ok(())
}

#[test]
fn test_cancel_discards_without_persisting() {
    let (mut calibrator, store) = make_calibrator("session-cancel");
    draw_line(&mut calibrator, (0.0, 0.0), (30.0, 40.0));

    assert!(calibrator.cancel());
    assert_eq!(calibrator.gesture(), Gesture::Idle);
    assert!(calibrator.preview().is_none());
    assert!(calibrator.active().is_none());
    assert!(!calibrator.drawing_mode());
    assert!(store.is_empty());
    assert!(!calibrator.cancel());
}

#[test]
fn test_pointer_converted_with_each_events_display_size() {
    let (mut calibrator, _) = make_calibrator("session-scale");
    calibrator.set_drawing_mode(true);

    // Displayed at half size, then the window is resized to full size
    calibrator.pointer_down(&PointerEvent::new(10.0, 10.0, 200.0, 150.0));
    calibrator.pointer_up(&PointerEvent::new(120.0, 20.0, 400.0, 300.0));

    let (start, end) = calibrator.preview().unwrap();
    assert_eq!((start.x, start.y), (20.0, 20.0));
    assert_eq!((end.x, end.y), (120.0, 20.0));
}

#[test]
fn test_unknown_natural_size_ignores_pointer() {
    let (mut calibrator, _) = make_calibrator("session-unloaded");
    calibrator.set_natural_size(None);
    calibrator.set_drawing_mode(true);
    assert!(!calibrator.pointer_down(&PointerEvent::new(1.0, 1.0, 10.0, 10.0)));
    assert_eq!(calibrator.gesture(), Gesture::Idle);
}

#[test]
fn test_redraw_replaces_and_clear_removes() -> anyhow::Result<()> {
    let (mut calibrator, store) = make_calibrator("session-redraw");
    draw_line(&mut calibrator, (0.0, 0.0), (100.0, 0.0));
    calibrator.commit("10", Unit::Meters)?;
    draw_line(&mut calibrator, (0.0, 0.0), (0.0, 90.0));
    calibrator.commit("3", Unit::Meters)?;

    assert_eq!(calibrator.active().unwrap().pixels_per_unit, 30.0);
    assert_eq!(store.len(), 1);

    calibrator.clear()?;
    assert!(calibrator.active().is_none());
    assert!(store.is_empty());
    Ok(())
}

#[test]
fn test_file_store_restores_across_calibrators() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let token = SessionToken::generate();

    let mut first = ScaleCalibrator::new(token.clone(), Box::new(FileStore::new(dir.path())));
    first.set_natural_size(Some(PLAN_SIZE));
    draw_line(&mut first, (0.0, 0.0), (60.0, 80.0));
    first.commit("4", Unit::Inches)?;

    let mut second = ScaleCalibrator::new(token.clone(), Box::new(FileStore::new(dir.path())));
    let restored = second.restore()?.cloned().expect("stored calibration");
    assert_eq!(restored.pixels_per_unit, 25.0);
    assert_eq!(restored.unit, Unit::Inches);

    let mut other =
        ScaleCalibrator::new(SessionToken::generate(), Box::new(FileStore::new(dir.path())));
    assert!(other.restore()?.is_none());

    second.clear()?;
    let mut third = ScaleCalibrator::new(token, Box::new(FileStore::new(dir.path())));
    assert!(third.restore()?.is_none());
    Ok(())
}

#[test]
fn test_malformed_store_entry_is_reported() {
    let store = MemoryStore::new();
    store.set("scale_calibration:broken", "{not json").unwrap();
    let mut calibrator = ScaleCalibrator::new(SessionToken::new("broken"), Box::new(store));
    assert!(matches!(calibrator.restore(), Err(CalibrationError::Store(_))));
}

#[test]
fn test_natural_size_read_from_plan_file() -> anyhow::Result<()> {
    let plan = create_test_image();
    let natural = image::image_dimensions(plan.path())?;
    assert_eq!(natural, (100, 100));

    let (mut calibrator, _) = make_calibrator("session-file");
    calibrator.set_natural_size(Some(natural));
    calibrator.set_drawing_mode(true);
    // Plan shown at 50x50 on screen
    calibrator.pointer_down(&PointerEvent::new(5.0, 5.0, 50.0, 50.0));
    calibrator.pointer_up(&PointerEvent::new(45.0, 5.0, 50.0, 50.0));
    let calibration = calibrator.commit("4", Unit::Meters)?;
    assert_eq!(calibration.pixel_length(), 80.0);
    assert_eq!(calibration.pixels_per_unit, 20.0);
    Ok(())
}
