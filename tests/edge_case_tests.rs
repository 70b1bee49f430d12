//! Edge case tests for malformed and unusual detector output


use camera_to_keyboard::{
    types::{BoundingBox, Detection, DetectionClass, DetectionFrame, FrameState},
    Error,
};
use test_helpers::{
    calibrated_processor, create_test_processor, finger_box, finger_pressed_frame, hand_frame, resting_frame,
    RESTING_FINGERS, RESTING_THUMBS,
};

fn with_markers(frame: &DetectionFrame, markers: &[BoundingBox]) -> DetectionFrame {
    let mut detections: Vec<_> = frame
        .detections
        .iter()
        .filter(|d| d.class() != Some(DetectionClass::Marker))
        .copied()
        .collect();
    detections.extend(
        markers
            .iter()
            .map(|&bbox| Detection::new(DetectionClass::Marker, 0.9, bbox)),
    );
    DetectionFrame::new(frame.width, frame.height, detections)
}

#[test]
fn test_empty_frames() {
    let mut processor = create_test_processor(5).unwrap();
    for _ in 0..10 {
        let outcome = processor.update(&DetectionFrame::default());
        assert!(!outcome.calibration_completed);
        assert_eq!(processor.state(), FrameState::MissingMarkers);
    }
    assert!(processor.marker_coordinates().is_empty());
    assert!(processor.finger_coordinates().is_empty());
    assert!(processor.down_keys().is_empty());
}

#[test]
fn test_only_unknown_classes() {
    let mut processor = create_test_processor(5).unwrap();
    let detections = (3..10)
        .map(|class_id| Detection {
            class_id,
            confidence: 1.0,
            bbox: BoundingBox::new(100.0, 100.0, 10.0, 10.0),
        })
        .collect();
    let _ = processor.update(&DetectionFrame::new(640, 480, detections));
    assert_eq!(processor.state(), FrameState::MissingMarkers);
}

#[test]
fn test_surplus_detections() {
    let mut processor = create_test_processor(5).unwrap();

    let mut frame = resting_frame();
    frame
        .detections
        .push(Detection::new(DetectionClass::Finger, 0.9, finger_box(1200.0, 480.0)));
    frame.detections.push(Detection::new(
        DetectionClass::Marker,
        0.9,
        BoundingBox::new(1250.0, 650.0, 30.0, 30.0),
    ));

    let _ = processor.update(&frame);
    assert_eq!(processor.state(), FrameState::Valid);
    assert_eq!(processor.finger_coordinates().len(), 8);
    assert_eq!(processor.marker_coordinates().len(), 4);
}

#[test]
fn test_non_finite_boxes_do_not_panic() {
    let mut processor = calibrated_processor(5).unwrap();

    let mut frame = hand_frame(&RESTING_FINGERS[..7], &RESTING_THUMBS);
    frame.detections.push(Detection::new(
        DetectionClass::Finger,
        0.9,
        BoundingBox::new(f64::NAN, f64::INFINITY, f64::NAN, f64::NAN),
    ));
    frame.detections.push(Detection::new(
        DetectionClass::Marker,
        0.9,
        BoundingBox::new(f64::NEG_INFINITY, 0.0, 1.0, 1.0),
    ));

    for _ in 0..5 {
        let _ = processor.update(&frame);
    }
    assert_eq!(processor.finger_coordinates().len(), 8);
}

#[test]
fn test_degenerate_markers_skip_key_resolution() {
    let mut processor = calibrated_processor(5).unwrap();

    // Zero-size markers on one line give a singular perspective transform
    let collinear = [
        BoundingBox::new(200.0, 0.0, 0.0, 0.0),
        BoundingBox::new(400.0, 0.0, 0.0, 0.0),
        BoundingBox::new(800.0, 0.0, 0.0, 0.0),
        BoundingBox::new(1000.0, 0.0, 0.0, 0.0),
    ];
    let pressed = with_markers(&finger_pressed_frame(3, (489.0, 539.0)), &collinear);
    for _ in 0..3 {
        let _ = processor.update(&pressed);
    }

    assert_eq!(processor.state(), FrameState::Valid);
    assert_eq!(processor.down_fingers().len(), 1);
    assert!(processor.down_keys().is_empty());
}

#[test]
fn test_markers_lost_mid_press_keep_stale_corners() {
    let mut processor = calibrated_processor(5).unwrap();
    let corners = processor.marker_coordinates();

    let pressed = with_markers(&finger_pressed_frame(3, (489.0, 539.0)), &[]);
    for _ in 0..3 {
        let _ = processor.update(&pressed);
    }

    assert_eq!(processor.state(), FrameState::MissingMarkers);
    assert_eq!(processor.marker_coordinates(), corners);
    assert_eq!(processor.down_keys(), ["d"]);
}

#[test]
fn test_start_calibration_is_idempotent() {
    let mut processor = create_test_processor(2).unwrap();
    assert!(processor.start_calibration());
    assert!(!processor.start_calibration());

    let _ = processor.update(&resting_frame());
    assert!(processor.update(&resting_frame()).calibration_completed);
    assert!(!processor.start_calibration());
    assert!(!processor.is_calibration_in_progress());
}

#[test]
fn test_strategy_errors() {
    assert!(matches!(
        camera_to_keyboard::calibration::create_calibration_strategy("kalman"),
        Err(Error::UnknownStrategy(_))
    ));
    assert!(matches!(
        camera_to_keyboard::tracking::create_tracking_strategy("iou"),
        Err(Error::UnknownStrategy(_))
    ));
}
