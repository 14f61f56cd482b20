// End-to-end detector and pipeline tests over synthetic frames. These need a
// working OpenCV install, same as the binaries.

use anyhow::Result;
use fishtrack::{
    Centroid, CentroidTracker, DetectorConfig, FishDetector, FishTracker, FishTrackerConfig,
    ProcessOptions,
};
use opencv::{
    core::{Mat, Rect, Scalar, Size, CV_8UC3},
    imgproc,
    prelude::*,
    videoio,
};
use std::path::PathBuf;

const WIDTH: i32 = 640;
const HEIGHT: i32 = 480;

fn black_frame() -> Result<Mat> {
    Ok(Mat::new_rows_cols_with_default(
        HEIGHT,
        WIDTH,
        CV_8UC3,
        Scalar::all(0.0),
    )?)
}

fn frame_with_rect(rect: Rect) -> Result<Mat> {
    let mut frame = black_frame()?;
    imgproc::rectangle(
        &mut frame,
        rect,
        Scalar::new(255.0, 255.0, 255.0, 0.0),
        imgproc::FILLED,
        imgproc::LINE_8,
        0,
    )?;
    Ok(frame)
}

#[test]
fn warmed_up_detector_finds_single_rectangle() -> Result<()> {
    let config = DetectorConfig {
        min_area: 100.0,
        ..DetectorConfig::default()
    };
    let mut detector = FishDetector::new(&config)?;

    // feed all-black frames so the model settles on an empty scene
    for _ in 0..10 {
        detector.detect(&black_frame()?)?;
    }

    let rects = detector.detect(&frame_with_rect(Rect::new(200, 200, 100, 50))?)?;
    assert_eq!(rects.len(), 1, "expected exactly one detection: {rects:?}");

    let rect = rects[0];
    assert!((rect.x - 200).abs() <= 5, "x: {}", rect.x);
    assert!((rect.y - 200).abs() <= 5, "y: {}", rect.y);
    assert!((rect.width - 100).abs() <= 10, "width: {}", rect.width);
    assert!((rect.height - 50).abs() <= 10, "height: {}", rect.height);

    // the detected box alone drives a fresh tracker to one track at ID 0
    let mut tracker = CentroidTracker::new(50);
    let fish = tracker.update(&rects);
    assert_eq!(fish.len(), 1);
    assert_eq!(fish[0].id, 0);
    let expected = Centroid::new(250, 225);
    assert!((fish[0].centroid.x - expected.x).abs() <= 5);
    assert!((fish[0].centroid.y - expected.y).abs() <= 5);
    Ok(())
}

#[test]
fn detector_stays_quiet_on_static_scene_after_warmup() -> Result<()> {
    let mut detector = FishDetector::new(&DetectorConfig::default())?;
    for _ in 0..10 {
        detector.detect(&black_frame()?)?;
    }
    let rects = detector.detect(&black_frame()?)?;
    assert!(rects.is_empty(), "static scene produced {rects:?}");
    Ok(())
}

#[test]
fn moving_blob_keeps_one_identity_through_pipeline() -> Result<()> {
    let config = FishTrackerConfig {
        detector: DetectorConfig {
            min_area: 100.0,
            ..DetectorConfig::default()
        },
        // short leash so any warm-up ghost track dies before the blob appears
        max_disappeared: 2,
    };
    let mut pipeline = FishTracker::new(&config)?;

    for _ in 0..15 {
        pipeline.track(&black_frame()?)?;
    }

    // a 40x40 blob swims right 5px per frame
    let mut seen: Vec<(usize, i32)> = Vec::new();
    for step in 0..10 {
        let rect = Rect::new(200 + step * 5, 220, 40, 40);
        let (fish, _rects) = pipeline.track(&frame_with_rect(rect)?)?;
        assert_eq!(fish.len(), 1, "step {step}: {fish:?}");
        seen.push((fish[0].id, fish[0].centroid.x));
    }

    let first_id = seen[0].0;
    assert!(seen.iter().all(|&(id, _)| id == first_id));
    for pair in seen.windows(2) {
        assert!(pair[1].1 > pair[0].1, "centroid did not advance: {seen:?}");
    }
    Ok(())
}

#[test]
fn default_options_use_the_cli_summary_interval() {
    // an interval of 0 would log a summary line on every frame
    let options = ProcessOptions::default();
    assert_eq!(options.log_interval_seconds, 5);
    assert!(options.output.is_none());
    assert!(!options.display);
}

#[test]
fn unwritable_output_path_is_a_hard_error() -> Result<()> {
    // a real (tiny) input clip, so the failure can only come from the output
    let input = std::env::temp_dir().join("fishtrack_output_error_input.avi");
    let fourcc = videoio::VideoWriter::fourcc('M', 'J', 'P', 'G')?;
    let mut writer = videoio::VideoWriter::new(
        input.to_string_lossy().as_ref(),
        fourcc,
        30.0,
        Size::new(64, 48),
        true,
    )?;
    assert!(writer.is_opened()?, "could not create input clip");
    for _ in 0..3 {
        let frame = Mat::new_rows_cols_with_default(48, 64, CV_8UC3, Scalar::all(0.0))?;
        writer.write(&frame)?;
    }
    writer.release()?;

    let mut pipeline = FishTracker::new(&FishTrackerConfig::default())?;
    let options = ProcessOptions {
        output: Some(PathBuf::from("/nonexistent-dir/out.mp4")),
        ..ProcessOptions::default()
    };
    let result = pipeline.process_video(&input.to_string_lossy(), &options);
    assert!(result.is_err(), "bad output path should fail, got {result:?}");
    Ok(())
}
