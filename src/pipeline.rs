use anyhow::{bail, Context, Result};
use opencv::{
    core::{Point, Rect, Scalar, Size},
    highgui, imgproc,
    prelude::*,
    videoio,
};
use std::{path::PathBuf, time::Instant};

use crate::centroid::{BoundingBox, CentroidTracker, TrackedFish};
use crate::detect::{DetectorConfig, FishDetector};
use crate::log::{timestamp_now, FrameLog, JsonLogger, SessionLog, SummaryLog};

/// Full pipeline configuration, fixed at construction.
#[derive(Clone, Copy, Debug)]
pub struct FishTrackerConfig {
    pub detector: DetectorConfig,
    /// Frames a track may go unmatched before it is dropped.
    pub max_disappeared: u32,
}

impl Default for FishTrackerConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            max_disappeared: 50,
        }
    }
}

/// Options for [`FishTracker::process_video`].
#[derive(Clone, Debug)]
pub struct ProcessOptions {
    /// Write annotated frames to this path (mp4).
    pub output: Option<PathBuf>,
    /// Show annotated frames in a window; ESC or `q` stops early.
    pub display: bool,
    /// Append JSONL events (session_start, frame, summary) to this path.
    pub log_json: Option<PathBuf>,
    /// Seconds between summary log lines.
    pub log_interval_seconds: u64,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            output: None,
            display: false,
            log_json: None,
            // matches the CLI default; zero would emit a summary every frame
            log_interval_seconds: 5,
        }
    }
}

/// Detection-to-track pipeline: one MOG2 detector feeding one centroid
/// tracker. One instance per video stream; the two halves share no state
/// with any other instance.
pub struct FishTracker {
    detector: FishDetector,
    tracker: CentroidTracker,
    config: FishTrackerConfig,
}

impl FishTracker {
    pub fn new(config: &FishTrackerConfig) -> Result<Self> {
        Ok(Self {
            detector: FishDetector::new(&config.detector)?,
            tracker: CentroidTracker::new(config.max_disappeared),
            config: *config,
        })
    }

    /// Detect blobs in the frame, then advance identity assignment.
    /// Returns the live track set and this frame's raw detections.
    pub fn track(&mut self, frame: &Mat) -> Result<(Vec<TrackedFish>, Vec<BoundingBox>)> {
        let rects = self.detector.detect(frame)?;
        let fish = self.tracker.update(&rects);
        Ok((fish, rects))
    }

    /// Total identities assigned over the session so far.
    pub fn total_unique(&self) -> usize {
        self.tracker.total_unique()
    }

    /// Run the full frame loop over a video file. Returns the number of
    /// frames processed. Fails hard if the source cannot be opened; never
    /// retries.
    pub fn process_video(&mut self, source: &str, options: &ProcessOptions) -> Result<u64> {
        let mut capture = videoio::VideoCapture::from_file(source, videoio::CAP_ANY)
            .with_context(|| format!("Failed to open input source: {}", source))?;
        if !capture.is_opened()? {
            bail!("Failed to open input source: {}", source);
        }

        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        let fps = if fps > 0.0 { fps } else { 30.0 };
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32;

        let mut writer = match options.output.as_ref() {
            Some(path) => {
                let fourcc = videoio::VideoWriter::fourcc('m', 'p', '4', 'v')?;
                let writer = videoio::VideoWriter::new(
                    path.to_string_lossy().as_ref(),
                    fourcc,
                    fps,
                    Size::new(width, height),
                    true,
                )
                .with_context(|| format!("Failed to open output video: {}", path.display()))?;
                // VideoWriter::new does not error on an unwritable path
                if !writer.is_opened()? {
                    bail!("Failed to open output video: {}", path.display());
                }
                Some(writer)
            }
            None => None,
        };

        let mut json_logger = match options.log_json.as_ref() {
            Some(path) => Some(JsonLogger::new(path)?),
            None => None,
        };
        if let Some(logger) = json_logger.as_mut() {
            let session = SessionLog {
                event: "session_start",
                timestamp: timestamp_now(),
                source: source.to_string(),
                min_area: self.config.detector.min_area,
                history: self.config.detector.history,
                var_threshold: self.config.detector.var_threshold,
                detect_shadows: self.config.detector.detect_shadows,
                max_disappeared: self.config.max_disappeared,
            };
            logger.write_event(&session)?;
            logger.flush()?;
        }

        let mut display_enabled = options.display;
        let window_name = "fishtrack";
        if display_enabled {
            if let Err(err) = highgui::named_window(window_name, highgui::WINDOW_AUTOSIZE) {
                tracing::warn!("Failed to open display window: {}. Running headless.", err);
                display_enabled = false;
            }
        }

        let start_time = Instant::now();
        let mut last_summary = Instant::now();
        let mut frame_index: u64 = 0;
        let mut frame = Mat::default();

        loop {
            if !capture.read(&mut frame)? {
                break;
            }
            if frame.empty() {
                break;
            }
            frame_index += 1;

            let (fish, rects) = self.track(&frame)?;

            let needs_annotation = writer.is_some() || display_enabled;
            let annotated = if needs_annotation {
                let mut out = frame.try_clone()?;
                draw_tracks(&mut out, &fish, &rects)?;
                Some(out)
            } else {
                None
            };

            if let (Some(writer), Some(annotated)) = (writer.as_mut(), annotated.as_ref()) {
                writer.write(annotated)?;
            }

            if let Some(logger) = json_logger.as_mut() {
                logger.write_event(&FrameLog {
                    event: "frame",
                    timestamp: timestamp_now(),
                    frame_index,
                    detections: rects.len(),
                    active_tracks: fish.len(),
                    total_unique: self.tracker.total_unique(),
                })?;
            }

            if display_enabled {
                if let Some(annotated) = annotated.as_ref() {
                    highgui::imshow(window_name, annotated)?;
                    let key = highgui::wait_key(1)?;
                    if key == 27 || key == 113 {
                        break;
                    }
                }
            }

            if last_summary.elapsed().as_secs() >= options.log_interval_seconds {
                let elapsed = start_time.elapsed().as_secs_f64();
                let effective_fps = if elapsed > 0.0 {
                    frame_index as f64 / elapsed
                } else {
                    0.0
                };
                tracing::info!(
                    "frames={} active={} unique={} fps={:.1}",
                    frame_index,
                    fish.len(),
                    self.tracker.total_unique(),
                    effective_fps
                );
                if let Some(logger) = json_logger.as_mut() {
                    logger.write_event(&SummaryLog {
                        event: "summary",
                        timestamp: timestamp_now(),
                        frame_index,
                        interval_seconds: options.log_interval_seconds,
                        active_tracks: fish.len(),
                        total_unique: self.tracker.total_unique(),
                        fps: effective_fps,
                    })?;
                    logger.flush()?;
                }
                last_summary = Instant::now();
            }
        }

        if let Some(logger) = json_logger.as_mut() {
            logger.flush()?;
        }
        Ok(frame_index)
    }
}

/// Draw detection boxes, centroid markers, and `Fish {id}` labels onto the
/// frame. Purely cosmetic; has no bearing on tracking.
pub fn draw_tracks(frame: &mut Mat, fish: &[TrackedFish], rects: &[BoundingBox]) -> Result<()> {
    let color = Scalar::new(0.0, 255.0, 0.0, 0.0);
    for rect in rects {
        imgproc::rectangle(
            frame,
            Rect::new(rect.x, rect.y, rect.width, rect.height),
            color,
            2,
            imgproc::LINE_8,
            0,
        )?;
    }
    for tracked in fish {
        let label = format!("Fish {}", tracked.id);
        let origin = Point::new(tracked.centroid.x - 10, tracked.centroid.y - 10);
        imgproc::put_text(
            frame,
            &label,
            origin,
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.5,
            color,
            2,
            imgproc::LINE_8,
            false,
        )?;
        imgproc::circle(
            frame,
            Point::new(tracked.centroid.x, tracked.centroid.y),
            4,
            color,
            -1,
            imgproc::LINE_8,
            0,
        )?;
    }
    Ok(())
}
