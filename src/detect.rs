use anyhow::{Context, Result};
use opencv::{
    core::{self, Point, Ptr, Size, Vector},
    imgproc::{
        self, CHAIN_APPROX_SIMPLE, MORPH_CLOSE, MORPH_ELLIPSE, MORPH_OPEN, RETR_EXTERNAL,
        THRESH_BINARY,
    },
    prelude::*,
    video::{
        create_background_subtractor_mog2, BackgroundSubtractorMOG2, BackgroundSubtractorMOG2Trait,
    },
};

use crate::centroid::BoundingBox;

/// Background subtraction parameters, fixed at construction.
#[derive(Clone, Copy, Debug)]
pub struct DetectorConfig {
    /// Minimum contour area (pixels^2) for a region to count as a fish.
    pub min_area: f64,
    /// Frames of history the background model adapts over.
    pub history: i32,
    /// Squared-distance threshold deciding whether a pixel fits the model.
    pub var_threshold: f64,
    /// Classify shadow pixels separately; they are always excluded from the
    /// foreground mask.
    pub detect_shadows: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_area: 500.0,
            history: 500,
            var_threshold: 16.0,
            detect_shadows: false,
        }
    }
}

/// Foreground blob detector backed by an MOG2 background model.
///
/// The model is owned by this instance and mutated on every call, so one
/// detector serves exactly one video stream. Early frames under-detect until
/// the model has accumulated history; that warm-up is expected.
pub struct FishDetector {
    subtractor: Ptr<BackgroundSubtractorMOG2>,
    kernel: Mat,
    min_area: f64,
    detect_shadows: bool,
}

impl FishDetector {
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        let subtractor = create_background_subtractor_mog2(
            config.history,
            config.var_threshold,
            config.detect_shadows,
        )
        .context("Failed to create background subtractor")?;

        // Elliptical kernel for morphological ops
        let kernel = imgproc::get_structuring_element(
            MORPH_ELLIPSE,
            Size::new(5, 5),
            Point::new(-1, -1),
        )?;

        Ok(Self {
            subtractor,
            kernel,
            min_area: config.min_area,
            detect_shadows: config.detect_shadows,
        })
    }

    /// Classify the frame against the background model, fold the frame into
    /// the model, and return the bounding boxes of foreground regions with
    /// contour area >= `min_area`. Boxes come back in contour discovery
    /// order; nothing is sorted or deduplicated.
    pub fn detect(&mut self, frame: &Mat) -> Result<Vec<BoundingBox>> {
        let mut fg_mask = Mat::default();
        // qualified call: MOG2 re-declares apply, so the method call is
        // ambiguous between the base and MOG2 traits
        BackgroundSubtractorMOG2Trait::apply(&mut self.subtractor, frame, &mut fg_mask, -1.0)
            .context("Background subtraction failed")?;

        // MOG2 marks shadows as 127; keep only confident foreground (255)
        if self.detect_shadows {
            let mut binary = Mat::default();
            imgproc::threshold(&fg_mask, &mut binary, 200.0, 255.0, THRESH_BINARY)?;
            fg_mask = binary;
        }

        // Open to kill single-pixel noise, close to fill small gaps
        let mut opened = Mat::default();
        imgproc::morphology_ex(
            &fg_mask,
            &mut opened,
            MORPH_OPEN,
            &self.kernel,
            Point::new(-1, -1),
            1,
            core::BORDER_CONSTANT,
            imgproc::morphology_default_border_value()?,
        )?;
        let mut closed = Mat::default();
        imgproc::morphology_ex(
            &opened,
            &mut closed,
            MORPH_CLOSE,
            &self.kernel,
            Point::new(-1, -1),
            1,
            core::BORDER_CONSTANT,
            imgproc::morphology_default_border_value()?,
        )?;

        let mut contours = Vector::<Vector<Point>>::new();
        imgproc::find_contours(
            &closed,
            &mut contours,
            RETR_EXTERNAL,
            CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )
        .context("Contour extraction failed")?;

        let mut rects = Vec::new();
        for contour in contours.iter() {
            if imgproc::contour_area(&contour, false)? < self.min_area {
                continue;
            }
            let rect = imgproc::bounding_rect(&contour)?;
            rects.push(BoundingBox::new(rect.x, rect.y, rect.width, rect.height));
        }
        Ok(rects)
    }
}
