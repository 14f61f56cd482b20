//! Fish detection and tracking in video.
//!
//! Moving blobs are pulled out of each frame by MOG2 background subtraction
//! and carried across frames by greedy nearest-centroid matching. The tracker
//! half is pure (points and IDs only); the detector half owns the background
//! model and the OpenCV plumbing.

pub mod centroid;
pub mod detect;
pub mod log;
pub mod pipeline;

pub use centroid::{BoundingBox, Centroid, CentroidTracker, TrackId, TrackedFish};
pub use detect::{DetectorConfig, FishDetector};
pub use pipeline::{draw_tracks, FishTracker, FishTrackerConfig, ProcessOptions};
