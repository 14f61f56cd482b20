use std::cmp::Ordering;
use std::collections::HashMap;

/// Monotonically increasing track handle. Never reused, even after a track
/// is deregistered.
pub type TrackId = usize;

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Center of the box, truncated toward zero.
    pub fn centroid(&self) -> Centroid {
        Centroid {
            x: (self.x as f64 + self.width as f64 / 2.0) as i32,
            y: (self.y as f64 + self.height as f64 / 2.0) as i32,
        }
    }
}

/// Integer 2D point used for matching. The tracker has no notion of boxes or
/// pixels beyond this.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Centroid {
    pub x: i32,
    pub y: i32,
}

impl Centroid {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Centroid) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Snapshot of a live track as returned by [`CentroidTracker::update`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackedFish {
    pub id: TrackId,
    pub centroid: Centroid,
}

#[derive(Clone, Copy, Debug)]
struct Track {
    centroid: Centroid,
    disappeared: u32,
}

/// Assigns stable identities to per-frame detections by greedy
/// nearest-centroid matching.
///
/// A track that goes unmatched accumulates a disappeared count and is
/// deregistered once the count exceeds `max_disappeared`. Matching is a
/// deliberately non-optimal greedy heuristic: candidate pairs are visited in
/// order of increasing per-track minimum distance and the first unclaimed
/// pairing wins. One tracker instance per video stream; not thread-safe.
pub struct CentroidTracker {
    tracks: HashMap<TrackId, Track>,
    next_id: TrackId,
    max_disappeared: u32,
}

impl CentroidTracker {
    pub fn new(max_disappeared: u32) -> Self {
        Self {
            tracks: HashMap::new(),
            next_id: 0,
            max_disappeared,
        }
    }

    /// Register a new track at `centroid` with the next available ID.
    pub fn register(&mut self, centroid: Centroid) -> TrackId {
        let id = self.next_id;
        self.tracks.insert(
            id,
            Track {
                centroid,
                disappeared: 0,
            },
        );
        self.next_id += 1;
        id
    }

    /// Remove a track from the live set. Its ID is retired permanently.
    pub fn deregister(&mut self, id: TrackId) {
        self.tracks.remove(&id);
    }

    /// Number of live tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Total tracks ever registered.
    pub fn total_unique(&self) -> usize {
        self.next_id
    }

    /// Consecutive missed frames for a live track, if it exists.
    pub fn disappeared_count(&self, id: TrackId) -> Option<u32> {
        self.tracks.get(&id).map(|t| t.disappeared)
    }

    /// Live tracks in ID-ascending order.
    pub fn tracks(&self) -> Vec<TrackedFish> {
        let mut out: Vec<TrackedFish> = self
            .tracks
            .iter()
            .map(|(id, track)| TrackedFish {
                id: *id,
                centroid: track.centroid,
            })
            .collect();
        out.sort_by_key(|fish| fish.id);
        out
    }

    /// Advance the tracker by one frame of detections and return the live
    /// track set.
    ///
    /// With no detections every track's disappeared counter is bumped and no
    /// centroid moves. With no existing tracks every detection is registered.
    /// Otherwise detections are claimed greedily by distance; unmatched
    /// tracks are bumped toward removal, and unmatched detections spawn new
    /// tracks only when there are more detections than tracks.
    pub fn update(&mut self, rects: &[BoundingBox]) -> Vec<TrackedFish> {
        if rects.is_empty() {
            let mut expired = Vec::new();
            for (id, track) in self.tracks.iter_mut() {
                track.disappeared += 1;
                if track.disappeared > self.max_disappeared {
                    expired.push(*id);
                }
            }
            for id in expired {
                self.deregister(id);
            }
            return self.tracks();
        }

        let input: Vec<Centroid> = rects.iter().map(BoundingBox::centroid).collect();

        if self.tracks.is_empty() {
            for centroid in &input {
                self.register(*centroid);
            }
            return self.tracks();
        }

        // Row order is allocation order: IDs ascend monotonically, so sorting
        // by ID reconstructs it.
        let mut ids: Vec<TrackId> = self.tracks.keys().copied().collect();
        ids.sort_unstable();
        let existing: Vec<Centroid> = ids
            .iter()
            .filter_map(|id| self.tracks.get(id).map(|t| t.centroid))
            .collect();

        let dist = distance_matrix(&existing, &input);
        let pairs = greedy_assign(&dist);

        let mut used_rows = vec![false; existing.len()];
        let mut used_cols = vec![false; input.len()];
        for &(row, col) in &pairs {
            if let Some(track) = self.tracks.get_mut(&ids[row]) {
                track.centroid = input[col];
                track.disappeared = 0;
            }
            used_rows[row] = true;
            used_cols[col] = true;
        }

        // Tracks that went unmatched this frame.
        let mut expired = Vec::new();
        for (row, id) in ids.iter().enumerate() {
            if used_rows[row] {
                continue;
            }
            if let Some(track) = self.tracks.get_mut(id) {
                track.disappeared += 1;
                if track.disappeared > self.max_disappeared {
                    expired.push(*id);
                }
            }
        }
        for id in expired {
            self.deregister(id);
        }

        // New tracks are only spawned when detections outnumber tracks;
        // otherwise unmatched detections are dropped for this frame.
        if input.len() > existing.len() {
            for (col, centroid) in input.iter().enumerate() {
                if !used_cols[col] {
                    self.register(*centroid);
                }
            }
        }

        self.tracks()
    }
}

/// Pairwise Euclidean distances, tracked centroids as rows and input
/// centroids as columns.
pub fn distance_matrix(tracked: &[Centroid], input: &[Centroid]) -> Vec<Vec<f64>> {
    tracked
        .iter()
        .map(|t| input.iter().map(|i| t.distance_to(*i)).collect())
        .collect()
}

/// Greedy assignment over a distance matrix.
///
/// Rows are visited closest-first (ascending per-row minimum, stable sort so
/// ties fall back to row index). Each row proposes the column of its first
/// minimum; a proposal is accepted only if neither side has been claimed in
/// this pass. Returns accepted (row, column) pairs. Deterministic for a fixed
/// matrix.
pub fn greedy_assign(dist: &[Vec<f64>]) -> Vec<(usize, usize)> {
    if dist.is_empty() || dist[0].is_empty() {
        return Vec::new();
    }

    let row_min = |row: &[f64]| row.iter().copied().fold(f64::INFINITY, f64::min);
    let argmin = |row: &[f64]| {
        let mut best = 0;
        for (col, value) in row.iter().enumerate() {
            if *value < row[best] {
                best = col;
            }
        }
        best
    };

    let mut rows: Vec<usize> = (0..dist.len()).collect();
    rows.sort_by(|&a, &b| {
        row_min(&dist[a])
            .partial_cmp(&row_min(&dist[b]))
            .unwrap_or(Ordering::Equal)
    });

    let mut used_rows = vec![false; dist.len()];
    let mut used_cols = vec![false; dist[0].len()];
    let mut pairs = Vec::new();

    for &row in &rows {
        let col = argmin(&dist[row]);
        if used_rows[row] || used_cols[col] {
            continue;
        }
        used_rows[row] = true;
        used_cols[col] = true;
        pairs.push((row, col));
    }
    pairs
}
