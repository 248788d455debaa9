//! Virtual angular-segment ring around the vehicle contour.
//!
//! The ground plane is divided into a fixed number of angular segments
//! centered on the vehicle. Each segment tracks the nearest obstacle seen
//! this frame, bounded below by the vehicle contour, approximating the
//! drivable boundary as a closed ring of per-segment distances.

use std::f32::consts::TAU;

use crate::core::Point2D;

/// Segments used when none are configured.
pub const DEFAULT_SEGMENT_COUNT: usize = 72;

const EPSILON: f32 = 1e-5;

/// One radial segment from the contour out to the nearest obstacle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RingSegment {
    pub start: Point2D,
    pub end: Point2D,
}

/// Per-segment virtual range ring.
#[derive(Clone, Debug)]
pub struct VirtualRing {
    contour: Vec<Point2D>,
    center: Point2D,
    segment_count: usize,
    directions: Vec<Point2D>,
    start_dist: Vec<f32>,
    end_dist: Vec<f32>,
    ready: bool,
}

impl Default for VirtualRing {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualRing {
    pub fn new() -> VirtualRing {
        let mut ring = VirtualRing {
            contour: Vec::new(),
            center: Point2D::ZERO,
            segment_count: 0,
            directions: Vec::new(),
            start_dist: Vec::new(),
            end_dist: Vec::new(),
            ready: false,
        };
        ring.set_segment_count(DEFAULT_SEGMENT_COUNT);
        ring
    }

    /// Change the segment count (clamped to at least 3) and rebuild the
    /// segment geometry. Returns false when the count is unchanged.
    pub fn set_segment_count(&mut self, count: usize) -> bool {
        let clamped = count.max(3);
        if clamped == self.segment_count && !self.directions.is_empty() {
            return false;
        }

        self.segment_count = clamped;
        self.directions = (0..clamped)
            .map(|i| {
                let angle = (i as f32 + 0.5) * TAU / clamped as f32;
                Point2D::new(angle.cos(), angle.sin())
            })
            .collect();
        self.start_dist = vec![0.0; clamped];
        self.end_dist = vec![f32::INFINITY; clamped];

        if self.contour.len() >= 3 {
            let contour = std::mem::take(&mut self.contour);
            self.set_vehicle_contour(&contour);
        } else {
            self.ready = false;
        }
        true
    }

    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    /// True once a contour with at least 3 points has been set.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Set the vehicle contour (ground frame) and recompute the per-segment
    /// inner radii. Contours with fewer than 3 points are ignored.
    pub fn set_vehicle_contour(&mut self, contour: &[Point2D]) {
        if contour.len() < 3 {
            return;
        }

        self.contour = contour.to_vec();

        let sum = contour.iter().fold(Point2D::ZERO, |acc, p| acc + *p);
        self.center = sum * (1.0 / contour.len() as f32);

        for i in 0..self.segment_count {
            let distance = self.contour_ray_distance(self.center, self.directions[i]);
            self.start_dist[i] = distance.max(0.0);
        }

        self.ready = true;
    }

    /// Fold this frame's obstacle evidence into the segments.
    ///
    /// Detection points index into their angular bin directly; track
    /// footprints are ray-cast per segment so a quad can shadow several
    /// bins at once.
    pub fn update(&mut self, detections: &[Point2D], track_footprints: &[[Point2D; 4]]) {
        self.reset();

        if !self.ready {
            return;
        }

        for point in detections {
            let delta = *point - self.center;
            let distance = delta.length();
            if !distance.is_finite() || distance <= EPSILON {
                continue;
            }

            let index = self.segment_index(delta.y.atan2(delta.x));
            if distance <= self.start_dist[index] + EPSILON {
                continue;
            }
            if distance < self.end_dist[index] {
                self.end_dist[index] = distance;
            }
        }

        for footprint in track_footprints {
            for i in 0..self.segment_count {
                let distance = polygon_ray_distance(self.center, self.directions[i], footprint);
                if !distance.is_finite() || distance <= EPSILON {
                    continue;
                }
                if distance <= self.start_dist[i] + EPSILON {
                    continue;
                }
                if distance < self.end_dist[i] {
                    self.end_dist[i] = distance;
                }
            }
        }
    }

    /// Clear all per-frame obstacle distances.
    pub fn reset(&mut self) {
        self.end_dist.fill(f32::INFINITY);
    }

    /// Ring of one point per segment at the obstacle distance, capped by
    /// `fallback_range` and clamped outward to the contour. Empty until a
    /// contour is set or when the fallback is non-positive.
    pub fn ring(&self, fallback_range: f32) -> Vec<Point2D> {
        if !self.ready || fallback_range <= 0.0 {
            return Vec::new();
        }

        (0..self.segment_count)
            .map(|i| {
                let length = self.end_dist[i].min(fallback_range).max(self.start_dist[i]);
                self.center + self.directions[i] * length
            })
            .collect()
    }

    /// Per-segment start/end point pairs under the same clamping as
    /// [`VirtualRing::ring`].
    pub fn segments(&self, fallback_range: f32) -> Vec<RingSegment> {
        if !self.ready || fallback_range <= 0.0 {
            return Vec::new();
        }

        (0..self.segment_count)
            .map(|i| {
                let length = self.end_dist[i].min(fallback_range).max(self.start_dist[i]);
                RingSegment {
                    start: self.center + self.directions[i] * self.start_dist[i],
                    end: self.center + self.directions[i] * length,
                }
            })
            .collect()
    }

    /// Contour distance along one segment direction (for tests and
    /// diagnostics).
    pub fn segment_start_dist(&self, index: usize) -> Option<f32> {
        self.start_dist.get(index).copied()
    }

    fn segment_index(&self, angle: f32) -> usize {
        let mut normalized = angle % TAU;
        if normalized < 0.0 {
            normalized += TAU;
        }
        let index = (normalized / TAU * self.segment_count as f32) as usize;
        index.min(self.segment_count - 1)
    }

    fn contour_ray_distance(&self, origin: Point2D, direction: Point2D) -> f32 {
        if self.contour.len() < 3 {
            return 0.0;
        }

        let mut best = f32::INFINITY;
        let count = self.contour.len();
        for i in 0..count {
            let a = self.contour[i];
            let b = self.contour[(i + 1) % count];
            if let Some(t) = ray_segment_intersection(origin, direction, a, b) {
                best = best.min(t);
            }
        }

        if best.is_finite() {
            best
        } else {
            0.0
        }
    }
}

/// Nearest intersection distance of a ray with a convex quad boundary.
fn polygon_ray_distance(origin: Point2D, direction: Point2D, polygon: &[Point2D; 4]) -> f32 {
    let mut best = f32::INFINITY;
    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[(i + 1) % polygon.len()];
        if let Some(t) = ray_segment_intersection(origin, direction, a, b) {
            best = best.min(t);
        }
    }
    best
}

/// Ray/segment intersection parameter along the ray, or `None` on a miss.
fn ray_segment_intersection(
    origin: Point2D,
    direction: Point2D,
    a: Point2D,
    b: Point2D,
) -> Option<f32> {
    let edge = b - a;
    let denom = direction.cross(edge);
    if denom.abs() < EPSILON {
        return None;
    }

    let delta = a - origin;
    let t = delta.cross(edge) / denom;
    let u = delta.cross(direction) / denom;
    if t >= 0.0 && (0.0..=1.0).contains(&u) {
        Some(t)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square_contour() -> Vec<Point2D> {
        vec![
            Point2D::new(-1.0, -1.0),
            Point2D::new(1.0, -1.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(-1.0, 1.0),
        ]
    }

    #[test]
    fn test_segment_count_clamps() {
        let mut ring = VirtualRing::new();
        assert_eq!(ring.segment_count(), DEFAULT_SEGMENT_COUNT);
        ring.set_segment_count(1);
        assert_eq!(ring.segment_count(), 3);
        ring.set_segment_count(16);
        assert_eq!(ring.segment_count(), 16);
    }

    #[test]
    fn test_not_ready_outputs_empty() {
        let mut ring = VirtualRing::new();
        assert!(ring.ring(10.0).is_empty());
        assert!(ring.segments(10.0).is_empty());

        ring.set_vehicle_contour(&square_contour());
        assert!(ring.is_ready());
        assert!(ring.ring(0.0).is_empty());
        assert_eq!(ring.ring(10.0).len(), DEFAULT_SEGMENT_COUNT);
    }

    #[test]
    fn test_contour_with_too_few_points_ignored() {
        let mut ring = VirtualRing::new();
        ring.set_vehicle_contour(&[Point2D::new(0.0, 0.0), Point2D::new(1.0, 0.0)]);
        assert!(!ring.is_ready());
    }

    #[test]
    fn test_detection_sets_segment_distance() {
        let mut ring = VirtualRing::new();
        ring.set_segment_count(8);
        ring.set_vehicle_contour(&square_contour());

        ring.update(&[Point2D::new(5.0, 0.0)], &[]);

        let points = ring.ring(10.0);
        assert_eq!(points.len(), 8);
        assert!((points[0].length() - 5.0).abs() < 0.1);
        // Untouched segments sit at the fallback range.
        assert!((points[4].length() - 10.0).abs() < 0.1);
    }

    #[test]
    fn test_detection_inside_contour_ignored() {
        let mut ring = VirtualRing::new();
        ring.set_segment_count(8);
        ring.set_vehicle_contour(&square_contour());

        // Closer than the contour along segment 0: must not shrink the ring.
        ring.update(&[Point2D::new(0.5, 0.0)], &[]);
        let points = ring.ring(10.0);
        assert!((points[0].length() - 10.0).abs() < 0.1);
    }

    #[test]
    fn test_segment_start_from_contour() {
        let mut ring = VirtualRing::new();
        ring.set_segment_count(4);
        ring.set_vehicle_contour(&square_contour());
        // Directions at 45/135/225/315 degrees hit the unit square corners.
        for i in 0..4 {
            assert_relative_eq!(
                ring.segment_start_dist(i).unwrap(),
                std::f32::consts::SQRT_2,
                epsilon = 1e-4
            );
        }
    }

    #[test]
    fn test_segment_count_rebuild_is_idempotent() {
        let mut ring = VirtualRing::new();
        ring.set_segment_count(8);
        ring.set_vehicle_contour(&square_contour());
        let first: Vec<f32> = (0..8).map(|i| ring.segment_start_dist(i).unwrap()).collect();

        assert!(!ring.set_segment_count(8));
        let second: Vec<f32> = (0..8).map(|i| ring.segment_start_dist(i).unwrap()).collect();
        assert_eq!(first, second);

        // Changing away and back recomputes the same geometry.
        ring.set_segment_count(16);
        ring.set_segment_count(8);
        let third: Vec<f32> = (0..8).map(|i| ring.segment_start_dist(i).unwrap()).collect();
        for (a, b) in first.iter().zip(third.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_track_footprint_shadows_segments() {
        let mut ring = VirtualRing::new();
        ring.set_segment_count(8);
        ring.set_vehicle_contour(&square_contour());

        // A wide box straight ahead on +x, spanning y in [-2, 2].
        let footprint = [
            Point2D::new(4.0, -2.0),
            Point2D::new(6.0, -2.0),
            Point2D::new(6.0, 2.0),
            Point2D::new(4.0, 2.0),
        ];
        ring.update(&[], &[footprint]);

        let points = ring.ring(10.0);
        // Segments 0 and 7 point into the box.
        assert!(points[0].length() < 10.0 - 0.1);
        assert!(points[7].length() < 10.0 - 0.1);
        // The opposite side stays at the fallback.
        assert!((points[3].length() - 10.0).abs() < 0.1);
    }

    #[test]
    fn test_segments_end_never_inside_start() {
        let mut ring = VirtualRing::new();
        ring.set_segment_count(8);
        ring.set_vehicle_contour(&square_contour());
        ring.update(&[], &[]);

        // Fallback shorter than the contour radius: end clamps to start.
        for segment in ring.segments(0.5) {
            let start = (segment.start - Point2D::ZERO).length();
            let end = (segment.end - Point2D::ZERO).length();
            assert!(end + 1e-5 >= start);
        }
    }

    #[test]
    fn test_ray_segment_intersection() {
        let hit = ray_segment_intersection(
            Point2D::ZERO,
            Point2D::new(1.0, 0.0),
            Point2D::new(2.0, -1.0),
            Point2D::new(2.0, 1.0),
        );
        assert_relative_eq!(hit.unwrap(), 2.0, epsilon = 1e-6);

        // Behind the origin.
        assert!(ray_segment_intersection(
            Point2D::ZERO,
            Point2D::new(1.0, 0.0),
            Point2D::new(-2.0, -1.0),
            Point2D::new(-2.0, 1.0),
        )
        .is_none());

        // Parallel.
        assert!(ray_segment_intersection(
            Point2D::ZERO,
            Point2D::new(1.0, 0.0),
            Point2D::new(0.0, 1.0),
            Point2D::new(5.0, 1.0),
        )
        .is_none());
    }
}
