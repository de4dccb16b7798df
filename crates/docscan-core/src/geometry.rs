// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Frame-space geometry: points and the document quadrilateral.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};
use crate::types::FrameSize;

/// Quadrilaterals with less enclosed area than this (in square pixels) are
/// treated as degenerate regardless of frame size.
pub const MIN_QUAD_AREA: f32 = 1.0;

/// A point in frame-pixel coordinates (origin top-left, y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// Four document corners in frame-pixel coordinates.
///
/// Corners are labelled relative to the upright (orientation-normalised)
/// frame. A usable quadrilateral is simple (its edges do not cross) and
/// encloses a non-trivial area; see [`Quadrilateral::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub bottom_left: Point,
}

impl Quadrilateral {
    pub fn new(top_left: Point, top_right: Point, bottom_right: Point, bottom_left: Point) -> Self {
        Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }

    /// Axis-aligned rectangle with its top-left corner at `(x, y)`.
    pub fn from_rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(
            Point::new(x, y),
            Point::new(x + width, y),
            Point::new(x + width, y + height),
            Point::new(x, y + height),
        )
    }

    /// The full bounds of a frame of the given size.
    pub fn full_frame(size: FrameSize) -> Self {
        Self::from_rect(0.0, 0.0, size.width as f32, size.height as f32)
    }

    /// Label four unordered corner points.
    ///
    /// The corner with the smallest `x + y` becomes top-left; the remaining
    /// corners follow clockwise (on screen) around the centroid, so any
    /// convex input produces a non-crossing labelling.
    pub fn from_unordered(points: [Point; 4]) -> Self {
        let cx = points.iter().map(|p| p.x).sum::<f32>() / 4.0;
        let cy = points.iter().map(|p| p.y).sum::<f32>() / 4.0;

        let mut sorted = points;
        sorted.sort_by(|a, b| {
            let angle_a = (a.y - cy).atan2(a.x - cx);
            let angle_b = (b.y - cy).atan2(b.x - cx);
            angle_a.total_cmp(&angle_b)
        });

        let start = sorted
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (a.x + a.y).total_cmp(&(b.x + b.y)))
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        sorted.rotate_left(start);

        Self::new(sorted[0], sorted[1], sorted[2], sorted[3])
    }

    /// Corners in clockwise order: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Signed shoelace area. The sign encodes winding direction.
    fn signed_area(&self) -> f32 {
        let c = self.corners();
        let mut area = 0.0f32;
        for i in 0..4 {
            let j = (i + 1) % 4;
            area += c[i].x * c[j].y;
            area -= c[j].x * c[i].y;
        }
        area / 2.0
    }

    /// Enclosed area in square pixels (shoelace formula).
    pub fn area(&self) -> f32 {
        self.signed_area().abs()
    }

    /// Whether no two edges of the polygon cross.
    ///
    /// For four vertices a crossing can only happen between opposite edges.
    pub fn is_simple(&self) -> bool {
        let [a, b, c, d] = self.corners();
        !segments_cross(a, b, c, d) && !segments_cross(b, c, d, a)
    }

    /// Check the simple-polygon / non-zero-area invariant.
    pub fn validate(&self) -> Result<()> {
        if !self.corners().iter().all(Point::is_finite) {
            return Err(ScanError::DegenerateGeometry(
                "corner coordinates are not finite".into(),
            ));
        }
        let area = self.area();
        if area < MIN_QUAD_AREA {
            return Err(ScanError::DegenerateGeometry(format!(
                "enclosed area {area:.2} is below {MIN_QUAD_AREA}"
            )));
        }
        if !self.is_simple() {
            return Err(ScanError::DegenerateGeometry(
                "edges cross each other".into(),
            ));
        }
        Ok(())
    }

    /// Edge lengths as `(top, right, bottom, left)`.
    pub fn edge_lengths(&self) -> (f32, f32, f32, f32) {
        (
            self.top_left.distance(&self.top_right),
            self.top_right.distance(&self.bottom_right),
            self.bottom_right.distance(&self.bottom_left),
            self.bottom_left.distance(&self.top_left),
        )
    }

    /// Interior angles in degrees, in [`corners`](Self::corners) order.
    ///
    /// Reflex corners of a concave polygon report values above 180.
    pub fn interior_angles(&self) -> [f32; 4] {
        let c = self.corners();
        let winding = self.signed_area().signum();
        let mut angles = [0.0f32; 4];

        for i in 0..4 {
            let prev = c[(i + 3) % 4];
            let cur = c[i];
            let next = c[(i + 1) % 4];

            let (ax, ay) = (prev.x - cur.x, prev.y - cur.y);
            let (bx, by) = (next.x - cur.x, next.y - cur.y);
            let norm = (ax.hypot(ay) * bx.hypot(by)).max(f32::EPSILON);
            let cos = ((ax * bx + ay * by) / norm).clamp(-1.0, 1.0);
            let theta = cos.acos().to_degrees();

            // Turn direction at this vertex; disagreeing with the polygon's
            // winding marks a reflex corner.
            let turn = (cur.x - prev.x) * (next.y - cur.y) - (cur.y - prev.y) * (next.x - cur.x);
            angles[i] = if turn.signum() == winding || turn == 0.0 {
                theta
            } else {
                360.0 - theta
            };
        }

        angles
    }

    /// Largest absolute deviation of any interior angle from 90 degrees.
    pub fn max_angle_deviation(&self) -> f32 {
        self.interior_angles()
            .iter()
            .map(|a| (a - 90.0).abs())
            .fold(0.0, f32::max)
    }

    /// Largest distance between corresponding corners of two quadrilaterals.
    pub fn max_corner_displacement(&self, other: &Quadrilateral) -> f32 {
        self.corners()
            .iter()
            .zip(other.corners().iter())
            .map(|(a, b)| a.distance(b))
            .fold(0.0, f32::max)
    }

    /// Map corners from a frame of size `from` onto a frame of size `to`.
    pub fn rescaled(&self, from: FrameSize, to: FrameSize) -> Self {
        if from == to || from.width == 0 || from.height == 0 {
            return *self;
        }
        let sx = to.width as f32 / from.width as f32;
        let sy = to.height as f32 / from.height as f32;
        let scale = |p: Point| Point::new(p.x * sx, p.y * sy);
        Self::new(
            scale(self.top_left),
            scale(self.top_right),
            scale(self.bottom_right),
            scale(self.bottom_left),
        )
    }
}

/// Whether segment `p1-p2` properly intersects segment `p3-p4`.
fn segments_cross(p1: Point, p2: Point, p3: Point, p4: Point) -> bool {
    fn orient(a: Point, b: Point, c: Point) -> f32 {
        (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
    }
    let d1 = orient(p3, p4, p1);
    let d2 = orient(p3, p4, p2);
    let d3 = orient(p1, p2, p3);
    let d4 = orient(p1, p2, p4);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

// -- Tests --------------------------------------------------------------------
