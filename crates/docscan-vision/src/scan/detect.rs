// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rectangle detection — finds the most plausible document quadrilateral in an
// upright frame.
//
// ## Pipeline
//
// 1. Downscale so the larger side fits `max_processing_dimension`
// 2. Grayscale, Gaussian blur, Canny edges
// 3. Dilate the edge map to close small gaps at corners
// 4. Trace contours and take the convex hull of each
// 5. Fit four corners to each hull; discard hulls a quadrilateral does not
//    describe within `polygon_epsilon_fraction` of the hull perimeter
// 6. Discard candidates below the noise-floor area or with implausible
//    proportions
// 7. Keep the largest candidate and score it for the overlay
//
// The returned corners are in the coordinates of the frame passed in.

use docscan_core::config::DetectionConfig;
use docscan_core::{DetectionResult, FrameSize, Point, Quadrilateral};
use image::{GrayImage, RgbaImage};
use imageproc::contours::find_contours;
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::{arc_length, convex_hull};
use imageproc::morphology::dilate;
use imageproc::point::Point as PixelPoint;
use tracing::{debug, instrument, trace};

use crate::image::processor::ImageProcessor;

/// Samples taken along each edge when measuring edge contrast.
const CONTRAST_SAMPLES_PER_EDGE: usize = 16;

/// Mean inside/outside luma difference that counts as full contrast.
const FULL_CONTRAST: f32 = 96.0;

/// Opposite sides whose lengths differ by more than this fraction of the
/// longer one are not a document seen at any sane angle.
const MAX_OPPOSITE_SIDE_DIFFERENCE: f32 = 0.9;

/// Stateless rectangle detector.
#[derive(Debug, Clone, Default)]
pub struct RectangleDetector {
    config: DetectionConfig,
}

/// A scored candidate in processing-image coordinates.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    quad: Quadrilateral,
    area: f32,
    confidence: u8,
}

impl RectangleDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Search `image` (already upright) for a document rectangle.
    ///
    /// "Nothing found" is a normal outcome and returns
    /// [`DetectionResult::none`].
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn detect(&self, image: &RgbaImage) -> DetectionResult {
        let frame_size = FrameSize::new(image.width(), image.height());
        if frame_size.width == 0 || frame_size.height == 0 {
            return DetectionResult::none();
        }

        let (small, _scale) = ImageProcessor::from_rgba(image.clone())
            .downscale(self.config.max_processing_dimension);
        let luma = small.to_luma();
        let work_size = FrameSize::new(luma.width(), luma.height());

        let edges = self.edge_map(&luma);
        let candidates = self.candidates(&edges, &luma, work_size);
        debug!(candidates = candidates.len(), "Rectangle candidates scored");

        let best = candidates.into_iter().max_by(|a, b| {
            a.area
                .total_cmp(&b.area)
                .then(a.confidence.cmp(&b.confidence))
        });

        match best {
            Some(candidate) => {
                let quad = candidate.quad.rescaled(work_size, frame_size);
                debug!(confidence = candidate.confidence, ?quad, "Rectangle detected");
                DetectionResult::found(quad, candidate.confidence)
            }
            None => DetectionResult::none(),
        }
    }

    /// Blurred Canny edges, dilated so a document outline forms one closed
    /// contour.
    fn edge_map(&self, luma: &GrayImage) -> GrayImage {
        let blurred = if self.config.blur_sigma > 0.0 {
            gaussian_blur_f32(luma, self.config.blur_sigma)
        } else {
            luma.clone()
        };
        let edges = canny(&blurred, self.config.canny_low, self.config.canny_high);
        if self.config.edge_dilation > 0 {
            dilate(&edges, Norm::LInf, self.config.edge_dilation)
        } else {
            edges
        }
    }

    fn candidates(&self, edges: &GrayImage, luma: &GrayImage, size: FrameSize) -> Vec<Candidate> {
        let min_area = self.config.min_area_fraction * size.area();
        let contours = find_contours::<i32>(edges);
        trace!(contours = contours.len(), "Contours traced");

        let mut out = Vec::new();
        for contour in &contours {
            if contour.points.len() < 4 || bounding_area(&contour.points) < min_area {
                continue;
            }

            let hull = convex_hull(contour.points.as_slice());
            if hull.len() < 4 {
                continue;
            }
            let tolerance =
                (self.config.polygon_epsilon_fraction * arc_length(&hull, true)) as f32;
            let hull: Vec<Point> = hull
                .iter()
                .map(|p| Point::new(p.x as f32, p.y as f32))
                .collect();

            let Some(corners) = fit_quadrilateral(&hull, tolerance) else {
                continue;
            };
            let quad = Quadrilateral::from_unordered(corners);
            if quad.validate().is_err() {
                continue;
            }
            let area = quad.area();
            if area < min_area || !has_plausible_proportions(&quad) {
                continue;
            }

            let confidence = self.score(&quad, luma);
            trace!(area, confidence, "Candidate accepted");
            out.push(Candidate {
                quad,
                area,
                confidence,
            });
        }
        out
    }

    /// Confidence in `0..=100`: half edge contrast, half shape regularity.
    fn score(&self, quad: &Quadrilateral, luma: &GrayImage) -> u8 {
        let offset = self.config.edge_dilation as f32 + 4.0;
        let contrast = edge_contrast(quad, luma, offset);
        let regularity = regularity(quad);
        (100.0 * (0.5 * contrast + 0.5 * regularity))
            .round()
            .clamp(0.0, 100.0) as u8
    }
}

// -- Quadrilateral fitting ----------------------------------------------------

/// Reduce a convex hull to four corners.
///
/// Takes the hull diameter, the point farthest from it, and then the point
/// farthest outside the resulting triangle. Returns `None` when some hull
/// point strays more than `tolerance` from the fitted outline, i.e. the shape
/// is not a quadrilateral (a triangle, a disc, a pentagon...).
fn fit_quadrilateral(hull: &[Point], tolerance: f32) -> Option<[Point; 4]> {
    if hull.len() < 4 {
        return None;
    }

    let mut diameter = (0usize, 0usize, -1.0f32);
    for i in 0..hull.len() {
        for j in (i + 1)..hull.len() {
            let d = hull[i].distance(&hull[j]);
            if d > diameter.2 {
                diameter = (i, j, d);
            }
        }
    }
    let (a, b) = (hull[diameter.0], hull[diameter.1]);

    let c = *hull
        .iter()
        .max_by(|p, q| line_distance(a, b, **p).total_cmp(&line_distance(a, b, **q)))?;

    let triangle = [a, b, c];
    let mut fourth: Option<(Point, f32)> = None;
    for edge in 0..3 {
        let (p, q, r) = (triangle[edge], triangle[(edge + 1) % 3], triangle[(edge + 2) % 3]);
        let inside = cross(p, q, r);
        for &h in hull {
            if cross(p, q, h) * inside < 0.0 {
                let distance = line_distance(p, q, h);
                if fourth.is_none_or(|(_, best)| distance > best) {
                    fourth = Some((h, distance));
                }
            }
        }
    }
    let (d, d_distance) = fourth?;
    if d_distance <= tolerance {
        return None;
    }

    let corners = [a, b, c, d];
    let outline = Quadrilateral::from_unordered(corners);
    let fits = hull
        .iter()
        .all(|p| distance_to_outline(&outline, *p) <= tolerance);
    fits.then_some(corners)
}

/// Reject shapes whose opposite sides are wildly different in length.
fn has_plausible_proportions(quad: &Quadrilateral) -> bool {
    let (top, right, bottom, left) = quad.edge_lengths();
    let plausible = |x: f32, y: f32| (x - y).abs() <= MAX_OPPOSITE_SIDE_DIFFERENCE * x.max(y);
    plausible(top, bottom) && plausible(left, right)
}

/// 1.0 for a perfect rectangle, falling towards 0 as corners skew away from
/// 90 degrees and opposite sides diverge in length.
fn regularity(quad: &Quadrilateral) -> f32 {
    let (top, right, bottom, left) = quad.edge_lengths();
    let ratio = |x: f32, y: f32| {
        let longest = x.max(y);
        if longest > 0.0 { x.min(y) / longest } else { 0.0 }
    };
    let angles = (1.0 - quad.max_angle_deviation() / 90.0).max(0.0);
    angles * ratio(top, bottom) * ratio(left, right)
}

/// Mean luma step across the quadrilateral's edges, normalised to `0..=1`.
///
/// Corners are clockwise on screen, so the inward normal of edge `p -> q` is
/// `(-dy, dx)`.
fn edge_contrast(quad: &Quadrilateral, luma: &GrayImage, offset: f32) -> f32 {
    let corners = quad.corners();
    let mut total = 0.0f32;
    let mut samples = 0u32;

    for i in 0..4 {
        let (p, q) = (corners[i], corners[(i + 1) % 4]);
        let length = p.distance(&q);
        if length <= f32::EPSILON {
            continue;
        }
        let (nx, ny) = (-(q.y - p.y) / length, (q.x - p.x) / length);

        for k in 0..CONTRAST_SAMPLES_PER_EDGE {
            let t = 0.15 + 0.7 * k as f32 / (CONTRAST_SAMPLES_PER_EDGE - 1) as f32;
            let (x, y) = (p.x + t * (q.x - p.x), p.y + t * (q.y - p.y));
            let inside = sample(luma, x + nx * offset, y + ny * offset);
            let outside = sample(luma, x - nx * offset, y - ny * offset);
            if let (Some(inside), Some(outside)) = (inside, outside) {
                total += (inside - outside).abs();
                samples += 1;
            }
        }
    }

    if samples == 0 {
        return 0.0;
    }
    (total / samples as f32 / FULL_CONTRAST).min(1.0)
}

fn sample(luma: &GrayImage, x: f32, y: f32) -> Option<f32> {
    let (xi, yi) = (x.round(), y.round());
    if xi < 0.0 || yi < 0.0 || xi >= luma.width() as f32 || yi >= luma.height() as f32 {
        return None;
    }
    Some(luma.get_pixel(xi as u32, yi as u32).0[0] as f32)
}

// -- Small geometry helpers ---------------------------------------------------

fn bounding_area(points: &[PixelPoint<i32>]) -> f32 {
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (i32::MAX, i32::MAX, i32::MIN, i32::MIN);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    if max_x < min_x {
        return 0.0;
    }
    (max_x - min_x) as f32 * (max_y - min_y) as f32
}

/// Z component of `(q - p) x (r - p)`.
fn cross(p: Point, q: Point, r: Point) -> f32 {
    (q.x - p.x) * (r.y - p.y) - (q.y - p.y) * (r.x - p.x)
}

/// Distance from `r` to the infinite line through `p` and `q`.
fn line_distance(p: Point, q: Point, r: Point) -> f32 {
    let length = p.distance(&q);
    if length <= f32::EPSILON {
        return p.distance(&r);
    }
    cross(p, q, r).abs() / length
}

fn segment_distance(p: Point, q: Point, r: Point) -> f32 {
    let (dx, dy) = (q.x - p.x, q.y - p.y);
    let length_sq = dx * dx + dy * dy;
    if length_sq <= f32::EPSILON {
        return p.distance(&r);
    }
    let t = (((r.x - p.x) * dx + (r.y - p.y) * dy) / length_sq).clamp(0.0, 1.0);
    r.distance(&Point::new(p.x + t * dx, p.y + t * dy))
}

fn distance_to_outline(quad: &Quadrilateral, r: Point) -> f32 {
    let c = quad.corners();
    (0..4)
        .map(|i| segment_distance(c[i], c[(i + 1) % 4], r))
        .fold(f32::INFINITY, f32::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use imageproc::drawing::{draw_filled_rect_mut, draw_polygon_mut};
    use imageproc::rect::Rect;

    const BACKGROUND: Rgba<u8> = Rgba([30, 30, 30, 255]);

    fn frame_with_rect(fill: u8, x: i32, y: i32, w: u32, h: u32) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(400, 300, BACKGROUND);
        draw_filled_rect_mut(&mut img, Rect::at(x, y).of_size(w, h), Rgba([fill, fill, fill, 255]));
        img
    }

    fn frame_with_polygon(points: &[(i32, i32)]) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(400, 300, BACKGROUND);
        let poly: Vec<PixelPoint<i32>> = points.iter().map(|&(x, y)| PixelPoint::new(x, y)).collect();
        draw_polygon_mut(&mut img, &poly, Rgba([240, 240, 240, 255]));
        img
    }

    fn assert_near(actual: Point, expected: (f32, f32), tolerance: f32) {
        let d = actual.distance(&Point::new(expected.0, expected.1));
        assert!(d <= tolerance, "corner {actual:?} is {d:.1}px from {expected:?}");
    }

    #[test]
    fn finds_bright_page_on_dark_background() {
        let img = frame_with_rect(240, 60, 50, 280, 200);
        let result = RectangleDetector::default().detect(&img);
        let quad = result.quad.expect("page should be detected");

        assert_near(quad.top_left, (60.0, 50.0), 6.0);
        assert_near(quad.top_right, (340.0, 50.0), 6.0);
        assert_near(quad.bottom_right, (340.0, 250.0), 6.0);
        assert_near(quad.bottom_left, (60.0, 250.0), 6.0);
        assert!(result.confidence > 80, "confidence {}", result.confidence);
    }

    #[test]
    fn corners_are_reported_in_input_coordinates() {
        // Larger than max_processing_dimension, so detection runs downscaled.
        let mut img = RgbaImage::from_pixel(960, 720, BACKGROUND);
        draw_filled_rect_mut(&mut img, Rect::at(144, 120).of_size(672, 480), Rgba([240, 240, 240, 255]));

        let quad = RectangleDetector::default().detect(&img).quad.expect("detected");
        assert_near(quad.top_left, (144.0, 120.0), 12.0);
        assert_near(quad.bottom_right, (816.0, 600.0), 12.0);
    }

    #[test]
    fn uniform_frame_has_no_rectangle() {
        let img = RgbaImage::from_pixel(400, 300, Rgba([128, 128, 128, 255]));
        let result = RectangleDetector::default().detect(&img);
        assert!(!result.is_found());
        assert_eq!(result.confidence, 0);
    }

    #[test]
    fn rectangle_below_noise_floor_is_ignored() {
        let img = frame_with_rect(240, 190, 140, 12, 12);
        assert!(!RectangleDetector::default().detect(&img).is_found());
    }

    #[test]
    fn empty_frame_has_no_rectangle() {
        assert!(!RectangleDetector::default().detect(&RgbaImage::new(0, 0)).is_found());
    }

    #[test]
    fn skewed_page_scores_lower_than_square_page() {
        let detector = RectangleDetector::default();
        let square = detector.detect(&frame_with_rect(240, 60, 50, 280, 200));
        let skewed = detector.detect(&frame_with_polygon(&[(120, 50), (280, 50), (350, 250), (50, 250)]));

        assert!(skewed.is_found());
        assert!(
            skewed.confidence < square.confidence,
            "skewed {} vs square {}",
            skewed.confidence,
            square.confidence
        );
    }

    #[test]
    fn faint_page_scores_lower_than_bright_page() {
        let detector = RectangleDetector::default();
        let bright = detector.detect(&frame_with_rect(240, 60, 50, 280, 200));
        let faint = detector.detect(&frame_with_rect(110, 60, 50, 280, 200));

        assert!(faint.is_found());
        assert!(faint.confidence < bright.confidence);
    }

    #[test]
    fn triangle_is_not_a_quadrilateral() {
        let hull = [
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(50.0, 80.0),
            Point::new(50.0, 0.0),
        ];
        assert!(fit_quadrilateral(&hull, 4.0).is_none());
    }

    #[test]
    fn octagon_is_not_a_quadrilateral() {
        let hull: Vec<Point> = (0..8)
            .map(|i| {
                let a = i as f32 * std::f32::consts::FRAC_PI_4;
                Point::new(100.0 + 50.0 * a.cos(), 100.0 + 50.0 * a.sin())
            })
            .collect();
        let perimeter = 8.0 * 2.0 * 50.0 * (std::f32::consts::PI / 8.0).sin();
        assert!(fit_quadrilateral(&hull, 0.02 * perimeter).is_none());
    }

    #[test]
    fn lopsided_shape_is_implausible() {
        let quad = Quadrilateral::new(
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(200.0, 100.0),
            Point::new(0.0, 100.0),
        );
        assert!(!has_plausible_proportions(&quad));
        assert!(has_plausible_proportions(&Quadrilateral::from_rect(0.0, 0.0, 50.0, 80.0)));
    }
}
