//! Polygon primitives over traced contours
//!
//! Contours come from `imageproc::contours::find_contours`, which traces
//! border pixel centers. Areas and perimeters are therefore polygon measures
//! over those centers, not pixel counts: a filled `w × h` rectangle has an
//! outer contour area of `(w - 1) × (h - 1)`.

use imageproc::geometry;
use imageproc::point::Point;

/// Polygon area (shoelace formula), always non-negative
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    geometry::contour_area(points)
}

/// Length of a polyline, optionally closed back to its first point
pub fn arc_length(points: &[Point<i32>], closed: bool) -> f64 {
    geometry::arc_length(points, closed)
}

/// Convex hull of a point set
pub fn convex_hull(points: &[Point<i32>]) -> Vec<Point<i32>> {
    geometry::convex_hull(points.to_vec())
}

fn distance(a: Point<i32>, b: Point<i32>) -> f64 {
    let dx = (b.x - a.x) as f64;
    let dy = (b.y - a.y) as f64;
    dx.hypot(dy)
}

fn simplify_chain(chain: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if chain.len() < 3 || epsilon <= 0.0 {
        return chain.to_vec();
    }
    geometry::approximate_polygon_dp(chain, epsilon, false)
}

/// Douglas-Peucker polygon approximation
///
/// Closed curves are split at the point farthest from the first point and
/// both halves simplified separately, so the arbitrary trace start does not
/// survive as a spurious corner.
pub fn approximate_polygon(points: &[Point<i32>], epsilon: f64, closed: bool) -> Vec<Point<i32>> {
    if !closed || points.len() < 4 {
        return simplify_chain(points, epsilon);
    }

    let first = points[0];
    let far = (1..points.len())
        .max_by(|&i, &j| {
            distance(first, points[i])
                .partial_cmp(&distance(first, points[j]))
                .unwrap_or(std::cmp::Ordering::Equal)
                // prefer the earliest index on ties
                .then(j.cmp(&i))
        })
        .unwrap_or(0);

    let forward = simplify_chain(&points[..=far], epsilon);
    let mut backward_chain: Vec<Point<i32>> = points[far..].to_vec();
    backward_chain.push(first);
    let backward = simplify_chain(&backward_chain, epsilon);

    let mut polygon = forward[..forward.len() - 1].to_vec();
    polygon.extend_from_slice(&backward[..backward.len() - 1]);
    polygon
}

/// Rotated rectangle with sub-pixel center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    pub center: (f64, f64),
    /// Extent along `angle`
    pub width: f64,
    /// Extent perpendicular to `angle`
    pub height: f64,
    /// Direction of the width side in radians
    pub angle: f64,
}

impl RotatedRect {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Same rectangle described with `width >= height`
    pub fn landscape(self) -> Self {
        if self.height > self.width {
            Self {
                center: self.center,
                width: self.height,
                height: self.width,
                angle: self.angle + std::f64::consts::FRAC_PI_2,
            }
        } else {
            self
        }
    }

    /// Corners ordered top-left, top-right, bottom-right, bottom-left
    ///
    /// The width axis is oriented to point right (non-negative x) so the
    /// ordering is stable regardless of the angle the hull produced.
    pub fn corners(&self) -> [(f64, f64); 4] {
        let (mut ux, mut uy) = (self.angle.cos(), self.angle.sin());
        if ux < 0.0 || (ux == 0.0 && uy < 0.0) {
            ux = -ux;
            uy = -uy;
        }
        let (vx, vy) = (-uy, ux);
        let (hw, hh) = (self.width / 2.0, self.height / 2.0);
        let (cx, cy) = self.center;
        [
            (cx - ux * hw - vx * hh, cy - uy * hw - vy * hh),
            (cx + ux * hw - vx * hh, cy + uy * hw - vy * hh),
            (cx + ux * hw + vx * hh, cy + uy * hw + vy * hh),
            (cx - ux * hw + vx * hh, cy - uy * hw + vy * hh),
        ]
    }
}

/// Minimum-area enclosing rectangle
///
/// Corners are snapped outward to whole pixels, so each side may exceed the
/// exact fit by up to one pixel.
pub fn min_area_rect(points: &[Point<i32>]) -> RotatedRect {
    if points.is_empty() {
        return RotatedRect {
            center: (0.0, 0.0),
            width: 0.0,
            height: 0.0,
            angle: 0.0,
        };
    }
    let corners = geometry::min_area_rect(points);
    let [tl, tr, _, bl] = corners;
    let (sx, sy) = corners
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
    RotatedRect {
        center: (sx / 4.0, sy / 4.0),
        width: distance(tl, tr),
        height: distance(tl, bl),
        angle: ((tr.y - tl.y) as f64).atan2((tr.x - tl.x) as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn rect_outline(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<Point<i32>> {
        let mut pts = Vec::new();
        for x in x0..x1 {
            pts.push(Point::new(x, y0));
        }
        for y in y0..y1 {
            pts.push(Point::new(x1, y));
        }
        for x in (x0 + 1..=x1).rev() {
            pts.push(Point::new(x, y1));
        }
        for y in (y0 + 1..=y1).rev() {
            pts.push(Point::new(x0, y));
        }
        pts
    }

    #[test]
    fn test_polygon_area_square() {
        let square = vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert_abs_diff_eq!(polygon_area(&square), 100.0);
        assert_abs_diff_eq!(arc_length(&square, true), 40.0);
        assert_abs_diff_eq!(arc_length(&square, false), 30.0);
    }

    #[test]
    fn test_polygon_area_degenerate() {
        assert_eq!(polygon_area(&[Point::new(1, 1), Point::new(2, 2)]), 0.0);
    }

    #[test]
    fn test_convex_hull_drops_interior_points() {
        let mut pts = rect_outline(0, 0, 8, 6);
        pts.push(Point::new(4, 3));
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert_abs_diff_eq!(polygon_area(&hull), 48.0);
    }

    #[test]
    fn test_convex_hull_of_notched_shape() {
        let notched = vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(5, 5),
            Point::new(0, 10),
        ];
        let hull = convex_hull(&notched);
        assert_eq!(hull.len(), 4);
        assert!(arc_length(&hull, true) < arc_length(&notched, true));
    }

    #[test]
    fn test_approximate_rectangle_outline() {
        let outline = rect_outline(3, 4, 30, 20);
        let epsilon = 0.02 * arc_length(&outline, true);
        let approx = approximate_polygon(&outline, epsilon, true);
        assert_eq!(approx.len(), 4);
    }

    #[test]
    fn test_approximate_open_line() {
        let line: Vec<Point<i32>> = (0..10).map(|x| Point::new(x, 0)).collect();
        let approx = approximate_polygon(&line, 0.5, false);
        assert_eq!(approx, vec![Point::new(0, 0), Point::new(9, 0)]);
    }

    #[test]
    fn test_min_area_rect_axis_aligned() {
        let outline = rect_outline(10, 10, 50, 30);
        let rect = min_area_rect(&outline).landscape();
        assert_abs_diff_eq!(rect.width, 40.0, epsilon = 1.0);
        assert_abs_diff_eq!(rect.height, 20.0, epsilon = 1.0);
        assert_abs_diff_eq!(rect.center.0, 30.0, epsilon = 1.0);
        assert_abs_diff_eq!(rect.center.1, 20.0, epsilon = 1.0);

        let [tl, tr, br, bl] = rect.corners();
        assert_abs_diff_eq!(tl.0, 10.0, epsilon = 1.0);
        assert_abs_diff_eq!(tl.1, 10.0, epsilon = 1.0);
        assert_abs_diff_eq!(tr.0, 50.0, epsilon = 1.0);
        assert_abs_diff_eq!(br.1, 30.0, epsilon = 1.0);
        assert_abs_diff_eq!(bl.0, 10.0, epsilon = 1.0);
    }

    #[test]
    fn test_min_area_rect_rotated_square_diamond() {
        let diamond = vec![
            Point::new(10, 0),
            Point::new(20, 10),
            Point::new(10, 20),
            Point::new(0, 10),
        ];
        let rect = min_area_rect(&diamond);
        // the axis-aligned box would cover 400
        assert!(rect.area() > 150.0, "area {}", rect.area());
        assert!(rect.area() < 300.0, "area {}", rect.area());
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(approximate_polygon(&[], 1.0, true).is_empty());
        let pair = [Point::new(0, 0), Point::new(4, 0)];
        assert_eq!(approximate_polygon(&pair, 0.0, false), pair.to_vec());
        assert_eq!(min_area_rect(&[]).area(), 0.0);
        assert_eq!(convex_hull(&[]).len(), 0);
    }
}
