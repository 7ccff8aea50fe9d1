//! Planar geometry helpers: convex hull, minimum-area rectangle and line fits.
//!
//! Everything here works in `f64` pixel coordinates with the image
//! convention (x to the right, y down).

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Oriented rectangle, described like a rotated bounding box.
///
/// `width` is the extent along the direction given by `angle_deg`,
/// `height` the extent along its perpendicular.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RotatedRect {
    pub center: Point2<f64>,
    pub width: f64,
    pub height: f64,
    /// Direction of the `width` side, degrees from the +x axis.
    pub angle_deg: f64,
}

impl RotatedRect {
    #[inline]
    pub fn long_side(&self) -> f64 {
        self.width.max(self.height)
    }

    #[inline]
    pub fn short_side(&self) -> f64 {
        self.width.min(self.height)
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Corner points, walking the boundary starting from `-u -v`.
    pub fn corners(&self) -> [Point2<f64>; 4] {
        let a = self.angle_deg.to_radians();
        let u = Vector2::new(a.cos(), a.sin()) * (0.5 * self.width);
        let v = Vector2::new(-a.sin(), a.cos()) * (0.5 * self.height);
        let c = self.center;
        [c - u - v, c + u - v, c + u + v, c - u + v]
    }
}

/// Infinite 2D line through `point` along unit direction `dir`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line2 {
    pub point: Point2<f64>,
    pub dir: Vector2<f64>,
}

impl Line2 {
    /// Unsigned distance from `p` to the line.
    #[inline]
    pub fn distance(&self, p: Point2<f64>) -> f64 {
        cross(self.dir, p - self.point).abs()
    }
}

#[inline]
fn cross(a: Vector2<f64>, b: Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Signed shoelace area. Positive when the polygon turns from +x towards +y.
pub fn oriented_area(poly: &[Point2<f64>]) -> f64 {
    if poly.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for (i, p) in poly.iter().enumerate() {
        let q = poly[(i + 1) % poly.len()];
        acc += p.x * q.y - q.x * p.y;
    }
    0.5 * acc
}

/// Convex hull (Andrew's monotone chain) with collinear points removed.
///
/// The hull has positive [`oriented_area`]. Duplicate input points are fine.
pub fn convex_hull(points: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let mut pts: Vec<Point2<f64>> = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let turn = |o: Point2<f64>, a: Point2<f64>, b: Point2<f64>| cross(a - o, b - o);

    let mut hull: Vec<Point2<f64>> = Vec::with_capacity(2 * pts.len());
    for &p in &pts {
        while hull.len() >= 2 && turn(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len && turn(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Minimum-area enclosing rectangle (rotating calipers over the hull edges).
///
/// Returns `None` for an empty point set. A single point yields a zero-size
/// rectangle and collinear points a zero-height one.
pub fn min_area_rect(points: &[Point2<f64>]) -> Option<RotatedRect> {
    let hull = convex_hull(points);
    match hull.len() {
        0 => return None,
        1 => {
            return Some(RotatedRect {
                center: hull[0],
                width: 0.0,
                height: 0.0,
                angle_deg: 0.0,
            })
        }
        2 => {
            let d = hull[1] - hull[0];
            return Some(RotatedRect {
                center: Point2::from((hull[0].coords + hull[1].coords) * 0.5),
                width: d.norm(),
                height: 0.0,
                angle_deg: d.y.atan2(d.x).to_degrees(),
            });
        }
        _ => {}
    }

    let mut best: Option<(f64, RotatedRect)> = None;
    for i in 0..hull.len() {
        let edge = hull[(i + 1) % hull.len()] - hull[i];
        let len = edge.norm();
        if len <= f64::EPSILON {
            continue;
        }
        let u = edge / len;
        let v = Vector2::new(-u.y, u.x);

        let (mut min_u, mut max_u) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_v, mut max_v) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in &hull {
            let pu = p.coords.dot(&u);
            let pv = p.coords.dot(&v);
            min_u = min_u.min(pu);
            max_u = max_u.max(pu);
            min_v = min_v.min(pv);
            max_v = max_v.max(pv);
        }

        let width = max_u - min_u;
        let height = max_v - min_v;
        let area = width * height;
        if best.as_ref().is_some_and(|(a, _)| *a <= area) {
            continue;
        }
        let center = u * (0.5 * (min_u + max_u)) + v * (0.5 * (min_v + max_v));
        best = Some((
            area,
            RotatedRect {
                center: Point2::from(center),
                width,
                height,
                angle_deg: u.y.atan2(u.x).to_degrees(),
            },
        ));
    }

    best.map(|(_, r)| r)
}

/// Total-least-squares line fit. `None` for fewer than two distinct points.
pub fn fit_line(points: &[Point2<f64>]) -> Option<Line2> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean = points.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords) / n;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for p in points {
        let d = p.coords - mean;
        sxx += d.x * d.x;
        syy += d.y * d.y;
        sxy += d.x * d.y;
    }
    if sxx + syy <= f64::EPSILON {
        return None;
    }

    // principal axis of the scatter matrix
    let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    Some(Line2 {
        point: Point2::from(mean),
        dir: Vector2::new(theta.cos(), theta.sin()),
    })
}

/// Intersection point of two lines, `None` when (nearly) parallel.
pub fn intersect_lines(a: &Line2, b: &Line2) -> Option<Point2<f64>> {
    let denom = cross(a.dir, b.dir);
    if denom.abs() < 1e-9 {
        return None;
    }
    let t = cross(b.point - a.point, b.dir) / denom;
    Some(a.point + a.dir * t)
}
