//! Marker candidate search: dark convex quadrilaterals in a binary image.

use crate::ArucoParams;
use footmeasure_core::{fit_line, intersect_lines, oriented_area, Line2};
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use nalgebra::Point2;

/// Candidate corners in image pixels, clockwise on screen.
pub(crate) type Quad = [Point2<f32>; 4];

/// Extract quadrilateral candidates from one thresholded image (foreground = 255).
pub(crate) fn find_quads(bin: &GrayImage, params: &ArucoParams) -> Vec<Quad> {
    let (w, h) = (bin.width() as f64, bin.height() as f64);
    let max_dim = w.max(h);
    let min_len = params.min_perimeter_rate as f64 * max_dim;
    let max_len = params.max_perimeter_rate as f64 * max_dim;

    let mut out = Vec::new();
    for contour in find_contours::<i32>(bin) {
        if contour.border_type != BorderType::Outer {
            continue;
        }
        let len = contour.points.len() as f64;
        if len < min_len.max(4.0) || len > max_len {
            continue;
        }

        let points: Vec<Point2<f64>> = contour
            .points
            .iter()
            .map(|p| Point2::new(p.x as f64, p.y as f64))
            .collect();

        let eps = params.polygonal_approx_accuracy_rate as f64 * len;
        if eps <= 0.0 {
            continue;
        }
        let poly = approx_closed_polygon(&points, eps);
        let Ok(mut quad) = <[Point2<f64>; 4]>::try_from(poly) else {
            continue;
        };
        if !is_convex(&quad) {
            continue;
        }

        let min_side = params.min_corner_distance_rate as f64 * len;
        if (0..4).any(|i| (quad[(i + 1) % 4] - quad[i]).norm() < min_side) {
            continue;
        }

        let d = params.min_distance_to_border as f64;
        if quad
            .iter()
            .any(|p| p.x < d || p.y < d || p.x > w - 1.0 - d || p.y > h - 1.0 - d)
        {
            continue;
        }

        if oriented_area(&quad) < 0.0 {
            quad.swap(1, 3);
        }
        // start from the corner nearest the image origin
        let first = (0..4)
            .min_by(|&a, &b| (quad[a].x + quad[a].y).total_cmp(&(quad[b].x + quad[b].y)))
            .unwrap_or(0);
        quad.rotate_left(first);

        let refined = refine_corners(&quad, &points, params.max_corner_refine_shift as f64);
        out.push(refined.map(|p| Point2::new(p.x as f32, p.y as f32)));
    }

    out
}

/// Drop candidates that outline the same marker as an earlier, larger one.
///
/// Two quads are the same marker when their corners, under the best cyclic
/// alignment, are on average closer than `rate × mean side length`.
pub(crate) fn merge_duplicates(quads: Vec<Quad>, rate: f32) -> Vec<Quad> {
    let mut kept: Vec<Quad> = Vec::with_capacity(quads.len());
    for q in quads {
        let dup = kept.iter().position(|k| {
            let tol = rate * 0.5 * (mean_side(k) + mean_side(&q));
            min_corner_distance(k, &q) < tol
        });
        match dup {
            Some(i) if perimeter(&q) > perimeter(&kept[i]) => kept[i] = q,
            Some(_) => {}
            None => kept.push(q),
        }
    }
    kept
}

fn perimeter(q: &Quad) -> f32 {
    (0..4).map(|i| (q[(i + 1) % 4] - q[i]).norm()).sum()
}

fn mean_side(q: &Quad) -> f32 {
    0.25 * perimeter(q)
}

fn min_corner_distance(a: &Quad, b: &Quad) -> f32 {
    (0..4)
        .map(|shift| {
            (0..4)
                .map(|i| (a[i] - b[(i + shift) % 4]).norm())
                .sum::<f32>()
                / 4.0
        })
        .fold(f32::INFINITY, f32::min)
}

fn is_convex(q: &[Point2<f64>; 4]) -> bool {
    let mut sign = 0.0f64;
    for i in 0..4 {
        let a = q[(i + 1) % 4] - q[i];
        let b = q[(i + 2) % 4] - q[(i + 1) % 4];
        let z = a.x * b.y - a.y * b.x;
        if z.abs() < 1e-9 {
            return false;
        }
        if sign != 0.0 && sign.signum() != z.signum() {
            return false;
        }
        sign = z;
    }
    true
}

/// Douglas–Peucker simplification of a closed curve.
///
/// The curve is split at two mutually distant points first, so the result
/// does not depend on where the contour trace happened to start.
pub(crate) fn approx_closed_polygon(points: &[Point2<f64>], eps: f64) -> Vec<Point2<f64>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let farthest = |from: usize| {
        let mut best = (from, 0.0);
        for (i, p) in points.iter().enumerate() {
            let d = (p - points[from]).norm_squared();
            if d > best.1 {
                best = (i, d);
            }
        }
        best.0
    };
    let a = farthest(0);
    let b = farthest(a);
    if a == b {
        return vec![points[a]];
    }
    let (i0, i1) = (a.min(b), a.max(b));

    let first = &points[i0..=i1];
    let second: Vec<Point2<f64>> = points[i1..]
        .iter()
        .chain(points[..=i0].iter())
        .copied()
        .collect();

    let mut out = Vec::new();
    for chain in [first, second.as_slice()] {
        let keep = simplify_open(chain, eps);
        // the last vertex of each chain is the first of the next one
        out.extend(keep[..keep.len() - 1].iter().map(|&i| chain[i]));
    }
    out
}

/// Indices kept by Douglas–Peucker on an open chain, endpoints included.
fn simplify_open(chain: &[Point2<f64>], eps: f64) -> Vec<usize> {
    let n = chain.len();
    if n <= 2 {
        return (0..n).collect();
    }
    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = vec![(0usize, n - 1)];
    while let Some((s, e)) = stack.pop() {
        if e <= s + 1 {
            continue;
        }
        let mut best = (s, 0.0f64);
        for i in s + 1..e {
            let d = segment_distance(chain[i], chain[s], chain[e]);
            if d > best.1 {
                best = (i, d);
            }
        }
        if best.1 > eps {
            keep[best.0] = true;
            stack.push((s, best.0));
            stack.push((best.0, e));
        }
    }

    keep.iter()
        .enumerate()
        .filter_map(|(i, &k)| k.then_some(i))
        .collect()
}

fn segment_distance(p: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 <= f64::EPSILON {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Sub-pixel corners from line fits to the contour points of each side.
///
/// Points close to a corner are left out of the fits. A corner falls back to
/// its polygon position when its two sides cannot be fitted, are parallel,
/// or the intersection moves it by more than `max_shift` pixels.
fn refine_corners(
    quad: &[Point2<f64>; 4],
    contour: &[Point2<f64>],
    max_shift: f64,
) -> [Point2<f64>; 4] {
    if max_shift <= 0.0 {
        return *quad;
    }

    let mut side_points: [Vec<Point2<f64>>; 4] = Default::default();
    for &p in contour {
        let (side, dist) = (0..4)
            .map(|i| (i, segment_distance(p, quad[i], quad[(i + 1) % 4])))
            .fold((0, f64::INFINITY), |best, cur| {
                if cur.1 < best.1 {
                    cur
                } else {
                    best
                }
            });
        if dist > 2.0 * max_shift.max(1.0) {
            continue;
        }
        let a = quad[side];
        let b = quad[(side + 1) % 4];
        let margin = (0.1 * (b - a).norm()).max(2.0);
        if (p - a).norm() < margin || (p - b).norm() < margin {
            continue;
        }
        side_points[side].push(p);
    }

    let lines: [Option<Line2>; 4] = [0, 1, 2, 3].map(|i| {
        if side_points[i].len() < 3 {
            None
        } else {
            fit_line(&side_points[i])
        }
    });

    let mut out = *quad;
    for (i, corner) in out.iter_mut().enumerate() {
        let prev = lines[(i + 3) % 4];
        let next = lines[i];
        let (Some(prev), Some(next)) = (prev, next) else {
            continue;
        };
        if let Some(p) = intersect_lines(&prev, &next) {
            if (p - quad[i]).norm() <= max_shift {
                *corner = p;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn square_outline(x0: i32, y0: i32, side: i32) -> Vec<Point2<f64>> {
        let mut pts = Vec::new();
        let x1 = x0 + side - 1;
        let y1 = y0 + side - 1;
        for x in x0..=x1 {
            pts.push(Point2::new(x as f64, y0 as f64));
        }
        for y in y0 + 1..=y1 {
            pts.push(Point2::new(x1 as f64, y as f64));
        }
        for x in (x0..x1).rev() {
            pts.push(Point2::new(x as f64, y1 as f64));
        }
        for y in (y0 + 1..y1).rev() {
            pts.push(Point2::new(x0 as f64, y as f64));
        }
        pts
    }

    #[test]
    fn closed_dp_recovers_square_corners_from_any_start() {
        let mut pts = square_outline(10, 20, 30);
        pts.rotate_left(7);
        let poly = approx_closed_polygon(&pts, 0.03 * pts.len() as f64);
        assert_eq!(poly.len(), 4);
        for c in [(10.0, 20.0), (39.0, 20.0), (39.0, 49.0), (10.0, 49.0)] {
            assert!(poly.iter().any(|p| p.x == c.0 && p.y == c.1), "missing {:?}", c);
        }
    }

    #[test]
    fn finds_dark_square_with_clockwise_corners() {
        let mut bin = GrayImage::new(100, 80);
        for y in 20..50 {
            for x in 30..70 {
                bin.put_pixel(x, y, Luma([255]));
            }
        }
        let quads = find_quads(&bin, &ArucoParams::default());
        assert_eq!(quads.len(), 1);

        let q = quads[0];
        let area = oriented_area(&q.map(|p| Point2::new(p.x as f64, p.y as f64)));
        assert!(area > 0.0);
        for c in [(30.0, 20.0), (69.0, 20.0), (69.0, 49.0), (30.0, 49.0)] {
            assert!(
                q.iter()
                    .any(|p| (p.x - c.0).abs() < 0.5 && (p.y - c.1).abs() < 0.5),
                "missing corner {:?} in {:?}",
                c,
                q
            );
        }
    }

    #[test]
    fn border_touching_and_tiny_blobs_are_rejected() {
        let mut bin = GrayImage::new(100, 80);
        for y in 0..30 {
            for x in 0..30 {
                bin.put_pixel(x, y, Luma([255]));
            }
        }
        bin.put_pixel(60, 60, Luma([255]));
        assert!(find_quads(&bin, &ArucoParams::default()).is_empty());
    }

    #[test]
    fn duplicate_outlines_keep_the_larger_quad() {
        let small: Quad = [
            Point2::new(11.0, 11.0),
            Point2::new(49.0, 11.0),
            Point2::new(49.0, 49.0),
            Point2::new(11.0, 49.0),
        ];
        let big: Quad = [
            Point2::new(50.0, 10.0),
            Point2::new(50.0, 50.0),
            Point2::new(10.0, 50.0),
            Point2::new(10.0, 10.0),
        ];
        let other = small.map(|p| Point2::new(p.x + 200.0, p.y));
        let merged = merge_duplicates(vec![small, big, other], 0.05);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], big);
    }
}
