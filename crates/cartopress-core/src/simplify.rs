//! Vertex reduction and smoothing.
//!
//! Three policies: Douglas–Peucker (perpendicular-distance threshold),
//! Visvalingam–Whyatt (smallest-triangle-area removal), and a single pass of
//! Chaikin corner cutting. The first two preserve every line's first and
//! last vertex; all three preserve ring closure. A geometry that would
//! collapse below its minimum vertex count is left unsimplified with a
//! warning rather than aborting the render.

use log::warn;

use crate::geometry::{Feature, GeometrySet, Point, Shape};
use crate::layer::SimplifyPolicy;

/// Apply a simplification policy to every geometry of the set, producing a
/// new set. Points pass through untouched.
pub fn simplify(set: &GeometrySet, policy: SimplifyPolicy) -> GeometrySet {
    if matches!(policy, SimplifyPolicy::None) {
        return set.clone();
    }
    let features = set
        .features()
        .iter()
        .map(|f| simplify_feature(f, policy))
        .collect();
    GeometrySet::new(features)
}

fn simplify_feature(feature: &Feature, policy: SimplifyPolicy) -> Feature {
    let shape = match &feature.shape {
        Shape::Point(_) => return feature.clone(),
        Shape::Line(points) => match simplify_open(points, policy) {
            Some(points) => Shape::Line(points),
            None => {
                warn!("skipping simplification of a line that would degenerate");
                return feature.clone();
            }
        },
        Shape::Polygon { outer, holes } => {
            let Some(outer) = simplify_ring(outer, policy) else {
                warn!("skipping simplification of a polygon that would degenerate");
                return feature.clone();
            };
            let mut kept_holes = Vec::with_capacity(holes.len());
            for hole in holes {
                match simplify_ring(hole, policy) {
                    Some(h) => kept_holes.push(h),
                    None => {
                        warn!("skipping simplification of a polygon hole that would degenerate");
                        kept_holes.push(hole.clone());
                    }
                }
            }
            Shape::Polygon {
                outer,
                holes: kept_holes,
            }
        }
    };
    Feature {
        shape,
        category: feature.category.clone(),
    }
}

/// Simplify an open polyline. `None` when the result would carry fewer
/// than two points.
fn simplify_open(points: &[Point], policy: SimplifyPolicy) -> Option<Vec<Point>> {
    if points.len() < 2 {
        return None;
    }
    let out = match policy {
        SimplifyPolicy::None => points.to_vec(),
        SimplifyPolicy::DouglasPeucker(tolerance) => douglas_peucker(points, tolerance),
        SimplifyPolicy::VisvalingamWhyatt(tolerance) => visvalingam_whyatt(points, tolerance),
        SimplifyPolicy::Chaikin => chaikin_open(points),
    };
    (out.len() >= 2).then_some(out)
}

/// Simplify a closed ring, keeping it closed. `None` when the result would
/// drop below four coordinates (three distinct vertices).
fn simplify_ring(ring: &[Point], policy: SimplifyPolicy) -> Option<Vec<Point>> {
    if ring.len() < 4 {
        return None;
    }
    if matches!(policy, SimplifyPolicy::Chaikin) {
        return Some(chaikin_ring(ring));
    }
    // Simplify the open ring, then restore the closing coordinate.
    let open = &ring[..ring.len() - 1];
    let mut out = simplify_open(open, policy)?;
    if out.len() < 3 {
        return None;
    }
    let first = out[0];
    out.push(first);
    Some(out)
}

/// Recursive Douglas–Peucker: discard vertices closer than `tolerance` to
/// the chord between their surviving neighbors. Endpoints always survive.
fn douglas_peucker(points: &[Point], tolerance: f64) -> Vec<Point> {
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;
    dp_mark(points, 0, points.len() - 1, tolerance, &mut keep);
    points
        .iter()
        .zip(&keep)
        .filter_map(|(p, &k)| k.then_some(*p))
        .collect()
}

fn dp_mark(points: &[Point], first: usize, last: usize, tolerance: f64, keep: &mut [bool]) {
    if last <= first + 1 {
        return;
    }
    let mut max_dist = 0.0;
    let mut max_index = first;
    for i in (first + 1)..last {
        let d = points[i].distance_to_line(&points[first], &points[last]);
        if d > max_dist {
            max_dist = d;
            max_index = i;
        }
    }
    if max_dist > tolerance {
        keep[max_index] = true;
        dp_mark(points, first, max_index, tolerance, keep);
        dp_mark(points, max_index, last, tolerance, keep);
    }
}

/// Twice the area of the triangle (a, b, c).
fn double_triangle_area(a: &Point, b: &Point, c: &Point) -> f64 {
    ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)).abs()
}

/// Iterative Visvalingam–Whyatt: repeatedly drop the interior vertex whose
/// triangle with its neighbors has the smallest area, until the smallest
/// remaining area exceeds `tolerance`. Endpoints always survive.
fn visvalingam_whyatt(points: &[Point], tolerance: f64) -> Vec<Point> {
    let mut pts: Vec<Point> = points.to_vec();
    while pts.len() > 2 {
        let mut min_area = f64::MAX;
        let mut min_index = 0;
        for i in 1..pts.len() - 1 {
            let area = double_triangle_area(&pts[i - 1], &pts[i], &pts[i + 1]) / 2.0;
            if area < min_area {
                min_area = area;
                min_index = i;
            }
        }
        if min_area > tolerance {
            break;
        }
        pts.remove(min_index);
    }
    pts
}

/// One pass of Chaikin corner cutting on an open polyline: every edge is
/// replaced by its 1/4 and 3/4 points, endpoints are kept.
fn chaikin_open(points: &[Point]) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut out = Vec::with_capacity(points.len() * 2);
    out.push(points[0]);
    for pair in points.windows(2) {
        out.push(lerp(&pair[0], &pair[1], 0.25));
        out.push(lerp(&pair[0], &pair[1], 0.75));
    }
    out.push(points[points.len() - 1]);
    out
}

/// One pass of Chaikin on a closed ring, cutting every corner including the
/// one at the closure point.
fn chaikin_ring(ring: &[Point]) -> Vec<Point> {
    let open = &ring[..ring.len() - 1];
    let n = open.len();
    let mut out = Vec::with_capacity(n * 2 + 1);
    for i in 0..n {
        let a = &open[i];
        let b = &open[(i + 1) % n];
        out.push(lerp(a, b, 0.25));
        out.push(lerp(a, b, 0.75));
    }
    let first = out[0];
    out.push(first);
    out
}

fn lerp(a: &Point, b: &Point, t: f64) -> Point {
    Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}
