//! Geometric clipping against axis-aligned boxes.
//!
//! Quadrant and scale filters are geometric clips performed while loading:
//! rings go through Sutherland–Hodgman against the four box edges, line
//! segments through Liang–Barsky. The literal-bbox filter is deliberately
//! not here: it is a viewport constraint applied at render time and never
//! removes geometry.

use crate::geometry::{BBox, Feature, GeometrySet, Point, Shape};
use crate::layer::Quadrant;
use crate::spatial::{FeatureEntry, SpatialIndex};

const EPS: f64 = 1e-9;

/// Clip every geometry in the set to `bbox`. Features entirely outside are
/// dropped; features entirely inside pass through untouched (an R-tree
/// pre-cull decides which is which before any edge arithmetic runs).
pub fn clip_to_bbox(set: &GeometrySet, bbox: &BBox) -> GeometrySet {
    let entries: Vec<FeatureEntry> = set
        .features()
        .iter()
        .enumerate()
        .filter_map(|(i, f)| {
            f.shape.bbox().map(|b| FeatureEntry {
                feature_index: i,
                bbox: b,
            })
        })
        .collect();
    let index = SpatialIndex::build(entries);

    let mut keep = vec![false; set.len()];
    let mut needs_clip = vec![false; set.len()];
    for entry in index.query_bbox(bbox) {
        keep[entry.feature_index] = true;
        needs_clip[entry.feature_index] = !(bbox.contains_point(&entry.bbox.min)
            && bbox.contains_point(&entry.bbox.max));
    }

    let mut out = Vec::new();
    for (i, feature) in set.features().iter().enumerate() {
        if !keep[i] {
            continue;
        }
        if !needs_clip[i] {
            out.push(feature.clone());
            continue;
        }
        clip_feature(feature, bbox, &mut out);
    }
    GeometrySet::new(out)
}

/// Clip the set to one quadrant of its own bounding box, split at the
/// midpoint. Empty sets pass through unchanged.
pub fn clip_to_quadrant(set: &GeometrySet, quadrant: Quadrant) -> GeometrySet {
    match set.bbox() {
        Some(bbox) => clip_to_bbox(set, &quadrant.sub_bbox(&bbox)),
        None => set.clone(),
    }
}

/// Physical print footprint width in data units (meters):
/// map scale denominator × canvas width in meters.
pub fn scale_footprint_m(scale: f64, canvas_width_mm: f64) -> f64 {
    scale * canvas_width_mm / 1000.0
}

fn clip_feature(feature: &Feature, bbox: &BBox, out: &mut Vec<Feature>) {
    match &feature.shape {
        Shape::Point(p) => {
            if bbox.contains_point(p) {
                out.push(feature.clone());
            }
        }
        Shape::Line(points) => {
            for piece in clip_polyline(points, bbox) {
                out.push(Feature {
                    shape: Shape::Line(piece),
                    category: feature.category.clone(),
                });
            }
        }
        Shape::Polygon { outer, holes } => {
            if let Some(outer) = clip_ring(outer, bbox) {
                let holes = holes
                    .iter()
                    .filter_map(|h| clip_ring(h, bbox))
                    .collect();
                out.push(Feature {
                    shape: Shape::Polygon { outer, holes },
                    category: feature.category.clone(),
                });
            }
        }
    }
}

/// Liang–Barsky clip of the segment `a`→`b`, returning the clipped segment
/// or `None` when it lies entirely outside.
fn clip_segment(a: &Point, b: &Point, bbox: &BBox) -> Option<(Point, Point)> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;

    let checks = [
        (-dx, a.x - bbox.min.x),
        (dx, bbox.max.x - a.x),
        (-dy, a.y - bbox.min.y),
        (dy, bbox.max.y - a.y),
    ];
    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    if t0 > t1 {
        return None;
    }
    Some((
        Point::new(a.x + t0 * dx, a.y + t0 * dy),
        Point::new(a.x + t1 * dx, a.y + t1 * dy),
    ))
}

/// Clip a polyline, splitting it into pieces where it leaves the box.
fn clip_polyline(points: &[Point], bbox: &BBox) -> Vec<Vec<Point>> {
    let mut pieces: Vec<Vec<Point>> = Vec::new();
    let mut current: Vec<Point> = Vec::new();

    for pair in points.windows(2) {
        match clip_segment(&pair[0], &pair[1], bbox) {
            Some((start, end)) => {
                let continues = current
                    .last()
                    .is_some_and(|last| last.distance_to(&start) < EPS);
                if !continues {
                    if current.len() >= 2 {
                        pieces.push(std::mem::take(&mut current));
                    } else {
                        current.clear();
                    }
                    current.push(start);
                }
                current.push(end);
            }
            None => {
                if current.len() >= 2 {
                    pieces.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
            }
        }
    }
    if current.len() >= 2 {
        pieces.push(current);
    }
    pieces
}

#[derive(Clone, Copy)]
enum Edge {
    Left(f64),
    Right(f64),
    Bottom(f64),
    Top(f64),
}

impl Edge {
    fn inside(&self, p: &Point) -> bool {
        match *self {
            Edge::Left(x) => p.x >= x,
            Edge::Right(x) => p.x <= x,
            Edge::Bottom(y) => p.y >= y,
            Edge::Top(y) => p.y <= y,
        }
    }

    fn intersect(&self, a: &Point, b: &Point) -> Point {
        match *self {
            Edge::Left(x) | Edge::Right(x) => {
                let t = (x - a.x) / (b.x - a.x);
                Point::new(x, a.y + t * (b.y - a.y))
            }
            Edge::Bottom(y) | Edge::Top(y) => {
                let t = (y - a.y) / (b.y - a.y);
                Point::new(a.x + t * (b.x - a.x), y)
            }
        }
    }
}

/// Sutherland–Hodgman clip of a closed ring. Returns a closed ring, or
/// `None` when the ring collapses (fewer than 3 distinct vertices).
fn clip_ring(ring: &[Point], bbox: &BBox) -> Option<Vec<Point>> {
    // Work on the open ring; the closing vertex is re-appended at the end.
    let mut vertices: Vec<Point> = match ring {
        [] => return None,
        [head @ .., last] if head.first() == Some(last) => head.to_vec(),
        all => all.to_vec(),
    };

    let edges = [
        Edge::Left(bbox.min.x),
        Edge::Right(bbox.max.x),
        Edge::Bottom(bbox.min.y),
        Edge::Top(bbox.max.y),
    ];
    for edge in edges {
        if vertices.is_empty() {
            return None;
        }
        let mut next = Vec::with_capacity(vertices.len() + 4);
        for i in 0..vertices.len() {
            let current = vertices[i];
            let previous = vertices[(i + vertices.len() - 1) % vertices.len()];
            let current_in = edge.inside(&current);
            let previous_in = edge.inside(&previous);
            if current_in {
                if !previous_in {
                    next.push(edge.intersect(&previous, &current));
                }
                next.push(current);
            } else if previous_in {
                next.push(edge.intersect(&previous, &current));
            }
        }
        vertices = next;
    }

    vertices.dedup_by(|a, b| a.distance_to(b) < EPS);
    if vertices.len() < 3 {
        return None;
    }
    let first = vertices[0];
    vertices.push(first);
    Some(vertices)
}
