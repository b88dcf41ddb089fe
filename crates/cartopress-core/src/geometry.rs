use serde::{Deserialize, Serialize};

/// A 2D point in the data's native coordinate units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Perpendicular distance from this point to the infinite line through `a` and `b`.
    /// Falls back to point distance when `a == b`.
    pub fn distance_to_line(&self, a: &Point, b: &Point) -> f64 {
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let len = (dx * dx + dy * dy).sqrt();
        if len == 0.0 {
            return self.distance_to(a);
        }
        ((self.x - a.x) * dy - (self.y - a.y) * dx).abs() / len
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min: Point::new(min_x, min_y),
            max: Point::new(max_x, max_y),
        }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            min: Point::new(min_x, min_y),
            max: Point::new(max_x, max_y),
        })
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn union(&self, other: &BBox) -> Self {
        Self {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// A bbox of the given width/height centered on `center`.
    pub fn centered_on(center: Point, width: f64, height: f64) -> Self {
        Self {
            min: Point::new(center.x - width / 2.0, center.y - height / 2.0),
            max: Point::new(center.x + width / 2.0, center.y + height / 2.0),
        }
    }
}

/// The kind of geometry a feature carries. Carried as an explicit tag on
/// every record rather than inferred from the shape at draw time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
}

/// A single 2-D geometry. Polygons carry an outer ring plus any holes;
/// all rings are stored closed (first coordinate equals the last).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Point(Point),
    Line(Vec<Point>),
    Polygon {
        outer: Vec<Point>,
        holes: Vec<Vec<Point>>,
    },
}

impl Shape {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Shape::Point(_) => GeometryKind::Point,
            Shape::Line(_) => GeometryKind::Line,
            Shape::Polygon { .. } => GeometryKind::Polygon,
        }
    }

    pub fn bbox(&self) -> Option<BBox> {
        match self {
            Shape::Point(p) => Some(BBox::new(*p, *p)),
            Shape::Line(points) => BBox::from_points(points),
            Shape::Polygon { outer, .. } => BBox::from_points(outer),
        }
    }
}

/// One record of a layer: a shape plus the optional category attribute
/// that drives categorical colormap fills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub shape: Shape,
    pub category: Option<String>,
}

impl Feature {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            category: None,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }
}

/// An ordered collection of features loaded for one layer. Never mutated
/// after construction; every transform produces a new set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeometrySet {
    features: Vec<Feature>,
}

impl GeometrySet {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// The kind used for style resolution: the tag of the first record.
    /// Mixed sets are styled by their leading feature.
    pub fn kind(&self) -> Option<GeometryKind> {
        self.features.first().map(|f| f.shape.kind())
    }

    /// Bounding box of the whole set, `None` when empty.
    pub fn bbox(&self) -> Option<BBox> {
        self.features
            .iter()
            .filter_map(|f| f.shape.bbox())
            .reduce(|acc, b| acc.union(&b))
    }
}
