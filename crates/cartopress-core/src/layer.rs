use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::BBox;

/// An RGB color. Alpha lives on the resolved style, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };

/// Named palette carried over from the print template this tool targets.
const NAMED_COLORS: &[(&str, Color)] = &[
    ("black", BLACK),
    ("green", Color { r: 0x1b, g: 0x9e, b: 0x77 }),
    ("orange", Color { r: 0xd9, g: 0x5f, b: 0x02 }),
    ("purple", Color { r: 0x75, g: 0x70, b: 0xb3 }),
];

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_f64_array(&self, alpha: f64) -> [f64; 4] {
        [
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
            alpha,
        ]
    }

    fn from_hex(s: &str) -> Result<Self, ConfigError> {
        let hex = s.trim_start_matches('#');
        if hex.len() != 6 {
            return Err(ConfigError::MalformedHexColor(s.to_string()));
        }
        let parse =
            |i: usize| u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| ConfigError::MalformedHexColor(s.to_string()));
        Ok(Self {
            r: parse(0)?,
            g: parse(2)?,
            b: parse(4)?,
        })
    }
}

impl FromStr for Color {
    type Err = ConfigError;

    /// Accepts a palette name or a `#rrggbb` literal. Anything else is a
    /// `ConfigError`, raised here at intent-construction time so style
    /// resolution never has to deal with malformed colors.
    fn from_str(s: &str) -> Result<Self, ConfigError> {
        if s.starts_with('#') {
            return Self::from_hex(s);
        }
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, c)| *c)
            .ok_or_else(|| ConfigError::UnknownColor(s.to_string()))
    }
}

/// Requested line appearance. `Dashes` carries the on/off pattern in device
/// points; an empty pattern means a solid line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LineStyle {
    Dashes(Vec<f64>),
    /// Fully transparent stroke: the layer still contributes extent and
    /// legend entries but draws nothing.
    Invisible,
}

impl LineStyle {
    pub fn is_invisible(&self) -> bool {
        matches!(self, LineStyle::Invisible)
    }
}

impl FromStr for LineStyle {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s {
            "solid" => Ok(LineStyle::Dashes(Vec::new())),
            "dashed" => Ok(LineStyle::Dashes(vec![6.0, 3.0])),
            "dotted" => Ok(LineStyle::Dashes(vec![1.0, 3.0])),
            "dashdot" => Ok(LineStyle::Dashes(vec![6.0, 3.0, 1.0, 3.0])),
            "invisible" => Ok(LineStyle::Invisible),
            other => Err(ConfigError::UnknownLinestyle(other.to_string())),
        }
    }
}

/// One of the four regions produced by splitting the dataset's bbox at its
/// midpoint. Numbering matches plot-axis orientation, Y increasing upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quadrant {
    TopRight,
    BottomRight,
    BottomLeft,
    TopLeft,
}

impl Quadrant {
    pub fn index(&self) -> u8 {
        match self {
            Quadrant::TopRight => 1,
            Quadrant::BottomRight => 2,
            Quadrant::BottomLeft => 3,
            Quadrant::TopLeft => 4,
        }
    }

    /// The quadrant's sub-box of `bbox`, split at the midpoint.
    pub fn sub_bbox(&self, bbox: &BBox) -> BBox {
        let c = bbox.center();
        match self {
            Quadrant::TopRight => BBox::from_bounds(c.x, c.y, bbox.max.x, bbox.max.y),
            Quadrant::BottomRight => BBox::from_bounds(c.x, bbox.min.y, bbox.max.x, c.y),
            Quadrant::BottomLeft => BBox::from_bounds(bbox.min.x, bbox.min.y, c.x, c.y),
            Quadrant::TopLeft => BBox::from_bounds(bbox.min.x, c.y, c.x, bbox.max.y),
        }
    }
}

impl FromStr for Quadrant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s {
            "tr" => Ok(Quadrant::TopRight),
            "br" => Ok(Quadrant::BottomRight),
            "bl" => Ok(Quadrant::BottomLeft),
            "tl" => Ok(Quadrant::TopLeft),
            other => Err(ConfigError::UnknownQuadrant(other.to_string())),
        }
    }
}

/// Where a layer's geometry comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerSource {
    /// A table name or parenthesized select expression in the spatial store.
    Table(String),
    /// A GeoJSON file on disk, loaded into the same shape as the DB path.
    File(PathBuf),
}

/// Spatial filter applied while loading a layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum FilterSpec {
    #[default]
    None,
    /// Geometric clip to one quadrant of the dataset's bbox.
    Quadrant(Quadrant),
    /// Geometric clip to the physical print footprint at a map scale,
    /// centered on a named reference point.
    ScaleClip {
        /// Denominator of the map scale, e.g. 25000 for 1:25000.
        scale: f64,
        reference: String,
    },
    /// Viewport-only clip: constrains the visible extent at render time,
    /// geometry is left untouched.
    BBoxClip(BBox),
}

/// Vertex-reduction or smoothing policy applied after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum SimplifyPolicy {
    #[default]
    None,
    /// Tolerance is a perpendicular distance in native coordinate units.
    DouglasPeucker(f64),
    /// Tolerance is a triangle area in native coordinate units squared.
    VisvalingamWhyatt(f64),
    /// One pass of 1/4–3/4 corner cutting; no tolerance.
    Chaikin,
}

/// Everything needed to load one layer. Immutable; consumed once per render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// `None` means the layer slot is simply not configured, which is a
    /// silent no-op, not an error.
    pub source: Option<LayerSource>,
    pub filter: FilterSpec,
    pub simplify: SimplifyPolicy,
}

impl LayerSpec {
    pub fn new(source: LayerSource) -> Self {
        Self {
            source: Some(source),
            filter: FilterSpec::None,
            simplify: SimplifyPolicy::None,
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            source: None,
            filter: FilterSpec::None,
            simplify: SimplifyPolicy::None,
        }
    }

    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_simplify(mut self, simplify: SimplifyPolicy) -> Self {
        self.simplify = simplify;
        self
    }
}

/// User-supplied styling wishes for one layer, validated at construction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StyleIntent {
    pub color: Option<Color>,
    pub linestyle: Option<LineStyle>,
    pub use_colormap: bool,
    pub label: Option<String>,
}

impl StyleIntent {
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_linestyle(mut self, linestyle: LineStyle) -> Self {
        self.linestyle = Some(linestyle);
        self
    }

    pub fn with_colormap(mut self) -> Self {
        self.use_colormap = true;
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }
}

/// Parse a `1:<denominator>` map scale (a bare denominator is also accepted).
pub fn parse_scale(s: &str) -> Result<f64, ConfigError> {
    let denom = match s.split_once(':') {
        Some(("1", d)) => d,
        Some(_) => return Err(ConfigError::MalformedScale(s.to_string())),
        None => s,
    };
    let value: f64 = denom
        .parse()
        .map_err(|_| ConfigError::MalformedScale(s.to_string()))?;
    if value <= 0.0 {
        return Err(ConfigError::MalformedScale(s.to_string()));
    }
    Ok(value)
}
