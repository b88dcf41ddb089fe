//! Style resolution: (geometry kind, user intent) → concrete drawing style.
//!
//! The resolver is a total function. Malformed colors and linestyles are
//! rejected earlier, when the `StyleIntent` is constructed, so every
//! (kind, intent) pair here yields exactly one `StyleSpec`.

use serde::{Deserialize, Serialize};

use crate::geometry::GeometryKind;
use crate::layer::{Color, LineStyle, StyleIntent, BLACK};

/// The fixed categorical palette used for colormap fills and strokes.
/// Colors are assigned to category values by order of first appearance.
pub const CATEGORICAL_PALETTE: &[Color] = &[
    Color { r: 0x31, g: 0x82, b: 0xbd },
    Color { r: 0x6b, g: 0xae, b: 0xd6 },
    Color { r: 0x9e, g: 0xca, b: 0xe1 },
    Color { r: 0xc6, g: 0xdb, b: 0xef },
    Color { r: 0xe6, g: 0x55, b: 0x0d },
    Color { r: 0xfd, g: 0x8d, b: 0x3c },
    Color { r: 0xfd, g: 0xae, b: 0x6b },
    Color { r: 0xfd, g: 0xd0, b: 0xa2 },
    Color { r: 0x31, g: 0xa3, b: 0x54 },
    Color { r: 0x74, g: 0xc4, b: 0x76 },
    Color { r: 0xa1, g: 0xd9, b: 0x9b },
    Color { r: 0xc7, g: 0xe9, b: 0xc0 },
    Color { r: 0x75, g: 0x6b, b: 0xb1 },
    Color { r: 0x9e, g: 0x9a, b: 0xc8 },
    Color { r: 0xbc, g: 0xbd, b: 0xdc },
    Color { r: 0xda, g: 0xda, b: 0xeb },
    Color { r: 0x63, g: 0x63, b: 0x63 },
    Color { r: 0x96, g: 0x96, b: 0x96 },
    Color { r: 0xbd, g: 0xbd, b: 0xbd },
    Color { r: 0xd9, g: 0xd9, b: 0xd9 },
];

/// Palette color for the nth distinct category, wrapping past the end.
pub fn palette_color(category_index: usize) -> Color {
    CATEGORICAL_PALETTE[category_index % CATEGORICAL_PALETTE.len()]
}

/// What a layer is painted with: one flat color, or the categorical
/// colormap keyed on each feature's category attribute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Paint {
    Flat(Color),
    Colormap,
}

/// Stroke appearance of the resolved style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StrokeStyle {
    Solid { width: f64, dash: Vec<f64> },
    None,
}

/// Concrete drawing style for one layer. Derived deterministically from
/// (geometry kind, intent); recomputed per render, never persisted.
///
/// For polygon layers `paint`/`alpha` describe the fill and
/// `StrokeStyle::Solid` marks the outline-only appearance (filled and
/// outlined are mutually exclusive). For line and point layers
/// `paint`/`alpha` describe the stroke color and `stroke` its width/dash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleSpec {
    pub paint: Paint,
    pub alpha: f64,
    pub stroke: StrokeStyle,
    pub label: Option<String>,
}

impl StyleSpec {
    /// Whether this style puts visible ink on the canvas for geometry of
    /// the given kind. Outline-only polygons stroke in black even with a
    /// fully transparent fill; for lines and points a transparent color
    /// means no ink regardless of the stroke settings.
    pub fn is_visible(&self, kind: GeometryKind) -> bool {
        match kind {
            GeometryKind::Polygon => {
                self.alpha > 0.0 || matches!(self.stroke, StrokeStyle::Solid { .. })
            }
            GeometryKind::Point | GeometryKind::Line => self.alpha > 0.0,
        }
    }
}

/// Defaults that feed style resolution, sourced from the page configuration
/// rather than module-level globals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StyleDefaults {
    /// Stroke width in device points.
    pub line_width: f64,
    /// Fill alpha for colormap-filled polygons.
    pub fill_alpha: f64,
}

impl Default for StyleDefaults {
    fn default() -> Self {
        Self {
            line_width: 0.75,
            fill_alpha: 0.25,
        }
    }
}

/// Resolve a concrete style. First matching rule wins:
///
/// 1. polygon with a visible linestyle: outline-only, black stroke with the
///    requested dash, fully transparent fill;
/// 2. any other polygon: categorical colormap fill at the default alpha,
///    no outline;
/// 3. non-polygon with an invisible linestyle: fully transparent stroke
///    (still contributes extent and legend);
/// 4. non-polygon asking for the colormap: stroke colored by category;
/// 5. otherwise: flat stroke in the requested color (black when unset),
///    dashed per the linestyle when one was given.
pub fn resolve(kind: GeometryKind, intent: &StyleIntent, defaults: &StyleDefaults) -> StyleSpec {
    let label = intent.label.clone();
    let width = defaults.line_width;

    if kind == GeometryKind::Polygon {
        if let Some(LineStyle::Dashes(dash)) = &intent.linestyle {
            return StyleSpec {
                paint: Paint::Flat(BLACK),
                alpha: 0.0,
                stroke: StrokeStyle::Solid {
                    width,
                    dash: dash.clone(),
                },
                label,
            };
        }
        // Filled appearance, including the degenerate polygon+invisible
        // combination: polygons either fill or outline, never both.
        return StyleSpec {
            paint: Paint::Colormap,
            alpha: defaults.fill_alpha,
            stroke: StrokeStyle::None,
            label,
        };
    }

    let dash = match &intent.linestyle {
        Some(LineStyle::Dashes(dash)) => dash.clone(),
        _ => Vec::new(),
    };
    let stroke = StrokeStyle::Solid { width, dash };

    if matches!(intent.linestyle, Some(LineStyle::Invisible)) {
        return StyleSpec {
            paint: Paint::Flat(intent.color.unwrap_or(BLACK)),
            alpha: 0.0,
            stroke,
            label,
        };
    }

    if intent.use_colormap {
        return StyleSpec {
            paint: Paint::Colormap,
            alpha: 1.0,
            stroke,
            label,
        };
    }

    StyleSpec {
        paint: Paint::Flat(intent.color.unwrap_or(BLACK)),
        alpha: 1.0,
        stroke,
        label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> StyleDefaults {
        StyleDefaults::default()
    }

    #[test]
    fn test_polygon_outline_when_linestyle_set() {
        let intent = StyleIntent::default()
            .with_linestyle("dashed".parse().unwrap())
            .with_color("green".parse().unwrap());
        let spec = resolve(GeometryKind::Polygon, &intent, &defaults());
        // Outline-only: black stroke, transparent fill, explicit color ignored.
        assert_eq!(spec.paint, Paint::Flat(BLACK));
        assert_eq!(spec.alpha, 0.0);
        assert_eq!(
            spec.stroke,
            StrokeStyle::Solid {
                width: 0.75,
                dash: vec![6.0, 3.0]
            }
        );
    }

    #[test]
    fn test_polygon_filled_by_default() {
        let spec = resolve(GeometryKind::Polygon, &StyleIntent::default(), &defaults());
        assert_eq!(spec.paint, Paint::Colormap);
        assert_eq!(spec.alpha, 0.25);
        assert_eq!(spec.stroke, StrokeStyle::None);
    }

    #[test]
    fn test_invisible_line_is_not_visible() {
        let intent = StyleIntent::default().with_linestyle(LineStyle::Invisible);
        let spec = resolve(GeometryKind::Line, &intent, &defaults());
        assert_eq!(spec.alpha, 0.0);
        assert!(!spec.is_visible(GeometryKind::Line));
    }

    #[test]
    fn test_visibility_depends_on_kind() {
        let outline = resolve(
            GeometryKind::Polygon,
            &StyleIntent::default().with_linestyle("dashed".parse().unwrap()),
            &defaults(),
        );
        // Transparent fill, but the black outline still shows.
        assert_eq!(outline.alpha, 0.0);
        assert!(outline.is_visible(GeometryKind::Polygon));

        let filled = resolve(GeometryKind::Polygon, &StyleIntent::default(), &defaults());
        assert!(filled.is_visible(GeometryKind::Polygon));

        let line = resolve(GeometryKind::Line, &StyleIntent::default(), &defaults());
        assert!(line.is_visible(GeometryKind::Line));
    }

    #[test]
    fn test_colormap_stroke() {
        let intent = StyleIntent::default().with_colormap();
        let spec = resolve(GeometryKind::Line, &intent, &defaults());
        assert_eq!(spec.paint, Paint::Colormap);
        assert_eq!(spec.alpha, 1.0);
    }

    #[test]
    fn test_explicit_color_with_dash() {
        let color: Color = "#1b9e77".parse().unwrap();
        let intent = StyleIntent::default()
            .with_color(color)
            .with_linestyle("dashed".parse().unwrap())
            .with_label("Roads");
        let spec = resolve(GeometryKind::Line, &intent, &defaults());
        assert_eq!(spec.paint, Paint::Flat(color));
        assert_eq!(spec.alpha, 1.0);
        assert_eq!(spec.label.as_deref(), Some("Roads"));
        match spec.stroke {
            StrokeStyle::Solid { dash, .. } => assert_eq!(dash, vec![6.0, 3.0]),
            StrokeStyle::None => panic!("expected a stroke"),
        }
    }

    #[test]
    fn test_default_stroke_is_black_solid() {
        let spec = resolve(GeometryKind::Point, &StyleIntent::default(), &defaults());
        assert_eq!(spec.paint, Paint::Flat(BLACK));
        match spec.stroke {
            StrokeStyle::Solid { dash, .. } => assert!(dash.is_empty()),
            StrokeStyle::None => panic!("expected a stroke"),
        }
    }

    #[test]
    fn test_resolver_is_deterministic() {
        let intent = StyleIntent::default()
            .with_colormap()
            .with_label("Areas");
        for kind in [GeometryKind::Point, GeometryKind::Line, GeometryKind::Polygon] {
            let a = resolve(kind, &intent, &defaults());
            let b = resolve(kind, &intent, &defaults());
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_palette_wraps() {
        assert_eq!(palette_color(0), palette_color(CATEGORICAL_PALETTE.len()));
    }
}
