//! Frameless legend built from labeled layers only.

use std::str::FromStr;

use cairo::Context;
use serde::{Deserialize, Serialize};

use cartopress_core::error::ConfigError;
use cartopress_core::geometry::GeometryKind;
use cartopress_core::layer::{Color, BLACK};
use cartopress_core::style::{palette_color, Paint, StrokeStyle, StyleSpec};

use crate::surface::RenderError;

const FONT_SIZE_PT: f64 = 8.0;
const LINE_SPACING: f64 = 1.5;
const SWATCH_LEN_PT: f64 = 16.0;
const MARGIN_PT: f64 = 6.0;

/// Legend anchor. "best" resolves to the upper right corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LegendPosition {
    #[default]
    Best,
    UpperRight,
    UpperLeft,
    LowerRight,
    LowerLeft,
}

impl FromStr for LegendPosition {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s {
            "best" => Ok(LegendPosition::Best),
            "upper-right" => Ok(LegendPosition::UpperRight),
            "upper-left" => Ok(LegendPosition::UpperLeft),
            "lower-right" => Ok(LegendPosition::LowerRight),
            "lower-left" => Ok(LegendPosition::LowerLeft),
            other => Err(ConfigError::UnknownLegendPosition(other.to_string())),
        }
    }
}

/// One legend row: the layer's label plus the swatch appearance. The
/// swatch carries the alpha the layer is drawn with, so an invisible
/// layer keeps its label but shows no ink in the swatch.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub color: Color,
    pub alpha: f64,
    pub dash: Vec<f64>,
}

/// Collect legend rows from the resolved styles, in layer order. Only
/// labeled layers contribute; labels are never auto-generated.
pub fn entries(styled: &[(GeometryKind, StyleSpec)]) -> Vec<LegendEntry> {
    styled
        .iter()
        .filter_map(|(kind, style)| {
            let label = style.label.clone()?;
            // Outline-only polygons stroke in opaque black on the canvas,
            // so their swatch does too.
            let (color, alpha) = match (kind, &style.paint, &style.stroke) {
                (GeometryKind::Polygon, _, StrokeStyle::Solid { .. }) if style.alpha <= 0.0 => {
                    (BLACK, 1.0)
                }
                (_, Paint::Flat(color), _) => (*color, style.alpha),
                (_, Paint::Colormap, _) => (palette_color(0), style.alpha),
            };
            let dash = match &style.stroke {
                StrokeStyle::Solid { dash, .. } => dash.clone(),
                StrokeStyle::None => Vec::new(),
            };
            Some(LegendEntry {
                label,
                color,
                alpha,
                dash,
            })
        })
        .collect()
}

/// Draw the legend anchored at `position`. No frame, matching the fixed
/// presentation contract of the canvas.
pub fn draw(
    ctx: &Context,
    entries: &[LegendEntry],
    device_width: f64,
    device_height: f64,
    position: LegendPosition,
    point_scale: f64,
) -> Result<(), RenderError> {
    if entries.is_empty() {
        return Ok(());
    }

    let font = FONT_SIZE_PT * point_scale;
    let swatch = SWATCH_LEN_PT * point_scale;
    let margin = MARGIN_PT * point_scale;
    let row = font * LINE_SPACING;

    ctx.select_font_face(
        "sans-serif",
        cairo::FontSlant::Normal,
        cairo::FontWeight::Normal,
    );
    ctx.set_font_size(font);

    let widest = entries
        .iter()
        .map(|e| {
            ctx.text_extents(&e.label)
                .map(|ext| ext.width())
                .unwrap_or(0.0)
        })
        .fold(0.0f64, f64::max);
    let block_width = swatch + font + widest;
    let block_height = row * entries.len() as f64;

    let x0 = match position {
        LegendPosition::Best | LegendPosition::UpperRight | LegendPosition::LowerRight => {
            device_width - margin - block_width
        }
        LegendPosition::UpperLeft | LegendPosition::LowerLeft => margin,
    };
    let y0 = match position {
        LegendPosition::Best | LegendPosition::UpperRight | LegendPosition::UpperLeft => margin,
        LegendPosition::LowerRight | LegendPosition::LowerLeft => {
            device_height - margin - block_height
        }
    };

    for (i, entry) in entries.iter().enumerate() {
        let y = y0 + row * i as f64 + row / 2.0;

        let [r, g, b, a] = entry.color.to_f64_array(entry.alpha);
        ctx.set_source_rgba(r, g, b, a);
        ctx.set_line_width(1.5 * point_scale);
        let dash: Vec<f64> = entry.dash.iter().map(|d| d * point_scale).collect();
        ctx.set_dash(&dash, 0.0);
        ctx.move_to(x0, y);
        ctx.line_to(x0 + swatch, y);
        ctx.stroke()?;
        ctx.set_dash(&[], 0.0);

        let [r, g, b, _] = BLACK.to_f64_array(1.0);
        ctx.set_source_rgb(r, g, b);
        ctx.move_to(x0 + swatch + font / 2.0, y + font * 0.35);
        ctx.show_text(&entry.label)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartopress_core::layer::{LineStyle, StyleIntent};
    use cartopress_core::style::{resolve, StyleDefaults};

    fn styled(kind: GeometryKind, intent: &StyleIntent) -> (GeometryKind, StyleSpec) {
        (kind, resolve(kind, intent, &StyleDefaults::default()))
    }

    #[test]
    fn test_only_labeled_styles_contribute() {
        let layers = vec![
            styled(
                GeometryKind::Line,
                &StyleIntent::default().with_label("Roads"),
            ),
            styled(GeometryKind::Line, &StyleIntent::default()),
            styled(
                GeometryKind::Polygon,
                &StyleIntent::default().with_label("Buildings"),
            ),
        ];
        let rows = entries(&layers);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "Roads");
        assert_eq!(rows[1].label, "Buildings");
    }

    #[test]
    fn test_swatch_alpha_follows_drawn_appearance() {
        let layers = vec![
            styled(
                GeometryKind::Line,
                &StyleIntent::default()
                    .with_linestyle(LineStyle::Invisible)
                    .with_label("Hidden"),
            ),
            styled(
                GeometryKind::Line,
                &StyleIntent::default().with_label("Roads"),
            ),
            styled(
                GeometryKind::Polygon,
                &StyleIntent::default().with_label("Parcels"),
            ),
        ];
        let rows = entries(&layers);
        assert_eq!(rows[0].alpha, 0.0);
        assert_eq!(rows[1].alpha, 1.0);
        assert_eq!(rows[2].alpha, 0.25);
    }

    #[test]
    fn test_outline_polygon_swatch_is_opaque_black() {
        let layers = vec![styled(
            GeometryKind::Polygon,
            &StyleIntent::default()
                .with_linestyle("dashed".parse().unwrap())
                .with_label("Boundary"),
        )];
        let rows = entries(&layers);
        assert_eq!(rows[0].color, BLACK);
        assert_eq!(rows[0].alpha, 1.0);
        assert_eq!(rows[0].dash, vec![6.0, 3.0]);
    }

    #[test]
    fn test_position_parse() {
        assert_eq!(
            "best".parse::<LegendPosition>().unwrap(),
            LegendPosition::Best
        );
        assert_eq!(
            "lower-left".parse::<LegendPosition>().unwrap(),
            LegendPosition::LowerLeft
        );
        assert!("center".parse::<LegendPosition>().is_err());
    }
}
