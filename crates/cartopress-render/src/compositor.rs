//! Layer compositing.
//!
//! Layers are drawn strictly in caller order, later ones over earlier ones.
//! The canvas carries no axis chrome: no ticks, no frame, zero margins —
//! a fixed presentation contract, not a per-layer option.

use cairo::{Context, FillRule};
use log::debug;

use cartopress_core::geometry::{Feature, GeometryKind, GeometrySet, Point, Shape};
use cartopress_core::layer::{Color, BLACK};
use cartopress_core::style::{palette_color, Paint, StrokeStyle, StyleSpec};

use crate::legend::{self, LegendPosition};
use crate::surface::RenderError;
use crate::viewport::Viewport;

/// A loaded layer paired with its resolved style, ready to draw.
#[derive(Debug, Clone)]
pub struct StyledLayer {
    pub set: GeometrySet,
    pub style: StyleSpec,
}

/// Point markers are drawn as filled circles of this radius, in points.
const POINT_RADIUS_PT: f64 = 1.5;

/// Draw all layers and the legend onto the context. The viewport has
/// already been fitted to either the data union or the viewport clip.
pub fn draw(
    ctx: &Context,
    layers: &[StyledLayer],
    viewport: &Viewport,
    device_width: f64,
    device_height: f64,
    point_scale: f64,
    legend_position: LegendPosition,
) -> Result<(), RenderError> {
    // White page background.
    ctx.set_source_rgb(1.0, 1.0, 1.0);
    ctx.paint()?;

    for (i, layer) in layers.iter().enumerate() {
        debug!(
            "compositing layer {i}: {} features, visible={}",
            layer.set.len(),
            layer.style.is_visible(layer_kind(layer))
        );
        draw_layer(ctx, layer, viewport, point_scale)?;
    }

    let styled: Vec<(GeometryKind, StyleSpec)> = layers
        .iter()
        .map(|l| (layer_kind(l), l.style.clone()))
        .collect();
    legend::draw(
        ctx,
        &legend::entries(&styled),
        device_width,
        device_height,
        legend_position,
        point_scale,
    )
}

fn layer_kind(layer: &StyledLayer) -> GeometryKind {
    layer.set.kind().unwrap_or(GeometryKind::Line)
}

/// Colors for one layer's features under the categorical colormap: distinct
/// categories get palette colors by order of first appearance; features
/// without a category fall back to their own ordinal, giving each its own
/// color.
pub fn colormap_colors(set: &GeometrySet) -> Vec<Color> {
    let mut seen: Vec<&str> = Vec::new();
    set.features()
        .iter()
        .enumerate()
        .map(|(i, feature)| match feature.category.as_deref() {
            Some(category) => {
                let index = seen.iter().position(|s| *s == category).unwrap_or_else(|| {
                    seen.push(category);
                    seen.len() - 1
                });
                palette_color(index)
            }
            None => palette_color(i),
        })
        .collect()
}

fn draw_layer(
    ctx: &Context,
    layer: &StyledLayer,
    viewport: &Viewport,
    point_scale: f64,
) -> Result<(), RenderError> {
    let colors = match layer.style.paint {
        Paint::Colormap => Some(colormap_colors(&layer.set)),
        Paint::Flat(_) => None,
    };
    for (i, feature) in layer.set.features().iter().enumerate() {
        let color = match (&layer.style.paint, &colors) {
            (Paint::Flat(c), _) => *c,
            (Paint::Colormap, colors) => {
                colors.as_ref().map_or_else(|| palette_color(i), |c| c[i])
            }
        };
        draw_feature(ctx, feature, &layer.style, color, viewport, point_scale)?;
    }
    Ok(())
}

fn draw_feature(
    ctx: &Context,
    feature: &Feature,
    style: &StyleSpec,
    color: Color,
    viewport: &Viewport,
    point_scale: f64,
) -> Result<(), RenderError> {
    match &feature.shape {
        Shape::Point(p) => draw_point(ctx, p, style, color, viewport, point_scale),
        Shape::Line(points) => draw_line(ctx, points, style, color, viewport, point_scale),
        Shape::Polygon { outer, holes } => {
            draw_polygon(ctx, outer, holes, style, color, viewport, point_scale)
        }
    }
}

fn trace_path(ctx: &Context, points: &[Point], viewport: &Viewport) {
    for (i, p) in points.iter().enumerate() {
        let (x, y) = viewport.to_device(p);
        if i == 0 {
            ctx.move_to(x, y);
        } else {
            ctx.line_to(x, y);
        }
    }
}

fn apply_stroke(ctx: &Context, stroke: &StrokeStyle, point_scale: f64) -> bool {
    match stroke {
        StrokeStyle::Solid { width, dash } => {
            ctx.set_line_width(width * point_scale);
            let scaled: Vec<f64> = dash.iter().map(|d| d * point_scale).collect();
            ctx.set_dash(&scaled, 0.0);
            true
        }
        StrokeStyle::None => false,
    }
}

fn draw_point(
    ctx: &Context,
    p: &Point,
    style: &StyleSpec,
    color: Color,
    viewport: &Viewport,
    point_scale: f64,
) -> Result<(), RenderError> {
    if style.alpha <= 0.0 {
        return Ok(());
    }
    let (x, y) = viewport.to_device(p);
    let [r, g, b, a] = color.to_f64_array(style.alpha);
    ctx.set_source_rgba(r, g, b, a);
    ctx.arc(x, y, POINT_RADIUS_PT * point_scale, 0.0, std::f64::consts::TAU);
    ctx.fill()?;
    Ok(())
}

fn draw_line(
    ctx: &Context,
    points: &[Point],
    style: &StyleSpec,
    color: Color,
    viewport: &Viewport,
    point_scale: f64,
) -> Result<(), RenderError> {
    if style.alpha <= 0.0 || !apply_stroke(ctx, &style.stroke, point_scale) {
        // Invisible stroke: the layer still reserved extent and legend
        // space, there is just no ink.
        return Ok(());
    }
    let [r, g, b, a] = color.to_f64_array(style.alpha);
    ctx.set_source_rgba(r, g, b, a);
    trace_path(ctx, points, viewport);
    ctx.stroke()?;
    ctx.set_dash(&[], 0.0);
    Ok(())
}

fn draw_polygon(
    ctx: &Context,
    outer: &[Point],
    holes: &[Vec<Point>],
    style: &StyleSpec,
    color: Color,
    viewport: &Viewport,
    point_scale: f64,
) -> Result<(), RenderError> {
    // Fill, when the style has a non-transparent fill.
    if style.alpha > 0.0 {
        ctx.set_fill_rule(FillRule::EvenOdd);
        trace_path(ctx, outer, viewport);
        ctx.close_path();
        for hole in holes {
            ctx.new_sub_path();
            trace_path(ctx, hole, viewport);
            ctx.close_path();
        }
        let [r, g, b, a] = color.to_f64_array(style.alpha);
        ctx.set_source_rgba(r, g, b, a);
        ctx.fill()?;
    }

    // Outline-only appearance: black stroke with the requested dash.
    if apply_stroke(ctx, &style.stroke, point_scale) {
        let [r, g, b, a] = BLACK.to_f64_array(1.0);
        ctx.set_source_rgba(r, g, b, a);
        trace_path(ctx, outer, viewport);
        ctx.close_path();
        for hole in holes {
            ctx.new_sub_path();
            trace_path(ctx, hole, viewport);
            ctx.close_path();
        }
        ctx.stroke()?;
        ctx.set_dash(&[], 0.0);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartopress_core::geometry::Feature;

    #[test]
    fn test_colormap_by_category_first_appearance() {
        let set = GeometrySet::new(vec![
            Feature::new(Shape::Point(Point::new(0.0, 0.0))).with_category("a"),
            Feature::new(Shape::Point(Point::new(1.0, 0.0))).with_category("b"),
            Feature::new(Shape::Point(Point::new(2.0, 0.0))).with_category("a"),
        ]);
        let colors = colormap_colors(&set);
        assert_eq!(colors[0], palette_color(0));
        assert_eq!(colors[1], palette_color(1));
        assert_eq!(colors[2], colors[0]);
    }

    #[test]
    fn test_colormap_without_categories_is_per_feature() {
        let set = GeometrySet::new(vec![
            Feature::new(Shape::Point(Point::new(0.0, 0.0))),
            Feature::new(Shape::Point(Point::new(1.0, 0.0))),
        ]);
        let colors = colormap_colors(&set);
        assert_ne!(colors[0], colors[1]);
    }
}
