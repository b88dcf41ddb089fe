//! The end-to-end render pipeline.
//!
//! Order matters: canvas sizing is validated before any data source round
//! trip, loading happens strictly in caller-declared layer order, and a
//! single load failure aborts the whole render — a map silently missing a
//! layer is worse than no map.

use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use cartopress_core::canvas::{self, CanvasSpec, PageConfig, SizeTarget};
use cartopress_core::error::PipelineError;
use cartopress_core::geometry::{BBox, GeometryKind};
use cartopress_core::layer::{FilterSpec, LayerSpec, StyleIntent};
use cartopress_core::loader::{self, GeometrySource};
use cartopress_core::style;

use crate::compositor::{self, StyledLayer};
use crate::legend::LegendPosition;
use crate::surface::{DisplaySink, DrawTarget, OutputFormat, RenderError};
use crate::viewport::Viewport;

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Where the finished canvas goes: a file, or the interactive display.
/// The two are mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    SaveTo(PathBuf),
    Display,
}

/// One full render request.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Layers in draw order; later entries composite over earlier ones.
    pub layers: Vec<(LayerSpec, StyleIntent)>,
    pub size: SizeTarget,
    pub legend: LegendPosition,
    pub sink: OutputSink,
}

/// What a successful run produced.
#[derive(Debug, PartialEq, Eq)]
pub struct RenderOutcome {
    /// Number of layers composited (absent layers are not counted).
    pub layers_drawn: usize,
    /// The written file, `None` when the canvas went to the display.
    pub saved_to: Option<PathBuf>,
}

pub fn run(
    request: &RenderRequest,
    source: &mut dyn GeometrySource,
    page: &PageConfig,
    display: &dyn DisplaySink,
) -> Result<RenderOutcome, RunError> {
    // Sizing is pure and fails fast, before any source round trip.
    let mut canvas = canvas::size(request.size, page).map_err(PipelineError::from)?;

    // A literal-bbox filter constrains the viewport, not the data. When
    // layers carry differing bounds, the viewport covers them all.
    if let Some(bounds) = viewport_clip(&request.layers) {
        canvas = canvas.with_clip_bounds(bounds);
    }

    let canvas_width_mm = canvas.width_in * canvas::MM_PER_INCH;
    let mut layers = Vec::new();
    for (spec, intent) in &request.layers {
        let Some(set) = loader::load(spec, source, canvas_width_mm)? else {
            continue;
        };
        // Empty sets carry no kind; they draw nothing either way.
        let kind = set.kind().unwrap_or(GeometryKind::Line);
        let resolved = style::resolve(kind, intent, &page.style);
        layers.push(StyledLayer {
            set,
            style: resolved,
        });
    }
    info!("loaded {} layers", layers.len());

    let extent = fit_extent(&canvas, &layers);
    let height_in = canvas
        .height_in
        .unwrap_or_else(|| natural_height(canvas.width_in, &extent));

    match &request.sink {
        OutputSink::SaveTo(path) => {
            let format = OutputFormat::from_path(path)?;
            draw_to(path, format, canvas.width_in, height_in, page, &layers, extent, request.legend)?;
            info!("wrote {}", path.display());
            Ok(RenderOutcome {
                layers_drawn: layers.len(),
                saved_to: Some(path.to_path_buf()),
            })
        }
        OutputSink::Display => {
            let path = std::env::temp_dir().join("cartopress-preview.png");
            draw_to(&path, OutputFormat::Png, canvas.width_in, height_in, page, &layers, extent, request.legend)?;
            display.show(&path)?;
            Ok(RenderOutcome {
                layers_drawn: layers.len(),
                saved_to: None,
            })
        }
    }
}

/// The union of every layer's literal-bbox filter, `None` when no layer
/// carries one.
fn viewport_clip(layers: &[(LayerSpec, StyleIntent)]) -> Option<BBox> {
    layers
        .iter()
        .filter_map(|(spec, _)| match &spec.filter {
            FilterSpec::BBoxClip(bounds) => Some(*bounds),
            _ => None,
        })
        .reduce(|a, b| a.union(&b))
}

/// The data extent the viewport is fitted to: the viewport clip when one
/// was configured, else the union of all layer bboxes, else a unit box so
/// a zero-layer render still yields a valid empty canvas.
fn fit_extent(canvas: &CanvasSpec, layers: &[StyledLayer]) -> BBox {
    if let Some(bounds) = canvas.clip_bounds {
        return bounds;
    }
    layers
        .iter()
        .filter_map(|l| l.set.bbox())
        .reduce(|a, b| a.union(&b))
        .unwrap_or_else(|| BBox::from_bounds(0.0, 0.0, 1.0, 1.0))
}

/// Height from the data aspect ratio; square when the extent is degenerate.
fn natural_height(width_in: f64, extent: &BBox) -> f64 {
    if extent.width() > 0.0 && extent.height() > 0.0 {
        width_in * extent.height() / extent.width()
    } else {
        width_in
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_to(
    path: &Path,
    format: OutputFormat,
    width_in: f64,
    height_in: f64,
    page: &PageConfig,
    layers: &[StyledLayer],
    extent: BBox,
    legend: LegendPosition,
) -> Result<(), RenderError> {
    let target = DrawTarget::create(path, format, width_in, height_in, page.dpi)?;
    let viewport = Viewport::fit(extent, target.device_width, target.device_height);
    compositor::draw(
        target.context(),
        layers,
        &viewport,
        target.device_width,
        target.device_height,
        target.point_scale,
        legend,
    )?;
    target.save()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartopress_core::error::{ConfigError, SourceError};
    use cartopress_core::geometry::{Feature, GeometrySet, Point, Shape};
    use cartopress_core::layer::{LayerSource, LineStyle};
    use std::cell::Cell;

    struct CountingSource {
        sets: Vec<GeometrySet>,
        fetches: usize,
    }

    impl GeometrySource for CountingSource {
        fn fetch(&mut self, _source: &LayerSource) -> Result<GeometrySet, SourceError> {
            let set = self.sets.remove(0);
            self.fetches += 1;
            Ok(set)
        }
    }

    struct NullDisplay {
        shown: Cell<bool>,
    }

    impl DisplaySink for NullDisplay {
        fn show(&self, _png_path: &Path) -> Result<(), RenderError> {
            self.shown.set(true);
            Ok(())
        }
    }

    fn null_display() -> NullDisplay {
        NullDisplay {
            shown: Cell::new(false),
        }
    }

    fn polygon_set() -> GeometrySet {
        GeometrySet::new(vec![Feature::new(Shape::Polygon {
            outer: vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 10.0),
                Point::new(0.0, 0.0),
            ],
            holes: Vec::new(),
        })])
    }

    fn line_set() -> GeometrySet {
        GeometrySet::new(vec![Feature::new(Shape::Line(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
        ]))])
    }

    fn tmp(name: &str) -> PathBuf {
        std::env::temp_dir().join(name)
    }

    #[test]
    fn test_zero_divisor_fails_before_any_fetch() {
        let mut source = CountingSource {
            sets: vec![line_set()],
            fetches: 0,
        };
        let request = RenderRequest {
            layers: vec![(
                LayerSpec::new(LayerSource::Table("roads".into())),
                StyleIntent::default(),
            )],
            size: SizeTarget::WidthDivisor(0.0),
            legend: LegendPosition::Best,
            sink: OutputSink::SaveTo(tmp("cartopress_never_written.png")),
        };
        let err = run(&request, &mut source, &PageConfig::default(), &null_display())
            .unwrap_err();
        assert!(matches!(
            err,
            RunError::Pipeline(PipelineError::Config(ConfigError::NonPositiveDivisor(_)))
        ));
        assert_eq!(source.fetches, 0);
    }

    #[test]
    fn test_zero_layers_renders_an_empty_canvas() {
        let mut source = CountingSource {
            sets: Vec::new(),
            fetches: 0,
        };
        let path = tmp("cartopress_empty.png");
        let request = RenderRequest {
            layers: Vec::new(),
            size: SizeTarget::WidthDivisor(1.0),
            legend: LegendPosition::Best,
            sink: OutputSink::SaveTo(path.clone()),
        };
        let outcome = run(&request, &mut source, &PageConfig::default(), &null_display())
            .unwrap();
        assert_eq!(outcome.layers_drawn, 0);
        assert!(path.exists());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_unconfigured_layer_is_skipped_silently() {
        let mut source = CountingSource {
            sets: vec![line_set()],
            fetches: 0,
        };
        let path = tmp("cartopress_skip.png");
        let request = RenderRequest {
            layers: vec![
                (LayerSpec::unconfigured(), StyleIntent::default()),
                (
                    LayerSpec::new(LayerSource::Table("roads".into())),
                    StyleIntent::default(),
                ),
            ],
            size: SizeTarget::WidthDivisor(1.0),
            legend: LegendPosition::Best,
            sink: OutputSink::SaveTo(path.clone()),
        };
        let outcome = run(&request, &mut source, &PageConfig::default(), &null_display())
            .unwrap();
        assert_eq!(outcome.layers_drawn, 1);
        assert_eq!(source.fetches, 1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_three_layer_composite() {
        // Polygon layer (filled categorical), invisible line layer, dashed
        // green line layer, composited in that order.
        let mut source = CountingSource {
            sets: vec![polygon_set(), line_set(), line_set()],
            fetches: 0,
        };
        let path = tmp("cartopress_three.png");
        let request = RenderRequest {
            layers: vec![
                (
                    LayerSpec::new(LayerSource::Table("buildings".into())),
                    StyleIntent::default(),
                ),
                (
                    LayerSpec::new(LayerSource::Table("extent".into())),
                    StyleIntent::default().with_linestyle(LineStyle::Invisible),
                ),
                (
                    LayerSpec::new(LayerSource::Table("roads".into())),
                    StyleIntent::default()
                        .with_color("#1b9e77".parse().unwrap())
                        .with_linestyle("dashed".parse().unwrap())
                        .with_label("Roads"),
                ),
            ],
            size: SizeTarget::WidthDivisor(1.0),
            legend: LegendPosition::Best,
            sink: OutputSink::SaveTo(path.clone()),
        };
        let outcome = run(&request, &mut source, &PageConfig::default(), &null_display())
            .unwrap();
        assert_eq!(outcome.layers_drawn, 3);
        assert_eq!(outcome.saved_to.as_deref(), Some(path.as_path()));
        assert!(path.exists());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_display_sink_invoked_when_no_outfile() {
        let mut source = CountingSource {
            sets: Vec::new(),
            fetches: 0,
        };
        let display = null_display();
        let request = RenderRequest {
            layers: Vec::new(),
            size: SizeTarget::WidthDivisor(1.0),
            legend: LegendPosition::Best,
            sink: OutputSink::Display,
        };
        let outcome = run(&request, &mut source, &PageConfig::default(), &display).unwrap();
        assert!(display.shown.get());
        assert_eq!(outcome.saved_to, None);
    }

    #[test]
    fn test_differing_bbox_filters_union_into_one_clip() {
        let layers = vec![
            (
                LayerSpec::new(LayerSource::Table("west".into()))
                    .with_filter(FilterSpec::BBoxClip(BBox::from_bounds(0.0, 0.0, 2.0, 2.0))),
                StyleIntent::default(),
            ),
            (
                LayerSpec::new(LayerSource::Table("plain".into())),
                StyleIntent::default(),
            ),
            (
                LayerSpec::new(LayerSource::Table("east".into()))
                    .with_filter(FilterSpec::BBoxClip(BBox::from_bounds(3.0, 1.0, 5.0, 4.0))),
                StyleIntent::default(),
            ),
        ];
        assert_eq!(
            viewport_clip(&layers),
            Some(BBox::from_bounds(0.0, 0.0, 5.0, 4.0))
        );
        assert_eq!(viewport_clip(&layers[1..2]), None);
    }

    #[test]
    fn test_bbox_filter_becomes_viewport_clip() {
        let canvas = CanvasSpec {
            width_in: 4.0,
            height_in: None,
            clip_bounds: Some(BBox::from_bounds(0.0, 0.0, 4.0, 2.0)),
        };
        let extent = fit_extent(&canvas, &[]);
        assert_eq!(extent, BBox::from_bounds(0.0, 0.0, 4.0, 2.0));
        assert_eq!(natural_height(4.0, &extent), 2.0);
    }
}
