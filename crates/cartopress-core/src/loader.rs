//! Layer loading: fetch from the data source, then filter and simplify.

use log::debug;

use crate::clip::{clip_to_bbox, clip_to_quadrant, scale_footprint_m};
use crate::error::{ConfigError, PipelineError, SourceError};
use crate::geometry::{BBox, GeometrySet, Point};
use crate::layer::{FilterSpec, LayerSource, LayerSpec};
use crate::simplify::simplify;

/// The spatial data source collaborator. Implementations fetch a geometry
/// collection for a layer source descriptor and resolve named reference
/// points for scale clips.
pub trait GeometrySource {
    fn fetch(&mut self, source: &LayerSource) -> Result<GeometrySet, SourceError>;

    /// Resolve a named reference point. `Ok(None)` means the source has no
    /// such point, which the loader reports as a `ConfigError`.
    fn reference_point(&mut self, name: &str) -> Result<Option<Point>, SourceError> {
        let _ = name;
        Ok(None)
    }
}

/// Load one layer. An unconfigured layer (no source) yields `Ok(None)` and
/// is skipped silently, distinct from a configured query returning zero
/// rows, which yields an empty, non-absent set. Source failure is fatal:
/// no retries, no partial map.
///
/// `canvas_width_mm` is the resolved output width, so scale clips stay at
/// the requested print scale under any sizing option.
pub fn load(
    spec: &LayerSpec,
    source: &mut dyn GeometrySource,
    canvas_width_mm: f64,
) -> Result<Option<GeometrySet>, PipelineError> {
    let Some(layer_source) = &spec.source else {
        return Ok(None);
    };

    let set = source.fetch(layer_source)?;
    debug!("loaded {} features", set.len());

    let set = match &spec.filter {
        FilterSpec::None => set,
        // Viewport-only: the bounds constrain the visible extent at render
        // time, the geometry stays intact.
        FilterSpec::BBoxClip(_) => set,
        FilterSpec::Quadrant(quadrant) => clip_to_quadrant(&set, *quadrant),
        FilterSpec::ScaleClip { scale, reference } => {
            let center = source
                .reference_point(reference)?
                .ok_or_else(|| ConfigError::UnknownReferencePoint(reference.clone()))?;
            let footprint = scale_footprint_m(*scale, canvas_width_mm);
            let bbox = BBox::centered_on(center, footprint, footprint);
            clip_to_bbox(&set, &bbox)
        }
    };

    let set = simplify(&set, spec.simplify);
    Ok(Some(set))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Feature, Shape};
    use crate::layer::{Quadrant, SimplifyPolicy};

    const PAGE_WIDTH_MM: f64 = 121.2364;

    /// In-memory source that counts fetches, used to assert the loader
    /// never touches the store when it should not.
    pub struct MockSource {
        pub set: GeometrySet,
        pub fetches: usize,
        pub reference: Option<Point>,
    }

    impl MockSource {
        pub fn with_set(set: GeometrySet) -> Self {
            Self {
                set,
                fetches: 0,
                reference: None,
            }
        }
    }

    impl GeometrySource for MockSource {
        fn fetch(&mut self, _source: &LayerSource) -> Result<GeometrySet, SourceError> {
            self.fetches += 1;
            Ok(self.set.clone())
        }

        fn reference_point(&mut self, _name: &str) -> Result<Option<Point>, SourceError> {
            Ok(self.reference)
        }
    }

    fn square_set() -> GeometrySet {
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

    #[test]
    fn test_absent_source_is_silent_noop() {
        let mut source = MockSource::with_set(square_set());
        let result = load(
            &LayerSpec::unconfigured(),
            &mut source,
            PAGE_WIDTH_MM,
        )
        .unwrap();
        assert!(result.is_none());
        assert_eq!(source.fetches, 0);
    }

    #[test]
    fn test_empty_result_is_an_empty_set_not_absent() {
        let mut source = MockSource::with_set(GeometrySet::empty());
        let spec = LayerSpec::new(LayerSource::Table("planet_osm_line".into()));
        let result = load(&spec, &mut source, PAGE_WIDTH_MM).unwrap();
        let set = result.expect("configured layer must yield a set");
        assert!(set.is_empty());
        assert_eq!(source.fetches, 1);
    }

    #[test]
    fn test_quadrant_filter_applied() {
        let mut source = MockSource::with_set(square_set());
        let spec = LayerSpec::new(LayerSource::Table("areas".into()))
            .with_filter(FilterSpec::Quadrant(Quadrant::TopRight));
        let set = load(&spec, &mut source, PAGE_WIDTH_MM)
            .unwrap()
            .unwrap();
        let bbox = set.bbox().unwrap();
        assert_eq!(bbox.min, Point::new(5.0, 5.0));
        assert_eq!(bbox.max, Point::new(10.0, 10.0));
    }

    #[test]
    fn test_bbox_filter_leaves_geometry_intact() {
        let mut source = MockSource::with_set(square_set());
        let spec = LayerSpec::new(LayerSource::Table("areas".into())).with_filter(
            FilterSpec::BBoxClip(BBox::from_bounds(2.0, 2.0, 4.0, 4.0)),
        );
        let set = load(&spec, &mut source, PAGE_WIDTH_MM)
            .unwrap()
            .unwrap();
        assert_eq!(set, square_set());
    }

    #[test]
    fn test_unknown_reference_point_is_config_error() {
        let mut source = MockSource::with_set(square_set());
        let spec = LayerSpec::new(LayerSource::Table("areas".into())).with_filter(
            FilterSpec::ScaleClip {
                scale: 25000.0,
                reference: "nowhere".into(),
            },
        );
        let err = load(&spec, &mut source, PAGE_WIDTH_MM).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Config(ConfigError::UnknownReferencePoint(_))
        ));
    }

    #[test]
    fn test_scale_clip_centers_on_reference() {
        let mut source = MockSource::with_set(square_set());
        source.reference = Some(Point::new(5.0, 5.0));
        let spec = LayerSpec::new(LayerSource::Table("areas".into())).with_filter(
            FilterSpec::ScaleClip {
                // Footprint covers ~2.4 data units of the 10-unit square.
                scale: 20.0,
                reference: "center".into(),
            },
        );
        let set = load(&spec, &mut source, PAGE_WIDTH_MM)
            .unwrap()
            .unwrap();
        let bbox = set.bbox().unwrap();
        assert!(bbox.width() < 10.0);
        let c = bbox.center();
        assert!((c.x - 5.0).abs() < 1e-9 && (c.y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_scale_clip_footprint_tracks_canvas_width() {
        let big_square = GeometrySet::new(vec![Feature::new(Shape::Polygon {
            outer: vec![
                Point::new(0.0, 0.0),
                Point::new(1000.0, 0.0),
                Point::new(1000.0, 1000.0),
                Point::new(0.0, 1000.0),
                Point::new(0.0, 0.0),
            ],
            holes: Vec::new(),
        })]);
        let spec = LayerSpec::new(LayerSource::Table("areas".into())).with_filter(
            FilterSpec::ScaleClip {
                scale: 1000.0,
                reference: "center".into(),
            },
        );

        let clipped_width = |width_mm: f64| {
            let mut source = MockSource::with_set(big_square.clone());
            source.reference = Some(Point::new(500.0, 500.0));
            let set = load(&spec, &mut source, width_mm).unwrap().unwrap();
            set.bbox().unwrap().width()
        };

        // Halving the canvas (widthdiv 2) halves the clipped ground extent,
        // keeping the drawn map at the same print scale.
        let full = clipped_width(100.0);
        let half = clipped_width(50.0);
        assert!((full - 100.0).abs() < 1e-6);
        assert!((half - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_simplify_applied_after_filter() {
        let line = GeometrySet::new(vec![Feature::new(Shape::Line(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.001),
            Point::new(2.0, 0.0),
        ]))]);
        let mut source = MockSource::with_set(line);
        let spec = LayerSpec::new(LayerSource::Table("roads".into()))
            .with_simplify(SimplifyPolicy::DouglasPeucker(0.01));
        let set = load(&spec, &mut source, PAGE_WIDTH_MM)
            .unwrap()
            .unwrap();
        match &set.features()[0].shape {
            Shape::Line(points) => assert_eq!(points.len(), 2),
            other => panic!("expected line, got {other:?}"),
        }
    }
}
