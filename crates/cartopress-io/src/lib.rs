//! # cartopress I/O
//!
//! `GeometrySource` implementations: PostGIS tables (queried as GeoJSON
//! payloads over a per-fetch connection) and GeoJSON files. `DispatchSource`
//! routes each layer to the right backend so the pipeline only ever sees
//! one collaborator.

pub mod geojson;
pub mod postgis;

pub use geojson::FileSource;
pub use postgis::PostgisSource;

use cartopress_core::error::SourceError;
use cartopress_core::geometry::{GeometrySet, Point};
use cartopress_core::layer::LayerSource;
use cartopress_core::loader::GeometrySource;

/// Routes table sources to PostGIS and file sources to the GeoJSON reader.
pub struct DispatchSource {
    postgis: Option<PostgisSource>,
    files: FileSource,
}

impl DispatchSource {
    pub fn new(dsn: Option<&str>) -> Self {
        Self {
            postgis: dsn.map(PostgisSource::new),
            files: FileSource,
        }
    }
}

impl GeometrySource for DispatchSource {
    fn fetch(&mut self, source: &LayerSource) -> Result<GeometrySet, SourceError> {
        match source {
            LayerSource::Table(_) => match self.postgis.as_mut() {
                Some(postgis) => postgis.fetch(source),
                None => Err(SourceError::Connection(
                    "no data source name configured for table layers".into(),
                )),
            },
            LayerSource::File(_) => self.files.fetch(source),
        }
    }

    fn reference_point(&mut self, name: &str) -> Result<Option<Point>, SourceError> {
        match self.postgis.as_mut() {
            Some(postgis) => postgis.reference_point(name),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_without_dsn_fails() {
        let mut source = DispatchSource::new(None);
        let err = source
            .fetch(&LayerSource::Table("planet_osm_line".into()))
            .unwrap_err();
        assert!(matches!(err, SourceError::Connection(_)));
    }

    #[test]
    fn test_reference_point_without_dsn_is_unknown() {
        let mut source = DispatchSource::new(None);
        assert!(source.reference_point("town_hall").unwrap().is_none());
    }
}
