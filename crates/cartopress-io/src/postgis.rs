//! PostGIS table source.
//!
//! Geometry is requested as `ST_AsGeoJSON` text and decoded with the same
//! machinery as the file path. The connection is acquired inside each fetch
//! and dropped on every exit path; a failed query aborts the whole render.

use log::debug;
use postgres::{Client, NoTls};

use cartopress_core::error::SourceError;
use cartopress_core::geometry::{Feature, GeometrySet, Point};
use cartopress_core::layer::LayerSource;
use cartopress_core::loader::GeometrySource;

use crate::geojson::decode_geometry;

/// The fixed geometry column name in the spatial store.
pub const GEOMETRY_COLUMN: &str = "way";
/// Alias the geometry expression is selected under, kept stable so row
/// decoding never depends on the shape of the select.
pub const GEOMETRY_ALIAS: &str = "way1";
/// Table holding named reference points for scale clips.
pub const REFERENCE_TABLE: &str = "reference_points";

/// Build the layer select statement. `select` may be a bare table name or
/// an aliased subquery.
pub fn build_query(select: &str) -> String {
    format!("SELECT ST_AsGeoJSON({GEOMETRY_COLUMN}) AS {GEOMETRY_ALIAS} FROM {select}")
}

/// A PostGIS-backed geometry source.
pub struct PostgisSource {
    dsn: String,
}

impl PostgisSource {
    pub fn new(dsn: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
        }
    }

    fn connect(&self) -> Result<Client, SourceError> {
        Client::connect(&self.dsn, NoTls).map_err(|e| SourceError::Connection(e.to_string()))
    }
}

impl GeometrySource for PostgisSource {
    fn fetch(&mut self, source: &LayerSource) -> Result<GeometrySet, SourceError> {
        let select = match source {
            LayerSource::Table(select) => select,
            LayerSource::File(path) => {
                return Err(SourceError::Unsupported(format!(
                    "file '{}' requested from the PostGIS source",
                    path.display()
                )))
            }
        };

        let sql = build_query(select);
        debug!("fetching layer: {sql}");

        let mut client = self.connect()?;
        let rows = client
            .query(sql.as_str(), &[])
            .map_err(|e| SourceError::Query(e.to_string()))?;

        let mut features = Vec::new();
        for row in rows {
            let payload: String = row
                .try_get(GEOMETRY_ALIAS)
                .map_err(|e| SourceError::Query(e.to_string()))?;
            let value = serde_json::from_str(&payload)
                .map_err(|e| SourceError::Payload(e.to_string()))?;
            for shape in decode_geometry(&value)? {
                features.push(Feature::new(shape));
            }
        }
        Ok(GeometrySet::new(features))
    }

    fn reference_point(&mut self, name: &str) -> Result<Option<Point>, SourceError> {
        let sql = format!(
            "SELECT ST_X({GEOMETRY_COLUMN}) AS x, ST_Y({GEOMETRY_COLUMN}) AS y \
             FROM {REFERENCE_TABLE} WHERE name = $1"
        );
        let mut client = self.connect()?;
        let rows = client
            .query(sql.as_str(), &[&name])
            .map_err(|e| SourceError::Query(e.to_string()))?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let x: f64 = row.try_get("x").map_err(|e| SourceError::Query(e.to_string()))?;
        let y: f64 = row.try_get("y").map_err(|e| SourceError::Query(e.to_string()))?;
        Ok(Some(Point::new(x, y)))
    }
}
