//! GeoJSON decoding, shared by the file source and the PostGIS source
//! (which requests `ST_AsGeoJSON` payloads).

use std::fs;
use std::path::Path;

use serde_json::Value;

use cartopress_core::error::SourceError;
use cartopress_core::geometry::{Feature, GeometrySet, Point, Shape};
use cartopress_core::layer::LayerSource;
use cartopress_core::loader::GeometrySource;

/// Property carrying the categorical attribute for colormap styling.
pub const CATEGORY_PROPERTY: &str = "category";

/// File-backed source: reads a GeoJSON document into the same shape the
/// database path produces, so the pipeline is agnostic to origin.
#[derive(Debug, Default)]
pub struct FileSource;

impl GeometrySource for FileSource {
    fn fetch(&mut self, source: &LayerSource) -> Result<GeometrySet, SourceError> {
        match source {
            LayerSource::File(path) => read_geojson_file(path),
            LayerSource::Table(name) => Err(SourceError::Unsupported(format!(
                "table '{name}' requested from the file source"
            ))),
        }
    }
}

pub fn read_geojson_file(path: &Path) -> Result<GeometrySet, SourceError> {
    let text = fs::read_to_string(path)?;
    parse_document(&text)
}

/// Parse a GeoJSON document: a FeatureCollection, a single Feature, or a
/// bare geometry.
pub fn parse_document(text: &str) -> Result<GeometrySet, SourceError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| SourceError::Payload(e.to_string()))?;
    let mut features = Vec::new();
    match value.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            let members = value
                .get("features")
                .and_then(Value::as_array)
                .ok_or_else(|| SourceError::Payload("FeatureCollection without features".into()))?;
            for member in members {
                collect_feature(member, &mut features)?;
            }
        }
        Some("Feature") => collect_feature(&value, &mut features)?,
        Some(_) => collect_geometry(&value, None, &mut features)?,
        None => return Err(SourceError::Payload("document without a type".into())),
    }
    Ok(GeometrySet::new(features))
}

/// Decode one geometry object into shapes. Multi-part geometries expand
/// into one shape per part.
pub fn decode_geometry(value: &Value) -> Result<Vec<Shape>, SourceError> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| SourceError::Payload("geometry without a type".into()))?;
    let coords = value
        .get("coordinates")
        .ok_or_else(|| SourceError::Payload(format!("{kind} without coordinates")))?;

    match kind {
        "Point" => Ok(vec![Shape::Point(position(coords)?)]),
        "MultiPoint" => array(coords)?
            .iter()
            .map(|c| Ok(Shape::Point(position(c)?)))
            .collect(),
        "LineString" => Ok(vec![Shape::Line(positions(coords)?)]),
        "MultiLineString" => array(coords)?
            .iter()
            .map(|c| Ok(Shape::Line(positions(c)?)))
            .collect(),
        "Polygon" => Ok(vec![polygon(coords)?]),
        "MultiPolygon" => array(coords)?.iter().map(polygon).collect(),
        other => Err(SourceError::Payload(format!(
            "unsupported geometry type '{other}'"
        ))),
    }
}

fn collect_feature(value: &Value, out: &mut Vec<Feature>) -> Result<(), SourceError> {
    let geometry = value
        .get("geometry")
        .filter(|g| !g.is_null())
        .ok_or_else(|| SourceError::Payload("feature without geometry".into()))?;
    let category = value
        .get("properties")
        .and_then(|p| p.get(CATEGORY_PROPERTY))
        .and_then(category_string);
    collect_geometry(geometry, category, out)
}

fn collect_geometry(
    value: &Value,
    category: Option<String>,
    out: &mut Vec<Feature>,
) -> Result<(), SourceError> {
    for shape in decode_geometry(value)? {
        out.push(Feature {
            shape,
            category: category.clone(),
        });
    }
    Ok(())
}

fn category_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn array(value: &Value) -> Result<&Vec<Value>, SourceError> {
    value
        .as_array()
        .ok_or_else(|| SourceError::Payload("expected a coordinate array".into()))
}

fn position(value: &Value) -> Result<Point, SourceError> {
    let pair = array(value)?;
    if pair.len() < 2 {
        return Err(SourceError::Payload("position with fewer than 2 values".into()));
    }
    let x = pair[0]
        .as_f64()
        .ok_or_else(|| SourceError::Payload("non-numeric coordinate".into()))?;
    let y = pair[1]
        .as_f64()
        .ok_or_else(|| SourceError::Payload("non-numeric coordinate".into()))?;
    Ok(Point::new(x, y))
}

fn positions(value: &Value) -> Result<Vec<Point>, SourceError> {
    array(value)?.iter().map(position).collect()
}

/// Decode a polygon's ring list; rings are closed on the way in when the
/// source left them open.
fn polygon(coords: &Value) -> Result<Shape, SourceError> {
    let rings = array(coords)?;
    let mut decoded: Vec<Vec<Point>> = rings
        .iter()
        .map(positions)
        .collect::<Result<_, _>>()?;
    if decoded.is_empty() {
        return Err(SourceError::Payload("polygon without rings".into()));
    }
    for ring in &mut decoded {
        if ring.first() != ring.last() {
            if let Some(first) = ring.first().copied() {
                ring.push(first);
            }
        }
    }
    let outer = decoded.remove(0);
    Ok(Shape::Polygon {
        outer,
        holes: decoded,
    })
}
