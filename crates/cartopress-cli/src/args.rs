//! Argument parsing and translation into a render request.

use std::path::PathBuf;

use clap::Parser;

use cartopress_core::canvas::{parse_size, SizeTarget};
use cartopress_core::error::ConfigError;
use cartopress_core::geometry::BBox;
use cartopress_core::layer::{
    parse_scale, FilterSpec, LayerSource, LayerSpec, SimplifyPolicy, StyleIntent,
};
use cartopress_render::pipeline::{OutputSink, RenderRequest};
use cartopress_render::LegendPosition;

/// Render one or more PostGIS or GeoJSON layers onto a single canvas sized
/// to match a physical print target.
#[derive(Parser, Debug)]
#[command(name = "cartopress", version, about, long_about = None)]
pub struct Cli {
    /// Layer definition, repeatable; draw order follows flag order.
    /// Comma-separated key=value pairs: select=<table or select expression>,
    /// file=<geojson path>, color=<name or #rrggbb>,
    /// linestyle=<solid|dashed|dotted|dashdot|invisible>, label=<text>,
    /// colormap, simplify=<dp:<tol>|vw:<tol>|chaikin>.
    /// Escape literal commas as '\,'.
    #[arg(long = "layer", value_name = "SPEC")]
    pub layers: Vec<String>,

    /// Clip all layers to one quadrant of the dataset bbox.
    #[arg(long, value_name = "tr|br|bl|tl", conflicts_with_all = ["bbox", "scale"])]
    pub quadrant: Option<String>,

    /// Constrain the visible extent (xmin,ymin,xmax,ymax in data units).
    /// This is a viewport clip; geometry is not removed.
    #[arg(long, value_name = "BOUNDS", conflicts_with = "scale")]
    pub bbox: Option<String>,

    /// Clip all layers to the print footprint at this map scale (1:N),
    /// centered on --ref-point.
    #[arg(long, value_name = "1:N", requires = "ref_point")]
    pub scale: Option<String>,

    /// Named reference point the scale clip centers on.
    #[arg(long = "ref-point", value_name = "NAME")]
    pub ref_point: Option<String>,

    /// Explicit physical canvas size in millimeters.
    #[arg(long, value_name = "WxH", conflicts_with = "widthdiv")]
    pub size: Option<String>,

    /// Divide the reference text-block width by this number (useful when
    /// two images are laid horizontally in the resulting document).
    #[arg(long, value_name = "N")]
    pub widthdiv: Option<f64>,

    /// Legend location.
    #[arg(long, default_value = "best", value_name = "POSITION")]
    pub legend: String,

    /// Output file (.png/.svg/.pdf). If unset, displayed on the screen.
    #[arg(long, value_name = "FILE")]
    pub outfile: Option<PathBuf>,

    /// PostgreSQL connection string for table layers.
    #[arg(long, default_value = "host=127.0.0.1 dbname=osm user=osm password=osm")]
    pub dsn: String,
}

impl Cli {
    /// Validate and translate the flags into a render request.
    pub fn into_request(self) -> Result<RenderRequest, ConfigError> {
        let filter = self.global_filter()?;

        let mut layers = Vec::with_capacity(self.layers.len());
        for raw in &self.layers {
            let (mut spec, intent) = parse_layer_spec(raw)?;
            spec.filter = filter.clone();
            layers.push((spec, intent));
        }

        let size = match (&self.size, self.widthdiv) {
            (Some(size), _) => parse_size(size)?,
            (None, Some(divisor)) => SizeTarget::WidthDivisor(divisor),
            (None, None) => SizeTarget::WidthDivisor(1.0),
        };

        let legend: LegendPosition = self.legend.parse()?;
        let sink = match self.outfile {
            Some(path) => OutputSink::SaveTo(path),
            None => OutputSink::Display,
        };

        Ok(RenderRequest {
            layers,
            size,
            legend,
            sink,
        })
    }

    fn global_filter(&self) -> Result<FilterSpec, ConfigError> {
        if let Some(q) = &self.quadrant {
            return Ok(FilterSpec::Quadrant(q.parse()?));
        }
        if let Some(bounds) = &self.bbox {
            return Ok(FilterSpec::BBoxClip(parse_bbox(bounds)?));
        }
        if let Some(scale) = &self.scale {
            let reference = self
                .ref_point
                .clone()
                .ok_or(ConfigError::ConflictingOptions("--scale", "missing --ref-point"))?;
            return Ok(FilterSpec::ScaleClip {
                scale: parse_scale(scale)?,
                reference,
            });
        }
        Ok(FilterSpec::None)
    }
}

/// Split on commas, honoring `\,` escapes so select expressions can carry
/// literal commas.
fn split_spec(raw: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(',') => current.push(','),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            ',' => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// Parse one `--layer` value into its spec and style intent.
pub fn parse_layer_spec(raw: &str) -> Result<(LayerSpec, StyleIntent), ConfigError> {
    let malformed =
        |why: &str| ConfigError::MalformedLayerSpec(raw.to_string(), why.to_string());

    let mut source: Option<LayerSource> = None;
    let mut simplify = SimplifyPolicy::None;
    let mut intent = StyleIntent::default();

    for part in split_spec(raw) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (key, value) = match part.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (part, ""),
        };
        match key {
            "select" => {
                if source.is_some() {
                    return Err(ConfigError::ConflictingOptions("select", "file"));
                }
                source = Some(LayerSource::Table(value.to_string()));
            }
            "file" => {
                if source.is_some() {
                    return Err(ConfigError::ConflictingOptions("select", "file"));
                }
                source = Some(LayerSource::File(PathBuf::from(value)));
            }
            "color" => intent.color = Some(value.parse()?),
            "linestyle" => intent.linestyle = Some(value.parse()?),
            "label" => intent.label = Some(value.to_string()),
            "colormap" => intent.use_colormap = true,
            "simplify" => simplify = parse_simplify(value).ok_or_else(|| {
                malformed("simplify expects dp:<tol>, vw:<tol>, or chaikin")
            })?,
            _ => return Err(malformed("unknown key")),
        }
    }

    let spec = LayerSpec {
        source,
        filter: FilterSpec::None,
        simplify,
    };
    Ok((spec, intent))
}

fn parse_simplify(value: &str) -> Option<SimplifyPolicy> {
    if value == "chaikin" {
        return Some(SimplifyPolicy::Chaikin);
    }
    let (algo, tol) = value.split_once(':')?;
    let tolerance: f64 = tol.parse().ok()?;
    if tolerance < 0.0 {
        return None;
    }
    match algo {
        "dp" => Some(SimplifyPolicy::DouglasPeucker(tolerance)),
        "vw" => Some(SimplifyPolicy::VisvalingamWhyatt(tolerance)),
        _ => None,
    }
}

fn parse_bbox(s: &str) -> Result<BBox, ConfigError> {
    let malformed = || {
        ConfigError::MalformedLayerSpec(
            s.to_string(),
            "bbox expects xmin,ymin,xmax,ymax".to_string(),
        )
    };
    let values: Vec<f64> = s
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| malformed())?;
    let [xmin, ymin, xmax, ymax] = values[..] else {
        return Err(malformed());
    };
    if xmin >= xmax || ymin >= ymax {
        return Err(malformed());
    }
    Ok(BBox::from_bounds(xmin, ymin, xmax, ymax))
}
