//! Canvas sizing from physical print units.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::BBox;
use crate::style::StyleDefaults;

/// Millimeters per inch, the drawing surface's native unit.
pub const MM_PER_INCH: f64 = 25.4;

/// Physical constants of the print target, passed in explicitly instead of
/// living as module globals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageConfig {
    /// Width of the target document's text block in millimeters.
    pub textwidth_mm: f64,
    /// Raster output resolution in dots per inch.
    pub dpi: f64,
    /// Style defaults handed to the resolver.
    pub style: StyleDefaults,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            // Width of the main text block of the target document; see the
            // print template's geometry settings.
            textwidth_mm: 121.2364,
            dpi: 600.0,
            style: StyleDefaults::default(),
        }
    }
}

/// How the user asked for the canvas to be sized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SizeTarget {
    /// Explicit physical dimensions in millimeters.
    Explicit { width_mm: f64, height_mm: f64 },
    /// Reference text-block width divided by this factor; height follows
    /// the data's aspect ratio.
    WidthDivisor(f64),
}

/// Final canvas description: physical dimensions in inches plus the
/// optional viewport clip bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSpec {
    pub width_in: f64,
    /// `None` leaves the height to the drawing surface's natural aspect.
    pub height_in: Option<f64>,
    /// Visible-extent constraint in data units; never removes geometry.
    pub clip_bounds: Option<BBox>,
}

impl CanvasSpec {
    pub fn with_clip_bounds(mut self, bounds: BBox) -> Self {
        self.clip_bounds = Some(bounds);
        self
    }
}

/// Compute canvas dimensions. Fails fast on a non-positive divisor, before
/// any data source is touched.
pub fn size(target: SizeTarget, page: &PageConfig) -> Result<CanvasSpec, ConfigError> {
    match target {
        SizeTarget::Explicit { width_mm, height_mm } => {
            if width_mm <= 0.0 || height_mm <= 0.0 {
                return Err(ConfigError::MalformedSize(format!(
                    "{width_mm}x{height_mm}"
                )));
            }
            Ok(CanvasSpec {
                width_in: width_mm / MM_PER_INCH,
                height_in: Some(height_mm / MM_PER_INCH),
                clip_bounds: None,
            })
        }
        SizeTarget::WidthDivisor(divisor) => {
            if divisor <= 0.0 {
                return Err(ConfigError::NonPositiveDivisor(divisor));
            }
            Ok(CanvasSpec {
                width_in: page.textwidth_mm / divisor / MM_PER_INCH,
                height_in: None,
                clip_bounds: None,
            })
        }
    }
}

/// Parse a `<width>x<height>` millimeter size string.
pub fn parse_size(s: &str) -> Result<SizeTarget, ConfigError> {
    let malformed = || ConfigError::MalformedSize(s.to_string());
    let (w, h) = s.split_once('x').ok_or_else(malformed)?;
    let width_mm: f64 = w.trim().parse().map_err(|_| malformed())?;
    let height_mm: f64 = h.trim().parse().map_err(|_| malformed())?;
    if width_mm <= 0.0 || height_mm <= 0.0 {
        return Err(malformed());
    }
    Ok(SizeTarget::Explicit { width_mm, height_mm })
}
