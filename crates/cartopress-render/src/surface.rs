//! Drawing-surface creation and persistence.
//!
//! The output format is inferred from the target extension. PNG renders at
//! the page's raster resolution; SVG and PDF are vector surfaces sized in
//! typographic points. When no output path is given the canvas goes to an
//! interactive display collaborator instead.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use cairo::{Context, Format, ImageSurface, PdfSurface, SvgSurface};
use thiserror::Error;

pub const POINTS_PER_INCH: f64 = 72.0;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("cannot infer output format from '{0}', expected .png, .svg, or .pdf")]
    UnsupportedFormat(String),

    #[error("drawing failed: {0}")]
    Cairo(#[from] cairo::Error),

    #[error("writing the canvas failed: {0}")]
    Write(#[from] cairo::IoError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("display failed: {0}")]
    Display(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Svg,
    Pdf,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self, RenderError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("png") => Ok(OutputFormat::Png),
            Some("svg") => Ok(OutputFormat::Svg),
            Some("pdf") => Ok(OutputFormat::Pdf),
            _ => Err(RenderError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

enum TargetKind {
    Png { surface: ImageSurface, path: PathBuf },
    Svg(SvgSurface),
    Pdf(PdfSurface),
}

/// One canvas being drawn, wrapping the cairo context plus the device
/// metrics the compositor needs.
pub struct DrawTarget {
    kind: TargetKind,
    ctx: Context,
    pub device_width: f64,
    pub device_height: f64,
    /// Device units per typographic point; stroke widths and dash patterns
    /// are specified in points and multiplied by this.
    pub point_scale: f64,
}

impl DrawTarget {
    pub fn create(
        path: &Path,
        format: OutputFormat,
        width_in: f64,
        height_in: f64,
        dpi: f64,
    ) -> Result<Self, RenderError> {
        match format {
            OutputFormat::Png => {
                let w = (width_in * dpi).ceil() as i32;
                let h = (height_in * dpi).ceil() as i32;
                let surface = ImageSurface::create(Format::ARgb32, w.max(1), h.max(1))?;
                let ctx = Context::new(&surface)?;
                Ok(Self {
                    kind: TargetKind::Png {
                        surface,
                        path: path.to_path_buf(),
                    },
                    ctx,
                    device_width: w.max(1) as f64,
                    device_height: h.max(1) as f64,
                    point_scale: dpi / POINTS_PER_INCH,
                })
            }
            OutputFormat::Svg => {
                let w = width_in * POINTS_PER_INCH;
                let h = height_in * POINTS_PER_INCH;
                let surface = SvgSurface::new(w, h, Some(path))?;
                let ctx = Context::new(&surface)?;
                Ok(Self {
                    kind: TargetKind::Svg(surface),
                    ctx,
                    device_width: w,
                    device_height: h,
                    point_scale: 1.0,
                })
            }
            OutputFormat::Pdf => {
                let w = width_in * POINTS_PER_INCH;
                let h = height_in * POINTS_PER_INCH;
                let surface = PdfSurface::new(w, h, path)?;
                let ctx = Context::new(&surface)?;
                Ok(Self {
                    kind: TargetKind::Pdf(surface),
                    ctx,
                    device_width: w,
                    device_height: h,
                    point_scale: 1.0,
                })
            }
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Persist the canvas: PNG pixels are written out here, vector surfaces
    /// flush on finish.
    pub fn save(self) -> Result<(), RenderError> {
        match self.kind {
            TargetKind::Png { surface, path } => {
                let mut file = fs::File::create(&path)?;
                surface.write_to_png(&mut file)?;
            }
            TargetKind::Svg(surface) => {
                surface.finish();
            }
            TargetKind::Pdf(surface) => {
                surface.finish();
            }
        }
        Ok(())
    }
}

/// Interactive display collaborator, used when no output path is supplied.
pub trait DisplaySink {
    fn show(&self, png_path: &Path) -> Result<(), RenderError>;
}

/// Hands the rendered canvas to the platform image viewer.
pub struct SystemViewer;

impl DisplaySink for SystemViewer {
    fn show(&self, png_path: &Path) -> Result<(), RenderError> {
        let opener = if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        };
        Command::new(opener)
            .arg(png_path)
            .status()
            .map_err(|e| RenderError::Display(format!("{opener}: {e}")))
            .and_then(|status| {
                if status.success() {
                    Ok(())
                } else {
                    Err(RenderError::Display(format!("{opener} exited with {status}")))
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            OutputFormat::from_path(Path::new("map.png")).unwrap(),
            OutputFormat::Png
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("out/map.SVG")).unwrap(),
            OutputFormat::Svg
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("map.pdf")).unwrap(),
            OutputFormat::Pdf
        );
        assert!(matches!(
            OutputFormat::from_path(Path::new("map.tiff")),
            Err(RenderError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_png_target_metrics() {
        let path = std::env::temp_dir().join("cartopress_target_metrics.png");
        let target =
            DrawTarget::create(&path, OutputFormat::Png, 2.0, 1.0, 600.0).unwrap();
        assert_eq!(target.device_width, 1200.0);
        assert_eq!(target.device_height, 600.0);
        assert!((target.point_scale - 600.0 / 72.0).abs() < 1e-12);
        target.save().unwrap();
        assert!(path.exists());
        let _ = fs::remove_file(&path);
    }
}
