//! # cartopress core
//!
//! Geometry model and layer rendering pipeline: spatial filtering
//! (quadrant/scale/viewport clips), simplification, style resolution, and
//! canvas sizing from physical print units. I/O happens behind the
//! `GeometrySource` trait; drawing lives in the renderer crate.

pub mod canvas;
pub mod clip;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod loader;
pub mod simplify;
pub mod spatial;
pub mod style;

pub use canvas::{CanvasSpec, PageConfig, SizeTarget};
pub use error::{ConfigError, PipelineError, SourceError};
pub use geometry::{BBox, Feature, GeometryKind, GeometrySet, Point, Shape};
pub use layer::{Color, FilterSpec, LayerSource, LayerSpec, LineStyle, Quadrant, SimplifyPolicy, StyleIntent};
pub use loader::GeometrySource;
pub use style::{Paint, StrokeStyle, StyleSpec};
