//! # cartopress renderer
//!
//! Cairo-backed compositing of styled geometry layers onto one canvas sized
//! for print: viewport fitting, PNG/SVG/PDF surfaces, legend, and the
//! end-to-end render pipeline.

pub mod compositor;
pub mod legend;
pub mod pipeline;
pub mod surface;
pub mod viewport;

pub use compositor::StyledLayer;
pub use legend::LegendPosition;
pub use pipeline::{OutputSink, RenderOutcome, RenderRequest, RunError};
pub use surface::{DisplaySink, DrawTarget, OutputFormat, RenderError, SystemViewer};
pub use viewport::Viewport;
