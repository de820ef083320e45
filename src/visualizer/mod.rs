//! Live spectrum visualization.
//!
//! The analyser turns the tail of the input stream into byte magnitudes, the
//! renderer paints them as bars on any [`renderer::Surface`], and the terminal surface
//! puts the result on screen.

pub mod analyser;
pub mod renderer;
pub mod surface;

pub use renderer::SpectrumRenderer;
pub use surface::TerminalSurface;
