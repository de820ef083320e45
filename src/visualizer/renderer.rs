//! Bar-spectrum painting.
//!
//! Each frame pulls one [`FrequencyFrame`] and paints it onto a [`Surface`]
//! as bottom-anchored bars. Bar geometry depends only on the bin count and
//! the surface size; magnitudes only change bar heights. The fill is a fixed
//! vertical gradient over the whole surface, so color encodes position, not
//! amplitude.

use super::analyser::{Analyser, FrequencyFrame};
use crate::capture::InputStream;

/// Bar width relative to an even split of the surface width.
pub const BAR_WIDTH_FACTOR: f64 = 2.5;

/// Horizontal gap between bars, in surface units.
pub const BAR_GAP: f64 = 1.0;

/// Magnitude divisor applied to bar heights.
pub const HEIGHT_DIVISOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const BACKGROUND: Rgb = Rgb(0x00, 0x00, 0x00);
pub const GRADIENT_BOTTOM: Rgb = Rgb(0x70, 0x00, 0xff);
pub const GRADIENT_TOP: Rgb = Rgb(0x00, 0xff, 0xa3);

/// Axis-aligned rectangle in surface units, origin at the top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Paint used to fill a rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fill {
    /// Linear gradient along the y axis: `from` at `y_from`, `to` at `y_to`.
    VerticalGradient {
        y_from: f64,
        y_to: f64,
        from: Rgb,
        to: Rgb,
    },
}

impl Fill {
    /// Resolves the fill color at vertical position `y`.
    pub fn color_at(&self, y: f64) -> Rgb {
        let Fill::VerticalGradient {
            y_from,
            y_to,
            from,
            to,
        } = *self;

        let span = y_to - y_from;
        let t = if span.abs() < f64::EPSILON {
            0.0
        } else {
            ((y - y_from) / span).clamp(0.0, 1.0)
        };
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(lerp(from.0, to.0), lerp(from.1, to.1), lerp(from.2, to.2))
    }
}

/// 2D drawing target for the spectrum.
///
/// Dimensions may change between frames (resize); painters read them fresh
/// every frame.
pub trait Surface {
    fn width(&self) -> f64;
    fn height(&self) -> f64;
    fn clear(&mut self, color: Rgb);
    fn fill_rect(&mut self, rect: Rect, fill: Fill);
}

/// The gradient used for every bar on a surface of the given height.
pub fn bar_fill(surface_height: f64) -> Fill {
    Fill::VerticalGradient {
        y_from: surface_height,
        y_to: 0.0,
        from: GRADIENT_BOTTOM,
        to: GRADIENT_TOP,
    }
}

/// Computes one bar per bin, left to right.
///
/// Width is `width / bins × 2.5` with a 1-unit gap; bars past the right edge
/// are kept. Heights are `magnitude / 1.5` clipped to the surface height.
pub fn bar_layout(bins: &[u8], width: f64, height: f64) -> Vec<Rect> {
    if bins.is_empty() {
        return Vec::new();
    }

    let bar_width = width / bins.len() as f64 * BAR_WIDTH_FACTOR;
    let mut x = 0.0;
    bins.iter()
        .map(|&magnitude| {
            let bar_height = (magnitude as f64 / HEIGHT_DIVISOR).min(height.max(0.0));
            let rect = Rect {
                x,
                y: height - bar_height,
                width: bar_width,
                height: bar_height,
            };
            x += bar_width + BAR_GAP;
            rect
        })
        .collect()
}

/// Clears `surface` and paints `frame` onto it.
pub fn paint(frame: &FrequencyFrame, surface: &mut dyn Surface) {
    let width = surface.width();
    let height = surface.height();

    surface.clear(BACKGROUND);
    let fill = bar_fill(height);
    for rect in bar_layout(frame.bins(), width, height) {
        surface.fill_rect(rect, fill);
    }
}

/// Drives the spectrum display for one bound input stream.
///
/// There is no pause or resume: once cancelled, a renderer stays dead and a
/// new one must be bound. Cancelling never touches the input stream.
pub struct SpectrumRenderer {
    analyser: Analyser,
    live: bool,
    frames: u64,
}

impl SpectrumRenderer {
    /// Binds an analysis node to `stream` and arms the renderer.
    pub fn bind(stream: InputStream) -> Self {
        tracing::debug!("Spectrum renderer bound to {}", stream.info().device);
        Self {
            analyser: Analyser::new(stream),
            live: true,
            frames: 0,
        }
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn stream(&self) -> &InputStream {
        self.analyser.stream()
    }

    #[cfg(test)]
    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    /// Renders one frame. Returns false without drawing once cancelled, so a
    /// tick that was already in flight at cancellation is harmless.
    pub fn render_frame(&mut self, surface: &mut dyn Surface) -> bool {
        if !self.live {
            return false;
        }

        let frame = self.analyser.frequency_frame();
        paint(&frame, surface);
        self.frames += 1;
        true
    }

    pub fn cancel(&mut self) {
        if self.live {
            tracing::debug!("Spectrum renderer cancelled after {} frames", self.frames);
        }
        self.live = false;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum DrawCall {
        Clear(Rgb),
        Fill(Rect, Fill),
    }

    /// Surface that records every drawing call.
    pub struct RecordingSurface {
        pub width: f64,
        pub height: f64,
        pub calls: Vec<DrawCall>,
    }

    impl RecordingSurface {
        pub fn new(width: f64, height: f64) -> Self {
            Self {
                width,
                height,
                calls: Vec::new(),
            }
        }

        pub fn rects(&self) -> Vec<Rect> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    DrawCall::Fill(rect, _) => Some(*rect),
                    DrawCall::Clear(_) => None,
                })
                .collect()
        }
    }

    impl Surface for RecordingSurface {
        fn width(&self) -> f64 {
            self.width
        }

        fn height(&self) -> f64 {
            self.height
        }

        fn clear(&mut self, color: Rgb) {
            self.calls.push(DrawCall::Clear(color));
        }

        fn fill_rect(&mut self, rect: Rect, fill: Fill) {
            self.calls.push(DrawCall::Fill(rect, fill));
        }
    }
}
