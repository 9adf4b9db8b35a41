//! Boundary to an external QR renderer.
//!
//! Tokens are Base45 text with an uppercase prefix, so they fit QR
//! alphanumeric mode; rasterizing is left to the implementor.

use crate::error::{PipelineError, Result};

/// Turns a token into an image of the renderer's choosing.
pub trait QrRenderer {
    type Image;
    type Error: std::fmt::Display;

    fn render(&self, token: &str) -> std::result::Result<Self::Image, Self::Error>;
}

/// Render `token`, mapping renderer failures into [`PipelineError::Render`].
pub fn render<R: QrRenderer>(renderer: &R, token: &str) -> Result<R::Image> {
    renderer
        .render(token)
        .map_err(|e| PipelineError::Render(e.to_string()))
}
