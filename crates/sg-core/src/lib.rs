//! Foundational containers for specimen measurement.
//!
//! ## Pixel Buffers
//! [`PixelBuffer`] holds interleaved 8-bit samples exactly as delivered by a
//! capture source (gray, RGB or RGBA). Processing stages work on single-plane
//! [`Image`] values and borrowed [`ImageView`]s derived from it.
//!
//! ## Image Views and Stride
//! Views use element stride (not byte stride): the distance, in elements,
//! between adjacent row starts. A subview keeps its parent's stride, which
//! may be greater than its own `width`.
//!
//! ## Coordinates
//! Integer coordinates refer to pixel centers; `y` grows downward.

mod error;
mod geom;
mod image;

pub use error::Error;
pub use geom::{Point2f, Rect2f, Vec2f};
pub use image::{Channels, Image, ImageView, PixelBuffer};
