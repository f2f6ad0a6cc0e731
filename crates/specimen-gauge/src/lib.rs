//! Umbrella crate for the `specimen-gauge` workspace.
//!
//! Re-exports the pixel containers, the edge-detection stages and the
//! calibrated measurement pipeline under one path.

pub use sg_core::*;
pub use sg_edge::*;
pub use sg_measure::*;
