//! Edge detection for specimen gauging.
//!
//! Coordinates follow the pixel-center convention: sample `signal[i]` sits at
//! `x = i`, and image rows grow downward.
//!
//! Two measurement routes share the preprocessing stage:
//! - [`scanline`] samples a few parallel lines, finds gradient extrema refined
//!   with [`subpix::devernay_offset`], and keeps the best-scoring edge pair.
//! - [`gradient`] + [`nms`] produce a thinned edge map whose pixels are
//!   refined in 2-D by [`zernike`].
//!
//! All scratch buffers are owned by the call that creates them.

pub mod conv1d;
pub mod gradient;
pub mod kernels1d;
pub mod nms;
pub mod preprocess;
pub mod scanline;
pub mod subpix;
pub mod zernike;

pub use gradient::{GradientField, GradientSample};
pub use kernels1d::GaussianKernel1D;
pub use nms::{EdgeMap, EdgePixel, EdgeSuppressor, SuppressConfig};
pub use preprocess::{
    LumaWeights, PreprocessConfig, PreprocessStrategy, adaptive_threshold, enhance_contrast,
    gaussian_smooth, preprocess, to_grayscale,
};
pub use scanline::{
    EdgeCandidate, EdgePair, EdgePolarity, LineScan, ScanAxis, ScanlineConfig,
    ScanlineEdgePairFinder,
};
pub use subpix::devernay_offset;
pub use zernike::{RefinedEdgePoint, ZernikeConfig, ZernikeRefinement, ZernikeRefiner};
