//! Calibrated specimen measurement.
//!
//! [`Measurer`] runs one synchronous pass over a captured [`sg_core::PixelBuffer`]
//! and returns a [`Measurement`]: pixel and physical dimensions, overlay
//! geometry and, on request, diagnostic images. Physical units come from the
//! [`CalibrationFactor`] held in a [`CalibrationStore`], read once per pass.
//!
//! Results can be collected in a caller-owned [`MeasurementHistory`] for
//! statistics and CSV export.

pub mod calibration;
pub mod config;
mod error;
pub mod history;
pub mod manual;
pub mod pipeline;
pub mod report;
pub mod result;
pub mod stats;

pub use calibration::{
    CalibrationFactor, CalibrationSource, CalibrationStore, CameraModel, mm_to_inches,
    mm2_to_in2, pixels_to_millimeters,
};
pub use config::{MeasureConfig, MeasureMethod, PreprocessMode};
pub use error::MeasureError;
pub use history::MeasurementHistory;
pub use manual::{ManualLines, measure_lines, validate_lines};
pub use pipeline::{Detection, Measurer, gray_buffer};
pub use report::{export_csv, statistics_report};
pub use result::{
    Diagnostics, LineOrientation, MeasureMode, MeasureSource, Measurement, MeasurementResult,
    Overlay, OverlayLine,
};
pub use stats::{MeasurementStatistics, calculate_measurement_statistics};
