//! Measurement from operator-placed lines.
//!
//! Two vertical lines bound the width and two horizontal lines bound the
//! height. Positions are whole pixels and may arrive out of range from a UI,
//! so they are signed until validated.

use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationFactor, mm_to_inches};
use crate::error::MeasureError;
use crate::result::{MeasureMode, MeasureSource, MeasurementResult};

pub const MIN_LINE_GAP_PX: i64 = 10;
/// Largest accepted specimen dimension, 4 inches.
pub const MAX_DIMENSION_MM: f64 = 101.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualLines {
    /// x of the first vertical line.
    pub width_line1: i64,
    pub width_line2: i64,
    /// y of the first horizontal line.
    pub height_line1: i64,
    pub height_line2: i64,
}

impl ManualLines {
    pub fn width_px(&self) -> i64 {
        (self.width_line2 - self.width_line1).abs()
    }

    pub fn height_px(&self) -> i64 {
        (self.height_line2 - self.height_line1).abs()
    }
}

fn check_in_range(name: &str, v: i64, limit: usize) -> Result<(), MeasureError> {
    if v < 0 || v > limit as i64 {
        return Err(MeasureError::InvalidLines(format!(
            "{name} ({v}) out of bounds (0-{limit})"
        )));
    }
    Ok(())
}

/// Rejects lines outside the image, coincident or closer than
/// [`MIN_LINE_GAP_PX`], and, when `factor` is given, dimensions above
/// [`MAX_DIMENSION_MM`].
pub fn validate_lines(
    lines: &ManualLines,
    image_width: usize,
    image_height: usize,
    factor: Option<&CalibrationFactor>,
) -> Result<(), MeasureError> {
    check_in_range("width line 1", lines.width_line1, image_width)?;
    check_in_range("width line 2", lines.width_line2, image_width)?;
    check_in_range("height line 1", lines.height_line1, image_height)?;
    check_in_range("height line 2", lines.height_line2, image_height)?;

    if lines.width_line1 == lines.width_line2 {
        return Err(MeasureError::InvalidLines(
            "width lines cannot be at the same position".into(),
        ));
    }
    if lines.height_line1 == lines.height_line2 {
        return Err(MeasureError::InvalidLines(
            "height lines cannot be at the same position".into(),
        ));
    }
    if lines.width_px() < MIN_LINE_GAP_PX {
        return Err(MeasureError::InvalidLines(format!(
            "width lines must be at least {MIN_LINE_GAP_PX} pixels apart"
        )));
    }
    if lines.height_px() < MIN_LINE_GAP_PX {
        return Err(MeasureError::InvalidLines(format!(
            "height lines must be at least {MIN_LINE_GAP_PX} pixels apart"
        )));
    }

    if let Some(f) = factor {
        for (name, px) in [("width", lines.width_px()), ("height", lines.height_px())] {
            let mm = f.to_mm(px as f64);
            if mm > MAX_DIMENSION_MM {
                return Err(MeasureError::InvalidLines(format!(
                    "{name} ({mm:.2}mm / {:.2}\") exceeds 4-inch limit",
                    mm_to_inches(mm)
                )));
            }
        }
    }
    Ok(())
}

/// Validates `lines` against the image and converts them to an area result.
pub fn measure_lines(
    lines: &ManualLines,
    image_width: usize,
    image_height: usize,
    factor: &CalibrationFactor,
) -> Result<MeasurementResult, MeasureError> {
    validate_lines(lines, image_width, image_height, Some(factor))?;
    Ok(MeasurementResult::from_pixels(
        MeasureMode::Area,
        MeasureSource::ManualLines,
        Some(lines.width_px() as f64),
        Some(lines.height_px() as f64),
        1.0,
        factor,
    ))
}
