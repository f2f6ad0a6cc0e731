use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sg_core::{Image, Point2f};

use crate::calibration::{CalibrationFactor, CalibrationSource, mm_to_inches, mm2_to_in2};
use crate::config::MeasureMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureMode {
    /// Horizontal extent, from horizontal scanlines.
    Width,
    /// Vertical extent, from vertical scanlines.
    Height,
    /// Whichever axis gives the stronger measurement.
    Length,
    /// Width and height together.
    Area,
}

impl MeasureMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Width => "width",
            Self::Height => "height",
            Self::Length => "length",
            Self::Area => "area",
        }
    }
}

/// How the pixel extents of a result were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MeasureSource {
    Scanline,
    Zernike,
    ManualLines,
}

impl From<MeasureMethod> for MeasureSource {
    fn from(m: MeasureMethod) -> Self {
        match m {
            MeasureMethod::Scanline => Self::Scanline,
            MeasureMethod::Zernike => Self::Zernike,
        }
    }
}

/// Physical dimensions of one measured specimen.
///
/// Dimensions the mode did not measure are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementResult {
    pub mode: MeasureMode,
    pub source: MeasureSource,
    pub width_pixels: Option<f64>,
    pub height_pixels: Option<f64>,
    pub area_pixels: Option<f64>,
    pub width_mm: Option<f64>,
    pub height_mm: Option<f64>,
    pub area_mm2: Option<f64>,
    pub width_inches: Option<f64>,
    pub height_inches: Option<f64>,
    pub area_in2: Option<f64>,
    pub mm_per_pixel: f64,
    pub calibration: CalibrationSource,
    /// Detector confidence; larger is better, not comparable across methods.
    pub score: f64,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

impl MeasurementResult {
    pub fn from_pixels(
        mode: MeasureMode,
        source: MeasureSource,
        width_px: Option<f64>,
        height_px: Option<f64>,
        score: f64,
        factor: &CalibrationFactor,
    ) -> Self {
        let width_mm = width_px.map(|w| factor.to_mm(w));
        let height_mm = height_px.map(|h| factor.to_mm(h));
        let area_pixels = width_px.zip(height_px).map(|(w, h)| w * h);
        let area_mm2 = width_mm.zip(height_mm).map(|(w, h)| w * h);

        Self {
            mode,
            source,
            width_pixels: width_px,
            height_pixels: height_px,
            area_pixels,
            width_mm,
            height_mm,
            area_mm2,
            width_inches: width_mm.map(mm_to_inches),
            height_inches: height_mm.map(mm_to_inches),
            area_in2: area_mm2.map(mm2_to_in2),
            mm_per_pixel: factor.mm_per_pixel(),
            calibration: factor.source(),
            score,
            timestamp_ms: now_millis(),
        }
    }

    /// `(pixels, millimeters)` of the quantity a `mode` series records.
    ///
    /// `Length` takes whichever linear dimension is present, width first.
    pub fn sample(&self, mode: MeasureMode) -> Option<(f64, f64)> {
        match mode {
            MeasureMode::Width => self.width_pixels.zip(self.width_mm),
            MeasureMode::Height => self.height_pixels.zip(self.height_mm),
            MeasureMode::Length => self
                .width_pixels
                .zip(self.width_mm)
                .or(self.height_pixels.zip(self.height_mm)),
            MeasureMode::Area => self.area_pixels.zip(self.area_mm2),
        }
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineOrientation {
    /// Constant y.
    Horizontal,
    /// Constant x.
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayLine {
    pub orientation: LineOrientation,
    /// x for vertical lines, y for horizontal ones.
    pub position: f32,
}

/// Geometry a caller can draw over the source image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overlay {
    pub scan_lines: Vec<OverlayLine>,
    pub edge_lines: Vec<OverlayLine>,
    /// Region corners clockwise from top-left.
    pub corners: Option<[[f32; 2]; 4]>,
    pub edge_points: Vec<[f32; 2]>,
}

impl Overlay {
    pub(crate) fn set_corners(&mut self, corners: [Point2f; 4]) {
        self.corners = Some(corners.map(|p| [p.x, p.y]));
    }
}

/// Intermediate images, produced only on request.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    /// Preprocessed luma plane the detectors ran on.
    pub processed: Image<u8>,
    /// Suppressed edge strength, saturated at 255.
    pub edges: Image<u8>,
}

#[derive(Debug, Clone)]
pub struct Measurement {
    pub result: MeasurementResult,
    pub overlay: Overlay,
    pub diagnostics: Option<Diagnostics>,
}

#[cfg(test)]
mod tests {
    use crate::calibration::{CalibrationFactor, CalibrationSource};
    use crate::result::{MeasureMode, MeasureSource, MeasurementResult};

    #[test]
    fn area_result_carries_every_unit() {
        let f = CalibrationFactor::manual(0.5).expect("valid factor");
        let r = MeasurementResult::from_pixels(
            MeasureMode::Area,
            MeasureSource::Scanline,
            Some(101.6),
            Some(50.8),
            1.0,
            &f,
        );

        assert_eq!(r.width_mm, Some(50.8));
        assert_eq!(r.height_mm, Some(25.4));
        assert_eq!(r.area_pixels, Some(101.6 * 50.8));
        assert!((r.width_inches.expect("width") - 2.0).abs() < 1e-12);
        assert!((r.height_inches.expect("height") - 1.0).abs() < 1e-12);
        assert!((r.area_in2.expect("area") - 2.0).abs() < 1e-9);
        assert_eq!(r.calibration, CalibrationSource::Manual);
        assert!(r.timestamp_ms > 0);
    }

    #[test]
    fn width_result_leaves_height_empty() {
        let f = CalibrationFactor::manual(0.1).expect("valid factor");
        let r = MeasurementResult::from_pixels(
            MeasureMode::Width,
            MeasureSource::Scanline,
            Some(80.0),
            None,
            3.0,
            &f,
        );
        assert!(r.height_mm.is_none());
        assert!(r.area_mm2.is_none());
        assert_eq!(r.sample(MeasureMode::Length), r.sample(MeasureMode::Width));
        assert!(r.sample(MeasureMode::Area).is_none());

        let json = serde_json::to_value(&r).expect("serializable");
        assert_eq!(json["mode"], "width");
        assert!(json["heightMm"].is_null());
        assert!(json.get("timestampMs").is_some());
    }
}
