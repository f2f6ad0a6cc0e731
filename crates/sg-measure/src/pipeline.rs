//! One measurement pass: preprocessing, edge detection and calibration.
//!
//! Stages
//! - Calibration snapshot: taken once, before any image work.
//! - Preprocess: luma plane, contrast stretch, optional binarization.
//! - Detect: scanline edge pairs, or Zernike-refined points from the
//!   suppressed Sobel edge map.
//! - Convert: pixel extents to millimetres, inches and areas.
//!
//! Every buffer is created inside the pass, so a [`Measurer`] can be shared
//! across threads.

use log::debug;
use sg_core::{Channels, Image, ImageView, PixelBuffer, Point2f, Rect2f};
use sg_edge::{
    EdgeMap, EdgePair, EdgeSuppressor, GradientField, ScanAxis, ScanlineEdgePairFinder,
    ZernikeRefiner, preprocess,
};

use crate::calibration::{CalibrationFactor, CalibrationStore};
use crate::config::{MeasureConfig, MeasureMethod};
use crate::error::MeasureError;
use crate::result::{
    Diagnostics, LineOrientation, MeasureMode, Measurement, MeasurementResult, Overlay,
    OverlayLine,
};

/// Pixel extents found in one image, before calibration.
#[derive(Debug, Clone)]
pub struct Detection {
    pub mode: MeasureMode,
    pub method: MeasureMethod,
    pub width_px: Option<f64>,
    pub height_px: Option<f64>,
    pub score: f64,
    pub overlay: Overlay,
    pub diagnostics: Option<Diagnostics>,
}

impl Detection {
    pub fn calibrate(self, factor: &CalibrationFactor) -> Measurement {
        let result = MeasurementResult::from_pixels(
            self.mode,
            self.method.into(),
            self.width_px,
            self.height_px,
            self.score,
            factor,
        );
        Measurement {
            result,
            overlay: self.overlay,
            diagnostics: self.diagnostics,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Measurer {
    cfg: MeasureConfig,
}

impl Measurer {
    pub fn new(cfg: MeasureConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &MeasureConfig {
        &self.cfg
    }

    /// Measures `buf` with the calibration current at the start of the pass.
    pub fn measure(
        &self,
        buf: &PixelBuffer,
        mode: MeasureMode,
        calibration: &CalibrationStore,
        with_diagnostics: bool,
    ) -> Result<Measurement, MeasureError> {
        let factor = calibration.snapshot()?;
        let detection = self.detect(buf, mode, with_diagnostics)?;
        Ok(detection.calibrate(&factor))
    }

    /// Validates raw capture data and measures it.
    pub fn measure_raw(
        &self,
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<u8>,
        mode: MeasureMode,
        calibration: &CalibrationStore,
    ) -> Result<Measurement, MeasureError> {
        let channels = Channels::from_count(channels)?;
        let buf = PixelBuffer::new(width, height, channels, data)?;
        self.measure(&buf, mode, calibration, false)
    }

    /// Pixel-only detection; no calibration required.
    pub fn detect(
        &self,
        buf: &PixelBuffer,
        mode: MeasureMode,
        with_diagnostics: bool,
    ) -> Result<Detection, MeasureError> {
        let processed = preprocess(buf, &self.cfg.preprocess_config());
        let view = processed.as_view();

        let (found, edges) = match self.cfg.method {
            MeasureMethod::Scanline => (self.detect_scanline(&view, mode)?, None),
            MeasureMethod::Zernike => {
                let edges = self.edge_map(&view);
                (self.detect_zernike(&view, &edges, mode)?, Some(edges))
            }
        };

        let diagnostics = if with_diagnostics {
            let edges = edges.unwrap_or_else(|| self.edge_map(&view));
            Some(Diagnostics {
                processed,
                edges: edges.to_visualization(),
            })
        } else {
            None
        };

        debug!(
            "{} via {:?}: width {:?} px, height {:?} px, score {:.3}",
            mode.as_str(),
            self.cfg.method,
            found.width_px,
            found.height_px,
            found.score
        );

        Ok(Detection {
            mode,
            method: self.cfg.method,
            width_px: found.width_px,
            height_px: found.height_px,
            score: found.score,
            overlay: found.overlay,
            diagnostics,
        })
    }

    fn edge_map(&self, view: &ImageView<'_, u8>) -> EdgeMap {
        let field = GradientField::sobel(view);
        EdgeSuppressor::new(self.cfg.suppress_config()).suppress(&field)
    }

    fn detect_scanline(
        &self,
        view: &ImageView<'_, u8>,
        mode: MeasureMode,
    ) -> Result<Found, MeasureError> {
        let finder = ScanlineEdgePairFinder::new(self.cfg.scanline_config());
        let mut found = Found::default();

        match mode {
            MeasureMode::Width => {
                let pair = finder.find(view, ScanAxis::Rows).ok_or(MeasureError::NoEdgesFound)?;
                found.add_pair(ScanAxis::Rows, &pair);
            }
            MeasureMode::Height => {
                let pair = finder.find(view, ScanAxis::Cols).ok_or(MeasureError::NoEdgesFound)?;
                found.add_pair(ScanAxis::Cols, &pair);
            }
            MeasureMode::Length => {
                let rows = finder.find(view, ScanAxis::Rows);
                let cols = finder.find(view, ScanAxis::Cols);
                match (rows, cols) {
                    (Some(h), Some(v)) => {
                        if h.separation * h.score > v.separation * v.score {
                            found.add_pair(ScanAxis::Rows, &h);
                        } else {
                            found.add_pair(ScanAxis::Cols, &v);
                        }
                    }
                    (Some(h), None) => found.add_pair(ScanAxis::Rows, &h),
                    (None, Some(v)) => found.add_pair(ScanAxis::Cols, &v),
                    (None, None) => return Err(MeasureError::NoEdgesFound),
                }
            }
            MeasureMode::Area => {
                let (Some(h), Some(v)) =
                    (finder.find(view, ScanAxis::Rows), finder.find(view, ScanAxis::Cols))
                else {
                    return Err(MeasureError::NoEdgesFound);
                };
                found.add_pair(ScanAxis::Rows, &h);
                found.add_pair(ScanAxis::Cols, &v);
                found.score = 0.5 * (h.score + v.score) as f64;

                let rect = Rect2f::bounding([
                    Point2f {
                        x: h.edge1.position,
                        y: v.edge1.position,
                    },
                    Point2f {
                        x: h.edge2.position,
                        y: v.edge2.position,
                    },
                ]);
                if let Some(rect) = rect {
                    found.overlay.set_corners(rect.corners());
                }
            }
        }
        Ok(found)
    }

    fn detect_zernike(
        &self,
        view: &ImageView<'_, u8>,
        edges: &EdgeMap,
        mode: MeasureMode,
    ) -> Result<Found, MeasureError> {
        let refined = ZernikeRefiner::new(self.cfg.zernike_config()).refine_edges(view, edges);
        let rect = Rect2f::bounding(refined.points.iter().map(|p| p.sub))
            .filter(|r| r.width() > 0.0 || r.height() > 0.0)
            .ok_or(MeasureError::NoEdgesFound)?;

        let width = rect.width() as f64;
        let height = rect.height() as f64;
        let mut found = Found {
            score: refined.points.iter().map(|p| p.k as f64).sum::<f64>()
                / refined.points.len() as f64,
            ..Found::default()
        };
        match mode {
            MeasureMode::Width => found.width_px = Some(width),
            MeasureMode::Height => found.height_px = Some(height),
            MeasureMode::Length if width >= height => found.width_px = Some(width),
            MeasureMode::Length => found.height_px = Some(height),
            MeasureMode::Area => {
                found.width_px = Some(width);
                found.height_px = Some(height);
            }
        }

        found.overlay.set_corners(rect.corners());
        found.overlay.edge_points = refined.points.iter().map(|p| [p.sub.x, p.sub.y]).collect();
        Ok(found)
    }
}

#[derive(Debug, Default)]
struct Found {
    width_px: Option<f64>,
    height_px: Option<f64>,
    score: f64,
    overlay: Overlay,
}

impl Found {
    fn add_pair(&mut self, axis: ScanAxis, pair: &EdgePair) {
        let (scan, edge) = match axis {
            ScanAxis::Rows => {
                self.width_px = Some(pair.separation as f64);
                (LineOrientation::Horizontal, LineOrientation::Vertical)
            }
            ScanAxis::Cols => {
                self.height_px = Some(pair.separation as f64);
                (LineOrientation::Vertical, LineOrientation::Horizontal)
            }
        };
        self.score = pair.score as f64;
        self.overlay.scan_lines.push(OverlayLine {
            orientation: scan,
            position: pair.line as f32,
        });
        for position in [pair.edge1.position, pair.edge2.position] {
            self.overlay.edge_lines.push(OverlayLine {
                orientation: edge,
                position,
            });
        }
    }
}

/// Wraps a single-plane image as a capture buffer.
pub fn gray_buffer(img: Image<u8>) -> Result<PixelBuffer, MeasureError> {
    Ok(PixelBuffer::from_gray(img)?)
}

#[cfg(test)]
mod tests {
    use sg_core::{Channels, Image, PixelBuffer};
    use sg_edge::preprocess;

    use crate::calibration::{CalibrationFactor, CalibrationStore};
    use crate::config::{MeasureConfig, MeasureMethod};
    use crate::error::MeasureError;
    use crate::pipeline::{Measurer, gray_buffer};
    use crate::result::{LineOrientation, MeasureMode};

    fn specimen(w: usize, h: usize, x0: usize, x1: usize, y0: usize, y1: usize) -> PixelBuffer {
        let mut data = vec![220u8; w * h];
        for y in y0..y1 {
            for x in x0..x1 {
                data[y * w + x] = 40;
            }
        }
        gray_buffer(Image::from_vec(w, h, data).expect("valid image")).expect("valid buffer")
    }

    fn calibrated(mm_per_pixel: f64) -> CalibrationStore {
        CalibrationStore::with_factor(CalibrationFactor::manual(mm_per_pixel).expect("valid factor"))
    }

    #[test]
    fn width_is_measured_and_calibrated() {
        let _ = env_logger::builder().is_test(true).try_init();

        let buf = specimen(200, 100, 70, 130, 10, 90);
        let m = Measurer::default()
            .measure(&buf, MeasureMode::Width, &calibrated(0.15), false)
            .expect("measurement");

        let px = m.result.width_pixels.expect("width");
        assert!((px - 60.0).abs() <= 1.0);
        assert!((m.result.width_mm.expect("mm") - px * 0.15).abs() < 1e-9);
        assert!(m.result.height_pixels.is_none());
        assert_eq!(m.overlay.scan_lines.len(), 1);
        assert_eq!(m.overlay.scan_lines[0].orientation, LineOrientation::Horizontal);
        assert_eq!(m.overlay.edge_lines.len(), 2);
        assert!(m.diagnostics.is_none());
    }

    #[test]
    fn area_needs_both_axes_and_reports_corners() {
        let buf = specimen(200, 100, 70, 130, 20, 80);
        let m = Measurer::default()
            .measure(&buf, MeasureMode::Area, &calibrated(0.1), true)
            .expect("measurement");

        let w = m.result.width_pixels.expect("width");
        let h = m.result.height_pixels.expect("height");
        assert!((w - 60.0).abs() <= 1.0);
        assert!((h - 60.0).abs() <= 1.0);
        assert!((m.result.area_pixels.expect("area") - w * h).abs() < 1e-9);

        let corners = m.overlay.corners.expect("corners");
        assert!((corners[0][0] - 70.0).abs() <= 1.0);
        assert!((corners[0][1] - 20.0).abs() <= 1.0);
        assert!((corners[2][0] - 130.0).abs() <= 1.0);
        assert!((corners[2][1] - 80.0).abs() <= 1.0);

        let diag = m.diagnostics.expect("diagnostics requested");
        assert_eq!(
            diag.processed,
            preprocess(&buf, &MeasureConfig::default().preprocess_config())
        );
        assert!(diag.edges.data().iter().any(|&v| v > 0));
    }

    #[test]
    fn length_prefers_the_longer_strong_axis() {
        let buf = specimen(200, 200, 40, 160, 80, 120);
        let m = Measurer::default()
            .measure(&buf, MeasureMode::Length, &calibrated(1.0), false)
            .expect("measurement");
        let px = m.result.width_pixels.expect("horizontal span wins");
        assert!((px - 120.0).abs() <= 1.0);
    }

    #[test]
    fn missing_calibration_blocks_conversion() {
        let buf = specimen(200, 100, 70, 130, 10, 90);
        let err = Measurer::default()
            .measure(&buf, MeasureMode::Width, &CalibrationStore::new(), false)
            .expect_err("uncalibrated");
        assert_eq!(err, MeasureError::CalibrationMissing);

        let det = Measurer::default()
            .detect(&buf, MeasureMode::Width, false)
            .expect("pixel detection still works");
        assert!(det.width_px.is_some());
    }

    #[test]
    fn uniform_image_has_no_edges() {
        let buf = gray_buffer(Image::new_fill(120, 80, 128u8)).expect("valid buffer");
        let err = Measurer::default()
            .measure(&buf, MeasureMode::Width, &calibrated(0.1), false)
            .expect_err("nothing to measure");
        assert_eq!(err, MeasureError::NoEdgesFound);
    }

    #[test]
    fn oversized_sigma_flattens_profiles_instead_of_failing() {
        let buf = specimen(200, 100, 70, 130, 0, 100);
        let cfg = MeasureConfig {
            sigma: 1e9,
            ..MeasureConfig::default()
        };
        let err = Measurer::new(cfg)
            .measure(&buf, MeasureMode::Width, &calibrated(0.1), false)
            .expect_err("flat profiles have no edges");
        assert_eq!(err, MeasureError::NoEdgesFound);
    }

    #[test]
    fn malformed_capture_is_invalid_input() {
        let store = calibrated(0.1);
        let m = Measurer::default();

        let err = m
            .measure_raw(10, 10, 3, vec![0; 299], MeasureMode::Width, &store)
            .expect_err("short buffer");
        assert!(matches!(err, MeasureError::InvalidInput(_)));

        let err = m
            .measure_raw(0, 10, 1, Vec::new(), MeasureMode::Width, &store)
            .expect_err("zero width");
        assert!(matches!(err, MeasureError::InvalidInput(_)));

        let err = m
            .measure_raw(4, 4, 2, vec![0; 32], MeasureMode::Width, &store)
            .expect_err("two channels");
        assert!(matches!(err, MeasureError::InvalidInput(_)));
    }

    #[test]
    fn rgba_capture_is_measured() {
        let (w, h) = (200usize, 100usize);
        let mut data = Vec::with_capacity(w * h * 4);
        for _y in 0..h {
            for x in 0..w {
                let v = if (70..130).contains(&x) { 30 } else { 230 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        let buf = PixelBuffer::new(w, h, Channels::Rgba, data).expect("valid buffer");
        let m = Measurer::default()
            .measure(&buf, MeasureMode::Width, &calibrated(0.2), false)
            .expect("measurement");
        assert!((m.result.width_pixels.expect("width") - 60.0).abs() <= 1.0);
    }

    #[test]
    fn zernike_route_measures_bounding_extents() {
        let buf = specimen(120, 100, 30, 90, 20, 80);
        let cfg = MeasureConfig {
            method: MeasureMethod::Zernike,
            ..MeasureConfig::default()
        };
        let m = Measurer::new(cfg)
            .measure(&buf, MeasureMode::Area, &calibrated(0.1), false)
            .expect("measurement");

        let w = m.result.width_pixels.expect("width");
        let h = m.result.height_pixels.expect("height");
        assert!((w - 60.0).abs() <= 3.0, "width {w}");
        assert!((h - 60.0).abs() <= 3.0, "height {h}");
        assert!(!m.overlay.edge_points.is_empty());
        assert!(m.overlay.corners.is_some());
        assert!(m.result.score > 10.0);
    }
}
