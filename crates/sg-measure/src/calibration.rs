//! Pixel to physical-unit conversion.
//!
//! A [`CalibrationFactor`] is the length in millimetres covered by one pixel.
//! It outlives individual measurements and is held in a [`CalibrationStore`];
//! each measurement pass takes one [`CalibrationStore::snapshot`] up front and
//! uses it throughout.

use std::sync::RwLock;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::MeasureError;

pub const MM_PER_INCH: f64 = 25.4;
pub const MM2_PER_IN2: f64 = 645.16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CalibrationSource {
    Manual,
    CameraModel,
    ReferenceObject,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationFactor {
    mm_per_pixel: f64,
    source: CalibrationSource,
}

impl CalibrationFactor {
    fn checked(mm_per_pixel: f64, source: CalibrationSource) -> Result<Self, MeasureError> {
        if !mm_per_pixel.is_finite() || mm_per_pixel <= 0.0 {
            return Err(MeasureError::CalibrationMissing);
        }
        Ok(Self {
            mm_per_pixel,
            source,
        })
    }

    /// A stored constant entered by the operator.
    pub fn manual(mm_per_pixel: f64) -> Result<Self, MeasureError> {
        Self::checked(mm_per_pixel, CalibrationSource::Manual)
    }

    /// Factor from an object of known size spanning `reference_px` pixels.
    pub fn from_reference(reference_mm: f64, reference_px: f64) -> Result<Self, MeasureError> {
        if reference_px.is_nan() || reference_px <= 0.0 {
            return Err(MeasureError::CalibrationMissing);
        }
        Self::checked(reference_mm / reference_px, CalibrationSource::ReferenceObject)
    }

    pub fn mm_per_pixel(&self) -> f64 {
        self.mm_per_pixel
    }

    pub fn source(&self) -> CalibrationSource {
        self.source
    }

    pub fn to_mm(&self, pixels: f64) -> f64 {
        pixels_to_millimeters(pixels, self.mm_per_pixel)
    }

    pub fn area_to_mm2(&self, pixels2: f64) -> f64 {
        pixels2 * self.mm_per_pixel * self.mm_per_pixel
    }
}

/// Pinhole camera with fixed intrinsics at a fixed working distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraModel {
    pub sensor_width_mm: f64,
    pub focal_length_mm: f64,
    pub distance_mm: f64,
    pub image_width_px: u32,
}

impl Default for CameraModel {
    fn default() -> Self {
        Self {
            sensor_width_mm: 4.8,
            focal_length_mm: 4.0,
            distance_mm: 0.0,
            image_width_px: 1280,
        }
    }
}

impl CameraModel {
    /// `(sensor_width * distance) / (focal_length * image_width)`.
    pub fn derive(&self) -> Result<CalibrationFactor, MeasureError> {
        let valid = self.sensor_width_mm > 0.0
            && self.focal_length_mm > 0.0
            && self.distance_mm > 0.0
            && self.image_width_px > 0;
        if !valid {
            debug!("camera model rejected: {self:?}");
            return Err(MeasureError::CalibrationMissing);
        }
        let mm_per_pixel = (self.sensor_width_mm * self.distance_mm)
            / (self.focal_length_mm * f64::from(self.image_width_px));
        CalibrationFactor::checked(mm_per_pixel, CalibrationSource::CameraModel)
    }
}

pub fn pixels_to_millimeters(pixels: f64, mm_per_pixel: f64) -> f64 {
    pixels * mm_per_pixel
}

pub fn mm_to_inches(mm: f64) -> f64 {
    mm / MM_PER_INCH
}

pub fn mm2_to_in2(mm2: f64) -> f64 {
    mm2 / MM2_PER_IN2
}

/// Process-wide calibration slot, changed only by explicit calibration.
#[derive(Debug, Default)]
pub struct CalibrationStore {
    inner: RwLock<Option<CalibrationFactor>>,
}

impl CalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_factor(factor: CalibrationFactor) -> Self {
        Self {
            inner: RwLock::new(Some(factor)),
        }
    }

    pub fn set(&self, factor: CalibrationFactor) {
        let mut slot = self.inner.write().unwrap_or_else(|poisoned| {
            warn!("calibration lock poisoned; overwriting");
            poisoned.into_inner()
        });
        debug!(
            "calibration set: {:.6} mm/px ({:?})",
            factor.mm_per_pixel, factor.source
        );
        *slot = Some(factor);
    }

    pub fn clear(&self) {
        let mut slot = self.inner.write().unwrap_or_else(|poisoned| {
            warn!("calibration lock poisoned; clearing");
            poisoned.into_inner()
        });
        *slot = None;
    }

    pub fn get(&self) -> Option<CalibrationFactor> {
        *self.inner.read().unwrap_or_else(|poisoned| {
            warn!("calibration lock poisoned; reading last value");
            poisoned.into_inner()
        })
    }

    /// The factor to use for one whole measurement pass.
    pub fn snapshot(&self) -> Result<CalibrationFactor, MeasureError> {
        self.get().ok_or(MeasureError::CalibrationMissing)
    }
}
