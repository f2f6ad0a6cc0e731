use crate::report::export_csv;
use crate::result::{MeasureMode, MeasurementResult};
use crate::stats::{MeasurementStatistics, calculate_measurement_statistics};

/// Append-only list of results owned by the caller.
#[derive(Debug, Clone, Default)]
pub struct MeasurementHistory {
    entries: Vec<MeasurementResult>,
}

impl MeasurementHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: MeasurementResult) {
        self.entries.push(result);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[MeasurementResult] {
        &self.entries
    }

    /// `(pixels, millimeters)` for every entry that recorded `mode`'s quantity.
    pub fn samples(&self, mode: MeasureMode) -> Vec<(f64, f64)> {
        self.entries.iter().filter_map(|r| r.sample(mode)).collect()
    }

    /// Statistics over the pixel values of `mode`'s quantity.
    pub fn statistics(&self, mode: MeasureMode) -> MeasurementStatistics {
        let px: Vec<f64> = self.samples(mode).into_iter().map(|(p, _)| p).collect();
        calculate_measurement_statistics(&px)
    }

    pub fn to_csv(&self, mode: MeasureMode) -> String {
        export_csv(mode.as_str(), &self.samples(mode))
    }
}
