use serde::{Deserialize, Serialize};

/// Descriptive statistics over a list of measurements.
///
/// Always derived from its source list; an empty list gives all zeros.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub count: usize,
}

pub fn calculate_measurement_statistics(values: &[f64]) -> MeasurementStatistics {
    let n = values.len();
    if n == 0 {
        return MeasurementStatistics::default();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mean = sorted.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    };
    let variance = sorted.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;

    MeasurementStatistics {
        min: sorted[0],
        max: sorted[n - 1],
        mean,
        median,
        std_dev: variance.sqrt(),
        count: n,
    }
}
