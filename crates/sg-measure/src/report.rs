//! Text and CSV renderings of measurement series.

use core::fmt::Write as _;

use crate::stats::MeasurementStatistics;

/// CSV with header `Measurement (<mode>),Pixels,Millimeters` and one
/// 1-based row per `(pixels, millimeters)` sample.
pub fn export_csv(mode: &str, samples: &[(f64, f64)]) -> String {
    let mut out = String::with_capacity(40 + samples.len() * 24);
    let _ = writeln!(out, "Measurement ({mode}),Pixels,Millimeters");
    for (i, (px, mm)) in samples.iter().enumerate() {
        let _ = writeln!(out, "{},{px:.3},{mm:.3}", i + 1);
    }
    out
}

/// Multi-line summary of a statistics block in `unit`.
pub fn statistics_report(title: &str, unit: &str, s: &MeasurementStatistics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "  count:   {}", s.count);
    let _ = writeln!(out, "  min:     {:.3} {unit}", s.min);
    let _ = writeln!(out, "  max:     {:.3} {unit}", s.max);
    let _ = writeln!(out, "  mean:    {:.3} {unit}", s.mean);
    let _ = writeln!(out, "  median:  {:.3} {unit}", s.median);
    let _ = writeln!(out, "  std dev: {:.3} {unit}", s.std_dev);
    out
}
