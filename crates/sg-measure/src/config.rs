//! Tuning options accepted from callers, with the JSON key names they use.

use serde::{Deserialize, Serialize};
use sg_edge::{PreprocessConfig, PreprocessStrategy, ScanlineConfig, SuppressConfig, ZernikeConfig};

/// Sub-pixel route used to locate the specimen boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureMethod {
    /// Edge pairs along sampled lines, refined in 1-D.
    #[default]
    Scanline,
    /// Extents of Zernike-refined edge points.
    Zernike,
}

/// Explicit preprocessing choice; overrides `useAdaptiveThreshold` when set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreprocessMode {
    None,
    Fixed,
    Adaptive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeasureConfig {
    /// Binarization level for the fixed-threshold strategy.
    pub threshold: u8,
    pub sigma: f32,
    pub contrast_factor: f32,
    pub use_adaptive_threshold: bool,
    pub window_size: usize,
    pub adaptive_c: f32,
    pub major_edge_multiplier: f32,
    pub scan_positions: Vec<f32>,
    pub min_separation_frac: f32,
    pub max_separation_frac: f32,
    pub reference_width_frac: f32,
    pub noise_floor: f32,
    pub zernike_contrast_threshold: f32,
    pub method: MeasureMethod,
    pub preprocess: Option<PreprocessMode>,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        let scan = ScanlineConfig::default();
        Self {
            threshold: 240,
            sigma: scan.sigma,
            contrast_factor: 1.5,
            use_adaptive_threshold: false,
            window_size: 15,
            adaptive_c: 5.0,
            major_edge_multiplier: scan.major_edge_multiplier,
            scan_positions: scan.positions,
            min_separation_frac: scan.min_separation_frac,
            max_separation_frac: scan.max_separation_frac,
            reference_width_frac: scan.reference_width_frac,
            noise_floor: 5.0,
            zernike_contrast_threshold: 10.0,
            method: MeasureMethod::Scanline,
            preprocess: None,
        }
    }
}

impl MeasureConfig {
    pub fn preprocess_mode(&self) -> PreprocessMode {
        match self.preprocess {
            Some(mode) => mode,
            None if self.use_adaptive_threshold => PreprocessMode::Adaptive,
            None => PreprocessMode::None,
        }
    }

    pub fn preprocess_config(&self) -> PreprocessConfig {
        let strategy = match self.preprocess_mode() {
            PreprocessMode::None => PreprocessStrategy::None,
            PreprocessMode::Fixed => PreprocessStrategy::FixedThreshold {
                threshold: self.threshold,
            },
            PreprocessMode::Adaptive => PreprocessStrategy::AdaptiveThreshold {
                window_size: self.window_size,
                c: self.adaptive_c,
            },
        };
        PreprocessConfig {
            contrast_factor: self.contrast_factor,
            strategy,
        }
    }

    pub fn scanline_config(&self) -> ScanlineConfig {
        ScanlineConfig {
            positions: self.scan_positions.clone(),
            sigma: self.sigma,
            min_separation_frac: self.min_separation_frac,
            max_separation_frac: self.max_separation_frac,
            reference_width_frac: self.reference_width_frac,
            major_edge_multiplier: self.major_edge_multiplier,
            ..ScanlineConfig::default()
        }
    }

    pub fn suppress_config(&self) -> SuppressConfig {
        SuppressConfig {
            noise_floor: self.noise_floor,
            ..SuppressConfig::default()
        }
    }

    pub fn zernike_config(&self) -> ZernikeConfig {
        ZernikeConfig {
            strong_contrast: self.zernike_contrast_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use sg_edge::PreprocessStrategy;

    use crate::config::{MeasureConfig, MeasureMethod, PreprocessMode};

    #[test]
    fn defaults_match_reference_tuning() {
        let cfg = MeasureConfig::default();
        assert_eq!(cfg.threshold, 240);
        assert_eq!(cfg.contrast_factor, 1.5);
        assert!(!cfg.use_adaptive_threshold);
        assert_eq!(cfg.window_size, 15);
        assert_eq!(cfg.adaptive_c, 5.0);
        assert_eq!(cfg.major_edge_multiplier, 2.5);
        assert_eq!(cfg.scan_positions, vec![0.3, 0.4, 0.5, 0.6, 0.7]);
        assert_eq!(cfg.preprocess_config().strategy, PreprocessStrategy::None);
    }

    #[test]
    fn camel_case_keys_load_with_defaults_for_the_rest() {
        let json = r#"{
            "threshold": 200,
            "sigma": 2.0,
            "contrastFactor": 1.2,
            "useAdaptiveThreshold": true,
            "windowSize": 25,
            "adaptiveC": 10,
            "majorEdgeMultiplier": 3.0,
            "method": "zernike"
        }"#;
        let cfg: MeasureConfig = serde_json::from_str(json).expect("valid config");

        assert_eq!(cfg.threshold, 200);
        assert_eq!(cfg.sigma, 2.0);
        assert_eq!(cfg.method, MeasureMethod::Zernike);
        assert_eq!(cfg.scan_positions.len(), 5);
        assert_eq!(cfg.noise_floor, 5.0);
        assert_eq!(
            cfg.preprocess_config().strategy,
            PreprocessStrategy::AdaptiveThreshold {
                window_size: 25,
                c: 10.0
            }
        );
        assert_eq!(cfg.scanline_config().major_edge_multiplier, 3.0);
    }

    #[test]
    fn explicit_preprocess_mode_wins() {
        let cfg: MeasureConfig =
            serde_json::from_str(r#"{"useAdaptiveThreshold": true, "preprocess": "fixed"}"#)
                .expect("valid config");
        assert_eq!(cfg.preprocess_mode(), PreprocessMode::Fixed);
        assert_eq!(
            cfg.preprocess_config().strategy,
            PreprocessStrategy::FixedThreshold { threshold: 240 }
        );
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(MeasureConfig::default()).expect("serializable");
        assert!(json.get("contrastFactor").is_some());
        assert!(json.get("adaptiveC").is_some());
        assert!(json.get("scanPositions").is_some());
        assert_eq!(json["method"], "scanline");
    }
}
