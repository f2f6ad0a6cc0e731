//! Edge-pair search along an ensemble of parallel scanlines.
//!
//! Every sampled line is smoothed, differentiated and searched for gradient
//! extrema above an adaptive threshold. Adjacent candidates form pairs; a pair
//! is scored only after it passes the separation bounds, so an implausibly
//! wide span can never win on score. The best pair over all lines is the
//! measured boundary.

use log::debug;
use sg_core::ImageView;

use crate::conv1d::central_difference;
use crate::preprocess::gaussian_smooth;
use crate::subpix::refine_gradient_peak;

/// Which set of lines to sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanAxis {
    /// Horizontal lines at fractions of the image height; measures along x.
    Rows,
    /// Vertical lines at fractions of the image width; measures along y.
    Cols,
}

impl ScanAxis {
    /// Number of lines available across the axis.
    pub fn cross_len(self, width: usize, height: usize) -> usize {
        match self {
            Self::Rows => height,
            Self::Cols => width,
        }
    }

    /// Length of one sampled line.
    pub fn line_len(self, width: usize, height: usize) -> usize {
        match self {
            Self::Rows => width,
            Self::Cols => height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgePolarity {
    /// Intensity increases along the scan direction.
    Rising,
    Falling,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCandidate {
    /// Sub-pixel position along the line.
    pub position: f32,
    pub index: usize,
    /// Absolute gradient at `index`.
    pub magnitude: f32,
    pub polarity: EdgePolarity,
    /// Magnitude at least `major_edge_multiplier` times the line threshold.
    pub is_major: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgePair {
    pub edge1: EdgeCandidate,
    pub edge2: EdgeCandidate,
    pub separation: f32,
    /// Index into [`ScanlineConfig::positions`].
    pub scan_index: usize,
    /// Row or column the pair was found on.
    pub line: usize,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanlineConfig {
    /// Line positions as fractions of the cross dimension.
    pub positions: Vec<f32>,
    pub sigma: f32,
    pub min_threshold: f32,
    /// Threshold = max(min_threshold, threshold_scale * mean |gradient|).
    pub threshold_scale: f32,
    pub min_separation_frac: f32,
    pub max_separation_frac: f32,
    /// Separation at which the width score saturates, as a fraction of the line.
    pub reference_width_frac: f32,
    pub major_edge_multiplier: f32,
}

impl Default for ScanlineConfig {
    fn default() -> Self {
        Self {
            positions: vec![0.3, 0.4, 0.5, 0.6, 0.7],
            sigma: 1.5,
            min_threshold: 5.0,
            threshold_scale: 2.0,
            min_separation_frac: 0.05,
            max_separation_frac: 0.9,
            reference_width_frac: 0.2,
            major_edge_multiplier: 2.5,
        }
    }
}

/// Everything found on one sampled line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineScan {
    pub scan_index: usize,
    pub line: usize,
    pub threshold: f32,
    pub candidates: Vec<EdgeCandidate>,
    pub best: Option<EdgePair>,
}

/// Gradient extrema of a smoothed profile, sorted by position.
///
/// A candidate is a local extremum of the gradient beyond the threshold, so a
/// single clean step yields one candidate where a sign-crossing rule yields none.
///
/// Returns the candidates together with the threshold that was applied.
pub fn find_candidates(smoothed: &[f32], cfg: &ScanlineConfig) -> (Vec<EdgeCandidate>, f32) {
    let n = smoothed.len();
    let mut grad = vec![0.0f32; n];
    central_difference(smoothed, &mut grad);

    let mean_abs = if n == 0 {
        0.0
    } else {
        grad.iter().map(|g| g.abs()).sum::<f32>() / n as f32
    };
    let threshold = cfg.min_threshold.max(cfg.threshold_scale * mean_abs);
    let major = cfg.major_edge_multiplier * threshold;

    let mut out = Vec::new();
    if n < 3 {
        return (out, threshold);
    }

    for i in 1..(n - 1) {
        let a = grad[i - 1];
        let b = grad[i];
        let c = grad[i + 1];

        let polarity = if b >= a && b > c && b > threshold {
            EdgePolarity::Rising
        } else if b <= a && b < c && -b > threshold {
            EdgePolarity::Falling
        } else {
            continue;
        };

        out.push(EdgeCandidate {
            position: refine_gradient_peak(&grad, i, polarity),
            index: i,
            magnitude: b.abs(),
            polarity,
            is_major: b.abs() >= major,
        });
    }

    out.sort_by(|l, r| l.position.total_cmp(&r.position));
    (out, threshold)
}

/// Mean of `255 - v` over the samples strictly between two positions.
fn darkness_between(profile: &[f32], p1: f32, p2: f32) -> f32 {
    let start = (p1.floor() as isize + 1).max(0) as usize;
    let end = (p2.ceil() as isize).min(profile.len() as isize);
    if end <= start as isize {
        return 0.0;
    }
    let span = &profile[start..end as usize];
    span.iter().map(|v| 255.0 - v).sum::<f32>() / span.len() as f32
}

/// Best-scoring adjacent pair among position-sorted `candidates`.
///
/// `profile` holds the unsmoothed intensities the darkness term is read from.
pub fn best_adjacent_pair(
    candidates: &[EdgeCandidate],
    profile: &[f32],
    cfg: &ScanlineConfig,
    scan_index: usize,
    line: usize,
) -> Option<EdgePair> {
    let len = profile.len() as f32;
    let min_sep = cfg.min_separation_frac * len;
    let max_sep = cfg.max_separation_frac * len;
    let ref_width = cfg.reference_width_frac * len;

    let mut best: Option<EdgePair> = None;
    for w in candidates.windows(2) {
        let (e1, e2) = (w[0], w[1]);
        let separation = e2.position - e1.position;
        if separation < min_sep || separation > max_sep {
            debug!(
                "line {line}: pair {:.2}..{:.2} rejected, separation {separation:.2}",
                e1.position, e2.position
            );
            continue;
        }

        let darkness = darkness_between(profile, e1.position, e2.position);
        let width_score = if ref_width > 0.0 {
            (separation / ref_width).min(1.0)
        } else {
            1.0
        };
        let score = darkness * width_score * 0.5 * (e1.magnitude + e2.magnitude);

        let cand = EdgePair {
            edge1: e1,
            edge2: e2,
            separation,
            scan_index,
            line,
            score,
        };
        if best.as_ref().is_none_or(|b| cand.score > b.score) {
            best = Some(cand);
        }
    }
    best
}

#[derive(Debug, Clone, Default)]
pub struct ScanlineEdgePairFinder {
    cfg: ScanlineConfig,
}

impl ScanlineEdgePairFinder {
    pub fn new(cfg: ScanlineConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &ScanlineConfig {
        &self.cfg
    }

    /// Pixel coordinates of the sampled lines, in ensemble order.
    pub fn line_coordinates(&self, width: usize, height: usize, axis: ScanAxis) -> Vec<usize> {
        let cross = axis.cross_len(width, height);
        if cross == 0 {
            return Vec::new();
        }
        self.cfg
            .positions
            .iter()
            .map(|&f| ((cross as f32 * f.clamp(0.0, 1.0)) as usize).min(cross - 1))
            .collect()
    }

    pub fn scan_profile(&self, profile: &[f32], scan_index: usize, line: usize) -> LineScan {
        let smoothed = gaussian_smooth(profile, self.cfg.sigma);
        let (candidates, threshold) = find_candidates(&smoothed, &self.cfg);
        let best = if candidates.len() >= 2 {
            best_adjacent_pair(&candidates, profile, &self.cfg, scan_index, line)
        } else {
            None
        };

        debug!(
            "scan line {scan_index} at {line}: threshold {threshold:.2}, {} candidates, best {:?}",
            candidates.len(),
            best.map(|p| (p.edge1.position, p.edge2.position))
        );

        LineScan {
            scan_index,
            line,
            threshold,
            candidates,
            best,
        }
    }

    /// Scans every configured line of `img`.
    pub fn scan_all(&self, img: &ImageView<'_, u8>, axis: ScanAxis) -> Vec<LineScan> {
        let mut raw: Vec<u8> = Vec::new();
        let mut profile: Vec<f32> = Vec::new();

        self.line_coordinates(img.width(), img.height(), axis)
            .into_iter()
            .enumerate()
            .map(|(scan_index, line)| {
                match axis {
                    ScanAxis::Rows => {
                        raw.clear();
                        raw.extend_from_slice(img.row(line));
                    }
                    ScanAxis::Cols => img.column_into(line, &mut raw),
                }
                profile.clear();
                profile.extend(raw.iter().map(|&v| v as f32));
                self.scan_profile(&profile, scan_index, line)
            })
            .collect()
    }

    /// Globally best pair, or `None` when no line produced an acceptable one.
    pub fn find(&self, img: &ImageView<'_, u8>, axis: ScanAxis) -> Option<EdgePair> {
        best_of(&self.scan_all(img, axis))
    }
}

/// Highest-scoring pair across line results; earlier lines win ties.
pub fn best_of(lines: &[LineScan]) -> Option<EdgePair> {
    let mut best: Option<EdgePair> = None;
    for p in lines.iter().filter_map(|l| l.best) {
        if best.as_ref().is_none_or(|b| p.score > b.score) {
            best = Some(p);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use sg_core::Image;

    use crate::scanline::{
        EdgeCandidate, EdgePolarity, ScanAxis, ScanlineConfig, ScanlineEdgePairFinder,
        best_adjacent_pair, find_candidates,
    };

    fn dark_rectangle(w: usize, h: usize, x0: usize, x1: usize, y0: usize, y1: usize) -> Image<u8> {
        let mut data = vec![220u8; w * h];
        for y in y0..y1 {
            for x in x0..x1 {
                data[y * w + x] = 40;
            }
        }
        Image::from_vec(w, h, data).expect("valid image")
    }

    fn candidate(position: f32, magnitude: f32, polarity: EdgePolarity) -> EdgeCandidate {
        EdgeCandidate {
            position,
            index: position as usize,
            magnitude,
            polarity,
            is_major: false,
        }
    }

    #[test]
    fn clean_step_gives_one_extremum_candidate() {
        let mut profile = vec![200.0f32; 10];
        profile.push(110.0);
        profile.extend([20.0f32; 10]);

        let (cands, threshold) = find_candidates(&profile, &ScanlineConfig::default());
        assert!((threshold - 2.0 * 180.0 / 21.0).abs() < 1e-3);
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].index, 10);
        assert_eq!(cands[0].polarity, EdgePolarity::Falling);
        assert!((cands[0].position - 10.0).abs() < 1e-6);
        assert!(cands[0].is_major);
    }

    #[test]
    fn every_line_recovers_rectangle_width() {
        let _ = env_logger::builder().is_test(true).try_init();

        let img = dark_rectangle(200, 100, 70, 130, 10, 90);
        let finder = ScanlineEdgePairFinder::default();
        let lines = finder.scan_all(&img.as_view(), ScanAxis::Rows);

        assert_eq!(lines.len(), 5);
        assert_eq!(
            lines.iter().map(|l| l.line).collect::<Vec<_>>(),
            vec![30, 40, 50, 60, 70]
        );
        for l in &lines {
            let pair = l.best.expect("pair on every line");
            assert!((pair.separation - 60.0).abs() <= 1.0, "line {}: {}", l.line, pair.separation);
            assert_eq!(pair.edge1.polarity, EdgePolarity::Falling);
            assert_eq!(pair.edge2.polarity, EdgePolarity::Rising);
            assert!(pair.edge1.is_major && pair.edge2.is_major);
        }

        let best = finder.find(&img.as_view(), ScanAxis::Rows).expect("measurement");
        assert!((best.separation - 60.0).abs() <= 1.0);
        assert!(best.score > 0.0);
    }

    #[test]
    fn columns_measure_height() {
        let img = dark_rectangle(120, 160, 20, 100, 50, 110);
        let finder = ScanlineEdgePairFinder::default();
        let best = finder.find(&img.as_view(), ScanAxis::Cols).expect("measurement");
        assert!((best.separation - 60.0).abs() <= 1.0);
        assert!((20..100).contains(&best.line));
    }

    #[test]
    fn over_wide_pair_is_rejected_before_scoring() {
        let profile = vec![0.0f32; 200];
        let cands = [
            candidate(2.0, 1000.0, EdgePolarity::Falling),
            candidate(184.0, 1000.0, EdgePolarity::Rising),
            candidate(196.0, 1.0, EdgePolarity::Falling),
        ];
        let cfg = ScanlineConfig::default();

        let pair = best_adjacent_pair(&cands, &profile, &cfg, 0, 10).expect("narrow pair");
        assert_eq!(pair.edge1.position, 184.0);
        assert_eq!(pair.edge2.position, 196.0);
        assert!((pair.separation - 12.0).abs() < 1e-6);
    }

    #[test]
    fn too_narrow_pairs_give_no_result() {
        let profile = vec![0.0f32; 200];
        let cands = [
            candidate(50.0, 100.0, EdgePolarity::Falling),
            candidate(55.0, 100.0, EdgePolarity::Rising),
        ];
        assert!(best_adjacent_pair(&cands, &profile, &ScanlineConfig::default(), 0, 0).is_none());
    }

    #[test]
    fn uniform_image_finds_nothing() {
        let img = Image::from_vec(64, 48, vec![128u8; 64 * 48]).expect("valid image");
        let finder = ScanlineEdgePairFinder::default();
        let lines = finder.scan_all(&img.as_view(), ScanAxis::Rows);
        assert!(lines.iter().all(|l| l.candidates.is_empty()));
        assert!(finder.find(&img.as_view(), ScanAxis::Rows).is_none());
    }

    #[test]
    fn weak_ripples_stay_below_threshold() {
        let smoothed: Vec<f32> = (0..100).map(|i| 128.0 + if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let (cands, thr) = find_candidates(&smoothed, &ScanlineConfig::default());
        assert!(thr >= 5.0);
        assert!(cands.is_empty());
    }

    #[test]
    fn darker_interior_scores_higher() {
        let mut dark = vec![255.0f32; 100];
        let mut grey = vec![255.0f32; 100];
        for i in 31..60 {
            dark[i] = 10.0;
            grey[i] = 150.0;
        }
        let cands = [
            candidate(30.5, 50.0, EdgePolarity::Falling),
            candidate(59.5, 50.0, EdgePolarity::Rising),
        ];
        let cfg = ScanlineConfig::default();
        let d = best_adjacent_pair(&cands, &dark, &cfg, 0, 0).expect("pair");
        let g = best_adjacent_pair(&cands, &grey, &cfg, 0, 0).expect("pair");
        assert!(d.score > g.score);
    }
}
