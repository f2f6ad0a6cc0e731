//! Zernike-moment sub-pixel refinement on 7x7 neighbourhoods.
//!
//! Each mask holds the integral of its Zernike polynomial over the part of
//! the unit disk covered by one pixel of the 7x7 grid. Rows grow downward,
//! so `Z11I` is negative on the top row.
//!
//! Two distance estimates are blended: `l1` from `Z20`/`Z40` and `l2` from
//! the raw `Z11` components. Their disagreement is kept as `l_spread`.
//! Contrast uses the edge-aligned `|Z11|`.

use core::f32::consts::PI;

use log::debug;
use sg_core::{ImageView, Point2f, Vec2f};

use crate::nms::EdgeMap;

pub const PATCH_SIZE: usize = 7;
const HALF: usize = PATCH_SIZE / 2;

/// Below this, a moment used as a divisor is treated as zero.
const MOMENT_EPS: f32 = 1e-3;

type Mask = [[f32; PATCH_SIZE]; PATCH_SIZE];

pub const Z00_MASK: Mask = [
    [0.0, 0.0287, 0.0686, 0.0807, 0.0686, 0.0287, 0.0],
    [0.0287, 0.0815, 0.0816, 0.0816, 0.0816, 0.0815, 0.0287],
    [0.0686, 0.0816, 0.0816, 0.0816, 0.0816, 0.0816, 0.0686],
    [0.0807, 0.0816, 0.0816, 0.0816, 0.0816, 0.0816, 0.0807],
    [0.0686, 0.0816, 0.0816, 0.0816, 0.0816, 0.0816, 0.0686],
    [0.0287, 0.0815, 0.0816, 0.0816, 0.0816, 0.0815, 0.0287],
    [0.0, 0.0287, 0.0686, 0.0807, 0.0686, 0.0287, 0.0],
];

pub const Z11R_MASK: Mask = [
    [0.0, -0.015, -0.019, 0.0, 0.019, 0.015, 0.0],
    [-0.0224, -0.0466, -0.0233, 0.0, 0.0233, 0.0466, 0.0224],
    [-0.0573, -0.0466, -0.0233, 0.0, 0.0233, 0.0466, 0.0573],
    [-0.069, -0.0466, -0.0233, 0.0, 0.0233, 0.0466, 0.069],
    [-0.0573, -0.0466, -0.0233, 0.0, 0.0233, 0.0466, 0.0573],
    [-0.0224, -0.0466, -0.0233, 0.0, 0.0233, 0.0466, 0.0224],
    [0.0, -0.015, -0.019, 0.0, 0.019, 0.015, 0.0],
];

pub const Z11I_MASK: Mask = [
    [0.0, -0.0224, -0.0573, -0.069, -0.0573, -0.0224, 0.0],
    [-0.015, -0.0466, -0.0466, -0.0466, -0.0466, -0.0466, -0.015],
    [-0.019, -0.0233, -0.0233, -0.0233, -0.0233, -0.0233, -0.019],
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [0.019, 0.0233, 0.0233, 0.0233, 0.0233, 0.0233, 0.019],
    [0.015, 0.0466, 0.0466, 0.0466, 0.0466, 0.0466, 0.015],
    [0.0, 0.0224, 0.0573, 0.069, 0.0573, 0.0224, 0.0],
];

pub const Z20_MASK: Mask = [
    [0.0, 0.0225, 0.0394, 0.0396, 0.0394, 0.0225, 0.0],
    [0.0225, 0.0271, -0.0128, -0.0261, -0.0128, 0.0271, 0.0225],
    [0.0394, -0.0128, -0.0528, -0.0661, -0.0528, -0.0128, 0.0394],
    [0.0396, -0.0261, -0.0661, -0.0794, -0.0661, -0.0261, 0.0396],
    [0.0394, -0.0128, -0.0528, -0.0661, -0.0528, -0.0128, 0.0394],
    [0.0225, 0.0271, -0.0128, -0.0261, -0.0128, 0.0271, 0.0225],
    [0.0, 0.0225, 0.0394, 0.0396, 0.0394, 0.0225, 0.0],
];

pub const Z40_MASK: Mask = [
    [0.0, 0.0130, 0.0056, -0.0018, 0.0056, 0.0130, 0.0],
    [0.0130, -0.0186, -0.0323, -0.0239, -0.0323, -0.0186, 0.0130],
    [0.0056, -0.0323, 0.0125, 0.0406, 0.0125, -0.0323, 0.0056],
    [-0.0018, -0.0239, 0.0406, 0.0751, 0.0406, -0.0239, -0.0018],
    [0.0056, -0.0323, 0.0125, 0.0406, 0.0125, -0.0323, 0.0056],
    [0.0130, -0.0186, -0.0323, -0.0239, -0.0323, -0.0186, 0.0130],
    [0.0, 0.0130, 0.0056, -0.0018, 0.0056, 0.0130, 0.0],
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZernikeMoments {
    pub z00: f32,
    pub z11r: f32,
    pub z11i: f32,
    pub z20: f32,
    pub z40: f32,
}

impl ZernikeMoments {
    /// Projects a 7x7 patch onto the five masks.
    ///
    /// Returns `None` if `patch` is not exactly 7x7.
    pub fn from_patch(patch: &ImageView<'_, u8>) -> Option<Self> {
        if patch.width() != PATCH_SIZE || patch.height() != PATCH_SIZE {
            return None;
        }

        let mut m = Self {
            z00: 0.0,
            z11r: 0.0,
            z11i: 0.0,
            z20: 0.0,
            z40: 0.0,
        };
        for r in 0..PATCH_SIZE {
            let row = patch.row(r);
            for c in 0..PATCH_SIZE {
                let v = row[c] as f32;
                m.z00 += v * Z00_MASK[r][c];
                m.z11r += v * Z11R_MASK[r][c];
                m.z11i += v * Z11I_MASK[r][c];
                m.z20 += v * Z20_MASK[r][c];
                m.z40 += v * Z40_MASK[r][c];
            }
        }
        Some(m)
    }

    pub fn orientation(&self) -> f32 {
        self.z11i.atan2(self.z11r)
    }
}

/// Edge parameters recovered from one neighbourhood.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeModel {
    /// Edge normal direction in radians.
    pub phi: f32,
    /// Blended distance of the edge from the patch centre.
    pub l: f32,
    /// |l1 - l2|, large when the two distance estimates disagree.
    pub l_spread: f32,
    /// Step contrast.
    pub k: f32,
    /// Background level.
    pub h: f32,
}

impl EdgeModel {
    /// Solves for the edge parameters. `None` means degenerate geometry.
    ///
    /// The two distance estimates come straight from the measured moments,
    /// so an edge whose normal lies along x (vanishing `Z11I`) is degenerate.
    pub fn from_moments(m: &ZernikeMoments) -> Option<Self> {
        if m.z11i.abs() < MOMENT_EPS || m.z20.abs() < MOMENT_EPS {
            return None;
        }

        let l1_sq = (5.0 * m.z40 + 3.0 * m.z20) / (8.0 * m.z20);
        let l2_sq = (5.0 * m.z11r + m.z11i) / (6.0 * m.z11i);
        if !(l1_sq >= 0.0 && l2_sq >= 0.0) {
            return None;
        }

        let l1 = l1_sq.sqrt();
        let l2 = l2_sq.sqrt();
        let l = 0.5 * (l1 + l2);
        let l_sq = l * l;
        if !l.is_finite() || l_sq >= 1.0 {
            return None;
        }

        // Contrast is taken in the edge-aligned frame, where Z11 rotated onto
        // +imaginary has magnitude |Z11|.
        let z11_aligned = m.z11r.hypot(m.z11i);
        let root = (1.0 - l_sq).sqrt();
        let k = 3.0 * z11_aligned / (2.0 * root * root * root);
        let h = (m.z00 - k * PI / 2.0 + k * l.asin() + k * l * root) / PI;
        if !k.is_finite() || !h.is_finite() {
            return None;
        }

        Some(Self {
            phi: m.orientation(),
            l,
            l_spread: (l1 - l2).abs(),
            k,
            h,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefinedEdgePoint {
    pub x: usize,
    pub y: usize,
    pub sub: Point2f,
    pub phi: f32,
    pub k: f32,
    pub h: f32,
    pub l: f32,
    pub l_spread: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZernikeConfig {
    /// Minimum step contrast for a point to count as a strong edge.
    pub strong_contrast: f32,
}

impl Default for ZernikeConfig {
    fn default() -> Self {
        Self {
            strong_contrast: 10.0,
        }
    }
}

/// Outcome of refining every pixel of an edge map.
#[derive(Debug, Clone, Default)]
pub struct ZernikeRefinement {
    /// Strong edge points in row-major order of their source pixel.
    pub points: Vec<RefinedEdgePoint>,
    pub weak: usize,
    pub degenerate: usize,
    pub near_border: usize,
}

impl ZernikeRefinement {
    pub fn mean_l_spread(&self) -> f32 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points.iter().map(|p| p.l_spread).sum::<f32>() / self.points.len() as f32
    }
}

#[derive(Debug, Clone, Default)]
pub struct ZernikeRefiner {
    cfg: ZernikeConfig,
}

impl ZernikeRefiner {
    pub fn new(cfg: ZernikeConfig) -> Self {
        Self { cfg }
    }

    /// Refines one pixel. `None` if it is within 3 px of the border or the
    /// neighbourhood does not describe a usable step edge.
    pub fn refine_point(&self, gray: &ImageView<'_, u8>, x: usize, y: usize) -> Option<RefinedEdgePoint> {
        if x < HALF || y < HALF || x + HALF >= gray.width() || y + HALF >= gray.height() {
            return None;
        }
        let patch = gray.subview(x - HALF, y - HALF, PATCH_SIZE, PATCH_SIZE).ok()?;
        let moments = ZernikeMoments::from_patch(&patch)?;
        let model = EdgeModel::from_moments(&moments)?;

        let centre = Point2f {
            x: x as f32,
            y: y as f32,
        };
        Some(RefinedEdgePoint {
            x,
            y,
            sub: centre + Vec2f::from_angle(model.phi) * model.l,
            phi: model.phi,
            k: model.k,
            h: model.h,
            l: model.l,
            l_spread: model.l_spread,
        })
    }

    /// Refines every edge pixel; degenerate points are dropped and counted.
    pub fn refine_edges(&self, gray: &ImageView<'_, u8>, edges: &EdgeMap) -> ZernikeRefinement {
        let mut out = ZernikeRefinement::default();
        let w = gray.width();
        let h = gray.height();

        for px in edges.iter() {
            if px.x < HALF || px.y < HALF || px.x + HALF >= w || px.y + HALF >= h {
                out.near_border += 1;
                continue;
            }
            match self.refine_point(gray, px.x, px.y) {
                Some(p) if p.k > self.cfg.strong_contrast => out.points.push(p),
                Some(_) => out.weak += 1,
                None => out.degenerate += 1,
            }
        }

        debug!(
            "zernike: {} strong, {} weak, {} degenerate, {} near border, mean l spread {:.3}",
            out.points.len(),
            out.weak,
            out.degenerate,
            out.near_border,
            out.mean_l_spread()
        );
        out
    }
}
