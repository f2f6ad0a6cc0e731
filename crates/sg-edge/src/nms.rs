//! Non-maximum suppression with a structural-consistency pass.
//!
//! Pass 1 keeps a pixel when its magnitude is at least both neighbours across
//! the edge (the gradient direction bucketed into 0/45/90/135 degree classes)
//! and at least the noise floor. Pass 2 multiplies a survivor's magnitude by
//! `coherence_boost` when enough other survivors in its neighbourhood share
//! its orientation modulo 180 degrees; isolated texture keeps its raw value.
//!
//! The outer pixel ring never becomes an edge.

use core::f32::consts::PI;

use log::debug;
use sg_core::Image;

use crate::gradient::GradientField;

#[derive(Debug, Clone, PartialEq)]
pub struct SuppressConfig {
    pub noise_floor: f32,
    /// Neighbourhood half-size for the consistency pass (2 -> 5x5).
    pub neighborhood_radius: usize,
    pub angle_tolerance_deg: f32,
    pub min_coherent_neighbors: usize,
    pub coherence_boost: f32,
}

impl Default for SuppressConfig {
    fn default() -> Self {
        Self {
            noise_floor: 5.0,
            neighborhood_radius: 2,
            angle_tolerance_deg: 30.0,
            min_coherent_neighbors: 3,
            coherence_boost: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgePixel {
    pub x: usize,
    pub y: usize,
    pub strength: f32,
    pub direction: f32,
    pub coherent: bool,
}

/// Thinned edge pixels of one pass; zero strength means "not an edge".
#[derive(Debug, Clone)]
pub struct EdgeMap {
    width: usize,
    height: usize,
    strength: Vec<f32>,
    direction: Vec<f32>,
    coherent: Vec<bool>,
}

impl EdgeMap {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_edge(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.strength[y * self.width + x] > 0.0
    }

    pub fn strength(&self, x: usize, y: usize) -> f32 {
        if x >= self.width || y >= self.height {
            return 0.0;
        }
        self.strength[y * self.width + x]
    }

    pub fn count(&self) -> usize {
        self.strength.iter().filter(|&&s| s > 0.0).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = EdgePixel> + '_ {
        self.strength
            .iter()
            .enumerate()
            .filter(|&(_, &s)| s > 0.0)
            .map(|(idx, &s)| EdgePixel {
                x: idx % self.width,
                y: idx / self.width,
                strength: s,
                direction: self.direction[idx],
                coherent: self.coherent[idx],
            })
    }

    /// 8-bit rendering of edge strength, saturating at 255.
    pub fn to_visualization(&self) -> Image<u8> {
        let mut out = Image::new_fill(self.width, self.height, 0u8);
        for (dst, &s) in out.data_mut().iter_mut().zip(&self.strength) {
            *dst = s.round().clamp(0.0, 255.0) as u8;
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct EdgeSuppressor {
    cfg: SuppressConfig,
}

impl EdgeSuppressor {
    pub fn new(cfg: SuppressConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &SuppressConfig {
        &self.cfg
    }

    pub fn suppress(&self, field: &GradientField) -> EdgeMap {
        let w = field.width();
        let h = field.height();
        let n = w * h;

        let mut map = EdgeMap {
            width: w,
            height: h,
            strength: vec![0.0; n],
            direction: vec![0.0; n],
            coherent: vec![false; n],
        };
        if w < 3 || h < 3 {
            return map;
        }

        let survivors = self.non_max_suppression(field);
        let boosted = self.consistency_pass(field, &survivors, &mut map);

        debug!(
            "edge suppression: {} survivors, {} coherent",
            survivors.len(),
            boosted
        );
        map
    }

    fn non_max_suppression(&self, field: &GradientField) -> Vec<usize> {
        let w = field.width();
        let h = field.height();
        let mag = field.magnitudes();
        let dir = field.directions();

        let mut survivors = Vec::new();
        for y in 1..(h - 1) {
            for x in 1..(w - 1) {
                let idx = y * w + x;
                let m = mag[idx];
                if m < self.cfg.noise_floor {
                    continue;
                }

                let (i1, i2) = match octant(dir[idx]) {
                    0 => (idx - 1, idx + 1),
                    1 => (idx - w - 1, idx + w + 1),
                    2 => (idx - w, idx + w),
                    _ => (idx - w + 1, idx + w - 1),
                };

                if m >= mag[i1] && m >= mag[i2] {
                    survivors.push(idx);
                }
            }
        }
        survivors
    }

    fn consistency_pass(&self, field: &GradientField, survivors: &[usize], map: &mut EdgeMap) -> usize {
        let w = field.width();
        let h = field.height();
        let mag = field.magnitudes();
        let dir = field.directions();
        let r = self.cfg.neighborhood_radius;
        let tol = self.cfg.angle_tolerance_deg.to_radians();

        let mut alive = vec![false; w * h];
        for &idx in survivors {
            alive[idx] = true;
        }

        let mut boosted = 0usize;
        for &idx in survivors {
            let x = idx % w;
            let y = idx / w;
            let y0 = y.saturating_sub(r);
            let y1 = (y + r).min(h - 1);
            let x0 = x.saturating_sub(r);
            let x1 = (x + r).min(w - 1);

            let mut similar = 0usize;
            for ny in y0..=y1 {
                for nx in x0..=x1 {
                    let nidx = ny * w + nx;
                    if nidx == idx || !alive[nidx] {
                        continue;
                    }
                    if axial_difference(dir[idx], dir[nidx]) < tol {
                        similar += 1;
                    }
                }
            }

            let coherent = similar >= self.cfg.min_coherent_neighbors;
            map.strength[idx] = if coherent {
                boosted += 1;
                mag[idx] * self.cfg.coherence_boost
            } else {
                mag[idx]
            };
            map.direction[idx] = dir[idx];
            map.coherent[idx] = coherent;
        }
        boosted
    }
}

/// Buckets a gradient direction into 0 (0 deg), 1 (45), 2 (90) or 3 (135),
/// folding opposite directions together.
fn octant(direction: f32) -> u8 {
    let a = direction.rem_euclid(PI);
    if !(PI / 8.0..7.0 * PI / 8.0).contains(&a) {
        0
    } else if a < 3.0 * PI / 8.0 {
        1
    } else if a < 5.0 * PI / 8.0 {
        2
    } else {
        3
    }
}

/// Angle between two directions treated as undirected lines, in `[0, pi/2]`.
fn axial_difference(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(PI);
    d.min(PI - d)
}

#[cfg(test)]
mod tests {
    use core::f32::consts::PI;

    use sg_core::Image;

    use crate::gradient::GradientField;
    use crate::nms::{EdgeSuppressor, SuppressConfig, axial_difference, octant};

    fn square_image(w: usize, h: usize, x0: usize, x1: usize, y0: usize, y1: usize) -> Image<u8> {
        let mut data = vec![220u8; w * h];
        for y in y0..y1 {
            for x in x0..x1 {
                data[y * w + x] = 30;
            }
        }
        Image::from_vec(w, h, data).expect("valid image")
    }

    #[test]
    fn octants_wrap_around() {
        assert_eq!(octant(0.0), 0);
        assert_eq!(octant(PI), 0);
        assert_eq!(octant(-PI + 0.1), 0);
        assert_eq!(octant(7.5 * PI / 8.0), 0);
        assert_eq!(octant(PI / 4.0), 1);
        assert_eq!(octant(-3.0 * PI / 4.0), 1);
        assert_eq!(octant(PI / 2.0), 2);
        assert_eq!(octant(-PI / 2.0), 2);
        assert_eq!(octant(3.0 * PI / 4.0), 3);
    }

    #[test]
    fn axial_difference_ignores_polarity() {
        assert!(axial_difference(0.0, PI).abs() < 1e-6);
        assert!((axial_difference(0.0, PI / 2.0) - PI / 2.0).abs() < 1e-6);
        assert!((axial_difference(0.1, -0.1) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn border_is_never_an_edge() {
        // Dark block touching the frame on three sides.
        let (w, h) = (12usize, 10usize);
        let img = square_image(w, h, 0, 6, 0, h);
        let map = EdgeSuppressor::default().suppress(&GradientField::sobel(&img.as_view()));

        assert!(map.count() > 0);
        for x in 0..w {
            assert!(!map.is_edge(x, 0));
            assert!(!map.is_edge(x, h - 1));
        }
        for y in 0..h {
            assert!(!map.is_edge(0, y));
            assert!(!map.is_edge(w - 1, y));
        }
    }

    #[test]
    fn straight_boundary_is_boosted_and_thin() {
        let img = square_image(32, 32, 10, 22, 6, 26);
        let field = GradientField::sobel(&img.as_view());
        let map = EdgeSuppressor::default().suppress(&field);

        // Left side of the dark square, away from its corners.
        let raw = field.get(10, 15).expect("interior").magnitude;
        assert!(map.is_edge(10, 15));
        assert!((map.strength(10, 15) - 1.5 * raw).abs() < 1e-3);
        assert!(!map.is_edge(7, 15));
        assert!(!map.is_edge(13, 15));

        let px = map
            .iter()
            .find(|p| p.x == 10 && p.y == 15)
            .expect("edge pixel listed");
        assert!(px.coherent);
    }

    #[test]
    fn isolated_speck_is_not_boosted() {
        let mut data = vec![128u8; 15 * 15];
        data[7 * 15 + 7] = 255;
        let img = Image::from_vec(15, 15, data).expect("valid image");
        let field = GradientField::sobel(&img.as_view());
        let map = EdgeSuppressor::new(SuppressConfig::default()).suppress(&field);

        assert!(map.count() > 0);
        for p in map.iter() {
            let raw = field.get(p.x, p.y).expect("interior").magnitude;
            assert!(!p.coherent);
            assert!((p.strength - raw).abs() < 1e-4);
        }
    }

    #[test]
    fn noise_floor_rejects_faint_ramps() {
        let (w, h) = (10usize, 8usize);
        let data: Vec<u8> = (0..w * h).map(|i| (i % w) as u8 / 4).collect();
        let img = Image::from_vec(w, h, data).expect("valid image");
        let map = EdgeSuppressor::default().suppress(&GradientField::sobel(&img.as_view()));
        assert_eq!(map.count(), 0);

        let vis = map.to_visualization();
        assert!(vis.data().iter().all(|&v| v == 0));
    }
}
