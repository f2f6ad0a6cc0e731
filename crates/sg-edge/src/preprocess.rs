//! Per-pass image conditioning ahead of edge detection.
//!
//! The capture buffer is reduced to a single luma plane, stretched around its
//! mean intensity, and optionally binarized by one of the
//! [`PreprocessStrategy`] variants. Scanline profiles are smoothed with
//! [`gaussian_smooth`], which excludes out-of-range taps instead of padding.

use log::debug;
use sg_core::{Channels, Image, ImageView, PixelBuffer};

use crate::conv1d::convolve_f32;
use crate::kernels1d::GaussianKernel1D;

/// RGB to luma weightings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LumaWeights {
    /// `0.299 R + 0.587 G + 0.114 B`
    Bt601,
    /// `0.21 R + 0.72 G + 0.07 B`, used ahead of fixed binarization.
    Linear,
}

impl LumaWeights {
    pub fn coefficients(self) -> [f32; 3] {
        match self {
            Self::Bt601 => [0.299, 0.587, 0.114],
            Self::Linear => [0.21, 0.72, 0.07],
        }
    }

    pub fn luma(self, r: u8, g: u8, b: u8) -> u8 {
        let [wr, wg, wb] = self.coefficients();
        let y = wr * r as f32 + wg * g as f32 + wb * b as f32;
        y.round().clamp(0.0, 255.0) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PreprocessStrategy {
    None,
    /// Binarize at `threshold`: samples above it become 255, the rest 0.
    FixedThreshold { threshold: u8 },
    /// Binarize against the local mean over a `window_size` square minus `c`.
    AdaptiveThreshold { window_size: usize, c: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessConfig {
    pub contrast_factor: f32,
    pub strategy: PreprocessStrategy,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            contrast_factor: 1.5,
            strategy: PreprocessStrategy::None,
        }
    }
}

impl PreprocessConfig {
    pub fn luma_weights(&self) -> LumaWeights {
        match self.strategy {
            PreprocessStrategy::FixedThreshold { .. } => LumaWeights::Linear,
            _ => LumaWeights::Bt601,
        }
    }
}

/// Runs grayscale conversion, contrast enhancement and the configured
/// binarization strategy, returning a fresh luma plane.
pub fn preprocess(buf: &PixelBuffer, cfg: &PreprocessConfig) -> Image<u8> {
    let mut gray = luma_plane(buf, cfg.luma_weights());
    enhance_contrast(&mut gray, cfg.contrast_factor);

    match cfg.strategy {
        PreprocessStrategy::None => gray,
        PreprocessStrategy::FixedThreshold { threshold } => {
            fixed_threshold(&mut gray, threshold);
            gray
        }
        PreprocessStrategy::AdaptiveThreshold { window_size, c } => {
            adaptive_threshold(&gray.as_view(), window_size, c)
        }
    }
}

/// Returns a copy of `buf` with every color channel replaced by luma.
///
/// Alpha is left untouched; gray buffers are returned unchanged.
pub fn to_grayscale(buf: &PixelBuffer, weights: LumaWeights) -> PixelBuffer {
    let mut out = buf.clone();
    if buf.channels() == Channels::Gray {
        return out;
    }

    for px in out.pixels_mut() {
        let y = weights.luma(px[0], px[1], px[2]);
        px[0] = y;
        px[1] = y;
        px[2] = y;
    }
    out
}

/// Extracts a single-plane luma image from any supported channel layout.
pub fn luma_plane(buf: &PixelBuffer, weights: LumaWeights) -> Image<u8> {
    let data: Vec<u8> = match buf.channels() {
        Channels::Gray => buf.data().to_vec(),
        Channels::Rgb | Channels::Rgba => buf
            .pixels()
            .map(|px| weights.luma(px[0], px[1], px[2]))
            .collect(),
    };
    Image::from_vec(buf.width(), buf.height(), data)
        .expect("pixel buffer invariant guarantees width*height pixels")
}

pub fn mean_intensity(img: &ImageView<'_, u8>) -> f32 {
    let n = img.width() * img.height();
    if n == 0 {
        return 0.0;
    }
    let mut sum = 0u64;
    for y in 0..img.height() {
        sum += img.row(y).iter().map(|&v| v as u64).sum::<u64>();
    }
    sum as f32 / n as f32
}

/// Stretches intensities around the image mean: `mu + (v - mu) * factor`.
pub fn enhance_contrast(img: &mut Image<u8>, factor: f32) {
    let mu = mean_intensity(&img.as_view());
    for v in img.data_mut() {
        let stretched = mu + (*v as f32 - mu) * factor;
        *v = stretched.round().clamp(0.0, 255.0) as u8;
    }
}

pub fn fixed_threshold(img: &mut Image<u8>, threshold: u8) {
    for v in img.data_mut() {
        *v = if *v > threshold { 255 } else { 0 };
    }
}

/// Local-mean binarization.
///
/// Each pixel is compared with the mean of the in-bounds pixels of the
/// `window_size` square centred on it, minus `c`. Pixels outside the image do
/// not contribute to the average. Even window sizes are widened by one.
pub fn adaptive_threshold(img: &ImageView<'_, u8>, window_size: usize, c: f32) -> Image<u8> {
    let w = img.width();
    let h = img.height();
    let half = window_size.max(1) / 2;

    // Integral image with a zero guard row/column.
    let iw = w + 1;
    let mut integral = vec![0u64; iw * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for (x, &v) in img.row(y).iter().enumerate() {
            row_sum += v as u64;
            integral[(y + 1) * iw + x + 1] = integral[y * iw + x + 1] + row_sum;
        }
    }

    let mut out = vec![0u8; w * h];
    for y in 0..h {
        let y0 = y.saturating_sub(half);
        let y1 = (y + half + 1).min(h);
        for x in 0..w {
            let x0 = x.saturating_sub(half);
            let x1 = (x + half + 1).min(w);
            let count = ((y1 - y0) * (x1 - x0)) as f32;
            let sum = integral[y1 * iw + x1] + integral[y0 * iw + x0]
                - integral[y0 * iw + x1]
                - integral[y1 * iw + x0];
            let mean = sum as f32 / count;
            let v = img.row(y)[x] as f32;
            out[y * w + x] = if v > mean - c { 255 } else { 0 };
        }
    }

    debug!("adaptive threshold: {w}x{h}, window {}, c {c}", 2 * half + 1);
    Image::from_vec(w, h, out).expect("output sized from input dimensions")
}

/// Gaussian-smooths a 1D profile; `sigma <= 0` returns the input unchanged.
///
/// The kernel never reaches past the profile, so a huge `sigma` degrades to
/// the profile mean instead of a huge allocation.
pub fn gaussian_smooth(profile: &[f32], sigma: f32) -> Vec<f32> {
    let kernel = GaussianKernel1D::truncated(sigma, profile.len().saturating_sub(1));
    let mut out = vec![0.0f32; profile.len()];
    convolve_f32(profile, &kernel.g, kernel.radius, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use sg_core::{Channels, Image, PixelBuffer};

    use crate::preprocess::{
        LumaWeights, PreprocessConfig, PreprocessStrategy, adaptive_threshold, enhance_contrast,
        gaussian_smooth, luma_plane, preprocess, to_grayscale,
    };

    #[test]
    fn grayscale_writes_luma_and_keeps_alpha() {
        let buf = PixelBuffer::new(2, 1, Channels::Rgba, vec![255, 0, 0, 17, 10, 200, 30, 99])
            .expect("valid buffer");
        let gray = to_grayscale(&buf, LumaWeights::Bt601);

        let px: Vec<&[u8]> = gray.pixels().collect();
        assert_eq!(px[0], &[76, 76, 76, 17]);
        let y1 = (0.299f32 * 10.0 + 0.587 * 200.0 + 0.114 * 30.0).round() as u8;
        assert_eq!(px[1], &[y1, y1, y1, 99]);

        let linear = luma_plane(&buf, LumaWeights::Linear);
        assert_eq!(linear.data()[0], 54);
    }

    #[test]
    fn contrast_stretches_around_mean() {
        let mut img = Image::from_vec(4, 1, vec![90u8, 110, 100, 100]).expect("valid image");
        enhance_contrast(&mut img, 2.0);
        assert_eq!(img.data(), &[80, 120, 100, 100]);

        let mut sat = Image::from_vec(2, 1, vec![0u8, 255]).expect("valid image");
        enhance_contrast(&mut sat, 3.0);
        assert_eq!(sat.data(), &[0, 255]);
    }

    #[test]
    fn smoothing_with_vanishing_sigma_is_identity() {
        let profile = [3.0f32, 250.0, 7.0, 0.0, 128.0];
        assert_eq!(gaussian_smooth(&profile, 0.0), profile.to_vec());
        let tiny = gaussian_smooth(&profile, 1e-3);
        for (a, b) in tiny.iter().zip(profile.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn smoothing_keeps_flat_profile_flat_at_the_ends() {
        let profile = vec![42.0f32; 16];
        for v in gaussian_smooth(&profile, 2.0) {
            assert!((v - 42.0).abs() < 1e-4);
        }
    }

    #[test]
    fn huge_sigma_flattens_to_the_mean() {
        let profile = [0.0f32, 10.0, 20.0, 30.0];
        let out = gaussian_smooth(&profile, 1e9);
        assert_eq!(out.len(), profile.len());
        for v in out {
            assert!((v - 15.0).abs() < 1e-3, "{v}");
        }
    }

    #[test]
    fn adaptive_threshold_ignores_outside_pixels() {
        // A uniform image must stay uniform: with zero padding the corners
        // would see a darker mean than the centre.
        let img = Image::from_vec(5, 5, vec![100u8; 25]).expect("valid image");
        let out = adaptive_threshold(&img.as_view(), 3, 5.0);
        assert!(out.data().iter().all(|&v| v == 255));

        let out = adaptive_threshold(&img.as_view(), 3, -5.0);
        assert!(out.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn adaptive_threshold_marks_dark_blob() {
        let mut data = vec![200u8; 9 * 9];
        data[4 * 9 + 4] = 20;
        let img = Image::from_vec(9, 9, data).expect("valid image");
        let out = adaptive_threshold(&img.as_view(), 5, 5.0);
        assert_eq!(out.data()[4 * 9 + 4], 0);
        assert_eq!(out.data()[0], 255);
    }

    #[test]
    fn preprocess_strategies() {
        let buf = PixelBuffer::new(4, 1, Channels::Gray, vec![10, 20, 245, 250]).expect("valid");

        let plain = preprocess(
            &buf,
            &PreprocessConfig {
                contrast_factor: 1.0,
                strategy: PreprocessStrategy::None,
            },
        );
        assert_eq!(plain.data(), &[10, 20, 245, 250]);

        let fixed = preprocess(
            &buf,
            &PreprocessConfig {
                contrast_factor: 1.0,
                strategy: PreprocessStrategy::FixedThreshold { threshold: 240 },
            },
        );
        assert_eq!(fixed.data(), &[0, 0, 255, 255]);

        let cfg = PreprocessConfig {
            contrast_factor: 1.0,
            strategy: PreprocessStrategy::AdaptiveThreshold {
                window_size: 15,
                c: 5.0,
            },
        };
        let adaptive = preprocess(&buf, &cfg);
        assert_eq!(adaptive.data(), &[0, 0, 255, 255]);
        assert_eq!(cfg.luma_weights(), LumaWeights::Bt601);
    }
}
