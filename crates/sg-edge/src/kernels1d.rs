/// Sampled 1D Gaussian kernel.
///
/// Conventions:
/// - `radius = ceil(3*sigma)`, `len = 2*radius + 1`.
/// - `g[i] = exp(-x^2 / (2*sigma^2))` with `x = i - radius`, normalized so
///   that `sum(g) == 1`.
/// - A non-positive or non-finite `sigma` yields the identity kernel `[1.0]`.
/// - [`GaussianKernel1D::truncated`] caps the radius; the shorter kernel is
///   renormalized over the taps it keeps.
#[derive(Debug, Clone)]
pub struct GaussianKernel1D {
    pub sigma: f32,
    pub radius: usize,
    pub g: Vec<f32>,
}

impl GaussianKernel1D {
    pub fn new(sigma: f32) -> Self {
        Self::truncated(sigma, usize::MAX)
    }

    /// Like [`GaussianKernel1D::new`] with `radius <= max_radius`.
    pub fn truncated(sigma: f32, max_radius: usize) -> Self {
        if !(sigma.is_finite() && sigma > 0.0) {
            return Self::identity();
        }

        let full = (3.0 * sigma).ceil();
        let radius = if full >= max_radius as f32 {
            max_radius
        } else {
            full as usize
        };
        let len = 2 * radius + 1;

        let sigma2 = sigma * sigma;
        let mut g = vec![0.0f32; len];
        for (i, gi) in g.iter_mut().enumerate() {
            let x = i as isize - radius as isize;
            let xf = x as f32;
            *gi = (-(xf * xf) / (2.0 * sigma2)).exp();
        }

        let sum_g: f32 = g.iter().sum();
        for gi in &mut g {
            *gi /= sum_g;
        }

        Self { sigma, radius, g }
    }

    pub fn identity() -> Self {
        Self {
            sigma: 0.0,
            radius: 0,
            g: vec![1.0],
        }
    }
}
