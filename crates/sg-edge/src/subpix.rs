//! Devernay-style 1-D sub-pixel refinement.

use crate::scanline::EdgePolarity;

const DENOM_EPS: f32 = 1e-6;

/// Offset of the vertex of the parabola through `(-1, a)`, `(0, b)`, `(1, c)`.
///
/// Returns 0 unless `b` is a strict local maximum. The result lies in
/// `(-0.5, 0.5)` whenever it is non-zero.
pub fn devernay_offset(a: f32, b: f32, c: f32) -> f32 {
    if b <= a || b <= c {
        return 0.0;
    }
    let denom = a + c - 2.0 * b;
    if denom.abs() < DENOM_EPS {
        return 0.0;
    }
    0.5 * (a - c) / denom
}

/// Refines the extremum at `idx` of a gradient profile.
///
/// The absolute samples are ordered from the dark side to the bright side of
/// the edge, so a falling edge reads its neighbours in reverse and mirrors
/// the offset back onto the scan axis.
pub fn refine_gradient_peak(grad: &[f32], idx: usize, polarity: EdgePolarity) -> f32 {
    if idx == 0 || idx + 1 >= grad.len() {
        return idx as f32;
    }
    let prev = grad[idx - 1].abs();
    let peak = grad[idx].abs();
    let next = grad[idx + 1].abs();

    match polarity {
        EdgePolarity::Rising => idx as f32 + devernay_offset(prev, peak, next),
        EdgePolarity::Falling => idx as f32 - devernay_offset(next, peak, prev),
    }
}

#[cfg(test)]
mod tests {
    use crate::scanline::EdgePolarity;
    use crate::subpix::{devernay_offset, refine_gradient_peak};

    fn parabola(vertex: f32, x: f32) -> f32 {
        10.0 - (x - vertex) * (x - vertex)
    }

    #[test]
    fn ideal_quadratic_recovers_vertex() {
        for &vertex in &[-0.45f32, -0.2, 0.0, 0.3, 0.49] {
            let off = devernay_offset(parabola(vertex, -1.0), parabola(vertex, 0.0), parabola(vertex, 1.0));
            assert!((off - vertex).abs() < 1e-5, "vertex {vertex} got {off}");
        }
    }

    #[test]
    fn non_maximum_yields_zero() {
        assert_eq!(devernay_offset(3.0, 2.0, 1.0), 0.0);
        assert_eq!(devernay_offset(2.0, 2.0, 1.0), 0.0);
        assert_eq!(devernay_offset(1.0, 2.0, 2.0), 0.0);
    }

    #[test]
    fn polarity_does_not_change_location() {
        let rising = [0.0, 6.0, 10.0, 8.0, 0.0];
        let falling: Vec<f32> = rising.iter().map(|v| -v).collect();

        let xr = refine_gradient_peak(&rising, 2, EdgePolarity::Rising);
        let xf = refine_gradient_peak(&falling, 2, EdgePolarity::Falling);
        assert!(xr > 2.0 && xr < 2.5);
        assert!((xr - xf).abs() < 1e-6);
    }

    #[test]
    fn ends_of_profile_are_not_refined() {
        let g = [5.0, 1.0, 0.0];
        assert_eq!(refine_gradient_peak(&g, 0, EdgePolarity::Rising), 0.0);
        assert_eq!(refine_gradient_peak(&g, 2, EdgePolarity::Falling), 2.0);
    }
}
