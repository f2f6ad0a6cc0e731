/// Convolves `signal` with a symmetric-footprint `kernel` into `out`.
///
/// Taps falling outside the signal are skipped and the result is divided by
/// the sum of the weights actually used, so a normalized kernel keeps flat
/// signals flat right up to the ends.
pub fn convolve_f32(signal: &[f32], kernel: &[f32], radius: usize, out: &mut [f32]) {
    assert_eq!(out.len(), signal.len(), "out must match signal length");
    assert_eq!(
        kernel.len(),
        2 * radius + 1,
        "kernel len must be 2*radius+1"
    );

    let n = signal.len();
    if n == 0 {
        return;
    }

    let interior_start = radius.min(n);
    let interior_end = n.saturating_sub(radius).max(interior_start);
    convolve_interior(signal, kernel, radius, interior_start..interior_end, out);

    for i in (0..interior_start).chain(interior_end..n) {
        out[i] = convolve_excluding(signal, kernel, radius, i);
    }
}

fn convolve_interior(
    signal: &[f32],
    kernel: &[f32],
    radius: usize,
    range: core::ops::Range<usize>,
    out: &mut [f32],
) {
    let klen = kernel.len();
    for i in range {
        let base = i - radius;
        let window = &signal[base..base + klen];
        let mut acc = 0.0f32;
        for (k, &s) in window.iter().enumerate() {
            acc += s * kernel[klen - 1 - k];
        }
        out[i] = acc;
    }
}

fn convolve_excluding(signal: &[f32], kernel: &[f32], radius: usize, i: usize) -> f32 {
    let n = signal.len() as isize;
    let mut acc = 0.0f32;
    let mut wsum = 0.0f32;
    for (k, &kv) in kernel.iter().enumerate() {
        let idx = i as isize + radius as isize - k as isize;
        if (0..n).contains(&idx) {
            acc += signal[idx as usize] * kv;
            wsum += kv;
        }
    }
    if wsum.abs() <= f32::EPSILON {
        signal[i]
    } else {
        acc / wsum
    }
}

/// Central-difference derivative with one-sided differences at both ends.
pub fn central_difference(signal: &[f32], out: &mut [f32]) {
    assert_eq!(out.len(), signal.len(), "out must match signal length");
    let n = signal.len();
    if n < 2 {
        out.fill(0.0);
        return;
    }

    out[0] = signal[1] - signal[0];
    out[n - 1] = signal[n - 1] - signal[n - 2];
    for i in 1..(n - 1) {
        out[i] = 0.5 * (signal[i + 1] - signal[i - 1]);
    }
}
