/// Number of weights a blur pass carries: the center tap plus seven on each
/// side.
pub const BLUR_TAPS: usize = 8;

/// Normalized one-sided Gaussian kernel: `w[i] = exp(-i² / strength)`,
/// scaled so the full two-sided kernel (`w[0] + 2 * sum(w[1..])`) sums to 1.
///
/// `strength` behaves like `2σ²`; values near zero collapse to a single
/// center tap.
pub fn gauss_weights(strength: f32, taps: usize) -> Vec<f32> {
    if taps == 0 {
        return Vec::new();
    }
    let strength = strength.max(f32::EPSILON);
    let mut weights: Vec<f32> = (0..taps)
        .map(|i| (-((i * i) as f32) / strength).exp())
        .collect();
    let total = weights[0] + 2.0 * weights[1..].iter().sum::<f32>();
    weights.iter_mut().for_each(|w| *w /= total);
    weights
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_sums_to_one() {
        let w = gauss_weights(100.0, BLUR_TAPS);
        assert_eq!(w.len(), BLUR_TAPS);
        let total = w[0] + 2.0 * w[1..].iter().sum::<f32>();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn weights_fall_off() {
        let w = gauss_weights(10.0, BLUR_TAPS);
        for pair in w.windows(2) {
            assert!(pair[0] > pair[1]);
        }
    }

    #[test]
    fn tiny_strength_is_identity() {
        let w = gauss_weights(0.0, 4);
        assert!((w[0] - 1.0).abs() < 1e-6);
        assert!(w[1..].iter().all(|x| *x < 1e-6));
    }

    #[test]
    fn no_taps() {
        assert!(gauss_weights(100.0, 0).is_empty());
    }
}
