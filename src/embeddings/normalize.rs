//! L2 normalization, so that inner product equals cosine similarity.

use crate::{QaError, Result};

/// Return `v / ‖v‖₂`.
///
/// Fails with [`QaError::DegenerateVector`] when the norm is zero or not a
/// finite number.
#[inline]
pub fn normalize(v: &[f32]) -> Result<Vec<f32>> {
    let mut out = v.to_vec();
    normalize_in_place(&mut out)?;
    Ok(out)
}

/// Rescale `v` to unit length without allocating.
#[inline]
pub fn normalize_in_place(v: &mut [f32]) -> Result<()> {
    // accumulate in f64 so long vectors of small components stay accurate
    let norm = v
        .iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt();

    if !norm.is_finite() || norm <= 0.0 {
        return Err(QaError::DegenerateVector);
    }

    for x in v.iter_mut() {
        *x = (f64::from(*x) / norm) as f32;
    }
    Ok(())
}

/// Normalize every vector in place, stopping at the first degenerate one.
#[inline]
pub fn normalize_all(vectors: &mut [Vec<f32>]) -> Result<()> {
    vectors
        .iter_mut()
        .try_for_each(|v| normalize_in_place(v))
}

/// Inner product of two equal-length vectors.
#[inline]
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
