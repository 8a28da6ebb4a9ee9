//! HyperLogLog primitives for approximate result counting.
//!
//! Every search document is assigned a register and a leading-zero count
//! derived from a deterministic hash of its package path; both are fixed
//! at first insert and never change. Estimation aggregates the per-register
//! maxima of documents matching a query.

/// Number of registers. Fixed: the stored assignments depend on it.
pub const REGISTER_COUNT: usize = 128;

/// Register and leading-zero assignment for a package path.
///
/// The register is the hash modulo the register count; the stored zero
/// count is the number of leading zero bits plus one, so an empty
/// register is distinguishable as zero.
pub fn assign(package_path: &str) -> (i16, i16) {
    let h = fxhash::hash64(package_path.as_bytes());
    let register = (h % REGISTER_COUNT as u64) as i16;
    let leading_zeros = (h.leading_zeros() + 1) as i16;
    (register, leading_zeros)
}

/// Estimates the cardinality of a population from per-register maxima.
///
/// `register_maxes` holds, for each register, the maximum stored
/// leading-zero count among matching documents, with `0` marking an
/// empty register. Small estimates fall back to linear counting over the
/// empty-register count. The result is rounded to the nearest integer.
pub fn estimate_count(register_maxes: &[i16]) -> u64 {
    let m = register_maxes.len() as f64;
    if register_maxes.is_empty() {
        return 0;
    }
    let alpha = 0.7213 / (1.0 + 1.079 / m);

    let mut harmonic_sum = 0.0;
    let mut empty = 0u32;
    for &z in register_maxes {
        if z <= 0 {
            empty += 1;
            harmonic_sum += 1.0;
        } else {
            harmonic_sum += 2.0_f64.powi(-i32::from(z));
        }
    }

    let mut estimate = alpha * m * m / harmonic_sum;
    if estimate < 2.5 * m && empty > 0 {
        estimate = alpha * m * (m / f64::from(empty)).log2();
    }
    estimate.round() as u64
}
