//! Correction refinements applied after prolongation.

use crate::core::field::stabilise;
use crate::error::LduError;
use crate::matrix::LduMatrix;
use crate::utils::convergence::VSMALL;

/// Replace `psi` by one Jacobi-like step without the source term,
/// `psi = −(A − D)·psi / D`, then shift each aggregate so its
/// diagonal-weighted mean equals the coarse value `psi_c`.
pub(crate) fn interpolate(
    matrix: &LduMatrix,
    psi: &mut [f64],
    a_psi: &mut [f64],
    restrict_addressing: &[usize],
    psi_c: &[f64],
    cmpt: usize,
) -> Result<(), LduError> {
    matrix.off_diagonal_mul(psi, cmpt, a_psi)?;
    let diag = matrix.diag();
    for ((p, &ap), &d) in psi.iter_mut().zip(a_psi.iter()).zip(diag) {
        *p = -ap / d;
    }

    let mut corr_c = vec![0.0; psi_c.len()];
    let mut diag_c = vec![0.0; psi_c.len()];
    for ((&c, &p), &d) in restrict_addressing.iter().zip(psi.iter()).zip(diag) {
        corr_c[c] += d * p;
        diag_c[c] += d;
    }
    for ((corr, &dc), &pc) in corr_c.iter_mut().zip(&diag_c).zip(psi_c) {
        *corr = pc - *corr / dc;
    }
    for (p, &c) in psi.iter_mut().zip(restrict_addressing) {
        *p += corr_c[c];
    }
    Ok(())
}

/// Rescale a correction by the factor minimising the energy of the error,
/// `sf = Σ b·c / Σ (A·c)·c`, then apply one Jacobi step:
/// `c = sf·c + (b − sf·A·c)/D`.
pub(crate) fn scale(
    matrix: &LduMatrix,
    field: &mut [f64],
    a_field: &mut [f64],
    source: &[f64],
    cmpt: usize,
) -> Result<(), LduError> {
    matrix.amul(field, cmpt, a_field)?;

    let mut factors = [0.0, 0.0];
    for ((&b, &ac), &c) in source.iter().zip(a_field.iter()).zip(field.iter()) {
        factors[0] += b * c;
        factors[1] += ac * c;
    }
    matrix.comm().all_reduce(&mut factors)?;
    let sf = factors[0] / stabilise(factors[1], VSMALL);

    for (((c, &ac), &b), &d) in field.iter_mut().zip(a_field.iter()).zip(source).zip(matrix.diag()) {
        *c = sf * *c + (b - sf * ac) / d;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::LduAddressing;
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;

    fn laplacian(n: usize) -> LduMatrix {
        let addr = Arc::new(LduAddressing::new(n, (0..n - 1).collect(), (1..n).collect()).unwrap());
        LduMatrix::symmetric(addr, vec![2.0; n], vec![-1.0; n - 1]).unwrap()
    }

    #[test]
    fn scale_recovers_exact_multiple() {
        // c is the solution up to a factor of 2
        let m = laplacian(6);
        let x: Vec<f64> = (0..6).map(|i| 1.0 + i as f64).collect();
        let mut b = vec![0.0; 6];
        m.amul(&x, 0, &mut b).unwrap();
        let mut c: Vec<f64> = x.iter().map(|v| 0.5 * v).collect();
        let mut ac = vec![0.0; 6];
        scale(&m, &mut c, &mut ac, &b, 0).unwrap();
        for i in 0..6 {
            assert_abs_diff_eq!(c[i], x[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn interpolate_preserves_weighted_aggregate_mean() {
        let m = laplacian(6);
        let restrict = [0, 0, 1, 1, 2, 2];
        let psi_c = [1.0, -2.0, 0.5];
        let mut psi = vec![1.0, 1.0, -2.0, -2.0, 0.5, 0.5];
        let mut a_psi = vec![0.0; 6];
        interpolate(&m, &mut psi, &mut a_psi, &restrict, &psi_c, 0).unwrap();
        for (c, &pc) in psi_c.iter().enumerate() {
            let (mut num, mut den) = (0.0, 0.0);
            for i in 0..6 {
                if restrict[i] == c {
                    num += m.diag()[i] * psi[i];
                    den += m.diag()[i];
                }
            }
            assert_abs_diff_eq!(num / den, pc, epsilon = 1e-12);
        }
    }
}
