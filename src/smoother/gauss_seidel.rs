// Gauss–Seidel smoother over the LDU cell adjacency

use crate::error::LduError;
use crate::matrix::LduMatrix;
use crate::smoother::{Smoother, SweepFlags, check_fields};

pub struct GaussSeidelSmoother {
    sweep: SweepFlags,
    /// `A[cell][other]` for every entry of the addressing's cell adjacency.
    row_coeffs: Vec<f64>,
    inv_diag: Vec<f64>,
}

impl GaussSeidelSmoother {
    pub fn new(matrix: &LduMatrix, sweep: SweepFlags) -> Self {
        let addr = matrix.addressing();
        let (owner, upper, lower) = (addr.owner(), matrix.upper(), matrix.lower());
        let start = addr.cell_faces_start();
        let mut row_coeffs = Vec::with_capacity(addr.all_cell_faces().len());
        for c in 0..addr.n_cells() {
            for &(f, _) in &addr.all_cell_faces()[start[c]..start[c + 1]] {
                row_coeffs.push(if owner[f] == c { upper[f] } else { lower[f] });
            }
        }
        let inv_diag = matrix.diag().iter().map(|&d| 1.0 / d).collect();
        Self { sweep, row_coeffs, inv_diag }
    }

    pub fn sweep(&self) -> SweepFlags {
        self.sweep
    }

    #[inline]
    fn relax(&self, matrix: &LduMatrix, c: usize, psi: &mut [f64], b_prime: &[f64]) {
        let addr = matrix.addressing();
        let start = addr.cell_faces_start();
        let (lo, hi) = (start[c], start[c + 1]);
        let mut s = b_prime[c];
        for (&(_, other), &a) in addr.all_cell_faces()[lo..hi].iter().zip(&self.row_coeffs[lo..hi]) {
            s -= a * psi[other];
        }
        psi[c] = s * self.inv_diag[c];
    }
}

impl Smoother for GaussSeidelSmoother {
    fn type_name(&self) -> &'static str {
        if self.sweep == SweepFlags::SYMMETRIC { "symGaussSeidel" } else { "GaussSeidel" }
    }

    fn smooth(
        &self,
        matrix: &LduMatrix,
        psi: &mut [f64],
        source: &[f64],
        cmpt: usize,
        n_sweeps: usize,
    ) -> Result<(), LduError> {
        check_fields(matrix, psi, source)?;
        let n = matrix.n_cells();
        let mut b_prime = vec![0.0; n];
        for _ in 0..n_sweeps {
            // Coupled neighbours are frozen at their current values for the sweep.
            matrix.interface_product(psi, cmpt, &mut b_prime)?;
            for (b, &s) in b_prime.iter_mut().zip(source) {
                *b = s - *b;
            }
            if self.sweep.contains(SweepFlags::FORWARD) {
                for c in 0..n {
                    self.relax(matrix, c, psi, &b_prime);
                }
            }
            if self.sweep.contains(SweepFlags::BACKWARD) {
                for c in (0..n).rev() {
                    self.relax(matrix, c, psi, &b_prime);
                }
            }
        }
        Ok(())
    }
}
