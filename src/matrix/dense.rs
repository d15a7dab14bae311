//! Dense view of an LDU matrix on top of Faer.
//!
//! Only the local diagonal and face coefficients are represented; interface
//! couplings have no column in a rank-local dense matrix and are left out.

use faer::Mat;

use crate::matrix::ldu::LduMatrix;

impl LduMatrix {
    /// Assemble the rank-local matrix as a Faer `Mat`.
    ///
    /// Coincident faces accumulate into the same entry.
    pub fn to_dense(&self) -> Mat<f64> {
        let n = self.n_cells();
        let mut a = Mat::<f64>::zeros(n, n);
        for (c, &d) in self.diag().iter().enumerate() {
            a[(c, c)] = d;
        }
        let addr = self.addressing();
        let (upper, lower) = (self.upper(), self.lower());
        for (f, (&o, &nb)) in addr.owner().iter().zip(addr.neighbour()).enumerate() {
            a[(o, nb)] += upper[f];
            a[(nb, o)] += lower[f];
        }
        a
    }
}
