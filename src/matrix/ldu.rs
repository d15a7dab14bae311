//! LDU sparse matrix: diagonal plus face-addressed lower/upper coefficients.
//!
//! For face `f` with owner `l = owner[f]` and neighbour `u = neighbour[f]`:
//! `A[l][u] = upper[f]` and `A[u][l] = lower[f]`. Symmetric matrices store only
//! `upper`. Interface couplings add off-processor (or periodic) contributions
//! that are resolved by exchange rather than local indexing.

use std::rc::Rc;
use std::sync::Arc;

use crate::error::LduError;
use crate::interface::{InterfaceCoupling, PendingExchange};
use crate::matrix::addressing::LduAddressing;
use crate::parallel::{Comm, SerialComm};

/// Which interface coefficients take part in a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CoeffSide {
    /// `A·x`
    Boundary,
    /// `Aᵀ·x`
    Internal,
}

#[derive(Debug, Clone)]
pub struct LduMatrix {
    addressing: Arc<LduAddressing>,
    diag: Vec<f64>,
    upper: Vec<f64>,
    lower: Option<Vec<f64>>,
    interfaces: Vec<InterfaceCoupling>,
    comm: Rc<dyn Comm>,
}

impl LduMatrix {
    pub fn symmetric(addressing: Arc<LduAddressing>, diag: Vec<f64>, upper: Vec<f64>) -> Result<Self, LduError> {
        LduError::check_len("diagonal", addressing.n_cells(), diag.len())?;
        LduError::check_len("upper coefficients", addressing.n_faces(), upper.len())?;
        Ok(Self {
            addressing,
            diag,
            upper,
            lower: None,
            interfaces: Vec::new(),
            comm: Rc::new(SerialComm),
        })
    }

    pub fn asymmetric(
        addressing: Arc<LduAddressing>,
        diag: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
    ) -> Result<Self, LduError> {
        LduError::check_len("lower coefficients", addressing.n_faces(), lower.len())?;
        let mut m = Self::symmetric(addressing, diag, upper)?;
        m.lower = Some(lower);
        Ok(m)
    }

    /// Attach an interface coupling after checking its sizes and cells.
    pub fn with_interface(mut self, coupling: InterfaceCoupling) -> Result<Self, LduError> {
        let n_faces = coupling.interface.face_cells().len();
        LduError::check_len("interface boundary coefficients", n_faces, coupling.boundary_coeffs.len())?;
        LduError::check_len("interface internal coefficients", n_faces, coupling.internal_coeffs.len())?;
        coupling.interface.validate(self.n_cells())?;
        self.interfaces.push(coupling);
        Ok(self)
    }

    /// Communicator used for global reductions (defaults to serial).
    pub fn with_comm(mut self, comm: Rc<dyn Comm>) -> Self {
        self.comm = comm;
        self
    }

    pub fn addressing(&self) -> &Arc<LduAddressing> {
        &self.addressing
    }

    pub fn n_cells(&self) -> usize {
        self.addressing.n_cells()
    }

    pub fn n_faces(&self) -> usize {
        self.addressing.n_faces()
    }

    pub fn symmetric_storage(&self) -> bool {
        self.lower.is_none()
    }

    pub fn diag(&self) -> &[f64] {
        &self.diag
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Lower coefficients; aliases `upper` for symmetric storage.
    pub fn lower(&self) -> &[f64] {
        self.lower.as_deref().unwrap_or(&self.upper)
    }

    pub fn diag_mut(&mut self) -> &mut [f64] {
        &mut self.diag
    }

    pub fn upper_mut(&mut self) -> &mut [f64] {
        &mut self.upper
    }

    /// Mutable lower coefficients. A symmetric matrix becomes asymmetric.
    pub fn lower_mut(&mut self) -> &mut [f64] {
        let upper = &self.upper;
        self.lower.get_or_insert_with(|| upper.clone())
    }

    pub fn interfaces(&self) -> &[InterfaceCoupling] {
        &self.interfaces
    }

    pub fn interfaces_mut(&mut self) -> &mut [InterfaceCoupling] {
        &mut self.interfaces
    }

    pub fn comm(&self) -> &Rc<dyn Comm> {
        &self.comm
    }

    /// y = A·psi
    pub fn amul(&self, psi: &[f64], cmpt: usize, y: &mut [f64]) -> Result<(), LduError> {
        self.check_vectors("amul", psi, y)?;
        let pending = self.init_interfaces(psi, cmpt)?;

        for ((yi, &d), &p) in y.iter_mut().zip(&self.diag).zip(psi) {
            *yi = d * p;
        }
        let (owner, neighbour) = (self.addressing.owner(), self.addressing.neighbour());
        let (upper, lower) = (self.upper(), self.lower());
        for f in 0..owner.len() {
            y[owner[f]] += upper[f] * psi[neighbour[f]];
            y[neighbour[f]] += lower[f] * psi[owner[f]];
        }

        self.update_interfaces(pending, y, CoeffSide::Boundary)
    }

    /// y = Aᵀ·psi
    pub fn tmul(&self, psi: &[f64], cmpt: usize, y: &mut [f64]) -> Result<(), LduError> {
        self.check_vectors("tmul", psi, y)?;
        let pending = self.init_interfaces(psi, cmpt)?;

        for ((yi, &d), &p) in y.iter_mut().zip(&self.diag).zip(psi) {
            *yi = d * p;
        }
        let (owner, neighbour) = (self.addressing.owner(), self.addressing.neighbour());
        let (upper, lower) = (self.upper(), self.lower());
        for f in 0..owner.len() {
            y[owner[f]] += lower[f] * psi[neighbour[f]];
            y[neighbour[f]] += upper[f] * psi[owner[f]];
        }

        self.update_interfaces(pending, y, CoeffSide::Internal)
    }

    /// y = (A − D)·psi, the off-diagonal part including interfaces.
    pub fn off_diagonal_mul(&self, psi: &[f64], cmpt: usize, y: &mut [f64]) -> Result<(), LduError> {
        self.check_vectors("off-diagonal product", psi, y)?;
        let pending = self.init_interfaces(psi, cmpt)?;

        y.fill(0.0);
        let (owner, neighbour) = (self.addressing.owner(), self.addressing.neighbour());
        let (upper, lower) = (self.upper(), self.lower());
        for f in 0..owner.len() {
            y[owner[f]] += upper[f] * psi[neighbour[f]];
            y[neighbour[f]] += lower[f] * psi[owner[f]];
        }

        self.update_interfaces(pending, y, CoeffSide::Boundary)
    }

    /// Row sums of A, interface coefficients included.
    pub fn sum_a(&self, y: &mut [f64]) -> Result<(), LduError> {
        LduError::check_len("sumA result", self.n_cells(), y.len())?;
        y.copy_from_slice(&self.diag);
        let (owner, neighbour) = (self.addressing.owner(), self.addressing.neighbour());
        let (upper, lower) = (self.upper(), self.lower());
        for f in 0..owner.len() {
            y[owner[f]] += upper[f];
            y[neighbour[f]] += lower[f];
        }
        for coupling in &self.interfaces {
            for (&c, &k) in coupling.interface.face_cells().iter().zip(&coupling.boundary_coeffs) {
                y[c] -= k;
            }
        }
        Ok(())
    }

    /// r = source − A·psi
    pub fn residual(&self, psi: &[f64], source: &[f64], cmpt: usize, r: &mut [f64]) -> Result<(), LduError> {
        LduError::check_len("residual source", self.n_cells(), source.len())?;
        self.amul(psi, cmpt, r)?;
        for (ri, &b) in r.iter_mut().zip(source) {
            *ri = b - *ri;
        }
        Ok(())
    }

    /// Index of the first exactly-zero diagonal coefficient on this rank, and
    /// whether any rank holds one.
    pub fn has_zero_diagonal(&self) -> Result<(Option<usize>, bool), LduError> {
        let local = self.diag.iter().position(|&d| d == 0.0);
        let any = self.comm.sum(if local.is_some() { 1.0 } else { 0.0 })? > 0.0;
        Ok((local, any))
    }

    /// Start the exchange on every interface before the interior loop runs.
    pub(crate) fn init_interfaces(&self, psi: &[f64], cmpt: usize) -> Result<Vec<PendingExchange>, LduError> {
        self.interfaces
            .iter()
            .map(|c| c.interface.init_update(psi, cmpt))
            .collect()
    }

    /// Complete the exchanges, in interface order.
    pub(crate) fn update_interfaces(
        &self,
        pending: Vec<PendingExchange>,
        y: &mut [f64],
        side: CoeffSide,
    ) -> Result<(), LduError> {
        for (coupling, request) in self.interfaces.iter().zip(pending) {
            let coeffs = match side {
                CoeffSide::Boundary => &coupling.boundary_coeffs,
                CoeffSide::Internal => &coupling.internal_coeffs,
            };
            coupling.interface.complete_update(request, y, coeffs)?;
        }
        Ok(())
    }

    /// Interface contribution alone: `y = −Σ coeffs·remote` per face cell.
    pub(crate) fn interface_product(&self, psi: &[f64], cmpt: usize, y: &mut [f64]) -> Result<(), LduError> {
        y.fill(0.0);
        if self.interfaces.is_empty() {
            return Ok(());
        }
        let pending = self.init_interfaces(psi, cmpt)?;
        self.update_interfaces(pending, y, CoeffSide::Boundary)
    }

    fn check_vectors(&self, context: &'static str, psi: &[f64], y: &[f64]) -> Result<(), LduError> {
        LduError::check_len(context, self.n_cells(), psi.len())?;
        LduError::check_len(context, self.n_cells(), y.len())
    }
}
