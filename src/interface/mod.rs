//! Coupled boundaries that complete a matrix-vector product through exchange.
//!
//! An interface contributes `y[face_cells[i]] -= coeffs[i] * remote[i]` where
//! `remote` holds the values of `psi` on the other side of face `i`. The exchange
//! happens in two phases so communication overlaps the interior face loop:
//!
//! 1. [`LduInterface::init_update`] gathers the local values and starts the
//!    transfer, returning a [`PendingExchange`] request object.
//! 2. [`LduInterface::complete_update`] consumes the request, waits for the
//!    remote values and accumulates into the result.
//!
//! Each interface tracks its outstanding requests; starting a second exchange
//! before completing the first, or completing with nothing outstanding, is a
//! `CommunicationError`.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::LduError;
use crate::parallel::Tag;

pub mod cyclic;
pub mod processor;

pub use cyclic::CyclicInterface;
pub use processor::ProcessorInterface;

/// Outstanding exchange started by `init_update`.
#[must_use = "an interface exchange must be completed with complete_update"]
#[derive(Debug)]
pub struct PendingExchange {
    pub(crate) request: Request,
}

#[derive(Debug)]
pub(crate) enum Request {
    /// Values already available in-process.
    Local(Vec<f64>),
    /// Values in flight from another rank.
    Remote { from: usize, tag: Tag, len: usize },
}

pub trait LduInterface: fmt::Debug {
    /// Short type name used in diagnostics.
    fn type_name(&self) -> &'static str;

    /// Local cells adjacent to the interface faces.
    fn face_cells(&self) -> &[usize];

    /// Check every cell reference against the size of the owning matrix.
    fn validate(&self, n_cells: usize) -> Result<(), LduError> {
        check_cells(self.type_name(), self.face_cells(), n_cells)
    }

    /// Start the exchange of `psi` for component `cmpt`.
    fn init_update(&self, psi: &[f64], cmpt: usize) -> Result<PendingExchange, LduError>;

    /// Finish the exchange and apply `y[face_cells[i]] -= coeffs[i] * remote[i]`.
    fn complete_update(
        &self,
        pending: PendingExchange,
        y: &mut [f64],
        coeffs: &[f64],
    ) -> Result<(), LduError>;

    /// Build the coarse counterpart of this interface for a GAMG level.
    ///
    /// `restrict_addressing` maps the local fine cells to coarse cells. Both
    /// sides of the coupling must call this collectively.
    fn agglomerate(&self, restrict_addressing: &[usize]) -> Result<AgglomeratedInterface, LduError>;
}

/// Coarse interface plus the map from fine interface faces to coarse faces.
#[derive(Debug, Clone)]
pub struct AgglomeratedInterface {
    pub interface: Rc<dyn LduInterface>,
    pub face_restrict: Vec<usize>,
}

impl AgglomeratedInterface {
    pub fn n_coarse_faces(&self) -> usize {
        self.interface.face_cells().len()
    }

    /// Sum fine face coefficients onto the coarse faces.
    pub fn restrict_coeffs(&self, fine: &[f64]) -> Vec<f64> {
        let mut coarse = vec![0.0; self.n_coarse_faces()];
        for (&cf, &v) in self.face_restrict.iter().zip(fine) {
            coarse[cf] += v;
        }
        coarse
    }
}

/// An interface together with its matrix coefficients.
///
/// `boundary_coeffs` enter `A·x`, `internal_coeffs` enter `Aᵀ·x`.
#[derive(Debug, Clone)]
pub struct InterfaceCoupling {
    pub interface: Rc<dyn LduInterface>,
    pub internal_coeffs: Vec<f64>,
    pub boundary_coeffs: Vec<f64>,
}

impl InterfaceCoupling {
    pub fn new(interface: Rc<dyn LduInterface>, internal_coeffs: Vec<f64>, boundary_coeffs: Vec<f64>) -> Self {
        Self { interface, internal_coeffs, boundary_coeffs }
    }

    /// Coupling whose transpose uses the same coefficients.
    pub fn symmetric(interface: Rc<dyn LduInterface>, coeffs: Vec<f64>) -> Self {
        Self { interface, internal_coeffs: coeffs.clone(), boundary_coeffs: coeffs }
    }
}

/// Outstanding-request counter carried by every interface implementation.
#[derive(Debug, Default)]
pub(crate) struct InFlight(Cell<usize>);

impl InFlight {
    pub(crate) fn begin(&self, type_name: &str) -> Result<(), LduError> {
        if self.0.get() > 0 {
            return Err(LduError::CommunicationError(format!(
                "{type_name} interface: exchange started while a previous request is still outstanding"
            )));
        }
        self.0.set(self.0.get() + 1);
        Ok(())
    }

    pub(crate) fn finish(&self, type_name: &str) -> Result<(), LduError> {
        if self.0.get() == 0 {
            return Err(LduError::CommunicationError(format!(
                "{type_name} interface: complete_update without a matching init_update"
            )));
        }
        self.0.set(self.0.get() - 1);
        Ok(())
    }
}

pub(crate) fn check_cells(type_name: &str, cells: &[usize], n_cells: usize) -> Result<(), LduError> {
    match cells.iter().find(|&&c| c >= n_cells) {
        Some(c) => Err(LduError::InvalidTopology(format!(
            "{type_name} interface references cell {c} outside [0, {n_cells})"
        ))),
        None => Ok(()),
    }
}

/// `y[face_cells[i]] -= coeffs[i] * remote[i]`
pub(crate) fn accumulate(
    type_name: &str,
    face_cells: &[usize],
    remote: &[f64],
    y: &mut [f64],
    coeffs: &[f64],
) -> Result<(), LduError> {
    if remote.len() != face_cells.len() {
        return Err(LduError::CommunicationError(format!(
            "{type_name} interface received {} values for {} faces",
            remote.len(),
            face_cells.len()
        )));
    }
    LduError::check_len("interface coefficients", face_cells.len(), coeffs.len())?;
    for ((&c, &v), &k) in face_cells.iter().zip(remote).zip(coeffs) {
        y[c] -= k * v;
    }
    Ok(())
}

/// Merged coarse faces of a coupled boundary.
pub(crate) struct CoarseFaces {
    pub face_restrict: Vec<usize>,
    pub local_cells: Vec<usize>,
    pub remote_cells: Vec<usize>,
}

/// Merge fine faces whose (local, remote) coarse cell pairs coincide.
///
/// Keys are formed in master orientation so both sides of the coupling number
/// the coarse faces identically.
pub(crate) fn merge_coarse_faces(local: &[usize], remote: &[usize], master: bool) -> CoarseFaces {
    let key = |l: usize, r: usize| if master { (l, r) } else { (r, l) };
    let mut index = BTreeMap::new();
    for (&l, &r) in local.iter().zip(remote) {
        index.insert(key(l, r), 0usize);
    }
    let mut local_cells = Vec::with_capacity(index.len());
    let mut remote_cells = Vec::with_capacity(index.len());
    for (i, (&(a, b), slot)) in index.iter_mut().enumerate() {
        *slot = i;
        let (l, r) = if master { (a, b) } else { (b, a) };
        local_cells.push(l);
        remote_cells.push(r);
    }
    let face_restrict = local.iter().zip(remote).map(|(&l, &r)| index[&key(l, r)]).collect();
    CoarseFaces { face_restrict, local_cells, remote_cells }
}
