//! Periodic coupling between two patches of the same matrix.

use std::rc::Rc;

use super::{
    AgglomeratedInterface, InFlight, LduInterface, PendingExchange, Request, accumulate,
    check_cells, merge_coarse_faces,
};
use crate::error::LduError;

/// One side of a cyclic pair. Face `i` of this side is coupled to face `i` of
/// the partner, whose adjacent cells are `neighbour_face_cells`.
#[derive(Debug)]
pub struct CyclicInterface {
    face_cells: Vec<usize>,
    neighbour_face_cells: Vec<usize>,
    master: bool,
    in_flight: InFlight,
}

impl CyclicInterface {
    /// Build both sides of a periodic coupling; the first is the master.
    pub fn pair(
        face_cells: Vec<usize>,
        partner_face_cells: Vec<usize>,
    ) -> Result<(CyclicInterface, CyclicInterface), LduError> {
        if face_cells.len() != partner_face_cells.len() {
            return Err(LduError::InvalidTopology(format!(
                "cyclic patches have {} and {} faces",
                face_cells.len(),
                partner_face_cells.len()
            )));
        }
        let master = CyclicInterface {
            face_cells: face_cells.clone(),
            neighbour_face_cells: partner_face_cells.clone(),
            master: true,
            in_flight: InFlight::default(),
        };
        let slave = CyclicInterface {
            face_cells: partner_face_cells,
            neighbour_face_cells: face_cells,
            master: false,
            in_flight: InFlight::default(),
        };
        Ok((master, slave))
    }

    pub fn neighbour_face_cells(&self) -> &[usize] {
        &self.neighbour_face_cells
    }

    pub fn master(&self) -> bool {
        self.master
    }
}

impl LduInterface for CyclicInterface {
    fn type_name(&self) -> &'static str {
        "cyclic"
    }

    fn face_cells(&self) -> &[usize] {
        &self.face_cells
    }

    fn validate(&self, n_cells: usize) -> Result<(), LduError> {
        check_cells(self.type_name(), &self.face_cells, n_cells)?;
        check_cells(self.type_name(), &self.neighbour_face_cells, n_cells)
    }

    fn init_update(&self, psi: &[f64], _cmpt: usize) -> Result<PendingExchange, LduError> {
        self.in_flight.begin(self.type_name())?;
        let values = self.neighbour_face_cells.iter().map(|&c| psi[c]).collect();
        Ok(PendingExchange { request: Request::Local(values) })
    }

    fn complete_update(
        &self,
        pending: PendingExchange,
        y: &mut [f64],
        coeffs: &[f64],
    ) -> Result<(), LduError> {
        self.in_flight.finish(self.type_name())?;
        match pending.request {
            Request::Local(values) => accumulate(self.type_name(), &self.face_cells, &values, y, coeffs),
            Request::Remote { .. } => Err(LduError::CommunicationError(
                "cyclic interface handed a remote request".into(),
            )),
        }
    }

    fn agglomerate(&self, restrict_addressing: &[usize]) -> Result<AgglomeratedInterface, LduError> {
        let local: Vec<usize> = self.face_cells.iter().map(|&c| restrict_addressing[c]).collect();
        let remote: Vec<usize> = self.neighbour_face_cells.iter().map(|&c| restrict_addressing[c]).collect();
        let merged = merge_coarse_faces(&local, &remote, self.master);
        let coarse = CyclicInterface {
            face_cells: merged.local_cells,
            neighbour_face_cells: merged.remote_cells,
            master: self.master,
            in_flight: InFlight::default(),
        };
        Ok(AgglomeratedInterface { interface: Rc::new(coarse), face_restrict: merged.face_restrict })
    }
}
