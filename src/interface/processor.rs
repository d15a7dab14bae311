//! Distributed-domain boundary to a neighbouring rank.

use std::rc::Rc;

use super::{
    AgglomeratedInterface, InFlight, LduInterface, PendingExchange, Request, accumulate,
    merge_coarse_faces,
};
use crate::error::LduError;
use crate::parallel::{Comm, Tag};

/// Components per interface tag block; the last slot carries label traffic.
const TAG_STRIDE: Tag = 16;
const LABEL_SLOT: Tag = TAG_STRIDE - 1;

/// Face `i` here is face `i` of the neighbour's matching interface.
pub struct ProcessorInterface {
    face_cells: Vec<usize>,
    neighbour_rank: usize,
    tag: Tag,
    comm: Rc<dyn Comm>,
    in_flight: InFlight,
}

impl std::fmt::Debug for ProcessorInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorInterface")
            .field("rank", &self.comm.rank())
            .field("neighbour_rank", &self.neighbour_rank)
            .field("tag", &self.tag)
            .field("n_faces", &self.face_cells.len())
            .finish()
    }
}

impl ProcessorInterface {
    /// `tag` must be the same on both sides and unique among the interfaces
    /// connecting the two ranks.
    pub fn new(
        face_cells: Vec<usize>,
        neighbour_rank: usize,
        tag: Tag,
        comm: Rc<dyn Comm>,
    ) -> Result<Self, LduError> {
        if neighbour_rank == comm.rank() || neighbour_rank >= comm.size() {
            return Err(LduError::InvalidTopology(format!(
                "processor interface on rank {} cannot couple to rank {neighbour_rank} of {}",
                comm.rank(),
                comm.size()
            )));
        }
        if tag < 0 || tag > Tag::MAX / TAG_STRIDE - 1 {
            return Err(LduError::InvalidTopology(format!("processor interface tag {tag} out of range")));
        }
        Ok(Self { face_cells, neighbour_rank, tag, comm, in_flight: InFlight::default() })
    }

    pub fn neighbour_rank(&self) -> usize {
        self.neighbour_rank
    }

    /// The lower rank orders coarse faces for both sides.
    pub fn master(&self) -> bool {
        self.comm.rank() < self.neighbour_rank
    }

    fn component_tag(&self, cmpt: usize) -> Result<Tag, LduError> {
        if cmpt as Tag >= LABEL_SLOT {
            return Err(LduError::CommunicationError(format!(
                "component {cmpt} exceeds the {LABEL_SLOT} components a processor interface can tag"
            )));
        }
        Ok(self.tag * TAG_STRIDE + cmpt as Tag)
    }
}

impl LduInterface for ProcessorInterface {
    fn type_name(&self) -> &'static str {
        "processor"
    }

    fn face_cells(&self) -> &[usize] {
        &self.face_cells
    }

    fn init_update(&self, psi: &[f64], cmpt: usize) -> Result<PendingExchange, LduError> {
        let tag = self.component_tag(cmpt)?;
        self.in_flight.begin(self.type_name())?;
        let send: Vec<f64> = self.face_cells.iter().map(|&c| psi[c]).collect();
        self.comm.post_scalars(self.neighbour_rank, tag, send)?;
        Ok(PendingExchange {
            request: Request::Remote { from: self.neighbour_rank, tag, len: self.face_cells.len() },
        })
    }

    fn complete_update(
        &self,
        pending: PendingExchange,
        y: &mut [f64],
        coeffs: &[f64],
    ) -> Result<(), LduError> {
        self.in_flight.finish(self.type_name())?;
        match pending.request {
            Request::Remote { from, tag, len } => {
                let remote = self.comm.receive_scalars(from, tag)?;
                if remote.len() != len {
                    return Err(LduError::CommunicationError(format!(
                        "rank {from} sent {} values on tag {tag}, expected {len}",
                        remote.len()
                    )));
                }
                accumulate(self.type_name(), &self.face_cells, &remote, y, coeffs)
            }
            Request::Local(_) => Err(LduError::CommunicationError(
                "processor interface handed a local request".into(),
            )),
        }
    }

    fn agglomerate(&self, restrict_addressing: &[usize]) -> Result<AgglomeratedInterface, LduError> {
        let label_tag = self.tag * TAG_STRIDE + LABEL_SLOT;
        let local: Vec<usize> = self.face_cells.iter().map(|&c| restrict_addressing[c]).collect();
        self.comm.post_labels(self.neighbour_rank, label_tag, local.clone())?;
        let remote = self.comm.receive_labels(self.neighbour_rank, label_tag)?;
        if remote.len() != local.len() {
            return Err(LduError::CommunicationError(format!(
                "rank {} has {} faces on interface tag {}, rank {} has {}",
                self.neighbour_rank,
                remote.len(),
                self.tag,
                self.comm.rank(),
                local.len()
            )));
        }
        let merged = merge_coarse_faces(&local, &remote, self.master());
        let coarse = ProcessorInterface {
            face_cells: merged.local_cells,
            neighbour_rank: self.neighbour_rank,
            tag: self.tag,
            comm: Rc::clone(&self.comm),
            in_flight: InFlight::default(),
        };
        Ok(AgglomeratedInterface { interface: Rc::new(coarse), face_restrict: merged.face_restrict })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::{ChannelComm, SerialComm};
    use std::thread;

    #[test]
    fn rejects_self_coupling() {
        let comm: Rc<dyn Comm> = Rc::new(SerialComm);
        assert!(ProcessorInterface::new(vec![0], 0, 1, comm).is_err());
    }

    #[test]
    fn halo_exchange_between_two_ranks() {
        let handles: Vec<_> = ChannelComm::create(2)
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let rank = comm.rank();
                    let comm: Rc<dyn Comm> = Rc::new(comm);
                    let iface = ProcessorInterface::new(vec![1], 1 - rank, 0, comm).unwrap();
                    let psi = [0.0, 10.0 * (rank + 1) as f64];
                    let mut y = [0.0; 2];
                    let pending = iface.init_update(&psi, 0).unwrap();
                    iface.complete_update(pending, &mut y, &[1.0]).unwrap();
                    y
                })
            })
            .collect();
        let y: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(y[0], [0.0, -20.0]);
        assert_eq!(y[1], [0.0, -10.0]);
    }
}
