/// MPI-based communicator.
///
/// Implements `Comm` over the `mpi` crate for distributed-memory runs, one mesh
/// partition per process. Sends use MPI buffered mode so `post_*` returns as
/// soon as the data is copied into the attached buffer; receives block until the
/// matching message arrives. There is no timeout: a rank that never answers
/// blocks its peers, which is left to the job supervisor.
///
/// # Example
/// ```no_run
/// # #[cfg(feature = "mpi")] {
/// use ldusolve::parallel::{Comm, MpiComm};
/// let comm = MpiComm::new(1 << 24).expect("MPI already initialised");
/// println!("Rank: {} / {}", comm.rank(), comm.size());
/// # }
/// ```

#[cfg(feature = "mpi")]
use mpi::collective::SystemOperation;
#[cfg(feature = "mpi")]
use mpi::environment::Universe;
#[cfg(feature = "mpi")]
use mpi::topology::SimpleCommunicator;
#[cfg(feature = "mpi")]
use mpi::traits::*;

#[cfg(feature = "mpi")]
use super::{Comm, Tag};
#[cfg(feature = "mpi")]
use crate::error::LduError;

/// MPI world communicator; keeps the universe alive for the life of the run.
#[cfg(feature = "mpi")]
pub struct MpiComm {
    _universe: Universe,
    world: SimpleCommunicator,
    rank: usize,
    size: usize,
}

#[cfg(feature = "mpi")]
impl MpiComm {
    /// Initialise MPI and attach a send buffer of `buffer_bytes`.
    ///
    /// Returns `None` if MPI was already initialised.
    pub fn new(buffer_bytes: usize) -> Option<Self> {
        let mut universe = mpi::initialize()?;
        universe.set_buffer_size(buffer_bytes);
        let world = universe.world();
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        Some(MpiComm { _universe: universe, world, rank, size })
    }
}

#[cfg(feature = "mpi")]
impl Comm for MpiComm {
    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }

    fn all_reduce(&self, values: &mut [f64]) -> Result<(), LduError> {
        let local = values.to_vec();
        self.world.all_reduce_into(&local[..], values, &SystemOperation::sum());
        Ok(())
    }

    fn post_scalars(&self, to: usize, tag: Tag, data: Vec<f64>) -> Result<(), LduError> {
        self.world.process_at_rank(to as i32).buffered_send_with_tag(&data[..], tag);
        Ok(())
    }

    fn receive_scalars(&self, from: usize, tag: Tag) -> Result<Vec<f64>, LduError> {
        let (data, _status) = self.world.process_at_rank(from as i32).receive_vec_with_tag::<f64>(tag);
        Ok(data)
    }

    fn post_labels(&self, to: usize, tag: Tag, data: Vec<usize>) -> Result<(), LduError> {
        let wide: Vec<u64> = data.into_iter().map(|l| l as u64).collect();
        self.world.process_at_rank(to as i32).buffered_send_with_tag(&wide[..], tag);
        Ok(())
    }

    fn receive_labels(&self, from: usize, tag: Tag) -> Result<Vec<usize>, LduError> {
        let (data, _status) = self.world.process_at_rank(from as i32).receive_vec_with_tag::<u64>(tag);
        Ok(data.into_iter().map(|l| l as usize).collect())
    }
}
