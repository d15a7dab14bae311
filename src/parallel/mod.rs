//! Inter-process communication used by interface exchange and global reductions.
//!
//! The numerics are single threaded per rank; the only concurrency is message
//! passing between ranks. `Comm` is object safe so a matrix can hold any back-end
//! behind an `Rc<dyn Comm>`.

use crate::error::LduError;

/// Message tag. Unique per interface and field component.
pub type Tag = i32;

pub trait Comm {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// In-place global sum of `values` over all ranks.
    ///
    /// Every rank receives the same result, summed in ascending rank order.
    fn all_reduce(&self, values: &mut [f64]) -> Result<(), LduError>;

    /// Non-blocking send of scalar data to `to`.
    fn post_scalars(&self, to: usize, tag: Tag, data: Vec<f64>) -> Result<(), LduError>;
    /// Blocking receive of scalar data from `from`.
    fn receive_scalars(&self, from: usize, tag: Tag) -> Result<Vec<f64>, LduError>;

    /// Non-blocking send of integer labels to `to`.
    fn post_labels(&self, to: usize, tag: Tag, data: Vec<usize>) -> Result<(), LduError>;
    /// Blocking receive of integer labels from `from`.
    fn receive_labels(&self, from: usize, tag: Tag) -> Result<Vec<usize>, LduError>;

    /// Global sum of a single value.
    fn sum(&self, x: f64) -> Result<f64, LduError> {
        let mut v = [x];
        self.all_reduce(&mut v)?;
        Ok(v[0])
    }

    /// Global sum of a count.
    fn sum_count(&self, n: usize) -> Result<usize, LduError> {
        Ok(self.sum(n as f64)?.round() as usize)
    }

    fn is_parallel(&self) -> bool {
        self.size() > 1
    }
}

/// Single-rank communicator. Reductions are the identity; point-to-point
/// traffic has nobody to talk to.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialComm;

impl Comm for SerialComm {
    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn all_reduce(&self, _values: &mut [f64]) -> Result<(), LduError> {
        Ok(())
    }
    fn post_scalars(&self, to: usize, tag: Tag, _data: Vec<f64>) -> Result<(), LduError> {
        Err(LduError::CommunicationError(format!(
            "serial run cannot send to rank {to} (tag {tag})"
        )))
    }
    fn receive_scalars(&self, from: usize, tag: Tag) -> Result<Vec<f64>, LduError> {
        Err(LduError::CommunicationError(format!(
            "serial run cannot receive from rank {from} (tag {tag})"
        )))
    }
    fn post_labels(&self, to: usize, tag: Tag, _data: Vec<usize>) -> Result<(), LduError> {
        Err(LduError::CommunicationError(format!(
            "serial run cannot send to rank {to} (tag {tag})"
        )))
    }
    fn receive_labels(&self, from: usize, tag: Tag) -> Result<Vec<usize>, LduError> {
        Err(LduError::CommunicationError(format!(
            "serial run cannot receive from rank {from} (tag {tag})"
        )))
    }
}

pub mod channel_comm;
pub use channel_comm::ChannelComm;

#[cfg(feature = "mpi")]
pub mod mpi_comm;
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_reductions_are_identity() {
        let comm = SerialComm;
        assert_eq!(comm.sum(2.5).unwrap(), 2.5);
        assert_eq!(comm.sum_count(7).unwrap(), 7);
        assert!(!comm.is_parallel());
    }

    #[test]
    fn serial_point_to_point_fails() {
        let comm = SerialComm;
        assert!(matches!(
            comm.post_scalars(1, 0, vec![1.0]),
            Err(LduError::CommunicationError(_))
        ));
        assert!(matches!(comm.receive_labels(1, 0), Err(LduError::CommunicationError(_))));
    }
}

impl std::fmt::Debug for dyn Comm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Comm").field("rank", &self.rank()).field("size", &self.size()).finish()
    }
}
