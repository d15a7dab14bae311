//! In-process multi-rank communicator over `std::sync::mpsc` channels.
//!
//! Each rank is a `ChannelComm` moved into its own thread. Point-to-point
//! messages are matched on `(source rank, tag)` in arrival order, so two
//! messages with the same source and tag are never overtaken. Reductions are
//! implemented as an all-to-all exchange summed in rank order, which gives the
//! same bits on every rank.

use std::cell::{Cell, RefCell};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use super::{Comm, Tag};
use crate::error::LduError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Point(Tag),
    Reduce(u64),
}

#[derive(Debug)]
enum Payload {
    Scalars(Vec<f64>),
    Labels(Vec<usize>),
}

#[derive(Debug)]
struct Envelope {
    from: usize,
    channel: Channel,
    payload: Payload,
}

pub struct ChannelComm {
    rank: usize,
    peers: Vec<Sender<Envelope>>,
    inbox: Receiver<Envelope>,
    unmatched: RefCell<Vec<Envelope>>,
    reduce_seq: Cell<u64>,
    timeout: Option<Duration>,
}

impl ChannelComm {
    /// Create `n_ranks` connected communicators, index = rank.
    pub fn create(n_ranks: usize) -> Vec<ChannelComm> {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..n_ranks).map(|_| mpsc::channel::<Envelope>()).unzip();
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| ChannelComm {
                rank,
                peers: senders.clone(),
                inbox,
                unmatched: RefCell::new(Vec::new()),
                reduce_seq: Cell::new(0),
                timeout: None,
            })
            .collect()
    }

    /// Fail receives that wait longer than `timeout` instead of blocking forever.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn send(&self, to: usize, channel: Channel, payload: Payload) -> Result<(), LduError> {
        let peer = self.peers.get(to).ok_or_else(|| {
            LduError::CommunicationError(format!(
                "rank {} cannot send to rank {to}: only {} ranks",
                self.rank,
                self.peers.len()
            ))
        })?;
        peer.send(Envelope { from: self.rank, channel, payload }).map_err(|_| {
            LduError::CommunicationError(format!("rank {to} has shut down"))
        })
    }

    fn receive(&self, from: usize, channel: Channel) -> Result<Payload, LduError> {
        {
            let mut unmatched = self.unmatched.borrow_mut();
            if let Some(pos) = unmatched.iter().position(|e| e.from == from && e.channel == channel) {
                return Ok(unmatched.remove(pos).payload);
            }
        }
        loop {
            let envelope = match self.timeout {
                Some(t) => self.inbox.recv_timeout(t).map_err(|e| match e {
                    RecvTimeoutError::Timeout => LduError::CommunicationError(format!(
                        "rank {} timed out after {t:?} waiting for rank {from} ({channel:?})",
                        self.rank
                    )),
                    RecvTimeoutError::Disconnected => LduError::CommunicationError(format!(
                        "rank {} lost all peers waiting for rank {from}",
                        self.rank
                    )),
                })?,
                None => self.inbox.recv().map_err(|_| {
                    LduError::CommunicationError(format!(
                        "rank {} lost all peers waiting for rank {from}",
                        self.rank
                    ))
                })?,
            };
            if envelope.from == from && envelope.channel == channel {
                return Ok(envelope.payload);
            }
            self.unmatched.borrow_mut().push(envelope);
        }
    }
}

impl Comm for ChannelComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn all_reduce(&self, values: &mut [f64]) -> Result<(), LduError> {
        let n = self.size();
        if n == 1 {
            return Ok(());
        }
        let seq = self.reduce_seq.get();
        self.reduce_seq.set(seq + 1);
        let channel = Channel::Reduce(seq);

        for to in (0..n).filter(|&r| r != self.rank) {
            self.send(to, channel, Payload::Scalars(values.to_vec()))?;
        }
        let mut contributions = Vec::with_capacity(n);
        for from in 0..n {
            if from == self.rank {
                contributions.push(values.to_vec());
                continue;
            }
            match self.receive(from, channel)? {
                Payload::Scalars(v) if v.len() == values.len() => contributions.push(v),
                _ => {
                    return Err(LduError::CommunicationError(format!(
                        "malformed reduction message from rank {from}"
                    )));
                }
            }
        }
        for (i, value) in values.iter_mut().enumerate() {
            *value = contributions.iter().fold(0.0, |acc, c| acc + c[i]);
        }
        Ok(())
    }

    fn post_scalars(&self, to: usize, tag: Tag, data: Vec<f64>) -> Result<(), LduError> {
        self.send(to, Channel::Point(tag), Payload::Scalars(data))
    }

    fn receive_scalars(&self, from: usize, tag: Tag) -> Result<Vec<f64>, LduError> {
        match self.receive(from, Channel::Point(tag))? {
            Payload::Scalars(v) => Ok(v),
            Payload::Labels(_) => Err(LduError::CommunicationError(format!(
                "expected scalars from rank {from} (tag {tag}), received labels"
            ))),
        }
    }

    fn post_labels(&self, to: usize, tag: Tag, data: Vec<usize>) -> Result<(), LduError> {
        self.send(to, Channel::Point(tag), Payload::Labels(data))
    }

    fn receive_labels(&self, from: usize, tag: Tag) -> Result<Vec<usize>, LduError> {
        match self.receive(from, Channel::Point(tag))? {
            Payload::Labels(v) => Ok(v),
            Payload::Scalars(_) => Err(LduError::CommunicationError(format!(
                "expected labels from rank {from} (tag {tag}), received scalars"
            ))),
        }
    }
}
