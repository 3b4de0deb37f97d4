//! Scatter/gather between the workers of a distributed search.
//!
//! Workers share nothing but messages: the root hands each worker its
//! payload and later collects one result from each, in rank order.

use std::any::Any;

use crossbeam_channel::{unbounded, Receiver, Sender};
use mt_types::{config_error, CommError, MtResult};
use tracing::debug;

/// Rank of the coordinating worker.
pub const ROOT: usize = 0;

type Message = Box<dyn Any + Send>;

/// Collective operations used by the coordinator.
///
/// `scatter` and `gather` are collective: every rank of the group must call
/// them in the same order.
pub trait Communicator {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    fn is_root(&self) -> bool {
        self.rank() == ROOT
    }

    /// Root passes exactly `size()` items and keeps the first; every other
    /// rank passes `None` and receives the item at its rank. Every rank must
    /// use the same `T`; a mismatch is only detected when the item arrives.
    fn scatter<T: Send + 'static>(&self, items: Option<Vec<T>>) -> MtResult<T>;

    /// Root receives every rank's item in rank order; other ranks get `None`.
    /// As with `scatter`, every rank must use the same `T`.
    fn gather<T: Send + 'static>(&self, item: T) -> MtResult<Option<Vec<T>>>;
}

/// Single-worker group.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialCommunicator;

impl Communicator for SerialCommunicator {
    fn rank(&self) -> usize {
        ROOT
    }

    fn size(&self) -> usize {
        1
    }

    fn scatter<T: Send + 'static>(&self, items: Option<Vec<T>>) -> MtResult<T> {
        let mut items = items.ok_or(CommError::MissingScatterItems)?;
        if items.len() != 1 {
            return Err(CommError::ScatterCount {
                expected: 1,
                actual: items.len(),
            }
            .into());
        }
        items.pop().ok_or_else(|| CommError::MissingScatterItems.into())
    }

    fn gather<T: Send + 'static>(&self, item: T) -> MtResult<Option<Vec<T>>> {
        Ok(Some(vec![item]))
    }
}

enum Link {
    Root {
        to_workers: Vec<Sender<Message>>,
        from_workers: Receiver<(usize, Message)>,
    },
    Worker {
        from_root: Receiver<Message>,
        to_root: Sender<(usize, Message)>,
    },
}

/// Member of an in-process group whose workers talk over channels.
///
/// The root holds no sender to itself, so once every worker has dropped its
/// endpoint a blocked root observes a disconnect instead of hanging.
pub struct ChannelCommunicator {
    rank: usize,
    size: usize,
    link: Link,
}

impl ChannelCommunicator {
    /// Build a connected group of `size` members, indexed by rank.
    pub fn group(size: usize) -> MtResult<Vec<Self>> {
        if size == 0 {
            return Err(config_error!("A worker group needs at least one member"));
        }

        let (result_tx, result_rx) = unbounded();
        let mut to_workers = Vec::with_capacity(size - 1);
        let mut workers = Vec::with_capacity(size - 1);
        for rank in 1..size {
            let (tx, rx) = unbounded();
            to_workers.push(tx);
            workers.push(Self {
                rank,
                size,
                link: Link::Worker {
                    from_root: rx,
                    to_root: result_tx.clone(),
                },
            });
        }
        drop(result_tx);

        let mut group = Vec::with_capacity(size);
        group.push(Self {
            rank: ROOT,
            size,
            link: Link::Root {
                to_workers,
                from_workers: result_rx,
            },
        });
        group.extend(workers);

        debug!("Created channel worker group of size {}", size);
        Ok(group)
    }

    fn unpack<T: 'static>(&self, message: Message) -> MtResult<T> {
        message
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| CommError::UnexpectedMessage { rank: self.rank }.into())
    }
}

impl Communicator for ChannelCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn scatter<T: Send + 'static>(&self, items: Option<Vec<T>>) -> MtResult<T> {
        match &self.link {
            Link::Root { to_workers, .. } => {
                let items = items.ok_or(CommError::MissingScatterItems)?;
                if items.len() != self.size {
                    return Err(CommError::ScatterCount {
                        expected: self.size,
                        actual: items.len(),
                    }
                    .into());
                }

                let mut items = items.into_iter();
                let own = items.next().ok_or(CommError::MissingScatterItems)?;
                for (rank, (item, tx)) in items.zip(to_workers).enumerate() {
                    tx.send(Box::new(item))
                        .map_err(|_| CommError::Disconnected { rank: rank + 1 })?;
                }
                Ok(own)
            }
            Link::Worker { from_root, .. } => {
                let message = from_root
                    .recv()
                    .map_err(|_| CommError::Disconnected { rank: ROOT })?;
                self.unpack(message)
            }
        }
    }

    fn gather<T: Send + 'static>(&self, item: T) -> MtResult<Option<Vec<T>>> {
        match &self.link {
            Link::Root { from_workers, .. } => {
                let mut slots: Vec<Option<T>> = (0..self.size).map(|_| None).collect();
                slots[ROOT] = Some(item);

                for _ in 1..self.size {
                    let (rank, message) = from_workers.recv().map_err(|_| {
                        let missing = slots.iter().position(Option::is_none).unwrap_or(ROOT);
                        CommError::Disconnected { rank: missing }
                    })?;
                    if rank >= self.size || slots[rank].is_some() {
                        return Err(CommError::UnexpectedMessage { rank }.into());
                    }
                    slots[rank] = Some(self.unpack(message)?);
                }

                Ok(Some(slots.into_iter().flatten().collect()))
            }
            Link::Worker { to_root, .. } => {
                to_root
                    .send((self.rank, Box::new(item)))
                    .map_err(|_| CommError::Disconnected { rank: ROOT })?;
                Ok(None)
            }
        }
    }
}
