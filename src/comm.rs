//! Process-group abstraction used by the convolution engine.
//!
//! A group is a fixed set of ranks `0..size` that exchange byte payloads.
//! Two implementations exist: `LocalGroup` (one thread per rank, in-process
//! rendezvous channels) and `MpiGroup` in `mpi_utils` (requires the
//! `distributed` feature and an MPI installation).

use crate::error::{ConvolveError, Result};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;

// Message tags
pub const TAG_BROADCAST: i32 = 1;
pub const TAG_SCATTER: i32 = 2;
pub const TAG_HALO: i32 = 3;
pub const TAG_GATHER: i32 = 4;
pub const TAG_BARRIER: i32 = 5;

/// Collective and point-to-point operations over a group of ranks.
///
/// All sends and receives block. Variable-count collectives take byte counts
/// and byte displacements into the root's buffer; non-root ranks ignore the
/// root-side buffer and layout arguments.
pub trait ProcessGroup {
    /// This process's rank.
    fn rank(&self) -> usize;

    /// Number of ranks in the group.
    fn size(&self) -> usize;

    /// Copy `buf` from `root` into `buf` on every rank.
    fn broadcast(&self, root: usize, buf: &mut [u8]) -> Result<()>;

    /// Send `send[displs[r]..displs[r] + counts[r]]` from `root` to each rank
    /// `r`, which receives it into `recv`.
    fn scatter_varcount(
        &self,
        root: usize,
        send: &[u8],
        counts: &[usize],
        displs: &[usize],
        recv: &mut [u8],
    ) -> Result<()>;

    /// Blocking point-to-point send.
    fn send(&self, dest: usize, tag: i32, data: &[u8]) -> Result<()>;

    /// Blocking point-to-point receive of exactly `buf.len()` bytes.
    fn receive_into(&self, source: usize, tag: i32, buf: &mut [u8]) -> Result<()>;

    /// Inverse of `scatter_varcount`: every rank's `send` lands at its
    /// displacement in `recv` on `root`.
    fn gather_varcount(
        &self,
        root: usize,
        send: &[u8],
        recv: &mut [u8],
        counts: &[usize],
        displs: &[usize],
    ) -> Result<()>;

    /// Return only once every rank has entered the barrier.
    fn barrier(&self) -> Result<()>;
}

/// Check that a variable-count layout has one entry per rank and fits `total`.
pub fn check_layout(size: usize, counts: &[usize], displs: &[usize], total: usize) -> Result<()> {
    if counts.len() != size || displs.len() != size {
        return Err(ConvolveError::Comm(format!(
            "Layout has {} counts and {} displacements for {} ranks",
            counts.len(),
            displs.len(),
            size
        )));
    }
    for (rank, (&count, &displ)) in counts.iter().zip(displs).enumerate() {
        if displ + count > total {
            return Err(ConvolveError::Comm(format!(
                "Rank {} range {}..{} exceeds buffer of {} bytes",
                rank,
                displ,
                displ + count,
                total
            )));
        }
    }
    Ok(())
}

struct Envelope {
    tag: i32,
    payload: Vec<u8>,
}

/// In-process group: each rank runs on its own thread.
///
/// Every ordered pair of ranks has a zero-capacity channel, so a send only
/// completes once the peer receives it. When a rank finishes or fails its
/// channel ends are dropped and peers blocked on it get
/// `ConvolveError::PeerDisconnected`.
pub struct LocalGroup {
    rank: usize,
    size: usize,
    // Indexed by destination rank.
    outboxes: Vec<Option<SyncSender<Envelope>>>,
    // Indexed by source rank.
    inboxes: Vec<Option<Receiver<Envelope>>>,
}

impl LocalGroup {
    /// Create the handles for a group of `size` ranks, in rank order.
    pub fn create(size: usize) -> Result<Vec<LocalGroup>> {
        if size == 0 {
            return Err(ConvolveError::Config("Need at least one worker".to_string()));
        }
        let mut groups: Vec<LocalGroup> = (0..size)
            .map(|rank| LocalGroup {
                rank,
                size,
                outboxes: (0..size).map(|_| None).collect(),
                inboxes: (0..size).map(|_| None).collect(),
            })
            .collect();
        for src in 0..size {
            for dst in 0..size {
                if src == dst {
                    continue;
                }
                let (tx, rx) = mpsc::sync_channel(0);
                groups[src].outboxes[dst] = Some(tx);
                groups[dst].inboxes[src] = Some(rx);
            }
        }
        Ok(groups)
    }

    /// Run `f` once per rank on scoped threads and collect the results in
    /// rank order.
    ///
    /// If any rank fails, the first error that is not a knock-on disconnect
    /// is returned.
    pub fn run<T, F>(size: usize, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(LocalGroup) -> Result<T> + Sync,
    {
        let groups = Self::create(size)?;
        let f = &f;
        let outcomes: Vec<Result<T>> = thread::scope(|scope| {
            let handles: Vec<_> = groups
                .into_iter()
                .map(|group| {
                    let rank = group.rank;
                    let handle = thread::Builder::new()
                        .name(format!("rank-{}", rank))
                        .spawn_scoped(scope, move || f(group));
                    (rank, handle)
                })
                .collect();
            handles
                .into_iter()
                .map(|(rank, handle)| match handle {
                    Ok(handle) => handle.join().unwrap_or_else(|_| {
                        Err(ConvolveError::Comm(format!("Rank {} panicked", rank)))
                    }),
                    Err(e) => Err(ConvolveError::Io(e)),
                })
                .collect()
        });

        let mut results = Vec::with_capacity(size);
        let mut first_error: Option<ConvolveError> = None;
        for outcome in outcomes {
            match outcome {
                Ok(value) => results.push(value),
                Err(e) => {
                    let replace = match (&first_error, &e) {
                        (None, _) => true,
                        (
                            Some(ConvolveError::PeerDisconnected(_)),
                            ConvolveError::PeerDisconnected(_),
                        ) => false,
                        (Some(ConvolveError::PeerDisconnected(_)), _) => true,
                        _ => false,
                    };
                    if replace {
                        first_error = Some(e);
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }

    fn outbox(&self, dest: usize) -> Result<&SyncSender<Envelope>> {
        self.outboxes
            .get(dest)
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                ConvolveError::Comm(format!("Rank {} cannot send to rank {}", self.rank, dest))
            })
    }

    fn inbox(&self, source: usize) -> Result<&Receiver<Envelope>> {
        self.inboxes
            .get(source)
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                ConvolveError::Comm(format!(
                    "Rank {} cannot receive from rank {}",
                    self.rank, source
                ))
            })
    }
}

impl ProcessGroup for LocalGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn broadcast(&self, root: usize, buf: &mut [u8]) -> Result<()> {
        if self.rank == root {
            for dest in (0..self.size).filter(|&r| r != root) {
                self.send(dest, TAG_BROADCAST, buf)?;
            }
            Ok(())
        } else {
            self.receive_into(root, TAG_BROADCAST, buf)
        }
    }

    fn scatter_varcount(
        &self,
        root: usize,
        send: &[u8],
        counts: &[usize],
        displs: &[usize],
        recv: &mut [u8],
    ) -> Result<()> {
        if self.rank != root {
            return self.receive_into(root, TAG_SCATTER, recv);
        }
        check_layout(self.size, counts, displs, send.len())?;
        for dest in 0..self.size {
            let chunk = &send[displs[dest]..displs[dest] + counts[dest]];
            if dest == root {
                if recv.len() != chunk.len() {
                    return Err(ConvolveError::Comm(format!(
                        "Root receive buffer is {} bytes, expected {}",
                        recv.len(),
                        chunk.len()
                    )));
                }
                recv.copy_from_slice(chunk);
            } else {
                self.send(dest, TAG_SCATTER, chunk)?;
            }
        }
        Ok(())
    }

    fn send(&self, dest: usize, tag: i32, data: &[u8]) -> Result<()> {
        self.outbox(dest)?
            .send(Envelope {
                tag,
                payload: data.to_vec(),
            })
            .map_err(|_| ConvolveError::PeerDisconnected(dest))
    }

    fn receive_into(&self, source: usize, tag: i32, buf: &mut [u8]) -> Result<()> {
        let envelope = self
            .inbox(source)?
            .recv()
            .map_err(|_| ConvolveError::PeerDisconnected(source))?;
        if envelope.tag != tag {
            return Err(ConvolveError::Comm(format!(
                "Rank {} expected tag {} from rank {}, got {}",
                self.rank, tag, source, envelope.tag
            )));
        }
        if envelope.payload.len() != buf.len() {
            return Err(ConvolveError::Comm(format!(
                "Rank {} expected {} bytes from rank {}, got {}",
                self.rank,
                buf.len(),
                source,
                envelope.payload.len()
            )));
        }
        buf.copy_from_slice(&envelope.payload);
        Ok(())
    }

    fn gather_varcount(
        &self,
        root: usize,
        send: &[u8],
        recv: &mut [u8],
        counts: &[usize],
        displs: &[usize],
    ) -> Result<()> {
        if self.rank != root {
            return self.send(root, TAG_GATHER, send);
        }
        check_layout(self.size, counts, displs, recv.len())?;
        for source in 0..self.size {
            let chunk = &mut recv[displs[source]..displs[source] + counts[source]];
            if source == root {
                if send.len() != chunk.len() {
                    return Err(ConvolveError::Comm(format!(
                        "Root send buffer is {} bytes, expected {}",
                        send.len(),
                        chunk.len()
                    )));
                }
                chunk.copy_from_slice(send);
            } else {
                self.receive_into(source, TAG_GATHER, chunk)?;
            }
        }
        Ok(())
    }

    fn barrier(&self) -> Result<()> {
        // Everyone checks in with rank 0, then rank 0 releases everyone.
        if self.size == 1 {
            return Ok(());
        }
        if self.rank == 0 {
            for source in 1..self.size {
                self.receive_into(source, TAG_BARRIER, &mut [])?;
            }
            for dest in 1..self.size {
                self.send(dest, TAG_BARRIER, &[])?;
            }
            Ok(())
        } else {
            self.send(0, TAG_BARRIER, &[])?;
            self.receive_into(0, TAG_BARRIER, &mut [])
        }
    }
}
