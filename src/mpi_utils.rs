//! MPI backend for the process group.
//!
//! Requires the `distributed` feature and an MPI installation. The caller
//! initializes MPI and keeps the universe alive for the whole run:
//!
//! ```ignore
//! let universe = mpi::initialize().expect("MPI init failed");
//! let group = MpiGroup::new(universe.world());
//! ```

use crate::comm::{check_layout, ProcessGroup};
use crate::error::{ConvolveError, Result};
use mpi::datatype::{Partition, PartitionMut};
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;
use mpi::Count;

/// Process group backed by an MPI communicator.
pub struct MpiGroup {
    world: SimpleCommunicator,
}

impl MpiGroup {
    pub fn new(world: SimpleCommunicator) -> Self {
        MpiGroup { world }
    }
}

/// Convert byte counts or displacements to MPI counts
fn to_counts(values: &[usize]) -> Result<Vec<Count>> {
    values
        .iter()
        .map(|&v| {
            Count::try_from(v).map_err(|_| {
                ConvolveError::Comm(format!("{} bytes exceed the MPI count range", v))
            })
        })
        .collect()
}

impl ProcessGroup for MpiGroup {
    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn broadcast(&self, root: usize, buf: &mut [u8]) -> Result<()> {
        let root_process = self.world.process_at_rank(root as i32);
        root_process.broadcast_into(buf);
        Ok(())
    }

    fn scatter_varcount(
        &self,
        root: usize,
        send: &[u8],
        counts: &[usize],
        displs: &[usize],
        recv: &mut [u8],
    ) -> Result<()> {
        let root_process = self.world.process_at_rank(root as i32);
        if self.rank() == root {
            check_layout(self.size(), counts, displs, send.len())?;
            let partition = Partition::new(send, to_counts(counts)?, to_counts(displs)?);
            root_process.scatter_varcount_into_root(&partition, recv);
        } else {
            root_process.scatter_varcount_into(recv);
        }
        Ok(())
    }

    fn send(&self, dest: usize, tag: i32, data: &[u8]) -> Result<()> {
        let dest_process = self.world.process_at_rank(dest as i32);
        dest_process.send_with_tag(data, tag);
        Ok(())
    }

    fn receive_into(&self, source: usize, tag: i32, buf: &mut [u8]) -> Result<()> {
        let source_process = self.world.process_at_rank(source as i32);
        let status = source_process.receive_into_with_tag(buf, tag);
        let received = status.count(u8::equivalent_datatype()) as usize;
        if received != buf.len() {
            return Err(ConvolveError::Comm(format!(
                "Expected {} bytes from rank {}, got {}",
                buf.len(),
                source,
                received
            )));
        }
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
        let root_process = self.world.process_at_rank(root as i32);
        if self.rank() == root {
            check_layout(self.size(), counts, displs, recv.len())?;
            let mut partition = PartitionMut::new(recv, to_counts(counts)?, to_counts(displs)?);
            root_process.gather_varcount_into_root(send, &mut partition);
        } else {
            root_process.gather_varcount_into(send);
        }
        Ok(())
    }

    fn barrier(&self) -> Result<()> {
        self.world.barrier();
        Ok(())
    }
}
