//! Border-row exchange between row-adjacent workers.
//!
//! Blocking sends and receives are ordered per topology so that every send
//! meets a receive that is already posted or will be posted next:
//!
//! - first:    send last rows to successor, receive trailing halo from it
//! - interior: receive leading halo from predecessor, send first rows back,
//!             send last rows to successor, receive trailing halo from it
//! - last:     receive leading halo from predecessor, send first rows back
//!
//! Rank `k` therefore always talks to `k + 1` as "send then receive" while
//! `k + 1` talks to `k` as "receive then send", which keeps the chain free of
//! cyclic waits even with rendezvous sends.

use crate::comm::{ProcessGroup, TAG_HALO};
use crate::error::Result;
use crate::partition::{Topology, WorkerPartition};

/// Refresh the halo rows of `partition` from the neighbours of this rank.
pub fn exchange_halos<G: ProcessGroup + ?Sized>(
    group: &G,
    partition: &mut WorkerPartition,
    halo_rows: usize,
) -> Result<()> {
    let rank = group.rank();
    let topology = Topology::of(rank, group.size());
    if halo_rows == 0 || topology == Topology::Solo {
        return Ok(());
    }

    if topology.has_predecessor() {
        let predecessor = rank - 1;
        group.receive_into(
            predecessor,
            TAG_HALO,
            bytemuck::cast_slice_mut(partition.leading_halo_mut()),
        )?;
        group.send(
            predecessor,
            TAG_HALO,
            bytemuck::cast_slice(partition.first_own_rows(halo_rows)),
        )?;
    }

    if topology.has_successor() {
        let successor = rank + 1;
        group.send(
            successor,
            TAG_HALO,
            bytemuck::cast_slice(partition.last_own_rows(halo_rows)),
        )?;
        group.receive_into(
            successor,
            TAG_HALO,
            bytemuck::cast_slice_mut(partition.trailing_halo_mut()),
        )?;
    }

    tracing::trace!(rank, ?topology, halo_rows, "halo exchange done");
    Ok(())
}
