use crate::comm::ProcessGroup;
use crate::config::RunConfig;
use crate::error::Result;
use crate::halo::exchange_halos;
use crate::partition::{PartitionPlan, WorkerPartition};
use crate::protocol::broadcast_header;
use crate::stencil::apply_partition;

/// Rank that loads, scatters, gathers and saves the image.
pub const ROOT_RANK: usize = 0;

/// Two partition buffers with a "current" role that flips every iteration.
///
/// The current slot is read (after its halos are refreshed); the other slot
/// receives the kernel output. Swapping only flips the index.
pub struct DoubleBuffer {
    slots: [WorkerPartition; 2],
    current: usize,
}

impl DoubleBuffer {
    /// Wrap `initial` as the current slot and allocate a scratch slot of the
    /// same geometry.
    pub fn new(initial: WorkerPartition) -> Result<Self> {
        let scratch = WorkerPartition::new(
            initial.width(),
            initial.leading_rows(),
            initial.own_row_count(),
            initial.trailing_rows(),
        )?;
        Ok(DoubleBuffer {
            slots: [initial, scratch],
            current: 0,
        })
    }

    pub fn current(&self) -> &WorkerPartition {
        &self.slots[self.current]
    }

    pub fn current_mut(&mut self) -> &mut WorkerPartition {
        &mut self.slots[self.current]
    }

    /// Borrow the current slot for reading and the other slot for writing.
    pub fn split(&mut self) -> (&WorkerPartition, &mut WorkerPartition) {
        let (first, second) = self.slots.split_at_mut(1);
        if self.current == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        }
    }

    pub fn swap(&mut self) {
        self.current ^= 1;
    }

    pub fn into_current(self) -> WorkerPartition {
        let [a, b] = self.slots;
        if self.current == 0 {
            a
        } else {
            b
        }
    }
}

pub struct Worker<G: ProcessGroup> {
    rank: usize,
    group: G,
}

impl<G: ProcessGroup> Worker<G> {
    /// Create a new worker
    pub fn new(group: G) -> Self {
        let rank = group.rank();
        Worker { rank, group }
    }

    /// Get the worker's rank
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn group(&self) -> &G {
        &self.group
    }

    /// Run `config.iterations` rounds of halo exchange, kernel application,
    /// buffer swap and barrier over this rank's partition.
    pub fn iterate(
        &self,
        partition: WorkerPartition,
        config: &RunConfig,
        halo_rows: usize,
    ) -> Result<WorkerPartition> {
        let _span = tracing::debug_span!(
            "iterate",
            rank = self.rank,
            iterations = config.iterations
        )
        .entered();

        let mut buffers = DoubleBuffer::new(partition)?;
        for iteration in 0..config.iterations {
            exchange_halos(&self.group, buffers.current_mut(), halo_rows)?;
            let (current, next) = buffers.split();
            apply_partition(next, current, &config.kernel);
            buffers.swap();
            // Neighbours read this iteration's output in the next exchange.
            self.group.barrier()?;
            tracing::debug!(
                rank = self.rank,
                iteration = iteration + 1,
                "iteration complete"
            );
        }
        Ok(buffers.into_current())
    }

    /// Take part in a run driven by the coordinator: receive the run header
    /// and this rank's rows, iterate, and send the rows back.
    pub fn process_work(&self) -> Result<()> {
        tracing::debug!(rank = self.rank, "waiting for run header");
        let header = broadcast_header(&self.group, ROOT_RANK, None)?;
        let plan = PartitionPlan::new(
            header.width,
            header.height,
            self.group.size(),
            header.config.kernel.dimension(),
        )?;

        let mut partition = plan.allocate_partition(self.rank)?;
        self.group
            .scatter_varcount(ROOT_RANK, &[], &[], &[], partition.own_bytes_mut())?;
        tracing::debug!(
            rank = self.rank,
            rows = partition.own_row_count(),
            "received partition"
        );

        let partition = self.iterate(partition, &header.config, plan.halo_rows())?;

        self.group
            .gather_varcount(ROOT_RANK, partition.own_bytes(), &mut [], &[], &[])?;
        tracing::debug!(rank = self.rank, "work complete");
        Ok(())
    }
}
