//! Row partitioning of an image across workers.
//!
//! Every worker owns a contiguous block of rows. Rows that do not divide
//! evenly go to the lowest ranks, one each. A worker's local buffer holds its
//! own rows plus `halo_rows` of neighbour data on each side that has a
//! neighbour.

use crate::buffer::{Image, Pixel, PIXEL_BYTES};
use crate::error::{ConvolveError, Result};

/// Position of a worker in the row ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Only worker; no neighbours.
    Solo,
    /// Rank 0 of several; successor only.
    First,
    /// Predecessor and successor.
    Interior,
    /// Highest rank of several; predecessor only.
    Last,
}

impl Topology {
    pub fn of(rank: usize, workers: usize) -> Self {
        match (rank == 0, rank + 1 == workers) {
            (true, true) => Topology::Solo,
            (true, false) => Topology::First,
            (false, true) => Topology::Last,
            (false, false) => Topology::Interior,
        }
    }

    pub fn has_predecessor(self) -> bool {
        matches!(self, Topology::Interior | Topology::Last)
    }

    pub fn has_successor(self) -> bool {
        matches!(self, Topology::First | Topology::Interior)
    }
}

/// One worker's share of the full image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSlice {
    pub rank: usize,
    /// First global row owned by this worker.
    pub row_start: usize,
    /// Number of owned rows.
    pub rows: usize,
    /// Bytes of owned pixel data.
    pub byte_count: usize,
    /// Byte offset of the slice in the full image buffer.
    pub displacement: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    width: usize,
    height: usize,
    halo_rows: usize,
    slices: Vec<WorkerSlice>,
}

impl PartitionPlan {
    /// Split `height` rows of `width` pixels across `workers` for a kernel of
    /// `kernel_dimension`.
    pub fn new(
        width: usize,
        height: usize,
        workers: usize,
        kernel_dimension: usize,
    ) -> Result<Self> {
        if workers < 1 {
            return Err(ConvolveError::Config("Need at least one worker".to_string()));
        }
        if width == 0 {
            return Err(ConvolveError::Config("Image width is zero".to_string()));
        }
        if height < workers {
            return Err(ConvolveError::Config(format!(
                "Image height {} is smaller than worker count {}",
                height, workers
            )));
        }
        if kernel_dimension % 2 == 0 {
            return Err(ConvolveError::Config(format!(
                "Kernel dimension must be odd, got {}",
                kernel_dimension
            )));
        }

        let halo_rows = (kernel_dimension - 1) / 2;
        let base = height / workers;
        let remainder = height % workers;
        let row_bytes = width * PIXEL_BYTES;

        let mut slices = Vec::with_capacity(workers);
        let mut row_start = 0;
        for rank in 0..workers {
            let rows = if rank < remainder { base + 1 } else { base };
            slices.push(WorkerSlice {
                rank,
                row_start,
                rows,
                byte_count: rows * row_bytes,
                displacement: row_start * row_bytes,
            });
            row_start += rows;
        }

        // A neighbour's halo must come from a single adjacent worker. Thinner
        // slices would leave halo rows stale and break equality with the
        // single-worker result, so such splits are refused.
        if workers > 1 && base < halo_rows {
            return Err(ConvolveError::Config(format!(
                "Worker {} owns {} rows but the kernel needs {} halo rows; use fewer workers",
                workers - 1,
                base,
                halo_rows
            )));
        }

        Ok(PartitionPlan {
            width,
            height,
            halo_rows,
            slices,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn worker_count(&self) -> usize {
        self.slices.len()
    }

    /// Halo rows exchanged on each side that has a neighbour.
    pub fn halo_rows(&self) -> usize {
        self.halo_rows
    }

    pub fn slices(&self) -> &[WorkerSlice] {
        &self.slices
    }

    pub fn slice(&self, rank: usize) -> Result<&WorkerSlice> {
        self.slices.get(rank).ok_or_else(|| {
            ConvolveError::Config(format!(
                "Rank {} outside plan of {} workers",
                rank,
                self.slices.len()
            ))
        })
    }

    pub fn topology(&self, rank: usize) -> Topology {
        Topology::of(rank, self.slices.len())
    }

    /// Halo rows above the owned block of `rank`.
    pub fn leading_halo(&self, rank: usize) -> usize {
        if self.topology(rank).has_predecessor() {
            self.halo_rows
        } else {
            0
        }
    }

    /// Halo rows below the owned block of `rank`.
    pub fn trailing_halo(&self, rank: usize) -> usize {
        if self.topology(rank).has_successor() {
            self.halo_rows
        } else {
            0
        }
    }

    pub fn row_counts(&self) -> Vec<usize> {
        self.slices.iter().map(|s| s.rows).collect()
    }

    pub fn byte_counts(&self) -> Vec<usize> {
        self.slices.iter().map(|s| s.byte_count).collect()
    }

    pub fn displacements(&self) -> Vec<usize> {
        self.slices.iter().map(|s| s.displacement).collect()
    }

    pub fn total_bytes(&self) -> usize {
        self.width * self.height * PIXEL_BYTES
    }

    /// Allocate an empty local buffer for `rank`.
    pub fn allocate_partition(&self, rank: usize) -> Result<WorkerPartition> {
        let slice = self.slice(rank)?;
        WorkerPartition::new(
            self.width,
            self.leading_halo(rank),
            slice.rows,
            self.trailing_halo(rank),
        )
    }
}

/// A worker's local rows: leading halo, owned rows, trailing halo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPartition {
    image: Image,
    leading: usize,
    own: usize,
    trailing: usize,
}

impl WorkerPartition {
    pub fn new(width: usize, leading: usize, own: usize, trailing: usize) -> Result<Self> {
        Ok(WorkerPartition {
            image: Image::new(width, leading + own + trailing)?,
            leading,
            own,
            trailing,
        })
    }

    pub fn width(&self) -> usize {
        self.image.width()
    }

    /// Allocated rows including halos.
    pub fn total_rows(&self) -> usize {
        self.image.height()
    }

    pub fn own_row_count(&self) -> usize {
        self.own
    }

    pub fn leading_rows(&self) -> usize {
        self.leading
    }

    pub fn trailing_rows(&self) -> usize {
        self.trailing
    }

    pub fn own_pixels(&self) -> &[Pixel] {
        self.block(self.leading, self.own)
    }

    pub fn own_pixels_mut(&mut self) -> &mut [Pixel] {
        self.block_mut(self.leading, self.own)
    }

    pub fn own_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.own_pixels())
    }

    pub fn own_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(self.own_pixels_mut())
    }

    /// First `count` owned rows.
    pub fn first_own_rows(&self, count: usize) -> &[Pixel] {
        self.block(self.leading, count.min(self.own))
    }

    /// Last `count` owned rows.
    pub fn last_own_rows(&self, count: usize) -> &[Pixel] {
        let count = count.min(self.own);
        self.block(self.leading + self.own - count, count)
    }

    pub fn leading_halo(&self) -> &[Pixel] {
        self.block(0, self.leading)
    }

    pub fn leading_halo_mut(&mut self) -> &mut [Pixel] {
        self.block_mut(0, self.leading)
    }

    pub fn trailing_halo(&self) -> &[Pixel] {
        self.block(self.leading + self.own, self.trailing)
    }

    pub fn trailing_halo_mut(&mut self) -> &mut [Pixel] {
        self.block_mut(self.leading + self.own, self.trailing)
    }

    /// Pixels of the whole local buffer, halos included.
    pub fn pixels(&self) -> &[Pixel] {
        self.image.pixels()
    }

    // Row ranges are always inside the allocation by construction.
    fn block(&self, start: usize, count: usize) -> &[Pixel] {
        let width = self.image.width();
        &self.image.pixels()[start * width..(start + count) * width]
    }

    fn block_mut(&mut self, start: usize, count: usize) -> &mut [Pixel] {
        let width = self.image.width();
        &mut self.image.pixels_mut()[start * width..(start + count) * width]
    }
}
