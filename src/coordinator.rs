use crate::buffer::Image;
use crate::codec;
use crate::comm::{LocalGroup, ProcessGroup};
use crate::config::{JobConfig, RunConfig};
use crate::error::{ConvolveError, Result};
use crate::partition::PartitionPlan;
use crate::protocol::{broadcast_header, RunHeader};
use crate::worker::{Worker, ROOT_RANK};
use std::time::Instant;

/// Rank 0: owns the full image, distributes rows, computes its own share and
/// reassembles the result.
pub struct Coordinator<G: ProcessGroup> {
    worker: Worker<G>,
}

impl<G: ProcessGroup> Coordinator<G> {
    /// Create a new coordinator
    pub fn new(group: G) -> Self {
        Coordinator {
            worker: Worker::new(group),
        }
    }

    /// Get the number of workers, the coordinator included
    pub fn worker_count(&self) -> usize {
        self.worker.group().size()
    }

    /// Convolve `image` across the whole group and return the gathered result.
    pub fn convolve(&self, mut image: Image, config: &RunConfig) -> Result<Image> {
        let group = self.worker.group();
        if group.rank() != ROOT_RANK {
            return Err(ConvolveError::Config(format!(
                "Coordinator must run on rank {}, not {}",
                ROOT_RANK,
                group.rank()
            )));
        }
        let _span = tracing::info_span!("coordinator", workers = group.size()).entered();

        tracing::info!(
            "Apply kernel '{}' on image with {} x {} pixels for {} iterations",
            config.kernel.name(),
            image.width(),
            image.height(),
            config.iterations
        );

        let header = RunHeader {
            width: image.width(),
            height: image.height(),
            config: config.clone(),
        };
        broadcast_header(group, ROOT_RANK, Some(&header))?;

        let plan = PartitionPlan::new(
            image.width(),
            image.height(),
            group.size(),
            config.kernel.dimension(),
        )?;
        let counts = plan.byte_counts();
        let displs = plan.displacements();
        tracing::debug!(
            workers = plan.worker_count(),
            halo_rows = plan.halo_rows(),
            "partition plan"
        );
        for slice in plan.slices() {
            tracing::debug!(
                rank = slice.rank,
                row_start = slice.row_start,
                rows = slice.rows,
                "worker slice"
            );
        }

        let mut partition = plan.allocate_partition(ROOT_RANK)?;
        group.scatter_varcount(
            ROOT_RANK,
            image.as_bytes(),
            &counts,
            &displs,
            partition.own_bytes_mut(),
        )?;

        let start = Instant::now();
        let partition = self.worker.iterate(partition, config, plan.halo_rows())?;

        group.gather_varcount(
            ROOT_RANK,
            partition.own_bytes(),
            image.as_bytes_mut(),
            &counts,
            &displs,
        )?;
        tracing::info!(
            "{} processes used: {:.6} seconds",
            group.size(),
            start.elapsed().as_secs_f64()
        );

        Ok(image)
    }

    /// Load the input image, convolve it and write the output image.
    pub fn convolve_file(&self, job: &JobConfig) -> Result<()> {
        tracing::info!(input = %job.input.display(), "loading image");
        let image = codec::load_image(&job.input)?;
        let result = self.convolve(image, &job.run)?;
        tracing::info!(output = %job.output.display(), "saving image");
        codec::save_image(&result, &job.output)
    }
}

/// Convolve `image` with `workers` in-process ranks and return the result.
pub fn convolve_local(image: &Image, config: &RunConfig, workers: usize) -> Result<Image> {
    let results = LocalGroup::run(workers, |group| {
        if group.rank() == ROOT_RANK {
            Coordinator::new(group)
                .convolve(image.clone(), config)
                .map(Some)
        } else {
            Worker::new(group).process_work().map(|_| None)
        }
    })?;
    results
        .into_iter()
        .flatten()
        .next()
        .ok_or_else(|| ConvolveError::Comm("Coordinator returned no image".to_string()))
}

/// Run a file-to-file job with `workers` in-process ranks.
pub fn run_job_local(job: &JobConfig, workers: usize) -> Result<()> {
    LocalGroup::run(workers, |group| {
        if group.rank() == ROOT_RANK {
            Coordinator::new(group).convolve_file(job)
        } else {
            Worker::new(group).process_work()
        }
    })?;
    Ok(())
}
