use clap::Parser;
use distributed_image_convolution::config::{JobConfig, RunConfig};
use distributed_image_convolution::coordinator;
use distributed_image_convolution::kernel::{KernelKind, DEFAULT_KERNEL_INDEX};
use std::path::PathBuf;

/// Apply a convolution kernel to an image, split by rows across workers
#[derive(Parser)]
#[command(name = "convolve", version)]
struct Cli {
    /// Input image
    input: PathBuf,

    /// Output image (format follows the extension)
    output: PathBuf,

    /// Kernel index: 0 SobelY, 1 SobelX, 2-4 Laplacian 1-3, 5 Gaussian
    #[arg(short, long, default_value_t = DEFAULT_KERNEL_INDEX)]
    kernel: usize,

    /// Number of iterations
    #[arg(short, long, default_value_t = 1)]
    iterations: usize,

    /// Number of in-process workers
    #[arg(short, long, default_value_t = 1)]
    workers: usize,

    /// Run on the MPI world instead of in-process workers
    /// (needs the `distributed` feature; launch with mpirun)
    #[arg(long, conflicts_with = "workers")]
    mpi: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let kind = KernelKind::from_index(cli.kernel).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    let run = RunConfig::new(kind.kernel(), cli.iterations);
    let job = JobConfig::new(cli.input, cli.output, run).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    if cli.mpi {
        run_mpi(&job);
        return;
    }

    if let Err(e) = coordinator::run_job_local(&job, cli.workers) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "distributed")]
fn run_mpi(job: &JobConfig) {
    use distributed_image_convolution::mpi_utils::MpiGroup;
    use distributed_image_convolution::worker::{Worker, ROOT_RANK};
    use distributed_image_convolution::{Coordinator, ProcessGroup};

    let universe = mpi::initialize().unwrap_or_else(|| {
        eprintln!("Error: failed to initialize MPI");
        std::process::exit(1);
    });
    let group = MpiGroup::new(universe.world());

    if group.rank() == ROOT_RANK {
        let coordinator = Coordinator::new(group);
        if let Err(e) = coordinator.convolve_file(job) {
            eprintln!("[Coordinator] Error: {}", e);
            drop(coordinator);
            // Other ranks may be blocked in a collective; take them down too.
            universe.world().abort(1);
        }
    } else {
        let worker = Worker::new(group);
        if let Err(e) = worker.process_work() {
            eprintln!("[Worker {}] Error: {}", worker.rank(), e);
            universe.world().abort(1);
        }
    }
}

#[cfg(not(feature = "distributed"))]
fn run_mpi(_job: &JobConfig) {
    eprintln!("Error: built without MPI support; rebuild with --features distributed");
    std::process::exit(1);
}
