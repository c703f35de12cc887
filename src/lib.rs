pub mod buffer;
pub mod codec;
pub mod comm;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod halo;
pub mod kernel;
#[cfg(feature = "distributed")]
pub mod mpi_utils;
pub mod partition;
pub mod protocol;
pub mod stencil;
pub mod worker;

pub use buffer::{Image, Pixel};
pub use comm::{LocalGroup, ProcessGroup};
pub use config::{JobConfig, RunConfig};
pub use coordinator::{convolve_local, Coordinator};
pub use error::{ConvolveError, Result};
pub use kernel::{Kernel, KernelKind};
pub use partition::PartitionPlan;
pub use worker::Worker;
