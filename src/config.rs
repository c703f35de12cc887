use crate::error::{ConvolveError, Result};
use crate::kernel::{Kernel, KernelKind};
use std::path::PathBuf;

/// Everything a worker needs to run the iteration loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub kernel: Kernel,
    pub iterations: usize,
}

impl RunConfig {
    pub fn new(kernel: Kernel, iterations: usize) -> Self {
        RunConfig { kernel, iterations }
    }

    /// Select a catalog kernel by index.
    pub fn from_catalog(kernel_index: usize, iterations: usize) -> Result<Self> {
        let kind = KernelKind::from_index(kernel_index)?;
        Ok(RunConfig::new(kind.kernel(), iterations))
    }
}

/// A complete file-to-file job as seen by the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct JobConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub run: RunConfig,
}

impl JobConfig {
    pub fn new(input: PathBuf, output: PathBuf, run: RunConfig) -> Result<Self> {
        if input.as_os_str().is_empty() {
            return Err(ConvolveError::Config("Missing input path".to_string()));
        }
        if output.as_os_str().is_empty() {
            return Err(ConvolveError::Config("Missing output path".to_string()));
        }
        Ok(JobConfig { input, output, run })
    }
}
