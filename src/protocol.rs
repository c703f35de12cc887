//! Run header broadcast from the coordinator to every worker.
//!
//! Layout: six little-endian u64 words (width, height, iterations, kernel
//! dimension, kernel factor bits, name length), then the kernel coefficients
//! as little-endian i32, then the kernel name as UTF-8.

use crate::comm::ProcessGroup;
use crate::config::RunConfig;
use crate::error::{ConvolveError, Result};
use crate::kernel::Kernel;

const HEADER_WORDS: usize = 6;
const WORD_BYTES: usize = 8;

/// Image geometry and run parameters shared by all ranks.
#[derive(Debug, Clone, PartialEq)]
pub struct RunHeader {
    pub width: usize,
    pub height: usize,
    pub config: RunConfig,
}

fn encode_words(words: &[u64; HEADER_WORDS]) -> [u8; HEADER_WORDS * WORD_BYTES] {
    let mut out = [0u8; HEADER_WORDS * WORD_BYTES];
    for (chunk, word) in out.chunks_exact_mut(WORD_BYTES).zip(words) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    out
}

fn decode_words(bytes: &[u8; HEADER_WORDS * WORD_BYTES]) -> [u64; HEADER_WORDS] {
    let mut words = [0u64; HEADER_WORDS];
    for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(WORD_BYTES)) {
        let mut raw = [0u8; WORD_BYTES];
        raw.copy_from_slice(chunk);
        *word = u64::from_le_bytes(raw);
    }
    words
}

fn to_usize(value: u64, what: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| ConvolveError::Comm(format!("Header field {} out of range: {}", what, value)))
}

/// Broadcast the header from `root`. Only the root's `header` is read; every
/// rank gets the root's header back.
pub fn broadcast_header<G: ProcessGroup + ?Sized>(
    group: &G,
    root: usize,
    header: Option<&RunHeader>,
) -> Result<RunHeader> {
    let is_root = group.rank() == root;
    let header = match (is_root, header) {
        (true, Some(h)) => Some(h),
        (true, None) => {
            return Err(ConvolveError::Config(
                "Root rank must supply the run header".to_string(),
            ))
        }
        (false, _) => None,
    };

    let mut fixed = match header {
        Some(h) => encode_words(&[
            h.width as u64,
            h.height as u64,
            h.config.iterations as u64,
            h.config.kernel.dimension() as u64,
            h.config.kernel.factor().to_bits() as u64,
            h.config.kernel.name().len() as u64,
        ]),
        None => [0u8; HEADER_WORDS * WORD_BYTES],
    };
    group.broadcast(root, &mut fixed)?;
    let words = decode_words(&fixed);

    let width = to_usize(words[0], "width")?;
    let height = to_usize(words[1], "height")?;
    let iterations = to_usize(words[2], "iterations")?;
    let dimension = to_usize(words[3], "kernel dimension")?;
    let factor_bits = u32::try_from(words[4])
        .map_err(|_| ConvolveError::Comm(format!("Bad kernel factor bits: {}", words[4])))?;
    let name_len = to_usize(words[5], "kernel name length")?;

    let mut coefficients = match header {
        Some(h) => h
            .config
            .kernel
            .coefficients()
            .iter()
            .flat_map(|c| c.to_le_bytes())
            .collect::<Vec<u8>>(),
        None => vec![0u8; dimension * dimension * 4],
    };
    group.broadcast(root, &mut coefficients)?;

    let mut name = match header {
        Some(h) => h.config.kernel.name().as_bytes().to_vec(),
        None => vec![0u8; name_len],
    };
    group.broadcast(root, &mut name)?;

    let coefficients: Vec<i32> = coefficients
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    let name = String::from_utf8(name)
        .map_err(|e| ConvolveError::Comm(format!("Kernel name is not UTF-8: {}", e)))?;
    let kernel = Kernel::new(name, dimension, coefficients, f32::from_bits(factor_bits))?;

    Ok(RunHeader {
        width,
        height,
        config: RunConfig::new(kernel, iterations),
    })
}
