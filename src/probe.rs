//! Black-box measurements of an encryption oracle: block size, ECB or not,
//! how much fixed prefix sits in front of the input, and how long the
//! hidden suffix is.

use std::cmp;
use std::collections::{HashMap, HashSet};

use rand::{thread_rng, Rng};
use serialize::hex::ToHex;
use thiserror::Error;
use tracing::debug;

use crate::oracle::Oracle;

/// Longest input growth tried before giving up on block size discovery.
/// PKCS#7 cannot describe blocks longer than 255 bytes.
pub const MAX_BLOCK_SIZE: usize = 256;

const DEFAULT_REPETITIONS: usize = 100;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProbeError {
    #[error("no block size found after {0} input lengths")]
    BlockSizeNotFound(usize),
    #[error("invalid block size {0}")]
    InvalidBlockSize(usize),
    #[error("magic block never appeared")]
    MagicBlockNotFound,
    #[error("ciphertext lengths inconsistent with a prefix of {0} bytes")]
    InconsistentLength(usize),
}

/// Grow the input one byte at a time from a single byte until the
/// ciphertext gets longer; the jump is the block size.
pub fn discover_block_size<O: Oracle + ?Sized>(oracle: &O) -> Result<usize, ProbeError> {
    let mut input = vec![0_u8; 1];
    let start = oracle.encrypt(&input).len();

    for _ in 0..MAX_BLOCK_SIZE {
        input.push(0);
        let n = oracle.encrypt(&input).len();
        if n < start {
            return Err(ProbeError::BlockSizeNotFound(input.len()));
        }
        if n != start {
            let block_size = n - start;
            debug!(block_size, "discovered block size");
            return Ok(block_size);
        }
    }

    Err(ProbeError::BlockSizeNotFound(MAX_BLOCK_SIZE))
}

pub fn repeated_blocks(data: &[u8], blocksize: usize) -> usize {
    let mut count = 0;
    let mut set: HashSet<&[u8]> = HashSet::new();
    for chunk in data.chunks(blocksize) {
        if !set.insert(chunk) {
            count += 1;
        }
    }
    count
}

/// Any repeated block means ECB, given the input was chosen to repeat.
pub fn is_ecb_ciphertext(ciphertext: &[u8], blocksize: usize) -> bool {
    repeated_blocks(ciphertext, blocksize) > 0
}

/// Index of the ciphertext most likely produced by ECB, if any of them
/// repeats a block.
pub fn find_ecb_ciphertext<C: AsRef<[u8]>>(ciphertexts: &[C], blocksize: usize) -> Option<usize> {
    ciphertexts.iter()
        .map(|ct| repeated_blocks(ct.as_ref(), blocksize))
        .enumerate()
        .filter(|&(_, n)| n > 0)
        .max_by_key(|&(_, n)| n)
        .map(|(i, _)| i)
}

pub fn is_ecb_oracle<O: Oracle + ?Sized>(oracle: &O) -> bool {
    match discover_block_size(oracle) {
        Ok(bs) => is_ecb_oracle_with(oracle, bs),
        Err(_) => false,
    }
}

/// Three blocks of one repeated byte hold at least two aligned identical
/// blocks no matter how the fixed prefix falls.
pub fn is_ecb_oracle_with<O: Oracle + ?Sized>(oracle: &O, blocksize: usize) -> bool {
    if blocksize <= 1 {
        return false;
    }
    let input = vec![0_u8; 3 * blocksize];
    let ct = oracle.encrypt(&input);
    is_ecb_ciphertext(&ct, blocksize)
}

/// Length of the fixed prefix an ECB oracle puts in front of the input.
pub fn discover_prefix_length<O: Oracle + ?Sized>(oracle: &O, blocksize: usize) -> Result<usize, ProbeError> {
    if blocksize == 0 {
        return Err(ProbeError::InvalidBlockSize(blocksize));
    }
    let mut reference = vec![0_u8; blocksize];
    thread_rng().fill(&mut reference[..]);
    discover_prefix_length_with(oracle, &reference, DEFAULT_REPETITIONS)
}

/// Prefix discovery around a caller-chosen reference block.
///
/// Repeating `reference` many times makes one rotation of it land on a
/// block boundary over and over, so its ciphertext (the magic block) is
/// the most common block that depends on the input. Then
/// `reference || reference[..pad]` is submitted for growing `pad`: the
/// first time the magic block shows up built from exactly
/// `input[pad..pad + blocksize]`, `pad` input bytes were needed to reach
/// the boundary, and the magic block's offset minus `pad` is where the
/// input began.
pub fn discover_prefix_length_with<O: Oracle + ?Sized>(
    oracle: &O,
    reference: &[u8],
    repetitions: usize,
) -> Result<usize, ProbeError> {
    let blocksize = reference.len();
    if blocksize == 0 {
        return Err(ProbeError::InvalidBlockSize(blocksize));
    }

    let magic = find_magic_block(oracle, reference, repetitions)?;
    debug!(magic = %magic.to_hex(), "found magic block");

    for pad in 0..blocksize {
        let mut input = reference.to_vec();
        input.extend_from_slice(&reference[..pad]);
        let output = oracle.encrypt(&input);

        for offset in block_offsets(&output, &magic) {
            if is_input_block(oracle, &input, offset, &magic) {
                if let Some(prefix_len) = offset.checked_sub(pad) {
                    debug!(prefix_len, pad, "discovered prefix length");
                    return Ok(prefix_len);
                }
            }
        }
    }

    Err(ProbeError::MagicBlockNotFound)
}

/// Most frequent ciphertext block among those that change with the input.
///
/// Blocks of pure prefix or pure suffix sit at the same place in the
/// output whatever the input holds, so they are ruled out by comparing
/// against the complemented reference. Of what is left, only the aligned
/// copies of the reference can repeat, and at least `repetitions - 1` of
/// them fit whatever the prefix length.
fn find_magic_block<O: Oracle + ?Sized>(
    oracle: &O,
    reference: &[u8],
    repetitions: usize,
) -> Result<Vec<u8>, ProbeError> {
    let blocksize = reference.len();
    let complement: Vec<u8> = reference.iter().map(|b| !b).collect();

    let output = oracle.encrypt(&reference.repeat(repetitions));
    let other = oracle.encrypt(&complement.repeat(repetitions));

    let mut histogram: HashMap<&[u8], usize> = HashMap::new();
    for (block, flipped) in output.chunks_exact(blocksize).zip(other.chunks_exact(blocksize)) {
        if block != flipped {
            *histogram.entry(block).or_insert(0) += 1;
        }
    }

    let needed = cmp::max(2, repetitions.saturating_sub(1));
    match histogram.into_iter().max_by_key(|&(_, freq)| freq) {
        Some((block, freq)) if freq >= needed => Ok(block.to_vec()),
        _ => Err(ProbeError::MagicBlockNotFound),
    }
}

/// Whether the block at `offset` was built from exactly the last
/// `block.len()` bytes of `input`.
///
/// Flipping the last input byte must change it, so it does not end early
/// (in the prefix, or straddling into the input). Appending a byte must
/// not, so it does not run past the input into matching hidden bytes.
fn is_input_block<O: Oracle + ?Sized>(oracle: &O, input: &[u8], offset: usize, block: &[u8]) -> bool {
    let at = |output: Vec<u8>| output.get(offset..offset + block.len()) == Some(block);

    let mut flipped = input.to_vec();
    if let Some(last) = flipped.last_mut() {
        *last = !*last;
    }
    if at(oracle.encrypt(&flipped)) {
        return false;
    }

    let mut longer = input.to_vec();
    longer.push(!input[input.len() - block.len()]);
    at(oracle.encrypt(&longer))
}

fn block_offsets<'a>(data: &'a [u8], block: &'a [u8]) -> impl Iterator<Item = usize> + 'a {
    data.chunks_exact(block.len())
        .enumerate()
        .filter(move |&(_, b)| b == block)
        .map(move |(j, _)| j * block.len())
}

/// Length of the hidden suffix behind the input, assuming PKCS#7.
///
/// The output grows by a block at the first input length `i` where
/// `prefix_len + secret_len + i` is a whole number of blocks, which is
/// the length of the empty-input ciphertext.
pub fn discover_secret_length<O: Oracle + ?Sized>(
    oracle: &O,
    blocksize: usize,
    prefix_len: usize,
) -> Result<usize, ProbeError> {
    let base = oracle.encrypt(&[]).len();
    for i in 1..=blocksize {
        let input = vec![0_u8; i];
        if oracle.encrypt(&input).len() != base {
            return base.checked_sub(prefix_len + i)
                .ok_or(ProbeError::InconsistentLength(prefix_len));
        }
    }
    Err(ProbeError::BlockSizeNotFound(blocksize))
}
