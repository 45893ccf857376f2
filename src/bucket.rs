//! Segregated free-list bucket indexing.
//!
//! Free blocks are segregated by size into [`NUM_BUCKETS`] classes. Sizes
//! below 512 bytes map one-to-one onto an exact size class (`index =
//! s/8 - 1`); sizes at or above 512 bytes fall into power-of-two ranges
//! (`index = floor(log2 s) + 61`). The two schemes leave a small gap of
//! unused indices between the last exact class and the first power-of-two
//! class, which is harmless: those buckets simply never receive blocks.

use crate::align::ALIGNMENT;
use crate::block::MIN_BLOCK_SIZE;

/// Total number of segregated free-list buckets.
pub const NUM_BUCKETS: usize = 128;

/// Search-strategy cutoff: buckets below this index hold a single size
/// class and are checked by head only; buckets at or above it are scanned
/// in full (see [`crate::fit`]).
pub const SMALL_BUCKET_CUTOFF: usize = 45;

/// Size threshold between the exact-size and power-of-two indexing schemes.
const LARGE_SIZE_THRESHOLD: usize = 512;

/// Maps a block size to its segregated-list bucket index.
#[inline]
pub fn bucket_index(size: usize) -> usize {
  debug_assert!(size >= MIN_BLOCK_SIZE, "block below minimum size");
  debug_assert!(size % ALIGNMENT == 0, "unaligned block size");

  let index = if size < LARGE_SIZE_THRESHOLD {
    size / 8 - 1
  } else {
    (usize::BITS - 1 - size.leading_zeros()) as usize + 61
  };
  index.min(NUM_BUCKETS - 1)
}
