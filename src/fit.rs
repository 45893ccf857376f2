//! Fit search: choosing a free block large enough to satisfy a request.
//!
//! Starts two buckets below the request's natural bucket, a deliberate
//! conservative lower bound tolerating small rounding differences between
//! the adjusted request size and the sizes actually living in nearby
//! buckets, then walks upward. Below [`SMALL_BUCKET_CUTOFF`] a bucket is a
//! single exact-size class, so only its head is worth inspecting; at or
//! above the cutoff the bucket spans a size range and must be scanned.

use std::ptr::NonNull;

use crate::block::BlockPtr;
use crate::bucket::{bucket_index, SMALL_BUCKET_CUTOFF};
use crate::freelist::FreeLists;

/// Finds the first free block of size `>= requested`, per §4.4's bucket
/// walk. Does not unlink or modify the block; callers do that via
/// [`crate::placer::place`].
///
/// # Safety
/// `base` must be the arena the blocks in `lists` were linked against.
pub unsafe fn find_fit(base: NonNull<u8>, lists: &FreeLists, requested: usize) -> Option<BlockPtr> {
  let start = bucket_index(requested).saturating_sub(2);

  for bucket in start..crate::bucket::NUM_BUCKETS {
    let head = match lists.head_of_bucket(bucket) {
      Some(head) => head,
      None => continue,
    };

    if bucket < SMALL_BUCKET_CUTOFF {
      let size = unsafe { head.size(base) };
      if size >= requested {
        return Some(head);
      }
      continue;
    }

    let mut cursor = Some(head);
    while let Some(block) = cursor {
      let size = unsafe { block.size(base) };
      if size >= requested {
        return Some(block);
      }
      cursor = unsafe { block.next_link(base) };
    }
  }

  None
}
