//! The public allocator: wires together bucket indexing, free-list
//! bookkeeping, coalescing, placement, fit search, and heap extension into
//! the four operations clients actually call (§4.2).

use std::ptr::NonNull;

use tracing::{debug, error, instrument, trace};

use crate::align::{align_up, D, W};
use crate::block::{BlockPtr, MIN_BLOCK_SIZE};
use crate::check;
use crate::coalesce::coalesce;
use crate::error::AllocInitError;
use crate::extend::extend_heap;
use crate::fit::find_fit;
use crate::freelist::FreeLists;
use crate::heap::HeapProvider;
use crate::placer::place;

/// Bytes requested per heap extension when no free block satisfies a
/// request outright.
pub const CHUNK: usize = 256;

static_assertions::const_assert_eq!(CHUNK % crate::align::ALIGNMENT, 0);

/// A segregated-free-list allocator over a single, growable arena.
///
/// Generic over the [`HeapProvider`] that supplies the arena's raw bytes,
/// the one axis of configuration this design exposes (§2.1); everything
/// else about the layout and policy is fixed by the component design.
pub struct Allocator<H: HeapProvider> {
  base: Option<NonNull<u8>>,
  lists: FreeLists,
  provider: H,
}

impl<H: HeapProvider> Allocator<H> {
  /// Builds an allocator over `provider`, not yet initialized.
  pub fn new(provider: H) -> Self {
    Self {
      base: None,
      lists: FreeLists::new(),
      provider,
    }
  }

  /// Brings the arena up: writes the alignment pad, prologue and
  /// epilogue sentinels, then performs the initial heap extension.
  ///
  /// Idempotent in the sense that calling `init` again resets all
  /// allocator-observable state (bucket heads, current base); see
  /// `DESIGN.md` for the one caveat this has against a provider that
  /// cannot itself be reset.
  #[instrument(level = "debug", skip(self))]
  pub fn init(&mut self) -> Result<(), AllocInitError> {
    let slab_bytes = 4 * W;
    let slab = self.provider.request_more(slab_bytes).ok_or_else(|| {
      error!(slab_bytes, "heap provider refused the initial slab");
      AllocInitError::ProviderExhausted {
        requested_bytes: slab_bytes,
      }
    })?;

    self.lists = FreeLists::new();
    self.base = Some(slab);

    unsafe {
      BlockPtr::from_offset(crate::block::PROLOGUE_OFFSET).set_tags(slab, D, true);
      BlockPtr::from_offset(crate::block::FIRST_BLOCK_OFFSET).set_epilogue(slab);
    }

    let initial_words = CHUNK / W;
    if unsafe { extend_heap(slab, &mut self.lists, &mut self.provider, initial_words) }
      .is_none()
    {
      error!(bytes = CHUNK, "heap provider refused the initial chunk");
      self.base = None;
      return Err(AllocInitError::ProviderExhausted {
        requested_bytes: CHUNK,
      });
    }

    debug!("allocator initialized");
    Ok(())
  }

  /// Adjusts a requested payload size to a block size: at least
  /// [`MIN_BLOCK_SIZE`], always a multiple of [`crate::align::ALIGNMENT`].
  fn adjusted_size(n: usize) -> usize {
    if n <= D {
      MIN_BLOCK_SIZE
    } else {
      align_up(n + 2 * W)
    }
  }

  /// Allocates a payload of at least `n` bytes. Returns `None` (not an
  /// error) for `n == 0` or when the heap provider cannot supply more
  /// memory; the arena is unchanged on failure.
  #[instrument(level = "debug", skip(self), fields(n))]
  pub fn alloc(&mut self, n: usize) -> Option<NonNull<u8>> {
    if n == 0 {
      return None;
    }
    let base = self.base?;
    let adjusted = Self::adjusted_size(n);

    let block = match unsafe { find_fit(base, &self.lists, adjusted) } {
      Some(block) => {
        let size = unsafe { block.size(base) };
        unsafe { self.lists.unlink(base, block, size) };
        block
      }
      None => {
        let extend_bytes = adjusted.max(CHUNK);
        let grown = unsafe {
          extend_heap(base, &mut self.lists, &mut self.provider, extend_bytes / W)
        };
        let grown = match grown {
          Some(grown) => grown,
          None => {
            error!(n, adjusted, "heap extension failed; allocation denied");
            return None;
          }
        };
        let size = unsafe { grown.size(base) };
        unsafe { self.lists.unlink(base, grown, size) };
        grown
      }
    };

    let placed = unsafe { place(base, &mut self.lists, block, adjusted) };
    trace!(n, adjusted, offset = placed.offset(), "allocated");
    Some(unsafe { placed.as_nonnull(base) })
  }

  /// Releases a payload previously returned by [`Self::alloc`] or
  /// [`Self::realloc`]. A no-op for `None`.
  #[instrument(level = "debug", skip(self, p))]
  pub fn free(&mut self, p: Option<NonNull<u8>>) {
    let Some(base) = self.base else { return };
    let Some(p) = p else { return };

    let block = unsafe { BlockPtr::from_payload(base, p) };
    let size = unsafe { block.size(base) };
    unsafe { block.set_tags(base, size, false) };

    let merged = unsafe { coalesce(base, &mut self.lists, block) };
    let merged_size = unsafe { merged.size(base) };
    unsafe { self.lists.insert(base, merged, merged_size) };
    trace!(offset = merged.offset(), merged_size, "freed");
  }

  /// Resizes a payload, per the four cases of §4.2.
  #[instrument(level = "debug", skip(self, p), fields(n))]
  pub fn realloc(&mut self, p: Option<NonNull<u8>>, n: usize) -> Option<NonNull<u8>> {
    let base = self.base?;

    if n == 0 {
      self.free(p);
      return None;
    }
    let Some(p) = p else {
      return self.alloc(n);
    };

    let block = unsafe { BlockPtr::from_payload(base, p) };
    let old_size = unsafe { block.size(base) };
    let adjusted = Self::adjusted_size(n);

    let next = unsafe { block.next_block(base) };
    let next_is_epilogue = unsafe { next.size(base) } == 0;

    if !next_is_epilogue
      && (adjusted == old_size || adjusted + MIN_BLOCK_SIZE <= old_size)
    {
      if adjusted < old_size {
        unsafe {
          block.set_tags(base, adjusted, true);
          let rest = block.next_block(base);
          rest.set_tags(base, old_size - adjusted, false);
          let merged = coalesce(base, &mut self.lists, rest);
          let merged_size = merged.size(base);
          self.lists.insert(base, merged, merged_size);
        }
      }
      trace!(offset = block.offset(), "realloc shrunk in place");
      return Some(unsafe { block.as_nonnull(base) });
    }

    if !next_is_epilogue && !unsafe { next.is_allocated(base) } {
      let next_size = unsafe { next.size(base) };
      let combined = old_size + next_size;
      if adjusted <= combined
        && (adjusted == combined || adjusted + MIN_BLOCK_SIZE <= combined)
      {
        unsafe {
          self.lists.unlink(base, next, next_size);
          block.set_tags(base, adjusted, true);
          if adjusted < combined {
            let rest = block.next_block(base);
            rest.set_tags(base, combined - adjusted, false);
            let merged = coalesce(base, &mut self.lists, rest);
            let merged_size = merged.size(base);
            self.lists.insert(base, merged, merged_size);
          }
        }
        trace!(offset = block.offset(), "realloc extended into free successor");
        return Some(unsafe { block.as_nonnull(base) });
      }
    }

    let new_payload = self.alloc(n)?;
    let copy_len = n.min(old_size - 2 * W);
    unsafe {
      std::ptr::copy_nonoverlapping(p.as_ptr(), new_payload.as_ptr(), copy_len);
    }
    self.free(Some(p));
    trace!(
      old_offset = block.offset(),
      "realloc fell back to alloc+copy+free"
    );
    Some(new_payload)
  }

  /// Runs the consistency checker (§4.8) over the current heap state.
  /// Returns `true` vacuously if `init` has not yet been called.
  pub fn check(&self) -> bool {
    let (Some(base), Some(high)) = (self.base, self.provider.current_high_address()) else {
      return true;
    };
    unsafe { check::check(base, high, &self.lists) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::heap::VecHeap;

  fn new_allocator() -> Allocator<VecHeap> {
    let mut allocator = Allocator::new(VecHeap::with_capacity(1 << 20));
    allocator.init().unwrap();
    allocator
  }

  #[test]
  fn alloc_zero_returns_none() {
    let mut allocator = new_allocator();
    assert_eq!(allocator.alloc(0), None);
  }

  #[test]
  fn alloc_then_free_passes_checker() {
    let mut allocator = new_allocator();
    let p = allocator.alloc(64).unwrap();
    assert_eq!(p.as_ptr() as usize % 8, 0);
    assert!(allocator.check());
    allocator.free(Some(p));
    assert!(allocator.check());
  }

  #[test]
  fn free_then_alloc_same_class_reuses_region() {
    // Scenario 1 from the testable-properties list.
    let mut allocator = new_allocator();
    let a = allocator.alloc(112).unwrap();
    let _b = allocator.alloc(112).unwrap();
    allocator.free(Some(a));
    let c = allocator.alloc(128).unwrap();
    assert_eq!(c, a);
    assert!(allocator.check());
  }

  #[test]
  fn realloc_null_is_alloc() {
    let mut allocator = new_allocator();
    let p = allocator.realloc(None, 32).unwrap();
    assert!(allocator.check());
    allocator.free(Some(p));
  }

  #[test]
  fn realloc_zero_is_free() {
    let mut allocator = new_allocator();
    let p = allocator.alloc(32).unwrap();
    assert_eq!(allocator.realloc(Some(p), 0), None);
    assert!(allocator.check());
  }

  #[test]
  fn realloc_shrink_leaves_remainder_free_block() {
    // Scenario 4 from the testable-properties list.
    let mut allocator = new_allocator();
    let p = allocator.alloc(100).unwrap();
    unsafe { std::ptr::write_bytes(p.as_ptr(), 0xAB, 100) };
    let q = allocator.realloc(Some(p), 50).unwrap();
    assert_eq!(q, p);
    assert!(allocator.check());
  }

  #[test]
  fn realloc_grow_preserves_prefix_bytes() {
    let mut allocator = new_allocator();
    let p = allocator.alloc(100).unwrap();
    unsafe { std::ptr::write_bytes(p.as_ptr(), 0xAB, 100) };
    let q = allocator.realloc(Some(p), 200).unwrap();
    let bytes = unsafe { std::slice::from_raw_parts(q.as_ptr(), 100) };
    assert!(bytes.iter().all(|&b| b == 0xAB));
    assert!(allocator.check());
  }

  #[test]
  fn small_requests_all_round_to_minimum_block() {
    let mut allocator = new_allocator();
    for n in [1usize, 7, 8, 9] {
      let p = allocator.alloc(n).unwrap();
      let base_offset = p.as_ptr() as usize;
      assert_eq!(base_offset % 8, 0);
      allocator.free(Some(p));
    }
  }

  #[test]
  fn allocation_that_forces_extension_still_passes_checker() {
    let mut allocator = new_allocator();
    let mut live = Vec::new();
    for _ in 0..64 {
      live.push(allocator.alloc(512).unwrap());
    }
    assert!(allocator.check());
    for p in live {
      allocator.free(Some(p));
    }
    assert!(allocator.check());
  }
}
