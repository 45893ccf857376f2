//! Block view: the one place in the crate that turns an offset into memory
//! accesses.
//!
//! A [`BlockPtr`] is not a pointer at all, it is the **offset** of a
//! block's payload relative to the arena base, stored in 4 bytes. This
//! mirrors the source allocator's assumption that a free-list link is one
//! machine word (`W` bytes): on the 32-bit target the boundary-tag design
//! was built for, a pointer *is* 4 bytes, so `header(4) + footer(4) +
//! prev-link(4) + next-link(4) = 16 = 2*D`, exactly the minimum block size
//! §3 specifies. Storing a real 8-byte pointer in the same slot would
//! silently grow the minimum block past what the rest of the spec's byte
//! arithmetic (bucket boundaries, the worked realloc scenarios) assumes, so
//! offsets stand in for pointers throughout this crate; [`crate::allocator`]
//! is the only place an actual base address is held, and it caps the arena
//! at 4 GiB as a consequence.
//!
//! Every method here is `unsafe`: the caller must guarantee the offset
//! names a live, in-bounds block and that `base` is the arena this offset
//! was computed against.

use std::ptr::NonNull;

use crate::align::{D, W};
use crate::tag;

/// Offset, relative to the arena base, of a block's *payload* address.
///
/// Offset 0 always lies inside the leading alignment-padding word `init`
/// writes before the prologue and is never the payload of a real block, so
/// it doubles as the "no link" sentinel for the intrusive free-list (see
/// [`BlockPtr::prev_link`] / [`BlockPtr::next_link`]).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct BlockPtr(u32);

impl BlockPtr {
  /// Wraps a raw payload offset.
  #[inline]
  pub const fn from_offset(offset: u32) -> Self {
    Self(offset)
  }

  /// The payload offset this block ptr names.
  #[inline]
  pub const fn offset(self) -> u32 {
    self.0
  }

  /// # Safety
  /// `base` must be the arena base this offset was computed against, and
  /// the resulting address must be in-bounds for the arena.
  #[inline]
  unsafe fn payload_addr(self, base: NonNull<u8>) -> *mut u8 {
    unsafe { base.as_ptr().add(self.0 as usize) }
  }

  /// Address of this block's header word (`payload - W`).
  ///
  /// # Safety
  /// See [`Self::payload_addr`].
  #[inline]
  unsafe fn header_ptr(self, base: NonNull<u8>) -> *mut u32 {
    unsafe { self.payload_addr(base).sub(W) as *mut u32 }
  }

  /// Address of this block's footer word, given its total `size`.
  ///
  /// # Safety
  /// See [`Self::payload_addr`]; `size` must be this block's real size.
  #[inline]
  unsafe fn footer_ptr(self, base: NonNull<u8>, size: usize) -> *mut u32 {
    unsafe { self.payload_addr(base).add(size - 2 * W) as *mut u32 }
  }

  /// Reads this block's total size from its header.
  ///
  /// # Safety
  /// See [`Self::payload_addr`].
  #[inline]
  pub unsafe fn size(self, base: NonNull<u8>) -> usize {
    tag::size_of(unsafe { self.header_ptr(base).read() })
  }

  /// Reads this block's allocated flag from its header.
  ///
  /// # Safety
  /// See [`Self::payload_addr`].
  #[inline]
  pub unsafe fn is_allocated(self, base: NonNull<u8>) -> bool {
    tag::is_allocated(unsafe { self.header_ptr(base).read() })
  }

  /// Writes matching header and footer tags for this block.
  ///
  /// # Safety
  /// See [`Self::payload_addr`]; `size` must leave the footer in bounds.
  #[inline]
  pub unsafe fn set_tags(self, base: NonNull<u8>, size: usize, allocated: bool) {
    let word = tag::pack(size, allocated);
    unsafe {
      self.header_ptr(base).write(word);
      self.footer_ptr(base, size).write(word);
    }
  }

  /// Writes the zero-size allocated epilogue header. The epilogue has no
  /// footer (there is nothing after it to look backward from), so this
  /// writes a single word rather than delegating to [`Self::set_tags`],
  /// which would otherwise stomp the last real block's footer.
  ///
  /// # Safety
  /// See [`Self::payload_addr`].
  #[inline]
  pub unsafe fn set_epilogue(self, base: NonNull<u8>) {
    unsafe { self.header_ptr(base).write(tag::pack(0, true)) };
  }

  /// The payload offset of the physically next block (`payload + size`).
  ///
  /// # Safety
  /// See [`Self::payload_addr`].
  #[inline]
  pub unsafe fn next_block(self, base: NonNull<u8>) -> BlockPtr {
    let size = unsafe { self.size(base) };
    BlockPtr(self.0 + size as u32)
  }

  /// The payload offset of the physically previous block, found by reading
  /// its footer (the word immediately before this block's header).
  ///
  /// # Safety
  /// See [`Self::payload_addr`]; this block must not be the first real
  /// block in the arena (the prologue has no valid "previous footer").
  #[inline]
  pub unsafe fn prev_block(self, base: NonNull<u8>) -> BlockPtr {
    let prev_footer = unsafe { self.payload_addr(base).sub(D) as *mut u32 };
    let prev_size = tag::size_of(unsafe { prev_footer.read() });
    BlockPtr(self.0 - prev_size as u32)
  }

  /// Reads the free-list prev-link stored in this block's payload.
  ///
  /// # Safety
  /// This block must currently be free (the payload link words are only
  /// meaningful then).
  #[inline]
  pub unsafe fn prev_link(self, base: NonNull<u8>) -> Option<BlockPtr> {
    let raw = unsafe { (self.payload_addr(base) as *mut u32).read() };
    (raw != 0).then_some(BlockPtr(raw))
  }

  /// Reads the free-list next-link stored in this block's payload.
  ///
  /// # Safety
  /// See [`Self::prev_link`].
  #[inline]
  pub unsafe fn next_link(self, base: NonNull<u8>) -> Option<BlockPtr> {
    let raw = unsafe { (self.payload_addr(base).add(W) as *mut u32).read() };
    (raw != 0).then_some(BlockPtr(raw))
  }

  /// Overwrites the free-list prev-link stored in this block's payload.
  ///
  /// # Safety
  /// See [`Self::prev_link`].
  #[inline]
  pub unsafe fn set_prev_link(self, base: NonNull<u8>, link: Option<BlockPtr>) {
    let raw = link.map_or(0, BlockPtr::offset);
    unsafe { (self.payload_addr(base) as *mut u32).write(raw) };
  }

  /// Overwrites the free-list next-link stored in this block's payload.
  ///
  /// # Safety
  /// See [`Self::prev_link`].
  #[inline]
  pub unsafe fn set_next_link(self, base: NonNull<u8>, link: Option<BlockPtr>) {
    let raw = link.map_or(0, BlockPtr::offset);
    unsafe { (self.payload_addr(base).add(W) as *mut u32).write(raw) };
  }

  /// The raw payload pointer handed out to / taken back from callers.
  ///
  /// # Safety
  /// See [`Self::payload_addr`].
  #[inline]
  pub unsafe fn as_nonnull(self, base: NonNull<u8>) -> NonNull<u8> {
    unsafe { NonNull::new_unchecked(self.payload_addr(base)) }
  }

  /// Recovers a [`BlockPtr`] from a payload pointer previously handed out
  /// by [`Self::as_nonnull`].
  ///
  /// # Safety
  /// `payload` must point inside `[base, base + u32::MAX]` and must
  /// actually be a payload address produced by this arena.
  #[inline]
  pub unsafe fn from_payload(base: NonNull<u8>, payload: NonNull<u8>) -> Self {
    let delta = payload.as_ptr() as usize - base.as_ptr() as usize;
    Self(delta as u32)
  }
}

/// Minimum total block size: header + footer + prev-link + next-link.
pub const MIN_BLOCK_SIZE: usize = 2 * D;

/// Payload offset of the prologue sentinel, once written by `init`: one
/// alignment-padding word precedes it, so its header lands at offset `W`.
pub const PROLOGUE_OFFSET: u32 = D as u32;

/// Payload offset of the first real (non-sentinel) block; equivalently,
/// where the epilogue sits immediately after `init`, before any extension.
pub const FIRST_BLOCK_OFFSET: u32 = 2 * D as u32;

static_assertions::const_assert_eq!(MIN_BLOCK_SIZE, 4 * W);

#[cfg(test)]
mod tests {
  use super::*;

  unsafe fn arena(len: usize) -> (Vec<u8>, NonNull<u8>) {
    let mut buf = vec![0u8; len];
    let base = NonNull::new(buf.as_mut_ptr()).unwrap();
    (buf, base)
  }

  #[test]
  fn tags_roundtrip_and_neighbors_chain() {
    unsafe {
      let (_buf, base) = arena(256);

      // A block of size 32 living at offset 8 (payload), followed by
      // another block of size 16 at offset 40.
      let a = BlockPtr::from_offset(8);
      a.set_tags(base, 32, false);
      assert_eq!(a.size(base), 32);
      assert!(!a.is_allocated(base));

      let b = a.next_block(base);
      assert_eq!(b.offset(), 40);
      b.set_tags(base, 16, true);
      assert_eq!(b.size(base), 16);
      assert!(b.is_allocated(base));

      assert_eq!(b.prev_block(base).offset(), a.offset());
    }
  }

  #[test]
  fn free_list_links_round_trip_and_null_is_zero() {
    unsafe {
      let (_buf, base) = arena(256);
      let a = BlockPtr::from_offset(16);
      a.set_tags(base, 16, false);

      assert_eq!(a.prev_link(base), None);
      assert_eq!(a.next_link(base), None);

      let b = BlockPtr::from_offset(64);
      a.set_next_link(base, Some(b));
      b.set_prev_link(base, Some(a));

      assert_eq!(a.next_link(base), Some(b));
      assert_eq!(b.prev_link(base), Some(a));
    }
  }

  #[test]
  fn payload_pointer_roundtrips_through_from_payload() {
    unsafe {
      let (_buf, base) = arena(128);
      let block = BlockPtr::from_offset(24);
      let ptr = block.as_nonnull(base);
      assert_eq!(BlockPtr::from_payload(base, ptr), block);
    }
  }
}
