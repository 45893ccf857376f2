//! # seglloc - a segregated-free-list dynamic storage allocator
//!
//! `seglloc` manages a single, contiguous, monotonically growable byte
//! arena. It tracks occupancy with in-band boundary tags, coalesces
//! adjacent free regions eagerly, and recycles them out of a fixed array
//! of segregated free lists.
//!
//! ## Overview
//!
//! ```text
//!   Arena layout:
//!
//!   ┌─────┬───────────┬──────┬──────┬─────┬ ··· ┬───────────┐
//!   │ pad │ prologue  │block │block │ ... │ ... │ epilogue  │
//!   │ (4) │  (8, alc) │      │      │     │     │ (0, alc)  │
//!   └─────┴───────────┴──────┴──────┴─────┴ ··· ┴───────────┘
//!
//!   Each block:
//!
//!   ┌────────┬───────────────────────────┬────────┐
//!   │ header │  payload (8-byte aligned) │ footer │
//!   │  (4)   │   free: prev/next links   │  (4)   │
//!   └────────┴───────────────────────────┴────────┘
//! ```
//!
//! Free blocks of similar size live together in one of
//! [`bucket::NUM_BUCKETS`] segregated lists, threaded through link words
//! in their own payload, with no out-of-arena node allocation. An allocation
//! request walks buckets from a conservative starting index upward,
//! first-fit; when nothing fits, the arena is grown through a pluggable
//! [`heap::HeapProvider`].
//!
//! ## Crate structure
//!
//! ```text
//!   seglloc
//!   ├── align     - word sizes and alignment helpers
//!   ├── tag       - boundary-tag bit packing
//!   ├── block     - block view: offset-based header/footer/link access
//!   ├── bucket    - size class -> bucket index mapping
//!   ├── freelist  - segregated free-list bookkeeping
//!   ├── coalesce  - eager boundary-tag coalescing
//!   ├── placer    - carving an allocation out of a chosen free block
//!   ├── fit       - bucket walk to find a suitable free block
//!   ├── extend    - growing the arena via a HeapProvider
//!   ├── heap      - the HeapProvider trait plus VecHeap/SbrkHeap adapters
//!   ├── check     - optional consistency auditor
//!   ├── error     - AllocInitError
//!   ├── global    - a thread-local convenience singleton over SbrkHeap
//!   └── allocator - Allocator<H>, the public init/alloc/free/realloc API
//! ```
//!
//! ## Quick start
//!
//! ```
//! use seglloc::{Allocator, VecHeap};
//!
//! let mut allocator = Allocator::new(VecHeap::new());
//! allocator.init().unwrap();
//!
//! let p = allocator.alloc(100).unwrap();
//! unsafe { std::ptr::write_bytes(p.as_ptr(), 0xAB, 100) };
//!
//! let p = allocator.realloc(Some(p), 200).unwrap();
//! allocator.free(Some(p));
//! assert!(allocator.check());
//! ```
//!
//! ## Safety
//!
//! This crate manages raw memory in-band; most of its internals are
//! `unsafe`. The [`Allocator`] API itself takes no `unsafe` to call
//! (arguments are normalized, zero-size and null inputs handled), but the
//! payload pointers it hands out carry the same obligations as any
//! allocator: callers must not read/write past the returned size, must
//! not free a pointer twice, and must not use a pointer after freeing it.

pub mod align;
mod allocator;
mod block;
mod bucket;
mod check;
mod coalesce;
mod error;
mod extend;
mod fit;
mod freelist;
pub mod global;
pub mod heap;
mod placer;
mod tag;

pub use allocator::{Allocator, CHUNK};
pub use bucket::{NUM_BUCKETS, SMALL_BUCKET_CUTOFF};
pub use error::AllocInitError;
pub use heap::{HeapProvider, SbrkHeap, VecHeap};
