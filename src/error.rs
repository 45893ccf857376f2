//! Error types surfaced by the public API.
//!
//! Steady-state allocation failure keeps the C `malloc` convention of a
//! null/`None` sentinel (see [`crate::allocator::Allocator::alloc`]); only
//! initialization failure is modeled as a typed error, since it is the one
//! situation where the allocator cannot proceed at all.

use thiserror::Error;

/// Failure to bring an [`crate::allocator::Allocator`] up.
#[derive(Debug, Error)]
pub enum AllocInitError {
  /// The heap provider refused the initial slab request.
  #[error("heap provider refused the initial {requested_bytes}-byte request")]
  ProviderExhausted {
    /// Number of bytes requested for the initial sentinel slab.
    requested_bytes: usize,
  },
}
