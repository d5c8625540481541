//! Three allocators that carve memory out of a single region supplied by the
//! caller. None of them ever talks to the system allocator: once the region is
//! full, allocations fail with [`None`] and that's it.
//!
//! - [`BumpAllocator`]: monotonic cursor, only the most recent allocation can
//! be freed. Good for per-frame scratch memory.
//! - [`PoolAllocator`]: fixed size slots recycled through an intrusive free
//! list. Good for lots of objects of the same type.
//! - [`GeneralAllocator`]: variable size blocks with headers, a doubly linked
//! free list stored inside freed blocks, first fit search, block splitting and
//! reallocation. This is the interesting one, start reading at
//! [`crate::general`] and follow the links from there.
//!
//! # Contracts
//!
//! These allocators are meant for latency sensitive code, so they don't
//! validate anything they are given back. Freeing a pointer that didn't come
//! from the same allocator, freeing twice, freeing out of order on the bump
//! allocator or using a pointer after `free_all` is undefined behaviour. That's
//! why every `free` is an `unsafe fn`. Nothing here is thread safe either, wrap
//! an allocator in a mutex or give each thread its own.

mod align;
mod alignment;
mod block;
mod bump;
mod error;
mod freelist;
mod general;
mod header;
mod list;
mod pool;
mod realloc;
mod region;

use std::ptr::NonNull;

/// Non-null pointer to `T`. We use this in most cases instead of `*mut T`
/// because the compiler will yell at us if we don't write code for the `None`
/// case. Allocation failure is also expressed with this type, so callers can't
/// forget to check it either.
pub type Pointer<T> = Option<NonNull<T>>;

pub use align::align;
pub use alignment::{Alignment, POINTER_SIZE};
pub use bump::BumpAllocator;
pub use error::InitError;
pub use general::GeneralAllocator;
pub use pool::PoolAllocator;
pub use region::Region;

#[cfg(test)]
pub(crate) mod test_support {
    /// Heap allocated buffer aligned to 64 bytes. Tests need a region whose
    /// base satisfies any alignment they throw at the allocators, and a plain
    /// `Vec<u8>` only guarantees 1.
    #[repr(C, align(64))]
    pub struct AlignedBuffer<const N: usize>(pub [u8; N]);

    impl<const N: usize> AlignedBuffer<N> {
        pub fn new() -> Box<Self> {
            Box::new(Self([0; N]))
        }

        pub fn as_mut_slice(&mut self) -> &mut [u8] {
            &mut self.0
        }
    }
}
