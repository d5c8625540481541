use std::ptr::NonNull;

use crate::{block::Block, header::Header};

/// This is used to carry realloc metadata around. The important part is that
/// it's built *before* anything else happens: once the old block is freed its
/// content becomes free list links and we can't trust anything in there, and
/// we also need its size to know how much we can copy. For the real
/// reallocation business see [`crate::general::GeneralAllocator::reallocate`].
pub(crate) struct Realloc {
    /// Source block, or the block whose contents we are trying to reallocate.
    pub block: NonNull<Header<Block>>,
    /// Current user pointer, right after the header of `block`.
    pub address: NonNull<u8>,
    /// Content size of `block` when the reallocation started.
    pub old_size: usize,
    /// Requested size.
    pub new_size: usize,
}

/// Whether the reallocation makes the allocation bigger or smaller. Same size
/// counts as growing, nothing gets cut off either way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ReallocMethod {
    Shrink,
    Grow,
}

impl Realloc {
    /// Builds a new [`Realloc`]. Caller must ensure that `address` is a live
    /// allocation of the general allocator because we'll read its header.
    pub unsafe fn new(address: NonNull<u8>, new_size: usize) -> Self {
        let block = Header::<Block>::from_content_address(address);

        Self {
            block,
            address,
            old_size: Header::size(block),
            new_size,
        }
    }

    pub fn method(&self) -> ReallocMethod {
        if self.new_size < self.old_size {
            ReallocMethod::Shrink
        } else {
            ReallocMethod::Grow
        }
    }

    /// Number of bytes that should be copied from the previous allocation. If
    /// we are shrinking, we only need to copy enough bytes to fill the new
    /// size, otherwise we'll copy everything from the previous block.
    pub fn count(&self) -> usize {
        match self.method() {
            ReallocMethod::Shrink => self.new_size,
            ReallocMethod::Grow => self.old_size,
        }
    }

    /// Copies [`Realloc::count`] bytes from the old block into `destination`.
    ///
    /// # Safety
    ///
    /// `destination` must be valid for writes of at least `new_size` bytes
    /// and must not overlap the old block, which must still be allocated.
    pub unsafe fn copy_to(&self, destination: NonNull<u8>) {
        self.address
            .as_ptr()
            .copy_to_nonoverlapping(destination.as_ptr(), self.count());
    }
}
