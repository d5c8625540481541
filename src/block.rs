use std::{mem, ptr, ptr::NonNull};

use crate::{freelist::FreeListNode, header::Header};

/// Minimum block size in bytes. A block that is freed has to hold the
/// [`FreeListNode`] that links it into the free list, so no block content can
/// be smaller than that (two pointers).
pub(crate) const MIN_BLOCK_SIZE: usize = mem::size_of::<FreeListNode>();

/// Block header size in bytes. See [`Header<T>`] and [`Block`].
pub(crate) const BLOCK_HEADER_SIZE: usize = mem::size_of::<Header<Block>>();

/// Smallest leftover that can become a block of its own when splitting: a
/// header plus enough content to hold free list links once it's free.
pub(crate) const MIN_SPLIT_SIZE: usize = BLOCK_HEADER_SIZE + MIN_BLOCK_SIZE;

/// Memory block specific data. The whole header is just the content size,
/// everything else is derived from it or stored inside the content while the
/// block is free:
///
/// ```text
///            +----------------------------+
///            | block size                 | <- Header<Block>
///            +----------------------------+
/// Content -> | free: next free block      | <--+
///            +----------------------------+    | Free: Node.
///            | free: prev free block      | <--+ Allocated: user data.
///            +----------------------------+
///            |     Rest of user data      |
///            |          ......            |
///            +----------------------------+
/// ```
///
/// There's no "is free" flag. A block is free if and only if it's linked in
/// the free list, see [`crate::freelist`].
#[repr(C)]
pub(crate) struct Block {
    /// Size of the block excluding [`Header<Block>`] size.
    pub size: usize,
}

impl Header<Block> {
    /// Writes a fresh block header with the given content `size` at `address`.
    ///
    /// # Safety
    ///
    /// `address` must be valid for writes of [`BLOCK_HEADER_SIZE`] bytes. It
    /// doesn't need to be aligned.
    #[inline]
    pub unsafe fn write(address: NonNull<u8>, size: usize) -> NonNull<Self> {
        let block = address.cast::<Self>();
        block.as_ptr().write_unaligned(Header {
            data: Block { size },
        });

        block
    }

    // Headers sit wherever the configured alignment puts them, so these take
    // the raw pointer instead of `&self` and never create a reference.

    /// Block size excluding [`BLOCK_HEADER_SIZE`].
    ///
    /// # Safety
    ///
    /// `block` must point to a header written by [`Header::write`].
    #[inline]
    pub unsafe fn size(block: NonNull<Self>) -> usize {
        ptr::addr_of!((*block.as_ptr()).data.size).read_unaligned()
    }

    /// Overwrites the content size of `block`. Same safety rules as
    /// [`Header::size`].
    #[inline]
    pub unsafe fn set_size(block: NonNull<Self>, size: usize) {
        ptr::addr_of_mut!((*block.as_ptr()).data.size).write_unaligned(size);
    }

    /// Total block size including [`BLOCK_HEADER_SIZE`].
    #[inline]
    pub unsafe fn total_size(block: NonNull<Self>) -> usize {
        BLOCK_HEADER_SIZE + Self::size(block)
    }

    /// Whether carving `size` bytes out of `block` leaves enough space for
    /// another block. If not, the whole block has to be handed out.
    #[inline]
    pub unsafe fn can_split(block: NonNull<Self>, size: usize) -> bool {
        Self::size(block) - size >= MIN_SPLIT_SIZE
    }
}
