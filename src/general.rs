//! General purpose allocator. Once you've read [`crate::header`],
//! [`crate::block`], [`crate::list`] and [`crate::freelist`], this is where
//! the circle gets completed. Every byte of the region is in one of three
//! states:
//!
//! ```text
//! base                                          tail                  end
//!  |                                              |                     |
//!  v                                              v                     v
//!  +-------+-------+-----------+-------+----------+---------------------+
//!  | Alloc | Free  |   Alloc   | Free  |  Alloc   |     unused tail     |
//!  +-------+-------+-----------+-------+----------+---------------------+
//! ```
//!
//! - **Unused tail**: never handed out. Blocks are carved from here when no
//! free block fits.
//! - **Free**: linked in the free list.
//! - **Allocated**: owned by the caller.
//!
//! Allocation is first fit over the free list, splitting the block if what's
//! left is big enough to be a block of its own. Deallocation pushes the block
//! to the front of the free list and nothing else: adjacent free blocks are
//! **not** merged, so two free neighbours stay two separate blocks forever
//! (or until [`GeneralAllocator::free_all`]).

use std::{fmt, ptr::NonNull};

use crate::{
    alignment::Alignment,
    block::{Block, BLOCK_HEADER_SIZE, MIN_BLOCK_SIZE},
    error::InitError,
    freelist::FreeList,
    header::Header,
    realloc::Realloc,
    region::Region,
    Pointer,
};

/// Variable size allocator with a free list. See the [module docs](self).
pub struct GeneralAllocator<'a> {
    region: Region<'a>,
    /// Offset of the unused tail, where the next block is carved if no free
    /// block fits.
    tail: usize,
    /// Free blocks, most recently freed first.
    free_blocks: FreeList,
    /// Bytes owned by live allocations, headers included.
    count: usize,
    alignment: Alignment,
}

impl<'a> GeneralAllocator<'a> {
    /// Builds a general allocator over `region`. Request sizes are rounded up
    /// to `alignment` and the region base must satisfy it. Headers and free
    /// list links are accessed unaligned, so any power of two works, 1
    /// included.
    ///
    /// Note that returned addresses sit right after an 8 byte header (4 on 32
    /// bit machines), so they are aligned to `alignment` or to the pointer
    /// size, whichever is smaller.
    pub fn new(region: impl Into<Region<'a>>, alignment: usize) -> Result<Self, InitError> {
        let region = region.into();
        let alignment = Alignment::new(alignment)?;
        region.check_alignment(alignment)?;

        log::debug!(
            "general allocator over {} bytes at {:p}, alignment {}",
            region.len(),
            region.base(),
            alignment
        );

        Ok(Self {
            region,
            tail: 0,
            free_blocks: FreeList::new(),
            count: 0,
            alignment,
        })
    }

    /// Allocates a block that can hold at least `size` bytes, or returns
    /// `None` if there's no space left for it.
    pub fn allocate(&mut self, size: usize) -> Pointer<u8> {
        if size > self.region.len() {
            return None;
        }

        let size = self.alignment.align(size).max(MIN_BLOCK_SIZE);
        let total_size = size + BLOCK_HEADER_SIZE;

        if self.count + total_size > self.region.len() {
            return None;
        }

        unsafe {
            let block = match self.free_blocks.find_first_fit(size) {
                Some(block) => self.take_free_block(block, size),
                None => self.carve_tail(size)?,
            };

            Some(Header::content_address_of(block))
        }
    }

    /// Same as [`GeneralAllocator::allocate`] but the memory is zeroed.
    pub fn allocate_clean(&mut self, size: usize) -> Pointer<u8> {
        let address = self.allocate(size)?;
        // SAFETY: the block holds at least `size` bytes.
        unsafe { address.as_ptr().write_bytes(0, size) };

        Some(address)
    }

    /// Hands out `block`, which is currently free and can hold `size` bytes.
    /// If the remainder is big enough it becomes a new free block that takes
    /// over the position of `block` in the free list:
    ///
    /// **Before**:
    ///
    /// ```text
    ///         +-->  +-----------+
    ///         |     |   Header  | <- H bytes.
    /// Block   |     +-----------+
    ///         |     |  Content  | <- S bytes.
    ///         +-->  +-----------+
    /// ```
    ///
    /// **After**:
    ///
    /// ```text
    ///         +-->  +-----------+
    ///         |     |   Header  | <- H bytes.
    /// Block 1 |     +-----------+
    ///         |     |  Content  | <- size bytes, handed out.
    ///         +-->  +-----------+
    ///         |     |   Header  | <- H bytes.
    /// Block 2 |     +-----------+
    ///         |     |  Content  | <- S - size - H bytes, free.
    ///         +-->  +-----------+
    /// ```
    ///
    /// Otherwise the whole block is handed out and keeps its original size,
    /// so that freeing it gives every byte back.
    unsafe fn take_free_block(
        &mut self,
        block: NonNull<Header<Block>>,
        size: usize,
    ) -> NonNull<Header<Block>> {
        if !Header::can_split(block, size) {
            self.free_blocks.remove_block(block);
            self.count += Header::total_size(block);
            return block;
        }

        let total_size = size + BLOCK_HEADER_SIZE;
        let remainder_address =
            NonNull::new_unchecked(block.as_ptr().cast::<u8>().add(total_size));
        let remainder =
            Header::<Block>::write(remainder_address, Header::size(block) - total_size);

        // The remainder header starts at least MIN_BLOCK_SIZE bytes into the
        // content, so the links of `block` are still intact here.
        self.free_blocks.replace_block(block, remainder);

        Header::set_size(block, size);
        self.count += total_size;

        block
    }

    /// Carves a new block of `size` bytes from the unused tail, or returns
    /// `None` if the tail is too short. That can happen even when `count`
    /// says there's room, because free blocks that are too small for this
    /// request still take up space before the tail.
    unsafe fn carve_tail(&mut self, size: usize) -> Pointer<Header<Block>> {
        let total_size = size + BLOCK_HEADER_SIZE;

        if self.tail + total_size > self.region.len() {
            return None;
        }

        let block = Header::<Block>::write(self.region.at(self.tail), size);
        self.tail += total_size;
        self.count += total_size;

        Some(block)
    }

    /// Gives the block of `address` back. It becomes the head of the free list
    /// and is the first candidate for the next allocation that fits in it.
    ///
    /// # Safety
    ///
    /// `address` must have been returned by this allocator and must still be
    /// allocated. Freeing foreign pointers, freeing twice or writing to the
    /// memory after freeing it corrupts the free list, and none of that is
    /// checked.
    pub unsafe fn free(&mut self, address: NonNull<u8>) {
        self.free_block(Header::<Block>::from_content_address(address));
    }

    unsafe fn free_block(&mut self, block: NonNull<Header<Block>>) {
        self.count -= Header::total_size(block);
        self.free_blocks.push_block(block);
    }

    /// Moves the allocation at `address` to a new block that can hold
    /// `new_size` bytes. The first `min(old size, new_size)` bytes are copied
    /// over, then the old block is freed. Returns the new address, or `None`
    /// if the new block can't be allocated, in which case the old one is left
    /// untouched and still valid.
    ///
    /// # Safety
    ///
    /// Same as [`GeneralAllocator::free`]. On success `address` is no longer
    /// valid.
    pub unsafe fn reallocate(&mut self, address: NonNull<u8>, new_size: usize) -> Pointer<u8> {
        let realloc = Realloc::new(address, new_size);
        let new_address = self.allocate(new_size)?;
        self.finish_realloc(&realloc, new_address);

        Some(new_address)
    }

    /// Same as [`GeneralAllocator::reallocate`] but the new block is zeroed
    /// before the old content is copied, so any grown part reads as zeros.
    ///
    /// # Safety
    ///
    /// See [`GeneralAllocator::reallocate`].
    pub unsafe fn reallocate_clean(
        &mut self,
        address: NonNull<u8>,
        new_size: usize,
    ) -> Pointer<u8> {
        let realloc = Realloc::new(address, new_size);
        let new_address = self.allocate_clean(new_size)?;
        self.finish_realloc(&realloc, new_address);

        Some(new_address)
    }

    /// The old block is still allocated at this point, so the new one can't
    /// overlap it.
    unsafe fn finish_realloc(&mut self, realloc: &Realloc, new_address: NonNull<u8>) {
        realloc.copy_to(new_address);
        self.free_block(realloc.block);
    }

    /// Releases everything: empty free list and the whole region becomes
    /// unused tail again. All previously returned pointers become invalid.
    pub fn free_all(&mut self) {
        log::trace!(
            "general allocator reset, {} bytes released, {} free blocks dropped",
            self.count,
            self.free_blocks.len()
        );
        self.free_blocks.clear();
        self.tail = 0;
        self.count = 0;
    }

    /// Bytes owned by live allocations, headers included.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    /// Capacity minus [`GeneralAllocator::count`]. Fragmentation may make it
    /// impossible to allocate all of it at once.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.region.len() - self.count
    }

    /// Number of blocks in the free list.
    #[inline]
    pub fn free_blocks(&self) -> usize {
        self.free_blocks.len()
    }

    #[inline]
    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    /// Whether `address` lies inside the managed region.
    pub fn owns(&self, address: NonNull<u8>) -> bool {
        self.region.contains(address)
    }
}

impl fmt::Debug for GeneralAllocator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneralAllocator")
            .field("region", &self.region)
            .field("tail", &self.tail)
            .field("free_blocks", &self.free_blocks.len())
            .field("count", &self.count)
            .field("alignment", &self.alignment)
            .finish()
    }
}
