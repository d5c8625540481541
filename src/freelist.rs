use std::ptr::NonNull;

use crate::{
    block::Block,
    header::Header,
    list::{LinkedList, Node},
    Pointer,
};

/// See [`crate::block::Block`] first. When a block is free we use its content
/// to store the free list, a doubly linked list of _only_ free blocks. The
/// content of a free block looks like this:
///
/// ```text
/// +----------------------------+
/// | block size                 | <- Header<Block> struct.
/// +----------------------------+
/// | pointer to next free block | <--+
/// +----------------------------+    | Node struct.
/// | pointer to prev free block | <--+
/// +----------------------------+
/// |     Rest of old user data  | <--+
/// |          ......            |    | Rest of content. This could be 0 bytes.
/// |          ......            | <--+
/// +----------------------------+
/// ```
///
/// # Order
///
/// Freed blocks are always pushed to the front, so the list is ordered from
/// most recently freed to least recently freed. It says nothing about
/// addresses: two blocks sitting next to each other in the region can be at
/// opposite ends of the list, and they are never merged.
///
/// ```text
///                    head
///                     |
///                     v
/// +-------+-------+-------+-------+-------+--------------------------+
/// | Free  | Alloc | Free  | Free  | Alloc |       unused tail        |
/// +-------+-------+-------+-------+-------+--------------------------+
///     ^               |       ^
///     |               |       |
///     +---------------|-------+---- next of head is this one, then the
///                     |             first block in the region.
/// ```
///
/// # Free list implementation
///
/// [`LinkedList`] nodes hold nothing but the links: the size lives in
/// [`Header<Block>`] right above. That means the list points to the
/// *content* of free blocks, not their headers. To get the header back we
/// subtract [`crate::block::BLOCK_HEADER_SIZE`], which is exactly what
/// [`Header::from_content_address`] does.
///
/// Pointing into the content of a block is fine only because the user has
/// given it back to us. If users keep using pointers after freeing them they
/// will overwrite the links and corrupt the list. Nothing checks for that.
pub(crate) type FreeListNode = Node;

/// See [`FreeListNode`].
pub(crate) type FreeList = LinkedList;

impl Header<Block> {
    /// Returns the actual block header of a free list node. See
    /// [`FreeListNode`].
    ///
    /// # Safety
    ///
    /// `links` must be a node of the free list. We manage the free list so
    /// this only breaks if the user writes to memory after freeing it.
    #[inline]
    pub unsafe fn from_free_list_node(links: NonNull<FreeListNode>) -> NonNull<Self> {
        Self::from_content_address(links.cast())
    }

    /// Free list node stored in the content of this block.
    #[inline]
    unsafe fn free_list_node_of(block: NonNull<Self>) -> NonNull<FreeListNode> {
        Self::content_address_of(block).cast()
    }
}

impl FreeList {
    /// Links `block` at the front of the free list. `block` must be valid and
    /// not currently in the list.
    pub unsafe fn push_block(&mut self, block: NonNull<Header<Block>>) {
        self.push_front(Header::content_address_of(block));
    }

    /// Unlinks `block` from the free list. `block` must be in the list.
    pub unsafe fn remove_block(&mut self, block: NonNull<Header<Block>>) {
        self.remove(Header::free_list_node_of(block));
    }

    /// Puts `new_block` in the exact position of `block`, which stops being
    /// part of the list. Used when splitting: the remainder of a block takes
    /// over its place. `new_block` must already have a valid header and must
    /// not overlap the links of `block`.
    pub unsafe fn replace_block(
        &mut self,
        block: NonNull<Header<Block>>,
        new_block: NonNull<Header<Block>>,
    ) {
        self.replace(
            Header::free_list_node_of(block),
            Header::content_address_of(new_block),
        );
    }

    /// First fit: returns the first block in list order that can hold `size`
    /// bytes, or `None` if there isn't any.
    pub unsafe fn find_first_fit(&self, size: usize) -> Pointer<Header<Block>> {
        self.iter_blocks()
            .find(|&block| Header::size(block) >= size)
    }

    /// Free list nodes are a little bit harder to iterate because they don't
    /// point to block headers, so let's make it easier.
    pub unsafe fn iter_blocks(&self) -> impl Iterator<Item = NonNull<Header<Block>>> + '_ {
        self.iter()
            .map(|node| Header::<Block>::from_free_list_node(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        block::{BLOCK_HEADER_SIZE, MIN_BLOCK_SIZE},
        test_support::AlignedBuffer,
    };

    /// Writes free blocks with the given sizes one after another in `memory`
    /// and returns their headers.
    unsafe fn write_blocks(memory: &mut [u8], sizes: &[usize]) -> Vec<NonNull<Header<Block>>> {
        let base = memory.as_mut_ptr();
        let mut offset = 0;

        sizes
            .iter()
            .map(|&size| {
                let block = Header::<Block>::write(NonNull::new_unchecked(base.add(offset)), size);
                offset += BLOCK_HEADER_SIZE + size;
                block
            })
            .collect()
    }

    #[test]
    fn first_fit_follows_list_order() {
        let mut buffer = AlignedBuffer::<512>::new();
        let mut list = FreeList::new();

        unsafe {
            let blocks = write_blocks(buffer.as_mut_slice(), &[64, 32, 128]);
            for &block in &blocks {
                list.push_block(block);
            }

            // List order is 128, 32, 64 so the big one wins even though it's
            // located last in memory.
            assert_eq!(list.find_first_fit(16), Some(blocks[2]));
            assert_eq!(list.find_first_fit(128), Some(blocks[2]));
            assert_eq!(list.find_first_fit(129), None);

            list.remove_block(blocks[2]);
            assert_eq!(list.find_first_fit(16), Some(blocks[1]));
            assert_eq!(list.find_first_fit(33), Some(blocks[0]));
        }
    }

    #[test]
    fn links_live_in_block_content() {
        let mut buffer = AlignedBuffer::<256>::new();
        let mut list = FreeList::new();

        unsafe {
            let blocks = write_blocks(buffer.as_mut_slice(), &[MIN_BLOCK_SIZE, MIN_BLOCK_SIZE]);
            list.push_block(blocks[0]);

            let node = list.first().unwrap();
            assert_eq!(node.cast::<u8>(), Header::content_address_of(blocks[0]));
            assert_eq!(Header::<Block>::from_free_list_node(node), blocks[0]);
            // Size is untouched by linking.
            assert_eq!(Header::size(blocks[0]), MIN_BLOCK_SIZE);
        }
    }

    #[test]
    fn replace_block_takes_over_position() {
        let mut buffer = AlignedBuffer::<512>::new();
        let mut list = FreeList::new();

        unsafe {
            let blocks = write_blocks(buffer.as_mut_slice(), &[64, 64, 64, 64]);
            list.push_block(blocks[0]);
            list.push_block(blocks[1]);
            list.push_block(blocks[2]);

            list.replace_block(blocks[1], blocks[3]);

            let order: Vec<_> = list.iter_blocks().collect();
            assert_eq!(order, vec![blocks[2], blocks[3], blocks[0]]);
            assert_eq!(list.len(), 3);
        }
    }
}
