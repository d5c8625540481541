use std::{fmt, mem, ptr::NonNull};

use crate::{alignment::Alignment, error::InitError, region::Region, Pointer};

/// Link stored in the first bytes of a free slot. This is the whole reason
/// slots can't be smaller than a pointer. Slots are only as aligned as the
/// configured alignment, so links are always read and written unaligned.
#[derive(Clone, Copy)]
struct Slot {
    next: Pointer<Slot>,
}

/// Fixed size slot allocator. The region is cut into slots of the same size,
/// lazily: slots are minted from the untouched part of the region only when
/// no freed slot is available.
///
/// ```text
///                    free_slots
///                        |
///                        v
/// +--------+--------+--------+--------+--------+------------------------+
/// | in use |  free  |  free  | in use | in use |       untouched        |
/// +--------+--------+--------+--------+--------+------------------------+
///              ^         |                     ^
///              +---------+                     |
///                                          untouched
/// ```
///
/// Freed slots are pushed to the front of a singly linked list whose links
/// live inside the slots themselves, so the most recently freed slot is the
/// first one to be reused.
pub struct PoolAllocator<'a> {
    region: Region<'a>,
    /// Most recently freed slot.
    free_slots: Pointer<Slot>,
    /// Offset of the first slot that has never been handed out.
    untouched: usize,
    /// Effective slot size, aligned and never below [`mem::size_of::<Slot>()`].
    slot_size: usize,
    /// Bytes handed out to the caller.
    count: usize,
    alignment: Alignment,
}

impl<'a> PoolAllocator<'a> {
    /// Builds a pool allocator over `region` with slots that can hold at least
    /// `slot_size` bytes. The effective slot size is `slot_size` rounded up
    /// to `alignment`, or pointer size if that's bigger since free slots
    /// store a pointer. The region base must be aligned to `alignment`.
    pub fn new(
        region: impl Into<Region<'a>>,
        slot_size: usize,
        alignment: usize,
    ) -> Result<Self, InitError> {
        let region = region.into();
        let alignment = Alignment::new(alignment)?;
        region.check_alignment(alignment)?;

        if slot_size > isize::MAX as usize - alignment.get() {
            return Err(InitError::SlotSizeOverflow(slot_size));
        }

        let slot_size = alignment.align(slot_size).max(mem::size_of::<Slot>());

        log::debug!(
            "pool allocator over {} bytes at {:p}, {} slots of {} bytes, alignment {}",
            region.len(),
            region.base(),
            region.len() / slot_size,
            slot_size,
            alignment
        );

        Ok(Self {
            region,
            free_slots: None,
            untouched: 0,
            slot_size,
            count: 0,
            alignment,
        })
    }

    /// Hands out one slot, or `None` if every slot is in use.
    pub fn allocate(&mut self) -> Pointer<u8> {
        if self.count + self.slot_size > self.region.len() {
            return None;
        }

        let slot = match self.free_slots {
            Some(slot) => unsafe {
                self.free_slots = slot.as_ptr().read_unaligned().next;
                slot.cast()
            },
            None => unsafe {
                // With no freed slots around, every slot below `untouched` is
                // in use, so `untouched == count` and the check above covers
                // this slot.
                let slot = self.region.at(self.untouched);
                self.untouched += self.slot_size;
                slot
            },
        };

        self.count += self.slot_size;

        Some(slot)
    }

    /// Same as [`PoolAllocator::allocate`] but the whole slot is zeroed.
    pub fn allocate_clean(&mut self) -> Pointer<u8> {
        let slot = self.allocate()?;
        // SAFETY: the slot is `slot_size` bytes long and now belongs to us.
        unsafe { slot.as_ptr().write_bytes(0, self.slot_size) };

        Some(slot)
    }

    /// Gives `address` back to the pool. It will be the next slot handed out.
    ///
    /// # Safety
    ///
    /// `address` must have been returned by this allocator and must still be
    /// in use: freeing foreign pointers or freeing twice corrupts the free
    /// list, which is not checked.
    pub unsafe fn free(&mut self, address: NonNull<u8>) {
        let slot = address.cast::<Slot>();
        slot.as_ptr().write_unaligned(Slot {
            next: self.free_slots,
        });

        self.free_slots = Some(slot);
        self.count -= self.slot_size;
    }

    /// Releases every slot. All previously returned pointers become invalid.
    pub fn free_all(&mut self) {
        log::trace!("pool allocator reset, {} bytes released", self.count);
        self.free_slots = None;
        self.untouched = 0;
        self.count = 0;
    }

    /// Effective size of every slot in bytes.
    #[inline]
    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Total number of slots that fit in the region.
    #[inline]
    pub fn slots(&self) -> usize {
        self.region.len() / self.slot_size
    }

    /// Bytes currently handed out.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.region.len() - self.count
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

impl fmt::Debug for PoolAllocator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolAllocator")
            .field("region", &self.region)
            .field("slot_size", &self.slot_size)
            .field("count", &self.count)
            .field("alignment", &self.alignment)
            .finish()
    }
}
