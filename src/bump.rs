use std::{fmt, ptr::NonNull};

use crate::{alignment::Alignment, error::InitError, region::Region, Pointer};

/// Monotonic allocator. Every allocation advances a cursor, and the only way
/// to give memory back is to undo the most recent allocation (or everything at
/// once with [`BumpAllocator::free_all`]):
///
/// ```text
/// base                      next_alloc                              end
///  |                            |                                    |
///  v                            v                                    v
///  +-------+-----------+--------+------------------------------------+
///  | alloc |   alloc   | alloc  |               unused               |
///  +-------+-----------+--------+------------------------------------+
///  <---------- count ---------->
/// ```
///
/// No headers, no fragmentation, O(1) everything. The price is stack
/// discipline on [`BumpAllocator::free`].
pub struct BumpAllocator<'a> {
    region: Region<'a>,
    /// Where the next allocation starts, as an offset from the region base.
    /// Always equal to the number of live bytes.
    next_alloc: usize,
    alignment: Alignment,
}

impl<'a> BumpAllocator<'a> {
    /// Builds a bump allocator over `region`. Every size is rounded up to
    /// `alignment`, and the region base must already be aligned to it.
    pub fn new(region: impl Into<Region<'a>>, alignment: usize) -> Result<Self, InitError> {
        let region = region.into();
        let alignment = Alignment::new(alignment)?;
        region.check_alignment(alignment)?;

        log::debug!(
            "bump allocator over {} bytes at {:p}, alignment {}",
            region.len(),
            region.base(),
            alignment
        );

        Ok(Self {
            region,
            next_alloc: 0,
            alignment,
        })
    }

    /// Returns the current cursor and advances it by `size` rounded up to the
    /// alignment, or `None` if that doesn't fit in what's left of the region.
    pub fn allocate(&mut self, size: usize) -> Pointer<u8> {
        if size > self.remaining() {
            return None;
        }

        let size = self.alignment.align(size);
        if self.next_alloc + size > self.region.len() {
            return None;
        }

        // SAFETY: `next_alloc + size` is within the region.
        let address = unsafe { self.region.at(self.next_alloc) };
        self.next_alloc += size;

        Some(address)
    }

    /// Same as [`BumpAllocator::allocate`] but the memory is zeroed.
    pub fn allocate_clean(&mut self, size: usize) -> Pointer<u8> {
        let address = self.allocate(size)?;
        // SAFETY: we just handed out at least `size` bytes at `address`.
        unsafe { address.as_ptr().write_bytes(0, size) };

        Some(address)
    }

    /// Moves the cursor back to `address`, releasing it and everything that
    /// was allocated after it.
    ///
    /// # Safety
    ///
    /// `address` must be the most recent allocation that is still live. This
    /// is not checked: freeing anything else silently corrupts the cursor and
    /// the byte count, and freeing an older allocation also releases every
    /// allocation made after it while their pointers are still around.
    pub unsafe fn free(&mut self, address: NonNull<u8>) {
        self.next_alloc = self.region.offset_of(address);
    }

    /// Releases everything. All previously returned pointers become invalid.
    pub fn free_all(&mut self) {
        log::trace!("bump allocator reset, {} bytes released", self.next_alloc);
        self.next_alloc = 0;
    }

    /// Live bytes, alignment padding included.
    #[inline]
    pub fn count(&self) -> usize {
        self.next_alloc
    }

    /// Region length in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.region.len() - self.next_alloc
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

impl fmt::Debug for BumpAllocator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BumpAllocator")
            .field("region", &self.region)
            .field("count", &self.next_alloc)
            .field("alignment", &self.alignment)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::AlignedBuffer;

    #[test]
    fn allocations_are_contiguous_and_aligned() {
        let mut buffer = AlignedBuffer::<256>::new();
        let mut allocator = BumpAllocator::new(buffer.as_mut_slice(), 16).unwrap();
        let base = allocator.region.base();

        unsafe {
            let first = allocator.allocate(1).unwrap();
            let second = allocator.allocate(17).unwrap();
            let third = allocator.allocate(16).unwrap();

            assert_eq!(first, base);
            assert_eq!(second.as_ptr().offset_from(base.as_ptr()), 16);
            assert_eq!(third.as_ptr().offset_from(base.as_ptr()), 48);
            assert_eq!(allocator.count(), 64);
        }
    }

    #[test]
    fn lifo_round_trip() {
        let mut buffer = AlignedBuffer::<128>::new();
        let mut allocator = BumpAllocator::new(buffer.as_mut_slice(), 8).unwrap();
        let base = allocator.region.base();

        let a = allocator.allocate(24).unwrap();
        let b = allocator.allocate(40).unwrap();
        assert_eq!(allocator.count(), 64);

        unsafe {
            allocator.free(b);
            assert_eq!(allocator.count(), 24);
            allocator.free(a);
        }

        assert_eq!(allocator.count(), 0);
        // Cursor is back at base, so next allocation starts there.
        assert_eq!(allocator.allocate(8), Some(base));
    }

    #[test]
    fn capacity_bound() {
        let mut buffer = AlignedBuffer::<128>::new();
        let mut allocator = BumpAllocator::new(buffer.as_mut_slice(), 8).unwrap();

        for size in [8, 16, 32, 64, 8] {
            assert!(allocator.allocate(size).is_some());
        }

        assert_eq!(allocator.remaining(), 0);
        assert!(allocator.allocate(1).is_none());
        // Zero bytes still fit at the very end.
        assert!(allocator.allocate(0).is_some());
    }

    #[test]
    fn alignment_padding_counts_against_capacity() {
        let mut buffer = AlignedBuffer::<64>::new();
        let mut allocator = BumpAllocator::new(buffer.as_mut_slice(), 32).unwrap();

        assert!(allocator.allocate(1).is_some());
        assert!(allocator.allocate(1).is_some());
        assert!(allocator.allocate(1).is_none());
    }

    #[test]
    fn huge_requests_fail_without_overflow() {
        let mut buffer = AlignedBuffer::<64>::new();
        let mut allocator = BumpAllocator::new(buffer.as_mut_slice(), 8).unwrap();

        assert!(allocator.allocate(usize::MAX).is_none());
        assert_eq!(allocator.count(), 0);
    }

    #[test]
    fn allocate_clean_zeroes_reused_memory() {
        let mut buffer = AlignedBuffer::<64>::new();
        let mut allocator = BumpAllocator::new(buffer.as_mut_slice(), 8).unwrap();

        unsafe {
            let dirty = allocator.allocate(32).unwrap();
            dirty.as_ptr().write_bytes(0xAB, 32);
            allocator.free(dirty);

            let clean = allocator.allocate_clean(32).unwrap();
            assert_eq!(clean, dirty);
            let content = std::slice::from_raw_parts(clean.as_ptr(), 32);
            assert!(content.iter().all(|&byte| byte == 0));
        }
    }

    #[test]
    fn free_all_starts_over() {
        let mut buffer = AlignedBuffer::<64>::new();
        let mut allocator = BumpAllocator::new(buffer.as_mut_slice(), 8).unwrap();
        let base = allocator.region.base();

        while allocator.allocate(8).is_some() {}
        allocator.free_all();

        assert_eq!(allocator.count(), 0);
        assert_eq!(allocator.allocate(64), Some(base));
    }

    #[test]
    fn invalid_configuration() {
        let mut buffer = AlignedBuffer::<64>::new();
        assert_eq!(
            BumpAllocator::new(buffer.as_mut_slice(), 3).unwrap_err(),
            InitError::InvalidAlignment(3)
        );

        let misaligned = &mut buffer.as_mut_slice()[4..];
        assert!(matches!(
            BumpAllocator::new(misaligned, 8),
            Err(InitError::MisalignedRegion { alignment: 8, .. })
        ));
    }
}
