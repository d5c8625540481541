use std::{fmt, marker::PhantomData, ptr::NonNull};

use crate::{alignment::Alignment, error::InitError};

/// Memory region managed by one of the allocators. The allocators never
/// request or return memory, they only work inside the region they were given
/// when constructed:
///
/// ```text
/// base                                                           base + len
///  |                                                                  |
///  v                                                                  v
///  +------------------------------------------------------------------+
///  |                    caller owned, fixed length                    |
///  +------------------------------------------------------------------+
/// ```
///
/// A region built from `&'a mut [u8]` borrows the buffer for `'a`, so the
/// compiler makes sure the buffer outlives any allocator built on top of it.
/// For memory that doesn't come as a slice (linker provided heaps, static
/// arrays shared with C, etc.) see [`Region::from_raw_parts`].
pub struct Region<'a> {
    /// First byte of the region.
    base: NonNull<u8>,
    /// Length of the region in bytes.
    len: usize,
    marker: PhantomData<&'a mut [u8]>,
}

impl<'a> Region<'a> {
    /// Borrows `memory` as a region.
    pub fn new(memory: &'a mut [u8]) -> Self {
        let len = memory.len();
        // Slices are never null, even empty ones.
        let base = NonNull::from(memory).cast::<u8>();

        Self {
            base,
            len,
            marker: PhantomData,
        }
    }

    /// Builds a region out of a raw base address and length.
    ///
    /// # Safety
    ///
    /// `base` must be valid for reads and writes of `len` bytes for the whole
    /// lifetime `'a`, nothing else may access that memory while the region (or
    /// an allocator owning it) is alive, and `len` must not exceed
    /// [`isize::MAX`].
    pub unsafe fn from_raw_parts(base: NonNull<u8>, len: usize) -> Self {
        Self {
            base,
            len,
            marker: PhantomData,
        }
    }

    /// Address of the first byte.
    #[inline]
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `address` points somewhere inside this region. This does not
    /// tell whether the address is currently allocated.
    pub fn contains(&self, address: NonNull<u8>) -> bool {
        let base = self.base.as_ptr() as usize;
        let address = address.as_ptr() as usize;

        address >= base && address - base < self.len
    }

    /// Returns the address located `offset` bytes after the base.
    ///
    /// # Safety
    ///
    /// `offset` must not exceed [`Region::len`].
    #[inline]
    pub(crate) unsafe fn at(&self, offset: usize) -> NonNull<u8> {
        NonNull::new_unchecked(self.base.as_ptr().add(offset))
    }

    /// Distance in bytes between the base and `address`.
    ///
    /// # Safety
    ///
    /// `address` must point inside the region or exactly one byte past its
    /// end.
    #[inline]
    pub(crate) unsafe fn offset_of(&self, address: NonNull<u8>) -> usize {
        address.as_ptr().offset_from(self.base.as_ptr()) as usize
    }

    /// Makes sure that the base address satisfies `alignment`, otherwise none
    /// of the addresses computed by the allocators would. Empty regions never
    /// hand out an address, and their base is dangling anyway.
    pub(crate) fn check_alignment(&self, alignment: Alignment) -> Result<(), InitError> {
        if self.is_empty() || self.base.as_ptr().align_offset(alignment.get()) == 0 {
            Ok(())
        } else {
            Err(InitError::MisalignedRegion {
                base: self.base.as_ptr() as usize,
                alignment: alignment.get(),
            })
        }
    }
}

impl<'a> From<&'a mut [u8]> for Region<'a> {
    fn from(memory: &'a mut [u8]) -> Self {
        Self::new(memory)
    }
}

impl<'a, const N: usize> From<&'a mut [u8; N]> for Region<'a> {
    fn from(memory: &'a mut [u8; N]) -> Self {
        Self::new(memory.as_mut_slice())
    }
}

impl fmt::Debug for Region<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("base", &self.base)
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::AlignedBuffer;

    #[test]
    fn borrows_whole_slice() {
        let mut buffer = AlignedBuffer::<128>::new();
        let expected = buffer.0.as_mut_ptr();
        let region = Region::new(buffer.as_mut_slice());

        assert_eq!(region.base().as_ptr(), expected);
        assert_eq!(region.len(), 128);
        assert!(!region.is_empty());
    }

    #[test]
    fn contains_only_its_own_bytes() {
        let mut buffer = AlignedBuffer::<64>::new();
        let (left, right) = buffer.as_mut_slice().split_at_mut(32);
        let outside = NonNull::from(&mut right[0]);
        let region = Region::new(left);

        unsafe {
            assert!(region.contains(region.at(0)));
            assert!(region.contains(region.at(31)));
            assert!(!region.contains(region.at(32)));
        }
        assert!(!region.contains(outside));
    }

    #[test]
    fn offsets_round_trip() {
        let mut buffer = AlignedBuffer::<64>::new();
        let region = Region::new(buffer.as_mut_slice());

        unsafe {
            for offset in [0, 1, 17, 63, 64] {
                assert_eq!(region.offset_of(region.at(offset)), offset);
            }
        }
    }

    #[test]
    fn misaligned_base_is_rejected() {
        let mut buffer = AlignedBuffer::<64>::new();
        let region = Region::new(&mut buffer.as_mut_slice()[1..]);

        assert!(region.check_alignment(Alignment::new(1).unwrap()).is_ok());
        assert!(matches!(
            region.check_alignment(Alignment::new(8).unwrap()),
            Err(InitError::MisalignedRegion { alignment: 8, .. })
        ));
    }

    #[test]
    fn empty_region_has_no_alignment_requirement() {
        let mut buffer = AlignedBuffer::<64>::new();
        let region = Region::new(&mut buffer.as_mut_slice()[1..1]);

        assert!(region.is_empty());
        assert!(region.check_alignment(Alignment::new(64).unwrap()).is_ok());
    }
}
