//! Alignment configuration shared by all allocators.
//!
//! Alignment here is about *sizes*: every request is rounded up to a multiple
//! of the configured alignment, so as long as the region base is aligned the
//! bump and pool allocators hand out addresses with that same alignment. The
//! general allocator places an 8 byte (on 64 bit machines) size header right
//! before every payload, so its payload addresses are only guaranteed to be
//! aligned to the smaller of the configured alignment and [`POINTER_SIZE`].
//! See [`crate::general`].
//!
//! Nothing forces alignment up to pointer size. Pool and general allocators
//! store links and headers inside the region, and those are read and written
//! with unaligned accesses, so alignment 1 packs everything tightly.

use std::{fmt, mem};

use crate::{align::align, error::InitError};

/// Pointer size in bytes on the current machine (or target architecture). Most
/// personal computers nowadays are 64 bit machines, so this is going to equal
/// 8 in most cases.
pub const POINTER_SIZE: usize = mem::size_of::<usize>();

/// A power of two byte boundary. Once constructed it's always valid, so the
/// allocators never have to check it again.
///
/// ```rust
/// use arenalloc::Alignment;
///
/// assert!(Alignment::new(16).is_ok());
/// assert!(Alignment::new(12).is_err());
/// assert_eq!(Alignment::new(4).unwrap().align(5), 8);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Alignment(usize);

impl Alignment {
    /// Validates that `value` is a power of two. Zero is not.
    pub const fn new(value: usize) -> Result<Self, InitError> {
        if value.is_power_of_two() {
            Ok(Self(value))
        } else {
            Err(InitError::InvalidAlignment(value))
        }
    }

    /// Raw alignment in bytes.
    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }

    /// Rounds `size` up to this alignment. See [`crate::align`].
    #[inline]
    pub fn align(self, size: usize) -> usize {
        align(size, self.0)
    }
}

impl TryFrom<usize> for Alignment {
    type Error = InitError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Debug for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Alignment({})", self.0)
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn powers_of_two_are_accepted() {
        for shift in 0..usize::BITS {
            let value = 1usize << shift;
            assert_eq!(Alignment::new(value).map(Alignment::get), Ok(value));
        }
    }

    #[test]
    fn everything_else_is_rejected() {
        for value in [0, 3, 6, 12, 24, 100, usize::MAX] {
            assert_eq!(
                Alignment::try_from(value),
                Err(InitError::InvalidAlignment(value))
            );
        }
    }

    #[test]
    fn rounds_sizes_up() {
        let one = Alignment::new(1).unwrap();
        assert_eq!(one.align(17), 17);

        let sixteen = Alignment::new(16).unwrap();
        assert_eq!(sixteen.align(17), 32);
        assert_eq!(sixteen.align(32), 32);
    }
}
