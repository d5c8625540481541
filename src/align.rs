/// Rounds `size` up to the next multiple of `alignment`, which must be a power
/// of two. Sizes that are already aligned are returned unchanged.
///
/// # Examples
///
/// ```rust
/// use arenalloc::align;
///
/// assert_eq!(align(13, 8), 16);
/// assert_eq!(align(16, 8), 16);
/// assert_eq!(align(0, 4), 0);
/// ```
///
/// The caller is responsible for `size + alignment - 1` not overflowing, the
/// allocators reject sizes larger than their region before calling this.
#[inline]
pub fn align(size: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (size + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align() {
        for alignment in [1, 2, 4, 8, 16, 32, 64] {
            let mut alignments = Vec::new();

            for i in 0..10 {
                // With alignment 8: (1..=8), (9..=16), (17..=24) and so on.
                let sizes = (alignment * i + 1)..=(alignment * (i + 1));
                // Matching the sizes above, this would be: 8, 16, 24 and so on.
                let expected_alignment = alignment * (i + 1);
                alignments.push((sizes, expected_alignment));
            }

            for (sizes, expected) in alignments {
                for size in sizes {
                    assert_eq!(expected, align(size, alignment));
                }
            }
        }
    }

    #[test]
    fn zero_stays_zero() {
        assert_eq!(align(0, 1), 0);
        assert_eq!(align(0, 64), 0);
    }
}
