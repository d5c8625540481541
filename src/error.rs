use thiserror::Error;

/// Reasons why an allocator can't be built on top of a region. These are the
/// only errors this crate returns: running out of space is reported as
/// [`None`] by the allocation functions, and misuse of pointers is undefined
/// behaviour rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("alignment {0} is not a power of two")]
    InvalidAlignment(usize),

    #[error("region base {base:#x} is not aligned to {alignment} bytes")]
    MisalignedRegion { base: usize, alignment: usize },

    #[error("slot size {0} overflows when aligned")]
    SlotSizeOverflow(usize),
}
