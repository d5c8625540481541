use std::ptr::NonNull;

/// Metadata written right before the memory that we give to the caller. The
/// only header this crate uses is [`Header<crate::block::Block>`], but keeping
/// the pointer arithmetic generic keeps it in one place.
///
/// ```text
/// +-------------+
/// |  Header<T>  |
/// +-------------+
/// |   Content   | <- This is what the caller gets.
/// +-------------+
/// |     ...     |
/// +-------------+
/// ```
#[repr(C)]
pub(crate) struct Header<T> {
    pub data: T,
}

impl<T> Header<T> {
    /// Returns a pointer to a [`Header<T>`] given an address that points right
    /// after a valid [`Header<T>`].
    ///
    /// ```text
    /// +-------------+
    /// |  Header<T>  | <- Returned address points here.
    /// +-------------+
    /// |   Content   | <- Given address should point here.
    /// +-------------+
    /// |     ...     |
    /// +-------------+
    /// ```
    ///
    /// # Safety
    ///
    /// Caller must guarantee that the given address points exactly to the first
    /// memory cell after a [`Header<T>`]. This function is mostly used for
    /// deallocating memory, so the allocator user should give us an address
    /// that we previously allocated. As long as that's true, this is safe,
    /// otherwise it's undefined behaviour.
    #[inline]
    pub unsafe fn from_content_address(address: NonNull<u8>) -> NonNull<Self> {
        NonNull::new_unchecked(address.as_ptr().cast::<Self>().offset(-1))
    }

    /// Returns the address after the header.
    ///
    /// # Safety
    ///
    /// `header` must point to a valid [`Header<T>`] inside the region. The
    /// returned address is safe to use as long as no more bytes are written
    /// than the header says the content holds.
    ///
    /// # Notes
    ///
    /// We are using this function as `Header::content_address_of(header)`
    /// instead of `header.content_address()` because we want to avoid creating
    /// intermediary references to `self` to keep Miri happy. See
    /// [Stacked Borrows](https://github.com/rust-lang/unsafe-code-guidelines/blob/master/wip/stacked-borrows.md).
    #[inline]
    pub unsafe fn content_address_of(header: NonNull<Self>) -> NonNull<u8> {
        NonNull::new_unchecked(header.as_ptr().offset(1)).cast()
    }
}
