use std::{marker::PhantomData, ptr, ptr::NonNull};

use crate::Pointer;

/// Doubly linked list node. The list never allocates nodes itself, they are
/// written at addresses provided by the caller (we are the allocator after
/// all). See [`crate::freelist`] for the only place where this is used.
///
/// Nodes live wherever the caller's alignment puts them, which can be an odd
/// address when the allocator was configured with alignment 1. That's why
/// nodes are never accessed through references: every read and write goes
/// through the unaligned raw pointer functions below.
#[derive(Clone, Copy)]
#[repr(C)]
pub(crate) struct Node {
    pub next: Pointer<Self>,
    pub prev: Pointer<Self>,
}

impl Node {
    /// Reads the links stored at `node`.
    ///
    /// # Safety
    ///
    /// `node` must point to a node written by [`LinkedList`].
    #[inline]
    pub unsafe fn read(node: NonNull<Self>) -> Self {
        node.as_ptr().read_unaligned()
    }

    #[inline]
    unsafe fn set_next(node: NonNull<Self>, next: Pointer<Self>) {
        ptr::addr_of_mut!((*node.as_ptr()).next).write_unaligned(next);
    }

    #[inline]
    unsafe fn set_prev(node: NonNull<Self>, prev: Pointer<Self>) {
        ptr::addr_of_mut!((*node.as_ptr()).prev).write_unaligned(prev);
    }
}

/// Intrusive doubly linked list. New nodes always go to the front because
/// the allocators want "most recently freed, first reused". Being doubly
/// linked means any node can be unlinked or replaced in O(1) without walking
/// the list again.
pub(crate) struct LinkedList {
    pub head: Pointer<Node>,
    pub len: usize,
}

impl LinkedList {
    /// Creates an empty linked list. No allocations happen because, well, we
    /// are the allocator.
    pub const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    /// Number of nodes currently linked.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Not used internally, for now we only need it for testing.
    #[cfg(test)]
    pub fn first(&self) -> Pointer<Node> {
        self.head
    }

    /// Writes a new node at `address` and makes it the new head.
    ///
    /// # Safety
    ///
    /// `address` must be valid for writes of a [`Node`] and not part of any
    /// other live node. It doesn't need to be aligned.
    pub unsafe fn push_front(&mut self, address: NonNull<u8>) -> NonNull<Node> {
        let node = address.cast::<Node>();

        node.as_ptr().write_unaligned(Node {
            next: self.head,
            prev: None,
        });

        if let Some(head) = self.head {
            Node::set_prev(head, Some(node));
        }

        self.head = Some(node);
        self.len += 1;

        node
    }

    /// Unlinks `node`. Its memory is left as is, the caller decides what to do
    /// with it.
    ///
    /// # Safety
    ///
    /// `node` must be a member of this list.
    pub unsafe fn remove(&mut self, node: NonNull<Node>) {
        let Node { next, prev } = Node::read(node);

        match prev {
            Some(prev) => Node::set_next(prev, next),
            None => self.head = next,
        }

        if let Some(next) = next {
            Node::set_prev(next, prev);
        }

        self.len -= 1;
    }

    /// Writes a new node at `address` and puts it exactly where `node` was:
    /// it inherits `node`'s neighbours and `node` is no longer part of the
    /// list. The length doesn't change.
    ///
    /// # Safety
    ///
    /// `node` must be a member of this list. `address` must be valid for
    /// writes of a [`Node`] and must not overlap `node`.
    pub unsafe fn replace(&mut self, node: NonNull<Node>, address: NonNull<u8>) -> NonNull<Node> {
        let links = Node::read(node);
        let replacement = address.cast::<Node>();

        replacement.as_ptr().write_unaligned(links);

        match links.prev {
            Some(prev) => Node::set_next(prev, Some(replacement)),
            None => self.head = Some(replacement),
        }

        if let Some(next) = links.next {
            Node::set_prev(next, Some(replacement));
        }

        replacement
    }

    /// Forgets every node. Nothing is written to memory.
    pub fn clear(&mut self) {
        self.head = None;
        self.len = 0;
    }

    /// Iterates over all nodes from head to tail.
    ///
    /// # Safety
    ///
    /// No node may be modified or unlinked while the iterator is alive.
    pub unsafe fn iter(&self) -> Iter<'_> {
        Iter {
            current: self.head,
            marker: PhantomData,
        }
    }
}

/// Iterator over the raw nodes of a [`LinkedList`].
pub(crate) struct Iter<'a> {
    current: Pointer<Node>,
    marker: PhantomData<&'a LinkedList>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = NonNull<Node>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;
        self.current = unsafe { Node::read(node).next };

        Some(node)
    }
}
