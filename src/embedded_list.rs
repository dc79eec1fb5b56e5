//! Doubly-linked lists whose links live inside the nodes.
//!
//! Nodes are stored in a `Vec` arena and addressed by their index.
//! A list only holds the indices of its first and last node and its length,
//! so it is `Copy` and can be moved around (for example from a block into a
//! marking record) without touching any node.
//! All operations except iteration are O(1) and never allocate.
//!
//! A node must be a member of at most one list at a time.
//! Erasing a node from a list it is not a member of corrupts both lists;
//! this is only caught by debug assertions.

/// Link fields embedded in every list node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Links {
    prev: Option<usize>,
    next: Option<usize>,
}

/// Implemented by node types that can be members of an [`EmbeddedList`].
pub trait Linked {
    fn links(&self) -> &Links;
    fn links_mut(&mut self) -> &mut Links;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbeddedList {
    first: Option<usize>,
    last: Option<usize>,
    len: usize,
}

impl EmbeddedList {
    pub const fn new() -> Self {
        EmbeddedList {
            first: None,
            last: None,
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn front(&self) -> Option<usize> {
        self.first
    }

    #[inline]
    pub fn back(&self) -> Option<usize> {
        self.last
    }

    /// The successor of node `i` in whatever list it is a member of.
    #[inline]
    pub fn next_of<T: Linked>(nodes: &[T], i: usize) -> Option<usize> {
        nodes[i].links().next
    }

    pub fn push_back<T: Linked>(&mut self, nodes: &mut [T], i: usize) {
        *nodes[i].links_mut() = Links { prev: self.last, next: None };
        match self.last {
            Some(last) => nodes[last].links_mut().next = Some(i),
            None => self.first = Some(i),
        }
        self.last = Some(i);
        self.len += 1;
    }

    pub fn push_front<T: Linked>(&mut self, nodes: &mut [T], i: usize) {
        *nodes[i].links_mut() = Links { prev: None, next: self.first };
        match self.first {
            Some(first) => nodes[first].links_mut().prev = Some(i),
            None => self.last = Some(i),
        }
        self.first = Some(i);
        self.len += 1;
    }

    /// Unlink node `i`, which must be a member of this list.
    pub fn erase<T: Linked>(&mut self, nodes: &mut [T], i: usize) {
        debug_assert!(self.len > 0, "erase from an empty list");
        let Links { prev, next } = *nodes[i].links();
        match prev {
            Some(prev) => nodes[prev].links_mut().next = next,
            None => {
                debug_assert_eq!(self.first, Some(i), "node is not a member of this list");
                self.first = next;
            }
        }
        match next {
            Some(next) => nodes[next].links_mut().prev = prev,
            None => {
                debug_assert_eq!(self.last, Some(i), "node is not a member of this list");
                self.last = prev;
            }
        }
        *nodes[i].links_mut() = Links::default();
        self.len -= 1;
    }

    /// Move all nodes of `other` to the end of this list, leaving `other` empty.
    pub fn append<T: Linked>(&mut self, nodes: &mut [T], other: &mut EmbeddedList) {
        let donor = other.take();
        let Some(donor_first) = donor.first else {
            return;
        };
        match self.last {
            Some(last) => {
                nodes[last].links_mut().next = Some(donor_first);
                nodes[donor_first].links_mut().prev = Some(last);
            }
            None => self.first = Some(donor_first),
        }
        self.last = donor.last;
        self.len += donor.len;
    }

    /// Return the list, leaving an empty list in its place.
    #[inline]
    pub fn take(&mut self) -> EmbeddedList {
        std::mem::take(self)
    }

    pub fn iter<'a, T: Linked>(&self, nodes: &'a [T]) -> Iter<'a, T> {
        Iter {
            nodes,
            cursor: self.first,
            remaining: self.len,
        }
    }
}

/// Iterator over the node indices of an [`EmbeddedList`].
pub struct Iter<'a, T> {
    nodes: &'a [T],
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a, T: Linked> Iterator for Iter<'a, T> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.cursor?;
        self.cursor = self.nodes[current].links().next;
        self.remaining -= 1;
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T: Linked> ExactSizeIterator for Iter<'a, T> {}

/// Move node `i` from the list `source` to the end of `dest`.
#[inline]
pub fn move_back<T: Linked>(nodes: &mut [T], i: usize, source: &mut EmbeddedList, dest: &mut EmbeddedList) {
    source.erase(nodes, i);
    dest.push_back(nodes, i);
}
