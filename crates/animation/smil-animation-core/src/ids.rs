//! Identifiers and a simple allocator for registered timed elements.

use serde::{Deserialize, Serialize};

/// Arena index of a registered timed element.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u32);

impl ElementId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Monotonic allocator for ElementId.
/// Dense indices keep the arena compact; IDs are never reused within one workplace.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_element: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_element(&mut self) -> ElementId {
        let id = ElementId(self.next_element);
        self.next_element = self.next_element.wrapping_add(1);
        id
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_monotonic() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.alloc_element(), ElementId(0));
        assert_eq!(alloc.alloc_element(), ElementId(1));
        alloc.reset();
        assert_eq!(alloc.alloc_element().index(), 0);
    }
}
