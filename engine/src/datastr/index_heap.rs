//! An addressable priority queue on top of a 4-ary min heap.
//!
//! Elements are identified by a dense index, so their keys can be changed while they are in the queue.
//!
//! ```
//! use rust_traffic_assignment::datastr::index_heap::{IndexdMinHeap, Indexing};
//!
//! #[derive(Copy, Clone, Eq, PartialEq, Debug, Ord, PartialOrd)]
//! struct Entry {
//!     key: u64,
//!     id: usize,
//! }
//!
//! impl Indexing for Entry {
//!     fn as_index(&self) -> usize {
//!         self.id
//!     }
//! }
//!
//! let mut queue = IndexdMinHeap::new(3);
//! queue.push(Entry { key: 42, id: 0 });
//! queue.push(Entry { key: 23, id: 1 });
//! queue.decrease_key(Entry { key: 1, id: 0 });
//! assert_eq!(queue.pop(), Some(Entry { key: 1, id: 0 }));
//! assert_eq!(queue.pop(), Some(Entry { key: 23, id: 1 }));
//! assert!(queue.is_empty());
//! ```

use std::cmp::Ordering;

/// Maps queue elements to a unique index in `[0, max_index)`.
pub trait Indexing {
    fn as_index(&self) -> usize;
}

const ARITY: usize = 4;
const NOT_IN_QUEUE: usize = usize::MAX;

/// Min heap over elements with unique indices.
/// `positions` maps each index to the slot of its element in `elements`.
#[derive(Debug, Clone)]
pub struct IndexdMinHeap<T> {
    positions: Vec<usize>,
    elements: Vec<T>,
}

impl<T: Ord + Indexing> IndexdMinHeap<T> {
    pub fn new(max_index: usize) -> IndexdMinHeap<T> {
        IndexdMinHeap {
            positions: vec![NOT_IN_QUEUE; max_index],
            elements: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains_index(&self, index: usize) -> bool {
        self.positions[index] != NOT_IN_QUEUE
    }

    pub fn peek(&self) -> Option<&T> {
        self.elements.first()
    }

    pub fn clear(&mut self) {
        for element in &self.elements {
            self.positions[element.as_index()] = NOT_IN_QUEUE;
        }
        self.elements.clear();
    }

    /// Panics if an element with the same index is already queued.
    pub fn push(&mut self, element: T) {
        let index = element.as_index();
        assert!(!self.contains_index(index), "element {} is already queued", index);
        self.positions[index] = self.elements.len();
        self.elements.push(element);
        self.sift_up(self.elements.len() - 1);
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.elements.is_empty() {
            return None;
        }
        let last = self.elements.len() - 1;
        self.swap_slots(0, last);
        let min = self.elements.pop()?;
        self.positions[min.as_index()] = NOT_IN_QUEUE;
        if !self.elements.is_empty() {
            self.sift_down(0);
        }
        Some(min)
    }

    /// Replace the queued element with the same index by `element` and restore the heap order in either direction.
    pub fn update_key(&mut self, element: T) {
        let slot = self.positions[element.as_index()];
        match element.cmp(&self.elements[slot]) {
            Ordering::Less => self.decrease_key(element),
            Ordering::Greater => self.increase_key(element),
            Ordering::Equal => (),
        }
    }

    pub fn decrease_key(&mut self, element: T) {
        let slot = self.positions[element.as_index()];
        self.elements[slot] = element;
        self.sift_up(slot);
    }

    pub fn increase_key(&mut self, element: T) {
        let slot = self.positions[element.as_index()];
        self.elements[slot] = element;
        self.sift_down(slot);
    }

    fn swap_slots(&mut self, a: usize, b: usize) {
        self.elements.swap(a, b);
        self.positions[self.elements[a].as_index()] = a;
        self.positions[self.elements[b].as_index()] = b;
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / ARITY;
            if self.elements[parent] <= self.elements[slot] {
                break;
            }
            self.swap_slots(parent, slot);
            slot = parent;
        }
    }

    fn sift_down(&mut self, mut slot: usize) {
        loop {
            let first_child = ARITY * slot + 1;
            let children = first_child..usize::min(first_child + ARITY, self.elements.len());
            let smallest = match children.min_by(|&a, &b| self.elements[a].cmp(&self.elements[b])) {
                Some(child) => child,
                None => return,
            };
            if self.elements[smallest] >= self.elements[slot] {
                return;
            }
            self.swap_slots(smallest, slot);
            slot = smallest;
        }
    }
}
