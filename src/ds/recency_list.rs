//! Doubly linked recency list backed by `SlotArena`.
//!
//! Nodes live in a [`SlotArena`] and link to each other by [`SlotId`], so the
//! list is a secondary ordering over values the arena owns. The front is the
//! least recently used node and the back the most recently used one.
//!
//! ## Architecture
//!
//! ```text
//!   arena (SlotArena<Node<T>>)
//!   ┌────────┬─────────────────────────────────────────────┐
//!   │ SlotId │ Node { value, prev, next }                  │
//!   ├────────┼─────────────────────────────────────────────┤
//!   │ id_1   │ { value: A, prev: None, next: Some(id_2) }  │
//!   │ id_2   │ { value: B, prev: Some(id_1), next: id_3 }  │
//!   │ id_3   │ { value: C, prev: Some(id_2), next: None }  │
//!   └────────┴─────────────────────────────────────────────┘
//!
//!   head (LRU) ─► [id_1] ◄──► [id_2] ◄──► [id_3] ◄── tail (MRU)
//! ```
//!
//! ## Operations
//! - `push_back(value)`: O(1), new node becomes the tail
//! - `move_to_back(id)`: O(1), unlink + append at tail
//! - `remove(id)`: O(1), unlink + free slot in arena
//! - `iter` / `iter_entries`: O(n), head to tail

use std::collections::HashSet;

use crate::ds::slot_arena::{SlotArena, SlotId};
use crate::error::InvariantError;

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

/// Recency list; `head` is least recently used, `tail` most recently used.
#[derive(Debug)]
pub struct RecencyList<T> {
    arena: SlotArena<Node<T>>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
}

impl<T> RecencyList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            arena: SlotArena::new(),
            head: None,
            tail: None,
        }
    }

    /// Creates an empty list with reserved node capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: SlotArena::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.arena.contains(id)
    }

    /// SlotId of the least recently used node.
    pub fn head_id(&self) -> Option<SlotId> {
        self.head
    }

    /// SlotId of the most recently used node.
    pub fn tail_id(&self) -> Option<SlotId> {
        self.tail
    }

    pub fn head(&self) -> Option<&T> {
        self.head.and_then(|id| self.get(id))
    }

    pub fn tail(&self) -> Option<&T> {
        self.tail.and_then(|id| self.get(id))
    }

    /// Neighbour towards the tail.
    pub fn next_id(&self, id: SlotId) -> Option<SlotId> {
        self.arena.get(id).and_then(|node| node.next)
    }

    /// Neighbour towards the head.
    pub fn prev_id(&self, id: SlotId) -> Option<SlotId> {
        self.arena.get(id).and_then(|node| node.prev)
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.arena.get(id).map(|node| &node.value)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.arena.get_mut(id).map(|node| &mut node.value)
    }

    /// Values from head (LRU) to tail (MRU).
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            current: self.head,
        }
    }

    /// `(SlotId, &T)` pairs from head (LRU) to tail (MRU).
    pub fn iter_entries(&self) -> EntryIter<'_, T> {
        EntryIter {
            list: self,
            current: self.head,
        }
    }

    /// Appends a new node at the tail and returns its `SlotId`.
    pub fn push_back(&mut self, value: T) -> SlotId {
        let id = self.arena.insert(Node {
            value,
            prev: self.tail,
            next: None,
        });
        if let Some(tail) = self.tail {
            if let Some(node) = self.arena.get_mut(tail) {
                node.next = Some(id);
            }
        } else {
            self.head = Some(id);
        }
        self.tail = Some(id);
        id
    }

    /// Unlinks `id` and frees its slot, returning the value.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        self.unlink(id)?;
        self.arena.remove(id).map(|node| node.value)
    }

    /// Moves an existing node to the tail; returns `false` if `id` is not present.
    pub fn move_to_back(&mut self, id: SlotId) -> bool {
        if !self.arena.contains(id) {
            return false;
        }
        if Some(id) == self.tail {
            return true;
        }
        self.unlink(id);
        self.attach_back(id);
        true
    }

    /// Frees every node.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.head = None;
        self.tail = None;
    }

    fn unlink(&mut self, id: SlotId) -> Option<()> {
        let (prev, next) = {
            let node = self.arena.get(id)?;
            (node.prev, node.next)
        };

        match prev {
            Some(prev_id) => {
                if let Some(prev_node) = self.arena.get_mut(prev_id) {
                    prev_node.next = next;
                }
            },
            None => self.head = next,
        }

        match next {
            Some(next_id) => {
                if let Some(next_node) = self.arena.get_mut(next_id) {
                    next_node.prev = prev;
                }
            },
            None => self.tail = prev,
        }

        if let Some(node) = self.arena.get_mut(id) {
            node.prev = None;
            node.next = None;
        }

        Some(())
    }

    fn attach_back(&mut self, id: SlotId) -> Option<()> {
        let old_tail = self.tail;
        let node = self.arena.get_mut(id)?;
        node.next = None;
        node.prev = old_tail;
        match old_tail {
            Some(old_tail) => {
                if let Some(tail_node) = self.arena.get_mut(old_tail) {
                    tail_node.next = Some(id);
                }
            },
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        Some(())
    }

    /// Walks head to tail checking endpoint, link symmetry and acyclicity.
    pub fn check_links(&self) -> Result<(), InvariantError> {
        if self.head.is_none() || self.tail.is_none() {
            if self.head.is_some() || self.tail.is_some() {
                return Err(InvariantError::new("only one of head/tail is set"));
            }
            if !self.is_empty() {
                return Err(InvariantError::new(format!(
                    "list has no endpoints but holds {} nodes",
                    self.len()
                )));
            }
            return Ok(());
        }

        let mut seen = HashSet::with_capacity(self.len());
        let mut prev = None;
        let mut current = self.head;

        while let Some(id) = current {
            if !seen.insert(id) {
                return Err(InvariantError::new("cycle detected in recency list"));
            }
            let node = self
                .arena
                .get(id)
                .ok_or_else(|| InvariantError::new("link points at a freed slot"))?;
            if node.prev != prev {
                return Err(InvariantError::new("prev link does not match walk order"));
            }
            if node.next.is_none() && self.tail != Some(id) {
                return Err(InvariantError::new("last reachable node is not the tail"));
            }
            prev = Some(id);
            current = node.next;
        }

        if seen.len() != self.len() {
            return Err(InvariantError::new(format!(
                "reached {} nodes walking the list, arena holds {}",
                seen.len(),
                self.len()
            )));
        }
        Ok(())
    }
}

impl<T> Default for RecencyList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over values from head to tail.
pub struct Iter<'a, T> {
    list: &'a RecencyList<T>,
    current: Option<SlotId>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let node = self.list.arena.get(id)?;
        self.current = node.next;
        Some(&node.value)
    }
}

/// Iterator over `(SlotId, &T)` from head to tail.
pub struct EntryIter<'a, T> {
    list: &'a RecencyList<T>,
    current: Option<SlotId>,
}

impl<'a, T> Iterator for EntryIter<'a, T> {
    type Item = (SlotId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let node = self.list.arena.get(id)?;
        self.current = node.next;
        Some((id, &node.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<T: Copy>(list: &RecencyList<T>) -> Vec<T> {
        list.iter().copied().collect()
    }

    #[test]
    fn push_back_orders_head_to_tail() {
        let mut list = RecencyList::new();
        let a = list.push_back(1);
        list.push_back(2);
        let c = list.push_back(3);

        assert_eq!(collect(&list), vec![1, 2, 3]);
        assert_eq!(list.head_id(), Some(a));
        assert_eq!(list.tail_id(), Some(c));
        assert_eq!(list.prev_id(a), None);
        assert_eq!(list.next_id(c), None);
        list.check_links().unwrap();
    }

    #[test]
    fn move_to_back_from_each_position() {
        let mut list = RecencyList::new();
        let a = list.push_back('a');
        let b = list.push_back('b');
        let c = list.push_back('c');

        assert!(list.move_to_back(b));
        assert_eq!(collect(&list), vec!['a', 'c', 'b']);
        assert!(list.move_to_back(a));
        assert_eq!(collect(&list), vec!['c', 'b', 'a']);
        assert!(list.move_to_back(a));
        assert_eq!(collect(&list), vec!['c', 'b', 'a']);
        assert_eq!(list.head_id(), Some(c));
        list.check_links().unwrap();
    }

    #[test]
    fn remove_patches_neighbours_and_endpoints() {
        let mut list = RecencyList::new();
        let a = list.push_back(10);
        let b = list.push_back(20);
        let c = list.push_back(30);

        assert_eq!(list.remove(b), Some(20));
        assert_eq!(list.next_id(a), Some(c));
        assert_eq!(list.prev_id(c), Some(a));

        assert_eq!(list.remove(a), Some(10));
        assert_eq!(list.head_id(), Some(c));
        assert_eq!(list.remove(c), Some(30));
        assert!(list.head_id().is_none());
        assert!(list.tail_id().is_none());
        assert!(list.is_empty());
        list.check_links().unwrap();
    }

    #[test]
    fn stale_ids_are_rejected() {
        let mut list = RecencyList::new();
        let a = list.push_back(1);
        list.remove(a);
        list.push_back(2);

        assert!(!list.move_to_back(a));
        assert_eq!(list.remove(a), None);
        assert_eq!(list.len(), 1);
        list.check_links().unwrap();
    }

    #[test]
    fn clear_resets_endpoints() {
        let mut list = RecencyList::new();
        for i in 0..5 {
            list.push_back(i);
        }
        list.clear();
        assert!(list.is_empty());
        assert!(list.head().is_none());
        assert!(list.tail().is_none());
        list.check_links().unwrap();
    }

    #[test]
    fn iter_entries_yields_live_ids() {
        let mut list = RecencyList::new();
        let ids: Vec<_> = (0..4).map(|i| list.push_back(i)).collect();
        let walked: Vec<_> = list.iter_entries().map(|(id, _)| id).collect();
        assert_eq!(walked, ids);
    }
}
