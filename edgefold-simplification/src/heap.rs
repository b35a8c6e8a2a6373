//! Handle-addressable binary heap
//!
//! [`PriorityHeap`] is a binary heap whose nodes are linked rather than packed
//! into an array, so that any element (not just the root) can be removed or
//! re-ordered in place through the [`HeapHandle`] returned when it was
//! inserted. Nodes live in an arena of slots and refer to their parent and
//! children by slot index; the parent link is only used for navigation.
//!
//! The tree is kept complete. The position of the `i`-th node in level order
//! is found by walking the binary digits of `i + 1` from the root (`0` goes
//! left, `1` goes right), so the parent of position `i` is `(i - 1) / 2` and the
//! last node is at position `len - 1`, exactly as in an array heap.

use edgefold_core::{Error, Result};
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

/// Ordering strategy for a [`PriorityHeap`], fixed at construction.
pub trait HeapOrder<T> {
    /// True if `a` must sit strictly closer to the root than `b`.
    fn precedes(&self, a: &T, b: &T) -> bool;
}

/// Smallest value at the root.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinFirst;

/// Largest value at the root.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxFirst;

/// Ordering defined by a comparison closure; `Ordering::Less` goes first.
#[derive(Clone, Copy)]
pub struct OrderBy<F>(pub F);

impl<T: PartialOrd> HeapOrder<T> for MinFirst {
    fn precedes(&self, a: &T, b: &T) -> bool {
        a < b
    }
}

impl<T: PartialOrd> HeapOrder<T> for MaxFirst {
    fn precedes(&self, a: &T, b: &T) -> bool {
        a > b
    }
}

impl<T, F> HeapOrder<T> for OrderBy<F>
where
    F: Fn(&T, &T) -> Ordering,
{
    fn precedes(&self, a: &T, b: &T) -> bool {
        (self.0)(a, b) == Ordering::Less
    }
}

/// Stable identity of an element inside a [`PriorityHeap`].
///
/// A handle stays valid until its element is removed. Slots are recycled, but
/// every reuse bumps the slot generation, so an old handle never resolves to
/// a newer element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapHandle {
    slot: usize,
    generation: u32,
}

impl HeapHandle {
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    parent: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    node: Option<Node<T>>,
}

/// Complete binary heap of linked nodes with handle-based access.
pub struct PriorityHeap<T, O> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    root: Option<usize>,
    len: usize,
    order: O,
}

impl<T, O: HeapOrder<T> + Default> Default for PriorityHeap<T, O> {
    fn default() -> Self {
        Self::new(O::default())
    }
}

impl<T, O> PriorityHeap<T, O> {
    /// Number of elements in the heap
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The ordering strategy
    pub fn order(&self) -> &O {
        &self.order
    }

    /// True if `handle` still names an element of this heap
    pub fn contains(&self, handle: HeapHandle) -> bool {
        self.resolve(handle).is_ok()
    }

    /// Value behind a handle
    pub fn get(&self, handle: HeapHandle) -> Option<&T> {
        let slot = self.resolve(handle).ok()?;
        Some(&self.node(slot).value)
    }

    /// Mutable value behind a handle.
    ///
    /// If the mutation can change the value's ordering, call
    /// [`PriorityHeap::reheapify`] with the same handle afterwards.
    pub fn get_mut(&mut self, handle: HeapHandle) -> Option<&mut T> {
        let slot = self.resolve(handle).ok()?;
        Some(&mut self.node_mut(slot).value)
    }

    /// Handle of the root element
    pub fn peek_min_handle(&self) -> Option<HeapHandle> {
        self.root.map(|slot| self.handle_for(slot))
    }

    /// The root element, i.e. the best value under the heap's ordering
    pub fn peek_min(&self) -> Result<&T> {
        self.root
            .map(|slot| &self.node(slot).value)
            .ok_or(Error::EmptyHeap)
    }

    /// Remove every element. Outstanding handles become stale.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index);
            }
        }
        self.root = None;
        self.len = 0;
    }

    /// Level-order traversal of `(handle, value)` pairs
    pub fn iter(&self) -> Iter<'_, T, O> {
        Iter {
            heap: self,
            queue: self.root.into_iter().collect(),
        }
    }

    fn handle_for(&self, slot: usize) -> HeapHandle {
        HeapHandle {
            slot,
            generation: self.slots[slot].generation,
        }
    }

    fn resolve(&self, handle: HeapHandle) -> Result<usize> {
        match self.slots.get(handle.slot) {
            Some(slot) if slot.generation == handle.generation && slot.node.is_some() => {
                Ok(handle.slot)
            }
            _ => Err(Error::StaleHandle {
                slot: handle.slot,
                generation: handle.generation,
            }),
        }
    }

    fn node(&self, slot: usize) -> &Node<T> {
        match &self.slots[slot].node {
            Some(node) => node,
            None => unreachable!("heap link points at vacant slot {slot}"),
        }
    }

    fn node_mut(&mut self, slot: usize) -> &mut Node<T> {
        match &mut self.slots[slot].node {
            Some(node) => node,
            None => unreachable!("heap link points at vacant slot {slot}"),
        }
    }

    fn allocate(&mut self, value: T) -> usize {
        let node = Node {
            value,
            parent: None,
            left: None,
            right: None,
        };
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot].node = Some(node);
                slot
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, slot: usize) -> T {
        let entry = &mut self.slots[slot];
        let node = match entry.node.take() {
            Some(node) => node,
            None => unreachable!("releasing vacant slot {slot}"),
        };
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(slot);
        node.value
    }

    /// Slot of the node at level-order position `index`. The position must
    /// exist.
    fn slot_at(&self, index: usize) -> usize {
        let path = index + 1;
        let depth = usize::BITS - 1 - path.leading_zeros();
        let mut current = match self.root {
            Some(root) => root,
            None => unreachable!("position {index} requested from an empty heap"),
        };
        for shift in (0..depth).rev() {
            let node = self.node(current);
            let next = if (path >> shift) & 1 == 0 {
                node.left
            } else {
                node.right
            };
            current = match next {
                Some(slot) => slot,
                None => unreachable!("heap shape has no node at position {index}"),
            };
        }
        current
    }

    /// Point `parent`'s link that currently targets `old` at `new`.
    fn replace_child(&mut self, parent: usize, old: usize, new: Option<usize>) {
        let node = self.node_mut(parent);
        if node.left == Some(old) {
            node.left = new;
        } else {
            debug_assert_eq!(node.right, Some(old));
            node.right = new;
        }
    }

    /// Exchange `child` with its parent, carrying both nodes' subtrees along
    /// so that every other node keeps its structural position.
    fn swap_with_parent(&mut self, child: usize) {
        let parent = match self.node(child).parent {
            Some(parent) => parent,
            None => unreachable!("root has no parent to swap with"),
        };
        let grandparent = self.node(parent).parent;
        match grandparent {
            Some(g) => self.replace_child(g, parent, Some(child)),
            None => self.root = Some(child),
        }

        let (child_left, child_right) = {
            let node = self.node(child);
            (node.left, node.right)
        };
        let (parent_left, parent_right) = {
            let node = self.node(parent);
            (node.left, node.right)
        };
        let child_was_left = parent_left == Some(child);
        let sibling = if child_was_left {
            parent_right
        } else {
            parent_left
        };

        {
            let node = self.node_mut(child);
            node.parent = grandparent;
            if child_was_left {
                node.left = Some(parent);
                node.right = parent_right;
            } else {
                node.left = parent_left;
                node.right = Some(parent);
            }
        }
        if let Some(s) = sibling {
            self.node_mut(s).parent = Some(child);
        }
        {
            let node = self.node_mut(parent);
            node.parent = Some(child);
            node.left = child_left;
            node.right = child_right;
        }
        for grandchild in [child_left, child_right].into_iter().flatten() {
            self.node_mut(grandchild).parent = Some(parent);
        }
    }
}

impl<T, O: HeapOrder<T>> PriorityHeap<T, O> {
    /// Create an empty heap with the given ordering
    pub fn new(order: O) -> Self {
        Self::with_capacity(order, 0)
    }

    /// Create an empty heap with room for `capacity` elements
    pub fn with_capacity(order: O, capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            root: None,
            len: 0,
            order,
        }
    }

    /// Add a value, returning the handle that names it from now on
    pub fn insert(&mut self, value: T) -> HeapHandle {
        let slot = self.allocate(value);
        if self.root.is_none() {
            self.root = Some(slot);
        } else {
            // The new node takes position `len`, whose parent is `(len - 1) / 2`.
            let parent = self.slot_at((self.len - 1) / 2);
            let node = self.node_mut(parent);
            if node.left.is_none() {
                node.left = Some(slot);
            } else {
                debug_assert!(node.right.is_none());
                node.right = Some(slot);
            }
            self.node_mut(slot).parent = Some(parent);
        }
        self.len += 1;
        self.sift_up(slot);
        self.handle_for(slot)
    }

    /// Remove and return the root element
    pub fn delete_min(&mut self) -> Result<T> {
        self.pop_entry().map(|(_, value)| value)
    }

    /// Remove the root element, returning it with the handle it had
    pub fn pop_entry(&mut self) -> Result<(HeapHandle, T)> {
        let root = self.root.ok_or(Error::EmptyHeap)?;
        let handle = self.handle_for(root);
        Ok((handle, self.remove_slot(root)))
    }

    /// Remove an arbitrary element
    pub fn delete(&mut self, handle: HeapHandle) -> Result<T> {
        let slot = self.resolve(handle)?;
        Ok(self.remove_slot(slot))
    }

    /// Restore heap order around an element whose value was changed through
    /// [`PriorityHeap::get_mut`].
    pub fn reheapify(&mut self, handle: HeapHandle) -> Result<()> {
        let slot = self.resolve(handle)?;
        self.sift_up(slot);
        self.sift_down(slot);
        Ok(())
    }

    /// Mutate the value behind `handle` and restore heap order
    pub fn update<F>(&mut self, handle: HeapHandle, f: F) -> Result<()>
    where
        F: FnOnce(&mut T),
    {
        let slot = self.resolve(handle)?;
        f(&mut self.node_mut(slot).value);
        self.sift_up(slot);
        self.sift_down(slot);
        Ok(())
    }

    /// Walk the whole tree and confirm the shape, order and link invariants.
    pub fn check_invariants(&self) -> Result<()> {
        let violation = |msg: String| Err(Error::InvariantViolation(msg));

        let occupied = self.slots.iter().filter(|s| s.node.is_some()).count();
        if occupied != self.len {
            return violation(format!(
                "{} occupied slots for a heap of length {}",
                occupied, self.len
            ));
        }

        let Some(root) = self.root else {
            return if self.len == 0 {
                Ok(())
            } else {
                violation(format!("no root but length {}", self.len))
            };
        };
        if self.node(root).parent.is_some() {
            return violation("root has a parent link".to_string());
        }

        let mut visited = 0usize;
        let mut queue = VecDeque::from([(root, 0usize)]);
        while let Some((slot, position)) = queue.pop_front() {
            visited += 1;
            if position >= self.len {
                return violation(format!(
                    "node at position {} in a heap of length {} breaks completeness",
                    position, self.len
                ));
            }
            let node = self.node(slot);
            for (child, child_position) in
                [(node.left, 2 * position + 1), (node.right, 2 * position + 2)]
            {
                let Some(child) = child else { continue };
                if self.node(child).parent != Some(slot) {
                    return violation(format!(
                        "child at position {} has a wrong parent link",
                        child_position
                    ));
                }
                if self.order.precedes(&self.node(child).value, &node.value) {
                    return violation(format!(
                        "child at position {} precedes its parent",
                        child_position
                    ));
                }
                queue.push_back((child, child_position));
            }
        }

        if visited != self.len {
            return violation(format!(
                "reached {} nodes from the root, expected {}",
                visited, self.len
            ));
        }
        Ok(())
    }

    fn sift_up(&mut self, slot: usize) {
        while let Some(parent) = self.node(slot).parent {
            if !self
                .order
                .precedes(&self.node(slot).value, &self.node(parent).value)
            {
                break;
            }
            self.swap_with_parent(slot);
        }
    }

    fn sift_down(&mut self, slot: usize) {
        loop {
            let node = self.node(slot);
            let mut best = slot;
            for child in [node.left, node.right].into_iter().flatten() {
                if self
                    .order
                    .precedes(&self.node(child).value, &self.node(best).value)
                {
                    best = child;
                }
            }
            if best == slot {
                break;
            }
            self.swap_with_parent(best);
        }
    }

    /// Unlink `target` and return its value. The last node in level order
    /// takes over `target`'s position and is then sifted into place.
    fn remove_slot(&mut self, target: usize) -> T {
        let last = self.slot_at(self.len - 1);

        if last == target {
            match self.node(target).parent {
                Some(parent) => self.replace_child(parent, target, None),
                None => self.root = None,
            }
        } else {
            // `last` cannot be the root here: the root is only last when len == 1.
            let last_parent = match self.node(last).parent {
                Some(parent) => parent,
                None => unreachable!("last node of a multi-node heap has no parent"),
            };
            self.replace_child(last_parent, last, None);

            // Read target links after the detach, in case `last` was its child.
            let (parent, left, right) = {
                let node = self.node(target);
                (node.parent, node.left, node.right)
            };
            match parent {
                Some(p) => self.replace_child(p, target, Some(last)),
                None => self.root = Some(last),
            }
            {
                let node = self.node_mut(last);
                node.parent = parent;
                node.left = left;
                node.right = right;
            }
            for child in [left, right].into_iter().flatten() {
                self.node_mut(child).parent = Some(last);
            }
        }

        self.len -= 1;
        let value = self.release(target);
        if last != target {
            self.sift_up(last);
            self.sift_down(last);
        }
        value
    }
}

/// Level-order iterator over a [`PriorityHeap`]
pub struct Iter<'a, T, O> {
    heap: &'a PriorityHeap<T, O>,
    queue: VecDeque<usize>,
}

impl<'a, T, O> Iterator for Iter<'a, T, O> {
    type Item = (HeapHandle, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.queue.pop_front()?;
        let node = self.heap.node(slot);
        self.queue.extend(node.left);
        self.queue.extend(node.right);
        Some((self.heap.handle_for(slot), &node.value))
    }
}

impl<T: fmt::Debug, O> fmt::Debug for PriorityHeap<T, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|(_, value)| value))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn drain<T, O: HeapOrder<T>>(heap: &mut PriorityHeap<T, O>) -> Vec<T> {
        let mut out = Vec::new();
        while let Ok(value) = heap.delete_min() {
            out.push(value);
        }
        out
    }

    #[test]
    fn test_min_heap_orders_values() {
        let mut heap = PriorityHeap::new(MinFirst);
        for v in [5, 3, 8, 1, 9, 2, 7] {
            heap.insert(v);
            heap.check_invariants().unwrap();
        }
        assert_eq!(heap.len(), 7);
        assert_eq!(*heap.peek_min().unwrap(), 1);
        assert_eq!(drain(&mut heap), vec![1, 2, 3, 5, 7, 8, 9]);
    }

    #[test]
    fn test_max_heap_orders_values() {
        let mut heap = PriorityHeap::new(MaxFirst);
        for v in [5, 3, 8, 1, 9] {
            heap.insert(v);
        }
        assert_eq!(drain(&mut heap), vec![9, 8, 5, 3, 1]);
    }

    #[test]
    fn test_order_by_closure() {
        let mut heap = PriorityHeap::new(OrderBy(|a: &&str, b: &&str| a.len().cmp(&b.len())));
        for word in ["kestrel", "ox", "wren", "a"] {
            heap.insert(word);
        }
        assert_eq!(drain(&mut heap), vec!["a", "ox", "wren", "kestrel"]);
    }

    #[test]
    fn test_empty_heap_errors() {
        let mut heap: PriorityHeap<i32, MinFirst> = PriorityHeap::default();
        assert!(matches!(heap.peek_min(), Err(Error::EmptyHeap)));
        assert!(matches!(heap.delete_min(), Err(Error::EmptyHeap)));
        assert!(heap.peek_min_handle().is_none());
        heap.check_invariants().unwrap();
    }

    #[test]
    fn test_handles_follow_values() {
        let mut heap = PriorityHeap::new(MinFirst);
        let handles: Vec<_> = (0..20).rev().map(|v| (v, heap.insert(v))).collect();
        for _ in 0..5 {
            heap.delete_min().unwrap();
        }
        for (value, handle) in handles.iter().filter(|(v, _)| *v >= 5) {
            assert_eq!(heap.get(*handle), Some(value));
        }
        for (_, handle) in handles.iter().filter(|(v, _)| *v < 5) {
            assert!(!heap.contains(*handle));
        }
    }

    #[test]
    fn test_delete_arbitrary_handle() {
        let mut heap = PriorityHeap::new(MinFirst);
        let handles: Vec<_> = [10, 4, 7, 1, 12, 3, 9, 15, 2]
            .iter()
            .map(|&v| heap.insert(v))
            .collect();
        assert_eq!(heap.delete(handles[2]).unwrap(), 7);
        heap.check_invariants().unwrap();
        assert_eq!(heap.delete(handles[3]).unwrap(), 1);
        heap.check_invariants().unwrap();
        assert_eq!(drain(&mut heap), vec![2, 3, 4, 9, 10, 12, 15]);
    }

    #[test]
    fn test_delete_last_and_root_positions() {
        let mut heap = PriorityHeap::new(MinFirst);
        let a = heap.insert(1);
        let b = heap.insert(2);
        let c = heap.insert(3);
        // `c` sits at the last position
        assert_eq!(heap.delete(c).unwrap(), 3);
        heap.check_invariants().unwrap();
        assert_eq!(heap.delete(a).unwrap(), 1);
        heap.check_invariants().unwrap();
        assert_eq!(heap.delete(b).unwrap(), 2);
        assert!(heap.is_empty());
        heap.check_invariants().unwrap();
    }

    #[test]
    fn test_delete_moves_last_node_up() {
        // Removing a node deep in one subtree can pull a smaller last node upward.
        let mut heap = PriorityHeap::new(MinFirst);
        let handles: Vec<_> = [1, 50, 2, 60, 70, 3, 4].iter().map(|&v| heap.insert(v)).collect();
        heap.delete(handles[3]).unwrap();
        heap.check_invariants().unwrap();
        assert_eq!(drain(&mut heap), vec![1, 2, 3, 4, 50, 70]);
    }

    #[test]
    fn test_stale_handle_rejected() {
        let mut heap = PriorityHeap::new(MinFirst);
        let h = heap.insert(1);
        heap.delete(h).unwrap();
        assert!(matches!(heap.delete(h), Err(Error::StaleHandle { .. })));
        assert!(matches!(heap.reheapify(h), Err(Error::StaleHandle { .. })));
        assert!(heap.get(h).is_none());
    }

    #[test]
    fn test_recycled_slot_does_not_alias() {
        let mut heap = PriorityHeap::new(MinFirst);
        let old = heap.insert(1);
        heap.delete(old).unwrap();
        let new = heap.insert(2);
        assert_eq!(old.slot(), new.slot());
        assert_ne!(old, new);
        assert!(heap.get(old).is_none());
        assert_eq!(heap.get(new), Some(&2));
    }

    #[test]
    fn test_reheapify_after_decrease_and_increase() {
        let mut heap = PriorityHeap::new(MinFirst);
        let handles: Vec<_> = (0..15).map(|v| heap.insert(v * 10)).collect();

        *heap.get_mut(handles[14]).unwrap() = -5;
        heap.reheapify(handles[14]).unwrap();
        heap.check_invariants().unwrap();
        assert_eq!(heap.peek_min_handle(), Some(handles[14]));

        *heap.get_mut(handles[0]).unwrap() = 1000;
        heap.reheapify(handles[0]).unwrap();
        heap.check_invariants().unwrap();

        heap.update(handles[7], |v| *v = 55).unwrap();
        heap.check_invariants().unwrap();

        let drained = drain(&mut heap);
        let mut sorted = drained.clone();
        sorted.sort();
        assert_eq!(drained, sorted);
        assert_eq!(drained.first(), Some(&-5));
        assert_eq!(drained.last(), Some(&1000));
    }

    #[test]
    fn test_iter_is_level_order() {
        let mut heap = PriorityHeap::new(MinFirst);
        for v in [1, 2, 3, 4, 5, 6, 7] {
            heap.insert(v);
        }
        let values: Vec<_> = heap.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![1, 2, 3, 4, 5, 6, 7]);
        for (handle, value) in heap.iter() {
            assert_eq!(heap.get(handle), Some(value));
        }
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let mut heap = PriorityHeap::new(MinFirst);
        let h = heap.insert(3);
        heap.insert(4);
        heap.clear();
        assert!(heap.is_empty());
        assert!(!heap.contains(h));
        heap.check_invariants().unwrap();
        let fresh = heap.insert(9);
        assert!(heap.get(h).is_none());
        assert_eq!(heap.get(fresh), Some(&9));
    }

    #[test]
    fn test_random_operations_keep_invariants() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut heap = PriorityHeap::new(MinFirst);
        let mut live: Vec<(HeapHandle, i64)> = Vec::new();

        for _ in 0..2000 {
            match rng.gen_range(0..4) {
                0 | 1 => {
                    let v = rng.gen_range(-1000..1000);
                    live.push((heap.insert(v), v));
                }
                2 if !live.is_empty() => {
                    let i = rng.gen_range(0..live.len());
                    let (h, v) = live.swap_remove(i);
                    assert_eq!(heap.delete(h).unwrap(), v);
                }
                3 if !live.is_empty() => {
                    let i = rng.gen_range(0..live.len());
                    let v = rng.gen_range(-1000..1000);
                    live[i].1 = v;
                    heap.update(live[i].0, |x| *x = v).unwrap();
                }
                _ => {}
            }
            assert_eq!(heap.len(), live.len());
        }
        heap.check_invariants().unwrap();
        for (h, v) in &live {
            assert_eq!(heap.get(*h), Some(v));
        }
        let mut expected: Vec<_> = live.iter().map(|(_, v)| *v).collect();
        expected.sort();
        assert_eq!(drain(&mut heap), expected);
    }
}
