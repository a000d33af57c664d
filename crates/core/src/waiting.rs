//! Waiting structures used by the policy engines.
//!
//! - [`Stack`]: last-in-first-out, used where the newest arrival has priority.
//! - [`BoundedQueue`]: fixed-capacity double-ended queue whose head is the
//!   packet in service and whose remaining slots are addressable by index,
//!   so a waiting packet can be replaced in place.

use std::collections::VecDeque;

/// Last-in-first-out stack.
#[derive(Debug, Clone)]
pub struct Stack<T> {
    items: Vec<T>,
}

impl<T> Stack<T> {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Push an item on top.
    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    /// Remove and return the most recently pushed item.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// Borrow the top item without removing it.
    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-capacity queue with a head slot and indexed waiting slots.
///
/// Index 0 is the head. Waiting slots are numbered from 0 as well, so
/// waiting slot `i` lives at queue position `i + 1`.
#[derive(Debug, Clone)]
pub struct BoundedQueue<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Create an empty queue holding at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Append an item behind every other item.
    ///
    /// # Returns
    /// `Err(item)` if the queue is full; the item is handed back untouched.
    pub fn push_back(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        self.items.push_back(item);
        Ok(())
    }

    /// Put an item at the head, ahead of every waiting item.
    ///
    /// Used to return a partially served item so it resumes first.
    pub fn insert_front(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        self.items.push_front(item);
        Ok(())
    }

    /// Remove and return the head.
    pub fn pop_front(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Number of items behind the head.
    pub fn waiting_len(&self) -> usize {
        self.items.len().saturating_sub(1)
    }

    /// Replace waiting slot `index`, returning the item it held.
    ///
    /// # Returns
    /// `Err(item)` if there is no such waiting slot.
    pub fn replace_waiting(&mut self, index: usize, item: T) -> Result<T, T> {
        match self.items.get_mut(index + 1) {
            Some(slot) => Ok(std::mem::replace(slot, item)),
            None => Err(item),
        }
    }

    /// Find the first waiting slot matching `predicate`. The head is never considered.
    pub fn position_waiting<F>(&self, predicate: F) -> Option<usize>
    where
        F: FnMut(&T) -> bool,
    {
        self.items.iter().skip(1).position(predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_lifo() {
        let mut stack = Stack::new();
        assert!(stack.is_empty());

        stack.push(1);
        stack.push(2);
        stack.push(3);

        assert_eq!(stack.peek(), Some(&3));
        assert_eq!(stack.pop(), Some(3));
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(stack.pop(), None);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_queue_fifo_order() {
        let mut queue = BoundedQueue::new(3);
        queue.push_back('a').unwrap();
        queue.push_back('b').unwrap();
        queue.push_back('c').unwrap();

        assert_eq!(queue.pop_front(), Some('a'));
        assert_eq!(queue.pop_front(), Some('b'));
        assert_eq!(queue.pop_front(), Some('c'));
        assert_eq!(queue.pop_front(), None);
    }

    #[test]
    fn test_queue_rejects_when_full() {
        let mut queue = BoundedQueue::new(2);
        queue.push_back(1).unwrap();
        queue.push_back(2).unwrap();

        assert!(queue.is_full());
        assert_eq!(queue.push_back(3), Err(3));
        assert_eq!(queue.insert_front(0), Err(0));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_insert_front_resumes_first() {
        let mut queue = BoundedQueue::new(3);
        queue.push_back("head").unwrap();
        queue.push_back("waiting").unwrap();

        let head = queue.pop_front().unwrap();
        queue.insert_front(head).unwrap();

        assert_eq!(queue.waiting_len(), 1);
        assert_eq!(queue.pop_front(), Some("head"));
        assert_eq!(queue.pop_front(), Some("waiting"));
    }

    #[test]
    fn test_waiting_slots_skip_head() {
        let mut queue = BoundedQueue::new(3);
        queue.push_back((0, 'x')).unwrap();
        queue.push_back((1, 'y')).unwrap();
        queue.push_back((0, 'z')).unwrap();

        assert_eq!(queue.waiting_len(), 2);
        // Source 0 sits at the head too, but only the waiting slot counts.
        assert_eq!(queue.position_waiting(|item| item.0 == 0), Some(1));
        assert_eq!(queue.position_waiting(|item| item.0 == 2), None);
    }

    #[test]
    fn test_replace_waiting() {
        let mut queue = BoundedQueue::new(3);
        queue.push_back(10).unwrap();
        queue.push_back(20).unwrap();

        assert_eq!(queue.replace_waiting(0, 21), Ok(20));
        assert_eq!(queue.replace_waiting(0, 22), Ok(21));
        assert_eq!(queue.replace_waiting(1, 30), Err(30));
        assert_eq!(queue.pop_front(), Some(10));
        assert_eq!(queue.pop_front(), Some(22));
    }
}
