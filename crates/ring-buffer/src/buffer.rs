//! Ring Buffer Implementation

/// Fixed-capacity ring buffer, overwrites the oldest sample when full
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// Pre-allocated storage
    storage: Box<[Option<T>]>,
    /// Next write position
    head: usize,
    /// Number of live samples
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Create a new ring buffer with given capacity
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be > 0");
        let storage: Vec<Option<T>> = (0..capacity).map(|_| None).collect();
        Self {
            storage: storage.into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    /// Push a sample into the buffer (overwrites oldest if full)
    pub fn push(&mut self, value: T) {
        self.storage[self.head] = Some(value);
        self.head = (self.head + 1) % self.capacity();
        self.len = (self.len + 1).min(self.capacity());
    }

    /// Get the number of samples currently in the buffer
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the buffer capacity
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Most recently pushed sample
    pub fn newest(&self) -> Option<&T> {
        self.get_back(0)
    }

    /// Oldest sample still held
    pub fn oldest(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|i| self.get_back(i))
    }

    /// Sample `age` pushes back from the newest (0 = newest)
    pub fn get_back(&self, age: usize) -> Option<&T> {
        if age >= self.len {
            return None;
        }
        let cap = self.capacity();
        let idx = (self.head + cap - 1 - age) % cap;
        self.storage[idx].as_ref()
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len).rev().filter_map(move |age| self.get_back(age))
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.storage.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_push_and_read() {
        let mut buffer = RingBuffer::new(10);

        for i in 0..5 {
            buffer.push(i * 100);
        }

        assert_eq!(buffer.len(), 5);

        assert_eq!(buffer.get_back(1), Some(&300));
        assert_eq!(buffer.get_back(5), None);
        assert_eq!(buffer.newest(), Some(&400));
        assert_eq!(buffer.oldest(), Some(&0));
    }

    #[test]
    fn test_overwrite_oldest() {
        let mut buffer = RingBuffer::new(5);

        for i in 0..10 {
            buffer.push(i);
        }

        assert_eq!(buffer.len(), buffer.capacity());
        assert_eq!(buffer.oldest(), Some(&5));
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_clear() {
        let mut buffer = RingBuffer::new(4);
        assert!(buffer.is_empty());

        buffer.push(1.0);
        buffer.push(2.0);
        assert_eq!(buffer.len(), 2);

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.newest(), None);
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity_rejected() {
        let _ = RingBuffer::<u8>::new(0);
    }

    proptest! {
        #[test]
        fn keeps_most_recent_window(values in prop::collection::vec(any::<i32>(), 0..64), cap in 1usize..16) {
            let mut buffer = RingBuffer::new(cap);
            for v in &values {
                buffer.push(*v);
            }
            let start = values.len().saturating_sub(cap);
            let expected: Vec<i32> = values[start..].to_vec();
            prop_assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), expected);
        }
    }
}
