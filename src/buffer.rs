//! Bounded in-memory buffer shared by the memory sink and the memory DLQ

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// FIFO buffer that evicts the oldest entries past `capacity`
///
/// A capacity of 0 means unbounded. Clones share the same storage.
pub(crate) struct BoundedBuffer<T> {
    items: Arc<RwLock<VecDeque<T>>>,
    capacity: usize,
}

impl<T> Clone for BoundedBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T: Clone> BoundedBuffer<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            items: Arc::new(RwLock::new(VecDeque::new())),
            capacity,
        }
    }

    /// Append an item, evicting from the front when over capacity
    pub(crate) async fn push(&self, item: T) {
        let mut items = self.items.write().await;
        items.push_back(item);

        if self.capacity > 0 {
            while items.len() > self.capacity {
                items.pop_front();
            }
        }
    }

    /// All items, oldest first
    pub(crate) async fn to_vec(&self) -> Vec<T> {
        self.items.read().await.iter().cloned().collect()
    }

    /// Up to `limit` items, most recent first
    pub(crate) async fn recent(&self, limit: usize) -> Vec<T> {
        self.items.read().await.iter().rev().take(limit).cloned().collect()
    }

    pub(crate) async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub(crate) async fn clear(&self) {
        self.items.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_evicts_oldest_past_capacity() {
        let buffer = BoundedBuffer::new(3);
        for i in 0..5 {
            buffer.push(i).await;
        }

        assert_eq!(buffer.len().await, 3);
        assert_eq!(buffer.to_vec().await, vec![2, 3, 4]);
        assert_eq!(buffer.recent(2).await, vec![4, 3]);
    }

    #[tokio::test]
    async fn test_zero_capacity_is_unbounded() {
        let buffer = BoundedBuffer::new(0);
        for i in 0..100 {
            buffer.push(i).await;
        }
        assert_eq!(buffer.len().await, 100);
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let buffer = BoundedBuffer::new(10);
        let other = buffer.clone();

        buffer.push("a").await;
        assert_eq!(other.len().await, 1);

        other.clear().await;
        assert_eq!(buffer.len().await, 0);
    }
}
