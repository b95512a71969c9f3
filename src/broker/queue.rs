//! Message queue
//!
//! A thread-safe FIFO of shared message references, used both as a topic's
//! durable queue and as each subscriber's private pending queue.
//!
//! `peek` and `dequeue` wait until the queue is non-empty. They are plain
//! futures, so a caller that is shutting down stops waiting by dropping the
//! future (typically by racing it against a cancellation token in
//! `tokio::select!`).
//!
//! `delete_at` removes in O(1) by moving the last element into the freed
//! slot. It does NOT preserve the order of the remaining elements; it is only
//! meant for the cleanup sweep, which rescans by index every time.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::broker::message::Message;

#[derive(Debug, Default)]
pub struct MessageQueue {
    messages: Mutex<VecDeque<Arc<Message>>>,
    available: Notify,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `msg` and wakes one waiter.
    pub fn enqueue(&self, msg: Arc<Message>) {
        self.messages.lock().push_back(msg);
        self.available.notify_one();
    }

    /// Waits until the queue is non-empty, then removes and returns the front.
    pub async fn dequeue(&self) -> Arc<Message> {
        loop {
            if let Some(msg) = self.try_dequeue() {
                return msg;
            }
            self.available.notified().await;
        }
    }

    /// Waits until the queue is non-empty, then returns the front without
    /// removing it.
    pub async fn peek(&self) -> Arc<Message> {
        loop {
            if let Some(msg) = self.try_peek() {
                // pass the wakeup on in case another waiter is parked
                self.available.notify_one();
                return msg;
            }
            self.available.notified().await;
        }
    }

    pub fn try_dequeue(&self) -> Option<Arc<Message>> {
        self.messages.lock().pop_front()
    }

    /// Removes the front only if it is `msg` itself.
    pub fn dequeue_if(&self, msg: &Arc<Message>) -> bool {
        let mut messages = self.messages.lock();
        match messages.front() {
            Some(front) if Arc::ptr_eq(front, msg) => {
                messages.pop_front();
                true
            }
            _ => false,
        }
    }

    pub fn try_peek(&self) -> Option<Arc<Message>> {
        self.messages.lock().front().cloned()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    pub fn get_at(&self, index: usize) -> Option<Arc<Message>> {
        self.messages.lock().get(index).cloned()
    }

    /// Removes the element at `index` by swapping in the last element.
    pub fn delete_at(&self, index: usize) -> Option<Arc<Message>> {
        self.messages.lock().swap_remove_back(index)
    }

    /// Clones out the current contents, front to back.
    pub fn snapshot(&self) -> Vec<Arc<Message>> {
        self.messages.lock().iter().cloned().collect()
    }
}
