//! Unbounded message queues connecting pipeline stages.
//!
//! Each pipeline edge has exactly one logical writer and one logical
//! reader, so the channel's own thread-safety is all the coordination
//! needed. Queues are unbounded: a slow downstream stage causes memory
//! growth upstream instead of blocking the producer. That is a known
//! property of this pipeline, not something to paper over with
//! timeouts or bounded buffers.

use crate::message::Message;
use crossbeam_channel::{Receiver, Sender, unbounded};

/// An unbounded FIFO channel of [`Message`]s with a shutdown sentinel.
///
/// `pull` blocks until an item arrives. A `None` result is the
/// shutdown signal for the queue's single consumer: stop pulling and
/// exit the loop. It is produced either by [`MessageQueue::close`] or
/// by all writers disconnecting.
#[derive(Clone)]
pub struct MessageQueue {
    tx: Sender<Option<Message>>,
    rx: Receiver<Option<Message>>,
}

impl MessageQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Enqueues a message at the tail. Never blocks.
    pub fn push(&self, msg: Message) {
        // Send fails only when every receiver is gone; there is no
        // consumer left to care, so the message is dropped.
        let _ = self.tx.send(Some(msg));
    }

    /// Enqueues the shutdown sentinel for this queue's consumer.
    pub fn close(&self) {
        let _ = self.tx.send(None);
    }

    /// Blocks until the next item is available and dequeues it.
    ///
    /// Returns `None` on the shutdown sentinel or when the channel is
    /// disconnected; both mean the consumer's loop should exit.
    pub fn pull(&self) -> Option<Message> {
        match self.rx.recv() {
            Ok(item) => item,
            Err(_) => None,
        }
    }

    /// Number of items currently buffered, sentinel included.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MessageQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageQueue")
            .field("buffered", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fifo_ordering() {
        let queue = MessageQueue::new();
        for i in 0..10 {
            queue.push(Message::single(format!("msg {i}"), false));
        }
        for i in 0..10 {
            let msg = queue.pull().unwrap();
            assert_eq!(msg.outputs, vec![format!("msg {i}")]);
        }
    }

    #[test]
    fn test_close_yields_sentinel() {
        let queue = MessageQueue::new();
        queue.push(Message::single("last", true));
        queue.close();

        assert!(queue.pull().is_some());
        assert!(queue.pull().is_none());
    }

    #[test]
    fn test_disconnect_yields_none() {
        let queue = MessageQueue::new();
        let reader = {
            let q = queue.clone();
            thread::spawn(move || q.pull())
        };
        drop(queue);
        assert!(reader.join().unwrap().is_none());
    }

    #[test]
    fn test_cross_thread_ordering() {
        let queue = MessageQueue::new();
        let writer = {
            let q = queue.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    q.push(Message::single(format!("{i}"), false));
                }
                q.close();
            })
        };

        let mut seen = Vec::new();
        while let Some(msg) = queue.pull() {
            seen.push(msg.outputs[0].clone());
        }
        writer.join().unwrap();

        let expected: Vec<String> = (0..100).map(|i| format!("{i}")).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_items_after_sentinel_stay_buffered() {
        let queue = MessageQueue::new();
        queue.push(Message::single("before", false));
        queue.close();
        queue.push(Message::single("after", false));

        assert!(queue.pull().is_some());
        assert!(queue.pull().is_none());
        // The consumer stopped at the sentinel; the late item is still there.
        assert_eq!(queue.len(), 1);
    }
}
