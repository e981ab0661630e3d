use std::sync::{Mutex, MutexGuard};

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};

use crate::plan::PendingCommit;

/// Result of popping from the queue.
#[derive(Debug)]
pub enum Popped {
    /// The oldest pending commit.
    Entry(PendingCommit),
    /// Nothing queued right now; more may arrive.
    Empty,
    /// Nothing queued and the queue has been closed, so nothing ever will be.
    Closed,
}

/// Strict FIFO of pending commits shared by many producers and one consumer.
///
/// Each element is a whole [`PendingCommit`], so its paths, refresh root and
/// message always travel together. Closing the queue drops the only sender:
/// producers are refused from then on, and the consumer sees
/// [`Popped::Closed`] once the remaining entries have drained.
pub struct CommitQueue {
    /// Producer side; `None` once the queue is closed.
    sender: Mutex<Option<Sender<PendingCommit>>>,
    /// Consumer side.
    receiver: Receiver<PendingCommit>,
}

impl Default for CommitQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommitQueue {
    /// Create an open, empty queue.
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender: Mutex::new(Some(sender)),
            receiver,
        }
    }

    /// Lock the sender slot, ignoring poisoning.
    fn sender(&self) -> MutexGuard<'_, Option<Sender<PendingCommit>>> {
        self.sender.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append an entry. Hands the entry back if the queue is closed.
    pub fn push(&self, entry: PendingCommit) -> Result<(), PendingCommit> {
        match self.sender().as_ref() {
            Some(sender) => sender.send(entry).map_err(|err| err.into_inner()),
            None => Err(entry),
        }
    }

    /// Take the oldest entry without blocking.
    pub fn pop(&self) -> Popped {
        match self.receiver.try_recv() {
            Ok(entry) => Popped::Entry(entry),
            Err(TryRecvError::Empty) => Popped::Empty,
            Err(TryRecvError::Disconnected) => Popped::Closed,
        }
    }

    /// Refuse further entries. Returns `true` the first time it is called.
    pub fn close(&self) -> bool {
        self.sender().take().is_some()
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.sender().is_none()
    }

    /// Number of entries waiting to be drained.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether no entries are waiting.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, sync::Arc, thread, time::SystemTime};

    use super::*;
    use crate::plan::CommitDepth;

    fn entry(name: &str) -> PendingCommit {
        PendingCommit {
            paths: vec![PathBuf::from(format!("/wc/{name}"))],
            depth: CommitDepth::Empty,
            refresh_root: PathBuf::from("/wc"),
            message: name.to_string(),
            enqueued_at: SystemTime::now(),
        }
    }

    fn message(popped: Popped) -> String {
        match popped {
            Popped::Entry(entry) => entry.message,
            other => panic!("expected an entry, got {other:?}"),
        }
    }

    #[test]
    fn pops_in_enqueue_order() {
        let queue = CommitQueue::new();
        queue.push(entry("a")).unwrap();
        queue.push(entry("b")).unwrap();
        queue.push(entry("c")).unwrap();
        assert_eq!(queue.len(), 3);

        assert_eq!(message(queue.pop()), "a");
        assert_eq!(message(queue.pop()), "b");
        assert_eq!(message(queue.pop()), "c");
        assert!(matches!(queue.pop(), Popped::Empty));
    }

    #[test]
    fn closed_queue_refuses_but_drains() {
        let queue = CommitQueue::new();
        queue.push(entry("a")).unwrap();

        assert!(queue.close());
        assert!(!queue.close());
        assert!(queue.is_closed());

        let refused = queue.push(entry("b")).unwrap_err();
        assert_eq!(refused.message, "b");

        assert_eq!(message(queue.pop()), "a");
        assert!(matches!(queue.pop(), Popped::Closed));
        assert!(queue.is_empty());
    }

    #[test]
    fn per_producer_order_is_preserved() {
        let queue = Arc::new(CommitQueue::new());
        let producers: Vec<_> = (0..4)
            .map(|producer| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for seq in 0..50 {
                        queue.push(entry(&format!("{producer}-{seq}"))).unwrap();
                    }
                })
            })
            .collect();
        for handle in producers {
            handle.join().unwrap();
        }

        let mut last_seen = [None::<u32>; 4];
        while let Popped::Entry(entry) = queue.pop() {
            let (producer, seq) = entry.message.split_once('-').unwrap();
            let producer: usize = producer.parse().unwrap();
            let seq: u32 = seq.parse().unwrap();
            if let Some(previous) = last_seen[producer] {
                assert!(seq > previous, "producer {producer} reordered");
            }
            last_seen[producer] = Some(seq);
        }
        assert_eq!(last_seen, [Some(49); 4]);
    }
}
