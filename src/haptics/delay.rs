// Delay queue - Hands items to a handler thread once their deadline passes
// Coarse wall-clock delivery, good to a millisecond or so

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Instant;

struct Delayed<T> {
    deadline: Instant,
    seq: u64,
    item: T,
}

// Reversed so the BinaryHeap pops the earliest deadline first;
// `seq` keeps insertion order for equal deadlines
impl<T> Ord for Delayed<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for Delayed<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for Delayed<T> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl<T> Eq for Delayed<T> {}

/// Background thread running a handler for each item at its deadline
///
/// Dropping the queue stops the thread; items still waiting are discarded.
pub struct DelayQueue<T: Send + 'static> {
    tx: Option<Sender<(Instant, T)>>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> DelayQueue<T> {
    pub fn spawn<F>(name: &str, mut handler: F) -> io::Result<Self>
    where
        F: FnMut(T) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<(Instant, T)>();

        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut pending: BinaryHeap<Delayed<T>> = BinaryHeap::new();
                let mut seq = 0u64;

                loop {
                    let now = Instant::now();
                    while pending.peek().is_some_and(|next| next.deadline <= now) {
                        if let Some(due) = pending.pop() {
                            handler(due.item);
                        }
                    }

                    let received = match pending.peek() {
                        Some(next) => {
                            rx.recv_timeout(next.deadline.saturating_duration_since(Instant::now()))
                        }
                        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                    };

                    match received {
                        Ok((deadline, item)) => {
                            pending.push(Delayed {
                                deadline,
                                seq,
                                item,
                            });
                            seq = seq.wrapping_add(1);
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;

        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    /// Queue `item` for `deadline`; false if the worker thread has exited
    pub fn schedule(&self, deadline: Instant, item: T) -> bool {
        match &self.tx {
            Some(tx) => tx.send((deadline, item)).is_ok(),
            None => false,
        }
    }
}

impl<T: Send + 'static> Drop for DelayQueue<T> {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
