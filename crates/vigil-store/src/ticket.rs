// SPDX-License-Identifier: Apache-2.0

//! In-process FIFO for transactions.
//!
//! A plain mutex makes no fairness promise; the transaction protocol
//! requires that a successor starts only after its predecessor resolves,
//! in submission order. A ticket queue gives exactly that: take a ticket,
//! wait until it is being served, and advance the counter on drop — error
//! or not.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};

/// FIFO ticket queue.
#[derive(Debug, Default)]
pub struct TicketQueue {
    next: AtomicU64,
    serving: Mutex<u64>,
    ready: Condvar,
}

impl TicketQueue {
    /// Block until it is this caller's turn. The returned guard holds the
    /// turn until dropped.
    pub fn enter(&self) -> TicketTurn<'_> {
        let ticket = self.next.fetch_add(1, Ordering::SeqCst);
        let mut serving = self
            .serving
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while *serving != ticket {
            serving = self
                .ready
                .wait(serving)
                .unwrap_or_else(PoisonError::into_inner);
        }
        TicketTurn { queue: self }
    }
}

/// An in-progress turn. Dropping it admits the next ticket, even during an
/// unwind.
#[derive(Debug)]
pub struct TicketTurn<'a> {
    queue: &'a TicketQueue,
}

impl Drop for TicketTurn<'_> {
    fn drop(&mut self) {
        let mut serving = self
            .queue
            .serving
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *serving += 1;
        self.queue.ready.notify_all();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::TicketQueue;
    use std::sync::Arc;

    #[test]
    fn turns_run_in_ticket_order() {
        let queue = Arc::new(TicketQueue::default());
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        // Hold the first turn so spawned threads queue behind it.
        let first = queue.enter();
        for i in 0..4 {
            let queue = Arc::clone(&queue);
            let order = Arc::clone(&order);
            handles.push(std::thread::spawn(move || {
                // stagger spawns so tickets are taken in index order
                std::thread::sleep(std::time::Duration::from_millis(10 * (i + 1)));
                let _turn = queue.enter();
                order.lock().unwrap().push(i);
            }));
        }
        std::thread::sleep(std::time::Duration::from_millis(100));
        drop(first);
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }
}
