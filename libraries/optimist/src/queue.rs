//! Per-key ordering of persistence calls.
//!
//! Each call takes a [`Turn`] when it is issued. A turn resolves once every earlier turn for the
//! same key has finished (or been dropped), so calls for one key reach the store in issue order
//! while calls for different keys run freely.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    hash::Hash,
};

use futures::{
    FutureExt,
    channel::oneshot,
    future::{LocalBoxFuture, Shared},
};

type Done = Shared<LocalBoxFuture<'static, ()>>;

pub struct PersistQueue<K> {
    next_ticket: Cell<u64>,
    tails: RefCell<HashMap<K, (u64, Done)>>,
}

impl<K> Default for PersistQueue<K> {
    fn default() -> Self {
        Self {
            next_ticket: Cell::new(0),
            tails: RefCell::new(HashMap::new()),
        }
    }
}

pub struct Turn<K> {
    key: K,
    ticket: u64,
    previous: Option<Done>,
    done: oneshot::Sender<()>,
}

impl<K> Turn<K> {
    /// Resolves once the previous call for this key has finished.
    pub async fn wait(&self) {
        if let Some(previous) = &self.previous {
            previous.clone().await;
        }
    }

    pub fn is_queued_behind_another(&self) -> bool {
        self.previous.is_some()
    }
}

impl<K: Clone + Eq + Hash> PersistQueue<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, key: K) -> Turn<K> {
        let ticket = self.next_ticket.get();
        self.next_ticket.set(ticket + 1);

        // A dropped sender also counts as done, so an abandoned call can't wedge the key.
        let (done, finished) = oneshot::channel::<()>();
        let finished: Done = finished.map(|_| ()).boxed_local().shared();

        let previous = self
            .tails
            .borrow_mut()
            .insert(key.clone(), (ticket, finished))
            .map(|(_, previous)| previous);

        Turn {
            key,
            ticket,
            previous,
            done,
        }
    }

    pub fn finish(&self, turn: Turn<K>) {
        let Turn {
            key, ticket, done, ..
        } = turn;
        let _ = done.send(());

        let mut tails = self.tails.borrow_mut();
        if tails.get(&key).is_some_and(|(tail, _)| *tail == ticket) {
            tails.remove(&key);
        }
    }

    /// Number of keys with at least one unfinished call.
    pub fn busy_keys(&self) -> usize {
        self.tails.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_turn_does_not_wait() {
        let queue = PersistQueue::new();
        let turn = queue.enqueue("a");
        assert!(!turn.is_queued_behind_another());
        turn.wait().await;
        queue.finish(turn);
        assert_eq!(queue.busy_keys(), 0);
    }

    #[tokio::test]
    async fn test_second_turn_waits_for_first() {
        let queue = PersistQueue::new();
        let first = queue.enqueue("a");
        let second = queue.enqueue("a");
        let other = queue.enqueue("b");

        assert!(second.is_queued_behind_another());
        assert!(!other.is_queued_behind_another());
        assert_eq!(queue.busy_keys(), 2);

        assert!(second.wait().now_or_never().is_none());
        queue.finish(first);
        assert!(second.wait().now_or_never().is_some());

        queue.finish(second);
        queue.finish(other);
        assert_eq!(queue.busy_keys(), 0);
    }

    #[tokio::test]
    async fn test_dropped_turn_releases_the_next() {
        let queue = PersistQueue::new();
        let first = queue.enqueue(1);
        let second = queue.enqueue(1);
        drop(first);
        assert!(second.wait().now_or_never().is_some());
    }

    #[test]
    fn test_finishing_an_old_turn_keeps_the_newer_tail() {
        let queue = PersistQueue::new();
        let first = queue.enqueue("a");
        let second = queue.enqueue("a");
        queue.finish(first);
        assert_eq!(queue.busy_keys(), 1);
        queue.finish(second);
        assert_eq!(queue.busy_keys(), 0);
    }
}
