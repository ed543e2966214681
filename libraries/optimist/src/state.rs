use std::{
    cell::{Cell, RefCell},
    fmt::Display,
};

use im::Vector;

use crate::{
    Record,
    queue::{PersistQueue, Turn},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    /// Whether a committed mutation of this kind should be followed by a full reload.
    /// Updates skip it so that rendered rows keep their order.
    pub fn reloads(self) -> bool {
        match self {
            MutationKind::Create | MutationKind::Delete => true,
            MutationKind::Update => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Settled {
    /// The store accepted the write.
    Committed { reload: bool },
    /// The mutation didn't change the view, so nothing was sent.
    Unchanged,
}

impl Settled {
    pub fn needs_reload(self) -> bool {
        matches!(self, Settled::Committed { reload: true })
    }
}

/// The working view for one kind of record.
pub struct OptimisticState<T: Record> {
    label: &'static str,
    view: RefCell<Vector<T>>,
    queue: PersistQueue<T::Key>,
    in_flight: Cell<usize>,
    /// Bumped whenever the view is replaced wholesale.
    generation: Cell<u64>,
}

impl<T: Record> OptimisticState<T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            view: RefCell::new(Vector::new()),
            queue: PersistQueue::new(),
            in_flight: Cell::new(0),
            generation: Cell::new(0),
        }
    }

    pub fn snapshot(&self) -> Vector<T> {
        self.view.borrow().clone()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.view.borrow().iter().cloned().collect()
    }

    pub fn find(&self, key: &T::Key) -> Option<T> {
        self.view
            .borrow()
            .iter()
            .find(|record| &record.key() == key)
            .cloned()
    }

    /// Number of persistence calls that haven't settled yet.
    pub fn pending(&self) -> usize {
        self.in_flight.get()
    }

    /// Replace the whole view, e.g. with freshly loaded records.
    ///
    /// Mutations still in flight won't roll back over the new view: whatever they snapshotted
    /// predates it.
    pub fn replace(&self, records: impl IntoIterator<Item = T>) {
        *self.view.borrow_mut() = records.into_iter().collect();
        self.generation.set(self.generation.get() + 1);
    }

    pub fn clear(&self) {
        self.replace(None);
    }

    /// Apply `change` to the view right now, then persist.
    ///
    /// The snapshot and the change happen before this returns, so the view reflects the mutation
    /// even if the returned future is never polled. `persist` is only called once every earlier
    /// call for the same `key` has settled. If `change` reports that nothing changed, nothing is
    /// persisted and the future resolves to [`Settled::Unchanged`].
    ///
    /// On failure the view goes back to the snapshot, unless [`replace`](Self::replace) ran in the
    /// meantime. Dropping the future before it settles counts as a failure. A write that succeeds
    /// after a `replace` asks for a reload, since the replaced view doesn't contain it.
    pub fn mutate<E, F, Fut>(
        &self,
        kind: MutationKind,
        key: T::Key,
        change: impl FnOnce(&mut Vector<T>) -> bool,
        persist: F,
    ) -> impl Future<Output = Result<Settled, E>>
    where
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let snapshot = self.snapshot();
        let mut working = snapshot.clone();

        let applied = change(&mut working).then(|| {
            *self.view.borrow_mut() = working;
            self.in_flight.set(self.in_flight.get() + 1);
            Applied {
                state: self,
                kind,
                turn: Some(self.queue.enqueue(key)),
                snapshot,
                generation: self.generation.get(),
            }
        });

        async move {
            let Some(mut applied) = applied else {
                return Ok(Settled::Unchanged);
            };

            if let Some(turn) = &applied.turn {
                turn.wait().await;
            }

            match persist().await {
                Ok(()) => Ok(applied.commit()),
                Err(e) => {
                    if applied.roll_back() {
                        log::error!("Rolling back {kind:?} on {}: {e}", self.label);
                    } else {
                        log::error!(
                            "{kind:?} on {} failed after the view was reloaded, keeping the reloaded view: {e}",
                            self.label
                        );
                    }
                    Err(e)
                }
            }
        }
    }

    /// Append a new record.
    pub fn insert<E, F, Fut>(
        &self,
        record: T,
        persist: F,
    ) -> impl Future<Output = Result<Settled, E>>
    where
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let key = record.key();
        self.mutate(
            MutationKind::Create,
            key,
            move |view| {
                view.push_back(record);
                true
            },
            persist,
        )
    }

    /// Rewrite the record with `key` in place. `persist` receives the rewritten record.
    /// Missing records are left alone.
    pub fn update<E, F, Fut>(
        &self,
        key: T::Key,
        rewrite: impl FnOnce(&T) -> T,
        persist: F,
    ) -> impl Future<Output = Result<Settled, E>>
    where
        E: Display,
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let rewritten = self.find(&key).map(|record| rewrite(&record));
        let persisted = rewritten.clone();
        let lookup = key.clone();
        self.mutate(
            MutationKind::Update,
            key,
            move |view| {
                let Some(record) = rewritten else {
                    return false;
                };
                let Some(index) = view.iter().position(|existing| existing.key() == lookup) else {
                    return false;
                };
                view.set(index, record);
                true
            },
            move || async move {
                match persisted {
                    Some(record) => persist(record).await,
                    None => Ok(()),
                }
            },
        )
    }

    /// Replace the record with the same key, or append it if there is none.
    pub fn upsert<E, F, Fut>(
        &self,
        record: T,
        persist: F,
    ) -> impl Future<Output = Result<Settled, E>>
    where
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let key = record.key();
        let lookup = key.clone();
        self.mutate(
            MutationKind::Update,
            key,
            move |view| {
                match view.iter().position(|existing| existing.key() == lookup) {
                    Some(index) => {
                        view.set(index, record);
                    }
                    None => view.push_back(record),
                }
                true
            },
            persist,
        )
    }

    /// Remove the record with `key`. Removing a missing record is a no-op.
    pub fn remove<E, F, Fut>(
        &self,
        key: T::Key,
        persist: F,
    ) -> impl Future<Output = Result<Settled, E>>
    where
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let lookup = key.clone();
        self.mutate(
            MutationKind::Delete,
            key,
            move |view| {
                let before = view.len();
                view.retain(|record| record.key() != lookup);
                view.len() != before
            },
            persist,
        )
    }
}

/// A mutation that is in the view but hasn't settled. Dropped unsettled, it is undone.
struct Applied<'a, T: Record> {
    state: &'a OptimisticState<T>,
    kind: MutationKind,
    turn: Option<Turn<T::Key>>,
    snapshot: Vector<T>,
    generation: u64,
}

impl<T: Record> Applied<'_, T> {
    /// Give up the turn. Returns whether the view was replaced since the mutation was applied.
    fn release(&mut self) -> bool {
        if let Some(turn) = self.turn.take() {
            self.state.queue.finish(turn);
            self.state.in_flight.set(self.state.in_flight.get() - 1);
        }
        self.state.generation.get() != self.generation
    }

    fn commit(mut self) -> Settled {
        let replaced = self.release();
        Settled::Committed {
            reload: self.kind.reloads() || replaced,
        }
    }

    /// Returns whether the snapshot was restored.
    fn roll_back(&mut self) -> bool {
        if self.release() {
            return false;
        }
        *self.state.view.borrow_mut() = std::mem::take(&mut self.snapshot);
        true
    }
}

impl<T: Record> Drop for Applied<'_, T> {
    fn drop(&mut self) {
        if self.turn.is_some() {
            log::warn!(
                "{:?} on {} was dropped before it settled, undoing it",
                self.kind,
                self.state.label
            );
            self.roll_back();
        }
    }
}
