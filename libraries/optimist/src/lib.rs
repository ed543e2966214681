//! This is a library for keeping an optimistic, locally-mutated view of a collection of records
//! in front of a slow, fallible store.
//!
//! Strategy:
//! 1. The last collection loaded from the store is held as the "working view".
//! 2. A mutation changes the working view right away, before anything touches the network.
//!    Just before the change, the whole view is snapshotted (cheaply, because it's an `im::Vector`).
//! 3. The persistence call is then awaited. On success the mutation "commits". Creates and deletes
//!    ask the caller to reload, so that the view adopts the store's canonical state; updates don't,
//!    so already-rendered rows don't jump around.
//! 4. On failure the view is restored to the snapshot and the error is handed back.
//!
//! Persistence calls for the same record key are dispatched in the order the mutations were issued,
//! so a delete issued while its create is still in flight can't reach the store first.
//!
//! Everything here assumes a single-threaded, cooperative executor. State lives in `RefCell`s, and
//! no borrow is ever held across an `.await`.

pub mod queue;
mod state;

pub use state::{MutationKind, OptimisticState, Settled};

/// A record that can live in an [`OptimisticState`].
pub trait Record: Clone {
    /// Identifies a record within one working view.
    type Key: Clone + Eq + std::hash::Hash + std::fmt::Debug;

    fn key(&self) -> Self::Key;
}
