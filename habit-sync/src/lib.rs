//! Keeps a user's month of habits, tasks and mental states in sync with a remote store.
//!
//! The UI mutates through [`SyncOrchestrator`]. Every mutation shows up in the working views
//! immediately, is persisted in the background, and is rolled back if the store refuses it.
//! The store itself is injected as anything implementing [`RemoteStore`]: [`SupabaseStore`] in
//! production, [`MemoryStore`] in tests and offline.

mod error;
pub mod identity;
pub mod memory;
mod orchestrator;
mod store;
pub mod supabase;

pub use error::{StoreError, SyncError};
pub use identity::{Identity, Role};
pub use optimist::Settled;
pub use memory::MemoryStore;
pub use orchestrator::{LoadOutcome, SyncOrchestrator};
pub use store::{PartitionData, RemoteStore};
pub use supabase::{SupabaseConfig, SupabaseStore};
