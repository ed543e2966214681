use habit_model::{DailyTask, Habit, MentalState, MonthKey};
use serde::{Deserialize, Serialize};

use crate::{Role, StoreError};

/// Everything one user has in one month.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionData {
    pub habits: Vec<Habit>,
    pub tasks: Vec<DailyTask>,
    pub mental_states: Vec<MentalState>,
}

/// Durable storage for the tracker.
///
/// Writes are idempotent: upserting the same record twice leaves one record, and deleting an id
/// that doesn't exist succeeds. Mental states are matched on `(user_id, month_key, day)`.
/// Every call can fail independently.
pub trait RemoteStore {
    /// Missing data is an empty collection, not an error.
    fn fetch_partition(
        &self,
        user_id: &str,
        month_key: MonthKey,
    ) -> impl Future<Output = Result<PartitionData, StoreError>>;

    fn upsert_habit(&self, habit: &Habit) -> impl Future<Output = Result<(), StoreError>>;

    fn delete_habit(&self, id: &str) -> impl Future<Output = Result<(), StoreError>>;

    fn upsert_task(&self, task: &DailyTask) -> impl Future<Output = Result<(), StoreError>>;

    fn delete_task(&self, id: &str) -> impl Future<Output = Result<(), StoreError>>;

    fn upsert_mental_state(
        &self,
        state: &MentalState,
    ) -> impl Future<Output = Result<(), StoreError>>;

    /// The role assigned to a user. Users without an assignment are [`Role::User`].
    fn fetch_role(&self, user_id: &str) -> impl Future<Output = Result<Role, StoreError>>;
}
