//! A [`RemoteStore`] that keeps everything in memory.
//!
//! Writes follow the same rules as the real database, so it doubles as the fake store in tests.
//! Calls can be made to fail ([`MemoryStore::fail_next`], [`MemoryStore::fail_all`]) or be held
//! open until the test releases them ([`MemoryStore::hold`]), which is how tests pick the order
//! in which in-flight calls resolve.

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap, VecDeque},
};

use futures::channel::oneshot;
use habit_model::{DailyTask, Habit, MentalState, MonthKey};

use crate::{PartitionData, RemoteStore, Role, StoreError};

/// A call that reached the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreCall {
    FetchPartition { user_id: String, month_key: MonthKey },
    UpsertHabit(String),
    DeleteHabit(String),
    UpsertTask(String),
    DeleteTask(String),
    UpsertMentalState(u32),
    FetchRole(String),
}

/// Lets a held call proceed.
pub struct Release(oneshot::Sender<Result<(), String>>);

impl Release {
    pub fn succeed(self) {
        let _ = self.0.send(Ok(()));
    }

    pub fn fail(self, message: impl Into<String>) {
        let _ = self.0.send(Err(message.into()));
    }
}

#[derive(Default)]
pub struct MemoryStore {
    habits: RefCell<BTreeMap<String, Habit>>,
    tasks: RefCell<BTreeMap<String, DailyTask>>,
    mental_states: RefCell<BTreeMap<(String, MonthKey, u32), MentalState>>,
    roles: RefCell<HashMap<String, Role>>,
    holds: RefCell<VecDeque<oneshot::Receiver<Result<(), String>>>>,
    failures: RefCell<VecDeque<String>>,
    outage: RefCell<Option<String>>,
    calls: RefCell<Vec<StoreCall>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the next call that starts until the returned [`Release`] is used.
    /// Holds are handed out to calls in the order the calls start.
    pub fn hold(&self) -> Release {
        let (release, held) = oneshot::channel();
        self.holds.borrow_mut().push_back(held);
        Release(release)
    }

    pub fn fail_next(&self, message: impl Into<String>) {
        self.failures.borrow_mut().push_back(message.into());
    }

    /// Fail every call until `recover` is called.
    pub fn fail_all(&self, message: impl Into<String>) {
        *self.outage.borrow_mut() = Some(message.into());
    }

    pub fn recover(&self) {
        *self.outage.borrow_mut() = None;
        self.failures.borrow_mut().clear();
    }

    pub fn set_role(&self, user_id: &str, role: Role) {
        self.roles.borrow_mut().insert(user_id.to_string(), role);
    }

    pub fn put_habit(&self, habit: Habit) {
        self.habits.borrow_mut().insert(habit.id.clone(), habit);
    }

    pub fn put_task(&self, task: DailyTask) {
        self.tasks.borrow_mut().insert(task.id.clone(), task);
    }

    pub fn put_mental_state(&self, state: MentalState) {
        let key = (state.user_id.clone(), state.month_key, state.day);
        self.mental_states.borrow_mut().insert(key, state);
    }

    pub fn habits(&self) -> Vec<Habit> {
        self.habits.borrow().values().cloned().collect()
    }

    pub fn tasks(&self) -> Vec<DailyTask> {
        self.tasks.borrow().values().cloned().collect()
    }

    pub fn mental_states(&self) -> Vec<MentalState> {
        self.mental_states.borrow().values().cloned().collect()
    }

    /// Every call that got past holds and injected failures, oldest first.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    async fn run<R>(&self, call: StoreCall, apply: impl FnOnce(&Self) -> R) -> Result<R, StoreError> {
        let held = self.holds.borrow_mut().pop_front();
        if let Some(held) = held {
            // A dropped `Release` lets the call through.
            if let Ok(Err(message)) = held.await {
                return Err(StoreError::Transport(message));
            }
        }

        let injected = self.failures.borrow_mut().pop_front();
        if let Some(message) = injected.or_else(|| self.outage.borrow().clone()) {
            log::debug!("Failing {call:?}: {message}");
            return Err(StoreError::Transport(message));
        }

        self.calls.borrow_mut().push(call);
        Ok(apply(self))
    }
}

impl RemoteStore for MemoryStore {
    async fn fetch_partition(
        &self,
        user_id: &str,
        month_key: MonthKey,
    ) -> Result<PartitionData, StoreError> {
        let call = StoreCall::FetchPartition {
            user_id: user_id.to_string(),
            month_key,
        };
        self.run(call, |store| {
            let in_partition = |owner: &str, key: MonthKey| owner == user_id && key == month_key;
            PartitionData {
                habits: store
                    .habits
                    .borrow()
                    .values()
                    .filter(|habit| in_partition(&habit.user_id, habit.month_key))
                    .cloned()
                    .collect(),
                tasks: store
                    .tasks
                    .borrow()
                    .values()
                    .filter(|task| in_partition(&task.user_id, task.month_key))
                    .cloned()
                    .collect(),
                mental_states: store
                    .mental_states
                    .borrow()
                    .values()
                    .filter(|state| in_partition(&state.user_id, state.month_key))
                    .cloned()
                    .collect(),
            }
        })
        .await
    }

    async fn upsert_habit(&self, habit: &Habit) -> Result<(), StoreError> {
        self.run(StoreCall::UpsertHabit(habit.id.clone()), |store| {
            store.put_habit(habit.clone())
        })
        .await
    }

    async fn delete_habit(&self, id: &str) -> Result<(), StoreError> {
        self.run(StoreCall::DeleteHabit(id.to_string()), |store| {
            store.habits.borrow_mut().remove(id);
        })
        .await
    }

    async fn upsert_task(&self, task: &DailyTask) -> Result<(), StoreError> {
        self.run(StoreCall::UpsertTask(task.id.clone()), |store| {
            store.put_task(task.clone())
        })
        .await
    }

    async fn delete_task(&self, id: &str) -> Result<(), StoreError> {
        self.run(StoreCall::DeleteTask(id.to_string()), |store| {
            store.tasks.borrow_mut().remove(id);
        })
        .await
    }

    async fn upsert_mental_state(&self, state: &MentalState) -> Result<(), StoreError> {
        self.run(StoreCall::UpsertMentalState(state.day), |store| {
            store.put_mental_state(state.clone())
        })
        .await
    }

    async fn fetch_role(&self, user_id: &str) -> Result<Role, StoreError> {
        self.run(StoreCall::FetchRole(user_id.to_string()), |store| {
            store.roles.borrow().get(user_id).copied().unwrap_or_default()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use habit_model::{MentalRating, NewTask};

    fn november() -> MonthKey {
        MonthKey::new(2025, 11).unwrap()
    }

    #[tokio::test]
    async fn test_mental_state_upsert_keeps_one_record() {
        let store = MemoryStore::new();
        let rate = |mood, motivation| {
            MentalRating {
                day: 3,
                mood,
                motivation,
            }
            .into_state("u", november())
            .unwrap()
        };

        store.upsert_mental_state(&rate(Some(4), Some(5))).await.unwrap();
        store.upsert_mental_state(&rate(Some(9), None)).await.unwrap();

        let states = store.mental_states();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].mood, Some(9));
        assert_eq!(states[0].motivation, None);
    }

    #[tokio::test]
    async fn test_deleting_a_missing_id_succeeds() {
        let store = MemoryStore::new();
        store.delete_task("t-nope").await.unwrap();
        store.delete_habit("h-nope").await.unwrap();
        assert!(store.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let store = MemoryStore::new();
        let task = NewTask::new(1, "Stretch").into_task("u", november()).unwrap();
        store.upsert_task(&task).await.unwrap();
        store.upsert_task(&task).await.unwrap();
        assert_eq!(store.tasks(), vec![task]);
    }

    #[tokio::test]
    async fn test_fetch_is_scoped_to_user_and_month() {
        let store = MemoryStore::new();
        let mine = NewTask::new(1, "Mine").into_task("u", november()).unwrap();
        let other_user = NewTask::new(1, "Theirs").into_task("v", november()).unwrap();
        let other_month = NewTask::new(1, "Later")
            .into_task("u", november().next())
            .unwrap();
        for task in [&mine, &other_user, &other_month] {
            store.put_task(task.clone());
        }

        let data = store.fetch_partition("u", november()).await.unwrap();
        assert_eq!(data.tasks, vec![mine]);
        assert!(data.habits.is_empty());
        assert!(data.mental_states.is_empty());
    }

    #[tokio::test]
    async fn test_failures_and_holds() {
        let store = MemoryStore::new();
        store.fail_next("boom");
        assert_eq!(
            store.fetch_role("u").await,
            Err(StoreError::Transport("boom".to_string()))
        );
        assert_eq!(store.fetch_role("u").await, Ok(Role::User));

        let release = store.hold();
        release.fail("held and failed");
        assert!(store.delete_task("t").await.is_err());

        store.fail_all("down");
        assert!(store.delete_task("t").await.is_err());
        store.recover();
        assert!(store.delete_task("t").await.is_ok());

        assert_eq!(
            store.calls(),
            vec![
                StoreCall::FetchRole("u".to_string()),
                StoreCall::DeleteTask("t".to_string())
            ]
        );
    }
}
