//! # SyncOrchestrator
//! Owns which user and which month are on screen, the three working views, and the load cycle.
//!
//! Mutation handlers apply their change and snapshot before returning, so the views already show
//! the change when the caller gets the future back. The future persists it. Creates and deletes
//! reload the month once the store has them; toggles and edits don't.
//!
//! Every load takes a ticket when it's issued. When a load finishes, it's only applied if no other
//! load was issued after it, so a slow load for a month the user already left can't overwrite the
//! month they're looking at.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use chrono::Datelike;
use habit_model::{
    DailyTask, Habit, MentalRating, MentalState, MonthKey, MonthStats, NewHabit, NewTask,
    derive_stats, planner::PlannerPage,
};
use optimist::{OptimisticState, Settled};

use crate::{Identity, RemoteStore, StoreError, SyncError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer load was issued while this one was in flight, so its result was dropped.
    Superseded,
}

pub struct SyncOrchestrator<S> {
    // btw, no borrow of any of these is ever held across an .await
    store: Rc<S>,
    identity: RefCell<Option<Identity>>,
    month_key: Cell<MonthKey>,

    habits: OptimisticState<Habit>,
    tasks: OptimisticState<DailyTask>,
    mental_states: OptimisticState<MentalState>,

    planner: Cell<PlannerPage>,
    selected_day: Cell<Option<u32>>,

    latest_load: Cell<u64>,
    loading: Cell<bool>,
    last_error: RefCell<Option<String>>,
}

impl<S: RemoteStore> SyncOrchestrator<S> {
    pub fn new(store: Rc<S>, month_key: MonthKey) -> Self {
        Self {
            store,
            identity: RefCell::new(None),
            month_key: Cell::new(month_key),
            habits: OptimisticState::new("habits"),
            tasks: OptimisticState::new("daily tasks"),
            mental_states: OptimisticState::new("mental states"),
            planner: Cell::new(PlannerPage::default()),
            selected_day: Cell::new(None),
            latest_load: Cell::new(0),
            loading: Cell::new(false),
            last_error: RefCell::new(None),
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    pub fn month_key(&self) -> MonthKey {
        self.month_key.get()
    }

    pub fn habits(&self) -> Vec<Habit> {
        self.habits.to_vec()
    }

    pub fn tasks(&self) -> Vec<DailyTask> {
        self.tasks.to_vec()
    }

    pub fn mental_states(&self) -> Vec<MentalState> {
        self.mental_states.to_vec()
    }

    pub fn mental_state_on(&self, day: u32) -> Option<MentalState> {
        self.mental_states.find(&day)
    }

    pub fn stats(&self) -> MonthStats {
        derive_stats(
            self.month_key(),
            &self.habits(),
            &self.tasks(),
            &self.mental_states(),
        )
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    /// Number of mutations whose persistence hasn't settled yet.
    pub fn pending(&self) -> usize {
        self.habits.pending() + self.tasks.pending() + self.mental_states.pending()
    }

    /// The most recent failure, for showing to the user.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    pub fn dismiss_error(&self) {
        self.last_error.borrow_mut().take();
    }

    pub fn planner(&self) -> PlannerPage {
        self.planner.get()
    }

    pub fn next_page(&self) {
        let days_in_month = self.month_key().days_in_month();
        self.planner.set(self.planner.get().next(days_in_month));
    }

    pub fn prev_page(&self) {
        self.planner.set(self.planner.get().prev());
    }

    pub fn selected_day(&self) -> Option<u32> {
        self.selected_day.get()
    }

    pub fn select_day(&self, day: Option<u32>) {
        self.selected_day.set(day);
    }

    fn report(&self, error: &SyncError) {
        *self.last_error.borrow_mut() = Some(error.message());
    }

    fn user_id(&self) -> Result<String, SyncError> {
        self.identity
            .borrow()
            .as_ref()
            .map(|identity| identity.user_id.clone())
            .ok_or(SyncError::NoIdentity)
    }

    fn clear_views(&self) {
        self.habits.clear();
        self.tasks.clear();
        self.mental_states.clear();
    }

    // ---- Loading ----

    /// Fetch `month_key` for `user_id` and replace all three views with it.
    ///
    /// The load counts as issued as soon as this is called, even before the future is polled.
    pub fn load<'a>(
        &'a self,
        user_id: &str,
        month_key: MonthKey,
    ) -> impl Future<Output = Result<LoadOutcome, SyncError>> + use<'a, S> {
        let ticket = self.latest_load.get() + 1;
        self.latest_load.set(ticket);
        self.loading.set(true);
        let user_id = user_id.to_string();

        async move {
            let fetched = self.store.fetch_partition(&user_id, month_key).await;

            if self.latest_load.get() != ticket {
                log::debug!("Dropping superseded load of {month_key}");
                return Ok(LoadOutcome::Superseded);
            }
            self.loading.set(false);

            let data = fetched.map_err(SyncError::from).inspect_err(|e| {
                log::error!("Failed to load {month_key}: {e}");
                self.report(e);
            })?;

            log::info!(
                "Loaded {} habits, {} tasks and {} mental states for {month_key}",
                data.habits.len(),
                data.tasks.len(),
                data.mental_states.len()
            );
            self.habits.replace(data.habits);
            self.tasks.replace(data.tasks);
            self.mental_states.replace(data.mental_states);
            Ok(LoadOutcome::Applied)
        }
    }

    /// Reload the current user's current month.
    pub fn refresh(&self) -> impl Future<Output = Result<LoadOutcome, SyncError>> {
        let load = self
            .user_id()
            .map(|user_id| self.load(&user_id, self.month_key()));
        async move { load?.await }
    }

    /// Switch to another month. Paging and selection start over and the new month is loaded.
    pub fn set_month(
        &self,
        month_key: MonthKey,
    ) -> impl Future<Output = Result<LoadOutcome, SyncError>> {
        if month_key != self.month_key() {
            log::info!("Switching from {} to {month_key}", self.month_key());
            self.month_key.set(month_key);
            self.planner.set(PlannerPage::default());
            self.selected_day.set(None);
            self.clear_views();
        }
        self.refresh()
    }

    pub fn set_date(
        &self,
        date: impl Datelike,
    ) -> impl Future<Output = Result<LoadOutcome, SyncError>> {
        let switched = MonthKey::from_date(date).map(|month_key| self.set_month(month_key));
        async move {
            switched
                .map_err(SyncError::from)
                .inspect_err(|e| self.report(e))?
                .await
        }
    }

    pub fn next_month(&self) -> impl Future<Output = Result<LoadOutcome, SyncError>> {
        self.set_month(self.month_key().next())
    }

    pub fn prev_month(&self) -> impl Future<Output = Result<LoadOutcome, SyncError>> {
        self.set_month(self.month_key().prev())
    }

    /// Sign `user_id` in with the role the store has on record, then load their month.
    pub async fn sign_in(&self, user_id: &str) -> Result<Identity, SyncError> {
        let role = self.store.fetch_role(user_id).await.unwrap_or_else(|e| {
            log::warn!("Couldn't fetch the role for {user_id}, continuing as a regular user: {e}");
            Default::default()
        });

        let identity = Identity {
            user_id: user_id.to_string(),
            role,
        };
        *self.identity.borrow_mut() = Some(identity.clone());
        self.planner.set(PlannerPage::default());
        self.selected_day.set(None);
        self.clear_views();

        self.load(user_id, self.month_key()).await?;
        Ok(identity)
    }

    pub fn sign_out(&self) {
        self.identity.borrow_mut().take();
        // Anything still loading belongs to the old session.
        self.latest_load.set(self.latest_load.get() + 1);
        self.loading.set(false);
        self.planner.set(PlannerPage::default());
        self.selected_day.set(None);
        self.clear_views();
    }

    // ---- Mutations ----

    /// What to do once the store has answered a mutation.
    async fn settle(&self, settled: Result<Settled, StoreError>) -> Result<Settled, SyncError> {
        let settled = settled.map_err(SyncError::from).inspect_err(|e| self.report(e))?;

        if settled.needs_reload() {
            // The write itself went through, so a failed reload is reported but isn't an error
            // for the mutation.
            if let Err(e) = self.refresh().await {
                log::warn!("Reload after a write failed: {e}");
            }
        }
        Ok(settled)
    }

    pub fn add_habit(&self, new: NewHabit) -> impl Future<Output = Result<Habit, SyncError>> {
        let prepared = self.user_id().and_then(|user_id| {
            let habit = new.into_habit(&user_id, self.month_key())?;
            let store = Rc::clone(&self.store);
            let record = habit.clone();
            let settle = self.habits.insert(habit.clone(), move || async move {
                store.upsert_habit(&record).await
            });
            Ok((habit, settle))
        });

        async move {
            let (habit, settle) = prepared.inspect_err(|e| self.report(e))?;
            self.settle(settle.await).await?;
            Ok(habit)
        }
    }

    /// Mark `day` done for the habit, or not done if it already was.
    pub fn toggle_habit_day<'a>(
        &'a self,
        habit_id: &str,
        day: u32,
    ) -> impl Future<Output = Result<Settled, SyncError>> + use<'a, S> {
        let prepared = self.month_key().check_day(day).map(|day| {
            let store = Rc::clone(&self.store);
            self.habits.update(
                habit_id.to_string(),
                move |habit| habit.with_day_toggled(day),
                move |habit| async move { store.upsert_habit(&habit).await },
            )
        });

        async move {
            let settle = prepared
                .map_err(SyncError::from)
                .inspect_err(|e| self.report(e))?;
            self.settle(settle.await).await
        }
    }

    pub fn delete_habit<'a>(
        &'a self,
        habit_id: &str,
    ) -> impl Future<Output = Result<Settled, SyncError>> + use<'a, S> {
        let store = Rc::clone(&self.store);
        let id = habit_id.to_string();
        let settle = self.habits.remove(id.clone(), move || async move {
            store.delete_habit(&id).await
        });

        async move { self.settle(settle.await).await }
    }

    pub fn add_task(&self, new: NewTask) -> impl Future<Output = Result<DailyTask, SyncError>> {
        let prepared = self.user_id().and_then(|user_id| {
            let task = new.into_task(&user_id, self.month_key())?;
            let store = Rc::clone(&self.store);
            let record = task.clone();
            let settle = self.tasks.insert(task.clone(), move || async move {
                store.upsert_task(&record).await
            });
            Ok((task, settle))
        });

        async move {
            let (task, settle) = prepared.inspect_err(|e| self.report(e))?;
            self.settle(settle.await).await?;
            Ok(task)
        }
    }

    pub fn toggle_task<'a>(
        &'a self,
        task_id: &str,
    ) -> impl Future<Output = Result<Settled, SyncError>> + use<'a, S> {
        let store = Rc::clone(&self.store);
        let settle = self.tasks.update(
            task_id.to_string(),
            DailyTask::toggled,
            move |task| async move { store.upsert_task(&task).await },
        );

        async move { self.settle(settle.await).await }
    }

    pub fn delete_task<'a>(
        &'a self,
        task_id: &str,
    ) -> impl Future<Output = Result<Settled, SyncError>> + use<'a, S> {
        let store = Rc::clone(&self.store);
        let id = task_id.to_string();
        let settle = self.tasks.remove(id.clone(), move || async move {
            store.delete_task(&id).await
        });

        async move { self.settle(settle.await).await }
    }

    /// Record mood and motivation for a day, replacing whatever was there.
    pub fn set_mental_state(
        &self,
        rating: MentalRating,
    ) -> impl Future<Output = Result<MentalState, SyncError>> {
        let prepared = self.user_id().and_then(|user_id| {
            let state = rating.into_state(&user_id, self.month_key())?;
            let store = Rc::clone(&self.store);
            let record = state.clone();
            let settle = self.mental_states.upsert(state.clone(), move || async move {
                store.upsert_mental_state(&record).await
            });
            Ok((state, settle))
        });

        async move {
            let (state, settle) = prepared.inspect_err(|e| self.report(e))?;
            self.settle(settle.await).await?;
            Ok(state)
        }
    }
}
