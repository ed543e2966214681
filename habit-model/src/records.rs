//! The three kinds of record a user owns. Each belongs to one user and one month, and the month
//! never changes after creation.

use std::collections::BTreeSet;

use optimist::Record;
use serde::{Deserialize, Serialize};

use crate::{DEFAULT_HABIT_ICON, MAX_RATING, MonthKey, ValidationError};

fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub icon: String,
    pub goal: u32,
    /// Days of the month (1-based) on which the habit was done.
    pub completed_days: BTreeSet<u32>,
    pub month_key: MonthKey,
}

impl Habit {
    /// Flip whether the habit was done on `day`. Returns whether it is done afterwards.
    pub fn toggle_day(&mut self, day: u32) -> bool {
        if self.completed_days.remove(&day) {
            false
        } else {
            self.completed_days.insert(day);
            true
        }
    }

    pub fn with_day_toggled(&self, day: u32) -> Self {
        let mut habit = self.clone();
        habit.toggle_day(day);
        habit
    }

    pub fn is_done_on(&self, day: u32) -> bool {
        self.completed_days.contains(&day)
    }

    /// Share of the goal reached, clamped to `0..=100` for display. Zero when the goal is zero.
    pub fn progress_percent(&self) -> f64 {
        if self.goal == 0 {
            return 0.0;
        }
        (self.completed_days.len() as f64 / self.goal as f64 * 100.0).clamp(0.0, 100.0)
    }
}

impl Record for Habit {
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}

/// What a user fills in to start tracking a habit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHabit {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub goal: Option<u32>,
}

impl NewHabit {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_goal(mut self, goal: u32) -> Self {
        self.goal = Some(goal);
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Validate and turn into a fresh habit with no completed days.
    ///
    /// A missing (or zero) goal means "every day of the month". Any other goal is clamped into
    /// `1..=days_in_month`, since a goal the month can't reach is never intended.
    pub fn into_habit(self, user_id: &str, month_key: MonthKey) -> Result<Habit, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let icon = self
            .icon
            .map(|icon| icon.trim().to_string())
            .filter(|icon| !icon.is_empty())
            .unwrap_or_else(|| DEFAULT_HABIT_ICON.to_string());

        let days_in_month = month_key.days_in_month();
        let goal = match self.goal {
            None | Some(0) => days_in_month,
            Some(goal) => goal.clamp(1, days_in_month),
        };

        Ok(Habit {
            id: new_id("h"),
            user_id: user_id.to_string(),
            name: name.to_string(),
            icon,
            goal,
            completed_days: BTreeSet::new(),
            month_key,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTask {
    pub id: String,
    pub user_id: String,
    pub day: u32,
    pub title: String,
    pub completed: bool,
    pub month_key: MonthKey,
}

impl DailyTask {
    pub fn toggled(&self) -> Self {
        Self {
            completed: !self.completed,
            ..self.clone()
        }
    }
}

impl Record for DailyTask {
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub day: u32,
    pub title: String,
}

impl NewTask {
    pub fn new(day: u32, title: impl Into<String>) -> Self {
        Self {
            day,
            title: title.into(),
        }
    }

    pub fn into_task(self, user_id: &str, month_key: MonthKey) -> Result<DailyTask, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let day = month_key.check_day(self.day)?;

        Ok(DailyTask {
            id: new_id("t"),
            user_id: user_id.to_string(),
            day,
            title: title.to_string(),
            completed: false,
            month_key,
        })
    }
}

/// How a user felt on one day. There is at most one per (user, month, day); writing another
/// replaces it. `None` means "not rated", which is not the same as a rating of 0.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentalState {
    pub user_id: String,
    pub day: u32,
    pub mood: Option<u8>,
    pub motivation: Option<u8>,
    pub month_key: MonthKey,
}

impl Record for MentalState {
    /// Within one user's month, the day is the identity.
    type Key = u32;

    fn key(&self) -> u32 {
        self.day
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentalRating {
    pub day: u32,
    pub mood: Option<u8>,
    pub motivation: Option<u8>,
}

impl MentalRating {
    pub fn into_state(self, user_id: &str, month_key: MonthKey) -> Result<MentalState, ValidationError> {
        let day = month_key.check_day(self.day)?;
        check_rating("mood", self.mood)?;
        check_rating("motivation", self.motivation)?;

        Ok(MentalState {
            user_id: user_id.to_string(),
            day,
            mood: self.mood,
            motivation: self.motivation,
            month_key,
        })
    }
}

fn check_rating(field: &'static str, value: Option<u8>) -> Result<(), ValidationError> {
    match value {
        Some(value) if value > MAX_RATING => Err(ValidationError::RatingOutOfRange { field, value }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn march() -> MonthKey {
        MonthKey::new(2025, 3).unwrap()
    }

    fn habit(days: &[u32], goal: u32) -> Habit {
        Habit {
            id: "h-1".to_string(),
            user_id: "u".to_string(),
            name: "Read".to_string(),
            icon: DEFAULT_HABIT_ICON.to_string(),
            goal,
            completed_days: days.iter().copied().collect(),
            month_key: march(),
        }
    }

    #[test]
    fn test_toggle_day_adds_then_removes() {
        let mut habit = habit(&[1, 2], 10);
        assert!(habit.toggle_day(5));
        assert_eq!(habit.completed_days, BTreeSet::from([1, 2, 5]));
        assert!(!habit.toggle_day(5));
        assert_eq!(habit.completed_days, BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(habit(&[1, 2, 3, 4, 5], 10).progress_percent(), 50.0);
        assert_eq!(habit(&[1, 2, 3], 2).progress_percent(), 100.0);
        assert_eq!(habit(&[1, 2, 3], 0).progress_percent(), 0.0);
        assert_eq!(habit(&[], 30).progress_percent(), 0.0);
    }

    #[test]
    fn test_task_toggle_twice_is_identity() {
        let task = NewTask::new(3, "Groceries").into_task("u", march()).unwrap();
        assert!(task.toggled().completed);
        assert_eq!(task.toggled().toggled(), task);
    }

    #[test]
    fn test_new_habit_defaults() {
        let habit = NewHabit::named("  Jog ").into_habit("u", march()).unwrap();
        assert_eq!(habit.name, "Jog");
        assert_eq!(habit.icon, DEFAULT_HABIT_ICON);
        assert_eq!(habit.goal, 31);
        assert!(habit.completed_days.is_empty());
        assert!(habit.id.starts_with("h-"));
    }

    #[test]
    fn test_goal_is_clamped_to_the_month() {
        let april = MonthKey::new(2025, 4).unwrap();
        let goal = |goal| {
            NewHabit::named("Jog")
                .with_goal(goal)
                .into_habit("u", april)
                .unwrap()
                .goal
        };
        assert_eq!(goal(10), 10);
        assert_eq!(goal(0), 30);
        assert_eq!(goal(31), 30);
        assert_eq!(goal(500), 30);
        assert_eq!(goal(1), 1);
    }

    #[test]
    fn test_empty_fields_are_rejected() {
        assert_eq!(
            NewHabit::named("   ").into_habit("u", march()),
            Err(ValidationError::EmptyName)
        );
        assert_eq!(
            NewTask::new(1, "").into_task("u", march()),
            Err(ValidationError::EmptyTitle)
        );
        assert!(matches!(
            NewTask::new(32, "Late").into_task("u", march()),
            Err(ValidationError::DayOutOfRange { day: 32, .. })
        ));
    }

    #[test]
    fn test_ratings() {
        let rating = |mood, motivation| MentalRating {
            day: 4,
            mood,
            motivation,
        };
        let state = rating(Some(0), None).into_state("u", march()).unwrap();
        assert_eq!(state.mood, Some(0));
        assert_eq!(state.motivation, None);

        assert_eq!(
            rating(Some(11), None).into_state("u", march()),
            Err(ValidationError::RatingOutOfRange {
                field: "mood",
                value: 11
            })
        );
        assert!(rating(None, Some(10)).into_state("u", march()).is_ok());
    }

    #[test]
    fn test_wire_shapes() {
        let habit = habit(&[2, 1], 10);
        assert_eq!(
            serde_json::to_value(&habit).unwrap(),
            json!({
                "id": "h-1",
                "user_id": "u",
                "name": "Read",
                "icon": "🔹",
                "goal": 10,
                "completed_days": [1, 2],
                "month_key": "2025-3",
            })
        );

        let state: MentalState = serde_json::from_value(json!({
            "user_id": "u",
            "day": 9,
            "mood": null,
            "motivation": 0,
            "month_key": "2025-11",
        }))
        .unwrap();
        assert_eq!(state.mood, None);
        assert_eq!(state.motivation, Some(0));
        assert_eq!(state.month_key, MonthKey::new(2025, 11).unwrap());
    }
}
