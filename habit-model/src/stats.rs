//! Month statistics derived from the working views. `derive_stats` is a plain function of its
//! inputs, so it can be called whenever the views change without any caching in between.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{DailyTask, Habit, MentalState, MonthKey};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonthStats {
    pub month_key: MonthKey,
    pub days_in_month: u32,
    /// All completed habit-days over the sum of all goals.
    pub overall_percent: f64,
    pub total_completed: usize,
    pub total_goal: u32,
    pub daily: Vec<DayStats>,
    pub mental: Vec<DayMental>,
    pub tasks: Vec<DayTasks>,
    /// Clamped progress per habit id.
    pub habit_progress: BTreeMap<String, f64>,
}

/// How many habits were done on one day.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DayStats {
    pub day: u32,
    pub completed: usize,
    pub not_completed: usize,
    pub percent: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DayMental {
    pub day: u32,
    pub mood: Option<u8>,
    pub motivation: Option<u8>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DayTasks {
    pub day: u32,
    pub total: usize,
    pub completed: usize,
    pub percent: f64,
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

pub fn derive_stats(
    month_key: MonthKey,
    habits: &[Habit],
    tasks: &[DailyTask],
    mental_states: &[MentalState],
) -> MonthStats {
    let days_in_month = month_key.days_in_month();

    let total_goal: u32 = habits.iter().map(|habit| habit.goal).sum();
    let total_completed: usize = habits.iter().map(|habit| habit.completed_days.len()).sum();
    let active_habits = habits.iter().filter(|habit| habit.goal > 0).count();

    let daily = month_key
        .days()
        .map(|day| {
            let completed = habits.iter().filter(|habit| habit.is_done_on(day)).count();
            DayStats {
                day,
                completed,
                not_completed: active_habits.saturating_sub(completed),
                percent: percent(completed, active_habits),
            }
        })
        .collect();

    let mental = month_key
        .days()
        .map(|day| {
            let entry = mental_states.iter().find(|state| state.day == day);
            DayMental {
                day,
                mood: entry.and_then(|state| state.mood),
                motivation: entry.and_then(|state| state.motivation),
            }
        })
        .collect();

    let tasks = month_key
        .days()
        .map(|day| {
            let (total, completed) = tasks
                .iter()
                .filter(|task| task.day == day)
                .fold((0, 0), |(total, completed), task| {
                    (total + 1, completed + usize::from(task.completed))
                });
            DayTasks {
                day,
                total,
                completed,
                percent: percent(completed, total),
            }
        })
        .collect();

    let habit_progress = habits
        .iter()
        .map(|habit| (habit.id.clone(), habit.progress_percent()))
        .collect();

    MonthStats {
        month_key,
        days_in_month,
        overall_percent: percent(total_completed, total_goal as usize),
        total_completed,
        total_goal,
        daily,
        mental,
        tasks,
        habit_progress,
    }
}
