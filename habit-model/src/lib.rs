//! Records, month partitioning and derived statistics for the habit tracker.
//! Nothing in here does I/O.

pub mod error;
pub mod month;
pub mod planner;
pub mod records;
pub mod stats;

pub use error::ValidationError;
pub use month::MonthKey;
pub use records::{DailyTask, Habit, MentalRating, MentalState, NewHabit, NewTask};
pub use stats::{MonthStats, derive_stats};

/// Ratings (mood, motivation) go from 0 to this, inclusive.
pub const MAX_RATING: u8 = 10;

pub const DEFAULT_HABIT_ICON: &str = "🔹";
