#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("A habit needs a name.")]
    EmptyName,
    #[error("A task needs a title.")]
    EmptyTitle,
    #[error("Day {day} is outside this month (1-{days_in_month}).")]
    DayOutOfRange { day: u32, days_in_month: u32 },
    #[error("{field} must be between 0 and {max}, got {value}.", max = crate::MAX_RATING)]
    RatingOutOfRange { field: &'static str, value: u8 },
    #[error("`{0}` is not a month key (expected e.g. `2025-3`).")]
    InvalidMonthKey(String),
}
