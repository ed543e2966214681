//! Paging through a month a week at a time.

use serde::{Deserialize, Serialize};

pub const DAYS_PER_PAGE: u32 = 7;

/// Which seven days of the month the planner shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerPage {
    scroll_index: u32,
}

impl PlannerPage {
    pub fn scroll_index(&self) -> u32 {
        self.scroll_index
    }

    /// 1-based.
    pub fn week_number(&self) -> u32 {
        self.scroll_index / DAYS_PER_PAGE + 1
    }

    pub fn visible_days(&self, days_in_month: u32) -> std::ops::RangeInclusive<u32> {
        let first = self.scroll_index + 1;
        let last = (self.scroll_index + DAYS_PER_PAGE).min(days_in_month);
        first..=last
    }

    pub fn has_prev(&self) -> bool {
        self.scroll_index > 0
    }

    pub fn has_next(&self, days_in_month: u32) -> bool {
        self.scroll_index + DAYS_PER_PAGE < days_in_month
    }

    pub fn prev(self) -> Self {
        Self {
            scroll_index: self.scroll_index.saturating_sub(DAYS_PER_PAGE),
        }
    }

    pub fn next(self, days_in_month: u32) -> Self {
        if self.has_next(days_in_month) {
            Self {
                scroll_index: self.scroll_index + DAYS_PER_PAGE,
            }
        } else {
            self
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Week {
    pub number: u32,
    pub start: u32,
    pub end: u32,
}

/// The tracker groups a month into four weeks; the last one absorbs the remaining days.
pub fn weeks(days_in_month: u32) -> [Week; 4] {
    [
        Week {
            number: 1,
            start: 1,
            end: 7,
        },
        Week {
            number: 2,
            start: 8,
            end: 14,
        },
        Week {
            number: 3,
            start: 15,
            end: 21,
        },
        Week {
            number: 4,
            start: 22,
            end: days_in_month,
        },
    ]
}
