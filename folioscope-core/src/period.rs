//! Inclusive date windows for restricting report views.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed date interval; a missing bound is open on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimePeriod {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl TimePeriod {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(Some(start), Some(end))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    /// Period spanned by a sorted index; `None` for an empty index.
    pub fn of_index(index: &[NaiveDate]) -> Option<Self> {
        match (index.first(), index.last()) {
            (Some(s), Some(e)) => Some(Self::between(*s, *e)),
            _ => None,
        }
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_date = |d: Option<NaiveDate>| {
            d.map(|d| d.format("%d%b%Y").to_string())
                .unwrap_or_else(|| "..".to_string())
        };
        write!(f, "{}-{}", fmt_date(self.start), fmt_date(self.end))
    }
}
