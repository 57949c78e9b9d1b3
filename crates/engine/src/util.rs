//! Internal helpers for calendar arithmetic and name normalization.
//!
//! These utilities are **not** part of the public API. They centralize
//! month bucketing and name handling so every component agrees on what "this
//! month" and "the same category" mean.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// A calendar month, the unit of budgeting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct YearMonth {
    pub(crate) year: i32,
    pub(crate) month: u32,
}

impl YearMonth {
    pub(crate) fn of(ts: DateTime<Utc>) -> Self {
        Self {
            year: ts.year(),
            month: ts.month(),
        }
    }

    pub(crate) fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// The most recent occurrence of `month` strictly before `self`.
    pub(crate) fn latest_before(self, month: u32) -> Self {
        if month < self.month {
            Self {
                year: self.year,
                month,
            }
        } else {
            Self {
                year: self.year - 1,
                month,
            }
        }
    }

    pub(crate) fn contains(self, ts: DateTime<Utc>) -> bool {
        ts.year() == self.year && ts.month() == self.month
    }

    pub(crate) fn last_day(self) -> u32 {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|first| first.pred_opt())
            .map_or(28, |last| last.day())
    }

    /// Midnight UTC of `day` in this month; days past the end clamp to the
    /// last day.
    pub(crate) fn at_day(self, day: u32) -> Option<DateTime<Utc>> {
        let day = day.clamp(1, self.last_day());
        Utc.with_ymd_and_hms(self.year, self.month, day, 0, 0, 0)
            .single()
    }
}

/// Whole months from `now` to `until`, ignoring the day of month.
pub(crate) fn months_until(now: DateTime<Utc>, until: NaiveDate) -> i64 {
    i64::from(until.year() - now.year()) * 12 + i64::from(until.month()) - i64::from(now.month())
}

/// Collapse inner whitespace and trim; `None` when nothing is left.
pub(crate) fn normalize_display(input: &str) -> Option<String> {
    let out = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if out.is_empty() { None } else { Some(out) }
}

/// Case/accent/punctuation-insensitive key used to detect duplicate names.
pub(crate) fn normalize_key(input: &str) -> Option<String> {
    let mut out = String::new();
    let mut prev_space = false;
    for ch in input.trim().nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            prev_space = false;
        } else if !out.is_empty() && !prev_space {
            out.push(' ');
            prev_space = true;
        }
    }
    let normalized = out.trim();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized.to_string())
    }
}
