//! Worked-hours arithmetic for timesheet records.

use crate::mapper::parse_transport_date;
use crate::models::Record;

pub const TIMESHEET_CATEGORY: &str = "timesheet";

pub fn is_timesheet(category: Option<&str>) -> bool {
    category.is_some_and(|c| c.trim().eq_ignore_ascii_case(TIMESHEET_CATEGORY))
}

/// Fractional hours from `start` to `end` (negative if `end` is earlier).
pub fn hours_between(start: &str, end: &str) -> Option<f64> {
    let start = parse_transport_date(start)?;
    let end = parse_transport_date(end)?;
    Some((end - start).num_milliseconds() as f64 / 3_600_000.0)
}

impl Record {
    /// Sum of the morning, afternoon and night pairs. A pair with a missing or
    /// unreadable side counts as zero.
    pub fn worked_hours(&self) -> f64 {
        self.times
            .pairs()
            .iter()
            .filter_map(|pair| match pair {
                (Some(start), Some(end)) => hours_between(start, end),
                _ => None,
            })
            .sum()
    }
}

pub fn total_timesheet_hours(records: &[Record]) -> f64 {
    records.iter().map(Record::worked_hours).sum()
}
