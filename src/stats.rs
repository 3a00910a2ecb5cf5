//! Aggregations over the statistics endpoint's response.

use chrono::{Datelike, Months, NaiveDate};
use std::collections::{BTreeMap, HashMap};

use crate::api::types::TimeSession;
use crate::error::Result;
use crate::validation;

pub const UNCATEGORIZED: &str = "Uncategorized";

/// Sunday first, matching `chrono::Weekday::num_days_from_sunday`.
pub const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Inclusive date range for a statistics query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
  pub start: NaiveDate,
  pub end: NaiveDate,
}

impl DateRange {
  pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
    validation::date_range(start, end)?;
    Ok(Self { start, end })
  }

  /// First day of the current month through today.
  pub fn month_to_date(today: NaiveDate) -> Self {
    Self {
      start: today.with_day(1).unwrap_or(today),
      end: today,
    }
  }

  /// The seven days before today, plus today.
  pub fn last_week(today: NaiveDate) -> Self {
    Self {
      start: today - chrono::Duration::days(7),
      end: today,
    }
  }

  pub fn last_month(today: NaiveDate) -> Self {
    Self {
      start: today.checked_sub_months(Months::new(1)).unwrap_or(today),
      end: today,
    }
  }
}

impl std::fmt::Display for DateRange {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} .. {}", self.start.format("%Y-%m-%d"), self.end.format("%Y-%m-%d"))
  }
}

fn round2(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}

fn hours(seconds: i64) -> f64 {
  seconds as f64 / 3600.0
}

/// Hours per category for completed entries, largest first.
///
/// Entries without a category land in [`UNCATEGORIZED`], which is left out
/// when it sums to zero.
pub fn category_breakdown(entries: &[TimeSession]) -> Vec<(String, f64)> {
  let mut totals: HashMap<&str, f64> = HashMap::new();
  totals.insert(UNCATEGORIZED, 0.0);

  for entry in entries {
    let Some(end) = entry.end_time else {
      continue;
    };
    let worked = (end - entry.start_time).num_seconds() - entry.total_paused_seconds;
    let name = entry.category_name().unwrap_or(UNCATEGORIZED);
    *totals.entry(name).or_insert(0.0) += hours(worked);
  }

  if totals.get(UNCATEGORIZED).is_some_and(|h| *h == 0.0) {
    totals.remove(UNCATEGORIZED);
  }

  let mut breakdown: Vec<(String, f64)> = totals
    .into_iter()
    .map(|(name, h)| (name.to_string(), round2(h)))
    .collect();
  breakdown.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
  breakdown
}

/// Average hours worked on each weekday that has data, Sunday first.
pub fn weekday_averages(daily_stats: &BTreeMap<String, i64>) -> [(&'static str, f64); 7] {
  let mut sums = [0i64; 7];
  let mut counts = [0u32; 7];

  for (date, day) in parse_days(daily_stats) {
    let idx = date.weekday().num_days_from_sunday() as usize;
    sums[idx] += day;
    counts[idx] += 1;
  }

  std::array::from_fn(|i| {
    let avg = if counts[i] == 0 {
      0.0
    } else {
      round2(hours(sums[i]) / counts[i] as f64)
    };
    (WEEKDAYS[i], avg)
  })
}

/// Chronological `(date, hours)` series, optionally only the last `last` days.
pub fn daily_hours(daily_stats: &BTreeMap<String, i64>, last: Option<usize>) -> Vec<(NaiveDate, f64)> {
  let mut series: Vec<(NaiveDate, f64)> = parse_days(daily_stats)
    .map(|(date, secs)| (date, round2(hours(secs))))
    .collect();
  series.sort_by_key(|(date, _)| *date);

  if let Some(n) = last {
    let skip = series.len().saturating_sub(n);
    series.drain(..skip);
  }
  series
}

fn parse_days(daily_stats: &BTreeMap<String, i64>) -> impl Iterator<Item = (NaiveDate, i64)> + '_ {
  daily_stats
    .iter()
    .filter_map(|(key, secs)| match NaiveDate::parse_from_str(key, "%Y-%m-%d") {
      Ok(date) => Some((date, *secs)),
      Err(e) => {
        tracing::debug!(key, error = %e, "skipping unparseable day");
        None
      }
    })
}

/// `"{h}h {m}m"`; zero and negative durations render as `0h 0m`.
pub fn format_duration(seconds: i64) -> String {
  let seconds = seconds.max(0);
  format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::{Category, SessionStatus};
  use chrono::{TimeZone, Utc};

  fn entry(category: Option<&str>, minutes: i64, paused: i64, completed: bool) -> TimeSession {
    let start = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
    TimeSession {
      id: 1,
      user_id: Some(1),
      start_time: start,
      end_time: completed.then(|| start + chrono::Duration::minutes(minutes)),
      paused_at: None,
      status: if completed {
        SessionStatus::Completed
      } else {
        SessionStatus::Active
      },
      total_paused_seconds: paused,
      category_id: None,
      category: category.map(|name| Category {
        id: 1,
        name: name.to_string(),
        color_hex: "#000000".to_string(),
        owner_id: 1,
      }),
    }
  }

  fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
  }

  #[test]
  fn test_category_breakdown() {
    let entries = vec![
      entry(Some("Work"), 90, 0, true),
      entry(Some("Study"), 60, 600, true),
      entry(Some("Work"), 30, 0, true),
      // Still running, ignored
      entry(Some("Study"), 600, 0, false),
    ];

    let breakdown = category_breakdown(&entries);
    assert_eq!(
      breakdown,
      vec![("Work".to_string(), 2.0), ("Study".to_string(), 0.83)]
    );
  }

  #[test]
  fn test_uncategorized_kept_only_when_nonzero() {
    let with = category_breakdown(&[entry(None, 30, 0, true)]);
    assert_eq!(with, vec![(UNCATEGORIZED.to_string(), 0.5)]);

    let without = category_breakdown(&[entry(Some("Work"), 30, 0, true)]);
    assert!(without.iter().all(|(name, _)| name != UNCATEGORIZED));
  }

  #[test]
  fn test_weekday_averages() {
    let mut daily = BTreeMap::new();
    // 2024-03-03 is a Sunday
    daily.insert("2024-03-03".to_string(), 3600);
    daily.insert("2024-03-10".to_string(), 7200);
    daily.insert("2024-03-04".to_string(), 1800);
    daily.insert("garbage".to_string(), 99);

    let averages = weekday_averages(&daily);
    assert_eq!(averages[0], ("Sun", 1.5));
    assert_eq!(averages[1], ("Mon", 0.5));
    assert_eq!(averages[2], ("Tue", 0.0));
  }

  #[test]
  fn test_daily_hours_sorted_and_limited() {
    let mut daily = BTreeMap::new();
    for (d, secs) in [("2024-03-02", 3600), ("2024-03-01", 1800), ("2024-03-03", 5400)] {
      daily.insert(d.to_string(), secs);
    }

    let all = daily_hours(&daily, None);
    assert_eq!(all.first(), Some(&(day("2024-03-01"), 0.5)));
    assert_eq!(all.len(), 3);

    let last_two = daily_hours(&daily, Some(2));
    assert_eq!(last_two, vec![(day("2024-03-02"), 1.0), (day("2024-03-03"), 1.5)]);
  }

  #[test]
  fn test_format_duration() {
    assert_eq!(format_duration(0), "0h 0m");
    assert_eq!(format_duration(-5), "0h 0m");
    assert_eq!(format_duration(3660), "1h 1m");
    assert_eq!(format_duration(7200 + 59), "2h 0m");
  }

  #[test]
  fn test_default_ranges() {
    let today = day("2024-03-15");
    assert_eq!(DateRange::month_to_date(today).start, day("2024-03-01"));
    assert_eq!(DateRange::last_week(today).start, day("2024-03-08"));
    assert_eq!(DateRange::last_month(today).start, day("2024-02-15"));
    assert!(DateRange::new(today, day("2024-03-01")).is_err());
  }
}
