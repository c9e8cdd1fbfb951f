//! End-of-session bankroll history and the withdrawal goal projection.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::plan::round_cents;

/// Points shown on the performance chart.
pub const CHART_POINTS: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// RFC3339 timestamp (or a bare `YYYY-MM-DD`).
    pub date: String,
    pub bankroll: f64,
}

impl HistoryEntry {
    pub fn new(date: impl Into<String>, bankroll: f64) -> Self {
        Self {
            date: date.into(),
            bankroll,
        }
    }

    /// Entry stamped with the UTC time for `now_ms`.
    pub fn at(now_ms: i64, bankroll: f64) -> Self {
        let date = DateTime::<Utc>::from_timestamp_millis(now_ms)
            .unwrap_or_default()
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        Self { date, bankroll }
    }

    /// Calendar day (UTC) of the entry, if the date parses.
    pub fn day(&self) -> Option<NaiveDate> {
        day_of(&self.date)
    }
}

fn day_of(date: &str) -> Option<NaiveDate> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(date) {
        return Some(ts.with_timezone(&Utc).date_naive());
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

fn same_day(a: &str, b: &str) -> bool {
    match (day_of(a), day_of(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Replace any entry from the same calendar day, then append.
pub fn append_history(history: &[HistoryEntry], entry: HistoryEntry) -> Vec<HistoryEntry> {
    let mut next: Vec<HistoryEntry> = history
        .iter()
        .filter(|e| !same_day(&e.date, &entry.date))
        .cloned()
        .collect();
    next.push(entry);
    next
}

/// The last `n` entries, oldest first.
pub fn recent_history(history: &[HistoryEntry], n: usize) -> &[HistoryEntry] {
    &history[history.len().saturating_sub(n)..]
}

/// Most recent bankroll, falling back to the record's legacy field.
pub fn last_bankroll(history: &[HistoryEntry], fallback: f64) -> f64 {
    history.last().map(|e| e.bankroll).unwrap_or(fallback)
}

pub fn projected_target_bankroll(goal: f64, safe_withdrawal_fraction: f64) -> f64 {
    if safe_withdrawal_fraction > 0.0 {
        round_cents(goal / safe_withdrawal_fraction)
    } else {
        0.0
    }
}

pub fn progress_percent(current_bankroll: f64, target_bankroll: f64) -> f64 {
    if target_bankroll > 0.0 {
        (current_bankroll / target_bankroll * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Parse user input for the withdrawal goal. Unparseable input resets to 0.
pub fn parse_withdrawal_goal(input: &str) -> f64 {
    match input.trim().replace(',', ".").parse::<f64>() {
        Ok(v) if v.is_finite() => v.max(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_day_entry_replaced() {
        let history = vec![
            HistoryEntry::new("2026-10-17T21:00:00.000Z", 900.0),
            HistoryEntry::new("2026-10-18T09:15:00.000Z", 950.0),
        ];
        let next = append_history(&history, HistoryEntry::new("2026-10-18T22:40:00.000Z", 1010.0));
        assert_eq!(next.len(), 2);
        assert_eq!(next[0].bankroll, 900.0);
        assert_eq!(next[1].bankroll, 1010.0);
    }

    #[test]
    fn test_append_is_idempotent() {
        let history = vec![HistoryEntry::new("2026-10-17", 900.0)];
        let entry = HistoryEntry::new("2026-10-18T10:00:00Z", 1000.0);
        let once = append_history(&history, entry.clone());
        let twice = append_history(&once, entry);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_bare_dates_and_timestamps_share_a_day() {
        let history = vec![HistoryEntry::new("2026-10-18", 800.0)];
        let next = append_history(&history, HistoryEntry::new("2026-10-18T23:59:59Z", 820.0));
        assert_eq!(next, vec![HistoryEntry::new("2026-10-18T23:59:59Z", 820.0)]);
    }

    #[test]
    fn test_entry_at_formats_utc() {
        let entry = HistoryEntry::at(86_400_000, 10.0);
        assert_eq!(entry.date, "1970-01-02T00:00:00.000Z");
        assert_eq!(entry.day(), NaiveDate::from_ymd_opt(1970, 1, 2));
    }

    #[test]
    fn test_recent_and_last() {
        let history: Vec<HistoryEntry> = (1..=9)
            .map(|d| HistoryEntry::new(format!("2026-10-{:02}", d), d as f64 * 100.0))
            .collect();
        let recent = recent_history(&history, CHART_POINTS);
        assert_eq!(recent.len(), 7);
        assert_eq!(recent[0].bankroll, 300.0);
        assert_eq!(last_bankroll(&history, 0.0), 900.0);
        assert_eq!(last_bankroll(&[], 42.0), 42.0);
        assert_eq!(recent_history(&history[..2], CHART_POINTS).len(), 2);
    }

    #[test]
    fn test_goal_projection_scenario() {
        let target = projected_target_bankroll(200.0, 0.05);
        assert_eq!(target, 4000.0);
        assert_eq!(progress_percent(2000.0, target), 50.0);
        assert_eq!(progress_percent(9000.0, target), 100.0);
        assert_eq!(progress_percent(-5.0, target), 0.0);
        assert_eq!(progress_percent(100.0, 0.0), 0.0);
        assert_eq!(projected_target_bankroll(200.0, 0.0), 0.0);
    }

    #[test]
    fn test_parse_goal() {
        assert_eq!(parse_withdrawal_goal("150"), 150.0);
        assert_eq!(parse_withdrawal_goal("12,5"), 12.5);
        assert_eq!(parse_withdrawal_goal("-3"), 0.0);
        assert_eq!(parse_withdrawal_goal("lots"), 0.0);
        assert_eq!(parse_withdrawal_goal("inf"), 0.0);
    }
}
