//! Points, levels and streaks. Pure functions so the rules can be tested
//! without a database.

use chrono::{Datelike, NaiveDate};
use std::collections::HashSet;

const BASE_POINTS: i64 = 10;
const POINTS_PER_STAR: i64 = 2;
const NEW_CATEGORY_BONUS: i64 = 5;
const POINTS_PER_LEVEL: i64 = 100;

pub fn completion_points(rating: i64, first_in_category: bool) -> i64 {
    let bonus = if first_in_category { NEW_CATEGORY_BONUS } else { 0 };
    BASE_POINTS + POINTS_PER_STAR * rating + bonus
}

pub fn level_for(points: i64) -> i64 {
    1 + points.max(0) / POINTS_PER_LEVEL
}

pub fn points_to_next_level(points: i64) -> i64 {
    POINTS_PER_LEVEL - points.max(0) % POINTS_PER_LEVEL
}

fn previous_month((year, month): (i32, u32)) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// Parses `YYYY-MM` (or any string starting with it)
fn parse_month(value: &str) -> Option<(i32, u32)> {
    let year = value.get(0..4)?.parse().ok()?;
    let month = value.get(5..7)?.parse().ok()?;
    (1..=12).contains(&month).then_some((year, month))
}

/// Consecutive months with at least one date, counted back from this month.
/// A streak still counts when the latest date was last month.
pub fn monthly_streak<'a>(months: impl IntoIterator<Item = &'a str>, today: NaiveDate) -> i64 {
    let active: HashSet<(i32, u32)> = months.into_iter().filter_map(parse_month).collect();

    let mut cursor = (today.year(), today.month());
    if !active.contains(&cursor) {
        cursor = previous_month(cursor);
    }

    let mut streak = 0;
    while active.contains(&cursor) {
        streak += 1;
        cursor = previous_month(cursor);
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_completion_points() {
        assert_eq!(completion_points(1, false), 12);
        assert_eq!(completion_points(5, false), 20);
        assert_eq!(completion_points(5, true), 25);
    }

    #[test]
    fn test_levels() {
        assert_eq!(level_for(0), 1);
        assert_eq!(points_to_next_level(0), 100);
        assert_eq!(level_for(99), 1);
        assert_eq!(points_to_next_level(99), 1);
        assert_eq!(level_for(100), 2);
        assert_eq!(points_to_next_level(100), 100);
        assert_eq!(level_for(250), 3);
    }

    #[test]
    fn test_streak_ending_this_month() {
        let months = ["2024-04", "2024-05", "2024-06"];
        assert_eq!(monthly_streak(months, day("2024-06-15")), 3);
    }

    #[test]
    fn test_streak_ending_last_month_still_counts() {
        let months = ["2024-04", "2024-05"];
        assert_eq!(monthly_streak(months, day("2024-06-15")), 2);
    }

    #[test]
    fn test_streak_broken_by_gap() {
        assert_eq!(monthly_streak(["2024-03", "2024-06"], day("2024-06-01")), 1);
        assert_eq!(monthly_streak(["2024-03"], day("2024-06-01")), 0);
        assert_eq!(monthly_streak(std::iter::empty(), day("2024-06-01")), 0);
    }

    #[test]
    fn test_streak_crosses_year_boundary() {
        let months = ["2023-11", "2023-12", "2024-01"];
        assert_eq!(monthly_streak(months, day("2024-01-20")), 3);
    }
}
