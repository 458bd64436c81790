//! Pregnancy week arithmetic.
//!
//! A pregnancy runs 40 weeks to the due date. The current week is derived from
//! how many whole weeks remain, so it only ever moves forward as time passes.

use chrono::NaiveDate;

pub const TOTAL_WEEKS: i32 = 40;
pub const FIRST_WEEK: i32 = 1;

/// `clamp(40 - floor(days_remaining / 7), 1, 40)`
pub fn current_week(due_date: NaiveDate, today: NaiveDate) -> i32 {
    let days_remaining = (due_date - today).num_days();
    let weeks_remaining = days_remaining.div_euclid(7);
    let week = (TOTAL_WEEKS as i64 - weeks_remaining).clamp(FIRST_WEEK as i64, TOTAL_WEEKS as i64);
    week as i32
}

pub fn trimester(week: i32) -> i32 {
    match week {
        i32::MIN..=13 => 1,
        14..=27 => 2,
        _ => 3,
    }
}

/// Negative once the due date has passed
pub fn days_until_due(due_date: NaiveDate, today: NaiveDate) -> i64 {
    (due_date - today).num_days()
}

pub fn is_valid_week(week: i32) -> bool {
    (FIRST_WEEK..=TOTAL_WEEKS).contains(&week)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn twelve_weeks_out_is_week_28() {
        assert_eq!(current_week(today() + Duration::weeks(12), today()), 28);
    }

    #[test]
    fn partial_weeks_round_down_remaining() {
        // 12 weeks and 3 days left still counts as 12 whole weeks remaining
        assert_eq!(current_week(today() + Duration::days(87), today()), 28);
        assert_eq!(current_week(today() + Duration::days(83), today()), 29);
    }

    #[test]
    fn clamps_to_range() {
        assert_eq!(current_week(today(), today()), 40);
        assert_eq!(current_week(today() - Duration::weeks(3), today()), 40);
        assert_eq!(current_week(today() + Duration::weeks(50), today()), 1);
        assert_eq!(current_week(today() + Duration::weeks(39), today()), 1);
    }

    #[test]
    fn always_within_bounds_and_monotonic() {
        let due = today() + Duration::weeks(45);
        let mut previous = 0;
        for offset in 0..(7 * 50) {
            let week = current_week(due, today() + Duration::days(offset));
            assert!(is_valid_week(week), "week {} out of range at offset {}", week, offset);
            assert!(week >= previous, "week went backwards at offset {}", offset);
            previous = week;
        }
        assert_eq!(previous, 40);
    }

    #[test]
    fn trimesters() {
        assert_eq!(trimester(1), 1);
        assert_eq!(trimester(13), 1);
        assert_eq!(trimester(14), 2);
        assert_eq!(trimester(27), 2);
        assert_eq!(trimester(28), 3);
        assert_eq!(trimester(40), 3);
    }

    #[test]
    fn days_until_due_goes_negative() {
        assert_eq!(days_until_due(today() + Duration::days(10), today()), 10);
        assert_eq!(days_until_due(today() - Duration::days(2), today()), -2);
    }
}
