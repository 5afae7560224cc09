//! Cycle arithmetic for multi-week repeating timetables.
//!
//! A schedule with a cycle length of `n` repeats every `n` weeks. Each week
//! is assigned a 1-based cycle index ("week 1 of 2", "week 2 of 2"), counted
//! from the Monday-aligned week containing the schedule start date.

use chrono::{Datelike, Duration, NaiveDate};

/// Monday of the ISO week containing `date`.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Signed number of whole weeks between the Monday-aligned weeks of `to` and `from`.
pub fn iso_weeks_between(to: NaiveDate, from: NaiveDate) -> i64 {
    (monday_of(to) - monday_of(from)).num_days() / 7
}

/// 1-based cycle index (in `[1, cycle_length]`) of the week containing `date`.
///
/// The distance to the start week is taken as an absolute value, so weeks
/// before the start mirror those after it. A zero `cycle_length` is treated
/// as 1.
pub fn cycle_index_of(
    date: NaiveDate,
    schedule_start: NaiveDate,
    first_cycle_offset: u32,
    cycle_length: u32,
) -> u32 {
    let cycle_length = cycle_length.max(1) as u64;
    let weeks = iso_weeks_between(date, schedule_start).unsigned_abs();

    ((weeks + first_cycle_offset as u64) % cycle_length) as u32 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // Monday
    fn start() -> NaiveDate {
        date(2025, 9, 1)
    }

    #[test]
    fn monday_alignment() {
        assert_eq!(monday_of(date(2025, 9, 7)), start());
        assert_eq!(monday_of(start()), start());
        assert_eq!(monday_of(date(2025, 9, 8)), date(2025, 9, 8));
    }

    #[test]
    fn weeks_between_counts_calendar_weeks() {
        // Sunday of the start week is still week 0
        assert_eq!(iso_weeks_between(date(2025, 9, 7), start()), 0);
        assert_eq!(iso_weeks_between(date(2025, 9, 8), start()), 1);
        assert_eq!(iso_weeks_between(date(2025, 8, 31), start()), -1);
    }

    #[test]
    fn biweekly_alternates() {
        let w0 = start();
        assert_eq!(cycle_index_of(w0, w0, 0, 2), 1);
        assert_eq!(cycle_index_of(w0 + Duration::days(7), w0, 0, 2), 2);
        assert_eq!(cycle_index_of(w0 + Duration::days(14), w0, 0, 2), 1);
    }

    #[test]
    fn whole_week_shares_an_index() {
        let w0 = start();
        for day in 0..7 {
            assert_eq!(cycle_index_of(w0 + Duration::days(day), w0, 0, 2), 1);
        }
    }

    #[test]
    fn offset_shifts_the_cycle() {
        let w0 = start();
        assert_eq!(cycle_index_of(w0, w0, 1, 2), 2);
        assert_eq!(cycle_index_of(w0 + Duration::days(7), w0, 1, 2), 1);
        assert_eq!(cycle_index_of(w0, w0, 2, 3), 3);
    }

    #[test]
    fn single_week_cycle_is_constant() {
        let w0 = start();
        for week in -5..20 {
            assert_eq!(cycle_index_of(w0 + Duration::weeks(week), w0, 0, 1), 1);
            assert_eq!(cycle_index_of(w0 + Duration::weeks(week), w0, 3, 1), 1);
        }
    }

    #[test]
    fn symmetric_before_start() {
        let w0 = start();
        assert_eq!(
            cycle_index_of(w0 - Duration::days(7), w0, 0, 3),
            cycle_index_of(w0 + Duration::days(7), w0, 0, 3)
        );
    }

    #[test]
    fn start_mid_week_aligns_to_monday() {
        let wednesday = date(2025, 9, 3);
        assert_eq!(cycle_index_of(start(), wednesday, 0, 2), 1);
        assert_eq!(cycle_index_of(date(2025, 9, 8), wednesday, 0, 2), 2);
    }

    #[test]
    fn index_stays_in_range() {
        let w0 = start();
        for length in 1..6 {
            for offset in 0..6 {
                for week in -10..30 {
                    let idx = cycle_index_of(w0 + Duration::weeks(week), w0, offset, length);
                    assert!((1..=length).contains(&idx));
                }
            }
        }
    }
}
