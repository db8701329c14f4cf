use chrono::NaiveDate;

use crate::models::granularity::Granularity;

const RAW_MAX_SPAN_DAYS: i64 = 7;
const MINUTE_MAX_SPAN_DAYS: i64 = 30;
const HOUR_MAX_SPAN_DAYS: i64 = 365;

/// Days between the two dates, as used for granularity selection.
pub fn span_days(start_date: NaiveDate, end_date: NaiveDate) -> i64 {
    (end_date - start_date).num_days()
}

pub fn granularity_for_span(span_days: i64) -> Granularity {
    match span_days {
        s if s <= RAW_MAX_SPAN_DAYS => Granularity::Raw,
        s if s <= MINUTE_MAX_SPAN_DAYS => Granularity::OneMinute,
        s if s <= HOUR_MAX_SPAN_DAYS => Granularity::OneHour,
        _ => Granularity::OneDay,
    }
}

/// Pick the table to read for a date range. An explicit override is returned
/// untouched, even when it would scan far more rows than the automatic choice.
pub fn select_granularity(
    start_date: NaiveDate,
    end_date: NaiveDate,
    override_level: Option<Granularity>,
) -> Granularity {
    match override_level {
        Some(level) => level,
        None => granularity_for_span(span_days(start_date, end_date)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn jan_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn select_for_span(days: i64) -> Granularity {
        let start = jan_first();
        select_granularity(start, start + Duration::days(days), None)
    }

    #[test]
    fn test_threshold_boundaries() {
        assert_eq!(select_for_span(0), Granularity::Raw);
        assert_eq!(select_for_span(7), Granularity::Raw);
        assert_eq!(select_for_span(8), Granularity::OneMinute);
        assert_eq!(select_for_span(30), Granularity::OneMinute);
        assert_eq!(select_for_span(31), Granularity::OneHour);
        assert_eq!(select_for_span(365), Granularity::OneHour);
        assert_eq!(select_for_span(366), Granularity::OneDay);
        assert_eq!(select_for_span(3650), Granularity::OneDay);
    }

    #[test]
    fn test_every_span_maps_to_the_expected_band() {
        for days in 0..=800 {
            let expected = match days {
                0..=7 => Granularity::Raw,
                8..=30 => Granularity::OneMinute,
                31..=365 => Granularity::OneHour,
                _ => Granularity::OneDay,
            };
            assert_eq!(granularity_for_span(days), expected, "span of {} days", days);
        }
    }

    #[test]
    fn test_override_always_wins() {
        let start = jan_first();
        for days in [0, 7, 31, 400] {
            let end = start + Duration::days(days);
            assert_eq!(select_granularity(start, end, Some(Granularity::OneHour)), Granularity::OneHour);
            assert_eq!(select_granularity(start, end, Some(Granularity::Raw)), Granularity::Raw);
        }
    }

    #[test]
    fn test_span_days_counts_whole_days() {
        let start = jan_first();
        assert_eq!(span_days(start, start), 0);
        assert_eq!(span_days(start, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()), 365);
    }
}
