//! Subscription period arithmetic

use time::{Date, Duration, Month, OffsetDateTime};

/// One calendar month after `from`, clamping the day to the target month's
/// length (Jan 31 -> Feb 28/29). Used as the default subscription period
/// when a verification supplies no explicit `period_end`.
pub fn add_one_month(from: OffsetDateTime) -> OffsetDateTime {
    let date = from.date();
    let (year, month) = match date.month() {
        Month::December => (date.year() + 1, Month::January),
        m => (date.year(), m.next()),
    };
    let day = date.day().min(time::util::days_in_year_month(year, month));

    match Date::from_calendar_date(year, month, day) {
        Ok(next) => from.replace_date(next),
        // Unreachable: the day is clamped to the month length above.
        Err(_) => from + Duration::days(30),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn advances_plain_month() {
        let got = add_one_month(datetime!(2025-03-15 10:30:00 UTC));
        assert_eq!(got, datetime!(2025-04-15 10:30:00 UTC));
    }

    #[test]
    fn clamps_to_shorter_month() {
        let got = add_one_month(datetime!(2025-01-31 00:00:00 UTC));
        assert_eq!(got, datetime!(2025-02-28 00:00:00 UTC));
    }

    #[test]
    fn clamps_to_leap_february() {
        let got = add_one_month(datetime!(2024-01-31 00:00:00 UTC));
        assert_eq!(got, datetime!(2024-02-29 00:00:00 UTC));
    }

    #[test]
    fn rolls_over_december() {
        let got = add_one_month(datetime!(2025-12-31 23:59:59 UTC));
        assert_eq!(got, datetime!(2026-01-31 23:59:59 UTC));
    }

    #[test]
    fn preserves_time_of_day() {
        let from = datetime!(2025-06-07 08:09:10.123 UTC);
        assert_eq!(add_one_month(from).time(), from.time());
    }
}
