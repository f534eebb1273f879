/// Utility functions for log formatting
use time::{format_description, OffsetDateTime};

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description::parse("[day].[month].[year] - [hour]:[minute]:[second]")
        .expect("Failed to create format description");
    dt.format(&format).unwrap_or_else(|_| dt.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Date;

    #[test]
    fn formats_as_day_month_year() {
        let dt = Date::from_calendar_date(2025, time::Month::March, 7)
            .unwrap()
            .with_hms(9, 5, 30)
            .unwrap()
            .assume_utc();
        assert_eq!(format_datetime(&dt), "07.03.2025 - 09:05:30");
    }
}
