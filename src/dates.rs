use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// parse a date cell from the sheets. Accepts ISO (`YYYY-MM-DD`),
/// slash (`D/M/YYYY`) and full RFC-3339 timestamps (date part taken);
/// anything else is treated as "no date".
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%d/%m/%Y") {
        return Some(d);
    }
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.date_naive())
}

/// render a raw date cell as `DD/MM/YYYY` for receipts and reminder
/// messages; unparseable cells pass through untouched, empty shows "-"
pub fn format_display(raw: &str) -> String {
    match parse_date(raw) {
        Some(d) => d.format("%d/%m/%Y").to_string(),
        None if raw.trim().is_empty() => "-".to_string(),
        None => raw.trim().to_string(),
    }
}

/// preset date windows for the reports screen. The preset only sets the
/// from/to bounds; editing either bound by hand means `Custom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuickRange {
    Today,
    Week,
    Month,
    FiscalYear,
    Custom,
}

impl QuickRange {
    /// inclusive bounds for the preset, relative to `today`.
    /// `Custom` has no implied bounds.
    pub fn bounds(self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            QuickRange::Today => Some((today, today)),
            QuickRange::Week => Some((week_start(today), today)),
            QuickRange::Month => Some((month_start(today), today)),
            QuickRange::FiscalYear => Some(indian_fiscal_year(today)),
            QuickRange::Custom => None,
        }
    }
}

/// Monday of the week containing `today`
pub fn week_start(today: NaiveDate) -> NaiveDate {
    today - chrono::Days::new(today.weekday().num_days_from_monday() as u64)
}

/// first day of the month containing `today`
pub fn month_start(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

/// Indian fiscal year containing `today`: Apr 1 through Mar 31.
/// From April onward the FY starts this calendar year, before April it
/// started the previous one.
pub fn indian_fiscal_year(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start_year = if today.month() >= 4 {
        today.year()
    } else {
        today.year() - 1
    };
    let start = NaiveDate::from_ymd_opt(start_year, 4, 1).unwrap_or(today);
    let end = NaiveDate::from_ymd_opt(start_year + 1, 3, 31).unwrap_or(today);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_iso_and_slash() {
        assert_eq!(parse_date("2024-03-05"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("5/3/2024"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("05/03/2024"), Some(ymd(2024, 3, 5)));
    }

    #[test]
    fn test_parse_rfc3339_takes_date_part() {
        assert_eq!(
            parse_date("2024-03-05T10:30:00+05:30"),
            Some(ymd(2024, 3, 5))
        );
    }

    #[test]
    fn test_parse_junk_is_none() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("  "), None);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("2024-13-40"), None);
    }

    #[test]
    fn test_format_display() {
        assert_eq!(format_display("2024-03-05"), "05/03/2024");
        assert_eq!(format_display(""), "-");
        assert_eq!(format_display("garbage"), "garbage");
    }

    #[test]
    fn test_week_starts_monday() {
        // 2024-03-07 is a Thursday
        assert_eq!(week_start(ymd(2024, 3, 7)), ymd(2024, 3, 4));
        // Monday maps to itself
        assert_eq!(week_start(ymd(2024, 3, 4)), ymd(2024, 3, 4));
        // Sunday belongs to the week that began six days earlier
        assert_eq!(week_start(ymd(2024, 3, 10)), ymd(2024, 3, 4));
    }

    #[test]
    fn test_fiscal_year_boundaries() {
        assert_eq!(
            indian_fiscal_year(ymd(2024, 4, 1)),
            (ymd(2024, 4, 1), ymd(2025, 3, 31))
        );
        assert_eq!(
            indian_fiscal_year(ymd(2024, 3, 31)),
            (ymd(2023, 4, 1), ymd(2024, 3, 31))
        );
        assert_eq!(
            indian_fiscal_year(ymd(2024, 12, 15)),
            (ymd(2024, 4, 1), ymd(2025, 3, 31))
        );
    }

    #[test]
    fn test_quick_bounds() {
        let today = ymd(2024, 3, 7);
        assert_eq!(QuickRange::Today.bounds(today), Some((today, today)));
        assert_eq!(
            QuickRange::Month.bounds(today),
            Some((ymd(2024, 3, 1), today))
        );
        assert_eq!(QuickRange::Custom.bounds(today), None);
    }
}
