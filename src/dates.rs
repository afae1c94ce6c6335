//! Republic-of-China calendar formatting.
//!
//! Form dates are written with the ROC year (Gregorian year minus 1911),
//! e.g. `113/06/11 14:23` for 2024-06-11 14:23.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// Offset between the Gregorian and ROC year numbering.
pub const ROC_YEAR_OFFSET: i32 = 1911;

/// Format a timestamp as `YYY/MM/DD HH:mm` with the ROC year.
pub fn roc_datetime(dt: &NaiveDateTime) -> String {
    format!(
        "{}/{:02}/{:02} {:02}:{:02}",
        dt.year() - ROC_YEAR_OFFSET,
        dt.month(),
        dt.day(),
        dt.hour(),
        dt.minute()
    )
}

/// Compact ROC timestamp used in artifact file names: `YYYMMDD_HHmm`.
pub fn roc_file_stamp(dt: &NaiveDateTime) -> String {
    format!(
        "{}{:02}{:02}_{:02}{:02}",
        dt.year() - ROC_YEAR_OFFSET,
        dt.month(),
        dt.day(),
        dt.hour(),
        dt.minute()
    )
}

/// Parse an EXIF datetime string like "2024:01:15 13:45:30" or "2024-01-15 13:45:30".
pub fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let normalized = s.trim().trim_matches('"').replace('/', "-");

    if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, "%Y:%m:%d %H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    // Some writers drop the seconds
    if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, "%Y:%m:%d %H:%M") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M") {
        return Some(dt);
    }
    if let Ok(d) = NaiveDate::parse_from_str(&normalized, "%Y:%m:%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    if let Ok(d) = NaiveDate::parse_from_str(&normalized, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    None
}

/// Convert a raw EXIF datetime into the ROC display form, if it parses.
pub fn format_exif_date(raw: &str) -> Option<String> {
    parse_exif_datetime(raw).map(|dt| roc_datetime(&dt))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hh, mm, 0)
            .unwrap()
    }

    #[test]
    fn test_roc_datetime() {
        assert_eq!(roc_datetime(&at(2024, 6, 11, 14, 23)), "113/06/11 14:23");
        assert_eq!(roc_datetime(&at(2011, 1, 2, 3, 4)), "100/01/02 03:04");
    }

    #[test]
    fn test_roc_file_stamp() {
        assert_eq!(roc_file_stamp(&at(2024, 12, 5, 9, 7)), "1131205_0907");
    }

    #[test]
    fn test_format_exif_date() {
        assert_eq!(
            format_exif_date("2024:06:11 14:23:45").as_deref(),
            Some("113/06/11 14:23")
        );
        assert_eq!(
            format_exif_date("2024-06-11 14:23:45").as_deref(),
            Some("113/06/11 14:23")
        );
        assert_eq!(format_exif_date("not a date"), None);
        assert_eq!(format_exif_date(""), None);
    }
}
