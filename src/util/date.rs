use chrono::{DateTime, FixedOffset, Locale, NaiveDate, NaiveDateTime};
use serde::Deserialize;

/// Locale used to render publication dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum DateLocale {
    /// `2. Januar 2024`
    #[default]
    #[serde(rename = "de", alias = "de-DE", alias = "de_DE")]
    German,
    /// `January 2, 2024`
    #[serde(rename = "en-us", alias = "en-US", alias = "en_US", alias = "en")]
    EnglishUs,
    /// `2 January 2024`
    #[serde(rename = "en-gb", alias = "en-GB", alias = "en_GB")]
    EnglishGb,
}

impl DateLocale {
    fn chrono_locale(self) -> Locale {
        match self {
            DateLocale::German => Locale::de_DE,
            DateLocale::EnglishUs => Locale::en_US,
            DateLocale::EnglishGb => Locale::en_GB,
        }
    }

    fn long_pattern(self) -> &'static str {
        match self {
            DateLocale::German => "%-d. %B %Y",
            DateLocale::EnglishUs => "%B %-d, %Y",
            DateLocale::EnglishGb => "%-d %B %Y",
        }
    }
}

/// Parses a feed timestamp.
///
/// RSS uses RFC 2822 (`Tue, 02 Jan 2024 10:00:00 +0100`), but plenty of feeds
/// emit RFC 3339 or bare ISO dates instead. Timestamps without an offset are
/// taken as UTC.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc().fixed_offset());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Formats a publication date in the default (German) long form.
///
/// Input that cannot be parsed is returned unchanged.
///
/// ```
/// use feedlens::util::format_date;
///
/// assert_eq!(format_date("Tue, 02 Jan 2024 10:00:00 +0100"), "2. Januar 2024");
/// assert_eq!(format_date("not-a-date"), "not-a-date");
/// ```
pub fn format_date(raw: &str) -> String {
    format_date_in(raw, DateLocale::default())
}

/// Formats a publication date as day, full month name and year in `locale`.
///
/// The date is rendered in the offset it was published with, so a feed item
/// dated just after midnight in Germany stays on that calendar day.
pub fn format_date_in(raw: &str, locale: DateLocale) -> String {
    match parse_pub_date(raw) {
        Some(dt) => dt
            .format_localized(locale.long_pattern(), locale.chrono_locale())
            .to_string(),
        None => raw.to_string(),
    }
}
