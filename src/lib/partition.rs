use chrono::{Datelike, Local, NaiveDate};
use tracing::warn;

use crate::types::{DocKey, Month, PartitionKey, SfaId};

/// Month prefixes in match order. The first prefix the month field starts
/// with wins.
const MONTH_PREFIXES: [(&str, Month); 12] = [
    ("jan", Month::Jan),
    ("feb", Month::Feb),
    ("mar", Month::Mar),
    ("apr", Month::Apr),
    ("may", Month::May),
    ("jun", Month::Jun),
    ("jul", Month::Jul),
    ("aug", Month::Aug),
    ("sep", Month::Sept),
    ("oct", Month::Oct),
    ("nov", Month::Nov),
    ("dec", Month::Dec),
];

fn parse_partition(date: &str) -> Option<PartitionKey> {
    let parts: Vec<&str> = date.split('-').collect();
    if parts.len() < 3 {
        return None;
    }

    let month_part = parts[1].to_lowercase();
    let month = MONTH_PREFIXES
        .iter()
        .find(|(prefix, _)| month_part.starts_with(*prefix))
        .map(|(_, month)| *month)?;

    let year = parts[2];
    if year.is_empty() {
        return None;
    }
    Some(PartitionKey::new(month, year))
}

pub fn today_partition(today: NaiveDate) -> PartitionKey {
    // chrono months are always 1..=12
    let month = Month::from_number(today.month()).unwrap_or(Month::Jan);
    PartitionKey::new(month, today.year().to_string())
}

/// Maps a `D[D]-Mon-YYYY` date to its partition key.
///
/// If either the month or the year cannot be read, *both* come from `today`.
pub fn derive_partition(date: &str, today: NaiveDate) -> PartitionKey {
    match parse_partition(date) {
        Some(key) => key,
        None => {
            let key = today_partition(today);
            warn!(date, partition = %key, "unreadable pay date, using current month");
            key
        }
    }
}

pub fn derive_partition_now(date: &str) -> PartitionKey {
    derive_partition(date, Local::now().date_naive())
}

/// Raw day and year substrings of a `D-Mon-YYYY` date, concatenated. Empty
/// when the date has fewer than three fields.
pub fn date_digits(date: &str) -> String {
    let parts: Vec<&str> = date.split('-').collect();
    if parts.len() >= 3 {
        format!("{}{}", parts[0], parts[2])
    } else {
        String::new()
    }
}

pub fn document_key(sfa_id: &SfaId, pay_date: &str) -> DocKey {
    DocKey::new(format!("{}_{}", sfa_id, date_digits(pay_date)))
}

/// Formats a date the way import files write it, e.g. `05-Sep-2026`.
pub fn format_pay_date(date: NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{date_digits, derive_partition, document_key, format_pay_date};
    use crate::types::{Month, PartitionKey, SfaId};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()
    }

    #[test]
    fn september_maps_to_sept() {
        let sut = derive_partition("14-Sep-2025", today());
        assert_eq!(sut, PartitionKey::new(Month::Sept, "2025"));
    }

    #[test]
    fn every_month_abbreviation_is_recognised() {
        let abbrevs = [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ];
        for (abbrev, month) in abbrevs.iter().zip(Month::ALL) {
            let sut = derive_partition(&format!("1-{}-2024", abbrev), today());
            assert_eq!(sut, PartitionKey::new(month, "2024"));
        }
    }

    #[test]
    fn month_matches_by_prefix() {
        let sut = derive_partition("02-September-2025", today());
        assert_eq!(sut.month, Month::Sept);
        let sut = derive_partition("02-JUNE-2025", today());
        assert_eq!(sut.month, Month::Jun);
    }

    #[test]
    fn year_is_taken_verbatim() {
        let sut = derive_partition("02-Oct-25", today());
        assert_eq!(sut, PartitionKey::new(Month::Oct, "25"));
    }

    #[test]
    fn too_few_fields_falls_back_to_today() {
        assert_eq!(
            derive_partition("14/09/2025", today()),
            PartitionKey::new(Month::Mar, "2026")
        );
        assert_eq!(
            derive_partition("", today()),
            PartitionKey::new(Month::Mar, "2026")
        );
    }

    #[test]
    fn unknown_month_replaces_the_year_too() {
        let sut = derive_partition("14-Foo-2019", today());
        assert_eq!(sut, PartitionKey::new(Month::Mar, "2026"));
    }

    #[test]
    fn empty_year_falls_back_to_today() {
        let sut = derive_partition("14-Sep-", today());
        assert_eq!(sut, PartitionKey::new(Month::Mar, "2026"));
    }

    #[test]
    fn date_digits_are_raw_substrings() {
        assert_eq!(date_digits("05-Sep-2025"), "052025");
        assert_eq!(date_digits("5-Sep-2025"), "52025");
        assert_eq!(date_digits("Sep 2025"), "");
    }

    #[test]
    fn document_key_joins_sfa_id_and_digits() {
        let sut = document_key(&SfaId::new("SFA104"), "14-Sep-2025");
        assert_eq!(sut.value(), "SFA104_142025");
    }

    #[test]
    fn pay_dates_are_formatted_like_imports() {
        let date = NaiveDate::from_ymd_opt(2026, 9, 5).unwrap();
        assert_eq!(format_pay_date(date), "05-Sep-2026");
        assert_eq!(derive_partition(&format_pay_date(date), today()).month, Month::Sept);
    }
}
