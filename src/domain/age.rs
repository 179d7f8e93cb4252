use chrono::{Datelike, NaiveDate};

use super::AgeCategory;

/// Where a date of birth falls relative to the configured age thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeBracket {
    BelowMinimum,
    Minor,
    Adult,
}

impl AgeBracket {
    /// Storable category, or `None` for ages that may not hold an account.
    #[must_use]
    pub const fn category(self) -> Option<AgeCategory> {
        match self {
            Self::BelowMinimum => None,
            Self::Minor => Some(AgeCategory::Minor),
            Self::Adult => Some(AgeCategory::Adult),
        }
    }
}

/// Full years between `date_of_birth` and `today`, counting the birthday itself.
#[must_use]
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> u32 {
    if today < date_of_birth {
        return 0;
    }

    let mut years = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        years -= 1;
    }

    u32::try_from(years).unwrap_or(0)
}

#[must_use]
pub fn classify(
    date_of_birth: NaiveDate,
    today: NaiveDate,
    minimum_age: u32,
    age_of_majority: u32,
) -> AgeBracket {
    let age = age_on(date_of_birth, today);
    if age < minimum_age {
        AgeBracket::BelowMinimum
    } else if age < age_of_majority {
        AgeBracket::Minor
    } else {
        AgeBracket::Adult
    }
}

/// Parses a `YYYY-MM-DD` date of birth and rejects future dates.
pub fn parse_date_of_birth(raw: &str, today: NaiveDate) -> Result<NaiveDate, String> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| "Invalid date format, expected YYYY-MM-DD".to_string())?;

    if date > today {
        return Err("Date of birth cannot be in the future".to_string());
    }

    Ok(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_counts_birthday() {
        let dob = date(2008, 10, 16);
        assert_eq!(age_on(dob, date(2026, 10, 15)), 17);
        assert_eq!(age_on(dob, date(2026, 10, 16)), 18);
        assert_eq!(age_on(dob, date(2026, 10, 17)), 18);
    }

    #[test]
    fn test_leap_day_birthday() {
        let dob = date(2008, 2, 29);
        assert_eq!(age_on(dob, date(2026, 2, 28)), 17);
        assert_eq!(age_on(dob, date(2026, 3, 1)), 18);
    }

    #[test]
    fn test_classify() {
        let today = date(2026, 10, 16);
        assert_eq!(classify(date(2015, 1, 1), today, 13, 18), AgeBracket::BelowMinimum);
        assert_eq!(classify(date(2013, 10, 16), today, 13, 18), AgeBracket::Minor);
        assert_eq!(classify(date(2008, 10, 17), today, 13, 18), AgeBracket::Minor);
        assert_eq!(classify(date(2008, 10, 16), today, 13, 18), AgeBracket::Adult);
        assert_eq!(AgeBracket::BelowMinimum.category(), None);
    }

    #[test]
    fn test_parse_date_of_birth() {
        let today = date(2026, 10, 16);
        assert_eq!(parse_date_of_birth("2010-05-01", today), Ok(date(2010, 5, 1)));
        assert!(parse_date_of_birth("2030-01-01", today).is_err());
        assert!(parse_date_of_birth("05/01/2010", today).is_err());
        assert!(parse_date_of_birth("2010-02-30", today).is_err());
    }
}
