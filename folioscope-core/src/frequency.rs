//! Calendar frequencies used for resampling and annualisation.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sampling frequency, written the pandas way in configs (`"D"`, `"B"`,
/// `"W-WED"`, `"M"`, `"Q"`, `"A"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Frequency {
    Daily,
    BusinessDaily,
    Weekly(Weekday),
    MonthEnd,
    QuarterEnd,
    YearEnd,
}

impl Frequency {
    /// Label of the period containing `date`: the first date on or after
    /// `date` that lies on this frequency's grid.
    pub fn period_end(self, date: NaiveDate) -> NaiveDate {
        match self {
            Frequency::Daily => date,
            Frequency::BusinessDaily => match date.weekday() {
                Weekday::Sat => date + Duration::days(2),
                Weekday::Sun => date + Duration::days(1),
                _ => date,
            },
            Frequency::Weekly(anchor) => {
                let ahead = (7 + anchor.num_days_from_monday() as i64
                    - date.weekday().num_days_from_monday() as i64)
                    % 7;
                date + Duration::days(ahead)
            }
            Frequency::MonthEnd => month_end(date.year(), date.month()),
            Frequency::QuarterEnd => {
                let q_month = ((date.month() - 1) / 3 + 1) * 3;
                month_end(date.year(), q_month)
            }
            Frequency::YearEnd => month_end(date.year(), 12),
        }
    }

    /// Regular grid of period ends from the first grid date on or after
    /// `start` up to and including `end`.
    pub fn grid(self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut out = Vec::new();
        let mut current = self.period_end(start);
        while current <= end {
            out.push(current);
            current = self.period_end(current + Duration::days(1));
        }
        out
    }

    /// Observations per year used to annualise statistics.
    pub fn periods_per_year(self) -> f64 {
        match self {
            Frequency::Daily => 365.0,
            Frequency::BusinessDaily => 260.0,
            Frequency::Weekly(_) => 52.0,
            Frequency::MonthEnd => 12.0,
            Frequency::QuarterEnd => 4.0,
            Frequency::YearEnd => 1.0,
        }
    }

    /// Short human label used in chart titles.
    pub fn describe(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::BusinessDaily => "business-daily",
            Frequency::Weekly(_) => "weekly",
            Frequency::MonthEnd => "monthly",
            Frequency::QuarterEnd => "quarterly",
            Frequency::YearEnd => "annual",
        }
    }
}

fn month_end(year: i32, month: u32) -> NaiveDate {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    // The first of a valid month always exists.
    NaiveDate::from_ymd_opt(ny, nm, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

fn weekday_code(w: Weekday) -> &'static str {
    match w {
        Weekday::Mon => "MON",
        Weekday::Tue => "TUE",
        Weekday::Wed => "WED",
        Weekday::Thu => "THU",
        Weekday::Fri => "FRI",
        Weekday::Sat => "SAT",
        Weekday::Sun => "SUN",
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "D"),
            Frequency::BusinessDaily => write!(f, "B"),
            Frequency::Weekly(w) => write!(f, "W-{}", weekday_code(*w)),
            Frequency::MonthEnd => write!(f, "M"),
            Frequency::QuarterEnd => write!(f, "Q"),
            Frequency::YearEnd => write!(f, "A"),
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        match upper.as_str() {
            "D" => Ok(Frequency::Daily),
            "B" => Ok(Frequency::BusinessDaily),
            "W" => Ok(Frequency::Weekly(Weekday::Sun)),
            "M" | "ME" => Ok(Frequency::MonthEnd),
            "Q" | "QE" => Ok(Frequency::QuarterEnd),
            "A" | "Y" | "YE" => Ok(Frequency::YearEnd),
            other => {
                let day = other
                    .strip_prefix("W-")
                    .ok_or_else(|| format!("unknown frequency '{s}'"))?;
                let weekday = match day {
                    "MON" => Weekday::Mon,
                    "TUE" => Weekday::Tue,
                    "WED" => Weekday::Wed,
                    "THU" => Weekday::Thu,
                    "FRI" => Weekday::Fri,
                    "SAT" => Weekday::Sat,
                    "SUN" => Weekday::Sun,
                    _ => return Err(format!("unknown weekly anchor '{day}'")),
                };
                Ok(Frequency::Weekly(weekday))
            }
        }
    }
}

impl TryFrom<String> for Frequency {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Frequency> for String {
    fn from(value: Frequency) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn parses_pandas_codes() {
        assert_eq!("W-WED".parse::<Frequency>().unwrap(), Frequency::Weekly(Weekday::Wed));
        assert_eq!("m".parse::<Frequency>().unwrap(), Frequency::MonthEnd);
        assert_eq!("A".parse::<Frequency>().unwrap(), Frequency::YearEnd);
        assert!("W-XYZ".parse::<Frequency>().is_err());
        assert_eq!(Frequency::Weekly(Weekday::Wed).to_string(), "W-WED");
    }

    #[test]
    fn period_end_anchors() {
        // 2024-01-01 is a Monday.
        assert_eq!(Frequency::Weekly(Weekday::Wed).period_end(d("2024-01-01")), d("2024-01-03"));
        assert_eq!(Frequency::Weekly(Weekday::Wed).period_end(d("2024-01-03")), d("2024-01-03"));
        assert_eq!(Frequency::MonthEnd.period_end(d("2024-02-10")), d("2024-02-29"));
        assert_eq!(Frequency::QuarterEnd.period_end(d("2024-11-10")), d("2024-12-31"));
        assert_eq!(Frequency::BusinessDaily.period_end(d("2024-01-06")), d("2024-01-08"));
    }

    #[test]
    fn grid_is_inclusive_of_end() {
        let g = Frequency::MonthEnd.grid(d("2024-01-15"), d("2024-03-31"));
        assert_eq!(g, vec![d("2024-01-31"), d("2024-02-29"), d("2024-03-31")]);
    }
}
