//! Typed number formats for axis ticks, bar labels and legends.
//!
//! Configs keep the familiar `"{:.1%}"` / `"{:,.2f}"` spelling; the parsed
//! form is a closed enum so every chart formats values the same way.

use num_format::{Locale, ToFormattedString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NumFormat {
    /// Value times 100 with a `%` suffix.
    Percent { decimals: usize },
    /// Plain decimal, optionally with thousands separators.
    Fixed { decimals: usize, thousands: bool },
}

impl NumFormat {
    pub const fn percent(decimals: usize) -> Self {
        NumFormat::Percent { decimals }
    }

    pub const fn fixed(decimals: usize) -> Self {
        NumFormat::Fixed {
            decimals,
            thousands: false,
        }
    }

    pub const fn thousands(decimals: usize) -> Self {
        NumFormat::Fixed {
            decimals,
            thousands: true,
        }
    }

    pub fn format(&self, value: f64) -> String {
        if value.is_nan() {
            return "nan".to_string();
        }
        match *self {
            NumFormat::Percent { decimals } => format!("{:.*}%", decimals, value * 100.0),
            NumFormat::Fixed {
                decimals,
                thousands: false,
            } => format!("{:.*}", decimals, value),
            NumFormat::Fixed {
                decimals,
                thousands: true,
            } => group_thousands(value, decimals),
        }
    }
}

fn group_thousands(value: f64, decimals: usize) -> String {
    let plain = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (plain.as_str(), None),
    };
    let grouped = match int_part.parse::<u64>() {
        Ok(n) => n.to_formatted_string(&Locale::en),
        Err(_) => int_part.to_string(),
    };
    let sign = if value < 0.0 && plain.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

impl Default for NumFormat {
    fn default() -> Self {
        NumFormat::thousands(2)
    }
}

impl fmt::Display for NumFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumFormat::Percent { decimals } => write!(f, "{{:.{decimals}%}}"),
            NumFormat::Fixed {
                decimals,
                thousands: true,
            } => write!(f, "{{:,.{decimals}f}}"),
            NumFormat::Fixed {
                decimals,
                thousands: false,
            } => write!(f, "{{:.{decimals}f}}"),
        }
    }
}

impl FromStr for NumFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = s
            .trim()
            .strip_prefix("{:")
            .and_then(|r| r.strip_suffix('}'))
            .ok_or_else(|| format!("number format must look like '{{:.2f}}', got '{s}'"))?;
        let (thousands, spec) = match spec.strip_prefix(',') {
            Some(rest) => (true, rest),
            None => (false, spec),
        };
        let spec = spec
            .strip_prefix('.')
            .ok_or_else(|| format!("missing precision in '{s}'"))?;
        let kind = spec
            .chars()
            .last()
            .ok_or_else(|| format!("missing type in '{s}'"))?;
        let decimals: usize = spec[..spec.len() - kind.len_utf8()]
            .parse()
            .map_err(|_| format!("bad precision in '{s}'"))?;
        match kind {
            '%' => Ok(NumFormat::Percent { decimals }),
            'f' => Ok(NumFormat::Fixed {
                decimals,
                thousands,
            }),
            other => Err(format!("unsupported format type '{other}' in '{s}'")),
        }
    }
}

impl TryFrom<String> for NumFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NumFormat> for String {
    fn from(value: NumFormat) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_python_style_patterns() {
        assert_eq!("{:.1%}".parse::<NumFormat>().unwrap(), NumFormat::percent(1));
        assert_eq!("{:,.2f}".parse::<NumFormat>().unwrap(), NumFormat::thousands(2));
        assert_eq!("{:.0%}".parse::<NumFormat>().unwrap(), NumFormat::percent(0));
        assert_eq!("{:.2f}".parse::<NumFormat>().unwrap(), NumFormat::fixed(2));
        assert!("{:.2e}".parse::<NumFormat>().is_err());
        assert!("%.2f".parse::<NumFormat>().is_err());
    }

    #[test]
    fn formats_values() {
        assert_eq!(NumFormat::percent(1).format(0.1234), "12.3%");
        assert_eq!(NumFormat::percent(0).format(-0.5), "-50%");
        assert_eq!(NumFormat::thousands(2).format(1234567.891), "1,234,567.89");
        assert_eq!(NumFormat::thousands(0).format(-1500.0), "-1,500");
        assert_eq!(NumFormat::fixed(2).format(1.005e3), "1005.00");
        assert_eq!(NumFormat::percent(1).format(f64::NAN), "nan");
    }

    #[test]
    fn display_round_trips() {
        for f in [NumFormat::percent(2), NumFormat::thousands(1), NumFormat::fixed(3)] {
            assert_eq!(f.to_string().parse::<NumFormat>().unwrap(), f);
        }
    }
}
