//! Colours and palette generators.

use folioscope_core::Regime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque RGB colour; serialised as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const GREY: Rgb = Rgb(160, 160, 160);
    pub const LIGHT_GREY: Rgb = Rgb(220, 220, 220);
    pub const ORANGE: Rgb = Rgb(255, 165, 0);
    pub const CORAL: Rgb = Rgb(255, 127, 80);
    pub const RED: Rgb = Rgb(214, 39, 40);

    /// Linear blend towards `other`; `t = 0` is `self`.
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| format!("colour must start with '#': '{s}'"))?;
        if hex.len() != 6 {
            return Err(format!("colour must be #rrggbb: '{s}'"));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| format!("bad hex colour '{s}'"))
        };
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

/// Ten-colour categorical cycle.
const CATEGORICAL: [Rgb; 10] = [
    Rgb(31, 119, 180),
    Rgb(255, 127, 14),
    Rgb(44, 160, 44),
    Rgb(214, 39, 40),
    Rgb(148, 103, 189),
    Rgb(140, 86, 75),
    Rgb(227, 119, 194),
    Rgb(127, 127, 127),
    Rgb(188, 189, 34),
    Rgb(23, 190, 207),
];

/// Sequential ramp sampled when more than ten colours are needed.
const RAMP: [Rgb; 5] = [
    Rgb(68, 1, 84),
    Rgb(59, 82, 139),
    Rgb(33, 145, 140),
    Rgb(94, 201, 98),
    Rgb(253, 231, 37),
];

fn sample(stops: &[Rgb], t: f64) -> Rgb {
    let t = t.clamp(0.0, 1.0) * (stops.len() - 1) as f64;
    let lo = t.floor() as usize;
    let hi = (lo + 1).min(stops.len() - 1);
    stops[lo].lerp(stops[hi], t - lo as f64)
}

/// `n` visually distinct colours.
pub fn n_colors(n: usize) -> Vec<Rgb> {
    if n <= CATEGORICAL.len() {
        return CATEGORICAL[..n].to_vec();
    }
    (0..n)
        .map(|i| sample(&RAMP, i as f64 / (n - 1) as f64))
        .collect()
}

const NEGATIVE: Rgb = Rgb(215, 48, 39);
const NEUTRAL: Rgb = Rgb(255, 255, 191);
const POSITIVE: Rgb = Rgb(26, 152, 80);

/// Diverging red/yellow/green colour per value, scaled by the largest
/// absolute value so zero always maps to the neutral midpoint. `NaN` is grey.
pub fn heatmap_colors(values: &[f64]) -> Vec<Rgb> {
    let scale = values
        .iter()
        .filter(|v| v.is_finite())
        .fold(0.0_f64, |m, v| m.max(v.abs()));
    values
        .iter()
        .map(|v| {
            if !v.is_finite() {
                Rgb::LIGHT_GREY
            } else if scale == 0.0 {
                NEUTRAL
            } else if *v < 0.0 {
                NEUTRAL.lerp(NEGATIVE, v.abs() / scale)
            } else {
                NEUTRAL.lerp(POSITIVE, v / scale)
            }
        })
        .collect()
}

/// Background shade of a benchmark regime.
pub fn regime_color(regime: Regime) -> Rgb {
    match regime {
        Regime::Bear => Rgb(255, 160, 160),
        Regime::Normal => Rgb(255, 255, 224),
        Regime::Bull => Rgb(160, 220, 160),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let c: Rgb = "#1f77b4".parse().unwrap();
        assert_eq!(c, Rgb(31, 119, 180));
        assert_eq!(c.to_string(), "#1f77b4");
        assert!("1f77b4".parse::<Rgb>().is_err());
        assert!("#1f77".parse::<Rgb>().is_err());
    }

    #[test]
    fn palette_has_requested_size() {
        assert_eq!(n_colors(0).len(), 0);
        assert_eq!(n_colors(3), CATEGORICAL[..3].to_vec());
        let many = n_colors(25);
        assert_eq!(many.len(), 25);
        assert_eq!(many[0], RAMP[0]);
        assert_eq!(many[24], RAMP[4]);
    }

    #[test]
    fn heatmap_is_centred_on_zero() {
        let colors = heatmap_colors(&[-2.0, 0.0, 2.0, f64::NAN]);
        assert_eq!(colors[0], NEGATIVE);
        assert_eq!(colors[1], NEUTRAL);
        assert_eq!(colors[2], POSITIVE);
        assert_eq!(colors[3], Rgb::LIGHT_GREY);
    }
}
