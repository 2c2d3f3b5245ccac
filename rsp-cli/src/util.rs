use std::str::FromStr;

use color_eyre::eyre::{
    bail,
    eyre,
};
use serde::Deserialize;

use crate::Error;

/// A frequency in Hz.
///
/// Parses from a number with an optional `k`, `M` or `G` suffix, e.g. `100M`
/// or `2.048M`, rounded to whole Hz.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(try_from = "FrequencyRepr")]
pub struct Frequency(pub f64);

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let (number, multiplier) = match s.char_indices().last() {
            Some((i, 'k' | 'K')) => (&s[..i], 1e3),
            Some((i, 'M')) => (&s[..i], 1e6),
            Some((i, 'G' | 'g')) => (&s[..i], 1e9),
            _ => (s, 1.0),
        };

        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| eyre!("Invalid frequency: {s}"))?;

        Self::from_hz(value * multiplier)
    }
}

impl Frequency {
    /// Rejects negative and non-finite values and rounds to whole Hz.
    pub fn from_hz(hz: f64) -> Result<Self, Error> {
        if !hz.is_finite() || hz < 0.0 {
            bail!("Invalid frequency: {hz}");
        }
        Ok(Self(hz.round()))
    }
}

/// Profiles may give frequencies as plain numbers or as strings with a
/// suffix.
#[derive(Deserialize)]
#[serde(untagged)]
enum FrequencyRepr {
    Number(f64),
    Text(String),
}

impl TryFrom<FrequencyRepr> for Frequency {
    type Error = Error;

    fn try_from(value: FrequencyRepr) -> Result<Self, Self::Error> {
        match value {
            FrequencyRepr::Number(hz) => Self::from_hz(hz),
            FrequencyRepr::Text(s) => s.parse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> f64 {
        s.parse::<Frequency>().unwrap().0
    }

    #[test]
    fn suffixes() {
        assert_eq!(parse("2400000"), 2.4e6);
        assert_eq!(parse("7k"), 7e3);
        assert_eq!(parse("100M"), 100e6);
        assert_eq!(parse("1.2G"), 1.2e9);
        assert_eq!(parse(" 1.5 M "), 1.5e6);
    }

    #[test]
    fn rounds_to_hz() {
        assert_eq!(parse("2.048M"), 2_048_000.0);
        assert_eq!(parse("100.005M"), 100_005_000.0);
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<Frequency>().is_err());
        assert!("M".parse::<Frequency>().is_err());
        assert!("12x".parse::<Frequency>().is_err());
        assert!("-5k".parse::<Frequency>().is_err());
        assert!("inf".parse::<Frequency>().is_err());
    }
}
