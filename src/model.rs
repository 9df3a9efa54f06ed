use chrono::{serde::ts_milliseconds, DateTime, Duration, Utc};
use core::{fmt, str::FromStr};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unit of measurement selected for displaying poured volumes.
///
/// Pours are always stored in ounces; see [`crate::report::convert`]
/// for the conversion constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Ounces,
    Milliliters,
    Glasses,
    Bottles,
}

/// A unit string that names none of the four [`Unit`] variants.
#[derive(Debug)]
pub struct InvalidUnit(Box<str>);

impl fmt::Display for InvalidUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown unit of measurement: {}", self.0)
    }
}

impl std::error::Error for InvalidUnit {}

impl FromStr for Unit {
    type Err = InvalidUnit;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ounces" => Self::Ounces,
            "milliliters" => Self::Milliliters,
            "glasses" => Self::Glasses,
            "bottles" => Self::Bottles,
            other => return Err(InvalidUnit(other.into())),
        })
    }
}

/// Rounding policy applied to converted volumes. One policy for the
/// whole process, chosen at startup via the `ROUNDING` environment
/// variable rather than forked per call site.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rounding {
    Whole,
    OneDecimal,
    #[default]
    TwoDecimals,
}

#[derive(Debug)]
pub struct InvalidRounding(Box<str>);

impl fmt::Display for InvalidRounding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown rounding policy: {}", self.0)
    }
}

impl std::error::Error for InvalidRounding {}

impl FromStr for Rounding {
    type Err = InvalidRounding;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "whole" => Self::Whole,
            "one-decimal" => Self::OneDecimal,
            "two-decimals" => Self::TwoDecimals,
            other => return Err(InvalidRounding(other.into())),
        })
    }
}

/// The reporting time windows offered by the dashboard, in hours.
/// From one hour up to six months.
pub const WINDOW_HOURS: [u32; 12] = [1, 2, 4, 8, 12, 24, 48, 168, 336, 730, 2190, 4380];

/// A validated sliding time window `[now - hours, now]` over the pour log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    hours: u32,
}

impl Window {
    /// Validates the hour count against [`WINDOW_HOURS`].
    pub fn from_hours(hours: u32) -> Option<Self> {
        WINDOW_HOURS.contains(&hours).then_some(Self { hours })
    }

    pub fn hours(&self) -> u32 {
        self.hours
    }

    /// Start of the window as of this instant.
    pub fn since(&self) -> DateTime<Utc> {
        Utc::now() - Duration::hours(i64::from(self.hours))
    }
}

impl Default for Window {
    fn default() -> Self {
        Self { hours: 12 }
    }
}

/// One recorded pour: a dispenser served `ounces_poured` of `beverage`
/// from tap `keg` into glass `glass_id` for `price` cents. Append-only;
/// reports select pours by a sliding time window over `created`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pour {
    pub glass_id: String,
    pub keg: String,
    /// Beverage name at pour time; the grouping key for reports.
    pub beverage: String,
    pub ounces_poured: f64,
    /// Level left in the keg as tracked by the dispenser.
    pub ounces_remaining: f64,
    /// "small" or "full", per the keg's configured pour sizes.
    pub pour_type: String,
    /// Price charged in cents.
    pub price: i32,
    #[serde(with = "ts_milliseconds")]
    pub created: DateTime<Utc>,
}

/// Device-facing form of [`Pour`]: the dispenser does not supply a
/// timestamp, the database stamps `now()` on insert.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PourReport {
    pub glass_id: String,
    pub keg: String,
    pub beverage: String,
    pub ounces_poured: f64,
    pub ounces_remaining: f64,
    pub pour_type: String,
    pub price: i32,
}

impl PourReport {
    /// Attaches a timestamp, yielding the stored form.
    pub fn recorded_at(self, created: DateTime<Utc>) -> Pour {
        let Self { glass_id, keg, beverage, ounces_poured, ounces_remaining, pour_type, price } = self;
        Pour { glass_id, keg, beverage, ounces_poured, ounces_remaining, pour_type, price, created }
    }
}

/// A registered beverage. `id` is absent until first saved.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Beverage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub tasting_notes: String,
}

/// One tap inside a barrel: which beverage it serves, how much is left,
/// and the two configured pour sizes with their prices in cents.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Keg {
    /// Tap identifier within the barrel, e.g. "red", "green", "blue".
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beverage: Option<Uuid>,
    pub ounces: f64,
    pub small_price: i32,
    pub small_ounces: f64,
    pub full_price: i32,
    pub full_ounces: f64,
}

/// Latest temperature reported by a barrel's sensor.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct Temperature {
    pub fahrenheit: f64,
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// A dispensing barrel and its keg configuration.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Barrel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Temperature>,
    pub kegs: Vec<Keg>,
}

/// Temperature report sent by a barrel's onboard sensor.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct TemperatureReport {
    pub barrel: Uuid,
    pub fahrenheit: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_parses_the_four_display_units() {
        assert_eq!("ounces".parse::<Unit>().unwrap(), Unit::Ounces);
        assert_eq!("milliliters".parse::<Unit>().unwrap(), Unit::Milliliters);
        assert_eq!("glasses".parse::<Unit>().unwrap(), Unit::Glasses);
        assert_eq!("bottles".parse::<Unit>().unwrap(), Unit::Bottles);
    }

    #[test]
    fn unknown_unit_is_an_error_not_a_fallback() {
        let err = "pints".parse::<Unit>().unwrap_err();
        assert_eq!(err.to_string(), "unknown unit of measurement: pints");
        assert!("Glasses".parse::<Unit>().is_err()); // case-sensitive
        assert!("".parse::<Unit>().is_err());
    }

    #[test]
    fn rounding_parses_policies_and_rejects_the_rest() {
        assert_eq!("whole".parse::<Rounding>().unwrap(), Rounding::Whole);
        assert_eq!("one-decimal".parse::<Rounding>().unwrap(), Rounding::OneDecimal);
        assert_eq!("two-decimals".parse::<Rounding>().unwrap(), Rounding::TwoDecimals);
        assert_eq!(Rounding::default(), Rounding::TwoDecimals);

        let err = "banker".parse::<Rounding>().unwrap_err();
        assert_eq!(err.to_string(), "unknown rounding policy: banker");
    }

    #[test]
    fn window_only_admits_the_offered_hour_counts() {
        for hours in WINDOW_HOURS {
            assert_eq!(Window::from_hours(hours).map(|w| w.hours()), Some(hours));
        }
        assert_eq!(Window::from_hours(0), None);
        assert_eq!(Window::from_hours(3), None);
        assert_eq!(Window::from_hours(8760), None);
        assert_eq!(Window::default(), Window::from_hours(12).unwrap());
    }
}
