//! The reporting pipeline: group pours by beverage, convert the totals
//! into the selected display unit, and shorten names for chart axes.
//!
//! Everything here is pure and synchronous; the caller re-runs the
//! pipeline whenever the pour set or the display parameters change. A
//! later snapshot fully replaces the previous summary, nothing is
//! merged incrementally.

use crate::model::{Pour, Rounding, Unit};

use serde::Serialize;
use std::collections::HashMap;

/// Milliliters in one fluid ounce.
pub const OUNCE_ML: f64 = 29.5735;
/// Ounces in one serving glass (6 oz = 177.441 ml).
pub const GLASS_OUNCES: f64 = 6.0;
/// Milliliters in one bottle.
pub const BOTTLE_ML: f64 = 750.0;

/// Running totals for one beverage over the selected window.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupTotal {
    pub name: String,
    /// Total volume poured, in ounces.
    pub ounces: f64,
    /// Total charged, in cents.
    pub price: i64,
    /// Number of pours.
    pub count: usize,
}

/// Groups pours by exact beverage name and sums volume, price, and count.
///
/// Groups appear in the order their name first occurs in the input, so a
/// feed ordered newest-first yields the most recently poured beverage
/// first. An empty name is a legitimate (if oddly labeled) group.
pub fn aggregate(pours: &[Pour]) -> Vec<GroupTotal> {
    let mut totals = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for pour in pours {
        let at = *index.entry(pour.beverage.as_str()).or_insert_with(|| {
            totals.push(GroupTotal { name: pour.beverage.clone(), ounces: 0.0, price: 0, count: 0 });
            totals.len() - 1
        });
        let total = &mut totals[at];
        total.ounces += pour.ounces_poured;
        total.price += i64::from(pour.price);
        total.count += 1;
    }
    totals
}

fn round_to(value: f64, rounding: Rounding) -> f64 {
    match rounding {
        Rounding::Whole => value.round(),
        Rounding::OneDecimal => (value * 10.0).round() / 10.0,
        Rounding::TwoDecimals => (value * 100.0).round() / 100.0,
    }
}

/// Converts a volume in ounces to the selected display unit.
///
/// Ounces pass through untouched; every other unit is a fixed multiply
/// followed by the process-wide rounding policy.
pub fn convert(ounces: f64, unit: Unit, rounding: Rounding) -> f64 {
    match unit {
        Unit::Ounces => ounces,
        Unit::Milliliters => round_to(ounces * OUNCE_ML, rounding),
        Unit::Glasses => round_to(ounces / GLASS_OUNCES, rounding),
        Unit::Bottles => round_to(ounces * OUNCE_ML / BOTTLE_ML, rounding),
    }
}

/// Shortens a beverage name for chart axis labels: keeps only words made
/// entirely of ASCII alphanumerics, truncated to their first three
/// characters. Words with punctuation are dropped outright.
pub fn shorten(label: &str) -> String {
    let mut out = String::new();
    for word in label.split(' ') {
        if word.is_empty() || !word.chars().all(|c| c.is_ascii_alphanumeric()) {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.extend(word.chars().take(3));
    }
    out
}

/// One beverage's line in a [`Summary`]: the group totals with the
/// volume converted and the chart label precomputed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Entry {
    pub name: String,
    pub label: String,
    /// Total volume in the summary's unit.
    pub poured: f64,
    /// Total charged, in cents.
    pub price: i64,
    pub count: usize,
}

/// Everything the reports screen renders for one window and unit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub unit: Unit,
    /// Grand total poured, summed in the display unit.
    pub poured: f64,
    /// Grand total charged, in cents.
    pub money: i64,
    pub totals: Vec<Entry>,
}

/// Runs the full pipeline over a snapshot of pours. An empty snapshot
/// yields zeroed totals, never an error.
pub fn summarize(pours: &[Pour], unit: Unit, rounding: Rounding) -> Summary {
    let mut poured = 0.0;
    let mut money = 0;
    let totals = aggregate(pours)
        .into_iter()
        .map(|total| {
            let volume = convert(total.ounces, unit, rounding);
            poured += volume;
            money += total.price;
            Entry { label: shorten(&total.name), name: total.name, poured: volume, price: total.price, count: total.count }
        })
        .collect();
    Summary { unit, poured, money, totals }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use nanorand::{Rng, WyRand};

    fn pour(beverage: &str, ounces: f64, price: i32) -> Pour {
        Pour {
            glass_id: String::new(),
            keg: "red".into(),
            beverage: beverage.into(),
            ounces_poured: ounces,
            ounces_remaining: 0.0,
            pour_type: "full".into(),
            price,
            created: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
        }
    }

    #[test]
    fn aggregate_groups_in_first_seen_order() {
        let pours = [pour("IPA", 12.0, 500), pour("IPA", 6.0, 250), pour("Stout", 16.0, 600)];
        let totals = aggregate(&pours);
        assert_eq!(
            totals,
            [
                GroupTotal { name: "IPA".into(), ounces: 18.0, price: 750, count: 2 },
                GroupTotal { name: "Stout".into(), ounces: 16.0, price: 600, count: 1 },
            ]
        );
    }

    #[test]
    fn aggregate_of_nothing_is_nothing() {
        assert!(aggregate(&[]).is_empty());
    }

    #[test]
    fn aggregate_keeps_unnamed_pours() {
        let totals = aggregate(&[pour("", 4.5, 300)]);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].name, "");
        assert_eq!(totals[0].count, 1);
    }

    #[test]
    fn aggregate_conserves_volume_and_count() {
        let mut rng = WyRand::new();
        let names = ["Pinot Noir", "Merlot", "Riesling", ""];
        let pours: Vec<_> = (0..200)
            .map(|_| {
                let name = names[rng.generate_range(0..names.len())];
                pour(name, f64::from(rng.generate_range(0_u32..640)) / 10.0, 350)
            })
            .collect();

        let totals = aggregate(&pours);
        let volume: f64 = totals.iter().map(|t| t.ounces).sum();
        let poured: f64 = pours.iter().map(|p| p.ounces_poured).sum();
        assert!((volume - poured).abs() < 1e-9);
        assert_eq!(totals.iter().map(|t| t.count).sum::<usize>(), pours.len());
        assert_eq!(totals.iter().map(|t| t.price).sum::<i64>(), 350 * pours.len() as i64);
    }

    #[test]
    fn aggregate_is_idempotent() {
        let pours = [pour("Stout", 16.0, 600), pour("IPA", 12.0, 500)];
        assert_eq!(aggregate(&pours), aggregate(&pours));
    }

    #[test]
    fn zero_converts_to_zero_in_every_unit() {
        for unit in [Unit::Ounces, Unit::Milliliters, Unit::Glasses, Unit::Bottles] {
            assert_eq!(convert(0.0, unit, Rounding::default()), 0.0);
        }
    }

    #[test]
    fn conversion_fixed_points() {
        // 1 oz = 29.5735 ml, 1 glass = 6 oz, 1 bottle = 750 ml.
        assert_eq!(convert(1.0, Unit::Ounces, Rounding::default()), 1.0);
        assert!((convert(1.0, Unit::Milliliters, Rounding::TwoDecimals) - 29.57).abs() < 1e-9);
        assert_eq!(convert(6.0, Unit::Glasses, Rounding::default()), 1.0);
        let bottle_oz = BOTTLE_ML / OUNCE_ML;
        assert_eq!(convert(bottle_oz, Unit::Bottles, Rounding::default()), 1.0);
    }

    #[test]
    fn rounding_policies() {
        assert_eq!(convert(1.0, Unit::Milliliters, Rounding::Whole), 30.0);
        assert_eq!(convert(1.0, Unit::Milliliters, Rounding::OneDecimal), 29.6);
        assert_eq!(convert(1.0, Unit::Milliliters, Rounding::TwoDecimals), 29.57);
        assert_eq!(convert(7.0, Unit::Glasses, Rounding::Whole), 1.0);
        assert_eq!(convert(7.0, Unit::Glasses, Rounding::TwoDecimals), 1.17);
    }

    #[test]
    fn shorten_truncates_and_drops_punctuated_words() {
        assert_eq!(shorten("Pinot Noir 2019"), "Pin Noi 201");
        assert_eq!(shorten("A&W Cream!"), "");
        assert_eq!(shorten(""), "");
        assert_eq!(shorten("IPA"), "IPA");
    }

    #[test]
    fn shorten_never_leaves_stray_whitespace() {
        // Empty tokens from leading, trailing, or doubled spaces must not
        // smuggle separators into the output.
        assert_eq!(shorten("Pinot Noir "), "Pin Noi");
        assert_eq!(shorten(" Pinot Noir"), "Pin Noi");
        assert_eq!(shorten("Pinot  Noir"), "Pin Noi");
        assert_eq!(shorten("   "), "");
    }

    #[test]
    fn summarize_rolls_up_converted_totals() {
        let pours = [pour("IPA", 12.0, 500), pour("IPA", 6.0, 250), pour("Stout", 16.0, 600)];
        let summary = summarize(&pours, Unit::Glasses, Rounding::TwoDecimals);
        assert_eq!(summary.money, 1350);
        assert_eq!(summary.totals.len(), 2);
        assert_eq!(summary.totals[0].poured, 3.0); // 18 oz
        assert_eq!(summary.totals[1].poured, 2.67); // 16 oz
        assert!((summary.poured - 5.67).abs() < 1e-9);
        assert_eq!(summary.totals[1].label, "Sto");
    }

    #[test]
    fn summarize_nothing_is_all_zeroes() {
        let summary = summarize(&[], Unit::Bottles, Rounding::default());
        assert_eq!(summary.poured, 0.0);
        assert_eq!(summary.money, 0);
        assert!(summary.totals.is_empty());
    }
}
