//! Canonical order book snapshot and the normalizer that produces it.
//!
//! [`normalize`] turns either raw record shape into a [`Snapshot`] whose
//! sides are ordered best level first:
//! - canonical `bids`/`asks` arrays are passed through as they are (no re-sort)
//! - flattened `Bid{i}`/`Ask{i}` fields are paired with their sizes, levels with
//!   a missing half are skipped, then bids are sorted descending and asks
//!   ascending by price
//!
//! The size helpers on [`Snapshot`] and [`bar_ratio`] back the depth bars of
//! the ladder view.
use serde::{Deserialize, Serialize};

use crate::record::RawSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderLevel {
    /// Price level.
    pub price: f64,
    /// Resting size at that price.
    pub size: f64,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Snapshot {
    /// Timestamp key of the source record.
    pub time: String,
    /// Buy side, best price at index 0.
    pub bids: Vec<OrderLevel>, // index 0 = best bid
    /// Sell side, best price at index 0.
    pub asks: Vec<OrderLevel>, // index 0 = best ask
}

impl Snapshot {
    /// Largest bid size, 0 for an empty side.
    pub fn max_bid_size(&self) -> f64 {
        max_size(&self.bids)
    }

    /// Largest ask size, 0 for an empty side.
    pub fn max_ask_size(&self) -> f64 {
        max_size(&self.asks)
    }

    pub fn best_bid(&self) -> Option<&OrderLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&OrderLevel> {
        self.asks.first()
    }

    /// Best ask minus best bid when both sides are populated.
    pub fn spread(&self) -> Option<f64> {
        Some(self.best_ask()?.price - self.best_bid()?.price)
    }
}

fn max_size(levels: &[OrderLevel]) -> f64 {
    levels.iter().map(|l| l.size).fold(0.0, f64::max)
}

/// Fraction of the full bar a level of `size` occupies, in `[0, 1]`.
///
/// A side whose largest size is 0 renders every bar empty instead of
/// dividing by zero.
pub fn bar_ratio(size: f64, max_size: f64) -> f64 {
    if max_size <= 0.0 || !max_size.is_finite() {
        return 0.0;
    }
    (size / max_size).clamp(0.0, 1.0)
}

/// Produce the canonical snapshot for a raw record. Never fails; missing
/// fields only shorten the sides.
pub fn normalize(raw: &RawSnapshot) -> Snapshot {
    match raw {
        RawSnapshot::Canonical { time, bids, asks } => Snapshot {
            time: time.clone(),
            bids: bids.clone(),
            asks: asks.clone(),
        },
        RawSnapshot::Legacy { time, levels } => {
            let mut bids = paired(&levels.bid, &levels.bid_size);
            let mut asks = paired(&levels.ask, &levels.ask_size);
            bids.sort_by(|a, b| b.price.total_cmp(&a.price));
            asks.sort_by(|a, b| a.price.total_cmp(&b.price));
            Snapshot { time: time.clone(), bids, asks }
        }
    }
}

/// Levels whose price and size are both defined, in scan order.
fn paired(prices: &[Option<f64>], sizes: &[Option<f64>]) -> Vec<OrderLevel> {
    prices
        .iter()
        .zip(sizes)
        .filter_map(|(price, size)| Some(OrderLevel { price: (*price)?, size: (*size)? }))
        .collect()
}
