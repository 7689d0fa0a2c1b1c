//! Raw snapshot records as they are read from a capture.
//!
//! A record is a JSON object keyed by `time` that carries either `bids`/`asks`
//! arrays or up to ten flattened `Bid{i}`/`Bid{i}Size`/`Ask{i}`/`Ask{i}Size`
//! fields. The shape is decided once, when the record is deserialized, and
//! carried from then on as a [`RawSnapshot`] variant.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::book::OrderLevel;

/// Number of paired price/size fields per side in the flattened layout.
pub const LEGACY_DEPTH: usize = 10;

/// Flattened per-level fields, index 0 holding `Bid1`/`Ask1`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyLevels {
    pub bid: [Option<f64>; LEGACY_DEPTH],
    pub bid_size: [Option<f64>; LEGACY_DEPTH],
    pub ask: [Option<f64>; LEGACY_DEPTH],
    pub ask_size: [Option<f64>; LEGACY_DEPTH],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireRecord", into = "WireRecord")]
pub enum RawSnapshot {
    /// `bids`/`asks` arrays, trusted to be ordered best level first.
    Canonical {
        time: String,
        bids: Vec<OrderLevel>,
        asks: Vec<OrderLevel>,
    },
    /// `Bid1..Bid10` style fields, in no particular price order.
    Legacy { time: String, levels: LegacyLevels },
}

impl RawSnapshot {
    pub fn time(&self) -> &str {
        match self {
            RawSnapshot::Canonical { time, .. } | RawSnapshot::Legacy { time, .. } => time,
        }
    }
}

/// On-the-wire form of one record.
#[derive(Debug, Serialize, Deserialize)]
struct WireRecord {
    time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bids: Option<Vec<OrderLevel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    asks: Option<Vec<OrderLevel>>,
    #[serde(flatten)]
    fields: HashMap<String, Value>,
}

/// Reading a legacy field: numbers and numeric strings are defined, anything
/// else (missing, `null`, text) is absent.
fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl TryFrom<WireRecord> for RawSnapshot {
    type Error = String;

    fn try_from(wire: WireRecord) -> Result<Self, Self::Error> {
        if wire.time.trim().is_empty() {
            return Err("record has an empty `time` field".to_string());
        }
        let has_levels = |side: &Option<Vec<OrderLevel>>| side.as_ref().is_some_and(|v| !v.is_empty());
        if has_levels(&wire.bids) || has_levels(&wire.asks) {
            return Ok(RawSnapshot::Canonical {
                time: wire.time,
                bids: wire.bids.unwrap_or_default(),
                asks: wire.asks.unwrap_or_default(),
            });
        }

        let mut levels = LegacyLevels::default();
        for i in 0..LEGACY_DEPTH {
            let n = i + 1;
            levels.bid[i] = number(wire.fields.get(&format!("Bid{n}")));
            levels.bid_size[i] = number(wire.fields.get(&format!("Bid{n}Size")));
            levels.ask[i] = number(wire.fields.get(&format!("Ask{n}")));
            levels.ask_size[i] = number(wire.fields.get(&format!("Ask{n}Size")));
        }
        Ok(RawSnapshot::Legacy { time: wire.time, levels })
    }
}

impl From<RawSnapshot> for WireRecord {
    fn from(raw: RawSnapshot) -> Self {
        match raw {
            RawSnapshot::Canonical { time, bids, asks } => WireRecord {
                time,
                bids: Some(bids),
                asks: Some(asks),
                fields: HashMap::new(),
            },
            RawSnapshot::Legacy { time, levels } => {
                let mut fields = HashMap::new();
                let mut put = |key: String, v: Option<f64>| {
                    if let Some(v) = v {
                        fields.insert(key, Value::from(v));
                    }
                };
                for i in 0..LEGACY_DEPTH {
                    let n = i + 1;
                    put(format!("Bid{n}"), levels.bid[i]);
                    put(format!("Bid{n}Size"), levels.bid_size[i]);
                    put(format!("Ask{n}"), levels.ask[i]);
                    put(format!("Ask{n}Size"), levels.ask_size[i]);
                }
                WireRecord { time, bids: None, asks: None, fields }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrays_select_canonical_shape() {
        let raw: RawSnapshot = serde_json::from_str(
            r#"{"time":"10:00:00","bids":[{"price":10.0,"size":1.0}],"asks":[],"Bid1":99}"#,
        )
        .unwrap();
        match raw {
            RawSnapshot::Canonical { time, bids, asks } => {
                assert_eq!(time, "10:00:00");
                assert_eq!(bids, vec![OrderLevel { price: 10.0, size: 1.0 }]);
                assert!(asks.is_empty());
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn flattened_fields_select_legacy_shape() {
        let raw: RawSnapshot = serde_json::from_str(
            r#"{"time":"10:00:01","Bid1":100.5,"Bid1Size":"3","Ask2":101,"Ask2Size":null,"Bid10":90,"Bid10Size":7}"#,
        )
        .unwrap();
        let RawSnapshot::Legacy { time, levels } = raw else { panic!("expected legacy shape") };
        assert_eq!(time, "10:00:01");
        assert_eq!(levels.bid[0], Some(100.5));
        assert_eq!(levels.bid_size[0], Some(3.0));
        assert_eq!(levels.ask[1], Some(101.0));
        assert_eq!(levels.ask_size[1], None);
        assert_eq!(levels.bid[9], Some(90.0));
        assert_eq!(levels.bid_size[9], Some(7.0));
    }

    #[test]
    fn empty_arrays_fall_back_to_legacy_fields() {
        let raw: RawSnapshot =
            serde_json::from_str(r#"{"time":"t","bids":[],"asks":[],"Ask1":5,"Ask1Size":1}"#).unwrap();
        let RawSnapshot::Legacy { levels, .. } = raw else { panic!("expected legacy shape") };
        assert_eq!(levels.ask[0], Some(5.0));
    }

    #[test]
    fn empty_or_missing_time_is_rejected() {
        assert!(serde_json::from_str::<RawSnapshot>(r#"{"time":""}"#).is_err());
        assert!(serde_json::from_str::<RawSnapshot>(r#"{"Bid1":1}"#).is_err());
    }

    #[test]
    fn legacy_record_serializes_only_defined_fields() {
        let mut levels = LegacyLevels::default();
        levels.bid[0] = Some(1.5);
        levels.bid_size[0] = Some(2.0);
        let raw = RawSnapshot::Legacy { time: "t".into(), levels };
        let json: Value = serde_json::to_value(&raw).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(obj["Bid1"], Value::from(1.5));
        assert!(!obj.contains_key("bids"));
    }
}
