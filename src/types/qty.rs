//! Fixed-Point Asset Quantities
//!
//! Counterparty assets are either divisible (8 decimal places) or
//! indivisible (whole units). Quantities are held as a fixed-point
//! integer in 1e-8 subunits so equality checks never go through floats,
//! and serialized as a decimal string.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Subunits per whole asset unit
pub const SUBUNITS: u64 = 100_000_000;

/// An asset quantity in 1e-8 subunits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AssetQty(u64);

impl AssetQty {
    /// Construct from raw subunits
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Construct from whole units
    pub fn from_units(units: u64) -> Self {
        Self(units * SUBUNITS)
    }

    /// Raw subunit count
    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Whether the quantity is an integral number of units
    ///
    /// Indivisible assets must satisfy this.
    pub fn is_whole(&self) -> bool {
        self.0 % SUBUNITS == 0
    }

    /// Whole-unit count, valid only when `is_whole`
    pub fn whole_units(&self) -> u64 {
        self.0 / SUBUNITS
    }
}

impl fmt::Display for AssetQty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units = self.0 / SUBUNITS;
        let frac = self.0 % SUBUNITS;
        if frac == 0 {
            write!(f, "{units}")
        } else {
            let frac_str = format!("{frac:08}");
            write!(f, "{}.{}", units, frac_str.trim_end_matches('0'))
        }
    }
}

impl FromStr for AssetQty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty quantity".to_string());
        }

        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };

        if frac_part.len() > 8 {
            return Err(format!("more than 8 decimal places: {s}"));
        }

        let units: u64 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| format!("invalid quantity: {s}"))?
        };

        let frac: u64 = if frac_part.is_empty() {
            0
        } else {
            let padded = format!("{frac_part:0<8}");
            padded
                .parse()
                .map_err(|_| format!("invalid quantity: {s}"))?
        };

        units
            .checked_mul(SUBUNITS)
            .and_then(|u| u.checked_add(frac))
            .map(AssetQty)
            .ok_or_else(|| format!("quantity out of range: {s}"))
    }
}

impl Serialize for AssetQty {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AssetQty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(QtyVisitor)
    }
}

struct QtyVisitor;

impl<'de> Visitor<'de> for QtyVisitor {
    type Value = AssetQty;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal string or number with at most 8 decimal places")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(de::Error::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        v.checked_mul(SUBUNITS)
            .map(AssetQty)
            .ok_or_else(|| de::Error::custom(format!("quantity out of range: {v}")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        if v < 0 {
            return Err(de::Error::custom("quantity must be non-negative"));
        }
        self.visit_u64(v as u64)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        if !v.is_finite() || v < 0.0 {
            return Err(de::Error::custom("quantity must be a non-negative number"));
        }
        // Format at 8 decimals and reparse so float noise cannot leak in
        format!("{v:.8}").parse().map_err(de::Error::custom)
    }
}
