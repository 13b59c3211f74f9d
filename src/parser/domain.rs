//! Telemetry domain types and the attribute decoder.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One decoded telemetry sample from a station.
///
/// A reading is always fully populated: attributes that are absent from the
/// wire or fail to parse fall back to the field's default instead of failing
/// the decode. The timestamp is the wall-clock instant the reading was
/// decoded; it is not read from the wire.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Numeric id of the emitting station (`id` attribute, 0 if missing).
    pub station_id: i64,
    /// Display name of the station (`name` attribute, empty if missing).
    pub station_name: String,
    /// Battery level. Reserved: no wire attribute maps to it yet.
    pub battery: i32,
    /// Relative humidity in percent (`humidity` attribute).
    pub humidity: f32,
    /// Temperature in degrees Celsius (`temperature` attribute).
    pub temperature: f32,
    /// Air pressure in hPa (`pressure` attribute).
    pub pressure: f32,
    /// Instant this reading was decoded.
    pub timestamp: OffsetDateTime,
}

impl Reading {
    /// Creates an all-default reading stamped with the current time.
    pub fn new() -> Self {
        Reading {
            station_id: 0,
            station_name: String::new(),
            battery: 0,
            humidity: 0.0,
            temperature: 0.0,
            pressure: 0.0,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Builds a reading from a tokenized attribute map.
    ///
    /// This never fails: each recognized attribute is decoded on its own and
    /// an unparsable value leaves the field at its default. Unknown
    /// attributes are ignored.
    pub fn from_attrs(attrs: &HashMap<String, String>) -> Self {
        let mut reading = Reading::new();
        if let Some(id) = attrs.get("id") {
            if let Ok(id) = id.parse() {
                reading.station_id = id;
            }
        }
        if let Some(name) = attrs.get("name") {
            reading.station_name = name.clone();
        }
        reading.humidity = float_or_default(attrs.get("humidity"));
        reading.pressure = float_or_default(attrs.get("pressure"));
        reading.temperature = float_or_default(attrs.get("temperature"));
        reading
    }

    /// The station identity this reading belongs to.
    pub fn station(&self) -> Station {
        Station {
            id: self.station_id,
            name: self.station_name.clone(),
        }
    }
}

impl Default for Reading {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.station_name.is_empty() {
            write!(f, "{} ", self.station_name)?;
        }
        write!(
            f,
            "({}) {} deg C, {} % rel {} hPa",
            self.station_id, self.temperature, self.humidity, self.pressure
        )
    }
}

/// Parses a float from the trimmed value, falling back to 0.0.
///
/// Any parse failure, including a missing value, resolves to the default;
/// decoding a reading must not fail on a single bad field.
fn float_or_default(value: Option<&String>) -> f32 {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or_default()
}

/// An identified remote sensor source.
///
/// Station identity is the numeric id alone: equality and hashing ignore the
/// display name, which stations are free to change between transmissions.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct Station {
    /// Numeric station id.
    pub id: i64,
    /// Human-readable station name.
    pub name: String,
}

impl PartialEq for Station {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Station {}

impl Hash for Station {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
