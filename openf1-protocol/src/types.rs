//! Record shapes carried by the live feed
//!
//! Every record is flat and every field is optional on the wire: a missing
//! field decodes to its default, so partial samples are still usable. A
//! field sent as `null` decodes the same way, except for the `Option` fields
//! where `null` carries meaning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Common error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),
}

/// Explicit `null` decodes like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Gap to another car: either seconds or a lap-down marker such as `"+1 LAP"`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Gap {
    Seconds(f64),
    Laps(String),
}

impl Gap {
    /// Seconds behind, if the gap is time based
    pub fn seconds(&self) -> Option<f64> {
        match self {
            Gap::Seconds(secs) => Some(*secs),
            Gap::Laps(_) => None,
        }
    }
}

/// Car telemetry sample (speed, RPM, gear, pedals, DRS)
///
/// Topic: `v1/car_data`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CarData {
    pub date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_default")]
    pub driver_number: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub rpm: u32,
    /// km/h
    #[serde(deserialize_with = "null_as_default")]
    pub speed: u32,
    /// 0 = neutral
    #[serde(deserialize_with = "null_as_default")]
    pub n_gear: u8,
    /// Percent, occasionally reported above 100
    #[serde(deserialize_with = "null_as_default")]
    pub throttle: u8,
    #[serde(deserialize_with = "null_as_default")]
    pub brake: u8,
    /// Raw DRS status code (0-14)
    #[serde(deserialize_with = "null_as_default")]
    pub drs: u8,
    #[serde(deserialize_with = "null_as_default")]
    pub session_key: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_key: u32,
}

impl CarData {
    /// DRS codes 10, 12 and 14 mean the flap is open
    pub fn drs_open(&self) -> bool {
        matches!(self.drs, 10 | 12 | 14)
    }
}

/// Driver entry for a session
///
/// Topic: `v1/drivers`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Driver {
    #[serde(deserialize_with = "null_as_default")]
    pub driver_number: u32,
    /// e.g. "L HAMILTON"
    #[serde(deserialize_with = "null_as_default")]
    pub broadcast_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub full_name: String,
    /// e.g. "HAM"
    #[serde(deserialize_with = "null_as_default")]
    pub name_acronym: String,
    pub team_name: Option<String>,
    /// Hex colour without the leading '#'
    pub team_colour: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub headshot_url: Option<String>,
    pub country_code: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub session_key: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_key: u32,
}

/// Live gap between cars
///
/// Topic: `v1/intervals`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Interval {
    pub date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_default")]
    pub driver_number: u32,
    pub gap_to_leader: Option<Gap>,
    /// Gap to the car ahead
    pub interval: Option<Gap>,
    #[serde(deserialize_with = "null_as_default")]
    pub session_key: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_key: u32,
}

/// Lap timing
///
/// Topic: `v1/laps`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Lap {
    pub date_start: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_default")]
    pub driver_number: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub lap_number: u32,
    /// Seconds
    pub lap_duration: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub is_pit_out_lap: bool,
    pub duration_sector_1: Option<f64>,
    pub duration_sector_2: Option<f64>,
    pub duration_sector_3: Option<f64>,
    /// Mini-sector colour codes
    #[serde(deserialize_with = "null_as_default")]
    pub segments_sector_1: Vec<Option<u32>>,
    #[serde(deserialize_with = "null_as_default")]
    pub segments_sector_2: Vec<Option<u32>>,
    #[serde(deserialize_with = "null_as_default")]
    pub segments_sector_3: Vec<Option<u32>>,
    pub i1_speed: Option<u32>,
    pub i2_speed: Option<u32>,
    /// Speed trap
    pub st_speed: Option<u32>,
    #[serde(deserialize_with = "null_as_default")]
    pub session_key: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_key: u32,
}

/// Car coordinates on track
///
/// Topic: `v1/location`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Location {
    pub date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_default")]
    pub driver_number: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub x: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub y: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub z: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub session_key: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_key: u32,
}

/// Race weekend
///
/// Topic: `v1/meetings`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Meeting {
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_key: u32,
    /// e.g. "Bahrain Grand Prix"
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_official_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(deserialize_with = "null_as_default")]
    pub country_key: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub country_code: String,
    #[serde(deserialize_with = "null_as_default")]
    pub country_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub circuit_key: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub circuit_short_name: String,
    pub date_start: Option<DateTime<Utc>>,
    /// e.g. "03:00:00"
    #[serde(deserialize_with = "null_as_default")]
    pub gmt_offset: String,
    #[serde(deserialize_with = "null_as_default")]
    pub year: u16,
}

/// One car passing another
///
/// Topic: `v1/overtakes`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Overtake {
    pub date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_default")]
    pub overtaking_driver_number: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub overtaken_driver_number: u32,
    /// Position gained by the overtaking driver
    #[serde(deserialize_with = "null_as_default")]
    pub position: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub session_key: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_key: u32,
}

/// Pit stop
///
/// Topic: `v1/pit`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Pit {
    pub date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_default")]
    pub driver_number: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub lap_number: u32,
    /// Seconds spent in the pit lane
    pub pit_duration: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub session_key: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_key: u32,
}

/// Running position
///
/// Topic: `v1/position`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Position {
    pub date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_default")]
    pub driver_number: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub position: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub session_key: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_key: u32,
}

/// Flag or race control message
///
/// Topic: `v1/race_control`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RaceControl {
    pub date: Option<DateTime<Utc>>,
    pub lap_number: Option<u32>,
    /// "Flag", "SafetyCar", "Drs", "Other"
    #[serde(deserialize_with = "null_as_default")]
    pub category: String,
    /// "GREEN", "YELLOW", "DOUBLE YELLOW", "RED", ...
    pub flag: Option<String>,
    /// "Track", "Sector", "Driver"
    pub scope: Option<String>,
    pub sector: Option<u32>,
    #[serde(deserialize_with = "null_as_default")]
    pub message: String,
    pub driver_number: Option<u32>,
    #[serde(deserialize_with = "null_as_default")]
    pub session_key: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_key: u32,
}

/// A session of a meeting (practice, qualifying, race)
///
/// Topic: `v1/sessions`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Session {
    #[serde(deserialize_with = "null_as_default")]
    pub session_key: u32,
    /// "Practice 1", "Race"
    #[serde(deserialize_with = "null_as_default")]
    pub session_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub session_type: String,
    pub date_start: Option<DateTime<Utc>>,
    pub date_end: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_default")]
    pub gmt_offset: String,
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_key: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(deserialize_with = "null_as_default")]
    pub country_key: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub country_code: String,
    #[serde(deserialize_with = "null_as_default")]
    pub country_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub circuit_key: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub circuit_short_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub year: u16,
}

/// Tyre stint
///
/// Topic: `v1/stints`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Stint {
    #[serde(deserialize_with = "null_as_default")]
    pub stint_number: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub driver_number: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub lap_start: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub lap_end: u32,
    /// "SOFT", "MEDIUM", "HARD", "INTERMEDIATE", "WET"
    pub compound: Option<String>,
    /// Laps already on the tyre when fitted
    pub tyre_age_at_start: Option<u32>,
    #[serde(deserialize_with = "null_as_default")]
    pub session_key: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_key: u32,
}

/// Team radio clip
///
/// Topic: `v1/team_radio`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TeamRadio {
    pub date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_default")]
    pub driver_number: u32,
    /// Link to the .mp3 recording
    #[serde(deserialize_with = "null_as_default")]
    pub recording_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub session_key: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_key: u32,
}

/// Track weather sample
///
/// Topic: `v1/weather`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Weather {
    pub date: Option<DateTime<Utc>>,
    /// Celsius
    #[serde(deserialize_with = "null_as_default")]
    pub air_temperature: f64,
    /// Celsius
    #[serde(deserialize_with = "null_as_default")]
    pub track_temperature: f64,
    /// Percent
    #[serde(deserialize_with = "null_as_default")]
    pub humidity: f64,
    /// mbar
    #[serde(deserialize_with = "null_as_default")]
    pub pressure: f64,
    /// 0 = dry, 1 = rain
    #[serde(deserialize_with = "null_as_default")]
    pub rainfall: u8,
    /// Degrees
    #[serde(deserialize_with = "null_as_default")]
    pub wind_direction: u16,
    /// m/s
    #[serde(deserialize_with = "null_as_default")]
    pub wind_speed: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub session_key: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub meeting_key: u32,
}

impl Weather {
    pub fn is_raining(&self) -> bool {
        self.rainfall > 0
    }
}
