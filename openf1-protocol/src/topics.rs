//! Broker topics organized by category

use std::fmt;
use std::str::FromStr;

use crate::types::ProtocolError;

/// Topic categories for organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicCategory {
    /// High-frequency car samples (car data, on-track location)
    Telemetry,
    /// Timing and running order
    Timing,
    /// Pit stops and tyre stints
    Strategy,
    /// Session, meeting and entry list metadata
    Session,
    /// Flags, messages and team radio
    RaceControl,
    /// Track weather samples
    Environment,
}

impl TopicCategory {
    /// Get all topic categories
    pub fn all() -> Vec<TopicCategory> {
        vec![
            TopicCategory::Telemetry,
            TopicCategory::Timing,
            TopicCategory::Strategy,
            TopicCategory::Session,
            TopicCategory::RaceControl,
            TopicCategory::Environment,
        ]
    }

    /// Get topics for this category
    pub fn topics(&self) -> Vec<Topic> {
        Topic::all()
            .into_iter()
            .filter(|topic| topic.category() == *self)
            .collect()
    }
}

/// A topic published by the OpenF1 live broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    CarData,
    Drivers,
    Intervals,
    Laps,
    Location,
    Meetings,
    Overtakes,
    Pit,
    Position,
    RaceControl,
    Sessions,
    Stints,
    TeamRadio,
    Weather,
}

impl Topic {
    /// The topic carrying car telemetry samples
    pub const TELEMETRY: Topic = Topic::CarData;

    /// Get every topic of the live feed
    pub fn all() -> Vec<Topic> {
        vec![
            Topic::CarData,
            Topic::Drivers,
            Topic::Intervals,
            Topic::Laps,
            Topic::Location,
            Topic::Meetings,
            Topic::Overtakes,
            Topic::Pit,
            Topic::Position,
            Topic::RaceControl,
            Topic::Sessions,
            Topic::Stints,
            Topic::TeamRadio,
            Topic::Weather,
        ]
    }

    /// Convert to the broker's topic name
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::CarData => "v1/car_data",
            Topic::Drivers => "v1/drivers",
            Topic::Intervals => "v1/intervals",
            Topic::Laps => "v1/laps",
            Topic::Location => "v1/location",
            Topic::Meetings => "v1/meetings",
            Topic::Overtakes => "v1/overtakes",
            Topic::Pit => "v1/pit",
            Topic::Position => "v1/position",
            Topic::RaceControl => "v1/race_control",
            Topic::Sessions => "v1/sessions",
            Topic::Stints => "v1/stints",
            Topic::TeamRadio => "v1/team_radio",
            Topic::Weather => "v1/weather",
        }
    }

    pub fn category(&self) -> TopicCategory {
        match self {
            Topic::CarData | Topic::Location => TopicCategory::Telemetry,
            Topic::Intervals | Topic::Laps | Topic::Position | Topic::Overtakes => {
                TopicCategory::Timing
            }
            Topic::Pit | Topic::Stints => TopicCategory::Strategy,
            Topic::Drivers | Topic::Meetings | Topic::Sessions => TopicCategory::Session,
            Topic::RaceControl | Topic::TeamRadio => TopicCategory::RaceControl,
            Topic::Weather => TopicCategory::Environment,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = ProtocolError;

    /// Exact match against the broker namespace; no trimming or case folding.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::all()
            .into_iter()
            .find(|topic| topic.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownTopic(s.to_string()))
    }
}

/// Get all topic names of the live feed
pub fn get_all_topic_names() -> Vec<&'static str> {
    Topic::all().iter().map(Topic::as_str).collect()
}

/// Get topic by name
pub fn get_topic_by_name(name: &str) -> Option<Topic> {
    name.parse().ok()
}
