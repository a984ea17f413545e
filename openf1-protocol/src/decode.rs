//! Payload decoding into typed records

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::topics::Topic;
use crate::types::*;

/// A decoded record, one variant per topic
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryRecord {
    CarData(CarData),
    Driver(Driver),
    Interval(Interval),
    Lap(Lap),
    Location(Location),
    Meeting(Meeting),
    Overtake(Overtake),
    Pit(Pit),
    Position(Position),
    RaceControl(RaceControl),
    Session(Session),
    Stint(Stint),
    TeamRadio(TeamRadio),
    Weather(Weather),
}

impl TelemetryRecord {
    /// Topic this record is published on
    pub fn topic(&self) -> Topic {
        match self {
            TelemetryRecord::CarData(_) => Topic::CarData,
            TelemetryRecord::Driver(_) => Topic::Drivers,
            TelemetryRecord::Interval(_) => Topic::Intervals,
            TelemetryRecord::Lap(_) => Topic::Laps,
            TelemetryRecord::Location(_) => Topic::Location,
            TelemetryRecord::Meeting(_) => Topic::Meetings,
            TelemetryRecord::Overtake(_) => Topic::Overtakes,
            TelemetryRecord::Pit(_) => Topic::Pit,
            TelemetryRecord::Position(_) => Topic::Position,
            TelemetryRecord::RaceControl(_) => Topic::RaceControl,
            TelemetryRecord::Session(_) => Topic::Sessions,
            TelemetryRecord::Stint(_) => Topic::Stints,
            TelemetryRecord::TeamRadio(_) => Topic::TeamRadio,
            TelemetryRecord::Weather(_) => Topic::Weather,
        }
    }

    /// Driver the record refers to, when it refers to a single one
    pub fn driver_number(&self) -> Option<u32> {
        match self {
            TelemetryRecord::CarData(r) => Some(r.driver_number),
            TelemetryRecord::Driver(r) => Some(r.driver_number),
            TelemetryRecord::Interval(r) => Some(r.driver_number),
            TelemetryRecord::Lap(r) => Some(r.driver_number),
            TelemetryRecord::Location(r) => Some(r.driver_number),
            TelemetryRecord::Overtake(r) => Some(r.overtaking_driver_number),
            TelemetryRecord::Pit(r) => Some(r.driver_number),
            TelemetryRecord::Position(r) => Some(r.driver_number),
            TelemetryRecord::RaceControl(r) => r.driver_number,
            TelemetryRecord::Stint(r) => Some(r.driver_number),
            TelemetryRecord::TeamRadio(r) => Some(r.driver_number),
            TelemetryRecord::Meeting(_)
            | TelemetryRecord::Session(_)
            | TelemetryRecord::Weather(_) => None,
        }
    }
}

/// Decoding errors
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),
    #[error("Malformed {topic} payload: {source}")]
    Malformed {
        topic: Topic,
        #[source]
        source: serde_json::Error,
    },
}

fn parse<T: DeserializeOwned>(topic: Topic, payload: &[u8]) -> Result<T, DecodeError> {
    serde_json::from_slice(payload).map_err(|source| DecodeError::Malformed { topic, source })
}

/// Decode a payload published on `topic` into its record type
pub fn decode(topic: Topic, payload: &[u8]) -> Result<TelemetryRecord, DecodeError> {
    let record = match topic {
        Topic::CarData => TelemetryRecord::CarData(parse(topic, payload)?),
        Topic::Drivers => TelemetryRecord::Driver(parse(topic, payload)?),
        Topic::Intervals => TelemetryRecord::Interval(parse(topic, payload)?),
        Topic::Laps => TelemetryRecord::Lap(parse(topic, payload)?),
        Topic::Location => TelemetryRecord::Location(parse(topic, payload)?),
        Topic::Meetings => TelemetryRecord::Meeting(parse(topic, payload)?),
        Topic::Overtakes => TelemetryRecord::Overtake(parse(topic, payload)?),
        Topic::Pit => TelemetryRecord::Pit(parse(topic, payload)?),
        Topic::Position => TelemetryRecord::Position(parse(topic, payload)?),
        Topic::RaceControl => TelemetryRecord::RaceControl(parse(topic, payload)?),
        Topic::Sessions => TelemetryRecord::Session(parse(topic, payload)?),
        Topic::Stints => TelemetryRecord::Stint(parse(topic, payload)?),
        Topic::TeamRadio => TelemetryRecord::TeamRadio(parse(topic, payload)?),
        Topic::Weather => TelemetryRecord::Weather(parse(topic, payload)?),
    };
    Ok(record)
}

/// Decode a payload given the raw topic name from the broker
pub fn decode_topic(name: &str, payload: &[u8]) -> Result<TelemetryRecord, DecodeError> {
    let topic = name
        .parse::<Topic>()
        .map_err(|_| DecodeError::UnknownTopic(name.to_string()))?;
    decode(topic, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_partial_car_data() {
        let payload = br#"{"driver_number":44,"rpm":11000,"speed":310}"#;
        let record = decode(Topic::CarData, payload).unwrap();

        match record {
            TelemetryRecord::CarData(car) => {
                assert_eq!(car.driver_number, 44);
                assert_eq!(car.rpm, 11000);
                assert_eq!(car.speed, 310);
                assert_eq!(car.n_gear, 0);
                assert!(car.date.is_none());
            }
            other => panic!("unexpected record: {:?}", other),
        }
    }

    #[test]
    fn test_decode_full_car_data() {
        let payload = br#"{
            "brake": 0, "date": "2023-09-16T13:08:19.923000+00:00",
            "driver_number": 55, "drs": 12, "meeting_key": 1219,
            "n_gear": 8, "rpm": 11141, "session_key": 9159,
            "speed": 315, "throttle": 99
        }"#;
        let record = decode(Topic::CarData, payload).unwrap();

        let TelemetryRecord::CarData(car) = record else {
            panic!("expected car data");
        };
        assert_eq!(car.session_key, 9159);
        assert!(car.drs_open());
        assert_eq!(
            car.date.unwrap().to_rfc3339(),
            "2023-09-16T13:08:19.923+00:00"
        );
    }

    #[test]
    fn test_decode_malformed_payload() {
        let err = decode(Topic::CarData, b"not json").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { topic: Topic::CarData, .. }));

        let err = decode(Topic::CarData, br#"{"rpm":"fast"}"#).unwrap_err();
        assert!(err.to_string().starts_with("Malformed v1/car_data payload"));
    }

    #[test]
    fn test_decode_interval_gaps() {
        let payload = br#"{"driver_number":1,"gap_to_leader":null,"interval":null}"#;
        let TelemetryRecord::Interval(leader) = decode(Topic::Intervals, payload).unwrap() else {
            panic!("expected interval");
        };
        assert!(leader.gap_to_leader.is_none());

        let payload = br#"{"driver_number":2,"gap_to_leader":"+1 LAP","interval":1.513}"#;
        let TelemetryRecord::Interval(lapped) = decode(Topic::Intervals, payload).unwrap() else {
            panic!("expected interval");
        };
        assert_eq!(lapped.gap_to_leader, Some(Gap::Laps("+1 LAP".to_string())));
        assert_eq!(lapped.interval.and_then(|g| g.seconds()), Some(1.513));
    }

    #[test]
    fn test_decode_lap_with_null_segments() {
        let payload = br#"{
            "date_start": "2023-09-16T13:59:07.606000+00:00",
            "driver_number": 63, "duration_sector_1": 26.966,
            "duration_sector_2": 38.657, "duration_sector_3": 26.12,
            "i1_speed": 307, "i2_speed": 277, "is_pit_out_lap": false,
            "lap_duration": 91.743, "lap_number": 8, "meeting_key": 1219,
            "segments_sector_1": [2049, 2049, 2049, 2051, 2049, 2051, 2049, 2049],
            "segments_sector_2": [2049, 2049, 2049, 2049, 2049, 2049, 2049, null],
            "segments_sector_3": [2048, 2048, 2048, 2048, 2048, 2064, 2064, 2064],
            "session_key": 9161, "st_speed": 298
        }"#;
        let TelemetryRecord::Lap(lap) = decode(Topic::Laps, payload).unwrap() else {
            panic!("expected lap");
        };
        assert_eq!(lap.lap_number, 8);
        assert_eq!(lap.segments_sector_2.last(), Some(&None));
        assert_eq!(lap.st_speed, Some(298));
    }

    #[test]
    fn test_decode_race_control_track_flag() {
        let payload = br#"{
            "category": "Flag", "date": "2023-06-04T14:21:01+00:00",
            "driver_number": null, "flag": "GREEN", "lap_number": 1,
            "meeting_key": 1211, "message": "GREEN LIGHT - PIT EXIT OPEN",
            "scope": "Track", "sector": null, "session_key": 9102
        }"#;
        let record = decode(Topic::RaceControl, payload).unwrap();

        assert_eq!(record.topic(), Topic::RaceControl);
        assert_eq!(record.driver_number(), None);
        let TelemetryRecord::RaceControl(rc) = record else {
            panic!("expected race control");
        };
        assert_eq!(rc.flag.as_deref(), Some("GREEN"));
    }

    #[test]
    fn test_decode_weather_and_overtake() {
        let payload = br#"{"air_temperature":27.8,"humidity":58.0,"rainfall":1,
            "track_temperature":52.5,"wind_direction":136,"wind_speed":2.4}"#;
        let TelemetryRecord::Weather(weather) = decode(Topic::Weather, payload).unwrap() else {
            panic!("expected weather");
        };
        assert!(weather.is_raining());

        let payload = br#"{"overtaking_driver_number":16,"overtaken_driver_number":4,"position":3}"#;
        let record = decode(Topic::Overtakes, payload).unwrap();
        assert_eq!(record.driver_number(), Some(16));
    }

    #[test]
    fn test_decode_by_topic_name() {
        let record = decode_topic("v1/position", br#"{"driver_number":1,"position":1}"#).unwrap();
        assert_eq!(record.topic(), Topic::Position);

        assert!(matches!(
            decode_topic("v1/unknown", b"{}"),
            Err(DecodeError::UnknownTopic(name)) if name == "v1/unknown"
        ));
    }

    #[test]
    fn test_every_topic_accepts_empty_object() {
        for topic in Topic::all() {
            let record = decode(topic, b"{}").unwrap();
            assert_eq!(record.topic(), topic);
        }
    }

    #[test]
    fn test_null_fields_decode_as_defaults() {
        let payload = br#"{"driver_number":44,"rpm":11000,"speed":null}"#;
        let TelemetryRecord::CarData(car) = decode(Topic::CarData, payload).unwrap() else {
            panic!("expected car data");
        };
        assert_eq!(car.rpm, 11000);
        assert_eq!(car.speed, 0);

        let payload = br#"{"stint_number":2,"driver_number":1,"lap_start":20,
            "lap_end":null,"compound":null,"tyre_age_at_start":3}"#;
        let TelemetryRecord::Stint(stint) = decode(Topic::Stints, payload).unwrap() else {
            panic!("expected stint");
        };
        assert_eq!(stint.lap_start, 20);
        assert_eq!(stint.lap_end, 0);
        assert!(stint.compound.is_none());

        let payload = br#"{"driver_number":null,"lap_number":3,"is_pit_out_lap":null,
            "segments_sector_1":null,"lap_duration":null}"#;
        let TelemetryRecord::Lap(lap) = decode(Topic::Laps, payload).unwrap() else {
            panic!("expected lap");
        };
        assert_eq!(lap.driver_number, 0);
        assert!(!lap.is_pit_out_lap);
        assert!(lap.segments_sector_1.is_empty());

        let payload = br#"{"meeting_name":null,"year":2024}"#;
        let TelemetryRecord::Meeting(meeting) = decode(Topic::Meetings, payload).unwrap() else {
            panic!("expected meeting");
        };
        assert_eq!(meeting.meeting_name, "");
        assert_eq!(meeting.year, 2024);
    }
}
