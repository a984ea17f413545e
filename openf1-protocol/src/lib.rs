//! OpenF1 Protocol
//!
//! This crate provides the shared definitions for the OpenF1 live telemetry
//! feed: the fixed topic set published by the broker and the flat record
//! shapes carried in each topic's JSON payload.
//!
//! # Features
//!
//! - **Topic Set**: every broker topic defined in one place, grouped by category
//! - **Typed Records**: one `serde` struct per topic, tolerant of partial payloads
//! - **Decoding**: `decode` turns a raw payload into a [`TelemetryRecord`]
//!
//! # Example
//!
//! ```rust
//! use openf1_protocol::{decode, TelemetryRecord, Topic};
//!
//! let payload = br#"{"driver_number":44,"rpm":11000,"speed":310}"#;
//! let record = decode(Topic::CarData, payload).unwrap();
//!
//! if let TelemetryRecord::CarData(car) = record {
//!     assert_eq!(car.driver_number, 44);
//! }
//! ```

pub mod decode;
pub mod protocol;
pub mod topics;
pub mod types;

// Re-export commonly used types
pub use decode::{decode, decode_topic, DecodeError, TelemetryRecord};
pub use protocol::*;
pub use topics::{Topic, TopicCategory};
pub use types::*;

pub use serde_json;
