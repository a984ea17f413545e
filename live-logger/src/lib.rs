//! OpenF1 live logger
//!
//! Connects to the OpenF1 MQTT broker, subscribes to the live topics and
//! writes each message to stdout and to an append-only log file.
//!
//! The pieces are wired by [`LifecycleController`]:
//!
//! - [`ConnectionManager`] owns the rumqttc client and event loop
//! - [`SubscriptionSet`] is the fixed topic list, subscribed in one request
//! - [`MessageSink`] formats, prints, appends and optionally decodes
//! - [`LogFile`] is the shared append-only file handle

pub mod config;
pub mod connection;
pub mod error;
pub mod lifecycle;
pub mod log_file;
pub mod message;
pub mod sink;
pub mod subscription;

// Re-export commonly used types
pub use config::{Args, BrokerAddress, SubscriberConfig};
pub use connection::{ConnectionEvents, ConnectionManager, DispatchHandle, LoggingEvents};
pub use error::{ConfigError, ConnectionError, LifecycleError, SubscribeError, SubscriberError};
pub use lifecycle::{
    shutdown_signal, Lifecycle, LifecycleController, LifecycleState, RunReport,
};
pub use log_file::LogFile;
pub use message::Message;
pub use sink::{Delivery, MessageSink, SinkStats};
pub use subscription::SubscriptionSet;

pub use openf1_protocol as protocol;
