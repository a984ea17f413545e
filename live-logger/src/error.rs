//! Error types
//!
//! Startup failures are fatal and typed per stage, so a caller can tell a
//! rejected login from a broker that is simply unreachable.

use std::path::PathBuf;

use rumqttc::{ClientError, ConnectReturnCode};

use crate::lifecycle::LifecycleState;

/// Invalid command line or environment configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid broker address '{address}': {reason}")]
    InvalidBrokerAddress { address: String, reason: String },

    #[error("Invalid configuration value: {0}")]
    Value(String),
}

impl ConfigError {
    pub(crate) fn broker(address: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidBrokerAddress {
            address: address.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failures while establishing the initial broker connection
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Transient transport failure (DNS, TCP, TLS)
    #[error("Network connection failed: {0}")]
    Network(#[from] rumqttc::ConnectionError),

    /// Permanent failure, typically bad credentials
    #[error("Broker rejected connection: {code:?}")]
    Rejected { code: ConnectReturnCode },

    #[error("Connection establishment timed out after {timeout_millis}ms")]
    Timeout { timeout_millis: u64 },
}

/// Failures of the batched subscribe request
#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    #[error("No topics to subscribe to")]
    Empty,

    #[error("Subscribe request failed: {0}")]
    Request(#[from] ClientError),

    #[error("Broker rejected subscription for: {}", topics.join(", "))]
    Rejected { topics: Vec<String> },

    #[error("Connection failed while waiting for subscription acknowledgement: {0}")]
    Network(#[source] rumqttc::ConnectionError),

    #[error("Subscription acknowledgement timed out after {timeout_millis}ms")]
    Timeout { timeout_millis: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Invalid lifecycle transition: {from} -> {to}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },
}

/// Fatal errors of a subscriber run
#[derive(Debug, thiserror::Error)]
pub enum SubscriberError {
    #[error("Failed to open log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to connect: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Failed to subscribe: {0}")]
    Subscribe(#[from] SubscribeError),

    #[error("Message sink task failed: {0}")]
    SinkTask(#[source] tokio::task::JoinError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}
