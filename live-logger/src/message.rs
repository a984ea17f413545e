//! Inbound message and its log line

use std::borrow::Cow;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use openf1_protocol::Topic;

/// One inbound PUBLISH, consumed exactly once by the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Bytes,
    pub received_at: DateTime<Utc>,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            received_at: Utc::now(),
        }
    }

    /// Payload as text, invalid UTF-8 replaced
    pub fn payload_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    /// `[<topic>] <payload>\n`, embedded newlines are written as-is
    pub fn log_line(&self) -> String {
        format!("[{}] {}\n", self.topic, self.payload_text())
    }

    /// The known topic this message arrived on, if any
    pub fn known_topic(&self) -> Option<Topic> {
        self.topic.parse().ok()
    }
}

impl From<rumqttc::Publish> for Message {
    fn from(publish: rumqttc::Publish) -> Self {
        Self::new(publish.topic, publish.payload)
    }
}
