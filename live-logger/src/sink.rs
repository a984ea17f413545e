//! Message sink
//!
//! Every message is handled in the same order: format the line, print it,
//! append it to the log file, then decode it when its topic is one of the
//! decode topics. Append and decode failures are logged and skipped.

use std::collections::{BTreeMap, HashSet};
use std::io::Write;

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use openf1_protocol::{decode, TelemetryRecord, Topic};
use tokio::sync::mpsc;

use crate::log_file::LogFile;
use crate::message::Message;

/// Counters kept for the shutdown summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Messages handled per topic name
    pub delivered: BTreeMap<String, u64>,
    pub append_failures: u64,
    pub decoded: u64,
    pub decode_failures: u64,
    /// Receive time of the most recent message
    pub last_received: Option<DateTime<Utc>>,
}

impl SinkStats {
    pub fn total(&self) -> u64 {
        self.delivered.values().sum()
    }
}

/// Outcome of handling one message
#[derive(Debug)]
pub struct Delivery {
    /// The exact line printed and appended
    pub line: String,
    /// Decoded record, only for decode topics that parsed
    pub record: Option<TelemetryRecord>,
}

pub struct MessageSink<W: Write> {
    console: W,
    log: LogFile,
    decode_topics: HashSet<Topic>,
    stats: SinkStats,
}

impl<W: Write> MessageSink<W> {
    pub fn new(console: W, log: LogFile, decode_topics: impl IntoIterator<Item = Topic>) -> Self {
        Self {
            console,
            log,
            decode_topics: decode_topics.into_iter().collect(),
            stats: SinkStats::default(),
        }
    }

    pub fn stats(&self) -> &SinkStats {
        &self.stats
    }

    pub fn into_console(self) -> W {
        self.console
    }

    /// Handle one message
    pub async fn handle(&mut self, message: &Message) -> Delivery {
        let line = message.log_line();
        *self
            .stats
            .delivered
            .entry(message.topic.clone())
            .or_default() += 1;
        self.stats.last_received = Some(message.received_at);

        // Best effort, a closed stdout must not stop logging to file
        let _ = self
            .console
            .write_all(line.as_bytes())
            .and_then(|()| self.console.flush());

        if let Err(e) = self.log.append(&line).await {
            self.stats.append_failures += 1;
            error!(
                "❌ Failed to append to log file {}: {}",
                self.log.path().display(),
                e
            );
        }

        let record = self.decode_if_wanted(message);
        Delivery { line, record }
    }

    fn decode_if_wanted(&mut self, message: &Message) -> Option<TelemetryRecord> {
        let topic = message
            .known_topic()
            .filter(|topic| self.decode_topics.contains(topic))?;

        match decode(topic, &message.payload) {
            Ok(record) => {
                self.stats.decoded += 1;
                debug!("Decoded {} record: {:?}", topic, record);
                Some(record)
            }
            Err(e) => {
                self.stats.decode_failures += 1;
                error!("❌ {}", e);
                None
            }
        }
    }

    /// Drain `messages` until every sender is gone, then flush the log file
    ///
    /// Decoded records are dropped here; nothing consumes them yet.
    pub async fn run(mut self, mut messages: mpsc::Receiver<Message>) -> Self {
        while let Some(message) = messages.recv().await {
            let _ = self.handle(&message).await;
        }

        if let Err(e) = self.log.flush().await {
            error!(
                "❌ Failed to flush log file {}: {}",
                self.log.path().display(),
                e
            );
        }
        info!("📝 Message sink drained ({} messages)", self.stats.total());
        self
    }
}
