//! The fixed topic list, subscribed in one batched request

use log::info;
use openf1_protocol::Topic;
use rumqttc::{AsyncClient, QoS, SubAck, SubscribeFilter, SubscribeReasonCode};

use crate::error::SubscribeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSet {
    topics: Vec<String>,
    qos: QoS,
}

impl SubscriptionSet {
    pub fn new<I, S>(topics: I, qos: QoS) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topics: topics.into_iter().map(Into::into).collect(),
            qos,
        }
    }

    /// Every OpenF1 live topic at QoS 0
    pub fn openf1() -> Self {
        Self::new(Topic::all().iter().map(Topic::as_str), QoS::AtMostOnce)
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn qos(&self) -> QoS {
        self.qos
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.iter().any(|t| t == topic)
    }

    pub fn filters(&self) -> Vec<SubscribeFilter> {
        self.topics
            .iter()
            .map(|topic| SubscribeFilter::new(topic.clone(), self.qos))
            .collect()
    }

    /// Queue a single SUBSCRIBE covering every topic
    pub async fn request(&self, client: &AsyncClient) -> Result<(), SubscribeError> {
        if self.is_empty() {
            return Err(SubscribeError::Empty);
        }

        client.subscribe_many(self.filters()).await?;
        info!(
            "📡 Requested {} topic subscriptions at {:?}",
            self.len(),
            self.qos
        );
        Ok(())
    }

    /// Map failure return codes of a SUBACK back to topic names
    pub fn check_ack(&self, ack: &SubAck) -> Result<(), SubscribeError> {
        let rejected: Vec<String> = ack
            .return_codes
            .iter()
            .zip(&self.topics)
            .filter(|(code, _)| matches!(code, SubscribeReasonCode::Failure))
            .map(|(_, topic)| topic.clone())
            .collect();

        if rejected.is_empty() {
            Ok(())
        } else {
            Err(SubscribeError::Rejected { topics: rejected })
        }
    }
}

impl Default for SubscriptionSet {
    fn default() -> Self {
        Self::openf1()
    }
}
