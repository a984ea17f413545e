//! MQTT connection management
//!
//! [`ConnectionManager`] establishes the single broker connection and runs
//! the startup handshake (CONNACK, then SUBACK). Once startup succeeds the
//! event loop moves into a dispatch task that pushes every inbound PUBLISH
//! into a bounded channel; [`DispatchHandle`] owns that task and performs
//! the orderly disconnect.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use rumqttc::{AsyncClient, ConnAck, ConnectReturnCode, Event, EventLoop, Outgoing, Packet};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::config::SubscriberConfig;
use crate::error::{ConnectionError, SubscribeError};
use crate::message::Message;
use crate::subscription::SubscriptionSet;

/// Capacity of the request queue between `AsyncClient` and the event loop
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// Connection lifecycle callbacks
pub trait ConnectionEvents: Send + Sync + 'static {
    /// Called for every CONNACK, including the ones after a reconnect
    fn on_connected(&self, ack: &ConnAck) {
        info!(
            "✅ Connected to MQTT broker (session present: {})",
            ack.session_present
        );
    }

    /// Called when the transport reports an error after startup
    fn on_connection_lost(&self, error: &rumqttc::ConnectionError) {
        error!("❌ MQTT connection lost: {}", error);
    }
}

/// Default callbacks, log lines only
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEvents;

impl ConnectionEvents for LoggingEvents {}

pub struct ConnectionManager {
    client: AsyncClient,
    eventloop: EventLoop,
    events: Arc<dyn ConnectionEvents>,
    connect_timeout: Duration,
    reconnect_delay: Duration,
}

impl ConnectionManager {
    /// Connect and wait for the broker's CONNACK
    pub async fn connect(
        config: &SubscriberConfig,
        events: Arc<dyn ConnectionEvents>,
    ) -> Result<Self, ConnectionError> {
        let (client, mut eventloop) =
            AsyncClient::new(config.mqtt_options(), REQUEST_CHANNEL_CAPACITY);

        info!("🌐 Connecting to MQTT broker {} as {}", config.broker, config.client_id);

        let ack = match timeout(config.connect_timeout, wait_for_connack(&mut eventloop)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ConnectionError::Timeout {
                    timeout_millis: millis(config.connect_timeout),
                })
            }
        };
        events.on_connected(&ack);

        Ok(Self {
            client,
            eventloop,
            events,
            connect_timeout: config.connect_timeout,
            reconnect_delay: config.reconnect_delay,
        })
    }

    /// Issue the batched subscribe and wait for its SUBACK
    ///
    /// Messages delivered before the SUBACK are forwarded to `messages`.
    pub async fn subscribe(
        &mut self,
        subscriptions: &SubscriptionSet,
        messages: &mpsc::Sender<Message>,
    ) -> Result<(), SubscribeError> {
        subscriptions.request(&self.client).await?;

        let connect_timeout = self.connect_timeout;
        let eventloop = &mut self.eventloop;
        let wait = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::SubAck(ack))) => {
                        return subscriptions.check_ack(&ack);
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        // The receiver outlives startup, a failed send only happens on teardown
                        let _ = messages.send(Message::from(publish)).await;
                    }
                    Ok(_) => {}
                    Err(e) => return Err(SubscribeError::Network(e)),
                }
            }
        };

        match timeout(connect_timeout, wait).await {
            Ok(result) => {
                result?;
                info!("✅ Subscribed to {} topics", subscriptions.len());
                Ok(())
            }
            Err(_) => Err(SubscribeError::Timeout {
                timeout_millis: millis(connect_timeout),
            }),
        }
    }

    /// Move the event loop into a task feeding `messages`
    pub fn spawn_dispatch(self, messages: mpsc::Sender<Message>) -> DispatchHandle {
        let Self {
            client,
            eventloop,
            events,
            reconnect_delay,
            ..
        } = self;

        let task = tokio::spawn(dispatch(eventloop, messages, events, reconnect_delay));
        DispatchHandle { client, task }
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<ConnAck, ConnectionError> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    return Ok(ack);
                }
                return Err(ConnectionError::Rejected { code: ack.code });
            }
            Ok(_) => {}
            Err(rumqttc::ConnectionError::ConnectionRefused(code)) => {
                return Err(ConnectionError::Rejected { code });
            }
            Err(e) => return Err(ConnectionError::Network(e)),
        }
    }
}

async fn dispatch(
    mut eventloop: EventLoop,
    messages: mpsc::Sender<Message>,
    events: Arc<dyn ConnectionEvents>,
    reconnect_delay: Duration,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                if messages.send(Message::from(publish)).await.is_err() {
                    warn!("Message channel closed, stopping event loop");
                    break;
                }
            }
            Ok(Event::Incoming(Packet::ConnAck(ack))) => events.on_connected(&ack),
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                info!("👋 Disconnect sent, stopping event loop");
                break;
            }
            Ok(_) => {
                // Handle other events silently
            }
            Err(e) => {
                events.on_connection_lost(&e);
                info!("🔄 Polling again in {:?}...", reconnect_delay);
                tokio::time::sleep(reconnect_delay).await;
            }
        }
    }
}

/// Running event loop plus the client used to stop it
pub struct DispatchHandle {
    client: AsyncClient,
    task: JoinHandle<()>,
}

impl DispatchHandle {
    /// Send DISCONNECT and wait up to `grace` for the event loop to flush it
    ///
    /// Returns `true` when the event loop finished on its own, `false` when
    /// it had to be aborted after the grace period.
    pub async fn shutdown(mut self, grace: Duration) -> bool {
        if let Err(e) = self.client.try_disconnect() {
            warn!("Failed to queue MQTT disconnect: {}", e);
        }

        match timeout(grace, &mut self.task).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("Event loop task failed: {}", e);
                true
            }
            Err(_) => {
                warn!("Event loop still busy after {:?}, aborting", grace);
                self.task.abort();
                false
            }
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
