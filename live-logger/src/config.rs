//! Command line / environment configuration
//!
//! [`Args`] is what clap parses; [`SubscriberConfig`] is the validated form
//! built once at startup and passed by reference to every component.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use openf1_protocol::{broker, schemes, Topic, DEFAULT_MQTTS_PORT, DEFAULT_MQTT_PORT};
use rand::Rng;
use rumqttc::{MqttOptions, Transport};

use crate::error::ConfigError;

/// Log file used when none is given
pub const DEFAULT_LOG_FILE: &str = "openf1_live.log";

/// Largest packet accepted from or sent to the broker
pub const MAX_PACKET_SIZE: usize = 256 * 1024;

#[derive(Parser, Debug, Clone)]
#[command(name = "live-logger")]
#[command(about = "Subscribes to the OpenF1 live feed and logs every message")]
pub struct Args {
    /// Broker address, e.g. mqtts://mqtt.openf1.org:8883
    #[arg(long, env = "OPENF1_BROKER", default_value = broker::DEFAULT_ADDRESS)]
    pub broker: String,

    /// Broker username
    #[arg(short, long, env = "OPENF1_USERNAME")]
    pub username: Option<String>,

    /// Access token, sent as the MQTT password
    #[arg(short, long, env = "OPENF1_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// MQTT client ID (if not provided, generates a random one)
    #[arg(long, env = "OPENF1_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Append-only log file
    #[arg(long, env = "OPENF1_LOG_FILE", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Topic whose payloads are decoded into records (repeatable)
    #[arg(long = "decode-topic", default_value = "v1/car_data")]
    pub decode_topics: Vec<Topic>,

    /// MQTT keep-alive interval
    #[arg(long, default_value_t = 30)]
    pub keep_alive_secs: u64,

    /// Time allowed for in-flight packets after DISCONNECT
    #[arg(long, default_value_t = 250)]
    pub grace_period_ms: u64,

    /// Time allowed for the broker to acknowledge connect and subscribe
    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Capacity of the channel between the event loop and the sink
    #[arg(long, default_value_t = 256)]
    pub channel_capacity: usize,
}

/// Broker endpoint parsed from `[scheme://]host[:port]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

impl BrokerAddress {
    pub fn plain(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tls: false,
        }
    }
}

impl FromStr for BrokerAddress {
    type Err = ConfigError;

    fn from_str(address: &str) -> Result<Self, Self::Err> {
        let trimmed = address.trim();
        let (tls, rest) = match trimmed.split_once("://") {
            Some((scheme, rest)) => {
                let tls = match scheme.to_ascii_lowercase().as_str() {
                    schemes::MQTT | schemes::TCP => false,
                    schemes::MQTTS | schemes::SSL => true,
                    other => {
                        return Err(ConfigError::broker(
                            address,
                            format!("unsupported scheme '{}'", other),
                        ))
                    }
                };
                (tls, rest)
            }
            None => (false, trimmed),
        };

        let authority = rest.trim_end_matches('/');
        if authority.contains('/') {
            return Err(ConfigError::broker(address, "paths are not supported"));
        }

        let default_port = if tls {
            DEFAULT_MQTTS_PORT
        } else {
            DEFAULT_MQTT_PORT
        };
        let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
            // IPv6 literal, e.g. [::1]:1883
            let (host, rest) = bracketed
                .split_once(']')
                .ok_or_else(|| ConfigError::broker(address, "unterminated IPv6 literal"))?;
            match rest {
                "" => (host, default_port),
                _ => match rest.strip_prefix(':') {
                    Some(port) => (host, parse_port(address, port)?),
                    None => {
                        return Err(ConfigError::broker(
                            address,
                            format!("unexpected '{}' after IPv6 literal", rest),
                        ))
                    }
                },
            }
        } else {
            match authority.rsplit_once(':') {
                Some((host, _)) if host.contains(':') => {
                    return Err(ConfigError::broker(
                        address,
                        "IPv6 addresses must be enclosed in brackets",
                    ))
                }
                Some((host, port)) => (host, parse_port(address, port)?),
                None => (authority, default_port),
            }
        };

        if host.is_empty() {
            return Err(ConfigError::broker(address, "missing host"));
        }
        if port == 0 {
            return Err(ConfigError::broker(address, "port must be non-zero"));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            tls,
        })
    }
}

fn parse_port(address: &str, port: &str) -> Result<u16, ConfigError> {
    port.parse::<u16>()
        .map_err(|_| ConfigError::broker(address, format!("invalid port '{}'", port)))
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.tls { schemes::MQTTS } else { schemes::MQTT };
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}", scheme, self.host, self.port)
        } else {
            write!(f, "{}://{}:{}", scheme, self.host, self.port)
        }
    }
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub broker: BrokerAddress,
    pub client_id: String,
    pub username: Option<String>,
    pub token: Option<String>,
    pub log_file: PathBuf,
    pub decode_topics: Vec<Topic>,
    pub keep_alive: Duration,
    pub grace_period: Duration,
    pub connect_timeout: Duration,
    /// Pause before polling again after the connection drops
    pub reconnect_delay: Duration,
    pub channel_capacity: usize,
}

impl SubscriberConfig {
    /// Configuration with default settings for the given broker
    pub fn new(broker: BrokerAddress) -> Self {
        Self {
            broker,
            client_id: generate_client_id(),
            username: None,
            token: None,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            decode_topics: vec![Topic::TELEMETRY],
            keep_alive: Duration::from_secs(30),
            grace_period: Duration::from_millis(250),
            connect_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(5),
            channel_capacity: 256,
        }
    }

    /// Build the rumqttc connection options
    ///
    /// Missing credentials are not rejected here; the broker refuses the
    /// connection instead.
    pub fn mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.broker.host, self.broker.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        options.set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);

        if self.username.is_some() || self.token.is_some() {
            options.set_credentials(
                self.username.clone().unwrap_or_default(),
                self.token.clone().unwrap_or_default(),
            );
        }

        if self.broker.tls {
            options.set_transport(Transport::tls_with_default_config());
        }

        options
    }
}

impl TryFrom<Args> for SubscriberConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        if args.channel_capacity == 0 {
            return Err(ConfigError::Value(
                "channel capacity must be greater than zero".to_string(),
            ));
        }
        if args.keep_alive_secs < 5 {
            return Err(ConfigError::Value(
                "keep-alive must be at least 5 seconds".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut decode_topics = args.decode_topics;
        decode_topics.retain(|topic| seen.insert(*topic));

        Ok(Self {
            broker: args.broker.parse()?,
            client_id: args.client_id.unwrap_or_else(generate_client_id),
            username: args.username,
            token: args.token,
            log_file: args.log_file,
            decode_topics,
            keep_alive: Duration::from_secs(args.keep_alive_secs),
            grace_period: Duration::from_millis(args.grace_period_ms),
            connect_timeout: Duration::from_secs(args.connect_timeout_secs),
            reconnect_delay: Duration::from_secs(5),
            channel_capacity: args.channel_capacity,
        })
    }
}

/// Random client id, the broker drops older sessions sharing an id
pub fn generate_client_id() -> String {
    let mut rng = rand::thread_rng();
    let mut bytes = [0u8; 6];
    rng.fill(&mut bytes);
    format!("openf1-live-{}", hex::encode(bytes))
}
