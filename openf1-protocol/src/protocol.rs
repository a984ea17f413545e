//! Broker constants for the OpenF1 live feed

/// Public OpenF1 MQTT broker
pub mod broker {
    /// Default address handed to subscribers
    pub const DEFAULT_ADDRESS: &str = "mqtts://mqtt.openf1.org:8883";
}

/// URL schemes accepted in a broker address
pub mod schemes {
    pub const MQTT: &str = "mqtt";
    pub const TCP: &str = "tcp";
    pub const MQTTS: &str = "mqtts";
    pub const SSL: &str = "ssl";
}

/// Default ports
pub const DEFAULT_MQTT_PORT: u16 = 1883;
pub const DEFAULT_MQTTS_PORT: u16 = 8883;

/// Every topic of the live feed lives under this prefix
pub const TOPIC_PREFIX: &str = "v1/";
