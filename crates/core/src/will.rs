//! Last-will messages attached to client sessions
//!
//! A will is published by the broker on behalf of a client that disconnects
//! without a clean DISCONNECT. The payload bytes live in an external payload
//! store and are referenced here by `payload_id`; a session only carries the
//! bytes transiently, after they were resolved for a caller.

use serde::{Deserialize, Serialize};

use crate::sizable::{
    byte_array_size, string_size, Sizable, BOOL_SIZE, ENUM_SIZE, LONG_SIZE, OBJECT_SHELL_SIZE,
    REF_SIZE, VEC_HEADER_SIZE,
};

/// MQTT quality of service level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QoS {
    /// Fire and forget
    #[default]
    AtMostOnce,
    /// Acknowledged delivery
    AtLeastOnce,
    /// Assured, deduplicated delivery
    ExactlyOnce,
}

impl QoS {
    /// Wire-level code of this QoS level
    pub fn code(&self) -> u8 {
        match self {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
            QoS::ExactlyOnce => 2,
        }
    }
}

/// MQTT 5 payload format indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadFormatIndicator {
    /// Unspecified bytes
    Unspecified,
    /// UTF-8 encoded character data
    Utf8,
}

/// MQTT 5 user property (name/value pair)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserProperty {
    /// Property name
    pub name: String,
    /// Property value
    pub value: String,
}

impl UserProperty {
    /// Create a user property
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The publish a client registered as its last will
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WillPublish {
    /// Topic the will is published to
    pub topic: String,
    /// Resolved payload bytes, `None` while only referenced by id
    pub payload: Option<Vec<u8>>,
    /// Delivery QoS
    pub qos: QoS,
    /// Retain flag
    pub retain: bool,
    /// Message expiry interval in seconds
    pub message_expiry_interval: i64,
    /// Seconds to wait after disconnect before publishing
    pub delay_interval: i64,
    /// Payload format indicator
    pub payload_format_indicator: Option<PayloadFormatIndicator>,
    /// Content type
    pub content_type: Option<String>,
    /// Response topic
    pub response_topic: Option<String>,
    /// Correlation data
    pub correlation_data: Option<Vec<u8>>,
    /// User properties
    pub user_properties: Vec<UserProperty>,
    /// Identifier of the broker node that accepted the will
    pub broker_id: String,
}

impl WillPublish {
    /// Create a will publish with default metadata
    pub fn new(topic: impl Into<String>, payload: Option<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload,
            qos: QoS::AtMostOnce,
            retain: false,
            message_expiry_interval: i64::from(u32::MAX),
            delay_interval: 0,
            payload_format_indicator: None,
            content_type: None,
            response_topic: None,
            correlation_data: None,
            user_properties: Vec::new(),
            broker_id: String::new(),
        }
    }

    /// Set the QoS (builder pattern)
    pub fn with_qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    /// Set the retain flag (builder pattern)
    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    /// Set the will delay interval in seconds (builder pattern)
    pub fn with_delay_interval(mut self, delay_interval: i64) -> Self {
        self.delay_interval = delay_interval;
        self
    }

    /// Set the message expiry interval in seconds (builder pattern)
    pub fn with_message_expiry_interval(mut self, interval: i64) -> Self {
        self.message_expiry_interval = interval;
        self
    }

    /// Add a user property (builder pattern)
    pub fn with_user_property(mut self, property: UserProperty) -> Self {
        self.user_properties.push(property);
        self
    }

    /// Clone everything except the payload bytes
    pub fn copy_without_payload(&self) -> Self {
        Self {
            topic: self.topic.clone(),
            payload: None,
            qos: self.qos,
            retain: self.retain,
            message_expiry_interval: self.message_expiry_interval,
            delay_interval: self.delay_interval,
            payload_format_indicator: self.payload_format_indicator,
            content_type: self.content_type.clone(),
            response_topic: self.response_topic.clone(),
            correlation_data: self.correlation_data.clone(),
            user_properties: self.user_properties.clone(),
            broker_id: self.broker_id.clone(),
        }
    }
}

/// A will attached to a session, referencing its payload by id
///
/// A `ClientSessionWill` owns exactly one outstanding reference in the
/// payload store. Only the store's will reference manager may release it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSessionWill {
    publish: WillPublish,
    payload_id: u64,
}

impl ClientSessionWill {
    /// Wrap a will publish whose payload was registered under `payload_id`
    pub fn new(publish: WillPublish, payload_id: u64) -> Self {
        Self {
            publish,
            payload_id,
        }
    }

    /// Handle into the payload store
    #[inline]
    pub fn payload_id(&self) -> u64 {
        self.payload_id
    }

    /// The will publish metadata
    #[inline]
    pub fn publish(&self) -> &WillPublish {
        &self.publish
    }

    /// Will topic
    pub fn topic(&self) -> &str {
        &self.publish.topic
    }

    /// Will delay interval in seconds
    pub fn delay_interval(&self) -> i64 {
        self.publish.delay_interval
    }

    /// Resolved payload bytes, if attached
    pub fn payload(&self) -> Option<&[u8]> {
        self.publish.payload.as_deref()
    }

    /// Attach resolved payload bytes
    pub fn set_payload(&mut self, payload: Vec<u8>) {
        self.publish.payload = Some(payload);
    }

    /// Drop any resident payload bytes, keeping the reference
    pub fn clear_payload(&mut self) {
        self.publish.payload = None;
    }

    /// Clone without the resident payload bytes
    pub fn copy_without_payload(&self) -> Self {
        Self {
            publish: self.publish.copy_without_payload(),
            payload_id: self.payload_id,
        }
    }
}

impl Sizable for ClientSessionWill {
    // Payload bytes are owned by the payload store and not accounted here.
    fn estimated_size(&self) -> usize {
        let publish = &self.publish;
        let mut size = OBJECT_SHELL_SIZE;

        size += LONG_SIZE; // payload id
        size += REF_SIZE; // publish

        size += ENUM_SIZE; // qos
        size += LONG_SIZE; // message expiry

        size += VEC_HEADER_SIZE; // user properties
        for property in &publish.user_properties {
            size += REF_SIZE;
            size += string_size(Some(&property.name));
            size += string_size(Some(&property.value));
        }

        size += LONG_SIZE; // delay interval
        size += string_size(Some(&publish.topic));
        size += string_size(publish.response_topic.as_deref());
        size += string_size(publish.content_type.as_deref());
        size += byte_array_size(publish.correlation_data.as_deref());
        size += string_size(Some(&publish.broker_id));

        size += ENUM_SIZE; // payload format indicator
        size += BOOL_SIZE; // retain
        size
    }
}
