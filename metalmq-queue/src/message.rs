use std::collections::HashMap;
use std::fmt;

/// A message published through a queue or received from it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Content {
    pub body: Vec<u8>,
    pub properties: MessageProperties,
}

/// Standard set of message properties
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessageProperties {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub headers: HashMap<String, String>,
    /// 1 - non-persistent, 2 - persistent
    pub delivery_mode: Option<u8>,
    pub priority: Option<u8>,
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
    pub expiration: Option<String>,
    pub message_id: Option<String>,
    pub timestamp: Option<u64>,
    pub message_type: Option<String>,
    pub user_id: Option<String>,
    pub app_id: Option<String>,
}

/// The properties part of a content header as it arrived from the protocol layer.
///
/// Decoding is deferred until somebody asks for the properties, handlers which only want the
/// message body never pay for it.
pub trait HeaderPayload: fmt::Debug {
    fn decode_payload(&self) -> MessageProperties;
}

/// Already decoded properties can stand for a header payload as well.
impl HeaderPayload for MessageProperties {
    fn decode_payload(&self) -> MessageProperties {
        self.clone()
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Self {
            body: value.as_bytes().to_vec(),
            properties: MessageProperties::default(),
        }
    }
}

impl Content {
    pub fn text(mut self, value: &str) -> Self {
        self.body = value.as_bytes().to_vec();
        self
    }

    pub fn content_type(mut self, value: &str) -> Self {
        self.properties.content_type = Some(value.to_string());
        self
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.properties.headers.insert(key.to_string(), value.to_string());
        self
    }
}
