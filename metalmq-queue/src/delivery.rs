//! Normalizing deliveries for the application handlers.
//!
//! Messages arrive either by `Basic.Deliver` (consuming) or by `Basic.GetOk` (pop). The protocol
//! layer hands them over as a [`RawDelivery`]: the method arguments, the undecoded content header
//! properties and the body. The application picks one of the handler shapes of
//! [`DeliveryHandler`] and gets exactly the arguments of that shape.
use crate::frame::{BasicDeliverArgs, BasicGetOkArgs};
use crate::message::{HeaderPayload, MessageProperties};
use crate::model::ChannelNumber;
use std::fmt;

/// The method which carried the content.
#[derive(Clone, Debug, PartialEq)]
pub enum DeliveryMethod {
    Deliver(BasicDeliverArgs),
    GetOk(BasicGetOkArgs),
}

/// A delivery as it comes from the protocol layer.
#[derive(Debug)]
pub struct RawDelivery {
    pub method: DeliveryMethod,
    pub headers: Option<Box<dyn HeaderPayload>>,
    pub body: Vec<u8>,
}

/// Result of a `Basic.Get`.
#[derive(Debug)]
pub enum GetReply {
    Ok(RawDelivery),
    Empty,
}

/// Delivery information together with the decoded message properties.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    pub channel: ChannelNumber,
    /// Only consumer deliveries have consumer tag.
    pub consumer_tag: Option<String>,
    pub delivery_tag: u64,
    pub redelivered: bool,
    pub exchange: String,
    pub routing_key: String,
    /// Only `Basic.GetOk` tells how many messages remained in the queue.
    pub message_count: Option<u32>,
    pub properties: MessageProperties,
}

impl Metadata {
    fn new(channel: ChannelNumber, method: &DeliveryMethod, headers: Option<&dyn HeaderPayload>) -> Self {
        let properties = headers.map(|h| h.decode_payload()).unwrap_or_default();

        match method {
            DeliveryMethod::Deliver(args) => Metadata {
                channel,
                consumer_tag: Some(args.consumer_tag.clone()),
                delivery_tag: args.delivery_tag,
                redelivered: args.redelivered,
                exchange: args.exchange_name.clone(),
                routing_key: args.routing_key.clone(),
                message_count: None,
                properties,
            },
            DeliveryMethod::GetOk(args) => Metadata {
                channel,
                consumer_tag: None,
                delivery_tag: args.delivery_tag,
                redelivered: args.redelivered,
                exchange: args.exchange_name.clone(),
                routing_key: args.routing_key.clone(),
                message_count: Some(args.message_count),
                properties,
            },
        }
    }
}

pub type BodyFn = dyn FnMut(Vec<u8>);
pub type MetadataFn = dyn FnMut(Metadata, Vec<u8>);
/// Metadata, body, delivery tag, redelivered, exchange, routing key, consumer tag.
pub type WideFn = dyn FnMut(Metadata, Vec<u8>, u64, bool, String, String, Option<String>);

/// The shapes an application handler can take.
pub enum DeliveryHandler {
    /// Only the message body. Properties are never decoded.
    Body(Box<BodyFn>),
    /// The canonical `(metadata, body)` shape.
    WithMetadata(Box<MetadataFn>),
    /// Compatibility shape which spreads the delivery fields as separate arguments.
    Wide(Box<WideFn>),
}

impl fmt::Debug for DeliveryHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryHandler::Body(_) => write!(f, "DeliveryHandler::Body"),
            DeliveryHandler::WithMetadata(_) => write!(f, "DeliveryHandler::WithMetadata"),
            DeliveryHandler::Wide(_) => write!(f, "DeliveryHandler::Wide"),
        }
    }
}

impl DeliveryHandler {
    pub fn body<F: FnMut(Vec<u8>) + 'static>(f: F) -> Self {
        DeliveryHandler::Body(Box::new(f))
    }

    pub fn with_metadata<F: FnMut(Metadata, Vec<u8>) + 'static>(f: F) -> Self {
        DeliveryHandler::WithMetadata(Box::new(f))
    }

    pub fn wide<F>(f: F) -> Self
    where
        F: FnMut(Metadata, Vec<u8>, u64, bool, String, String, Option<String>) + 'static,
    {
        DeliveryHandler::Wide(Box::new(f))
    }

    /// Calls the handler with the arguments of its shape.
    pub fn dispatch(&mut self, channel: ChannelNumber, delivery: RawDelivery) {
        let RawDelivery { method, headers, body } = delivery;

        match self {
            DeliveryHandler::Body(f) => f(body),
            DeliveryHandler::WithMetadata(f) => {
                let metadata = Metadata::new(channel, &method, headers.as_deref());

                f(metadata, body)
            }
            DeliveryHandler::Wide(f) => {
                let metadata = Metadata::new(channel, &method, headers.as_deref());
                let delivery_tag = metadata.delivery_tag;
                let redelivered = metadata.redelivered;
                let exchange = metadata.exchange.clone();
                let routing_key = metadata.routing_key.clone();
                let consumer_tag = metadata.consumer_tag.clone();

                f(metadata, body, delivery_tag, redelivered, exchange, routing_key, consumer_tag)
            }
        }
    }
}
