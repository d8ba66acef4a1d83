//! Client side queue lifecycle of an AMQP 0.9.1 client.
//!
//! A [`Queue`] declares itself on a [`Channel`] and defers every operation until the channel is
//! open and, if the queue is server-named, until its name is known. Deliveries are normalized to
//! the shape of the [`DeliveryHandler`] the application picked.
mod bindings;
pub use bindings::Bindings;

mod channel;
pub use channel::{
    BindOkFn, CancelOkFn, Channel, ConsumeOkFn, DeclareOkFn, DeleteOkFn, DeliverySink, GetReplyFn, PurgeOkFn,
    UnbindOkFn,
};

mod delivery;
pub use delivery::{DeliveryHandler, DeliveryMethod, GetReply, Metadata, RawDelivery};

pub mod error;
pub use error::ClientError;

pub mod frame;

mod gate;
pub use gate::{Continuation, Deferred};

mod loopback;
pub use loopback::LoopbackChannel;

mod message;
pub use message::{Content, HeaderPayload, MessageProperties};

mod model;
pub use model::{ChannelError, ChannelNumber, QueueStatus};

mod options;
pub use options::{BindOpts, DeleteOpts, PopOpts, PurgeOpts, QueueOpts, SubscribeOpts, UnbindOpts, UnsubscribeOpts};

mod queue;
pub use queue::{ConsumerSlot, DeclareHandler, Queue};
