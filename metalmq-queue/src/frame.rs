//! Arguments and replies of the queue and basic class methods.
//!
//! The structs here are the vocabulary between a [`Queue`](crate::Queue) and the
//! [`Channel`](crate::Channel) it talks through. Encoding them into frames is the job of the
//! protocol layer behind the channel.
use bitflags::{bitflags, Flags};
use std::collections::HashMap;

pub type ClassMethod = u32;

pub const QUEUE_DECLARE: ClassMethod = 0x0032000A;
pub const QUEUE_BIND: ClassMethod = 0x00320014;
pub const QUEUE_PURGE: ClassMethod = 0x0032001E;
pub const QUEUE_DELETE: ClassMethod = 0x00320028;
pub const QUEUE_UNBIND: ClassMethod = 0x00320032;

pub const BASIC_CONSUME: ClassMethod = 0x003C0014;
pub const BASIC_CANCEL: ClassMethod = 0x003C001E;
pub const BASIC_PUBLISH: ClassMethod = 0x003C0028;
pub const BASIC_GET: ClassMethod = 0x003C0046;

/// The opaque `arguments` table of declare, bind and consume methods.
pub type FieldTable = HashMap<String, AMQPFieldValue>;

#[derive(Clone, Debug, PartialEq)]
pub enum AMQPFieldValue {
    Bool(bool),
    LongInt(i32),
    LongString(String),
    EmptyFieldTable,
    FieldTable(Box<FieldTable>),
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct QueueDeclareFlags: u8 {
        const PASSIVE = 0b00000001;
        const DURABLE = 0b00000010;
        const EXCLUSIVE = 0b00000100;
        const AUTO_DELETE = 0b00001000;
        const NO_WAIT = 0b00010000;
    }
}

impl Default for QueueDeclareFlags {
    fn default() -> Self {
        QueueDeclareFlags::empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueDeclareArgs {
    pub name: String,
    pub flags: QueueDeclareFlags,
    pub args: Option<FieldTable>,
}

impl QueueDeclareArgs {
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn passive(mut self, mode: bool) -> Self {
        Flags::set(&mut self.flags, QueueDeclareFlags::PASSIVE, mode);
        self
    }

    pub fn durable(mut self, mode: bool) -> Self {
        Flags::set(&mut self.flags, QueueDeclareFlags::DURABLE, mode);
        self
    }

    pub fn exclusive(mut self, mode: bool) -> Self {
        Flags::set(&mut self.flags, QueueDeclareFlags::EXCLUSIVE, mode);
        self
    }

    pub fn auto_delete(mut self, mode: bool) -> Self {
        Flags::set(&mut self.flags, QueueDeclareFlags::AUTO_DELETE, mode);
        self
    }

    pub fn no_wait(mut self, mode: bool) -> Self {
        Flags::set(&mut self.flags, QueueDeclareFlags::NO_WAIT, mode);
        self
    }

    pub fn args(mut self, args: Option<FieldTable>) -> Self {
        self.args = args;
        self
    }

    pub fn is_no_wait(&self) -> bool {
        self.flags.contains(QueueDeclareFlags::NO_WAIT)
    }

    pub fn is_passive(&self) -> bool {
        self.flags.contains(QueueDeclareFlags::PASSIVE)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueDeclareOkArgs {
    pub name: String,
    pub message_count: u32,
    pub consumer_count: u32,
}

impl QueueDeclareOkArgs {
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn message_count(mut self, message_count: u32) -> Self {
        self.message_count = message_count;
        self
    }

    pub fn consumer_count(mut self, consumer_count: u32) -> Self {
        self.consumer_count = consumer_count;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueBindArgs {
    pub queue_name: String,
    pub exchange_name: String,
    pub routing_key: String,
    pub no_wait: bool,
    pub args: Option<FieldTable>,
}

impl QueueBindArgs {
    pub fn new(queue_name: &str, exchange_name: &str) -> Self {
        Self {
            queue_name: queue_name.to_string(),
            exchange_name: exchange_name.to_string(),
            ..Default::default()
        }
    }

    pub fn routing_key(mut self, routing_key: &str) -> Self {
        self.routing_key = routing_key.to_string();
        self
    }

    pub fn no_wait(mut self, mode: bool) -> Self {
        self.no_wait = mode;
        self
    }

    pub fn args(mut self, args: Option<FieldTable>) -> Self {
        self.args = args;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueUnbindArgs {
    pub queue_name: String,
    pub exchange_name: String,
    pub routing_key: String,
    pub args: Option<FieldTable>,
}

impl QueueUnbindArgs {
    pub fn new(queue_name: &str, exchange_name: &str) -> Self {
        Self {
            queue_name: queue_name.to_string(),
            exchange_name: exchange_name.to_string(),
            ..Default::default()
        }
    }

    pub fn routing_key(mut self, routing_key: &str) -> Self {
        self.routing_key = routing_key.to_string();
        self
    }

    pub fn args(mut self, args: Option<FieldTable>) -> Self {
        self.args = args;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueuePurgeArgs {
    pub queue_name: String,
    pub no_wait: bool,
}

impl QueuePurgeArgs {
    pub fn new(queue_name: &str) -> Self {
        Self {
            queue_name: queue_name.to_string(),
            ..Default::default()
        }
    }

    pub fn no_wait(mut self, mode: bool) -> Self {
        self.no_wait = mode;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueuePurgeOkArgs {
    pub message_count: u32,
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct QueueDeleteFlags: u8 {
        const IF_UNUSED = 0b00000001;
        const IF_EMPTY = 0b00000010;
        const NO_WAIT = 0b00000100;
    }
}

impl Default for QueueDeleteFlags {
    fn default() -> Self {
        QueueDeleteFlags::empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueDeleteArgs {
    pub queue_name: String,
    pub flags: QueueDeleteFlags,
}

impl QueueDeleteArgs {
    pub fn new(queue_name: &str) -> Self {
        Self {
            queue_name: queue_name.to_string(),
            ..Default::default()
        }
    }

    pub fn if_unused(mut self, mode: bool) -> Self {
        Flags::set(&mut self.flags, QueueDeleteFlags::IF_UNUSED, mode);
        self
    }

    pub fn if_empty(mut self, mode: bool) -> Self {
        Flags::set(&mut self.flags, QueueDeleteFlags::IF_EMPTY, mode);
        self
    }

    pub fn no_wait(mut self, mode: bool) -> Self {
        Flags::set(&mut self.flags, QueueDeleteFlags::NO_WAIT, mode);
        self
    }

    pub fn is_no_wait(&self) -> bool {
        self.flags.contains(QueueDeleteFlags::NO_WAIT)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueDeleteOkArgs {
    pub message_count: u32,
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct BasicConsumeFlags: u8 {
        const NO_LOCAL = 0b00000001;
        const NO_ACK = 0b00000010;
        const EXCLUSIVE = 0b00000100;
        const NO_WAIT = 0b00001000;
    }
}

impl Default for BasicConsumeFlags {
    fn default() -> Self {
        BasicConsumeFlags::empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicConsumeArgs {
    pub queue: String,
    pub consumer_tag: String,
    pub flags: BasicConsumeFlags,
    pub args: Option<FieldTable>,
}

impl BasicConsumeArgs {
    pub fn queue(mut self, queue: &str) -> Self {
        self.queue = queue.to_string();
        self
    }

    pub fn consumer_tag(mut self, consumer_tag: &str) -> Self {
        self.consumer_tag = consumer_tag.to_string();
        self
    }

    pub fn no_local(mut self, mode: bool) -> Self {
        Flags::set(&mut self.flags, BasicConsumeFlags::NO_LOCAL, mode);
        self
    }

    pub fn no_ack(mut self, mode: bool) -> Self {
        Flags::set(&mut self.flags, BasicConsumeFlags::NO_ACK, mode);
        self
    }

    pub fn exclusive(mut self, mode: bool) -> Self {
        Flags::set(&mut self.flags, BasicConsumeFlags::EXCLUSIVE, mode);
        self
    }

    pub fn no_wait(mut self, mode: bool) -> Self {
        Flags::set(&mut self.flags, BasicConsumeFlags::NO_WAIT, mode);
        self
    }

    pub fn is_no_wait(&self) -> bool {
        self.flags.contains(BasicConsumeFlags::NO_WAIT)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicConsumeOkArgs {
    pub consumer_tag: String,
}

impl BasicConsumeOkArgs {
    pub fn new(consumer_tag: &str) -> Self {
        Self {
            consumer_tag: consumer_tag.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicCancelArgs {
    pub consumer_tag: String,
    pub no_wait: bool,
}

impl BasicCancelArgs {
    pub fn new(consumer_tag: &str) -> Self {
        Self {
            consumer_tag: consumer_tag.to_string(),
            no_wait: false,
        }
    }

    pub fn no_wait(mut self, mode: bool) -> Self {
        self.no_wait = mode;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicCancelOkArgs {
    pub consumer_tag: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicGetArgs {
    pub queue: String,
    pub no_ack: bool,
}

impl BasicGetArgs {
    pub fn new(queue: &str) -> Self {
        Self {
            queue: queue.to_string(),
            no_ack: false,
        }
    }

    pub fn no_ack(mut self, mode: bool) -> Self {
        self.no_ack = mode;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicGetOkArgs {
    pub delivery_tag: u64,
    pub redelivered: bool,
    pub exchange_name: String,
    pub routing_key: String,
    pub message_count: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicDeliverArgs {
    pub consumer_tag: String,
    pub delivery_tag: u64,
    pub redelivered: bool,
    pub exchange_name: String,
    pub routing_key: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicPublishArgs {
    pub exchange_name: String,
    pub routing_key: String,
}

impl BasicPublishArgs {
    pub fn new(exchange_name: &str) -> Self {
        Self {
            exchange_name: exchange_name.to_string(),
            ..Default::default()
        }
    }

    pub fn routing_key(mut self, routing_key: &str) -> Self {
        self.routing_key = routing_key.to_string();
        self
    }
}

/// Every method a queue can issue on a channel, used for bookkeeping and logging.
#[derive(Clone, Debug, PartialEq)]
pub enum MethodFrameArgs {
    QueueDeclare(QueueDeclareArgs),
    QueueBind(QueueBindArgs),
    QueueUnbind(QueueUnbindArgs),
    QueuePurge(QueuePurgeArgs),
    QueueDelete(QueueDeleteArgs),
    BasicConsume(BasicConsumeArgs),
    BasicCancel(BasicCancelArgs),
    BasicGet(BasicGetArgs),
    BasicPublish(BasicPublishArgs),
}

impl MethodFrameArgs {
    pub fn class_method(&self) -> ClassMethod {
        match self {
            MethodFrameArgs::QueueDeclare(_) => QUEUE_DECLARE,
            MethodFrameArgs::QueueBind(_) => QUEUE_BIND,
            MethodFrameArgs::QueueUnbind(_) => QUEUE_UNBIND,
            MethodFrameArgs::QueuePurge(_) => QUEUE_PURGE,
            MethodFrameArgs::QueueDelete(_) => QUEUE_DELETE,
            MethodFrameArgs::BasicConsume(_) => BASIC_CONSUME,
            MethodFrameArgs::BasicCancel(_) => BASIC_CANCEL,
            MethodFrameArgs::BasicGet(_) => BASIC_GET,
            MethodFrameArgs::BasicPublish(_) => BASIC_PUBLISH,
        }
    }
}
