//! Options of the queue operations.
//!
//! Every option struct has a `Default` with the defaults of the operation, and builder style
//! setters.
use crate::frame::{BasicConsumeOkArgs, FieldTable};
use std::fmt;

/// Options of the queue declaration. Immutable after the queue is created.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueOpts {
    pub passive: bool,
    pub durable: bool,
    pub exclusive: bool,
    pub auto_delete: bool,
    /// `None` lets the queue decide: no-wait is used by named queues created without a callback.
    pub no_wait: Option<bool>,
    pub arguments: Option<FieldTable>,
}

impl QueueOpts {
    pub fn passive(mut self, mode: bool) -> Self {
        self.passive = mode;
        self
    }

    pub fn durable(mut self, mode: bool) -> Self {
        self.durable = mode;
        self
    }

    pub fn exclusive(mut self, mode: bool) -> Self {
        self.exclusive = mode;
        self
    }

    pub fn auto_delete(mut self, mode: bool) -> Self {
        self.auto_delete = mode;
        self
    }

    pub fn no_wait(mut self, mode: bool) -> Self {
        self.no_wait = Some(mode);
        self
    }

    pub fn arguments(mut self, arguments: FieldTable) -> Self {
        self.arguments = Some(arguments);
        self
    }

    /// The effective no-wait flag. Only meaningful after the queue resolved it.
    pub fn is_no_wait(&self) -> bool {
        self.no_wait.unwrap_or(false)
    }
}

/// Options of `Queue.Bind`. The routing key is `key` or `routing_key` or an empty string.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BindOpts {
    pub key: Option<String>,
    pub routing_key: Option<String>,
    pub no_wait: bool,
    pub arguments: Option<FieldTable>,
}

impl BindOpts {
    pub fn key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    pub fn routing_key(mut self, routing_key: &str) -> Self {
        self.routing_key = Some(routing_key.to_string());
        self
    }

    pub fn no_wait(mut self, mode: bool) -> Self {
        self.no_wait = mode;
        self
    }

    pub fn arguments(mut self, arguments: FieldTable) -> Self {
        self.arguments = Some(arguments);
        self
    }

    pub fn effective_routing_key(&self) -> &str {
        effective_routing_key(&self.key, &self.routing_key)
    }
}

/// Options of `Queue.Unbind`, the routing key follows the same rule as binding.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnbindOpts {
    pub key: Option<String>,
    pub routing_key: Option<String>,
    pub arguments: Option<FieldTable>,
}

impl UnbindOpts {
    pub fn key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    pub fn routing_key(mut self, routing_key: &str) -> Self {
        self.routing_key = Some(routing_key.to_string());
        self
    }

    pub fn effective_routing_key(&self) -> &str {
        effective_routing_key(&self.key, &self.routing_key)
    }
}

fn effective_routing_key<'a>(key: &'a Option<String>, routing_key: &'a Option<String>) -> &'a str {
    key.as_deref().or(routing_key.as_deref()).unwrap_or("")
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeleteOpts {
    pub if_unused: bool,
    pub if_empty: bool,
    pub no_wait: bool,
}

impl DeleteOpts {
    pub fn if_unused(mut self, mode: bool) -> Self {
        self.if_unused = mode;
        self
    }

    pub fn if_empty(mut self, mode: bool) -> Self {
        self.if_empty = mode;
        self
    }

    pub fn no_wait(mut self, mode: bool) -> Self {
        self.no_wait = mode;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PurgeOpts {
    pub no_wait: bool,
}

impl PurgeOpts {
    pub fn no_wait(mut self, mode: bool) -> Self {
        self.no_wait = mode;
        self
    }
}

/// Options of `Basic.Get`.
#[derive(Default)]
pub struct PopOpts {
    /// If `false` the server considers the message acknowledged as soon as it is sent.
    pub ack: bool,
    /// Called when the queue had no message (`Basic.GetEmpty`).
    pub on_empty: Option<Box<dyn FnOnce()>>,
}

impl fmt::Debug for PopOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopOpts")
            .field("ack", &self.ack)
            .field("on_empty", &self.on_empty.is_some())
            .finish()
    }
}

impl PopOpts {
    pub fn ack(mut self, mode: bool) -> Self {
        self.ack = mode;
        self
    }

    pub fn on_empty<F: FnOnce() + 'static>(mut self, f: F) -> Self {
        self.on_empty = Some(Box::new(f));
        self
    }
}

/// Options of `Basic.Consume`.
#[derive(Default)]
pub struct SubscribeOpts {
    pub ack: bool,
    pub exclusive: bool,
    pub no_local: bool,
    pub no_wait: bool,
    /// Called with the `Basic.ConsumeOk`. Setting it turns off no-wait.
    pub confirm: Option<Box<dyn FnOnce(&BasicConsumeOkArgs)>>,
}

impl fmt::Debug for SubscribeOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscribeOpts")
            .field("ack", &self.ack)
            .field("exclusive", &self.exclusive)
            .field("no_local", &self.no_local)
            .field("no_wait", &self.no_wait)
            .field("confirm", &self.confirm.is_some())
            .finish()
    }
}

impl SubscribeOpts {
    pub fn ack(mut self, mode: bool) -> Self {
        self.ack = mode;
        self
    }

    pub fn exclusive(mut self, mode: bool) -> Self {
        self.exclusive = mode;
        self
    }

    pub fn no_local(mut self, mode: bool) -> Self {
        self.no_local = mode;
        self
    }

    pub fn no_wait(mut self, mode: bool) -> Self {
        self.no_wait = mode;
        self
    }

    pub fn confirm<F: FnOnce(&BasicConsumeOkArgs) + 'static>(mut self, f: F) -> Self {
        self.confirm = Some(Box::new(f));
        self
    }
}

/// Options of `Basic.Cancel`.
#[derive(Clone, Debug, PartialEq)]
pub struct UnsubscribeOpts {
    pub no_wait: bool,
}

impl Default for UnsubscribeOpts {
    fn default() -> Self {
        Self { no_wait: true }
    }
}

impl UnsubscribeOpts {
    pub fn no_wait(mut self, mode: bool) -> Self {
        self.no_wait = mode;
        self
    }
}
