//! Client side representation of a queue.
//!
//! A [`Queue`] is declared as soon as it is created. Every operation on it is deferred until the
//! channel is open, and the operations which need the name of a server-named queue are deferred
//! until the `Queue.DeclareOk` arrives as well. Deferred operations are replayed in the order
//! they were called.
//!
//! ```no_run
//! use metalmq_queue::{BindOpts, DeliveryHandler, LoopbackChannel, Queue, QueueOpts, SubscribeOpts};
//! use std::rc::Rc;
//!
//! fn consume(channel: Rc<LoopbackChannel>) -> anyhow::Result<()> {
//!     let queue = Queue::new(channel.clone(), "", QueueOpts::default().exclusive(true), None)?;
//!
//!     queue.bind("prices", BindOpts::default().routing_key("nyse.*"), None);
//!     queue.subscribe(
//!         SubscribeOpts::default(),
//!         DeliveryHandler::with_metadata(|metadata, body| {
//!             println!("{} {:?}", metadata.routing_key, body);
//!         }),
//!     )?;
//!
//!     channel.open();
//!
//!     Ok(())
//! }
//! ```
use crate::bindings::Bindings;
use crate::channel::{BindOkFn, Channel, ConsumeOkFn, DeleteOkFn, PurgeOkFn, UnbindOkFn};
use crate::delivery::{DeliveryHandler, GetReply, RawDelivery};
use crate::error::precondition_failed;
use crate::frame::{
    self, BasicCancelArgs, BasicCancelOkArgs, BasicConsumeArgs, BasicConsumeOkArgs, BasicGetArgs, BasicPublishArgs,
    QueueBindArgs, QueueDeclareArgs, QueueDeclareOkArgs, QueueDeleteArgs, QueueDeleteOkArgs, QueuePurgeArgs,
    QueuePurgeOkArgs, QueueUnbindArgs,
};
use crate::gate::Deferred;
use crate::message::Content;
use crate::model::{ChannelNumber, QueueStatus};
use crate::options::{BindOpts, DeleteOpts, PopOpts, PurgeOpts, QueueOpts, SubscribeOpts, UnbindOpts, UnsubscribeOpts};
use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use std::cell::RefCell;
use std::future::Future;
use std::fmt;
use std::rc::{Rc, Weak};

/// Callback of the queue creation, called when the declaration is confirmed.
pub enum DeclareHandler {
    Queue(Box<dyn FnOnce(&Queue)>),
    WithDeclareOk(Box<dyn FnOnce(&Queue, &QueueDeclareOkArgs)>),
}

impl DeclareHandler {
    pub fn queue<F: FnOnce(&Queue) + 'static>(f: F) -> Self {
        DeclareHandler::Queue(Box::new(f))
    }

    pub fn with_declare_ok<F: FnOnce(&Queue, &QueueDeclareOkArgs) + 'static>(f: F) -> Self {
        DeclareHandler::WithDeclareOk(Box::new(f))
    }

    fn call(self, queue: &Queue, declare_ok: &QueueDeclareOkArgs) {
        match self {
            DeclareHandler::Queue(f) => f(queue),
            DeclareHandler::WithDeclareOk(f) => f(queue, declare_ok),
        }
    }
}

impl fmt::Debug for DeclareHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclareHandler::Queue(_) => write!(f, "DeclareHandler::Queue"),
            DeclareHandler::WithDeclareOk(_) => write!(f, "DeclareHandler::WithDeclareOk"),
        }
    }
}

/// The consumer of the queue. A queue can have one consumer at a time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ConsumerSlot {
    #[default]
    Idle,
    /// `subscribe` was called but the channel is not open yet.
    Pending,
    /// `Basic.Consume` is sent with this tag, waiting for `Basic.ConsumeOk`.
    Issued(String),
    /// The server confirmed the consumer.
    Active(String),
}

impl ConsumerSlot {
    /// The tag is generated when `Basic.Consume` is issued, so a `Pending` slot has none even
    /// though it is taken.
    pub fn tag(&self) -> Option<&str> {
        match self {
            ConsumerSlot::Issued(tag) | ConsumerSlot::Active(tag) => Some(tag),
            ConsumerSlot::Idle | ConsumerSlot::Pending => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ConsumerSlot::Idle)
    }
}

struct QueueState {
    /// The name given by the application, empty for server-named queues.
    requested_name: String,
    name: String,
    server_named: bool,
    opts: QueueOpts,
    status: QueueStatus,
    bindings: Bindings,
    consumer: ConsumerSlot,
    declaration: Deferred,
    /// Bumped by every reinitialization, continuations of earlier generations are dropped.
    generation: u64,
}

impl QueueState {
    fn new(name: &str, opts: QueueOpts) -> Self {
        QueueState {
            requested_name: name.to_string(),
            name: name.to_string(),
            server_named: name.is_empty(),
            status: initial_status(&opts),
            opts,
            bindings: Bindings::new(),
            consumer: ConsumerSlot::Idle,
            declaration: Deferred::new(),
            generation: 0,
        }
    }
}

fn initial_status(opts: &QueueOpts) -> QueueStatus {
    if opts.is_no_wait() {
        QueueStatus::Opened
    } else {
        QueueStatus::Opening
    }
}

/// Named queues declared without callback don't wait for `Queue.DeclareOk`, unless the
/// application says otherwise.
fn resolve_options(name: &str, mut opts: QueueOpts, has_callback: bool) -> QueueOpts {
    opts.no_wait = Some(opts.no_wait.unwrap_or(!name.is_empty() && !has_callback));
    opts
}

/// Handle of a queue. Clones refer to the same queue.
#[derive(Clone)]
pub struct Queue {
    channel: Rc<dyn Channel>,
    state: Rc<RefCell<QueueState>>,
}

/// Continuations hold the queue weakly, operations of a dropped queue are not issued.
struct WeakQueue {
    channel: Weak<dyn Channel>,
    state: Weak<RefCell<QueueState>>,
}

impl WeakQueue {
    fn upgrade(&self) -> Option<Queue> {
        Some(Queue {
            channel: self.channel.upgrade()?,
            state: self.state.upgrade()?,
        })
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state.borrow();

        f.debug_struct("Queue")
            .field("channel", &self.channel.number())
            .field("name", &st.name)
            .field("server_named", &st.server_named)
            .field("status", &st.status)
            .field("consumer", &st.consumer)
            .field("generation", &st.generation)
            .finish()
    }
}

impl Queue {
    /// Creates the queue and declares it on the channel. An empty name asks the server to
    /// generate one.
    ///
    /// A server-named queue cannot be declared with no-wait since the name arrives in the
    /// `Queue.DeclareOk`, in that case it returns an error without sending anything.
    pub fn new(
        channel: Rc<dyn Channel>,
        name: &str,
        opts: QueueOpts,
        on_declare: Option<DeclareHandler>,
    ) -> Result<Queue> {
        let opts = resolve_options(name, opts, on_declare.is_some());

        if name.is_empty() && opts.is_no_wait() {
            return precondition_failed(
                channel.number(),
                frame::QUEUE_DECLARE,
                "Server-named queue cannot be declared with no-wait",
            );
        }

        let queue = Queue {
            channel,
            state: Rc::new(RefCell::new(QueueState::new(name, opts))),
        };

        queue.start_declaration(on_declare);

        Ok(queue)
    }

    /// Rebuilds the state of the queue from its options and declares it again. It needs to be
    /// called after the channel failed since bindings, consumer and declaration became stale.
    pub fn reinitialize(&self) {
        let old_declaration = {
            let mut st = self.state.borrow_mut();

            st.generation += 1;
            st.name = st.requested_name.clone();
            st.status = initial_status(&st.opts);
            st.bindings = Bindings::new();
            st.consumer = ConsumerSlot::Idle;

            info!("Reinitialize queue {:?} (generation {})", st.requested_name, st.generation);

            std::mem::replace(&mut st.declaration, Deferred::new())
        };

        // Operations still queued on the channel may hold the old gate, its waiters are dropped
        // here so they don't wait for a declaration which never comes.
        old_declaration.abandon();

        self.start_declaration(None);
    }

    /// Same as [`Queue::reinitialize`].
    pub fn reset(&self) {
        self.reinitialize()
    }

    fn start_declaration(&self, on_declare: Option<DeclareHandler>) {
        // With a callback the no-wait option goes to the wire. Without callback we still want the
        // reply, the declaration gate is fired by that.
        let no_wait = on_declare.is_some() && self.state.borrow().opts.is_no_wait();
        let on_declare = if no_wait {
            if let Some(handler) = on_declare {
                let declare_ok = QueueDeclareOkArgs::default().name(&self.name());

                handler.call(self, &declare_ok);
            }

            None
        } else {
            on_declare
        };

        self.when_ready(false, move |queue| queue.issue_declare(no_wait, on_declare));
    }

    fn issue_declare(&self, no_wait: bool, on_declare: Option<DeclareHandler>) {
        let (args, generation) = {
            let st = self.state.borrow();
            let args = QueueDeclareArgs::default()
                .name(&st.name)
                .passive(st.opts.passive)
                .durable(st.opts.durable)
                .exclusive(st.opts.exclusive)
                .auto_delete(st.opts.auto_delete)
                .no_wait(no_wait)
                .args(st.opts.arguments.clone());

            (args, st.generation)
        };

        debug!("Channel {} Queue.Declare {:?}", self.channel.number(), args);

        if no_wait {
            self.channel.queue_declare(args, None);
            self.declaration_gate().fire();

            return;
        }

        let weak = self.downgrade();

        self.channel.queue_declare(
            args,
            Some(Box::new(move |declare_ok: QueueDeclareOkArgs| {
                if let Some(queue) = weak.upgrade() {
                    queue.declare_ok(generation, declare_ok, on_declare);
                }
            })),
        );
    }

    fn declare_ok(&self, generation: u64, declare_ok: QueueDeclareOkArgs, on_declare: Option<DeclareHandler>) {
        if self.is_stale(generation) {
            warn!("Ignore Queue.DeclareOk {:?} of an earlier declaration", declare_ok.name);

            return;
        }

        let gate = {
            let mut st = self.state.borrow_mut();

            if st.server_named {
                st.name = declare_ok.name.clone();
            }

            if st.status == QueueStatus::Opening {
                st.status = QueueStatus::Opened;
            }

            st.declaration.clone()
        };

        info!(
            "Queue {} declared, messages: {}, consumers: {}",
            declare_ok.name, declare_ok.message_count, declare_ok.consumer_count
        );

        gate.fire();

        if let Some(handler) = on_declare {
            handler.call(self, &declare_ok);
        }
    }

    /// Binds the queue to an exchange. The binding is recorded immediately and the status
    /// becomes `Unbound`. Without callback the bind is sent with no-wait.
    pub fn bind(&self, exchange: &str, opts: BindOpts, on_ok: Option<BindOkFn>) -> &Self {
        let server_named = {
            let mut st = self.state.borrow_mut();

            st.status = QueueStatus::Unbound;
            st.bindings.record(exchange, opts.clone());

            st.server_named
        };

        let exchange = exchange.to_string();

        self.when_ready(server_named, move |queue| {
            let args = QueueBindArgs::new(&queue.name(), &exchange)
                .routing_key(opts.effective_routing_key())
                .no_wait(opts.no_wait || on_ok.is_none())
                .args(opts.arguments.clone());

            debug!("Channel {} Queue.Bind {:?}", queue.channel.number(), args);

            let on_ok = if args.no_wait { None } else { on_ok };

            queue.channel.queue_bind(args, on_ok);
        });

        self
    }

    /// Unbinds the queue from an exchange. The bindings registry is not changed.
    pub fn unbind(&self, exchange: &str, opts: UnbindOpts, on_ok: Option<UnbindOkFn>) {
        let exchange = exchange.to_string();

        self.when_ready(false, move |queue| {
            let args = QueueUnbindArgs::new(&queue.name(), &exchange)
                .routing_key(opts.effective_routing_key())
                .args(opts.arguments.clone());

            debug!("Channel {} Queue.Unbind {:?}", queue.channel.number(), args);

            queue.channel.queue_unbind(args, on_ok);
        });
    }

    /// Deletes the queue. The callback gets the number of messages deleted with the queue.
    pub fn delete(&self, opts: DeleteOpts, on_ok: Option<Box<dyn FnOnce(u32)>>) {
        self.when_ready(false, move |queue| {
            let args = QueueDeleteArgs::new(&queue.name())
                .if_unused(opts.if_unused)
                .if_empty(opts.if_empty)
                .no_wait(opts.no_wait);

            debug!("Channel {} Queue.Delete {:?}", queue.channel.number(), args);

            let on_ok: Option<DeleteOkFn> = match on_ok {
                Some(f) if !opts.no_wait => Some(Box::new(move |ok: QueueDeleteOkArgs| f(ok.message_count))),
                _ => None,
            };

            queue.channel.queue_delete(args, on_ok);
        });
    }

    /// Purges the messages of the queue. The callback gets the number of purged messages.
    pub fn purge(&self, opts: PurgeOpts, on_ok: Option<Box<dyn FnOnce(u32)>>) {
        self.when_ready(false, move |queue| {
            let args = QueuePurgeArgs::new(&queue.name()).no_wait(opts.no_wait);

            debug!("Channel {} Queue.Purge {:?}", queue.channel.number(), args);

            let on_ok: Option<PurgeOkFn> = match on_ok {
                Some(f) if !opts.no_wait => Some(Box::new(move |ok: QueuePurgeOkArgs| f(ok.message_count))),
                _ => None,
            };

            queue.channel.queue_purge(args, on_ok);
        });
    }

    /// Gets one message from the queue by `Basic.Get`.
    pub fn pop(&self, opts: PopOpts, handler: Option<DeliveryHandler>) {
        self.when_ready(false, move |queue| {
            let args = BasicGetArgs::new(&queue.name()).no_ack(!opts.ack);
            let channel_number = queue.channel.number();
            let on_empty = opts.on_empty;
            let mut handler = handler;

            debug!("Channel {} Basic.Get {:?}", channel_number, args);

            queue.channel.basic_get(
                args,
                Box::new(move |reply: GetReply| match reply {
                    GetReply::Ok(delivery) => {
                        if let Some(handler) = handler.as_mut() {
                            handler.dispatch(channel_number, delivery);
                        }
                    }
                    GetReply::Empty => {
                        if let Some(f) = on_empty {
                            f();
                        }
                    }
                }),
            );
        });
    }

    /// Starts consuming the queue. Every delivered message goes to `handler`.
    ///
    /// A queue can have only one consumer, subscribing twice before the first consumer is
    /// cancelled is an error.
    pub fn subscribe(&self, opts: SubscribeOpts, handler: DeliveryHandler) -> Result<&Self> {
        {
            let mut st = self.state.borrow_mut();

            if !st.consumer.is_idle() {
                return precondition_failed(
                    self.channel.number(),
                    frame::BASIC_CONSUME,
                    "Already subscribed to the queue",
                );
            }

            // Placeholder until the consume is issued, a second subscribe fails in the meantime.
            st.consumer = ConsumerSlot::Pending;
        }

        self.when_ready(false, move |queue| {
            let consumer_tag = format!("metalmq-{}", rand::random::<u128>());
            let no_wait = opts.confirm.is_none() && opts.no_wait;
            let channel_number = queue.channel.number();
            let generation = queue.generation();
            let mut handler = handler;

            queue.state.borrow_mut().consumer = ConsumerSlot::Issued(consumer_tag.clone());

            let args = BasicConsumeArgs::default()
                .queue(&queue.name())
                .consumer_tag(&consumer_tag)
                .no_ack(!opts.ack)
                .exclusive(opts.exclusive)
                .no_local(opts.no_local)
                .no_wait(no_wait);

            debug!("Channel {} Basic.Consume {:?}", channel_number, args);

            let on_ok: Option<ConsumeOkFn> = if no_wait {
                None
            } else {
                let weak = queue.downgrade();
                let confirm = opts.confirm;

                Some(Box::new(move |consume_ok: BasicConsumeOkArgs| {
                    if let Some(queue) = weak.upgrade() {
                        queue.consume_ok(generation, &consume_ok);
                    }

                    if let Some(f) = confirm {
                        f(&consume_ok);
                    }
                }))
            };

            queue.channel.basic_consume(
                args,
                on_ok,
                Box::new(move |delivery: RawDelivery| handler.dispatch(channel_number, delivery)),
            );

            if no_wait {
                queue.state.borrow_mut().consumer = ConsumerSlot::Active(consumer_tag);
            }
        });

        Ok(self)
    }

    fn consume_ok(&self, generation: u64, consume_ok: &BasicConsumeOkArgs) {
        if self.is_stale(generation) {
            warn!("Ignore Basic.ConsumeOk {} of an earlier consumer", consume_ok.consumer_tag);

            return;
        }

        let mut st = self.state.borrow_mut();

        if let ConsumerSlot::Issued(_) = st.consumer {
            debug!("Consumer {} is active", consume_ok.consumer_tag);

            st.consumer = ConsumerSlot::Active(consume_ok.consumer_tag.clone());
        }
    }

    /// Cancels the consumer. The consumer slot is freed when the cancel completes: at once with
    /// no-wait (the default), at `Basic.CancelOk` otherwise. The callback gets the consumer tag.
    pub fn unsubscribe(&self, opts: UnsubscribeOpts, on_ok: Option<Box<dyn FnOnce(String)>>) {
        self.when_ready(false, move |queue| {
            let consumer_tag = match queue.consumer_tag() {
                Some(tag) => tag,
                None => {
                    warn!("Unsubscribe queue {:?} without consumer", queue.name());

                    return;
                }
            };

            let args = BasicCancelArgs::new(&consumer_tag).no_wait(opts.no_wait);
            let generation = queue.generation();

            debug!("Channel {} Basic.Cancel {:?}", queue.channel.number(), args);

            if opts.no_wait {
                queue.channel.basic_cancel(args, None);
                queue.cancelled(generation, &consumer_tag);

                if let Some(f) = on_ok {
                    f(consumer_tag);
                }

                return;
            }

            let weak = queue.downgrade();

            queue.channel.basic_cancel(
                args,
                Some(Box::new(move |cancel_ok: BasicCancelOkArgs| {
                    if let Some(queue) = weak.upgrade() {
                        queue.cancelled(generation, &cancel_ok.consumer_tag);
                    }

                    if let Some(f) = on_ok {
                        f(cancel_ok.consumer_tag);
                    }
                })),
            );
        });
    }

    fn cancelled(&self, generation: u64, consumer_tag: &str) {
        if self.is_stale(generation) {
            return;
        }

        let mut st = self.state.borrow_mut();

        if st.consumer.tag() == Some(consumer_tag) {
            debug!("Consumer {} is cancelled", consumer_tag);

            st.consumer = ConsumerSlot::Idle;
        }
    }

    /// Asks the number of messages and consumers of the queue by a passive declare. The
    /// callback is mandatory.
    pub fn status(&self, on_status: Option<Box<dyn FnOnce(u32, u32)>>) -> Result<()> {
        let on_status = match on_status {
            Some(f) => f,
            None => {
                return precondition_failed(
                    self.channel.number(),
                    frame::QUEUE_DECLARE,
                    "Queue status needs a callback",
                )
            }
        };

        self.when_ready(false, move |queue| {
            let args = {
                let st = queue.state.borrow();

                QueueDeclareArgs::default()
                    .name(&st.name)
                    .passive(true)
                    .durable(st.opts.durable)
                    .exclusive(st.opts.exclusive)
                    .auto_delete(st.opts.auto_delete)
            };

            debug!("Channel {} Queue.Declare (status) {:?}", queue.channel.number(), args);

            queue.channel.queue_declare(
                args,
                Some(Box::new(move |declare_ok: QueueDeclareOkArgs| {
                    on_status(declare_ok.message_count, declare_ok.consumer_count)
                })),
            );
        });

        Ok(())
    }

    /// Publishes a message to the queue via the default exchange.
    pub fn publish(&self, content: Content) {
        let server_named = self.server_named();

        self.when_ready(server_named, move |queue| {
            let args = BasicPublishArgs::new("").routing_key(&queue.name());

            debug!("Channel {} Basic.Publish {:?}", queue.channel.number(), args);

            queue.channel.basic_publish(args, content);
        });
    }

    /// Resolves when the current declaration is confirmed. The declaration is captured when this
    /// is called, so the future fails if the queue is reinitialized before the confirmation.
    pub fn declared(&self) -> impl Future<Output = Result<()>> {
        let rx = self.declaration_gate().wait();
        let name = self.name();

        async move { rx.await.map_err(|_| anyhow!("Declaration of queue {:?} is abandoned", name)) }
    }

    pub fn name(&self) -> String {
        self.state.borrow().name.clone()
    }

    pub fn server_named(&self) -> bool {
        self.state.borrow().server_named
    }

    pub fn state(&self) -> QueueStatus {
        self.state.borrow().status
    }

    pub fn options(&self) -> QueueOpts {
        self.state.borrow().opts.clone()
    }

    /// Snapshot of the requested bindings.
    pub fn bindings(&self) -> Bindings {
        self.state.borrow().bindings.clone()
    }

    pub fn consumer(&self) -> ConsumerSlot {
        self.state.borrow().consumer.clone()
    }

    /// `None` while the subscription waits for the channel, use [`Queue::subscribed`] to tell
    /// whether the consumer slot is taken.
    pub fn consumer_tag(&self) -> Option<String> {
        self.state.borrow().consumer.tag().map(str::to_string)
    }

    pub fn subscribed(&self) -> bool {
        !self.state.borrow().consumer.is_idle()
    }

    pub fn channel(&self) -> Rc<dyn Channel> {
        self.channel.clone()
    }

    pub fn channel_number(&self) -> ChannelNumber {
        self.channel.number()
    }

    pub fn is_declared(&self) -> bool {
        self.declaration_gate().is_fulfilled()
    }

    fn declaration_gate(&self) -> Deferred {
        self.state.borrow().declaration.clone()
    }

    fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation() != generation
    }

    fn downgrade(&self) -> WeakQueue {
        WeakQueue {
            channel: Rc::downgrade(&self.channel),
            state: Rc::downgrade(&self.state),
        }
    }

    /// Runs `op` once the channel is open, and if `wait_for_declaration` is set, once the
    /// declaration is confirmed as well. Operations of a dropped or reinitialized queue are
    /// skipped.
    fn when_ready<F>(&self, wait_for_declaration: bool, op: F)
    where
        F: FnOnce(Queue) + 'static,
    {
        let generation = self.generation();
        let weak = self.downgrade();
        let run = move || match weak.upgrade() {
            Some(queue) if !queue.is_stale(generation) => op(queue),
            Some(queue) => debug!("Skip operation of queue {:?} before reinitialization", queue.name()),
            None => debug!("Skip operation of a dropped queue"),
        };

        if wait_for_declaration {
            let gate = self.declaration_gate();

            self.channel.once_open(Box::new(move || gate.on_fulfilled(run)));
        } else {
            self.channel.once_open(Box::new(run));
        }
    }
}
