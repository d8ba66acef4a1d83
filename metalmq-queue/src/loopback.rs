//! In-memory channel.
//!
//! `LoopbackChannel` answers every method itself, without a server. Methods take effect when
//! they are issued, but their replies (the `*-Ok` callbacks and the deliveries) are queued and
//! run only when [`LoopbackChannel::settle`] is called, so an application or a test decides when
//! the "server" answers. The channel is not open until [`LoopbackChannel::open`] is called.
//!
//! Messages can be published through the default exchange only, the channel doesn't route by
//! exchanges. Messages are acked automatically when they are delivered.
use crate::channel::{
    BindOkFn, CancelOkFn, Channel, ConsumeOkFn, DeclareOkFn, DeleteOkFn, DeliverySink, GetReplyFn, PurgeOkFn,
    UnbindOkFn,
};
use crate::delivery::{DeliveryMethod, GetReply, RawDelivery};
use crate::frame::{
    BasicCancelArgs, BasicCancelOkArgs, BasicConsumeArgs, BasicConsumeOkArgs, BasicDeliverArgs, BasicGetArgs,
    BasicGetOkArgs, BasicPublishArgs, MethodFrameArgs, QueueBindArgs, QueueDeclareArgs, QueueDeclareOkArgs,
    QueueDeleteArgs, QueueDeleteOkArgs, QueuePurgeArgs, QueuePurgeOkArgs, QueueUnbindArgs,
};
use crate::gate::{Continuation, Deferred};
use crate::message::Content;
use crate::model::ChannelNumber;
use log::{debug, info, trace, warn};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

type Reply = Box<dyn FnOnce(&LoopbackChannel)>;

struct LoopbackConsumer {
    queue: String,
    sink: Rc<RefCell<DeliverySink>>,
}

#[derive(Default)]
struct LoopbackState {
    issued: Vec<MethodFrameArgs>,
    replies: VecDeque<Reply>,
    queues: HashMap<String, VecDeque<Content>>,
    /// Consumers by consumer tag.
    consumers: HashMap<String, LoopbackConsumer>,
    /// Empty queue name refers to the queue declared last on the channel.
    last_queue: Option<String>,
    delivery_tag: u64,
}

impl LoopbackState {
    fn resolve(&self, queue: &str) -> String {
        if queue.is_empty() {
            self.last_queue.clone().unwrap_or_default()
        } else {
            queue.to_string()
        }
    }

    fn next_delivery_tag(&mut self) -> u64 {
        self.delivery_tag += 1;
        self.delivery_tag
    }

    /// Tag of a consumer of the queue.
    fn consumer_of(&self, queue: &str) -> Option<String> {
        self.consumers
            .iter()
            .find(|(_, c)| c.queue == queue)
            .map(|(tag, _)| tag.clone())
    }

    fn consumer_count(&self, queue: &str) -> u32 {
        self.consumers.values().filter(|c| c.queue == queue).count() as u32
    }
}

pub struct LoopbackChannel {
    number: ChannelNumber,
    connection_id: String,
    open: RefCell<Deferred>,
    state: RefCell<LoopbackState>,
}

impl LoopbackChannel {
    pub fn new(number: ChannelNumber) -> Self {
        LoopbackChannel {
            number,
            connection_id: format!("loopback-{}", uuid::Uuid::new_v4().as_hyphenated()),
            open: RefCell::new(Deferred::new()),
            state: RefCell::new(LoopbackState::default()),
        }
    }

    /// Opens the channel, the operations waiting for that are issued in order.
    pub fn open(&self) {
        info!("Loopback channel {} is open", self.number);

        let gate = self.open.borrow().clone();

        gate.fire();
    }

    /// Closes the channel as a server would do after a channel error. Unanswered replies and
    /// consumers are dropped, the queues and their messages are kept. The channel can be opened
    /// again.
    pub fn close(&self, code: u16, text: &str) {
        warn!("Loopback channel {} is closed with {} {:?}", self.number, code, text);

        *self.open.borrow_mut() = Deferred::new();

        let mut st = self.state.borrow_mut();

        st.replies.clear();
        st.consumers.clear();
        st.last_queue = None;
    }

    /// Runs the queued replies, including the ones queued while settling. Returns the number of
    /// replies run.
    pub fn settle(&self) -> usize {
        let mut count = 0;

        while self.reply_next() {
            count += 1;
        }

        count
    }

    /// Runs the oldest queued reply. Returns `false` if there was none.
    pub fn reply_next(&self) -> bool {
        let reply = self.state.borrow_mut().replies.pop_front();

        match reply {
            Some(reply) => {
                reply(self);

                true
            }
            None => false,
        }
    }

    pub fn pending_replies(&self) -> usize {
        self.state.borrow().replies.len()
    }

    /// The methods issued on the channel so far.
    pub fn issued(&self) -> Vec<MethodFrameArgs> {
        self.state.borrow().issued.clone()
    }

    /// Returns and forgets the issued methods.
    pub fn take_issued(&self) -> Vec<MethodFrameArgs> {
        std::mem::take(&mut self.state.borrow_mut().issued)
    }

    /// Number of messages waiting in a queue, `None` if the queue doesn't exist.
    pub fn message_count(&self, queue: &str) -> Option<usize> {
        self.state.borrow().queues.get(queue).map(VecDeque::len)
    }

    pub fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.borrow().queues.keys().cloned().collect();

        names.sort();
        names
    }

    fn record(&self, method: MethodFrameArgs) {
        trace!("Loopback channel {} got {:?}", self.number, method);

        self.state.borrow_mut().issued.push(method);
    }

    fn reply(&self, reply: Reply) {
        self.state.borrow_mut().replies.push_back(reply);
    }

    /// Queues the delivery of a message to a consumer. If the consumer is cancelled by the time
    /// the delivery runs, the message goes back to the queue.
    fn schedule_delivery(&self, consumer_tag: String, queue: String, content: Content) {
        let delivery_tag = self.state.borrow_mut().next_delivery_tag();

        self.reply(Box::new(move |channel: &LoopbackChannel| {
            let sink = channel
                .state
                .borrow()
                .consumers
                .get(&consumer_tag)
                .map(|c| c.sink.clone());

            match sink {
                Some(sink) => {
                    let delivery = RawDelivery {
                        method: DeliveryMethod::Deliver(BasicDeliverArgs {
                            consumer_tag,
                            delivery_tag,
                            redelivered: false,
                            exchange_name: "".to_string(),
                            routing_key: queue,
                        }),
                        headers: Some(Box::new(content.properties)),
                        body: content.body,
                    };

                    (*sink.borrow_mut())(delivery);
                }
                None => {
                    debug!("Consumer {} is gone, requeue message", consumer_tag);

                    channel
                        .state
                        .borrow_mut()
                        .queues
                        .entry(queue)
                        .or_default()
                        .push_front(content);
                }
            }
        }));
    }
}

impl Channel for LoopbackChannel {
    fn number(&self) -> ChannelNumber {
        self.number
    }

    fn connection_id(&self) -> String {
        self.connection_id.clone()
    }

    fn is_open(&self) -> bool {
        self.open.borrow().is_fulfilled()
    }

    fn once_open(&self, continuation: Continuation) {
        let gate = self.open.borrow().clone();

        gate.on_fulfilled(continuation);
    }

    fn queue_declare(&self, args: QueueDeclareArgs, on_ok: Option<DeclareOkFn>) {
        self.record(MethodFrameArgs::QueueDeclare(args.clone()));

        let declare_ok = {
            let mut st = self.state.borrow_mut();
            let name = if !args.name.is_empty() {
                args.name.clone()
            } else if args.is_passive() {
                st.resolve("")
            } else {
                format!("amq.gen-{}", uuid::Uuid::new_v4().simple())
            };

            let message_count = if args.is_passive() {
                st.queues.get(&name).map(VecDeque::len).unwrap_or_default()
            } else {
                st.queues.entry(name.clone()).or_default().len()
            };

            st.last_queue = Some(name.clone());

            QueueDeclareOkArgs::default()
                .name(&name)
                .message_count(message_count as u32)
                .consumer_count(st.consumer_count(&name))
        };

        if let (false, Some(f)) = (args.is_no_wait(), on_ok) {
            self.reply(Box::new(move |_: &LoopbackChannel| f(declare_ok)));
        }
    }

    fn queue_bind(&self, args: QueueBindArgs, on_ok: Option<BindOkFn>) {
        let no_wait = args.no_wait;

        self.record(MethodFrameArgs::QueueBind(args));

        if let (false, Some(f)) = (no_wait, on_ok) {
            self.reply(Box::new(move |_: &LoopbackChannel| f()));
        }
    }

    fn queue_unbind(&self, args: QueueUnbindArgs, on_ok: Option<UnbindOkFn>) {
        self.record(MethodFrameArgs::QueueUnbind(args));

        if let Some(f) = on_ok {
            self.reply(Box::new(move |_: &LoopbackChannel| f()));
        }
    }

    fn queue_delete(&self, args: QueueDeleteArgs, on_ok: Option<DeleteOkFn>) {
        self.record(MethodFrameArgs::QueueDelete(args.clone()));

        let message_count = {
            let mut st = self.state.borrow_mut();
            let name = st.resolve(&args.queue_name);

            st.consumers.retain(|_, c| c.queue != name);
            st.queues.remove(&name).map(|q| q.len()).unwrap_or_default() as u32
        };

        if let (false, Some(f)) = (args.is_no_wait(), on_ok) {
            self.reply(Box::new(move |_: &LoopbackChannel| f(QueueDeleteOkArgs { message_count })));
        }
    }

    fn queue_purge(&self, args: QueuePurgeArgs, on_ok: Option<PurgeOkFn>) {
        self.record(MethodFrameArgs::QueuePurge(args.clone()));

        let message_count = {
            let mut st = self.state.borrow_mut();
            let name = st.resolve(&args.queue_name);

            match st.queues.get_mut(&name) {
                Some(q) => {
                    let count = q.len() as u32;
                    q.clear();
                    count
                }
                None => 0,
            }
        };

        if let (false, Some(f)) = (args.no_wait, on_ok) {
            self.reply(Box::new(move |_: &LoopbackChannel| f(QueuePurgeOkArgs { message_count })));
        }
    }

    fn basic_consume(&self, args: BasicConsumeArgs, on_ok: Option<ConsumeOkFn>, deliveries: DeliverySink) {
        self.record(MethodFrameArgs::BasicConsume(args.clone()));

        let (queue, waiting) = {
            let mut st = self.state.borrow_mut();
            let queue = st.resolve(&args.queue);

            st.consumers.insert(
                args.consumer_tag.clone(),
                LoopbackConsumer {
                    queue: queue.clone(),
                    sink: Rc::new(RefCell::new(deliveries)),
                },
            );

            let waiting: Vec<Content> = st.queues.entry(queue.clone()).or_default().drain(..).collect();

            (queue, waiting)
        };

        if let (false, Some(f)) = (args.is_no_wait(), on_ok) {
            let consume_ok = BasicConsumeOkArgs::new(&args.consumer_tag);

            self.reply(Box::new(move |_: &LoopbackChannel| f(consume_ok)));
        }

        for content in waiting {
            self.schedule_delivery(args.consumer_tag.clone(), queue.clone(), content);
        }
    }

    fn basic_cancel(&self, args: BasicCancelArgs, on_ok: Option<CancelOkFn>) {
        self.record(MethodFrameArgs::BasicCancel(args.clone()));

        self.state.borrow_mut().consumers.remove(&args.consumer_tag);

        if let (false, Some(f)) = (args.no_wait, on_ok) {
            let cancel_ok = BasicCancelOkArgs {
                consumer_tag: args.consumer_tag,
            };

            self.reply(Box::new(move |_: &LoopbackChannel| f(cancel_ok)));
        }
    }

    fn basic_get(&self, args: BasicGetArgs, on_reply: GetReplyFn) {
        self.record(MethodFrameArgs::BasicGet(args.clone()));

        let reply = {
            let mut st = self.state.borrow_mut();
            let name = st.resolve(&args.queue);
            let content = st.queues.get_mut(&name).and_then(VecDeque::pop_front);

            match content {
                Some(content) => {
                    let message_count = st.queues.get(&name).map(VecDeque::len).unwrap_or_default() as u32;

                    GetReply::Ok(RawDelivery {
                        method: DeliveryMethod::GetOk(BasicGetOkArgs {
                            delivery_tag: st.next_delivery_tag(),
                            redelivered: false,
                            exchange_name: "".to_string(),
                            routing_key: name,
                            message_count,
                        }),
                        headers: Some(Box::new(content.properties)),
                        body: content.body,
                    })
                }
                None => GetReply::Empty,
            }
        };

        self.reply(Box::new(move |_: &LoopbackChannel| on_reply(reply)));
    }

    fn basic_publish(&self, args: BasicPublishArgs, content: Content) {
        self.record(MethodFrameArgs::BasicPublish(args.clone()));

        if !args.exchange_name.is_empty() {
            warn!(
                "Loopback channel doesn't route by exchange {:?}, message is dropped",
                args.exchange_name
            );

            return;
        }

        let consumer = {
            let st = self.state.borrow();

            if !st.queues.contains_key(&args.routing_key) {
                debug!("Queue {:?} doesn't exist, message is dropped", args.routing_key);

                return;
            }

            st.consumer_of(&args.routing_key)
        };

        match consumer {
            Some(tag) => self.schedule_delivery(tag, args.routing_key, content),
            None => {
                if let Some(q) = self.state.borrow_mut().queues.get_mut(&args.routing_key) {
                    q.push_back(content);
                }
            }
        }
    }
}
