//! What a queue needs from the channel it was declared on.
//!
//! The channel owns the connection, the frame codec and its own open/close state machine. A
//! queue only asks it to run code once it is open and to issue methods. Completion callbacks are
//! called by the channel when the corresponding `*-Ok` method arrives, methods sent with no-wait
//! never get their callback called.
use crate::delivery::{GetReply, RawDelivery};
use crate::frame::{
    BasicCancelArgs, BasicCancelOkArgs, BasicConsumeArgs, BasicConsumeOkArgs, BasicGetArgs, BasicPublishArgs,
    QueueBindArgs, QueueDeclareArgs, QueueDeclareOkArgs, QueueDeleteArgs, QueueDeleteOkArgs, QueuePurgeArgs,
    QueuePurgeOkArgs, QueueUnbindArgs,
};
use crate::gate::Continuation;
use crate::message::Content;
use crate::model::ChannelNumber;

pub type DeclareOkFn = Box<dyn FnOnce(QueueDeclareOkArgs)>;
pub type BindOkFn = Box<dyn FnOnce()>;
pub type UnbindOkFn = Box<dyn FnOnce()>;
pub type DeleteOkFn = Box<dyn FnOnce(QueueDeleteOkArgs)>;
pub type PurgeOkFn = Box<dyn FnOnce(QueuePurgeOkArgs)>;
pub type ConsumeOkFn = Box<dyn FnOnce(BasicConsumeOkArgs)>;
pub type CancelOkFn = Box<dyn FnOnce(BasicCancelOkArgs)>;
pub type GetReplyFn = Box<dyn FnOnce(GetReply)>;
/// Receives every `Basic.Deliver` of a consumer until it is cancelled.
pub type DeliverySink = Box<dyn FnMut(RawDelivery)>;

pub trait Channel {
    fn number(&self) -> ChannelNumber;

    /// Identifier of the connection the channel belongs to.
    fn connection_id(&self) -> String;

    fn is_open(&self) -> bool;

    /// Runs `continuation` when the channel is open, immediately if it is open already.
    /// Continuations registered before opening run in registration order.
    fn once_open(&self, continuation: Continuation);

    fn queue_declare(&self, args: QueueDeclareArgs, on_ok: Option<DeclareOkFn>);

    fn queue_bind(&self, args: QueueBindArgs, on_ok: Option<BindOkFn>);

    fn queue_unbind(&self, args: QueueUnbindArgs, on_ok: Option<UnbindOkFn>);

    fn queue_delete(&self, args: QueueDeleteArgs, on_ok: Option<DeleteOkFn>);

    fn queue_purge(&self, args: QueuePurgeArgs, on_ok: Option<PurgeOkFn>);

    fn basic_consume(&self, args: BasicConsumeArgs, on_ok: Option<ConsumeOkFn>, deliveries: DeliverySink);

    fn basic_cancel(&self, args: BasicCancelArgs, on_ok: Option<CancelOkFn>);

    fn basic_get(&self, args: BasicGetArgs, on_reply: GetReplyFn);

    fn basic_publish(&self, args: BasicPublishArgs, content: Content);
}
