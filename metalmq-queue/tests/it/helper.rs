use anyhow::Result;
use metalmq_queue::frame::{ClassMethod, MethodFrameArgs};
use metalmq_queue::{ClientError, LoopbackChannel};
use std::cell::RefCell;
use std::rc::Rc;

pub type Log<T> = Rc<RefCell<Vec<T>>>;

pub fn log<T>() -> Log<T> {
    let _ = env_logger::builder().is_test(true).try_init();

    Rc::new(RefCell::new(vec![]))
}

pub fn open_channel() -> Rc<LoopbackChannel> {
    let channel = closed_channel();

    channel.open();
    channel
}

pub fn closed_channel() -> Rc<LoopbackChannel> {
    let _ = env_logger::builder().is_test(true).try_init();

    Rc::new(LoopbackChannel::new(1))
}

pub fn issued_class_methods(channel: &LoopbackChannel) -> Vec<ClassMethod> {
    channel.issued().iter().map(MethodFrameArgs::class_method).collect()
}

/// The last method issued on the channel.
pub fn last_issued(channel: &LoopbackChannel) -> MethodFrameArgs {
    channel.issued().pop().unwrap()
}

pub(crate) fn to_client_error<T: std::fmt::Debug>(result: Result<T>) -> ClientError {
    result.unwrap_err().downcast::<ClientError>().unwrap()
}
