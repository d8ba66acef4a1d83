use crate::model;
use std::fmt;

/// Represents an error raised by the queue. Precondition violations are reported with the
/// channel of the queue and the method which couldn't be issued.
#[derive(Clone, Debug)]
pub struct ClientError {
    pub channel: Option<model::ChannelNumber>,
    pub code: u16,
    pub message: String,
    pub class_method: model::ClassMethod,
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientError")
            .field("channel", &self.channel)
            .field("code", &self.code)
            .field("message", &self.message)
            .field("class_method", &format!("{:08X}", &self.class_method))
            .finish()
    }
}

impl std::error::Error for ClientError {}

/// Shorthand for creating errors as `anyhow::Result`.
#[macro_export]
macro_rules! client_error {
    ($channel:expr, $code:expr, $message:expr, $cm:expr) => {
        ::std::result::Result::Err(anyhow::Error::new($crate::error::ClientError {
            channel: $channel,
            code: $code,
            message: ::std::string::String::from($message),
            class_method: $cm,
        }))
    };
}

/// Error for calls which make no sense in the current state of the queue, they are programming
/// errors, so they are never retried.
pub(crate) fn precondition_failed<T>(
    channel: model::ChannelNumber,
    class_method: model::ClassMethod,
    message: &str,
) -> anyhow::Result<T> {
    client_error!(
        Some(channel),
        model::ChannelError::PreconditionFailed as u16,
        message,
        class_method
    )
}
