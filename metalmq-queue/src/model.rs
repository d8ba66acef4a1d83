/// AMQP channel number
pub type ChannelNumber = u16;
/// AMQP class id method id number
pub type ClassMethod = crate::frame::ClassMethod;

/// Error codes in channel scope.
#[derive(Debug)]
pub enum ChannelError {
    /// The work on resource is refused mostly because of validation errors.
    PreconditionFailed = 406,
}

/// Lifecycle of a queue as seen from the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueStatus {
    /// Declaration is sent or about to be sent and we wait for `Queue.DeclareOk`.
    Opening,
    /// The queue is declared (or we didn't want to wait for the confirmation).
    Opened,
    /// Bindings were requested at least once. It doesn't go back to `Opened`.
    Unbound,
}
