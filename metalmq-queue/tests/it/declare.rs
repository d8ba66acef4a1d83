use metalmq_queue::frame::{self, MethodFrameArgs, QueueDeclareFlags};
use metalmq_queue::*;

use crate::helper;

#[test]
fn named_queue_without_callback_is_opened_at_once() {
    let channel = helper::open_channel();
    let queue = Queue::new(channel.clone(), "jobs", QueueOpts::default().durable(true), None).unwrap();

    assert_eq!(queue.options().no_wait, Some(true));
    assert_eq!(queue.state(), QueueStatus::Opened);
    assert_eq!(queue.name(), "jobs");
    assert!(!queue.server_named());

    // The declaration still asks for a reply, the gate is fired by that.
    match helper::last_issued(&channel) {
        MethodFrameArgs::QueueDeclare(args) => {
            assert_eq!(args.name, "jobs");
            assert!(args.flags.contains(QueueDeclareFlags::DURABLE));
            assert!(!args.is_no_wait());
        }
        other => panic!("Unexpected method {other:?}"),
    }

    assert!(!queue.is_declared());
    channel.settle();
    assert!(queue.is_declared());
}

#[test]
fn server_named_queue_gets_its_name_from_declare_ok() {
    let channel = helper::open_channel();
    let names = helper::log();
    let n = names.clone();

    let queue = Queue::new(
        channel.clone(),
        "",
        QueueOpts::default().exclusive(true),
        Some(DeclareHandler::queue(move |q| n.borrow_mut().push(q.name()))),
    )
    .unwrap();

    assert_eq!(queue.options().no_wait, Some(false));
    assert_eq!(queue.state(), QueueStatus::Opening);
    assert!(queue.server_named());
    assert_eq!(queue.name(), "");

    channel.settle();

    assert_eq!(queue.state(), QueueStatus::Opened);
    assert!(queue.name().starts_with("amq.gen-"));
    assert_eq!(*names.borrow(), vec![queue.name()]);
}

#[test]
fn server_named_queue_without_callback_waits_for_declare_ok() {
    let channel = helper::open_channel();
    let queue = Queue::new(channel.clone(), "", QueueOpts::default(), None).unwrap();

    assert_eq!(queue.options().no_wait, Some(false));
    assert_eq!(queue.state(), QueueStatus::Opening);

    channel.settle();

    assert_eq!(queue.state(), QueueStatus::Opened);
    assert!(queue.is_declared());
}

#[test]
fn server_named_queue_cannot_be_no_wait() {
    let channel = helper::open_channel();
    let result = Queue::new(channel.clone(), "", QueueOpts::default().no_wait(true), None);

    let err = helper::to_client_error(result);

    assert_eq!(err.channel, Some(1));
    assert_eq!(err.code, ChannelError::PreconditionFailed as u16);
    assert_eq!(err.class_method, frame::QUEUE_DECLARE);
    assert!(channel.issued().is_empty());
}

#[test]
fn named_queue_with_callback_waits_for_declare_ok() {
    let channel = helper::open_channel();
    let declared = helper::log();
    let d = declared.clone();

    // Someone else already put a message into the queue.
    channel.queue_declare(frame::QueueDeclareArgs::default().name("orders").no_wait(true), None);
    channel.basic_publish(frame::BasicPublishArgs::new("").routing_key("orders"), Content::from("o-1"));

    let queue = Queue::new(
        channel.clone(),
        "orders",
        QueueOpts::default(),
        Some(DeclareHandler::with_declare_ok(move |q, ok| {
            d.borrow_mut().push((q.name(), ok.message_count, ok.consumer_count))
        })),
    )
    .unwrap();

    assert_eq!(queue.options().no_wait, Some(false));
    assert_eq!(queue.state(), QueueStatus::Opening);
    assert!(declared.borrow().is_empty());

    channel.settle();

    assert_eq!(queue.state(), QueueStatus::Opened);
    assert_eq!(*declared.borrow(), vec![("orders".to_string(), 1, 0)]);
}

#[test]
fn no_wait_callback_is_called_at_construction() {
    let channel = helper::closed_channel();
    let declared = helper::log();
    let d = declared.clone();

    let queue = Queue::new(
        channel.clone(),
        "audit",
        QueueOpts::default().no_wait(true),
        Some(DeclareHandler::with_declare_ok(move |q, ok| {
            d.borrow_mut().push((q.name(), ok.name.clone(), ok.message_count))
        })),
    )
    .unwrap();

    assert_eq!(
        *declared.borrow(),
        vec![("audit".to_string(), "audit".to_string(), 0)]
    );
    assert_eq!(queue.state(), QueueStatus::Opened);
    assert!(channel.issued().is_empty());
    assert!(!queue.is_declared());

    channel.open();

    match helper::last_issued(&channel) {
        MethodFrameArgs::QueueDeclare(args) => assert!(args.is_no_wait()),
        other => panic!("Unexpected method {other:?}"),
    }

    // No reply arrives for a no-wait declare.
    assert!(queue.is_declared());
    assert_eq!(channel.pending_replies(), 0);
}

#[test]
fn operations_before_open_are_replayed_in_order() {
    let channel = helper::closed_channel();
    let queue = Queue::new(channel.clone(), "tasks", QueueOpts::default(), None).unwrap();

    queue.bind("work", BindOpts::default().routing_key("task.*"), None);
    queue
        .subscribe(SubscribeOpts::default(), DeliveryHandler::body(|_| {}))
        .unwrap();
    queue.purge(PurgeOpts::default(), None);
    queue.pop(PopOpts::default(), None);

    assert!(channel.issued().is_empty());

    channel.open();

    assert_eq!(
        helper::issued_class_methods(&channel),
        vec![
            frame::QUEUE_DECLARE,
            frame::QUEUE_BIND,
            frame::BASIC_CONSUME,
            frame::QUEUE_PURGE,
            frame::BASIC_GET
        ]
    );
}

#[test]
fn declare_ok_does_not_leave_unbound() {
    let channel = helper::open_channel();
    let queue = Queue::new(
        channel.clone(),
        "",
        QueueOpts::default(),
        Some(DeclareHandler::queue(|_| {})),
    )
    .unwrap();

    queue.bind("logs", BindOpts::default(), None);
    assert_eq!(queue.state(), QueueStatus::Unbound);

    channel.settle();

    assert_eq!(queue.state(), QueueStatus::Unbound);
    assert!(queue.is_declared());
}

#[test]
fn dropped_queue_issues_nothing() {
    let channel = helper::closed_channel();
    let queue = Queue::new(channel.clone(), "tmp", QueueOpts::default(), None).unwrap();

    queue.pop(PopOpts::default(), None);
    drop(queue);

    channel.open();

    assert!(channel.issued().is_empty());
}

#[tokio::test]
async fn declared_resolves_after_declare_ok() {
    let channel = helper::open_channel();
    let queue = Queue::new(channel.clone(), "", QueueOpts::default(), None).unwrap();

    let rx = queue.declared();

    channel.settle();

    assert!(rx.await.is_ok());
    assert!(!queue.name().is_empty());
}
