use metalmq_queue::frame::{self, BasicConsumeFlags, MethodFrameArgs};
use metalmq_queue::*;

use crate::helper;

#[test]
fn second_subscribe_fails_before_open() {
    let channel = helper::closed_channel();
    let queue = Queue::new(channel.clone(), "q", QueueOpts::default(), None).unwrap();

    queue
        .subscribe(SubscribeOpts::default(), DeliveryHandler::body(|_| {}))
        .unwrap();

    assert_eq!(queue.consumer(), ConsumerSlot::Pending);
    assert!(queue.subscribed());
    assert_eq!(queue.consumer_tag(), None);

    let result = queue.subscribe(SubscribeOpts::default(), DeliveryHandler::body(|_| {}));
    let err = helper::to_client_error(result);

    assert_eq!(err.code, 406);
    assert_eq!(err.class_method, frame::BASIC_CONSUME);
}

#[test]
fn second_subscribe_fails_before_confirm() {
    let channel = helper::open_channel();
    let queue = Queue::new(channel.clone(), "q", QueueOpts::default(), None).unwrap();

    queue
        .subscribe(SubscribeOpts::default(), DeliveryHandler::body(|_| {}))
        .unwrap();

    let tag = queue.consumer_tag().unwrap();

    assert!(tag.starts_with("metalmq-"));
    assert_eq!(queue.consumer(), ConsumerSlot::Issued(tag));

    let result = queue.subscribe(SubscribeOpts::default(), DeliveryHandler::body(|_| {}));

    assert_eq!(helper::to_client_error(result).code, 406);
}

#[test]
fn confirm_gets_consume_ok() {
    let channel = helper::open_channel();
    let queue = Queue::new(channel.clone(), "q", QueueOpts::default(), None).unwrap();
    let confirmed = helper::log();
    let c = confirmed.clone();

    queue
        .subscribe(
            SubscribeOpts::default()
                .no_wait(true)
                .confirm(move |ok| c.borrow_mut().push(ok.consumer_tag.clone())),
            DeliveryHandler::body(|_| {}),
        )
        .unwrap();

    // Confirmation needs a reply, no-wait is overridden.
    match helper::last_issued(&channel) {
        MethodFrameArgs::BasicConsume(args) => assert!(!args.is_no_wait()),
        other => panic!("Unexpected method {other:?}"),
    }

    channel.settle();

    let tag = queue.consumer_tag().unwrap();

    assert_eq!(queue.consumer(), ConsumerSlot::Active(tag.clone()));
    assert_eq!(*confirmed.borrow(), vec![tag]);
}

#[test]
fn no_wait_consumer_is_active_at_once() {
    let channel = helper::open_channel();
    let queue = Queue::new(channel.clone(), "q", QueueOpts::default(), None).unwrap();

    queue
        .subscribe(SubscribeOpts::default().no_wait(true), DeliveryHandler::body(|_| {}))
        .unwrap();

    assert!(matches!(queue.consumer(), ConsumerSlot::Active(_)));
}

#[test]
fn consume_flags() {
    let channel = helper::open_channel();
    let queue = Queue::new(channel.clone(), "q", QueueOpts::default(), None).unwrap();

    queue
        .subscribe(
            SubscribeOpts::default().exclusive(true).no_local(true),
            DeliveryHandler::body(|_| {}),
        )
        .unwrap();

    match helper::last_issued(&channel) {
        MethodFrameArgs::BasicConsume(args) => {
            assert_eq!(args.queue, "q");
            assert!(args.flags.contains(BasicConsumeFlags::NO_ACK));
            assert!(args.flags.contains(BasicConsumeFlags::EXCLUSIVE));
            assert!(args.flags.contains(BasicConsumeFlags::NO_LOCAL));
        }
        other => panic!("Unexpected method {other:?}"),
    }

    queue.unsubscribe(UnsubscribeOpts::default(), None);
    queue
        .subscribe(SubscribeOpts::default().ack(true), DeliveryHandler::body(|_| {}))
        .unwrap();

    match helper::last_issued(&channel) {
        MethodFrameArgs::BasicConsume(args) => assert!(!args.flags.contains(BasicConsumeFlags::NO_ACK)),
        other => panic!("Unexpected method {other:?}"),
    }
}

#[test]
fn deliveries_reach_the_handler() {
    let channel = helper::open_channel();
    let queue = Queue::new(channel.clone(), "events", QueueOpts::default(), None).unwrap();
    let bodies = helper::log();
    let b = bodies.clone();

    queue.publish(Content::from("before"));
    queue
        .subscribe(
            SubscribeOpts::default(),
            DeliveryHandler::body(move |body| b.borrow_mut().push(String::from_utf8(body).unwrap())),
        )
        .unwrap();
    queue.publish(Content::from("after"));

    channel.settle();

    assert_eq!(*bodies.borrow(), vec!["before", "after"]);
}

#[test]
fn metadata_of_consumer_delivery() {
    let channel = helper::open_channel();
    let queue = Queue::new(channel.clone(), "events", QueueOpts::default(), None).unwrap();
    let seen = helper::log();
    let s = seen.clone();

    queue
        .subscribe(
            SubscribeOpts::default(),
            DeliveryHandler::with_metadata(move |metadata, body| s.borrow_mut().push((metadata, body))),
        )
        .unwrap();
    queue.publish(Content::from("m").content_type("text/plain").header("k", "v"));

    channel.settle();

    let seen = seen.borrow();
    let (metadata, body) = &seen[0];

    assert_eq!(body, b"m");
    assert_eq!(metadata.channel, 1);
    assert_eq!(metadata.consumer_tag, queue.consumer_tag());
    assert_eq!(metadata.exchange, "");
    assert_eq!(metadata.routing_key, "events");
    assert_eq!(metadata.message_count, None);
    assert_eq!(metadata.properties.content_type.as_deref(), Some("text/plain"));
    assert_eq!(metadata.properties.headers.get("k").map(String::as_str), Some("v"));
}

#[test]
fn wide_handler_gets_consumer_tag() {
    let channel = helper::open_channel();
    let queue = Queue::new(channel.clone(), "events", QueueOpts::default(), None).unwrap();
    let seen = helper::log();
    let s = seen.clone();

    queue
        .subscribe(
            SubscribeOpts::default(),
            DeliveryHandler::wide(move |_, _, delivery_tag, redelivered, exchange, routing_key, consumer_tag| {
                s.borrow_mut()
                    .push((delivery_tag, redelivered, exchange, routing_key, consumer_tag))
            }),
        )
        .unwrap();
    queue.publish(Content::from("m"));

    channel.settle();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert!(!seen[0].1);
    assert_eq!(seen[0].3, "events");
    assert_eq!(seen[0].4, queue.consumer_tag());
}

#[test]
fn unsubscribe_with_no_wait_frees_the_slot() {
    let channel = helper::open_channel();
    let queue = Queue::new(channel.clone(), "q", QueueOpts::default(), None).unwrap();
    let cancelled = helper::log();
    let c = cancelled.clone();

    queue
        .subscribe(SubscribeOpts::default(), DeliveryHandler::body(|_| {}))
        .unwrap();
    channel.settle();

    let tag = queue.consumer_tag().unwrap();

    queue.unsubscribe(
        UnsubscribeOpts::default(),
        Some(Box::new(move |tag: String| c.borrow_mut().push(tag))),
    );

    match helper::last_issued(&channel) {
        MethodFrameArgs::BasicCancel(args) => {
            assert_eq!(args.consumer_tag, tag);
            assert!(args.no_wait);
        }
        other => panic!("Unexpected method {other:?}"),
    }

    assert_eq!(queue.consumer(), ConsumerSlot::Idle);
    assert_eq!(*cancelled.borrow(), vec![tag]);

    queue
        .subscribe(SubscribeOpts::default(), DeliveryHandler::body(|_| {}))
        .unwrap();
}

#[test]
fn unsubscribe_waits_for_cancel_ok() {
    let channel = helper::open_channel();
    let queue = Queue::new(channel.clone(), "q", QueueOpts::default(), None).unwrap();
    let cancelled = helper::log();
    let c = cancelled.clone();

    queue
        .subscribe(SubscribeOpts::default(), DeliveryHandler::body(|_| {}))
        .unwrap();
    channel.settle();

    queue.unsubscribe(
        UnsubscribeOpts::default().no_wait(false),
        Some(Box::new(move |tag: String| c.borrow_mut().push(tag))),
    );

    assert!(queue.subscribed());
    assert!(cancelled.borrow().is_empty());

    channel.settle();

    assert!(!queue.subscribed());
    assert_eq!(cancelled.borrow().len(), 1);
}

#[test]
fn unsubscribe_without_consumer_does_nothing() {
    let channel = helper::open_channel();
    let queue = Queue::new(channel.clone(), "q", QueueOpts::default(), None).unwrap();

    queue.unsubscribe(
        UnsubscribeOpts::default(),
        Some(Box::new(|_: String| panic!("nothing to cancel"))),
    );

    assert_eq!(helper::issued_class_methods(&channel), vec![frame::QUEUE_DECLARE]);
}

#[test]
fn deliveries_stop_after_unsubscribe() {
    let channel = helper::open_channel();
    let queue = Queue::new(channel.clone(), "q", QueueOpts::default(), None).unwrap();
    let bodies = helper::log();
    let b = bodies.clone();

    queue
        .subscribe(
            SubscribeOpts::default(),
            DeliveryHandler::body(move |body| b.borrow_mut().push(body)),
        )
        .unwrap();
    queue.publish(Content::from("one"));
    channel.settle();

    queue.unsubscribe(UnsubscribeOpts::default(), None);
    queue.publish(Content::from("two"));
    channel.settle();

    assert_eq!(bodies.borrow().len(), 1);
    assert_eq!(channel.message_count("q"), Some(1));
}

#[test]
fn consumer_tag_is_generated_when_consume_is_issued() {
    let channel = helper::closed_channel();
    let queue = Queue::new(channel.clone(), "q", QueueOpts::default(), None).unwrap();

    queue
        .subscribe(SubscribeOpts::default(), DeliveryHandler::body(|_| {}))
        .unwrap();

    assert!(queue.subscribed());
    assert!(queue.consumer_tag().is_none());

    channel.open();

    let tag = queue.consumer_tag().unwrap();

    assert!(tag.starts_with("metalmq-"));
    assert_eq!(queue.consumer(), ConsumerSlot::Issued(tag.clone()));

    channel.settle();

    assert_eq!(queue.consumer(), ConsumerSlot::Active(tag));
}
