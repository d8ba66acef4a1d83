//! Building the queues of a topology file on a loopback channel.
use crate::config::{Config, QueueConfig};
use anyhow::Result;
use log::info;
use metalmq_queue::{
    BindOpts, Content, DeclareHandler, DeleteOpts, DeliveryHandler, LoopbackChannel, Metadata, PopOpts, PurgeOpts,
    Queue, QueueOpts, SubscribeOpts,
};
use std::rc::Rc;

pub(crate) struct Topology {
    pub(crate) channel: Rc<LoopbackChannel>,
    pub(crate) queues: Vec<Queue>,
}

/// Requests every operation of the topology and settles the replies. With `open_late` the
/// channel is opened only after all the operations are requested.
pub(crate) fn build(config: &Config, open_late: bool) -> Result<Topology> {
    let channel = Rc::new(LoopbackChannel::new(config.channel));

    if !open_late {
        channel.open();
    }

    let mut queues = vec![];

    for queue_config in &config.queues {
        queues.push(declare(&channel, queue_config)?);
    }

    if open_late {
        info!("Open channel {} with {} queues waiting", config.channel, queues.len());

        channel.open();
    }

    let replies = channel.settle();

    info!("Settled {} replies", replies);

    Ok(Topology { channel, queues })
}

fn label(config: &QueueConfig) -> String {
    if config.name.is_empty() {
        "(server-named)".to_string()
    } else {
        config.name.clone()
    }
}

fn log_delivery(metadata: Metadata, body: Vec<u8>) {
    info!(
        "Message #{} from {:?} {:?}: {}",
        metadata.delivery_tag,
        metadata.exchange,
        metadata.routing_key,
        String::from_utf8_lossy(&body)
    );
}

fn declare(channel: &Rc<LoopbackChannel>, config: &QueueConfig) -> Result<Queue> {
    let opts = QueueOpts::default()
        .durable(config.durable)
        .exclusive(config.exclusive)
        .auto_delete(config.auto_delete);

    let queue = Queue::new(
        channel.clone(),
        &config.name,
        opts,
        Some(DeclareHandler::with_declare_ok(|queue, declare_ok| {
            info!(
                "Queue {} is declared, messages: {}, consumers: {}",
                queue.name(),
                declare_ok.message_count,
                declare_ok.consumer_count
            )
        })),
    )?;

    for binding in &config.bindings {
        let mut opts = BindOpts::default();

        if let Some(routing_key) = &binding.routing_key {
            opts = opts.routing_key(routing_key);
        }

        let exchange = binding.exchange.clone();
        let name = label(config);

        queue.bind(
            &binding.exchange,
            opts,
            Some(Box::new(move || info!("Queue {} is bound to {}", name, exchange))),
        );
    }

    for body in &config.publish {
        queue.publish(Content::from(body.as_str()));
    }

    if config.consume {
        queue.subscribe(
            SubscribeOpts::default().confirm(|consume_ok| info!("Consumer {} is active", consume_ok.consumer_tag)),
            DeliveryHandler::with_metadata(log_delivery),
        )?;
    }

    for _ in 0..config.pop {
        let name = label(config);

        queue.pop(
            PopOpts::default().on_empty(move || info!("Queue {} is empty", name)),
            Some(DeliveryHandler::with_metadata(log_delivery)),
        );
    }

    if config.status {
        let name = label(config);

        queue.status(Some(Box::new(move |messages: u32, consumers: u32| {
            info!("Queue {} has {} messages and {} consumers", name, messages, consumers)
        })))?;
    }

    if config.purge {
        let name = label(config);

        queue.purge(
            PurgeOpts::default(),
            Some(Box::new(move |count: u32| info!("Purged {} messages from {}", count, name))),
        );
    }

    if config.delete {
        let name = label(config);

        queue.delete(
            DeleteOpts::default(),
            Some(Box::new(move |count: u32| info!("Deleted {} with {} messages", name, count))),
        );
    }

    Ok(queue)
}
