//! Kafka adapter (feature `transport-kafka`), using rdkafka's threaded
//! producer. Client settings from the config file are applied verbatim;
//! delivery reports are forwarded into the transport's event channel.

use super::{ConnectOptions, DeliveryEvent, Publisher, Transport, TransportError};
use bytes::Bytes;
use rdkafka::ClientConfig;
use rdkafka::client::ClientContext;
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::producer::{BaseRecord, DeliveryResult, Producer, ProducerContext, ThreadedProducer};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::util::Timeout;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Pause before re-enqueueing when the client's outbound queue is full. The
/// wait is this system's only backpressure mechanism.
const QUEUE_FULL_BACKOFF: Duration = Duration::from_millis(100);

const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn connect(opts: ConnectOptions) -> Result<Box<dyn Transport>, TransportError> {
    let mut client_config = ClientConfig::new();
    for (key, value) in &opts.params {
        client_config.set(key.as_str(), value.as_str());
    }
    if !opts.params.contains_key("client.id") {
        client_config.set("client.id", format!("mq-loadgen-{}", uuid::Uuid::new_v4()));
    }

    let (events_tx, events_rx) = flume::unbounded();
    let producer: ThreadedProducer<DeliveryContext> = client_config
        .create_with_context(DeliveryContext { events: events_tx })
        .map_err(|e| TransportError::Connect(e.to_string()))?;

    Ok(Box::new(KafkaTransport {
        producer: Arc::new(producer),
        events_rx,
    }))
}

/// Producer context whose delivery callback runs on the client's poll thread;
/// it must not block, so reports go into an unbounded channel.
struct DeliveryContext {
    events: flume::Sender<DeliveryEvent>,
}

impl ClientContext for DeliveryContext {}

impl ProducerContext for DeliveryContext {
    type DeliveryOpaque = ();

    fn delivery(&self, delivery_result: &DeliveryResult<'_>, _opaque: ()) {
        let event = match delivery_result {
            Ok(message) => DeliveryEvent::Delivered {
                topic: message.topic().to_string(),
            },
            Err((err, message)) => DeliveryEvent::Failed {
                topic: message.topic().to_string(),
                reason: err.to_string(),
            },
        };
        let _ = self.events.send(event);
    }
}

struct KafkaTransport {
    producer: Arc<ThreadedProducer<DeliveryContext>>,
    events_rx: flume::Receiver<DeliveryEvent>,
}

#[async_trait::async_trait]
impl Transport for KafkaTransport {
    async fn create_publisher(&self, topic: &str) -> Result<Box<dyn Publisher>, TransportError> {
        Ok(Box::new(KafkaPublisher {
            producer: self.producer.clone(),
            topic: topic.to_string(),
        }))
    }

    fn delivery_events(&self) -> flume::Receiver<DeliveryEvent> {
        self.events_rx.clone()
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(Timeout::After(FLUSH_TIMEOUT)))
            .await
            .map_err(|e| TransportError::Other(e.to_string()))?
            .map_err(|e| TransportError::Other(e.to_string()))
    }

    async fn health_check(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

struct KafkaPublisher {
    producer: Arc<ThreadedProducer<DeliveryContext>>,
    topic: String,
}

#[async_trait::async_trait]
impl Publisher for KafkaPublisher {
    async fn publish(&self, payload: Bytes) -> Result<(), TransportError> {
        let mut record: BaseRecord<'_, (), [u8]> =
            BaseRecord::to(&self.topic).payload(payload.as_ref());
        loop {
            match self.producer.send(record) {
                Ok(()) => return Ok(()),
                Err((KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull), returned)) => {
                    record = returned;
                    sleep(QUEUE_FULL_BACKOFF).await;
                }
                Err((e, _)) => return Err(TransportError::Publish(e.to_string())),
            }
        }
    }
}
