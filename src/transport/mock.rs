//! In-memory engine for tests and dry runs: publishes land in a named
//! process-global sink, delivery reports are emitted synchronously.

use super::{ConnectOptions, DeliveryEvent, Publisher, Transport, TransportError};
use bytes::Bytes;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

static REGISTRY: Lazy<Mutex<HashMap<String, Arc<MockSink>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Destination shared by every mock transport connected under the same name.
/// Tests grab the same sink via [`MockSink::named`] to observe what was
/// published.
pub struct MockSink {
    messages: Mutex<Vec<(String, Bytes)>>,
    fail_topics: Mutex<HashSet<String>>,
    events_tx: flume::Sender<DeliveryEvent>,
    events_rx: flume::Receiver<DeliveryEvent>,
}

impl MockSink {
    fn new() -> Arc<Self> {
        let (events_tx, events_rx) = flume::unbounded();
        Arc::new(Self {
            messages: Mutex::new(Vec::new()),
            fail_topics: Mutex::new(HashSet::new()),
            events_tx,
            events_rx,
        })
    }

    /// Fetch or create the sink registered under `name`.
    pub fn named(name: &str) -> Arc<Self> {
        let mut registry = REGISTRY.lock().unwrap_or_else(|e| e.into_inner());
        registry
            .entry(name.to_string())
            .or_insert_with(Self::new)
            .clone()
    }

    /// Mark a topic so publishes to it report delivery failure.
    pub fn fail_topic(&self, topic: &str) {
        self.fail_topics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(topic.to_string());
    }

    pub fn message_count(&self) -> usize {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn messages_for(&self, topic: &str) -> Vec<Bytes> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn record(&self, topic: &str, payload: Bytes) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((topic.to_string(), payload));
        let failed = self
            .fail_topics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(topic);
        let event = if failed {
            DeliveryEvent::Failed {
                topic: topic.to_string(),
                reason: "injected delivery failure".to_string(),
            }
        } else {
            DeliveryEvent::Delivered {
                topic: topic.to_string(),
            }
        };
        let _ = self.events_tx.send(event);
    }
}

pub async fn connect(opts: ConnectOptions) -> Result<Box<dyn Transport>, TransportError> {
    let name = opts
        .params
        .get("sink")
        .cloned()
        .unwrap_or_else(|| "default".to_string());
    Ok(Box::new(MockTransport {
        sink: MockSink::named(&name),
    }))
}

struct MockTransport {
    sink: Arc<MockSink>,
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn create_publisher(&self, topic: &str) -> Result<Box<dyn Publisher>, TransportError> {
        Ok(Box::new(MockPublisher {
            sink: self.sink.clone(),
            topic: topic.to_string(),
        }))
    }

    fn delivery_events(&self) -> flume::Receiver<DeliveryEvent> {
        self.sink.events_rx.clone()
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

struct MockPublisher {
    sink: Arc<MockSink>,
    topic: String,
}

#[async_trait::async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, payload: Bytes) -> Result<(), TransportError> {
        self.sink.record(&self.topic, payload);
        Ok(())
    }
}
