//! Transport abstraction: trait, types, and builder factory.
//!
//! The broker client is an opaque collaborator behind this seam; everything
//! hard (batching, retries, partition assignment, network I/O) happens on the
//! other side of it.

pub mod config;
#[cfg(feature = "transport-kafka")]
pub mod kafka;
#[cfg(any(test, feature = "transport-mock"))]
pub mod mock;

use bytes::Bytes;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub enum Engine {
    Kafka,
    #[cfg(any(test, feature = "transport-mock"))]
    Mock,
}

#[derive(Clone, Debug, Default)]
pub struct ConnectOptions {
    pub params: BTreeMap<String, String>,
}

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("connect: {0}")]
    Connect(String),
    #[error("publish: {0}")]
    Publish(String),
    #[error("timeout")]
    Timeout,
    #[error("disconnected")]
    Disconnected,
    #[error("other: {0}")]
    Other(String),
}

impl TransportError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Disconnected)
    }
}

/// Asynchronous delivery report from the client, one per published message.
/// Failures carry the client's own description; they are logged and counted,
/// never retried.
#[derive(Clone, Debug)]
pub enum DeliveryEvent {
    Delivered { topic: String },
    Failed { topic: String, reason: String },
}

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Pre-declare a publisher for high-throughput publishing to one topic.
    async fn create_publisher(&self, topic: &str) -> Result<Box<dyn Publisher>, TransportError>;
    /// Stream of asynchronous delivery reports. Receivers are cheap clones of
    /// one shared channel; at least one must be drained or reports accumulate.
    fn delivery_events(&self) -> flume::Receiver<DeliveryEvent>;
    async fn shutdown(&self) -> Result<(), TransportError>;
    async fn health_check(&self) -> Result<(), TransportError>;
}

#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    /// Enqueue one message for asynchronous delivery. May stay pending while
    /// the client's outbound queue is full; that wait is the system's only
    /// backpressure.
    async fn publish(&self, payload: Bytes) -> Result<(), TransportError>;
    async fn shutdown(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

pub struct TransportBuilder;

impl TransportBuilder {
    pub async fn connect(
        engine: Engine,
        opts: ConnectOptions,
    ) -> Result<Box<dyn Transport>, TransportError> {
        match engine {
            Engine::Kafka => {
                #[cfg(feature = "transport-kafka")]
                {
                    crate::transport::kafka::connect(opts).await
                }
                #[cfg(not(feature = "transport-kafka"))]
                {
                    let _ = opts;
                    Err(TransportError::Connect("kafka feature disabled".into()))
                }
            }
            #[cfg(any(test, feature = "transport-mock"))]
            Engine::Mock => crate::transport::mock::connect(opts).await,
        }
    }
}
