use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Delivery-report accounting fed by the transport's event stream.
///
/// Delivery failures are logged and counted here, never retried and never
/// escalated to process failure; the counters exist so the failure rate is
/// observable without parsing logs.
pub struct DeliveryStats {
    delivered_count: RwLock<u64>,
    failed_count: RwLock<u64>,
    start_time: Instant,
}

impl DeliveryStats {
    pub fn new() -> Self {
        Self {
            delivered_count: RwLock::new(0),
            failed_count: RwLock::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a successful delivery report
    pub async fn record_delivered(&self) {
        let mut count = self.delivered_count.write().await;
        *count += 1;
    }

    /// Record a failed delivery report
    pub async fn record_failed(&self) {
        let mut count = self.failed_count.write().await;
        *count += 1;
    }

    /// Get current snapshot of delivery accounting
    pub async fn snapshot(&self) -> DeliverySnapshot {
        DeliverySnapshot {
            delivered_count: *self.delivered_count.read().await,
            failed_count: *self.failed_count.read().await,
            total_duration: self.start_time.elapsed(),
        }
    }
}

impl Default for DeliveryStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct DeliverySnapshot {
    pub delivered_count: u64,
    pub failed_count: u64,
    pub total_duration: Duration,
}
