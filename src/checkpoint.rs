use std::time::Duration;
use tracing::info;

/// Periodic throughput sample reported by an unbounded producer worker:
/// one checkpoint per `checkpoint_interval` messages, carrying the wall-clock
/// time the window took.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub label: String,
    pub elapsed: Duration,
}

/// Channel carrying checkpoints from workers to the reporter. Unbounded:
/// checkpoint volume is 1/interval of message volume, so senders never stall
/// the publish loop.
pub fn channel() -> (flume::Sender<Checkpoint>, flume::Receiver<Checkpoint>) {
    flume::unbounded()
}

/// Drain checkpoints for the lifetime of the process, logging each window's
/// message count, duration, and rate. Returns once every sender is dropped.
pub async fn run_reporter(checkpoint_interval: u64, rx: flume::Receiver<Checkpoint>) {
    while let Ok(cp) = rx.recv_async().await {
        let secs = cp.elapsed.as_secs_f64();
        let rate = if secs > 0.0 {
            checkpoint_interval as f64 / secs
        } else {
            0.0
        };
        info!(
            "[{}] {} messages sent in {:?} (rate: {:.2} msg/s)",
            cp.label, checkpoint_interval, cp.elapsed, rate
        );
    }
}
