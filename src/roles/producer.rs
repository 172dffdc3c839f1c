use crate::checkpoint::Checkpoint;
use crate::payload::{DataSource, TimestampedRecord};
use crate::rate::RateController;
use crate::transport::{Publisher, TransportError};
use anyhow::Result;
use bytes::Bytes;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// How many messages a worker emits before stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageBudget {
    Bounded(u64),
    Unbounded,
}

impl MessageBudget {
    /// Parse the CLI message-count argument; `-1` means unbounded.
    pub fn from_arg(count: i64) -> Result<Self> {
        match count {
            -1 => Ok(Self::Unbounded),
            n if n >= 0 => Ok(Self::Bounded(n as u64)),
            n => anyhow::bail!("invalid message count {n} (expected >= 0, or -1 for unbounded)"),
        }
    }
}

pub struct ProducerConfig {
    pub label: String,
    pub budget: MessageBudget,
    pub delay: Duration,
    pub checkpoint_interval: u64,
}

/// Rate-paced publish loop for one topic.
///
/// Bounded budgets emit exactly that many payloads and return; no checkpoint
/// is ever emitted in bounded mode. Unbounded budgets run until the token is
/// cancelled, sending one checkpoint per `checkpoint_interval` messages.
/// Encode failures drop the message and continue; publish failures are fatal
/// to the worker.
pub async fn run_producer(
    config: ProducerConfig,
    publisher: Box<dyn Publisher>,
    data: Arc<DataSource>,
    checkpoints: flume::Sender<Checkpoint>,
    shutdown: CancellationToken,
) -> Result<()> {
    info!(
        "[{}] producer starting: {:?}, delay {:?}",
        config.label, config.budget, config.delay
    );

    let mut rng = SmallRng::from_entropy();
    let mut rate = RateController::new(config.delay);
    let checkpoint_interval = config.checkpoint_interval.max(1);

    let produce_loop = async {
        match config.budget {
            MessageBudget::Bounded(count) => {
                for _ in 0..count {
                    rate.wait_for_next().await;
                    emit(&*publisher, &data, &mut rng).await?;
                }
                info!("[{}] budget exhausted, producer stopping", config.label);
            }
            MessageBudget::Unbounded => {
                let mut countdown = checkpoint_interval;
                let mut window_start = Instant::now();
                loop {
                    rate.wait_for_next().await;
                    emit(&*publisher, &data, &mut rng).await?;
                    countdown -= 1;
                    if countdown == 0 {
                        let _ = checkpoints.send(Checkpoint {
                            label: config.label.clone(),
                            elapsed: window_start.elapsed(),
                        });
                        countdown = checkpoint_interval;
                        window_start = Instant::now();
                    }
                }
            }
        }
        Ok::<(), anyhow::Error>(())
    };

    tokio::select! {
        res = produce_loop => res,
        _ = shutdown.cancelled() => {
            debug!("[{}] cancellation requested, producer stopping", config.label);
            Ok(())
        }
    }
}

/// Build one timestamped payload and hand it to the publish queue. A payload
/// that fails to encode is logged and dropped; the loop goes on.
async fn emit(
    publisher: &dyn Publisher,
    data: &DataSource,
    rng: &mut SmallRng,
) -> Result<(), TransportError> {
    let record = TimestampedRecord::new(data.data(rng));
    match record.encode() {
        Ok(encoded) => publisher.publish(Bytes::from(encoded)).await,
        Err(e) => {
            error!("payload encode failed, dropping message: {e}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_arg_parsing() {
        assert_eq!(MessageBudget::from_arg(-1).unwrap(), MessageBudget::Unbounded);
        assert_eq!(MessageBudget::from_arg(0).unwrap(), MessageBudget::Bounded(0));
        assert_eq!(MessageBudget::from_arg(42).unwrap(), MessageBudget::Bounded(42));
        assert!(MessageBudget::from_arg(-2).is_err());
    }
}
