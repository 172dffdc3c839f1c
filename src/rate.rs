use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Rate controller for open-loop message sending with a fixed inter-message
/// delay.
pub struct RateController {
    interval: Duration,
    last_send: Option<Instant>,
}

impl RateController {
    /// Create a controller that spaces sends by `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_send: None,
        }
    }

    /// Wait until it's time to send the next message. The first call returns
    /// immediately; later calls sleep out whatever remains of the interval.
    pub async fn wait_for_next(&mut self) {
        let now = Instant::now();

        if let Some(last) = self.last_send {
            let elapsed = now.duration_since(last);
            if elapsed < self.interval {
                sleep(self.interval - elapsed).await;
            }
        }

        self.last_send = Some(Instant::now());
    }

    /// Get configured interval between messages
    pub fn interval(&self) -> Duration {
        self.interval
    }
}
