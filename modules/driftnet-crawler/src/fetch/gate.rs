//! Politeness gate: enforces the configured request-rate ceiling by sleeping
//! between calls. Lives inside the fetch clients; the orchestrator only sees
//! the resulting latency.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
pub struct RateGate {
    min_interval: Duration,
    last: Option<Instant>,
}

impl RateGate {
    /// A gate allowing at most `qps` requests per second. Non-positive `qps`
    /// disables the gate.
    pub fn new(qps: f64) -> Self {
        let min_interval = if qps > 0.0 {
            Duration::from_secs_f64(1.0 / qps)
        } else {
            Duration::ZERO
        };
        Self {
            min_interval,
            last: None,
        }
    }

    /// Sleep until the next request is allowed, then stamp the call time.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        self.last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn spaces_calls_by_min_interval() {
        let mut gate = RateGate::new(2.0); // 500ms apart
        let start = Instant::now();
        gate.wait().await;
        gate.wait().await;
        gate.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_qps_never_sleeps() {
        let mut gate = RateGate::new(0.0);
        let start = Instant::now();
        for _ in 0..10 {
            gate.wait().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
