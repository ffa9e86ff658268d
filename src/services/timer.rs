use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::{sleep, Instant};

#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("countdown has not started yet")]
    NotStarted,
}

/// Humanized remaining time, for channel announcements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Time {
    pub minutes: u64,
    pub seconds: u64,
}

impl From<Duration> for Time {
    fn from(duration: Duration) -> Self {
        let total = duration.as_secs();
        Time {
            minutes: total / 60,
            seconds: total % 60,
        }
    }
}

/// Tracks the day phase countdown: query remaining time at any point, and
/// fire one warning shortly before the end plus one terminal callback at
/// the end. Single-shot; there is no drift correction or retry.
pub struct PhaseTimer {
    duration: Duration,
    warning_offset: Duration,
    started_at: Mutex<Option<Instant>>,
}

impl PhaseTimer {
    pub fn new(duration: Duration, warning_offset: Duration) -> Self {
        Self {
            duration,
            warning_offset: warning_offset.min(duration),
            started_at: Mutex::new(None),
        }
    }

    pub fn start(&self) {
        let mut started = self.started_at.lock().unwrap();
        *started = Some(Instant::now());
    }

    pub fn remaining(&self) -> Result<Time, TimerError> {
        let started = self.started_at.lock().unwrap().ok_or(TimerError::NotStarted)?;
        let elapsed = started.elapsed();
        Ok(Time::from(self.duration.saturating_sub(elapsed)))
    }

    /// Waits out the phase. `on_warning` fires once at
    /// `duration - warning_offset`, `on_timeout` once at `duration`.
    pub async fn run<W, WF, T, TF>(&self, on_warning: W, on_timeout: T) -> Result<(), TimerError>
    where
        W: FnOnce() -> WF,
        WF: Future<Output = ()>,
        T: FnOnce() -> TF,
        TF: Future<Output = ()>,
    {
        let started = self.started_at.lock().unwrap().ok_or(TimerError::NotStarted)?;

        sleep_until_offset(started, self.duration - self.warning_offset).await;
        on_warning().await;
        sleep_until_offset(started, self.duration).await;
        on_timeout().await;
        Ok(())
    }
}

async fn sleep_until_offset(started: Instant, offset: Duration) {
    let elapsed = started.elapsed();
    if elapsed < offset {
        sleep(offset - elapsed).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn remaining_requires_a_started_timer() {
        let timer = PhaseTimer::new(Duration::from_secs(90), Duration::from_secs(30));
        assert!(matches!(timer.remaining(), Err(TimerError::NotStarted)));
    }

    #[test]
    fn remaining_is_humanized() {
        let timer = PhaseTimer::new(Duration::from_secs(90), Duration::from_secs(30));
        timer.start();
        let time = timer.remaining().unwrap();
        assert_eq!(time.minutes, 1);
        assert!(time.seconds <= 30);
    }

    #[tokio::test]
    async fn warning_fires_before_timeout() {
        let timer = PhaseTimer::new(Duration::from_millis(40), Duration::from_millis(20));
        timer.start();

        let order = Arc::new(AtomicUsize::new(0));
        let warned_at = Arc::new(AtomicUsize::new(0));
        let ended_at = Arc::new(AtomicUsize::new(0));

        let (o1, w) = (order.clone(), warned_at.clone());
        let (o2, e) = (order.clone(), ended_at.clone());
        timer
            .run(
                || async move {
                    w.store(o1.fetch_add(1, Ordering::SeqCst) + 1, Ordering::SeqCst);
                },
                || async move {
                    e.store(o2.fetch_add(1, Ordering::SeqCst) + 1, Ordering::SeqCst);
                },
            )
            .await
            .unwrap();

        assert_eq!(warned_at.load(Ordering::SeqCst), 1);
        assert_eq!(ended_at.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn run_requires_a_started_timer() {
        let timer = PhaseTimer::new(Duration::from_millis(10), Duration::from_millis(5));
        let result = timer.run(|| async {}, || async {}).await;
        assert!(matches!(result, Err(TimerError::NotStarted)));
    }
}
