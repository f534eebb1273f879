/// Time sources and sleeping, kept behind traits so sampling and the
/// boot-time sync wait can be driven without real time in tests.
use async_trait::async_trait;
use std::time::Instant;
use time::OffsetDateTime;
use tokio::time::{sleep, Duration};

// The OS clock starts near the epoch until NTP has synced; anything
// below this is still the pre-sync default.
pub const TIME_SYNC_THRESHOLD_SECS: i64 = 100_000;
const TIME_SYNC_POLL_MS: u64 = 500;

pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin, monotonic.
    fn monotonic_millis(&self) -> u64;
    /// Current UNIX timestamp in seconds.
    fn unix_seconds(&self) -> i64;
}

pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            started: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn monotonic_millis(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn unix_seconds(&self) -> i64 {
        OffsetDateTime::now_utc().unix_timestamp()
    }
}

#[async_trait]
pub trait Delay {
    async fn pause(&self, duration: Duration);
}

pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn pause(&self, duration: Duration) {
        sleep(duration).await;
    }
}

/// Block until the OS clock reports a post-sync UNIX time
///
/// The system clock is useless for timestamping until NTP has run once;
/// poll every 500 ms until it crosses the sync threshold.
pub async fn wait_for_time_sync<C, D>(clock: &C, delay: &D)
where
    C: Clock + ?Sized,
    D: Delay + ?Sized,
{
    while clock.unix_seconds() < TIME_SYNC_THRESHOLD_SECS {
        delay.pause(Duration::from_millis(TIME_SYNC_POLL_MS)).await;
    }
}
