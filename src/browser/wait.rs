use crate::error::{PomError, Result};
use std::time::{Duration, Instant};

/// Default timeout for wait operations
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Bounded polling for a condition on the live page
#[derive(Debug, Clone, Copy)]
pub struct Wait {
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for Wait {
    fn default() -> Self {
        Self { timeout: DEFAULT_TIMEOUT, poll_interval: DEFAULT_POLL_INTERVAL }
    }
}

impl Wait {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout, ..Self::default() }
    }

    /// Builder method: set polling interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Poll `condition` until it returns `Ok(true)`
    ///
    /// Stale-element and not-found errors count as "not yet"; any other error
    /// aborts the wait. Exhausting the timeout yields [`PomError::Timeout`].
    pub fn until<F>(&self, condition: &str, mut check: F) -> Result<()>
    where
        F: FnMut() -> Result<bool>,
    {
        self.until_some(condition, || Ok(check()?.then_some(())))
    }

    /// Poll `lookup` until it yields a value
    pub fn until_some<T, F>(&self, condition: &str, mut lookup: F) -> Result<T>
    where
        F: FnMut() -> Result<Option<T>>,
    {
        let deadline = Instant::now() + self.timeout;
        loop {
            match lookup() {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(e) if e.is_element_local() => {
                    log::debug!("Waiting for {}: {}", condition, e);
                }
                Err(e) => return Err(e),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(PomError::Timeout { condition: condition.to_string(), timeout: self.timeout });
            }
            std::thread::sleep(self.poll_interval.min(deadline - now));
        }
    }
}
