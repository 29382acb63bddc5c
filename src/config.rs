use crate::browser::wait::{DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, Wait};
use std::time::Duration;

/// Knobs for parsing, generating and crawling
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Bound on every wait-for-condition
    pub timeout: Duration,

    pub poll_interval: Duration,

    /// Record the page title so generated objects check they are on the right page
    pub verify_title: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            verify_title: true,
        }
    }
}

impl GeneratorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn verify_title(mut self, verify: bool) -> Self {
        self.verify_title = verify;
        self
    }

    pub fn wait(&self) -> Wait {
        Wait::new(self.timeout).poll_interval(self.poll_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = GeneratorOptions::default();
        assert_eq!(opts.timeout, Duration::from_secs(10));
        assert!(opts.verify_title);
        assert_eq!(opts.wait().timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_builder() {
        let opts = GeneratorOptions::new().timeout(Duration::from_secs(3)).verify_title(false);
        assert_eq!(opts.wait().timeout(), Duration::from_secs(3));
        assert!(!opts.verify_title);
    }
}
