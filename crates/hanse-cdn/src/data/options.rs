//! Pipeline tuning knobs.

use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RESPONSE_BODY_TIMEOUT: Duration = Duration::from_secs(60);

/// Time budgets applied to every pipeline call.
///
/// `request` bounds sending the request and receiving response headers;
/// `response_body` bounds reading the body. The call as a whole is bounded
/// by the sum of the two, and neither inner budget can outlive it.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use hanse_cdn::Timeouts;
///
/// let timeouts = Timeouts::default().request(Duration::from_secs(5));
/// assert_eq!(timeouts.call(), Duration::from_secs(65));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Budget for sending the request and receiving response headers.
    ///
    /// Default: 10s
    pub request: Duration,

    /// Budget for reading the response body.
    ///
    /// Default: 60s
    pub response_body: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request: DEFAULT_REQUEST_TIMEOUT,
            response_body: DEFAULT_RESPONSE_BODY_TIMEOUT,
        }
    }
}

impl Timeouts {
    #[must_use]
    pub fn request(mut self, budget: Duration) -> Self {
        self.request = budget;
        self
    }

    #[must_use]
    pub fn response_body(mut self, budget: Duration) -> Self {
        self.response_body = budget;
        self
    }

    /// Budget for the whole call: header phase plus body phase.
    pub fn call(&self) -> Duration {
        self.request + self.response_body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_protocol_constants() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.request, Duration::from_secs(10));
        assert_eq!(timeouts.response_body, Duration::from_secs(60));
        assert_eq!(timeouts.call(), Duration::from_secs(70));
    }
}
