//! Bounded wait for a session to appear, e.g. right after email verification
//! when the auth authority has not yet issued the token.

use std::future::Future;
use std::time::Duration;

use crate::config::SessionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            max_attempts: config.poll_attempts.max(1),
            interval: config.poll_interval(),
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            interval: Duration::from_millis(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    Ready(T),
    TimedOut { attempts: u32 },
}

impl<T> PollOutcome<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            PollOutcome::Ready(value) => Some(value),
            PollOutcome::TimedOut { .. } => None,
        }
    }
}

/// Call `lookup` up to `policy.max_attempts` times with a fixed pause between
/// attempts. Lookup errors count as a miss.
pub async fn wait_for_session<T, E, F, Fut>(policy: PollPolicy, mut lookup: F) -> PollOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    E: std::fmt::Display,
{
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        match lookup().await {
            Ok(Some(value)) => return PollOutcome::Ready(value),
            Ok(None) => tracing::debug!("Session not yet available (attempt {}/{})", attempt, attempts),
            Err(e) => tracing::debug!("Session lookup failed (attempt {}/{}): {}", attempt, attempts, e),
        }
        if attempt < attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    tracing::warn!("Session did not materialize after {} attempts", attempts);
    PollOutcome::TimedOut { attempts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> PollPolicy {
        PollPolicy {
            max_attempts: 3,
            interval: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn returns_as_soon_as_session_appears() {
        let calls = AtomicU32::new(0);
        let outcome = wait_for_session(fast(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok::<_, String>(if n == 2 { Some("claims") } else { None }) }
        })
        .await;
        assert_eq!(outcome, PollOutcome::Ready("claims"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn times_out_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let outcome: PollOutcome<()> = wait_for_session(fast(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<Option<()>, _>("transport down") }
        })
        .await;
        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 3 });
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
