// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use std::time::Duration;
use tokio::time::Instant;

/// A resettable one-shot deadline.
#[derive(Debug, Clone)]
pub struct IdleTimer {
    timeout: Duration,
    deadline: Option<Instant>,
}

impl IdleTimer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    /// Arms the timer, or pushes the deadline out if already armed.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.timeout);
    }

    pub fn clear(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Resolves at the deadline. Never resolves while disarmed.
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_reset_and_clear() {
        let start = Instant::now();
        let mut timer = IdleTimer::new(Duration::from_secs(300));
        assert!(!timer.is_expired(start + Duration::from_secs(1000)));

        timer.arm(start);
        assert!(!timer.is_expired(start + Duration::from_secs(299)));
        assert!(timer.is_expired(start + Duration::from_secs(300)));

        timer.arm(start + Duration::from_secs(200));
        assert!(!timer.is_expired(start + Duration::from_secs(300)));
        assert!(timer.is_expired(start + Duration::from_secs(500)));

        timer.clear();
        assert!(!timer.is_armed());
        assert!(!timer.is_expired(start + Duration::from_secs(10_000)));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_future_fires_at_deadline() {
        let mut timer = IdleTimer::new(Duration::from_secs(300));
        let start = Instant::now();
        timer.arm(start);

        timer.expired().await;
        assert!(Instant::now() >= start + Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn disarmed_timer_never_fires() {
        let timer = IdleTimer::new(Duration::from_secs(1));
        let fired = tokio::time::timeout(Duration::from_secs(3600), timer.expired()).await;
        assert!(fired.is_err());
    }
}
