use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::repositories::rate_store::RateStore;
use crate::utils::clock::Clock;

#[derive(Debug, Clone, Copy)]
pub struct ContactLimits {
    pub window: Duration,
    pub max_per_ip: usize,
    pub max_per_email: usize,
    pub cooldown: Duration,
}

impl Default for ContactLimits {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_per_ip: 5,
            max_per_email: 3,
            cooldown: Duration::from_secs(60),
        }
    }
}

/// Which check refused a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Throttle {
    Ip,
    Email,
    Cooldown,
}

impl fmt::Display for Throttle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Throttle::Ip => "ip",
            Throttle::Email => "email",
            Throttle::Cooldown => "cooldown",
        };
        f.write_str(name)
    }
}

/// The three contact-form throttles, checked in order: per-IP sliding
/// window, per-email sliding window, per-email cooldown.
///
/// Each check that passes records its hit before the next one runs, so an
/// IP hit is counted even if the email window then refuses the request.
#[derive(Clone)]
pub struct ContactLimiter {
    store: Arc<dyn RateStore>,
    clock: Arc<dyn Clock>,
    limits: ContactLimits,
}

impl ContactLimiter {
    pub fn new(store: Arc<dyn RateStore>, clock: Arc<dyn Clock>, limits: ContactLimits) -> Self {
        Self { store, clock, limits }
    }

    pub fn limits(&self) -> &ContactLimits {
        &self.limits
    }

    pub fn admit(&self, ip: &str, email: &str) -> Result<(), Throttle> {
        let now = self.clock.epoch_ms();
        let window = self.limits.window.as_millis() as u64;

        if !self
            .store
            .record_hit(&format!("ip:{}", ip), now, window, self.limits.max_per_ip)
        {
            return Err(Throttle::Ip);
        }
        if !self
            .store
            .record_hit(&format!("email:{}", email), now, window, self.limits.max_per_email)
        {
            return Err(Throttle::Email);
        }
        let cooldown = self.limits.cooldown.as_millis() as u64;
        if !self
            .store
            .claim_cooldown(&format!("cooldown:{}", email), now, cooldown)
        {
            return Err(Throttle::Cooldown);
        }
        Ok(())
    }

    /// Evicts keys that can no longer affect any decision.
    pub fn sweep(&self) -> usize {
        let horizon = self.limits.window.max(self.limits.cooldown).as_millis() as u64;
        self.store.evict_idle(self.clock.epoch_ms(), horizon)
    }
}
