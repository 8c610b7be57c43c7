use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::AppState;

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Drops throttle keys that can no longer affect a decision.
pub fn sweep(state: &AppState) -> usize {
    let removed = state.contact_limiter.sweep();
    state.call_limiter.retain_recent();
    state.call_limiter.shrink_to_fit();
    removed
}

pub fn spawn(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sweep(&state);
            if removed > 0 {
                tracing::debug!("Evicted {} idle contact throttle keys", removed);
            }
        }
    })
}
