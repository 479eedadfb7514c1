use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::auth::{Blacklist, RefreshTokenLedger, SessionRegistry};
use crate::config::Config;
use crate::error::AuthError;

/// Two named periodic sweeps over the expirable tables. Both are idempotent
/// and best-effort: a failed pass is logged and retried on the next tick,
/// never escalated. The sweep functions are public so tests (or an external
/// scheduler) can drive them one-shot.
#[derive(Clone)]
pub struct CleanupScheduler {
    ledger: RefreshTokenLedger,
    blacklist: Blacklist,
    sessions: SessionRegistry,
    config: Arc<Config>,
}

impl CleanupScheduler {
    pub fn new(
        ledger: RefreshTokenLedger,
        blacklist: Blacklist,
        sessions: SessionRegistry,
        config: Arc<Config>,
    ) -> Self {
        Self {
            ledger,
            blacklist,
            sessions,
            config,
        }
    }

    /// Deletes refresh-token and blacklist rows past their expiry. Returns
    /// the total number of rows removed.
    pub async fn sweep_expired_tokens(&self) -> Result<u64, AuthError> {
        let now = Utc::now();
        let tokens = self.ledger.delete_expired(now).await?;
        let blacklisted = self.blacklist.delete_expired(now).await?;
        tracing::info!(
            refresh_tokens = tokens,
            blacklist_entries = blacklisted,
            "expired token sweep complete"
        );
        Ok(tokens + blacklisted)
    }

    /// Deletes sessions inactive beyond the retention window or past their
    /// own expiry.
    pub async fn sweep_stale_sessions(&self) -> Result<u64, AuthError> {
        let deleted = self
            .sessions
            .delete_stale(Utc::now(), self.config.session_retention_days)
            .await?;
        tracing::info!(sessions = deleted, "stale session sweep complete");
        Ok(deleted)
    }

    /// Spawns both sweeps on their own wall-clock cadences. The token sweep
    /// fires immediately so startup clears any backlog; the session sweep is
    /// phase-shifted by half its interval so the two never run in lockstep
    /// even on identical cadences.
    pub fn spawn(self) {
        let token_interval = Duration::from_secs(self.config.token_sweep_interval_secs);
        let session_interval = Duration::from_secs(self.config.session_sweep_interval_secs);
        let session_start = tokio::time::Instant::now() + stagger(session_interval);

        let scheduler = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(token_interval);
            loop {
                ticker.tick().await;
                if let Err(err) = scheduler.sweep_expired_tokens().await {
                    tracing::warn!(error = %err, "expired token sweep failed");
                }
            }
        });

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(session_start, session_interval);
            loop {
                ticker.tick().await;
                if let Err(err) = self.sweep_stale_sessions().await {
                    tracing::warn!(error = %err, "stale session sweep failed");
                }
            }
        });
    }
}

/// Offset for the session sweep's first tick.
fn stagger(interval: Duration) -> Duration {
    interval / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_sweep_is_offset_from_the_token_sweep() {
        let interval = Duration::from_secs(86_400);
        let offset = stagger(interval);
        assert!(offset > Duration::ZERO);
        assert!(offset < interval);
        assert_eq!(offset, Duration::from_secs(43_200));
    }
}
