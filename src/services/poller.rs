use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;

use super::recommendations::RecommendationProvider;
use crate::models::{SessionStats, UserPreferences};

/// Periodic poll of session stats and member preferences.
///
/// Runs independently of the session subscription stream. Observers see a
/// new value only when it differs from the previous snapshot, so unchanged
/// polls cause no downstream recomputation. Poll failures are logged and
/// swallowed; they never touch the swipe or queue flow.
pub struct StatsPoller {
    abort: AbortHandle,
    stats: watch::Receiver<Option<SessionStats>>,
    preferences: watch::Receiver<Option<UserPreferences>>,
}

impl StatsPoller {
    pub fn spawn(
        provider: Arc<dyn RecommendationProvider>,
        matching_session_id: String,
        member_id: String,
        interval: Duration,
    ) -> Self {
        let (stats_tx, stats_rx) = watch::channel(None);
        let (prefs_tx, prefs_rx) = watch::channel(None);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                // First tick fires immediately, matching the eager initial
                // load before the steady interval.
                ticker.tick().await;

                match provider.get_session_stats(&matching_session_id).await {
                    Ok(stats) => {
                        stats_tx.send_if_modified(|current| {
                            if current.as_ref() == Some(&stats) {
                                false
                            } else {
                                *current = Some(stats);
                                true
                            }
                        });
                    }
                    Err(e) => {
                        tracing::debug!(
                            matching_session_id = %matching_session_id,
                            error = %e,
                            "stats poll failed"
                        );
                    }
                }

                match provider.get_user_preferences(&member_id).await {
                    Ok(prefs) => {
                        prefs_tx.send_if_modified(|current| {
                            if current.as_ref() == Some(&prefs) {
                                false
                            } else {
                                *current = Some(prefs);
                                true
                            }
                        });
                    }
                    Err(e) => {
                        tracing::debug!(member_id = %member_id, error = %e, "preferences poll failed");
                    }
                }
            }
        });

        Self {
            abort: task.abort_handle(),
            stats: stats_rx,
            preferences: prefs_rx,
        }
    }

    pub fn stats(&self) -> watch::Receiver<Option<SessionStats>> {
        self.stats.clone()
    }

    pub fn preferences(&self) -> watch::Receiver<Option<UserPreferences>> {
        self.preferences.clone()
    }

    /// Stops polling. Idempotent; also runs on drop so handles cannot leak
    /// across session transitions.
    pub fn stop(&self) {
        self.abort.abort();
    }
}

impl Drop for StatsPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
