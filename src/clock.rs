//! Clock-drift probing (`spec.md` §5 "Clock drift", §1(d)): informational
//! only, never affects control flow.

use std::time::{SystemTime, UNIX_EPOCH};

/// Threshold beyond which drift against an external time source is logged
/// as a warning.
pub const CLOCK_DRIFT_THRESHOLD_MILLIS: i64 = 250;

/// Current wall-clock time as an epoch-millisecond timestamp.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// An external time source used only to probe for local clock drift. A
/// production binding might query NTP or a trusted HTTP endpoint; tests use
/// a fixed value.
#[async_trait::async_trait]
pub trait ExternalTimeSource: Send + Sync {
    async fn now_millis(&self) -> anyhow::Result<i64>;
}

/// Compares the local clock against `source` and logs a warning if the two
/// differ by more than `threshold_millis`. Never returns an error that
/// should affect scheduling — a failure to reach the external source is
/// itself just logged.
pub async fn probe_drift(source: &dyn ExternalTimeSource, threshold_millis: i64) {
    let local = now_millis();
    match source.now_millis().await {
        Ok(external) => {
            let drift = (local - external).abs();
            if drift > threshold_millis {
                tracing::warn!(
                    drift_millis = drift,
                    threshold_millis,
                    "local clock drifted from external time source"
                );
            } else {
                tracing::debug!(drift_millis = drift, "clock drift within threshold");
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to probe external time source for clock drift");
        }
    }
}

/// An [`ExternalTimeSource`] that always reports the local clock, i.e. zero
/// drift. Used where no external source is configured.
pub struct NoopTimeSource;

#[async_trait::async_trait]
impl ExternalTimeSource for NoopTimeSource {
    async fn now_millis(&self) -> anyhow::Result<i64> {
        Ok(now_millis())
    }
}
