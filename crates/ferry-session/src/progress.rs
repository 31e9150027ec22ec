use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timing and download bookkeeping for the most recent `execute()`.
///
/// Cleared at the start of every execution; values are only meaningful once a
/// transfer has run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Wall-clock time right before the engine was invoked.
    pub start_time: Option<DateTime<Utc>>,

    /// Wall-clock time right after the engine returned.
    pub end_time: Option<DateTime<Utc>>,

    /// Body bytes received so far.
    pub downloaded_bytes: Option<u64>,

    /// When the last body chunk arrived.
    pub download_time_check: Option<DateTime<Utc>>,
}

impl ProgressSnapshot {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn record_chunk(&mut self, len: usize, at: DateTime<Utc>) {
        let total = self.downloaded_bytes.unwrap_or(0) + len as u64;
        self.downloaded_bytes = Some(total);
        self.download_time_check = Some(at);
    }

    /// Seconds between `start_time` and `end_time`, or `0.0` before the first
    /// execution.
    #[must_use]
    pub fn execution_time(&self) -> f64 {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => {
                let elapsed = end.signed_duration_since(start);
                let secs = elapsed
                    .num_microseconds()
                    .map_or(elapsed.num_milliseconds() as f64 / 1e3, |us| us as f64 / 1e6);
                secs.max(0.0)
            }
            _ => 0.0,
        }
    }

    /// Download rate in bytes per second, derived from the chunk bookkeeping.
    #[must_use]
    pub fn average_rate_bps(&self) -> Option<f64> {
        let bytes = self.downloaded_bytes?;
        let start = self.start_time?;
        let at = self.download_time_check?;
        let secs = at.signed_duration_since(start).num_microseconds()? as f64 / 1e6;
        (secs > 0.0).then(|| bytes as f64 / secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000 + ms).unwrap()
    }

    #[test]
    fn test_execution_time_before_first_run() {
        assert_eq!(ProgressSnapshot::default().execution_time(), 0.0);
    }

    #[test]
    fn test_execution_time_is_end_minus_start() {
        let snapshot = ProgressSnapshot {
            start_time: Some(at(0)),
            end_time: Some(at(1_250)),
            ..Default::default()
        };
        assert!((snapshot.execution_time() - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_execution_time_never_negative() {
        let snapshot = ProgressSnapshot {
            start_time: Some(at(500)),
            end_time: Some(at(0)),
            ..Default::default()
        };
        assert_eq!(snapshot.execution_time(), 0.0);
    }

    #[test]
    fn test_record_chunk_accumulates() {
        let mut snapshot = ProgressSnapshot {
            start_time: Some(at(0)),
            ..Default::default()
        };
        snapshot.record_chunk(1024, at(500));
        snapshot.record_chunk(1024, at(1_000));
        assert_eq!(snapshot.downloaded_bytes, Some(2048));
        assert_eq!(snapshot.download_time_check, Some(at(1_000)));
        assert_eq!(snapshot.average_rate_bps(), Some(2048.0));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut snapshot = ProgressSnapshot {
            start_time: Some(at(0)),
            end_time: Some(at(0) + TimeDelta::seconds(1)),
            downloaded_bytes: Some(10),
            download_time_check: Some(at(10)),
        };
        snapshot.reset();
        assert_eq!(snapshot, ProgressSnapshot::default());
    }
}
